//! Registry URL helpers

use url::Url;

/// The public npm registry
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org/";

/// Whether `registry` (or the default, when unset) is the public npm registry.
///
/// Hosts are compared so trailing slashes and paths do not matter.
pub fn is_default_registry(registry: Option<&str>) -> bool {
    let Some(registry) = registry else {
        return true;
    };

    let host = |s: &str| Url::parse(s).ok().and_then(|u| u.host_str().map(str::to_lowercase));
    match (host(registry), host(DEFAULT_REGISTRY)) {
        (Some(configured), Some(default)) => configured == default,
        _ => false,
    }
}

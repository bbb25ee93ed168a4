//! Temporary license injection

use tracing::{debug, warn};

use liftoff_core::error::{LiftoffError, Result};
use liftoff_core::monorepo::find_license;

use crate::pipeline::Collaborators;
use crate::state::RunState;

/// Join names as `a`, `a and b`, or `a, b, and c`
pub fn oxford_join(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [one] => one.clone(),
        [first, second] => format!("{} and {}", first, second),
        [rest @ .., last] => format!("{}, and {}", rest.join(", "), last),
    }
}

/// Warning for packages without a license when the root has none either
pub fn missing_license_message(names: &[String]) -> String {
    let plural = names.len() > 1;
    format!(
        "Package{} {} {} missing a license.\n{}\n{}",
        if plural { "s" } else { "" },
        oxford_join(names),
        if plural { "are" } else { "is" },
        "One way to fix this is to add a LICENSE.md file to the root of this repository.",
        "See https://choosealicense.com for additional guidance."
    )
}

/// Copy the root license into every package to publish that lacks one
pub fn prepare_licenses(state: &mut RunState, deps: &Collaborators) -> Result<()> {
    let contents = state.config.contents.clone();

    let mut missing = Vec::new();
    for node in state.to_publish() {
        if find_license(&node.pack_dir(contents.as_deref()))?.is_none() {
            missing.push(node.name.clone());
        }
    }

    if missing.is_empty() {
        debug!("every package has a license");
        return Ok(());
    }

    let Some(root_license) = state.project.license_path.clone() else {
        deps.warn(missing_license_message(&missing));
        return Ok(());
    };

    let file_name = root_license
        .file_name()
        .ok_or_else(|| LiftoffError::other("root license path has no file name"))?
        .to_owned();

    for name in &missing {
        let target = state
            .node(name)?
            .pack_dir(contents.as_deref())
            .join(&file_name);
        std::fs::copy(&root_license, &target)?;
        debug!(package = %name, path = %target.display(), "created temporary license");
        state.temp_licenses.push(target);
    }

    state.licensed = missing;
    Ok(())
}

/// Delete every temporary license still on disk; failures are only logged
pub fn remove_temp_licenses(state: &mut RunState, deps: &Collaborators) {
    for path in state.temp_licenses.drain(..) {
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "removed temporary license"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to remove temporary license");
                deps.warn(format!(
                    "Unable to remove temporary license {}: {}",
                    path.display(),
                    e
                ));
            }
        }
    }
}

//! Dependency-ordered batching of the publish set

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::GraphType;
use crate::error::{PipelineError, Result};

use super::graph::PackageGraph;

/// Ordered batches plus the dependency cycles met while building them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchPlan {
    /// Batches in publish order; names sorted within a batch
    pub batches: Vec<Vec<String>>,
    /// Cycle paths, each starting and ending with the same package
    pub cycles: Vec<Vec<String>>,
}

impl BatchPlan {
    /// Whether any cycle was found
    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }

    /// Cycles rendered as `a -> b -> a`
    pub fn cycle_descriptions(&self) -> Vec<String> {
        self.cycles.iter().map(|c| c.join(" -> ")).collect()
    }

    /// Fail with [`PipelineError::CycleDetected`] when cycles exist
    pub fn ensure_acyclic(&self) -> Result<()> {
        if self.has_cycles() {
            return Err(PipelineError::CycleDetected {
                cycles: self.cycle_descriptions(),
            }
            .into());
        }
        Ok(())
    }

    /// Every batched package, in batch order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.batches.iter().flatten().map(String::as_str)
    }

    /// Number of batched packages
    pub fn package_count(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }

    /// Whether no package is batched
    pub fn is_empty(&self) -> bool {
        self.package_count() == 0
    }
}

/// Partition `publish_set` into batches so that every package comes after
/// its in-set dependencies.
///
/// Private packages are dropped. When `sort` is false the whole set is one
/// batch. When only cycles remain, the cycles are recorded and the cyclic
/// groups that wait on nothing else form the next batch.
pub fn batch_packages(
    graph: &PackageGraph,
    publish_set: &[String],
    filter: GraphType,
    sort: bool,
) -> Result<BatchPlan> {
    let mut selected = BTreeSet::new();
    for name in publish_set {
        let node = graph
            .get(name)
            .ok_or_else(|| PipelineError::UnknownPackage(name.clone()))?;
        if node.private {
            debug!(package = %name, "skipping private package");
            continue;
        }
        selected.insert(name.clone());
    }

    if selected.is_empty() {
        return Ok(BatchPlan::default());
    }

    if !sort {
        return Ok(BatchPlan {
            batches: vec![selected.into_iter().collect()],
            cycles: Vec::new(),
        });
    }

    // Outstanding in-set dependencies per package
    let mut pending: BTreeMap<String, BTreeSet<String>> = selected
        .iter()
        .map(|name| {
            let deps = graph
                .get(name)
                .map(|node| {
                    node.dependency_names(filter)
                        .filter(|dep| *dep != name.as_str() && selected.contains(*dep))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            (name.clone(), deps)
        })
        .collect();

    let mut plan = BatchPlan::default();

    while !pending.is_empty() {
        let sources: Vec<String> = pending
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(name, _)| name.clone())
            .collect();

        let batch = if sources.is_empty() {
            let groups = strongly_connected(&pending);
            for group in groups.iter().filter(|g| g.len() > 1) {
                if let Some(cycle) = cycle_path(&pending, group) {
                    if !plan.cycles.contains(&cycle) {
                        plan.cycles.push(cycle);
                    }
                }
            }

            let ready: BTreeSet<String> = groups
                .iter()
                .filter(|group| {
                    group.iter().all(|name| {
                        pending
                            .get(name)
                            .is_some_and(|deps| deps.iter().all(|d| group.contains(d)))
                    })
                })
                .flatten()
                .cloned()
                .collect();

            warn!(
                packages = ?ready,
                "dependency cycle, batching cyclic packages together"
            );
            ready.into_iter().collect::<Vec<_>>()
        } else {
            sources
        };

        if batch.is_empty() {
            // Unreachable for a finite graph, but never spin
            plan.batches.push(pending.keys().cloned().collect());
            break;
        }

        for name in &batch {
            pending.remove(name);
        }
        for deps in pending.values_mut() {
            for name in &batch {
                deps.remove(name);
            }
        }

        debug!(index = plan.batches.len(), packages = ?batch, "batch");
        plan.batches.push(batch);
    }

    Ok(plan)
}

/// Tarjan's algorithm over the pending dependency map
fn strongly_connected(pending: &BTreeMap<String, BTreeSet<String>>) -> Vec<BTreeSet<String>> {
    struct Tarjan<'a> {
        pending: &'a BTreeMap<String, BTreeSet<String>>,
        index: usize,
        indices: BTreeMap<&'a str, usize>,
        lowlinks: BTreeMap<&'a str, usize>,
        stack: Vec<&'a str>,
        on_stack: BTreeSet<&'a str>,
        groups: Vec<BTreeSet<String>>,
    }

    impl<'a> Tarjan<'a> {
        fn visit(&mut self, name: &'a str) {
            self.indices.insert(name, self.index);
            self.lowlinks.insert(name, self.index);
            self.index += 1;
            self.stack.push(name);
            self.on_stack.insert(name);

            let pending = self.pending;
            if let Some(deps) = pending.get(name) {
                for dep in deps {
                    let dep = dep.as_str();
                    if !pending.contains_key(dep) {
                        continue;
                    }
                    if !self.indices.contains_key(dep) {
                        self.visit(dep);
                        let low = self.lowlinks[dep].min(self.lowlinks[name]);
                        self.lowlinks.insert(name, low);
                    } else if self.on_stack.contains(dep) {
                        let low = self.indices[dep].min(self.lowlinks[name]);
                        self.lowlinks.insert(name, low);
                    }
                }
            }

            if self.lowlinks[name] == self.indices[name] {
                let mut group = BTreeSet::new();
                while let Some(member) = self.stack.pop() {
                    self.on_stack.remove(member);
                    group.insert(member.to_string());
                    if member == name {
                        break;
                    }
                }
                self.groups.push(group);
            }
        }
    }

    let mut tarjan = Tarjan {
        pending,
        index: 0,
        indices: BTreeMap::new(),
        lowlinks: BTreeMap::new(),
        stack: Vec::new(),
        on_stack: BTreeSet::new(),
        groups: Vec::new(),
    };

    for name in pending.keys() {
        if !tarjan.indices.contains_key(name.as_str()) {
            tarjan.visit(name);
        }
    }

    tarjan.groups
}

/// Shortest cycle through the first member of `group`
fn cycle_path(
    pending: &BTreeMap<String, BTreeSet<String>>,
    group: &BTreeSet<String>,
) -> Option<Vec<String>> {
    let start = group.iter().next()?;
    let mut parents: BTreeMap<&str, &str> = BTreeMap::new();
    let mut queue: VecDeque<&str> = VecDeque::from([start.as_str()]);

    while let Some(current) = queue.pop_front() {
        for dep in pending.get(current).into_iter().flatten() {
            if !group.contains(dep) {
                continue;
            }
            if dep == start {
                let mut path = vec![start.clone()];
                let mut cursor = current;
                let mut tail = Vec::new();
                while cursor != start.as_str() {
                    tail.push(cursor.to_string());
                    cursor = *parents.get(cursor)?;
                }
                tail.reverse();
                path.extend(tail);
                path.push(start.clone());
                return Some(path);
            }
            if !parents.contains_key(dep.as_str()) {
                parents.insert(dep.as_str(), current);
                queue.push_back(dep.as_str());
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monorepo::graph::tests::manifest;
    use serde_json::json;

    fn graph(specs: &[(&str, &[&str], bool)]) -> PackageGraph {
        let manifests = specs
            .iter()
            .map(|(name, deps, private)| {
                let deps: serde_json::Map<String, serde_json::Value> = deps
                    .iter()
                    .map(|d| (d.to_string(), json!("^1.0.0")))
                    .collect();
                manifest(
                    &format!("packages/{}", name),
                    json!({"name": name, "version": "1.0.0", "private": private, "dependencies": deps}),
                )
            })
            .collect();
        PackageGraph::build(manifests).unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_chain_batches_in_order() {
        let g = graph(&[("a", &[], false), ("b", &["a"], false), ("c", &["b"], false)]);
        let plan = batch_packages(&g, &names(&["c", "b", "a"]), GraphType::Runtime, true).unwrap();
        assert_eq!(
            plan.batches,
            vec![names(&["a"]), names(&["b"]), names(&["c"])]
        );
        assert!(!plan.has_cycles());
    }

    #[test]
    fn test_unsorted_is_single_batch() {
        let g = graph(&[("a", &[], false), ("b", &["a"], false), ("c", &["b"], false)]);
        let plan = batch_packages(&g, &names(&["a", "b", "c"]), GraphType::Runtime, false).unwrap();
        assert_eq!(plan.batches, vec![names(&["a", "b", "c"])]);
    }

    #[test]
    fn test_independent_packages_share_a_batch() {
        let g = graph(&[("b", &[], false), ("a", &[], false)]);
        let plan = batch_packages(&g, &names(&["b", "a"]), GraphType::Runtime, true).unwrap();
        assert_eq!(plan.batches, vec![names(&["a", "b"])]);
    }

    #[test]
    fn test_private_packages_never_batched() {
        let g = graph(&[("a", &[], false), ("p", &["a"], true), ("c", &["p"], false)]);
        let plan = batch_packages(&g, &names(&["a", "p", "c"]), GraphType::Runtime, true).unwrap();
        assert!(plan.names().all(|n| n != "p"));
        assert_eq!(plan.package_count(), 2);
    }

    #[test]
    fn test_out_of_set_dependencies_do_not_constrain() {
        let g = graph(&[("a", &[], false), ("b", &["a"], false)]);
        let plan = batch_packages(&g, &names(&["b"]), GraphType::Runtime, true).unwrap();
        assert_eq!(plan.batches, vec![names(&["b"])]);
    }

    #[test]
    fn test_dev_edges_only_count_for_all() {
        let g = PackageGraph::build(vec![
            manifest("packages/a", json!({"name": "a", "version": "1.0.0"})),
            manifest(
                "packages/b",
                json!({"name": "b", "version": "1.0.0", "devDependencies": {"a": "^1.0.0"}}),
            ),
        ])
        .unwrap();

        let runtime = batch_packages(&g, &names(&["a", "b"]), GraphType::Runtime, true).unwrap();
        assert_eq!(runtime.batches, vec![names(&["a", "b"])]);

        let all = batch_packages(&g, &names(&["a", "b"]), GraphType::All, true).unwrap();
        assert_eq!(all.batches, vec![names(&["a"]), names(&["b"])]);
    }

    #[test]
    fn test_batch_invariant_on_diamond() {
        let g = graph(&[
            ("base", &[], false),
            ("left", &["base"], false),
            ("right", &["base"], false),
            ("top", &["left", "right"], false),
        ]);
        let set = names(&["top", "right", "left", "base"]);
        let plan = batch_packages(&g, &set, GraphType::Runtime, true).unwrap();

        let position: BTreeMap<&str, usize> = plan
            .batches
            .iter()
            .enumerate()
            .flat_map(|(i, b)| b.iter().map(move |n| (n.as_str(), i)))
            .collect();
        for name in &set {
            for dep in g.get(name).unwrap().dependency_names(GraphType::Runtime) {
                assert!(position[dep] < position[name.as_str()]);
            }
        }
        assert_eq!(plan.batches[1], names(&["left", "right"]));
    }

    #[test]
    fn test_cycle_is_reported_and_degraded() {
        let g = graph(&[
            ("a", &["b"], false),
            ("b", &["a"], false),
            ("c", &["a"], false),
            ("d", &[], false),
        ]);
        let plan =
            batch_packages(&g, &names(&["a", "b", "c", "d"]), GraphType::Runtime, true).unwrap();

        assert_eq!(plan.cycle_descriptions(), vec!["a -> b -> a".to_string()]);
        assert_eq!(
            plan.batches,
            vec![names(&["d"]), names(&["a", "b"]), names(&["c"])]
        );
        assert!(plan.ensure_acyclic().is_err());
    }

    #[test]
    fn test_unknown_package_is_an_error() {
        let g = graph(&[("a", &[], false)]);
        assert!(batch_packages(&g, &names(&["zzz"]), GraphType::Runtime, true).is_err());
    }
}

//! Dependency graph over a workflow's stages.
//!
//! Edges point from a stage to the stages it depends on. Dependencies on
//! names that are not defined are dropped; the validator reports them.

use crate::core::Stage;
use crate::errors::CycleDetectedError;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// Returns the `name -> dependencies` map, with empty lists for roots.
/// Repeated dependencies appear once.
#[must_use]
pub fn build_dependency_map(stages: &[Stage]) -> HashMap<String, Vec<String>> {
    stages
        .iter()
        .map(|s| {
            let mut seen = HashSet::with_capacity(s.depends_on.len());
            let deps = s
                .depends_on
                .iter()
                .filter(|dep| seen.insert(dep.as_str()))
                .cloned()
                .collect();
            (s.name.clone(), deps)
        })
        .collect()
}

/// Returns true if the stages' dependencies form a cycle.
#[must_use]
pub fn has_cycle(stages: &[Stage]) -> bool {
    find_cycle(stages).is_some()
}

/// Returns the first cycle found, walking roots in definition order. The
/// first stage of the cycle is repeated at the end.
#[must_use]
pub fn find_cycle(stages: &[Stage]) -> Option<Vec<String>> {
    DependencyGraph::build(stages).find_cycle()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Indexed view of a workflow's dependency structure.
///
/// Stages are addressed by their position in definition order. When a name
/// is defined twice the first definition wins.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    names: Vec<String>,
    index: HashMap<String, usize>,
    dependencies: Vec<Vec<usize>>,
    dependents: Vec<Vec<usize>>,
    dependency_map: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Builds the graph for `stages`.
    #[must_use]
    pub fn build(stages: &[Stage]) -> Self {
        let names: Vec<String> = stages.iter().map(|s| s.name.clone()).collect();
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            index.entry(name.clone()).or_insert(i);
        }

        let mut dependencies = vec![Vec::new(); names.len()];
        let mut dependents = vec![Vec::new(); names.len()];
        for (i, stage) in stages.iter().enumerate() {
            for dep in &stage.depends_on {
                if let Some(&d) = index.get(dep) {
                    if dependencies[i].contains(&d) {
                        continue;
                    }
                    dependencies[i].push(d);
                    dependents[d].push(i);
                }
            }
        }

        Self {
            names,
            index,
            dependencies,
            dependents,
            dependency_map: build_dependency_map(stages),
        }
    }

    /// Returns the `name -> dependencies` map.
    #[must_use]
    pub fn dependencies(&self) -> &HashMap<String, Vec<String>> {
        &self.dependency_map
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if the graph has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns the stages that directly depend on `name`.
    #[must_use]
    pub fn dependents(&self, name: &str) -> Vec<String> {
        self.index
            .get(name)
            .map(|&i| self.names_of(self.dependents[i].iter().copied()))
            .unwrap_or_default()
    }

    /// Returns every stage that transitively depends on `name`, in
    /// definition order.
    #[must_use]
    pub fn descendants(&self, name: &str) -> Vec<String> {
        self.index
            .get(name)
            .map(|&i| self.names_of(self.descendant_indices(i)))
            .unwrap_or_default()
    }

    /// Returns the stages without dependencies, in definition order.
    #[must_use]
    pub fn roots(&self) -> Vec<String> {
        self.names_of((0..self.len()).filter(|&i| self.dependencies[i].is_empty()))
    }

    /// Returns a topological order (dependencies first), breaking ties by
    /// definition order.
    ///
    /// # Errors
    ///
    /// Returns the offending cycle if the graph is cyclic.
    pub fn topological_order(&self) -> Result<Vec<String>, CycleDetectedError> {
        let mut in_degree: Vec<usize> = self.dependencies.iter().map(Vec::len).collect();
        let mut ready: BTreeSet<usize> = (0..self.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(self.len());

        while let Some(i) = ready.pop_first() {
            order.push(i);
            for &child in &self.dependents[i] {
                in_degree[child] -= 1;
                if in_degree[child] == 0 {
                    ready.insert(child);
                }
            }
        }

        if order.len() < self.len() {
            let cycle = self.find_cycle().unwrap_or_default();
            return Err(CycleDetectedError::new(cycle));
        }
        Ok(self.names_of(order))
    }

    /// Iterative three-colour depth-first search; a back edge to an
    /// in-progress stage closes a cycle.
    #[must_use]
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut marks = vec![Mark::Unvisited; self.len()];

        for root in 0..self.len() {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            marks[root] = Mark::InProgress;
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];

            while let Some(frame) = stack.last_mut() {
                let (node, next) = *frame;
                let Some(&dep) = self.dependencies[node].get(next) else {
                    marks[node] = Mark::Done;
                    stack.pop();
                    continue;
                };
                frame.1 += 1;

                match marks[dep] {
                    Mark::Unvisited => {
                        marks[dep] = Mark::InProgress;
                        stack.push((dep, 0));
                    }
                    Mark::InProgress => {
                        let start = stack.iter().position(|&(n, _)| n == dep).unwrap_or(0);
                        let mut cycle =
                            self.names_of(stack[start..].iter().map(|&(n, _)| n));
                        cycle.push(self.names[dep].clone());
                        return Some(cycle);
                    }
                    Mark::Done => {}
                }
            }
        }
        None
    }

    pub(crate) fn name(&self, i: usize) -> &str {
        &self.names[i]
    }

    pub(crate) fn dependency_indices(&self, i: usize) -> &[usize] {
        &self.dependencies[i]
    }

    /// Transitive dependents of stage `i`, sorted by definition order.
    pub(crate) fn descendant_indices(&self, i: usize) -> Vec<usize> {
        let mut seen = vec![false; self.len()];
        let mut queue: VecDeque<usize> = self.dependents[i].iter().copied().collect();
        while let Some(next) = queue.pop_front() {
            if !seen[next] {
                seen[next] = true;
                queue.extend(self.dependents[next].iter().copied());
            }
        }
        (0..self.len()).filter(|&j| seen[j] && j != i).collect()
    }

    fn names_of(&self, indices: impl IntoIterator<Item = usize>) -> Vec<String> {
        indices.into_iter().map(|i| self.names[i].clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::diamond;
    use pretty_assertions::assert_eq;

    fn stage(name: &str, deps: &[&str]) -> Stage {
        Stage::command(name, "true").with_dependencies(deps.iter().copied())
    }

    #[test]
    fn test_dependency_map_includes_roots() {
        let map = build_dependency_map(&diamond().stages);
        assert_eq!(map["a"], Vec::<String>::new());
        assert_eq!(map["d"], vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_repeated_dependency_is_one_edge() {
        let mut deploy = stage("deploy", &["build"]);
        deploy.depends_on.push("build".to_string());
        let stages = vec![stage("build", &[]), deploy];

        let graph = DependencyGraph::build(&stages);
        assert_eq!(graph.dependencies()["deploy"], vec!["build".to_string()]);
        assert_eq!(graph.dependents("build"), vec!["deploy"]);
    }

    #[test]
    fn test_diamond_queries() {
        let graph = DependencyGraph::build(&diamond().stages);

        assert_eq!(graph.roots(), vec!["a"]);
        assert_eq!(graph.dependents("a"), vec!["b", "c"]);
        assert_eq!(graph.descendants("a"), vec!["b", "c", "d"]);
        assert_eq!(graph.descendants("d"), Vec::<String>::new());
        assert_eq!(graph.topological_order().unwrap(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_topological_order_breaks_ties_by_definition_order() {
        let stages = vec![stage("late", &["z"]), stage("z", &[]), stage("early", &[])];
        let graph = DependencyGraph::build(&stages);
        assert_eq!(graph.topological_order().unwrap(), vec!["z", "late", "early"]);
    }

    #[test]
    fn test_self_loop() {
        let stages = vec![stage("a", &["a"])];
        assert!(has_cycle(&stages));
        assert_eq!(find_cycle(&stages).unwrap(), vec!["a", "a"]);
    }

    #[test]
    fn test_multi_node_cycle_path() {
        let stages = vec![stage("a", &["c"]), stage("b", &["a"]), stage("c", &["b"])];
        assert_eq!(find_cycle(&stages).unwrap(), vec!["a", "c", "b", "a"]);

        let err = DependencyGraph::build(&stages).topological_order().unwrap_err();
        assert_eq!(err.cycle_path.len(), 4);
    }

    #[test]
    fn test_acyclic_graphs() {
        assert!(!has_cycle(&diamond().stages));
        assert!(!has_cycle(&[]));
        assert!(!has_cycle(&[stage("a", &["ghost"])]));
    }

    #[test]
    fn test_long_chain_does_not_overflow() {
        let stages: Vec<Stage> = (0..20_000)
            .map(|i| {
                let s = Stage::command(format!("s{i}"), "true");
                if i == 0 {
                    s
                } else {
                    s.depends_on(format!("s{}", i - 1))
                }
            })
            .collect();

        assert!(!has_cycle(&stages));
        let graph = DependencyGraph::build(&stages);
        assert_eq!(graph.descendants("s0").len(), 19_999);
    }
}

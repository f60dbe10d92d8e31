//! Dependency ordering for services.
//!
//! A depth-first traversal with three marks (unvisited, in progress, done)
//! produces a dependencies-first order and reports the exact cycle path when it
//! walks back into a node that is still in progress. Ties are broken by input
//! order so the same input always yields the same order.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::debug;

use devenv_core::{CycleError, DevEnvError, EntityKind, ValidationError};

use crate::model::Service;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Dependency graph over a set of named nodes.
///
/// Edges pointing at unknown nodes are kept aside as dangling references rather
/// than silently dropped; [`DependencyGraph::check_references`] reports them.
#[derive(Debug, Clone)]
pub struct DependencyGraph<'a> {
    nodes: Vec<&'a str>,
    index: HashMap<&'a str, usize>,
    /// `edges[i]` are the indices node `i` depends on, sorted by input order.
    edges: Vec<Vec<usize>>,
    dangling: Vec<(&'a str, &'a str)>,
}

impl<'a> DependencyGraph<'a> {
    /// Build a graph from `(name, dependencies)` pairs; input order is the tie-breaker.
    pub fn new<I, D>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, D)>,
        D: IntoIterator<Item = &'a String>,
    {
        let entries: Vec<(&'a str, Vec<&'a String>)> = entries
            .into_iter()
            .map(|(name, deps)| (name, deps.into_iter().collect()))
            .collect();

        let mut index = HashMap::with_capacity(entries.len());
        let mut nodes = Vec::with_capacity(entries.len());
        for (name, _) in &entries {
            if !index.contains_key(name) {
                index.insert(*name, nodes.len());
                nodes.push(*name);
            }
        }

        let mut edges = vec![Vec::new(); nodes.len()];
        let mut dangling = Vec::new();
        for (name, deps) in &entries {
            let from = index[name];
            for dep in deps {
                match index.get(dep.as_str()) {
                    Some(&to) => edges[from].push(to),
                    None => dangling.push((*name, dep.as_str())),
                }
            }
        }
        for targets in &mut edges {
            targets.sort_unstable();
            targets.dedup();
        }

        Self {
            nodes,
            index,
            edges,
            dangling,
        }
    }

    pub fn from_services<I>(services: I) -> Self
    where
        I: IntoIterator<Item = &'a Service>,
    {
        Self::new(
            services
                .into_iter()
                .map(|s| (s.name.as_str(), s.dependencies.iter())),
        )
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Fail on the first dependency that names an unknown node.
    pub fn check_references(&self) -> Result<(), ValidationError> {
        match self.dangling.first() {
            Some((service, dependency)) => Err(ValidationError::UnknownReference {
                service: service.to_string(),
                dependency: dependency.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Every node, dependencies first.
    pub fn topological_order(&self) -> Result<Vec<String>, CycleError> {
        let starts: Vec<usize> = (0..self.nodes.len()).collect();
        self.traverse(&starts)
    }

    /// `roots` plus their transitive dependencies, dependencies first.
    ///
    /// Fails if a root is unknown or a reachable node has a dangling dependency.
    pub fn closure<'r, R>(&self, roots: R) -> Result<Vec<String>, DevEnvError>
    where
        R: IntoIterator<Item = &'r str>,
    {
        let mut starts = Vec::new();
        for root in roots {
            match self.index.get(root) {
                Some(&i) => starts.push(i),
                None => return Err(DevEnvError::not_found(EntityKind::Service, root)),
            }
        }
        starts.sort_unstable();
        starts.dedup();

        let order = self.traverse(&starts)?;
        if let Some((service, dependency)) = self
            .dangling
            .iter()
            .find(|(service, _)| order.iter().any(|n| n == service))
        {
            return Err(ValidationError::UnknownReference {
                service: service.to_string(),
                dependency: dependency.to_string(),
            }
            .into());
        }
        Ok(order)
    }

    /// Nodes that list `name` as a direct dependency, in input order.
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        let Some(&target) = self.index.get(name) else {
            return Vec::new();
        };
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, deps)| deps.binary_search(&target).is_ok())
            .map(|(i, _)| self.nodes[i].to_string())
            .collect()
    }

    fn traverse(&self, starts: &[usize]) -> Result<Vec<String>, CycleError> {
        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        let mut path = Vec::new();
        let mut order = Vec::new();

        for &start in starts {
            if marks[start] == Mark::Unvisited {
                self.visit(start, &mut marks, &mut path, &mut order)?;
            }
        }

        debug!("Resolved dependency order over {} node(s)", order.len());
        Ok(order
            .into_iter()
            .map(|i| self.nodes[i].to_string())
            .collect())
    }

    fn visit(
        &self,
        node: usize,
        marks: &mut [Mark],
        path: &mut Vec<usize>,
        order: &mut Vec<usize>,
    ) -> Result<(), CycleError> {
        marks[node] = Mark::InProgress;
        path.push(node);

        for &dep in &self.edges[node] {
            match marks[dep] {
                Mark::Done => {}
                Mark::InProgress => return Err(self.cycle_through(dep, path)),
                Mark::Unvisited => self.visit(dep, marks, path, order)?,
            }
        }

        path.pop();
        marks[node] = Mark::Done;
        order.push(node);
        Ok(())
    }

    fn cycle_through(&self, repeated: usize, path: &[usize]) -> CycleError {
        let start = path.iter().position(|&n| n == repeated).unwrap_or(0);
        let mut cycle: Vec<String> = path[start..]
            .iter()
            .map(|&i| self.nodes[i].to_string())
            .collect();
        cycle.push(self.nodes[repeated].to_string());
        CycleError::new(cycle)
    }
}

/// Validate that `edges` restricted to `services` has no cycle and return a
/// dependencies-first order of `services`. Edges to names outside `services`
/// are not followed.
pub fn validate_acyclic(
    services: &[String],
    edges: &IndexMap<String, Vec<String>>,
) -> Result<Vec<String>, CycleError> {
    let empty = Vec::new();
    let graph = DependencyGraph::new(
        services
            .iter()
            .map(|name| (name.as_str(), edges.get(name).unwrap_or(&empty).iter())),
    );
    graph.topological_order()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges(pairs: &[(&str, &[&str])]) -> (Vec<String>, IndexMap<String, Vec<String>>) {
        let names = pairs.iter().map(|(n, _)| n.to_string()).collect();
        let map = pairs
            .iter()
            .map(|(n, deps)| (n.to_string(), deps.iter().map(|d| d.to_string()).collect()))
            .collect();
        (names, map)
    }

    #[test]
    fn test_dependencies_come_first() {
        let (names, map) = edges(&[("cache", &["db"]), ("db", &[])]);
        assert_eq!(validate_acyclic(&names, &map).unwrap(), vec!["db", "cache"]);
    }

    #[test]
    fn test_ties_follow_input_order() {
        let (names, map) = edges(&[("web", &["redis", "mysql"]), ("mysql", &[]), ("redis", &[])]);
        assert_eq!(
            validate_acyclic(&names, &map).unwrap(),
            vec!["mysql", "redis", "web"]
        );

        let (names, map) = edges(&[("b", &[]), ("a", &[]), ("c", &[])]);
        assert_eq!(validate_acyclic(&names, &map).unwrap(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_cycle_reports_full_path() {
        let (names, map) = edges(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"])]);
        let err = validate_acyclic(&names, &map).unwrap_err();
        assert_eq!(err.path, vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn test_cycle_path_excludes_entry_tail() {
        let (names, map) = edges(&[("web", &["api"]), ("api", &["db"]), ("db", &["api"])]);
        let err = validate_acyclic(&names, &map).unwrap_err();
        assert_eq!(err.path, vec!["api", "db", "api"]);
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let (names, map) = edges(&[("db", &["db"])]);
        let err = validate_acyclic(&names, &map).unwrap_err();
        assert_eq!(err.path, vec!["db", "db"]);
    }

    #[test]
    fn test_closure_only_walks_reachable_nodes() {
        let services = vec![
            Service::new("db", "mysql:8"),
            Service::new("cache", "redis:7").with_dependency("db"),
            Service::new("mail", "mailhog/mailhog"),
        ];
        let graph = DependencyGraph::from_services(&services);

        assert_eq!(graph.closure(["cache"]).unwrap(), vec!["db", "cache"]);
        assert_eq!(graph.closure(["mail"]).unwrap(), vec!["mail"]);
        assert!(matches!(
            graph.closure(["ghost"]),
            Err(DevEnvError::NotFound { .. })
        ));
    }

    #[test]
    fn test_dangling_references_are_reported() {
        let services = vec![Service::new("cache", "redis:7").with_dependency("db")];
        let graph = DependencyGraph::from_services(&services);

        assert_eq!(
            graph.check_references(),
            Err(ValidationError::UnknownReference {
                service: "cache".into(),
                dependency: "db".into(),
            })
        );
        assert!(matches!(
            graph.closure(["cache"]),
            Err(DevEnvError::Validation(ValidationError::UnknownReference { .. }))
        ));
    }

    #[test]
    fn test_dependents_of() {
        let services = vec![
            Service::new("db", "mysql:8"),
            Service::new("cache", "redis:7").with_dependency("db"),
            Service::new("api", "api:1").with_dependency("db").with_dependency("cache"),
        ];
        let graph = DependencyGraph::from_services(&services);

        assert_eq!(graph.dependents_of("db"), vec!["cache", "api"]);
        assert!(graph.dependents_of("api").is_empty());
    }
}

// Call graph structures for Durable Lint.
// Edges exist only between declarations of the analyzed project.

use crate::domain::function::{FunctionDeclaration, FunctionId};
use std::collections::{HashMap, VecDeque};

/// A node in the call graph.
#[derive(Debug, Clone)]
pub struct CallGraphNode {
    pub id: FunctionId,
    pub name: String,
    /// Sorted, deduplicated.
    pub callees: Vec<FunctionId>,
}

/// The call graph itself. Node `i` is the declaration at position `i`.
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    pub nodes: Vec<CallGraphNode>,
}

impl CallGraph {
    /// Build edges from every call site whose resolved symbol names a
    /// declaration. Declarations sharing a qualified name all receive the edge.
    pub fn build(functions: &[FunctionDeclaration]) -> Self {
        let mut by_name: HashMap<&str, Vec<FunctionId>> = HashMap::new();
        for (idx, func) in functions.iter().enumerate() {
            by_name
                .entry(func.qualified_name.as_str())
                .or_default()
                .push(FunctionId(idx));
        }

        let mut graph = CallGraph {
            nodes: functions
                .iter()
                .enumerate()
                .map(|(idx, f)| CallGraphNode {
                    id: FunctionId(idx),
                    name: f.qualified_name.clone(),
                    callees: Vec::new(),
                })
                .collect(),
        };

        for (idx, func) in functions.iter().enumerate() {
            for site in &func.call_sites {
                let Some(symbol) = site.target.qualified_name() else {
                    continue;
                };
                if let Some(callees) = by_name.get(symbol) {
                    for callee in callees {
                        graph.add_edge(FunctionId(idx), *callee);
                    }
                }
            }
        }

        for node in &mut graph.nodes {
            node.callees.sort();
            node.callees.dedup();
        }
        graph
    }

    pub fn add_edge(&mut self, caller: FunctionId, callee: FunctionId) {
        if callee.0 >= self.nodes.len() {
            return;
        }
        if let Some(node) = self.nodes.get_mut(caller.0) {
            node.callees.push(callee);
        }
    }

    pub fn callees(&self, id: FunctionId) -> &[FunctionId] {
        self.nodes
            .get(id.0)
            .map(|n| n.callees.as_slice())
            .unwrap_or(&[])
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.callees.len()).sum()
    }

    /// Breadth-first closure over `roots`. Roots are visited in ascending id
    /// order so the recorded parents (and hence `origin`) are stable.
    pub fn reachable<I>(&self, roots: I) -> Reachability
    where
        I: IntoIterator<Item = FunctionId>,
    {
        let mut roots: Vec<FunctionId> = roots
            .into_iter()
            .filter(|r| r.0 < self.nodes.len())
            .collect();
        roots.sort();
        roots.dedup();

        let mut parent: HashMap<FunctionId, Option<FunctionId>> = HashMap::new();
        let mut queue = VecDeque::new();
        for root in roots {
            parent.insert(root, None);
            queue.push_back(root);
        }

        while let Some(current) = queue.pop_front() {
            for &callee in self.callees(current) {
                if parent.contains_key(&callee) {
                    continue;
                }
                parent.insert(callee, Some(current));
                queue.push_back(callee);
            }
        }

        Reachability { parent }
    }
}

/// Result of a reachability query: the visited set plus BFS parents.
#[derive(Debug, Clone, Default)]
pub struct Reachability {
    parent: HashMap<FunctionId, Option<FunctionId>>,
}

impl Reachability {
    pub fn contains(&self, id: FunctionId) -> bool {
        self.parent.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Sorted member ids.
    pub fn members(&self) -> Vec<FunctionId> {
        let mut ids: Vec<FunctionId> = self.parent.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Root-to-`id` path, or empty if `id` is not reachable.
    pub fn path_to(&self, id: FunctionId) -> Vec<FunctionId> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            match self.parent.get(&node) {
                Some(prev) => {
                    path.push(node);
                    current = *prev;
                }
                None => return Vec::new(),
            }
        }
        path.reverse();
        path
    }

    /// The root from which `id` was first reached.
    pub fn origin(&self, id: FunctionId) -> Option<FunctionId> {
        self.path_to(id).first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::function::CallSite;
    use crate::domain::symbol::{Resolution, SourceLocation};

    fn decl(idx: usize, name: &str, calls: &[&str]) -> FunctionDeclaration {
        let loc = SourceLocation::new("lib.rs", idx + 1, 1);
        let mut f = FunctionDeclaration::new(FunctionId(idx), name, loc.clone());
        for callee in calls {
            f.call_sites.push(CallSite::new(
                FunctionId(idx),
                Resolution::resolved(*callee),
                loc.clone(),
            ));
        }
        f
    }

    #[test]
    fn test_external_calls_do_not_become_edges() {
        let functions = vec![
            decl(0, "app::main", &["app::helper", "std::thread::sleep"]),
            decl(1, "app::helper", &[]),
        ];
        let graph = CallGraph::build(&functions);
        assert_eq!(graph.callees(FunctionId(0)), &[FunctionId(1)]);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_reachability_terminates_on_cycles() {
        let functions = vec![
            decl(0, "app::a", &["app::b"]),
            decl(1, "app::b", &["app::a", "app::c"]),
            decl(2, "app::c", &["app::c"]),
            decl(3, "app::unrelated", &["app::a"]),
        ];
        let graph = CallGraph::build(&functions);
        let reach = graph.reachable([FunctionId(0)]);
        assert_eq!(reach.members(), vec![FunctionId(0), FunctionId(1), FunctionId(2)]);
        assert!(!reach.contains(FunctionId(3)));
        assert_eq!(
            reach.path_to(FunctionId(2)),
            vec![FunctionId(0), FunctionId(1), FunctionId(2)]
        );
    }

    #[test]
    fn test_reachability_independent_of_root_order() {
        let functions = vec![
            decl(0, "app::a", &["app::c"]),
            decl(1, "app::b", &["app::c"]),
            decl(2, "app::c", &[]),
        ];
        let graph = CallGraph::build(&functions);
        let forward = graph.reachable([FunctionId(0), FunctionId(1)]);
        let backward = graph.reachable([FunctionId(1), FunctionId(0)]);
        assert_eq!(forward.members(), backward.members());
        assert_eq!(forward.origin(FunctionId(2)), backward.origin(FunctionId(2)));
        assert_eq!(forward.origin(FunctionId(2)), Some(FunctionId(0)));
    }

    #[test]
    fn test_duplicate_names_link_every_declaration() {
        let functions = vec![
            decl(0, "app::main", &["app::platform::pause"]),
            decl(1, "app::platform::pause", &[]),
            decl(2, "app::platform::pause", &[]),
        ];
        let graph = CallGraph::build(&functions);
        assert_eq!(graph.callees(FunctionId(0)), &[FunctionId(1), FunctionId(2)]);
    }
}

//! A directed graph with deterministic traversal order.
//!
//! Nodes and adjacency sets are kept in `BTreeMap`/`BTreeSet`, so every
//! traversal, component listing and topological order is a pure function
//! of the graph's contents.

use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
pub struct DirectedGraph<N> {
    successors: BTreeMap<N, BTreeSet<N>>,
    predecessors: BTreeMap<N, BTreeSet<N>>,
}

impl<N> Default for DirectedGraph<N> {
    fn default() -> Self {
        Self {
            successors: BTreeMap::new(),
            predecessors: BTreeMap::new(),
        }
    }
}

impl<N: Ord + Clone> DirectedGraph<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: N) {
        self.successors.entry(node.clone()).or_default();
        self.predecessors.entry(node).or_default();
    }

    /// Remove a node and every edge touching it.
    pub fn remove_node(&mut self, node: &N) {
        if let Some(succs) = self.successors.remove(node) {
            for s in &succs {
                if let Some(preds) = self.predecessors.get_mut(s) {
                    preds.remove(node);
                }
            }
        }
        if let Some(preds) = self.predecessors.remove(node) {
            for p in &preds {
                if let Some(succs) = self.successors.get_mut(p) {
                    succs.remove(node);
                }
            }
        }
    }

    /// Add an edge, adding either endpoint if missing.
    pub fn add_edge(&mut self, from: N, to: N) {
        self.add_node(from.clone());
        self.add_node(to.clone());
        if let Some(succs) = self.successors.get_mut(&from) {
            succs.insert(to.clone());
        }
        if let Some(preds) = self.predecessors.get_mut(&to) {
            preds.insert(from);
        }
    }

    pub fn has_node(&self, node: &N) -> bool {
        self.successors.contains_key(node)
    }

    pub fn has_edge(&self, from: &N, to: &N) -> bool {
        self.successors.get(from).is_some_and(|s| s.contains(to))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.successors.keys()
    }

    pub fn len(&self) -> usize {
        self.successors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.successors.is_empty()
    }

    pub fn successors(&self, node: &N) -> impl Iterator<Item = &N> {
        self.successors.get(node).into_iter().flatten()
    }

    pub fn predecessors(&self, node: &N) -> impl Iterator<Item = &N> {
        self.predecessors.get(node).into_iter().flatten()
    }

    /// True when the node has no outgoing edges.
    pub fn is_leaf(&self, node: &N) -> bool {
        self.successors.get(node).map_or(true, BTreeSet::is_empty)
    }

    /// All nodes reachable from `sources` (inclusive). Sources absent from the graph are skipped.
    pub fn reachable_from<'a>(&self, sources: impl IntoIterator<Item = &'a N>) -> BTreeSet<N>
    where
        N: 'a,
    {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&N> = sources.into_iter().filter(|n| self.has_node(n)).collect();
        while let Some(node) = stack.pop() {
            if seen.insert(node.clone()) {
                stack.extend(self.successors(node).filter(|s| !seen.contains(*s)));
            }
        }
        seen
    }

    /// Strongly connected components of the subgraph induced by `within`.
    ///
    /// Iterative Tarjan. Each component is sorted; components are returned
    /// sorted by their smallest node.
    pub fn strongly_connected_components(&self, within: &BTreeSet<N>) -> Vec<Vec<N>> {
        let mut index: BTreeMap<N, usize> = BTreeMap::new();
        let mut lowlink: BTreeMap<N, usize> = BTreeMap::new();
        let mut on_stack: BTreeSet<N> = BTreeSet::new();
        let mut stack: Vec<N> = Vec::new();
        let mut components: Vec<Vec<N>> = Vec::new();
        let mut next_index = 0;

        let successors_within = |node: &N| -> Vec<N> {
            self.successors(node)
                .filter(|s| within.contains(*s))
                .cloned()
                .collect()
        };

        for root in within {
            if index.contains_key(root) || !self.has_node(root) {
                continue;
            }

            // Frames: (node, successors, next successor position)
            let mut work: Vec<(N, Vec<N>, usize)> = Vec::new();
            index.insert(root.clone(), next_index);
            lowlink.insert(root.clone(), next_index);
            next_index += 1;
            stack.push(root.clone());
            on_stack.insert(root.clone());
            work.push((root.clone(), successors_within(root), 0));

            while let Some(frame) = work.last_mut() {
                if frame.2 < frame.1.len() {
                    let next = frame.1[frame.2].clone();
                    frame.2 += 1;
                    let node = frame.0.clone();

                    if !index.contains_key(&next) {
                        index.insert(next.clone(), next_index);
                        lowlink.insert(next.clone(), next_index);
                        next_index += 1;
                        stack.push(next.clone());
                        on_stack.insert(next.clone());
                        let succs = successors_within(&next);
                        work.push((next, succs, 0));
                    } else if on_stack.contains(&next) {
                        let low = lowlink[&node].min(index[&next]);
                        lowlink.insert(node, low);
                    }
                    continue;
                }

                let node = frame.0.clone();
                work.pop();
                if let Some((parent, _, _)) = work.last() {
                    let low = lowlink[parent].min(lowlink[&node]);
                    lowlink.insert(parent.clone(), low);
                }
                if lowlink[&node] == index[&node] {
                    let mut component = Vec::new();
                    while let Some(member) = stack.pop() {
                        on_stack.remove(&member);
                        let done = member == node;
                        component.push(member);
                        if done {
                            break;
                        }
                    }
                    component.sort();
                    components.push(component);
                }
            }
        }

        components.sort();
        components
    }

    /// Components of `within` that form cycles: more than one node, or a self-loop.
    pub fn cycles(&self, within: &BTreeSet<N>) -> Vec<Vec<N>> {
        self.strongly_connected_components(within)
            .into_iter()
            .filter(|c| c.len() > 1 || self.has_edge(&c[0], &c[0]))
            .collect()
    }

    /// Topological order of the subgraph induced by `within`.
    ///
    /// Kahn's algorithm; among ready nodes the smallest comes first. Nodes
    /// on or behind a cycle are omitted.
    pub fn topological_order(&self, within: &BTreeSet<N>) -> Vec<N> {
        let mut in_degree: BTreeMap<&N, usize> = within
            .iter()
            .filter(|n| self.has_node(n))
            .map(|n| {
                let degree = self.predecessors(n).filter(|p| within.contains(*p)).count();
                (n, degree)
            })
            .collect();

        let mut ready: BTreeSet<&N> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(n, _)| *n)
            .collect();

        let mut order = Vec::with_capacity(in_degree.len());
        while let Some(node) = ready.pop_first() {
            order.push(node.clone());
            for succ in self.successors(node) {
                if let Some(degree) = in_degree.get_mut(succ) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(succ);
                    }
                }
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&'static str, &'static str)]) -> DirectedGraph<&'static str> {
        let mut g = DirectedGraph::new();
        for (a, b) in edges {
            g.add_edge(*a, *b);
        }
        g
    }

    fn set(items: &[&'static str]) -> BTreeSet<&'static str> {
        items.iter().copied().collect()
    }

    #[test]
    fn test_remove_node_drops_edges() {
        let mut g = graph(&[("a", "b"), ("b", "c")]);
        g.remove_node(&"b");
        assert!(!g.has_node(&"b"));
        assert!(g.is_leaf(&"a"));
        assert_eq!(g.predecessors(&"c").count(), 0);
        assert_eq!(g.len(), 2);
    }

    #[test]
    fn test_reachable() {
        let g = graph(&[("a", "b"), ("b", "c"), ("d", "c")]);
        assert_eq!(g.reachable_from(&["a"]), set(&["a", "b", "c"]));
        assert_eq!(g.reachable_from(&["c"]), set(&["c"]));
        assert_eq!(g.reachable_from(&["zzz"]), set(&[]));
    }

    #[test]
    fn test_scc_finds_cycles() {
        let g = graph(&[("a", "b"), ("b", "a"), ("b", "c"), ("d", "d")]);
        let all = set(&["a", "b", "c", "d"]);
        assert_eq!(
            g.strongly_connected_components(&all),
            vec![vec!["a", "b"], vec!["c"], vec!["d"]]
        );
        assert_eq!(g.cycles(&all), vec![vec!["a", "b"], vec!["d"]]);
    }

    #[test]
    fn test_scc_restricted_to_subset() {
        let g = graph(&[("a", "b"), ("b", "a")]);
        assert!(g.cycles(&set(&["a"])).is_empty());
    }

    #[test]
    fn test_long_chain_does_not_recurse() {
        let names: Vec<String> = (0..10_000).map(|i| format!("n{i:05}")).collect();
        let mut g = DirectedGraph::new();
        for pair in names.windows(2) {
            g.add_edge(pair[0].clone(), pair[1].clone());
        }
        g.add_edge(names[names.len() - 1].clone(), names[0].clone());
        let all: BTreeSet<String> = names.iter().cloned().collect();
        let cycles = g.cycles(&all);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), names.len());
    }

    #[test]
    fn test_topological_order_breaks_ties_by_node() {
        let g = graph(&[("c", "d"), ("a", "d"), ("b", "a")]);
        let all = set(&["a", "b", "c", "d"]);
        assert_eq!(g.topological_order(&all), vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn test_topological_order_skips_cycles() {
        let g = graph(&[("a", "b"), ("b", "a"), ("b", "c"), ("x", "y")]);
        let order = g.topological_order(&set(&["a", "b", "c", "x", "y"]));
        assert_eq!(order, vec!["x", "y"]);
    }
}

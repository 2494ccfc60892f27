//! Graph iteration utilities and algorithms.
//!
//! Iterators over nodes and edges plus the ordering/cycle algorithms the
//! compiler and runner rely on:
//!
//! - [`topological_sort`]: deterministic Kahn ordering
//! - [`find_cycle`]: extract the members of one directed cycle, if any

use crate::types::NodeKind;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

/// Iterator over registered node kinds.
///
/// Does not include virtual `Start` or `End`, which are never stored in the
/// node registry.
pub struct NodesIter<'a> {
    inner: std::collections::hash_map::Keys<'a, NodeKind, std::sync::Arc<dyn crate::node::Node>>,
}

impl<'a> NodesIter<'a> {
    pub(super) fn new(
        inner: std::collections::hash_map::Keys<'a, NodeKind, std::sync::Arc<dyn crate::node::Node>>,
    ) -> Self {
        Self { inner }
    }
}

impl<'a> Iterator for NodesIter<'a> {
    type Item = &'a NodeKind;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a> ExactSizeIterator for NodesIter<'a> {}

/// Iterator over edges as (source, target) pairs.
///
/// Includes edges from/to the virtual endpoints. Iteration order follows
/// hash-map order and is not deterministic.
pub struct EdgesIter<'a> {
    outer: std::collections::hash_map::Iter<'a, NodeKind, Vec<NodeKind>>,
    current_from: Option<&'a NodeKind>,
    current_targets: std::slice::Iter<'a, NodeKind>,
}

impl<'a> EdgesIter<'a> {
    pub(super) fn new(edges: &'a FxHashMap<NodeKind, Vec<NodeKind>>) -> Self {
        let mut outer = edges.iter();
        let (current_from, current_targets) = match outer.next() {
            Some((from, targets)) => (Some(from), targets.iter()),
            None => (None, [].iter()),
        };
        Self {
            outer,
            current_from,
            current_targets,
        }
    }
}

impl<'a> Iterator for EdgesIter<'a> {
    type Item = (&'a NodeKind, &'a NodeKind);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(to) = self.current_targets.next() {
                return Some((self.current_from.expect("targets imply a source"), to));
            }
            match self.outer.next() {
                Some((from, targets)) => {
                    self.current_from = Some(from);
                    self.current_targets = targets.iter();
                }
                None => return None,
            }
        }
    }
}

/// Ordering used to break ties deterministically: Start first, End last,
/// custom nodes lexicographic.
fn deterministic_order(a: &NodeKind, b: &NodeKind) -> std::cmp::Ordering {
    match (a, b) {
        (NodeKind::Start, NodeKind::Start) | (NodeKind::End, NodeKind::End) => {
            std::cmp::Ordering::Equal
        }
        (NodeKind::Start, _) => std::cmp::Ordering::Less,
        (_, NodeKind::Start) => std::cmp::Ordering::Greater,
        (NodeKind::End, _) => std::cmp::Ordering::Greater,
        (_, NodeKind::End) => std::cmp::Ordering::Less,
        (NodeKind::Custom(a_name), NodeKind::Custom(b_name)) => a_name.cmp(b_name),
    }
}

/// Kahn's algorithm for topological sorting.
///
/// Returns nodes in dependency order with deterministic lexicographic
/// tie-breaks; `Start` is always first and `End` last. On a cyclic input the
/// ordering silently excludes cycle members; callers needing validation use
/// [`find_cycle`].
pub(crate) fn topological_sort(edges: &FxHashMap<NodeKind, Vec<NodeKind>>) -> Vec<NodeKind> {
    let (mut in_degree, all_nodes) = in_degrees(edges);

    let mut zero_in_degree: Vec<_> = in_degree
        .iter()
        .filter(|entry| *entry.1 == 0)
        .map(|(node, _)| node.clone())
        .collect();
    zero_in_degree.sort_by(deterministic_order);

    let mut queue: VecDeque<NodeKind> = VecDeque::new();
    queue.extend(zero_in_degree);

    let mut result: Vec<NodeKind> = Vec::with_capacity(all_nodes.len());

    while let Some(node) = queue.pop_front() {
        result.push(node.clone());

        if let Some(neighbors) = edges.get(&node) {
            let mut new_zero: Vec<NodeKind> = Vec::new();
            for neighbor in neighbors {
                if let Some(deg) = in_degree.get_mut(neighbor) {
                    *deg = deg.saturating_sub(1);
                    if *deg == 0 {
                        new_zero.push(neighbor.clone());
                    }
                }
            }
            new_zero.sort_by(deterministic_order);
            queue.extend(new_zero);
        }
    }

    result
}

/// Extract the members of one directed cycle, if the edges contain any.
///
/// Runs Kahn elimination; nodes left with positive in-degree belong to (or
/// feed) a cycle. One concrete cycle is then recovered by walking forward
/// through the leftover set until a node repeats.
pub(crate) fn find_cycle(edges: &FxHashMap<NodeKind, Vec<NodeKind>>) -> Option<Vec<NodeKind>> {
    let sorted = topological_sort(edges);
    let (_, all_nodes) = in_degrees(edges);
    if sorted.len() == all_nodes.len() {
        return None;
    }

    let eliminated: FxHashSet<NodeKind> = sorted.into_iter().collect();
    let mut leftover: FxHashSet<NodeKind> = all_nodes
        .into_iter()
        .filter(|n| !eliminated.contains(n))
        .collect();

    // Leftovers include nodes merely downstream of a cycle (they keep a
    // positive in-degree without being on one). Trim nodes with no leftover
    // successor until a fixpoint: what remains is the cycle core, where the
    // forward walk below can never dead-end.
    loop {
        let dead_ends: Vec<NodeKind> = leftover
            .iter()
            .filter(|node| {
                edges
                    .get(node)
                    .map(|targets| !targets.iter().any(|t| leftover.contains(t)))
                    .unwrap_or(true)
            })
            .cloned()
            .collect();
        if dead_ends.is_empty() {
            break;
        }
        for node in dead_ends {
            leftover.remove(&node);
        }
    }

    // Walk forward inside the core until a node repeats; the walk must
    // terminate because every core node has a core successor.
    let start = leftover.iter().next()?.clone();
    let mut path: Vec<NodeKind> = Vec::new();
    let mut seen_at: FxHashMap<NodeKind, usize> = FxHashMap::default();
    let mut current = start;

    loop {
        if let Some(&position) = seen_at.get(&current) {
            return Some(path[position..].to_vec());
        }
        seen_at.insert(current.clone(), path.len());
        path.push(current.clone());

        let mut successors: Vec<&NodeKind> = edges
            .get(&current)
            .map(|targets| targets.iter().filter(|t| leftover.contains(t)).collect())
            .unwrap_or_default();
        successors.sort_by(|a, b| deterministic_order(a, b));
        current = (*successors.first()?).clone();
    }
}

fn in_degrees(
    edges: &FxHashMap<NodeKind, Vec<NodeKind>>,
) -> (FxHashMap<NodeKind, usize>, FxHashSet<NodeKind>) {
    let mut in_degree: FxHashMap<NodeKind, usize> = FxHashMap::default();
    let mut all_nodes: FxHashSet<NodeKind> = FxHashSet::default();

    for (from, tos) in edges {
        all_nodes.insert(from.clone());
        in_degree.entry(from.clone()).or_insert(0);
        for to in tos {
            all_nodes.insert(to.clone());
            *in_degree.entry(to.clone()).or_insert(0) += 1;
        }
    }

    (in_degree, all_nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom(name: &str) -> NodeKind {
        NodeKind::Custom(name.to_string())
    }

    #[test]
    fn topological_sort_linear() {
        let mut edges: FxHashMap<NodeKind, Vec<NodeKind>> = FxHashMap::default();
        edges.insert(NodeKind::Start, vec![custom("a")]);
        edges.insert(custom("a"), vec![custom("b")]);
        edges.insert(custom("b"), vec![NodeKind::End]);

        let sorted = topological_sort(&edges);
        assert_eq!(sorted[0], NodeKind::Start);
        assert_eq!(sorted[sorted.len() - 1], NodeKind::End);

        let a_pos = sorted.iter().position(|n| n == &custom("a")).unwrap();
        let b_pos = sorted.iter().position(|n| n == &custom("b")).unwrap();
        assert!(a_pos < b_pos);
    }

    #[test]
    fn topological_sort_diamond_is_deterministic() {
        let mut edges: FxHashMap<NodeKind, Vec<NodeKind>> = FxHashMap::default();
        edges.insert(NodeKind::Start, vec![custom("a"), custom("b")]);
        edges.insert(custom("a"), vec![custom("c")]);
        edges.insert(custom("b"), vec![custom("c")]);
        edges.insert(custom("c"), vec![NodeKind::End]);

        let first = topological_sort(&edges);
        let second = topological_sort(&edges);
        assert_eq!(first, second);

        let a_pos = first.iter().position(|n| n == &custom("a")).unwrap();
        let b_pos = first.iter().position(|n| n == &custom("b")).unwrap();
        let c_pos = first.iter().position(|n| n == &custom("c")).unwrap();
        assert!(a_pos < c_pos && b_pos < c_pos);
        assert!(a_pos < b_pos);
    }

    #[test]
    fn find_cycle_returns_members() {
        let mut edges: FxHashMap<NodeKind, Vec<NodeKind>> = FxHashMap::default();
        edges.insert(NodeKind::Start, vec![custom("a")]);
        edges.insert(custom("a"), vec![custom("b")]);
        edges.insert(custom("b"), vec![custom("c")]);
        edges.insert(custom("c"), vec![custom("a"), NodeKind::End]);

        let members = find_cycle(&edges).expect("cycle expected");
        let names: FxHashSet<_> = members.into_iter().collect();
        assert_eq!(
            names,
            [custom("a"), custom("b"), custom("c")].into_iter().collect()
        );
    }

    #[test]
    fn find_cycle_none_on_dag() {
        let mut edges: FxHashMap<NodeKind, Vec<NodeKind>> = FxHashMap::default();
        edges.insert(NodeKind::Start, vec![custom("a")]);
        edges.insert(custom("a"), vec![NodeKind::End]);
        assert!(find_cycle(&edges).is_none());
    }
}

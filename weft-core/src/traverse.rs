//! Depth-first traversal over anything that exposes outgoing links.
//!
//! The walk keeps a visited set keyed by handle, so every node is seen at
//! most once even when links converge or form cycles.

use crate::error::{GraphError, Result};
use crate::graph::{PageHandle, WebGraph};
use crate::page::PageKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;
use std::ops::ControlFlow;

/// A node container that can enumerate outgoing links.
pub trait LinkSource {
    type Handle: Copy + Eq + Hash + Debug;

    /// Whether the handle resolves to a node.
    fn contains(&self, handle: Self::Handle) -> bool;

    /// Outgoing links of a node, in order.
    fn links(&self, handle: Self::Handle) -> Vec<Self::Handle>;
}

/// Walks the graph depth-first from `root`, calling `visit` once per node.
///
/// Returns the nodes in visit order. The walk ends early when `visit`
/// breaks, and fails with `UnexpectedNode` as soon as it reaches a handle
/// the source cannot resolve.
pub fn traverse<S, F>(source: &S, root: S::Handle, mut visit: F) -> Result<Vec<S::Handle>>
where
    S: LinkSource + ?Sized,
    F: FnMut(S::Handle) -> ControlFlow<()>,
{
    let mut seen = HashSet::new();
    let mut order = Vec::new();
    let mut stack = vec![root];

    while let Some(current) = stack.pop() {
        if !seen.insert(current) {
            continue;
        }
        if !source.contains(current) {
            return Err(GraphError::UnexpectedNode(format!("{:?}", current)));
        }

        order.push(current);
        if visit(current).is_break() {
            break;
        }

        // Reversed so the first link is explored first.
        for link in source.links(current).into_iter().rev() {
            if !seen.contains(&link) {
                stack.push(link);
            }
        }
    }

    Ok(order)
}

/// Number of pages of each kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCounts {
    pub hubs: usize,
    pub authorities: usize,
}

impl KindCounts {
    pub fn total(&self) -> usize {
        self.hubs + self.authorities
    }
}

/// Counts hubs and authorities reachable from `root`.
pub fn count_kinds(graph: &WebGraph, root: PageHandle) -> Result<KindCounts> {
    let mut counts = KindCounts::default();
    traverse(graph, root, |handle| {
        match graph.page(handle).map(|page| page.kind) {
            Some(PageKind::Hub) => counts.hubs += 1,
            Some(PageKind::Authority) => counts.authorities += 1,
            None => {}
        }
        ControlFlow::Continue(())
    })?;
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Adjacency list with an optional dangling link.
    struct Adjacency {
        links: HashMap<u32, Vec<u32>>,
    }

    impl Adjacency {
        fn new(edges: &[(u32, u32)], nodes: &[u32]) -> Self {
            let mut links: HashMap<u32, Vec<u32>> =
                nodes.iter().map(|n| (*n, Vec::new())).collect();
            for (from, to) in edges {
                links.entry(*from).or_default().push(*to);
            }
            Self { links }
        }
    }

    impl LinkSource for Adjacency {
        type Handle = u32;

        fn contains(&self, handle: u32) -> bool {
            self.links.contains_key(&handle)
        }

        fn links(&self, handle: u32) -> Vec<u32> {
            self.links.get(&handle).cloned().unwrap_or_default()
        }
    }

    #[test]
    fn test_preorder_follows_link_order() {
        //     1
        //    / \
        //   2   3
        //   |
        //   4
        let source = Adjacency::new(&[(1, 2), (1, 3), (2, 4)], &[1, 2, 3, 4]);
        let order = traverse(&source, 1, |_| ControlFlow::Continue(())).unwrap();
        assert_eq!(order, vec![1, 2, 4, 3]);
    }

    #[test]
    fn test_diamond_visits_once() {
        let source = Adjacency::new(&[(1, 2), (1, 3), (2, 4), (3, 4)], &[1, 2, 3, 4]);
        let mut calls = Vec::new();
        traverse(&source, 1, |n| {
            calls.push(n);
            ControlFlow::Continue(())
        })
        .unwrap();
        assert_eq!(calls, vec![1, 2, 4, 3]);
    }

    #[test]
    fn test_cycle_no_infinite_loop() {
        // 1 → 2 → 3 → 1
        let source = Adjacency::new(&[(1, 2), (2, 3), (3, 1)], &[1, 2, 3]);
        let order = traverse(&source, 1, |_| ControlFlow::Continue(())).unwrap();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_early_break() {
        let source = Adjacency::new(&[(1, 2), (1, 3), (2, 4)], &[1, 2, 3, 4]);
        let order = traverse(&source, 1, |n| {
            if n == 4 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .unwrap();
        assert_eq!(order, vec![1, 2, 4]);
    }

    #[test]
    fn test_dangling_link_aborts() {
        let source = Adjacency::new(&[(1, 2), (1, 9)], &[1, 2]);
        let err = traverse(&source, 1, |_| ControlFlow::Continue(())).unwrap_err();
        assert_eq!(err, GraphError::UnexpectedNode("9".to_string()));
    }

    #[test]
    fn test_count_kinds() {
        let mut graph = WebGraph::new(PageKind::Hub);
        let root = graph.root();
        let hub = graph.add_child(root, PageKind::Hub).unwrap();
        graph.add_child(hub, PageKind::Authority).unwrap();
        graph.add_child(root, PageKind::Authority).unwrap();
        graph.add_link(hub, root).unwrap();

        let counts = count_kinds(&graph, root).unwrap();
        assert_eq!(counts, KindCounts { hubs: 2, authorities: 2 });
        assert_eq!(counts.total(), 4);
    }
}

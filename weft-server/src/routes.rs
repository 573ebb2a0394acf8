use std::collections::HashMap;
use weft_core::{PageHandle, WebGraph};

/// Maps URL paths to the pages serving them.
///
/// The table is a snapshot. It is rebuilt from a full traversal whenever
/// the graph changes, never patched in place.
#[derive(Debug, Default, Clone)]
pub struct RouteTable {
    by_path: HashMap<String, PageHandle>,
}

impl RouteTable {
    /// Creates a new empty route table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the table for every page reachable from `root`.
    pub fn build(graph: &WebGraph, root: PageHandle) -> weft_core::Result<Self> {
        Ok(Self {
            by_path: graph.path_map(root)?,
        })
    }

    /// Registers a route, replacing any page previously bound to `path`.
    pub fn insert(&mut self, path: String, handle: PageHandle) {
        self.by_path.insert(path, handle);
    }

    /// Resolves a path to a page handle.
    pub fn resolve(&self, path: &str) -> Option<PageHandle> {
        self.by_path.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    /// All routed paths, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.by_path.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    /// Clears the route table.
    pub fn clear(&mut self) {
        self.by_path.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::PageKind;

    #[test]
    fn test_insert_resolve() {
        let graph = WebGraph::new(PageKind::Hub);
        let mut table = RouteTable::new();

        table.insert("/home".to_string(), graph.root());

        assert_eq!(table.resolve("/home"), Some(graph.root()));
        assert_eq!(table.resolve("/away"), None);
        assert_eq!(table.len(), 1);

        table.clear();
        assert!(table.is_empty());
    }

    #[test]
    fn test_build_covers_reachable_pages() {
        let mut graph = WebGraph::new(PageKind::Hub);
        let root = graph.root();
        let hub = graph.add_child(root, PageKind::Hub).unwrap();
        let auth = graph.add_child(hub, PageKind::Authority).unwrap();

        let table = RouteTable::build(&graph, root).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.resolve("/"), Some(root));
        assert_eq!(table.resolve(&graph.path(auth)), Some(auth));
        assert_eq!(table.paths()[0], "/");
    }
}

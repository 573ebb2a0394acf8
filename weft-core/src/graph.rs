//! Core graph data structure.
//!
//! The WebGraph wraps petgraph as an arena of pages addressed by integer
//! handles. Child-to-parent back references live in a separate lookup
//! table, so ownership only ever flows from parent to child.

use crate::error::{GraphError, Result};
use crate::link::{Link, LinkInfo, LinkKind};
use crate::page::{Page, PageId, PageInfo, PageKind, PathStrategy, RenderConfig};
use crate::traverse::{traverse, LinkSource};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::ControlFlow;
use tracing::debug;
use url::Url;

/// Handle of a page inside its graph.
pub type PageHandle = NodeIndex;

/// The page graph of a mock site.
#[derive(Debug)]
pub struct WebGraph {
    graph: DiGraph<Page, Link>,

    /// The page every other page descends from.
    root: PageHandle,

    /// Maps a child to the page that created it.
    parents: HashMap<PageHandle, PageHandle>,

    /// Maps page ids to handles.
    id_index: HashMap<PageId, PageHandle>,
}

impl WebGraph {
    /// Creates a graph holding a single root page with the default config.
    pub fn new(root_kind: PageKind) -> Self {
        Self::with_config(root_kind, RenderConfig::default())
    }

    /// Creates a graph whose root uses the given config.
    pub fn with_config(root_kind: PageKind, config: RenderConfig) -> Self {
        let mut graph = DiGraph::new();
        let id = PageId::new(rand::random());
        let root = graph.add_node(Page::new(id, root_kind, config));

        let mut id_index = HashMap::new();
        id_index.insert(id, root);

        Self {
            graph,
            root,
            parents: HashMap::new(),
            id_index,
        }
    }

    pub fn root(&self) -> PageHandle {
        self.root
    }

    /// Creates a page under `parent` that inherits its render config.
    ///
    /// The new page gets a fresh id and no links, and is appended to
    /// the parent's link list.
    pub fn add_child(&mut self, parent: PageHandle, kind: PageKind) -> Result<PageHandle> {
        let config = self.page_or_err(parent)?.config.clone();
        self.add_child_with(parent, kind, config)
    }

    /// Like `add_child`, with an explicit render config for the new page.
    pub fn add_child_with(
        &mut self,
        parent: PageHandle,
        kind: PageKind,
        config: RenderConfig,
    ) -> Result<PageHandle> {
        self.page_or_err(parent)?;

        let id = self.fresh_id();
        let child = self.graph.add_node(Page::new(id, kind, config));
        self.graph.add_edge(parent, child, Link::child());
        self.parents.insert(child, parent);
        self.id_index.insert(id, child);

        debug!("Added {} page {} under {:?}", kind, id, parent);
        Ok(child)
    }

    /// Adds a plain reference link between two existing pages.
    pub fn add_link(&mut self, from: PageHandle, to: PageHandle) -> Result<()> {
        self.page_or_err(from)?;
        self.page_or_err(to)?;
        self.graph.add_edge(from, to, Link::reference());
        Ok(())
    }

    /// Gets a page by handle.
    pub fn page(&self, handle: PageHandle) -> Option<&Page> {
        self.graph.node_weight(handle)
    }

    /// Gets a page handle by id.
    pub fn find_by_id(&self, id: PageId) -> Option<PageHandle> {
        self.id_index.get(&id).copied()
    }

    /// The page that created `handle`, if any.
    pub fn parent(&self, handle: PageHandle) -> Option<PageHandle> {
        self.parents.get(&handle).copied()
    }

    /// Outgoing links of a page in insertion order.
    pub fn links(&self, handle: PageHandle) -> Vec<PageHandle> {
        self.ordered_links(handle)
            .into_iter()
            .map(|(target, _)| target)
            .collect()
    }

    /// Number of outgoing links of a page.
    pub fn link_count(&self, handle: PageHandle) -> usize {
        self.graph.edges(handle).count()
    }

    /// Number of outgoing links that point at pages of `kind`.
    pub fn count_links_by_kind(&self, handle: PageHandle, kind: PageKind) -> usize {
        self.graph
            .edges(handle)
            .filter(|edge| {
                self.graph
                    .node_weight(edge.target())
                    .map(|page| page.kind == kind)
                    .unwrap_or(false)
            })
            .count()
    }

    /// Derives the URL path of a page from its configured strategy.
    pub fn path(&self, handle: PageHandle) -> String {
        let Some(page) = self.page(handle) else {
            return String::new();
        };

        match &page.config.path_strategy {
            PathStrategy::Ident => self.ident_path(handle, page),
            PathStrategy::Custom(f) => f(self, handle),
        }
    }

    fn ident_path(&self, handle: PageHandle, page: &Page) -> String {
        match self.parent(handle) {
            None if page.config.path_prefix.is_empty() => "/".to_string(),
            None => page.config.path_prefix.clone(),
            Some(parent) => join_path(&self.path(parent), &page.id.to_string()),
        }
    }

    /// Maps the path of every page reachable from `root` to its handle.
    pub fn path_map(&self, root: PageHandle) -> Result<HashMap<String, PageHandle>> {
        let mut map = HashMap::new();
        traverse(self, root, |handle| {
            map.insert(self.path(handle), handle);
            ControlFlow::Continue(())
        })?;
        Ok(map)
    }

    /// Finds the first page reachable from `root` whose path is `path`.
    pub fn find_by_path(&self, root: PageHandle, path: &str) -> Result<Option<PageHandle>> {
        let mut found = None;
        traverse(self, root, |handle| {
            if self.path(handle) == path {
                found = Some(handle);
                return ControlFlow::Break(());
            }
            ControlFlow::Continue(())
        })?;
        Ok(found)
    }

    /// Summarizes a single page.
    pub fn info(&self, handle: PageHandle) -> Option<PageInfo> {
        let page = self.page(handle)?;
        Some(PageInfo {
            id: page.id,
            kind: page.kind,
            path: self.path(handle),
            parent: self
                .parent(handle)
                .and_then(|p| self.page(p))
                .map(|p| p.id),
        })
    }

    /// Exports every page and link reachable from `root`.
    pub fn export(&self, root: PageHandle) -> Result<GraphExport> {
        let visited = traverse(self, root, |_| ControlFlow::Continue(()))?;

        let mut nodes = Vec::with_capacity(visited.len());
        let mut links = Vec::new();
        for handle in visited {
            let info = self
                .info(handle)
                .ok_or_else(|| GraphError::UnexpectedNode(format!("{:?}", handle)))?;
            for (target, kind) in self.ordered_links(handle) {
                if let Some(target_page) = self.page(target) {
                    links.push(LinkInfo {
                        source: info.id,
                        target: target_page.id,
                        kind,
                    });
                }
            }
            nodes.push(info);
        }

        Ok(GraphExport { nodes, links })
    }

    /// Returns the number of pages.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of links.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Iterates over all page handles.
    pub fn handles(&self) -> impl Iterator<Item = PageHandle> + '_ {
        self.graph.node_indices()
    }

    fn ordered_links(&self, handle: PageHandle) -> Vec<(PageHandle, LinkKind)> {
        // petgraph lists edges newest first; edge indexes are never
        // reused since nothing is removed, so they give insertion order.
        let mut edges: Vec<_> = self
            .graph
            .edges(handle)
            .map(|edge| (edge.id(), edge.target(), edge.weight().kind))
            .collect();
        edges.sort_by_key(|(id, _, _)| *id);
        edges
            .into_iter()
            .map(|(_, target, kind)| (target, kind))
            .collect()
    }

    fn page_or_err(&self, handle: PageHandle) -> Result<&Page> {
        self.page(handle)
            .ok_or_else(|| GraphError::UnknownPage(format!("{:?}", handle)))
    }

    fn fresh_id(&self) -> PageId {
        loop {
            let id = PageId::new(rand::random());
            if !self.id_index.contains_key(&id) {
                return id;
            }
        }
    }
}

impl LinkSource for WebGraph {
    type Handle = PageHandle;

    fn contains(&self, handle: PageHandle) -> bool {
        self.graph.node_weight(handle).is_some()
    }

    fn links(&self, handle: PageHandle) -> Vec<PageHandle> {
        self.ordered_links(handle)
            .into_iter()
            .map(|(target, _)| target)
            .collect()
    }
}

/// Joins a URL path and a single segment, percent-encoding the segment.
pub fn join_path(base: &str, segment: &str) -> String {
    let mut url = match Url::parse("http://localhost/") {
        Ok(url) => url,
        Err(_) => return format!("{}/{}", base.trim_end_matches('/'), segment),
    };
    url.set_path(base);
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(segment);
    }
    url.path().to_string()
}

/// Serializable snapshot of the reachable part of a graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphExport {
    pub nodes: Vec<PageInfo>,
    pub links: Vec<LinkInfo>,
}

/// Graph statistics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
}

impl WebGraph {
    /// Returns graph statistics.
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
        }
    }
}

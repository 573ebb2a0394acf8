//! Weft Core - the page graph of a mock website
//!
//! This crate holds the data model every other Weft crate works with:
//! pages of two kinds (hubs and authorities), the links between them,
//! URL path derivation, and a guarded depth-first traversal.
//!
//! # Architecture
//!
//! Pages live in a petgraph arena and are addressed by `PageHandle`.
//! A page owns its outgoing links; the link back to the creating parent
//! is a separate lookup table rather than a pointer, which keeps the
//! ownership tree acyclic while arbitrary reference links may still
//! close cycles.
//!
//! # Example
//!
//! ```
//! use weft_core::{PageKind, WebGraph};
//!
//! let mut graph = WebGraph::new(PageKind::Hub);
//! let root = graph.root();
//! let child = graph.add_child(root, PageKind::Authority).unwrap();
//!
//! assert_eq!(graph.parent(child), Some(root));
//! assert!(graph.path(child).starts_with('/'));
//! ```

mod error;
mod graph;
mod link;
mod page;
mod traverse;

pub use error::{GraphError, Result};
pub use graph::{join_path, GraphExport, GraphStats, PageHandle, WebGraph};
pub use link::{Link, LinkInfo, LinkKind};
pub use page::{
    Page, PageId, PageInfo, PageKind, PageTemplate, PageTemplates, PathFn, PathStrategy,
    RenderConfig,
};
pub use traverse::{count_kinds, traverse, KindCounts, LinkSource};

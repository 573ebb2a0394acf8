//! Structural-change events emitted while the graph grows.

use serde::Serialize;
use weft_core::{PageHandle, PageId, PageKind, WebGraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    Create,
    Delete,
}

/// The page an update refers to, captured when the event was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRef {
    pub handle: PageHandle,
    pub id: PageId,
    pub kind: PageKind,
    pub path: String,
}

impl PageRef {
    /// Captures a page of `graph`. Returns `None` for unknown handles.
    pub fn capture(graph: &WebGraph, handle: PageHandle) -> Option<Self> {
        let page = graph.page(handle)?;
        Some(Self {
            handle,
            id: page.id,
            kind: page.kind,
            path: graph.path(handle),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateMessage {
    pub kind: UpdateKind,
    pub page: PageRef,
}

impl UpdateMessage {
    pub fn created(page: PageRef) -> Self {
        Self {
            kind: UpdateKind::Create,
            page,
        }
    }

    pub fn deleted(page: PageRef) -> Self {
        Self {
            kind: UpdateKind::Delete,
            page,
        }
    }
}

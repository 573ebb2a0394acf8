//! Link types for the page graph.
//!
//! Every page owns an ordered list of outgoing links. Most of them are
//! created by `add_child` and form the ownership tree; extra references
//! can be added on top and may close cycles.

use serde::{Deserialize, Serialize};

/// The type of relationship between two pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// The target was created by the source and has it as its parent.
    Child,

    /// Plain hyperlink to an existing page.
    Reference,
}

impl std::fmt::Display for LinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Child => "child",
            Self::Reference => "reference",
        };
        write!(f, "{}", s)
    }
}

/// An edge in the page graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub kind: LinkKind,
}

impl Link {
    pub fn child() -> Self {
        Self {
            kind: LinkKind::Child,
        }
    }

    pub fn reference() -> Self {
        Self {
            kind: LinkKind::Reference,
        }
    }
}

/// A simplified link for graph export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkInfo {
    pub source: crate::PageId,
    pub target: crate::PageId,
    pub kind: LinkKind,
}

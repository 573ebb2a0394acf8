use thiserror::Error;

/// Errors raised while reading or mutating the page graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A traversal reached a handle that does not resolve to a page.
    #[error("unexpected node while traversing graph: {0}")]
    UnexpectedNode(String),

    /// An operation referenced a page that is not part of the graph.
    #[error("unknown page: {0}")]
    UnknownPage(String),
}

pub type Result<T> = std::result::Result<T, GraphError>;

use thiserror::Error;
use weft_core::GraphError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("malformed request: {0}")]
    BadRequest(String),
}

pub type Result<T> = std::result::Result<T, ServerError>;

use thiserror::Error;
use weft_core::GraphError;

/// Misuse of the weighted selector.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectError {
    #[error("no weights provided")]
    EmptyInput,

    #[error("sum of weights is zero")]
    ZeroMass,

    #[error("weight at index {index} is negative or not finite: {value}")]
    InvalidWeight { index: usize, value: f64 },

    #[error("selected index {index} is out of range for {len} weights")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error(
        "limit already exceeded: {hubs} hubs (max {max_hubs}), \
         {authorities} authorities (max {max_authorities})"
    )]
    LimitAlreadyExceeded {
        hubs: usize,
        max_hubs: usize,
        authorities: usize,
        max_authorities: usize,
    },

    #[error("no hub page exists to attach an authority to")]
    NoHubs,

    #[error("preferential attachment must be within [0, 1], got {0}")]
    InvalidAttachment(f64),

    #[error("creation rate must be a positive number of pages per hour, got {0}")]
    InvalidRate(f64),

    #[error("selection failed: {0}")]
    Select(#[from] SelectError),

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("growth worker aborted: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, GeneratorError>;

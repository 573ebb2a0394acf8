//! Weft Growth - grows page graphs by preferential attachment
//!
//! Two ways to grow a graph:
//!
//! - `GraphGenerator::generate` builds up to target counts in one go.
//! - `GraphGenerator::start_evolution` grows it over time on two worker
//!   tasks, one per page kind, and streams an `UpdateMessage` for every
//!   page it creates.
//!
//! Parent hubs are picked by a `Selector`. `RandomSelector` is the default;
//! any `Fn(&[f64]) -> Result<usize, SelectError>` works too.

mod error;
mod evolution;
mod generator;
mod selector;
mod update;

pub use error::{GeneratorError, Result, SelectError};
pub use evolution::{Evolution, EvolutionPlan, EvolutionReport, WorkerReport, WorkerState};
pub use generator::{authority_weights, hub_weights, GraphGenerator, HubWeights, SharedGraph};
pub use selector::{select_by_probability, RandomSelector, Selector};
pub use update::{PageRef, UpdateKind, UpdateMessage};

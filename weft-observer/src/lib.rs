//! Weft Observer - who saw what, and when
//!
//! Keeps two append-only ledgers: when each page was created and deleted,
//! and every page visit by client address. From them it derives two
//! per-client metrics at any point in time:
//!
//! - **freshness**: the share of the live site the client has seen.
//! - **age**: how long after creation the client last looked at the
//!   pages it has seen, on average.
//!
//! The observer is meant to be shared as `Arc<Observer>`; every method
//! takes `&self`.

mod observer;

pub use observer::{NodeLog, Observer, SeriesPoint, VisitLog};

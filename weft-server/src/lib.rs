//! Weft Server - serves a growing page graph over HTTP
//!
//! This crate is the boundary between the graph and the outside world:
//!
//! - `RouteTable` maps URL paths to pages.
//! - `GraphRouter` keeps that table current while the graph evolves and
//!   reports page creation, deletion and visits to an `Observer`.
//! - `MockSiteServer` answers plain HTTP/1.1 requests for graph pages and
//!   observer metrics.

mod error;
mod render;
mod router;
mod routes;
mod server;

pub use error::{Result, ServerError};
pub use render::{render_page, PageLink, PageView};
pub use router::{GraphRouter, SyncReport};
pub use routes::RouteTable;
pub use server::{respond, HttpResponse, MockSiteServer, ServerConfig};

//! Keeps the route table in step with a growing graph.
//!
//! The router listens to the update and error streams of an evolution.
//! Every update triggers a full rebuild of the route table and, with an
//! observer attached, a node lifecycle entry. Page requests resolve through
//! the table and are logged as visits.

use crate::error::Result;
use crate::render::PageView;
use crate::routes::RouteTable;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use weft_core::PageHandle;
use weft_growth::{GeneratorError, SharedGraph, UpdateKind, UpdateMessage};
use weft_observer::{NodeLog, Observer, VisitLog};

/// What a sync run consumed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub created: usize,
    pub deleted: usize,
    pub errors: Vec<String>,
}

impl SyncReport {
    pub fn updates(&self) -> usize {
        self.created + self.deleted
    }
}

/// Serves pages of a shared graph by path.
pub struct GraphRouter {
    graph: SharedGraph,
    root: PageHandle,
    routes: RwLock<RouteTable>,
    observer: Option<Arc<Observer>>,
}

impl GraphRouter {
    /// Creates a router over every page reachable from `root`.
    ///
    /// With an observer, every existing page is logged as created now.
    pub async fn new(
        graph: SharedGraph,
        root: PageHandle,
        observer: Option<Arc<Observer>>,
    ) -> Result<Self> {
        let (routes, ids) = {
            let graph = graph.read().await;
            let routes = RouteTable::build(&graph, root)?;
            let ids: Vec<_> = graph
                .export(root)?
                .nodes
                .into_iter()
                .map(|node| node.id)
                .collect();
            (routes, ids)
        };

        if let Some(observer) = &observer {
            let now = Utc::now();
            for id in ids {
                observer.log_node(NodeLog::new(id, now)).await;
            }
        }

        info!("Router ready with {} routes", routes.len());

        Ok(Self {
            graph,
            root,
            routes: RwLock::new(routes),
            observer,
        })
    }

    pub fn graph(&self) -> SharedGraph {
        self.graph.clone()
    }

    pub fn root(&self) -> PageHandle {
        self.root
    }

    pub fn observer(&self) -> Option<&Arc<Observer>> {
        self.observer.as_ref()
    }

    pub async fn route_count(&self) -> usize {
        self.routes.read().await.len()
    }

    /// Sorted snapshot of every routed path.
    pub async fn paths(&self) -> Vec<String> {
        self.routes
            .read()
            .await
            .paths()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Rebuilds the route table from the current graph.
    pub async fn refresh(&self) -> Result<usize> {
        let table = {
            let graph = self.graph.read().await;
            RouteTable::build(&graph, self.root)?
        };
        let count = table.len();
        *self.routes.write().await = table;
        Ok(count)
    }

    /// Applies one update: refreshes routes and logs the lifecycle change.
    pub async fn apply(&self, update: &UpdateMessage) -> Result<()> {
        let routes = self.refresh().await?;
        debug!(
            "Applied {:?} of {} ({} routes)",
            update.kind, update.page.path, routes
        );

        if let Some(observer) = &self.observer {
            let now = Utc::now();
            match update.kind {
                UpdateKind::Create => observer.log_node(NodeLog::new(update.page.id, now)).await,
                UpdateKind::Delete => {
                    if !observer.mark_deleted(update.page.id, now).await {
                        debug!("Deleted page {} was never logged", update.page.id);
                    }
                }
            }
        }

        Ok(())
    }

    /// Consumes an evolution's streams until both are closed.
    pub async fn sync(
        &self,
        mut updates: mpsc::Receiver<UpdateMessage>,
        mut errors: mpsc::Receiver<GeneratorError>,
    ) -> SyncReport {
        let mut report = SyncReport::default();
        let mut updates_open = true;
        let mut errors_open = true;

        while updates_open || errors_open {
            tokio::select! {
                update = updates.recv(), if updates_open => match update {
                    Some(update) => {
                        match update.kind {
                            UpdateKind::Create => report.created += 1,
                            UpdateKind::Delete => report.deleted += 1,
                        }
                        if let Err(e) = self.apply(&update).await {
                            warn!("Failed to apply update for {}: {}", update.page.path, e);
                            report.errors.push(e.to_string());
                        }
                    }
                    None => {
                        debug!("Update stream closed");
                        updates_open = false;
                    }
                },
                error = errors.recv(), if errors_open => match error {
                    Some(error) => {
                        warn!("Graph evolution error: {}", error);
                        report.errors.push(error.to_string());
                    }
                    None => errors_open = false,
                },
            }
        }

        info!(
            "Sync finished: {} created, {} deleted, {} errors",
            report.created,
            report.deleted,
            report.errors.len()
        );
        report
    }

    /// Resolves a request path and records the visit.
    ///
    /// Returns `None` for unknown paths; those are not logged.
    pub async fn visit(&self, path: &str, remote_address: &str) -> Option<PageView> {
        let handle = self.routes.read().await.resolve(path)?;
        let view = {
            let graph = self.graph.read().await;
            PageView::capture(&graph, handle)?
        };

        if let Some(observer) = &self.observer {
            observer
                .log_visit(VisitLog::new(remote_address, view.id, Utc::now()))
                .await;
        }

        Some(view)
    }
}

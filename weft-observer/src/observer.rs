//! Node lifecycle and visit ledgers.
//!
//! Both ledgers only grow. Metrics are computed at read time by scanning
//! them in full, so a query always reflects everything logged before it
//! started.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;
use weft_core::PageId;

/// Lifetime of one page as seen by the observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLog {
    pub id: PageId,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl NodeLog {
    /// A page that came to life at `created_at`.
    pub fn new(id: PageId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            created_at,
            deleted_at: None,
        }
    }

    /// Whether the page existed at `at`: created strictly before it and not
    /// deleted by then.
    pub fn is_live_at(&self, at: DateTime<Utc>) -> bool {
        self.created_at < at && self.deleted_at.map_or(true, |deleted| deleted > at)
    }
}

/// One page request from one client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitLog {
    pub remote_address: String,
    pub node_id: PageId,
    pub visited_at: DateTime<Utc>,
}

impl VisitLog {
    pub fn new(remote_address: impl Into<String>, node_id: PageId, visited_at: DateTime<Utc>) -> Self {
        Self {
            remote_address: remote_address.into(),
            node_id,
            visited_at,
        }
    }
}

/// A metric value at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub at: DateTime<Utc>,
    pub value: f64,
}

/// Records what pages exist and who looked at them.
#[derive(Debug, Default)]
pub struct Observer {
    nodes: RwLock<HashMap<PageId, NodeLog>>,
    visits: RwLock<Vec<VisitLog>>,
}

impl Observer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the log for `entry.id`.
    pub async fn log_node(&self, entry: NodeLog) {
        debug!("Logging node {} created at {}", entry.id, entry.created_at);
        self.nodes.write().await.insert(entry.id, entry);
    }

    /// Records the deletion of a page.
    ///
    /// A deletion time, once set, is never moved. Returns false when the
    /// page was never logged.
    pub async fn mark_deleted(&self, id: PageId, at: DateTime<Utc>) -> bool {
        let mut nodes = self.nodes.write().await;
        match nodes.get_mut(&id) {
            Some(entry) => {
                if entry.deleted_at.is_none() {
                    entry.deleted_at = Some(at);
                }
                true
            }
            None => false,
        }
    }

    pub async fn log_visit(&self, entry: VisitLog) {
        self.visits.write().await.push(entry);
    }

    /// Fraction of the pages live at `at` that `address` visited before `at`.
    pub async fn freshness(&self, address: &str, at: DateTime<Utc>) -> f64 {
        let nodes = self.nodes.read().await;
        let visits = self.visits.read().await;

        let archived: HashSet<PageId> = nodes
            .values()
            .filter(|node| node.is_live_at(at))
            .map(|node| node.id)
            .collect();

        let visited: HashSet<PageId> = visits
            .iter()
            .filter(|visit| visit.remote_address == address && visit.visited_at < at)
            .map(|visit| visit.node_id)
            .filter(|id| archived.contains(id))
            .collect();

        if archived.is_empty() || visited.is_empty() {
            return 0.0;
        }

        visited.len() as f64 / archived.len() as f64
    }

    /// Mean time between a page's creation and the latest visit to it from
    /// `address` before `at`.
    ///
    /// The mean is taken over every page `address` visited, including pages
    /// no longer live at `at`; those add nothing to the sum.
    pub async fn age(&self, address: &str, at: DateTime<Utc>) -> TimeDelta {
        let nodes = self.nodes.read().await;
        let visits = self.visits.read().await;

        let mut latest: HashMap<PageId, DateTime<Utc>> = HashMap::new();
        for visit in visits
            .iter()
            .filter(|visit| visit.remote_address == address && visit.visited_at < at)
        {
            latest
                .entry(visit.node_id)
                .and_modify(|seen| *seen = (*seen).max(visit.visited_at))
                .or_insert(visit.visited_at);
        }

        if latest.is_empty() {
            return TimeDelta::zero();
        }

        let total = latest
            .iter()
            .filter_map(|(id, visited_at)| {
                nodes
                    .get(id)
                    .filter(|node| node.is_live_at(at))
                    .map(|node| *visited_at - node.created_at)
            })
            .fold(TimeDelta::zero(), |sum, age| sum + age);

        total / i32::try_from(latest.len()).unwrap_or(i32::MAX)
    }

    /// Snapshot of the node ledger.
    pub async fn node_logs(&self) -> Vec<NodeLog> {
        self.nodes.read().await.values().cloned().collect()
    }

    /// Snapshot of the visit ledger in logging order.
    pub async fn visit_logs(&self) -> Vec<VisitLog> {
        self.visits.read().await.clone()
    }

    /// Freshness sampled every `bucket` over the `window` ending at `now`.
    pub async fn freshness_series(
        &self,
        address: &str,
        bucket: TimeDelta,
        window: TimeDelta,
        now: DateTime<Utc>,
    ) -> Vec<SeriesPoint> {
        let mut series = Vec::new();
        for at in bucket_times(bucket, window, now) {
            let value = self.freshness(address, at).await;
            series.push(SeriesPoint { at, value });
        }
        series
    }

    /// Age in seconds, sampled like `freshness_series`.
    pub async fn age_series(
        &self,
        address: &str,
        bucket: TimeDelta,
        window: TimeDelta,
        now: DateTime<Utc>,
    ) -> Vec<SeriesPoint> {
        let mut series = Vec::new();
        for at in bucket_times(bucket, window, now) {
            let age = self.age(address, at).await;
            series.push(SeriesPoint {
                at,
                value: age.num_milliseconds() as f64 / 1000.0,
            });
        }
        series
    }
}

/// Sample times `now - k * bucket` for every whole bucket in `window`,
/// oldest first.
fn bucket_times(bucket: TimeDelta, window: TimeDelta, now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    let step = bucket.num_milliseconds();
    if step <= 0 {
        return Vec::new();
    }

    let count = (window.num_milliseconds() / step).max(0);
    (0..count)
        .rev()
        .filter_map(|k| {
            let k = i32::try_from(k).ok()?;
            now.checked_sub_signed(bucket * k)
        })
        .collect()
}

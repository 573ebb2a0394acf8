//! Timed, cancellable growth of a graph.
//!
//! Evolution runs one worker task per page kind. Each worker ticks at its
//! own rate and creates one page per tick until its target is met, sending
//! a `Create` update for every page on a shared channel. A supervisor task
//! joins both workers: when one fails it forwards the error and tells the
//! other to stop. Both streams close once the supervisor has settled the
//! two workers.

use crate::error::{GeneratorError, Result};
use crate::generator::{check_limits, GraphGenerator};
use crate::update::UpdateMessage;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};
use weft_core::PageKind;

/// Capacity of the error stream. Each worker reports at most one error.
const ERROR_CHANNEL_CAPACITY: usize = 2;

/// Targets and creation rates for an evolution run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvolutionPlan {
    pub max_hubs: usize,
    pub max_authorities: usize,
    pub hub_rate_per_hour: f64,
    pub authority_rate_per_hour: f64,
}

/// Lifecycle of a growth worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl WorkerState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkerState::Running)
    }
}

/// Final state of one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkerReport {
    pub kind: PageKind,
    pub state: WorkerState,
    pub created: usize,
}

/// What the supervisor saw once both workers stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EvolutionReport {
    pub hubs: WorkerReport,
    pub authorities: WorkerReport,
}

impl EvolutionReport {
    pub fn is_success(&self) -> bool {
        self.hubs.state == WorkerState::Completed
            && self.authorities.state == WorkerState::Completed
    }

    pub fn created(&self) -> usize {
        self.hubs.created + self.authorities.created
    }
}

/// A running evolution.
///
/// `updates` carries one message per created page, `errors` at most one
/// error per failed worker. Both close when evolution is over.
pub struct Evolution {
    pub updates: mpsc::Receiver<UpdateMessage>,
    pub errors: mpsc::Receiver<GeneratorError>,
    pub supervisor: JoinHandle<EvolutionReport>,
}

/// How a worker loop ended.
enum WorkerEnd {
    Completed,
    Failed(GeneratorError),
    Cancelled,
}

struct WorkerExit {
    created: usize,
    end: WorkerEnd,
}

/// Converts a rate in pages per hour to a tick period.
fn tick_period(rate_per_hour: f64) -> Result<Duration> {
    if !rate_per_hour.is_finite() || rate_per_hour <= 0.0 {
        return Err(GeneratorError::InvalidRate(rate_per_hour));
    }

    match Duration::try_from_secs_f64(3600.0 / rate_per_hour) {
        Ok(period) if !period.is_zero() => Ok(period),
        _ => Err(GeneratorError::InvalidRate(rate_per_hour)),
    }
}

impl GraphGenerator {
    /// Starts growing the graph towards the plan's targets.
    ///
    /// Rates and current counts are checked before anything is spawned;
    /// on error the graph is left untouched.
    pub async fn start_evolution(&self, plan: EvolutionPlan) -> Result<Evolution> {
        let hub_period = tick_period(plan.hub_rate_per_hour)?;
        let authority_period = tick_period(plan.authority_rate_per_hour)?;

        let counts = self.counts().await?;
        check_limits(counts, plan.max_hubs, plan.max_authorities)?;

        let hub_steps = plan.max_hubs - counts.hubs;
        let authority_steps = plan.max_authorities - counts.authorities;

        info!(
            "Starting evolution: {} hubs every {:?}, {} authorities every {:?}",
            hub_steps, hub_period, authority_steps, authority_period
        );

        let (update_tx, update_rx) = mpsc::channel((hub_steps + authority_steps).max(1));
        let (error_tx, error_rx) = mpsc::channel(ERROR_CHANNEL_CAPACITY);
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let hubs = tokio::spawn(run_worker(
            self.clone(),
            PageKind::Hub,
            hub_steps,
            hub_period,
            update_tx.clone(),
            cancel_rx.clone(),
        ));
        let authorities = tokio::spawn(run_worker(
            self.clone(),
            PageKind::Authority,
            authority_steps,
            authority_period,
            update_tx,
            cancel_rx,
        ));

        let supervisor = tokio::spawn(supervise(hubs, authorities, error_tx, cancel_tx));

        Ok(Evolution {
            updates: update_rx,
            errors: error_rx,
            supervisor,
        })
    }
}

async fn run_worker(
    generator: GraphGenerator,
    kind: PageKind,
    steps: usize,
    period: Duration,
    updates: mpsc::Sender<UpdateMessage>,
    mut cancel: watch::Receiver<bool>,
) -> WorkerExit {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    let mut updates = Some(updates);
    let mut created = 0;

    while created < steps {
        // Cancellation wins over a tick that is ready at the same time.
        tokio::select! {
            biased;

            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    debug!("{} worker cancelled after {} pages", kind, created);
                    return WorkerExit { created, end: WorkerEnd::Cancelled };
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        if *cancel.borrow() {
            debug!("{} worker cancelled after {} pages", kind, created);
            return WorkerExit { created, end: WorkerEnd::Cancelled };
        }

        let page = match generator.create_page(kind).await {
            Ok(page) => page,
            Err(err) => {
                return WorkerExit {
                    created,
                    end: WorkerEnd::Failed(err),
                }
            }
        };

        debug!("{} worker created {}", kind, page.path);
        created += 1;

        let closed = match &updates {
            Some(sender) => sender.send(UpdateMessage::created(page)).await.is_err(),
            None => false,
        };
        if closed {
            debug!("{} update stream closed, growing without events", kind);
            updates = None;
        }
    }

    WorkerExit {
        created,
        end: WorkerEnd::Completed,
    }
}

async fn supervise(
    mut hubs: JoinHandle<WorkerExit>,
    mut authorities: JoinHandle<WorkerExit>,
    errors: mpsc::Sender<GeneratorError>,
    cancel: watch::Sender<bool>,
) -> EvolutionReport {
    let mut hub_report = None;
    let mut authority_report = None;

    while hub_report.is_none() || authority_report.is_none() {
        tokio::select! {
            joined = &mut hubs, if hub_report.is_none() => {
                hub_report = Some(settle(PageKind::Hub, joined, &errors, &cancel).await);
            }
            joined = &mut authorities, if authority_report.is_none() => {
                authority_report = Some(settle(PageKind::Authority, joined, &errors, &cancel).await);
            }
        }
    }

    let report = EvolutionReport {
        hubs: hub_report.unwrap_or(WorkerReport {
            kind: PageKind::Hub,
            state: WorkerState::Failed,
            created: 0,
        }),
        authorities: authority_report.unwrap_or(WorkerReport {
            kind: PageKind::Authority,
            state: WorkerState::Failed,
            created: 0,
        }),
    };

    info!(
        "Evolution finished: hubs {:?} ({}), authorities {:?} ({})",
        report.hubs.state,
        report.hubs.created,
        report.authorities.state,
        report.authorities.created
    );

    report
}

/// Turns a joined worker into its report, forwarding failures.
async fn settle(
    kind: PageKind,
    joined: std::result::Result<WorkerExit, JoinError>,
    errors: &mpsc::Sender<GeneratorError>,
    cancel: &watch::Sender<bool>,
) -> WorkerReport {
    let (created, failure) = match joined {
        Ok(WorkerExit { created, end }) => match end {
            WorkerEnd::Completed => {
                return WorkerReport {
                    kind,
                    state: WorkerState::Completed,
                    created,
                }
            }
            WorkerEnd::Cancelled => {
                return WorkerReport {
                    kind,
                    state: WorkerState::Cancelled,
                    created,
                }
            }
            WorkerEnd::Failed(err) => (created, err),
        },
        Err(join_err) => (
            0,
            GeneratorError::Worker(format!("{} worker: {}", kind, join_err)),
        ),
    };

    warn!("{} worker failed: {}", kind, failure);

    // Nobody listening is fine; evolution still has to stop.
    let _ = errors.send(failure).await;
    let _ = cancel.send(true);

    WorkerReport {
        kind,
        state: WorkerState::Failed,
        created,
    }
}

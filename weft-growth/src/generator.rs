//! Preferential-attachment page creation.
//!
//! New pages always hang off an existing hub. Which hub is picked depends
//! on how well connected it already is, blended with a uniform baseline by
//! the preferential attachment factor α:
//!
//! ```text
//! weight(h) = mass(h) / total_mass * α + (1 - α) / hub_count
//! ```
//!
//! For a new hub the mass of `h` is its number of hub-to-hub links, for a
//! new authority it is its total number of outgoing links. When every hub
//! has zero mass the weights fall back to uniform.

use crate::error::{GeneratorError, Result};
use crate::selector::{RandomSelector, Selector};
use crate::update::PageRef;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use weft_core::{count_kinds, traverse, KindCounts, PageHandle, PageKind, WebGraph};

/// Graph shared between the generator, its workers and readers.
pub type SharedGraph = Arc<RwLock<WebGraph>>;

/// Hubs reachable from a root together with their selection weights.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HubWeights {
    pub hubs: Vec<PageHandle>,
    pub weights: Vec<f64>,
}

impl HubWeights {
    pub fn is_empty(&self) -> bool {
        self.hubs.is_empty()
    }
}

/// Weights for attaching a new hub: mass is the hub-to-hub link count.
pub fn hub_weights(graph: &WebGraph, root: PageHandle, alpha: f64) -> Result<HubWeights> {
    attachment_weights(graph, root, alpha, |graph, hub| {
        graph.count_links_by_kind(hub, PageKind::Hub)
    })
}

/// Weights for attaching a new authority: mass is the total link count.
pub fn authority_weights(graph: &WebGraph, root: PageHandle, alpha: f64) -> Result<HubWeights> {
    attachment_weights(graph, root, alpha, |graph, hub| graph.link_count(hub))
}

fn attachment_weights<M>(
    graph: &WebGraph,
    root: PageHandle,
    alpha: f64,
    mass: M,
) -> Result<HubWeights>
where
    M: Fn(&WebGraph, PageHandle) -> usize,
{
    let mut hubs = Vec::new();
    let mut masses = Vec::new();
    traverse(graph, root, |handle| {
        if graph.page(handle).map(|page| page.is_hub()).unwrap_or(false) {
            hubs.push(handle);
            masses.push(mass(graph, handle));
        }
        ControlFlow::Continue(())
    })?;

    if hubs.is_empty() {
        return Ok(HubWeights::default());
    }

    let hub_count = hubs.len() as f64;
    let total: usize = masses.iter().sum();
    let weights = masses
        .iter()
        .map(|&m| {
            if total == 0 {
                1.0 / hub_count
            } else {
                (m as f64 / total as f64) * alpha + (1.0 - alpha) * (1.0 / hub_count)
            }
        })
        .collect();

    Ok(HubWeights { hubs, weights })
}

/// Grows a page graph one page at a time.
///
/// Every creation step takes the graph write lock for the whole
/// read-weights-then-attach section.
#[derive(Clone)]
pub struct GraphGenerator {
    graph: SharedGraph,
    root: PageHandle,
    preferential_attachment: f64,
    selector: Arc<dyn Selector>,
}

impl GraphGenerator {
    /// Creates a generator over a shared graph, growing below `root`.
    pub fn new(graph: SharedGraph, root: PageHandle, preferential_attachment: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&preferential_attachment) {
            return Err(GeneratorError::InvalidAttachment(preferential_attachment));
        }

        Ok(Self {
            graph,
            root,
            preferential_attachment,
            selector: Arc::new(RandomSelector::new()),
        })
    }

    /// Takes ownership of a graph and grows it from its root.
    pub fn from_graph(graph: WebGraph, preferential_attachment: f64) -> Result<Self> {
        let root = graph.root();
        Self::new(Arc::new(RwLock::new(graph)), root, preferential_attachment)
    }

    /// Replaces the selection strategy.
    pub fn with_selector<S>(self, selector: S) -> Self
    where
        S: Selector + 'static,
    {
        self.with_shared_selector(Arc::new(selector))
    }

    pub fn with_shared_selector(mut self, selector: Arc<dyn Selector>) -> Self {
        self.selector = selector;
        self
    }

    /// Returns a handle to the shared graph.
    pub fn graph(&self) -> SharedGraph {
        self.graph.clone()
    }

    pub fn root(&self) -> PageHandle {
        self.root
    }

    pub fn preferential_attachment(&self) -> f64 {
        self.preferential_attachment
    }

    /// Counts hubs and authorities reachable from the root.
    pub async fn counts(&self) -> Result<KindCounts> {
        let graph = self.graph.read().await;
        Ok(count_kinds(&graph, self.root)?)
    }

    /// Adds a hub page.
    ///
    /// The very first hub below a root without hubs is attached to the
    /// root directly.
    pub async fn create_hub_page(&self) -> Result<PageHandle> {
        let mut graph = self.graph.write().await;
        self.attach(&mut graph, PageKind::Hub)
    }

    /// Adds an authority page below a hub. Fails with `NoHubs` when no hub
    /// is reachable.
    pub async fn create_authority_page(&self) -> Result<PageHandle> {
        let mut graph = self.graph.write().await;
        self.attach(&mut graph, PageKind::Authority)
    }

    /// Creates one page and captures it for an update event under the
    /// same lock.
    pub(crate) async fn create_page(&self, kind: PageKind) -> Result<PageRef> {
        let mut graph = self.graph.write().await;
        let handle = self.attach(&mut graph, kind)?;
        PageRef::capture(&graph, handle)
            .ok_or_else(|| GeneratorError::Worker(format!("created page {:?} vanished", handle)))
    }

    fn attach(&self, graph: &mut WebGraph, kind: PageKind) -> Result<PageHandle> {
        let alpha = self.preferential_attachment;
        let candidates = match kind {
            PageKind::Hub => hub_weights(graph, self.root, alpha)?,
            PageKind::Authority => authority_weights(graph, self.root, alpha)?,
        };

        if candidates.is_empty() {
            return match kind {
                PageKind::Hub => {
                    debug!("No hub yet, attaching first hub to root");
                    Ok(graph.add_child(self.root, PageKind::Hub)?)
                }
                PageKind::Authority => Err(GeneratorError::NoHubs),
            };
        }

        let index = self.selector.select(&candidates.weights)?;
        let parent = candidates.hubs.get(index).copied().ok_or(
            crate::error::SelectError::IndexOutOfRange {
                index,
                len: candidates.hubs.len(),
            },
        )?;

        Ok(graph.add_child(parent, kind)?)
    }

    /// Builds the graph up to the requested counts in one go.
    ///
    /// Fails with `LimitAlreadyExceeded`, without touching the graph, when
    /// the graph already holds more pages of either kind than requested.
    pub async fn generate(&self, max_hubs: usize, max_authorities: usize) -> Result<()> {
        let counts = self.counts().await?;
        check_limits(counts, max_hubs, max_authorities)?;

        info!(
            "Generating {} hubs and {} authorities",
            max_hubs - counts.hubs,
            max_authorities - counts.authorities
        );

        for _ in counts.hubs..max_hubs {
            self.create_hub_page().await?;
        }
        for _ in counts.authorities..max_authorities {
            self.create_authority_page().await?;
        }

        Ok(())
    }
}

pub(crate) fn check_limits(
    counts: KindCounts,
    max_hubs: usize,
    max_authorities: usize,
) -> Result<()> {
    if counts.hubs > max_hubs || counts.authorities > max_authorities {
        return Err(GeneratorError::LimitAlreadyExceeded {
            hubs: counts.hubs,
            max_hubs,
            authorities: counts.authorities,
            max_authorities,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SelectError;
    use std::sync::Mutex;

    /// Selector that records every weight vector and picks the first hub.
    fn recording_selector() -> (
        impl Fn(&[f64]) -> std::result::Result<usize, SelectError> + Send + Sync,
        Arc<Mutex<Vec<Vec<f64>>>>,
    ) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let selector = move |weights: &[f64]| -> std::result::Result<usize, SelectError> {
            sink.lock().unwrap().push(weights.to_vec());
            Ok(0)
        };
        (selector, seen)
    }

    fn root_with_hub_child() -> WebGraph {
        let mut graph = WebGraph::new(PageKind::Hub);
        let root = graph.root();
        graph.add_child(root, PageKind::Hub).unwrap();
        graph
    }

    fn root_with_busy_hub() -> WebGraph {
        let mut graph = WebGraph::new(PageKind::Hub);
        let root = graph.root();
        let hub = graph.add_child(root, PageKind::Hub).unwrap();
        for _ in 0..3 {
            graph.add_child(hub, PageKind::Authority).unwrap();
        }
        graph
    }

    #[tokio::test]
    async fn test_hub_weights_by_attachment() {
        for (alpha, expected) in [
            (1.0, vec![1.0, 0.0]),
            (0.0, vec![0.5, 0.5]),
            (0.5, vec![0.75, 0.25]),
        ] {
            let (selector, seen) = recording_selector();
            let generator = GraphGenerator::from_graph(root_with_hub_child(), alpha)
                .unwrap()
                .with_selector(selector);

            generator.create_hub_page().await.unwrap();

            let seen = seen.lock().unwrap();
            assert_eq!(seen.len(), 1);
            assert_eq!(seen[0], expected, "alpha = {}", alpha);
        }
    }

    #[tokio::test]
    async fn test_authority_weights_by_attachment() {
        for (alpha, expected) in [
            (1.0, vec![0.25, 0.75]),
            (0.0, vec![0.5, 0.5]),
            (0.5, vec![0.375, 0.625]),
        ] {
            let (selector, seen) = recording_selector();
            let generator = GraphGenerator::from_graph(root_with_busy_hub(), alpha)
                .unwrap()
                .with_selector(selector);

            let page = generator.create_authority_page().await.unwrap();

            let seen = seen.lock().unwrap();
            assert_eq!(seen[0], expected, "alpha = {}", alpha);

            let graph = generator.graph();
            let graph = graph.read().await;
            assert_eq!(graph.page(page).unwrap().kind, PageKind::Authority);
            assert_eq!(graph.parent(page), Some(graph.root()));
        }
    }

    #[test]
    fn test_zero_mass_weights_are_uniform() {
        let mut graph = WebGraph::new(PageKind::Authority);
        let root = graph.root();
        graph.add_child(root, PageKind::Hub).unwrap();
        graph.add_child(root, PageKind::Hub).unwrap();

        let weights = hub_weights(&graph, root, 1.0).unwrap();
        assert_eq!(weights.hubs.len(), 2);
        assert_eq!(weights.weights, vec![0.5, 0.5]);
    }

    #[tokio::test]
    async fn test_first_hub_attaches_to_root() {
        let (selector, seen) = recording_selector();
        let generator = GraphGenerator::from_graph(WebGraph::new(PageKind::Authority), 0.5)
            .unwrap()
            .with_selector(selector);

        let hub = generator.create_hub_page().await.unwrap();

        assert!(seen.lock().unwrap().is_empty());
        let graph = generator.graph();
        let graph = graph.read().await;
        assert_eq!(graph.parent(hub), Some(graph.root()));
        assert_eq!(graph.page(hub).unwrap().kind, PageKind::Hub);
    }

    #[tokio::test]
    async fn test_authority_without_hubs_fails() {
        let generator =
            GraphGenerator::from_graph(WebGraph::new(PageKind::Authority), 0.5).unwrap();

        let result = generator.create_authority_page().await;

        assert!(matches!(result, Err(GeneratorError::NoHubs)));
        assert_eq!(generator.graph().read().await.node_count(), 1);
    }

    #[tokio::test]
    async fn test_selector_error_propagates() {
        let failing = |_: &[f64]| -> std::result::Result<usize, SelectError> {
            Err(SelectError::ZeroMass)
        };
        let generator = GraphGenerator::from_graph(root_with_hub_child(), 0.5)
            .unwrap()
            .with_selector(failing);

        let result = generator.create_hub_page().await;
        assert!(matches!(
            result,
            Err(GeneratorError::Select(SelectError::ZeroMass))
        ));
    }

    #[tokio::test]
    async fn test_out_of_range_selection_rejected() {
        let wild = |_: &[f64]| -> std::result::Result<usize, SelectError> { Ok(99) };
        let generator = GraphGenerator::from_graph(root_with_hub_child(), 0.5)
            .unwrap()
            .with_selector(wild);

        let result = generator.create_hub_page().await;
        assert!(matches!(
            result,
            Err(GeneratorError::Select(SelectError::IndexOutOfRange {
                index: 99,
                len: 2
            }))
        ));
    }

    #[test]
    fn test_invalid_attachment_rejected() {
        for alpha in [-0.1, 1.5, f64::NAN] {
            let result = GraphGenerator::from_graph(WebGraph::new(PageKind::Hub), alpha);
            assert!(matches!(result, Err(GeneratorError::InvalidAttachment(_))));
        }
    }

    #[tokio::test]
    async fn test_generate_reaches_targets() {
        let generator = GraphGenerator::from_graph(WebGraph::new(PageKind::Hub), 0.5)
            .unwrap()
            .with_selector(RandomSelector::seeded(11));

        generator.generate(10, 10).await.unwrap();

        let counts = generator.counts().await.unwrap();
        assert_eq!(counts, KindCounts { hubs: 10, authorities: 10 });
    }

    #[tokio::test]
    async fn test_generate_from_authority_root() {
        let generator =
            GraphGenerator::from_graph(WebGraph::new(PageKind::Authority), 0.8).unwrap();

        generator.generate(4, 7).await.unwrap();

        let counts = generator.counts().await.unwrap();
        assert_eq!(counts, KindCounts { hubs: 4, authorities: 7 });
    }

    #[tokio::test]
    async fn test_generate_rejects_exceeded_limits() {
        let mut graph = WebGraph::new(PageKind::Hub);
        let root = graph.root();
        let auth = graph.add_child(root, PageKind::Authority).unwrap();
        graph.add_child(auth, PageKind::Authority).unwrap();
        let hub = graph.add_child(root, PageKind::Hub).unwrap();
        graph.add_child(hub, PageKind::Hub).unwrap();

        let generator = GraphGenerator::from_graph(graph, 0.5).unwrap();
        let result = generator.generate(2, 2).await;

        assert!(matches!(
            result,
            Err(GeneratorError::LimitAlreadyExceeded {
                hubs: 3,
                max_hubs: 2,
                ..
            })
        ));
        assert_eq!(generator.graph().read().await.node_count(), 5);
    }

    #[tokio::test]
    async fn test_generate_with_targets_already_met_is_noop() {
        let generator = GraphGenerator::from_graph(root_with_busy_hub(), 0.5).unwrap();
        generator.generate(2, 3).await.unwrap();
        assert_eq!(generator.graph().read().await.node_count(), 5);
    }
}

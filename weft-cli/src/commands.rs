//! CLI command implementations.

use crate::config::WeaveConfig;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use weft_core::{RenderConfig, WebGraph};
use weft_growth::{GraphGenerator, RandomSelector};
use weft_observer::Observer;
use weft_server::{GraphRouter, MockSiteServer, ServerConfig};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Write a default config file.
pub fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        println!("{} Already initialized at {}", "✓".green(), path.display());
        return Ok(());
    }

    WeaveConfig::default().save(path)?;

    println!("{} Wrote default config to {}", "✓".green(), path.display());
    println!(
        "  Run {} to start the mock site",
        format!("weft weave --config {}", path.display()).cyan()
    );

    Ok(())
}

/// Creates a generator for a fresh graph as described by `config`.
pub fn build_generator(config: &WeaveConfig) -> Result<GraphGenerator> {
    let render = RenderConfig::new().with_path_prefix(&config.path_prefix);
    let graph = WebGraph::with_config(config.root_kind, render);

    let generator = GraphGenerator::from_graph(graph, config.preferential_attachment)?;
    Ok(match config.seed {
        Some(seed) => generator.with_selector(RandomSelector::seeded(seed)),
        None => generator,
    })
}

/// Build a graph in one go and optionally export it.
pub async fn generate(config: &WeaveConfig, output: Option<&Path>) -> Result<()> {
    println!("{}", "Generating graph...".cyan());

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(format!(
        "Growing to {} hubs and {} authorities...",
        config.initial_hubs, config.initial_authorities
    ));

    let generator = build_generator(config)?;
    let result = generator
        .generate(config.initial_hubs, config.initial_authorities)
        .await;

    spinner.finish_and_clear();
    result?;

    let counts = generator.counts().await?;
    let graph = generator.graph();
    let graph = graph.read().await;
    let stats = graph.stats();

    println!(
        "{} Generated {} pages ({} hubs, {} authorities) with {} links",
        "✓".green(),
        stats.node_count.to_string().cyan(),
        counts.hubs,
        counts.authorities,
        stats.edge_count
    );

    if let Some(out_path) = output {
        let export = graph.export(generator.root())?;
        let json = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "stats": stats,
            "nodes": export.nodes,
            "links": export.links,
        });
        fs::write(out_path, serde_json::to_string_pretty(&json)?)?;
        println!("{} Exported to {}", "✓".green(), out_path.display());
    }

    Ok(())
}

/// Generate the initial graph, evolve it in the background and serve it.
pub async fn weave(config: &WeaveConfig) -> Result<()> {
    println!("{}", "Weaving mock site...".cyan());

    let generator = build_generator(config)?;
    generator
        .generate(config.initial_hubs, config.initial_authorities)
        .await?;

    let counts = generator.counts().await?;
    println!(
        "{} Initial graph: {} hubs, {} authorities",
        "✓".green(),
        counts.hubs,
        counts.authorities
    );

    let observer = Arc::new(Observer::new());
    let router = Arc::new(
        GraphRouter::new(generator.graph(), generator.root(), Some(observer)).await?,
    );

    let evolution = generator.start_evolution(config.evolution_plan()).await?;
    let sync_router = router.clone();
    tokio::spawn(async move {
        let report = sync_router
            .sync(evolution.updates, evolution.errors)
            .await;
        match evolution.supervisor.await {
            Ok(outcome) if outcome.is_success() => {
                info!("Evolution complete after {} new pages", report.created)
            }
            Ok(outcome) => warn!(
                "Evolution stopped early: hubs {:?}, authorities {:?}",
                outcome.hubs.state, outcome.authorities.state
            ),
            Err(e) => warn!("Evolution supervisor failed: {}", e),
        }
    });

    let server = MockSiteServer::new(router, ServerConfig { addr: config.addr });

    println!("{} Listening on http://{}", "✓".green(), config.addr);
    println!(
        "  Growing to {} hubs and {} authorities",
        config.max_hubs, config.max_authorities
    );
    println!(
        "  Metrics at {}",
        format!("http://{}/observer/freshness?ip=<addr>", config.addr).cyan()
    );
    println!("  Press {} to stop", "Ctrl+C".cyan());

    server.run().await?;

    Ok(())
}

//! Weft CLI - Command-line interface for Weft
//!
//! Generates mock websites whose link structure keeps changing, and serves
//! them so crawlers can be tested against moving targets.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use config::{WeaveConfig, DEFAULT_CONFIG_FILE};

#[derive(Parser)]
#[command(name = "weft")]
#[command(author = "Weft Contributors")]
#[command(version)]
#[command(about = "An evolving mock website for crawler testing", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Graph settings shared by `generate` and `weave`. Flags override the
/// config file.
#[derive(clap::Args)]
struct GraphArgs {
    /// Config file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Preferential attachment factor in [0, 1]
    #[arg(short, long)]
    attachment: Option<f64>,

    /// Number of hubs to generate up front
    #[arg(long)]
    hubs: Option<usize>,

    /// Number of authorities to generate up front
    #[arg(long)]
    authorities: Option<usize>,

    /// Seed for reproducible structure
    #[arg(long)]
    seed: Option<u64>,
}

impl GraphArgs {
    fn resolve(&self) -> Result<WeaveConfig, config::ConfigError> {
        let mut config = WeaveConfig::load_or_default(self.config.as_deref())?;
        if let Some(attachment) = self.attachment {
            config.preferential_attachment = attachment;
        }
        if let Some(hubs) = self.hubs {
            config.initial_hubs = hubs;
        }
        if let Some(authorities) = self.authorities {
            config.initial_authorities = authorities;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        /// Where to write the config
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Generate a graph once and print its statistics
    Generate {
        #[command(flatten)]
        graph: GraphArgs,

        /// Output file for the graph JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate a graph, keep growing it and serve it over HTTP
    Weave {
        #[command(flatten)]
        graph: GraphArgs,

        /// Address to listen on
        #[arg(long)]
        addr: Option<SocketAddr>,

        /// Final number of hubs
        #[arg(long)]
        max_hubs: Option<usize>,

        /// Final number of authorities
        #[arg(long)]
        max_authorities: Option<usize>,

        /// Hubs created per hour
        #[arg(long)]
        hub_rate: Option<f64>,

        /// Authorities created per hour
        #[arg(long)]
        authority_rate: Option<f64>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let result = match cli.command {
        Commands::Init { path, force } => commands::init(&path, force),
        Commands::Generate { graph, output } => match graph.resolve() {
            Ok(config) => commands::generate(&config, output.as_deref()).await,
            Err(e) => Err(e.into()),
        },
        Commands::Weave {
            graph,
            addr,
            max_hubs,
            max_authorities,
            hub_rate,
            authority_rate,
        } => match graph.resolve() {
            Ok(mut config) => {
                if let Some(addr) = addr {
                    config.addr = addr;
                }
                if let Some(max_hubs) = max_hubs {
                    config.max_hubs = max_hubs;
                }
                if let Some(max_authorities) = max_authorities {
                    config.max_authorities = max_authorities;
                }
                if let Some(rate) = hub_rate {
                    config.hub_rate_per_hour = rate;
                }
                if let Some(rate) = authority_rate {
                    config.authority_rate_per_hour = rate;
                }
                match config.validate() {
                    Ok(()) => commands::weave(&config).await,
                    Err(e) => Err(e.into()),
                }
            }
            Err(e) => Err(e.into()),
        },
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

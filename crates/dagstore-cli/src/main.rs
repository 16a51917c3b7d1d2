#![allow(clippy::doc_markdown)]
//! dagstore CLI - inspect and edit a durable DAG from the command line.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dagstore_core::{Dag, DagConfig, LogStore};

mod commands;

/// dagstore - a directed acyclic graph store
#[derive(Parser, Debug)]
#[command(name = "dagstore")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// TOML configuration file (defaults to ./dagstore.toml when present)
    #[arg(short, long, env = "DAGSTORE_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory, overriding storage.data_dir
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the effective configuration
    Config,
    #[command(flatten)]
    Graph(GraphCommand),
}

/// Operations on the graph.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum GraphCommand {
    /// Add a vertex and print its key
    AddVertex {
        /// Explicit key (otherwise taken from the payload's `_key` or generated)
        #[arg(short, long)]
        key: Option<String>,
        /// JSON payload
        #[arg(short, long, default_value = "{}")]
        payload: String,
    },
    /// Print a vertex payload
    GetVertex {
        /// Vertex key
        key: String,
    },
    /// Add an edge, refusing duplicates and cycles
    AddEdge {
        /// Source vertex
        from: String,
        /// Target vertex
        to: String,
    },
    /// Delete an edge
    DeleteEdge {
        /// Source vertex
        from: String,
        /// Target vertex
        to: String,
    },
    /// Delete a vertex without incident edges
    DeleteVertex {
        /// Vertex key
        key: String,
    },
    /// Check whether an edge exists
    IsEdge {
        /// Source vertex
        from: String,
        /// Target vertex
        to: String,
    },
    /// Print the shortest path between two vertices
    Path {
        /// Start vertex
        from: String,
        /// End vertex
        to: String,
    },
    /// List vertices without parents
    Roots,
    /// List vertices without children
    Leaves,
    /// List the ancestors of a vertex
    Ancestors {
        /// Vertex key
        key: String,
        /// Depth-first, listing a vertex once per path
        #[arg(long)]
        dfs: bool,
    },
    /// List the descendants of a vertex
    Descendants {
        /// Vertex key
        key: String,
        /// Depth-first, listing a vertex once per path
        #[arg(long)]
        dfs: bool,
    },
    /// Print vertex and edge counts
    Stats,
    /// Print every vertex with its children
    Show,
}

fn load_config(args: &Args) -> anyhow::Result<DagConfig> {
    let mut config = match &args.config {
        Some(path) => DagConfig::load_from(path)?,
        None => DagConfig::load()?,
    };
    if let Some(dir) = &args.data_dir {
        config.storage.data_dir.clone_from(dir);
        config.validate()?;
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let command = match args.command {
        Command::Config => return commands::print_config(&config, &mut out),
        Command::Graph(command) => command,
    };

    tracing::debug!("Data directory: {}", config.storage.data_dir.display());
    let store = LogStore::open_with_options(&config.storage.data_dir, config.log_store_options())
        .with_context(|| {
            format!(
                "failed to open store at {}",
                config.storage.data_dir.display()
            )
        })?;
    let dag = Dag::with_config(store, &config.traversal);
    commands::run(&dag, &command, &mut out)
}

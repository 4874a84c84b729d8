//! Command-line front end for the Path Solver. Mirrors the shape of the
//! teacher's `tool` binary (`clap::Parser`, `stderrlog` for verbosity,
//! `dirs::home_dir` for a default data directory) applied to a single
//! `Run`-style operation instead of a whole dump-import pipeline.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use wikiwalk::{DirectionStrategy, GraphStore, Solver, SolverConfig};

/// Find the shortest path between two Wikipedia articles.
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[clap(short, long)]
    verbose: bool,
    /// Path to the graph database (overrides WIKIWALK_DATABASE)
    #[clap(short, long)]
    database: Option<PathBuf>,
    /// Direction strategy: frontier_size or edge_count_query
    #[clap(long)]
    direction_strategy: Option<String>,
    /// Source article title
    source: String,
    /// Destination article title
    destination: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    stderrlog::new()
        .module(module_path!())
        .quiet(false)
        .verbosity(if cli.verbose { 4 } else { 2 })
        .timestamp(stderrlog::Timestamp::Second)
        .init()
        .unwrap();

    let mut config = SolverConfig::from_env();
    if let Some(database) = cli.database {
        config.database_path = database;
    }
    if let Some(strategy) = cli.direction_strategy.as_deref() {
        config.direction_strategy = match strategy {
            "edge_count_query" => DirectionStrategy::EdgeCountQuery,
            "frontier_size" => DirectionStrategy::FrontierSize,
            other => {
                eprintln!("unrecognized direction strategy {other:?}, using frontier_size");
                DirectionStrategy::FrontierSize
            }
        };
    }

    let store = GraphStore::connect(&config.database_path)
        .await
        .with_context(|| format!("opening graph database at {}", config.database_path.display()))?;

    let solver = Solver::new(store, config.direction_strategy);
    let response = solver
        .shortest_paths(&cli.source, &cli.destination)
        .await
        .with_context(|| format!("solving {:?} -> {:?}", cli.source, cli.destination))?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The single recognized knob controlling Path Solver behavior: which
/// heuristic it uses to pick the expansion side at each BFS level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionStrategy {
    /// Expand whichever frontier currently has fewer pages. No database
    /// round-trip; relies on mean in-degree tracking mean out-degree.
    FrontierSize,
    /// Expand whichever frontier has fewer total edges, queried exactly.
    EdgeCountQuery,
}

impl Default for DirectionStrategy {
    fn default() -> Self {
        DirectionStrategy::FrontierSize
    }
}

/// Process configuration, read from the environment the way the teacher's
/// server binary reads `DATA_ROOT`/`PORT`/`ADDRESS`.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub database_path: PathBuf,
    pub direction_strategy: DirectionStrategy,
}

impl SolverConfig {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let database_path = std::env::var("WIKIWALK_DATABASE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_database_path());

        let direction_strategy = match std::env::var("WIKIWALK_DIRECTION_STRATEGY")
            .ok()
            .as_deref()
        {
            Some("edge_count_query") => DirectionStrategy::EdgeCountQuery,
            Some("frontier_size") => DirectionStrategy::FrontierSize,
            Some(other) => {
                log::warn!(
                    "unrecognized WIKIWALK_DIRECTION_STRATEGY={other:?}, falling back to frontier_size"
                );
                DirectionStrategy::FrontierSize
            }
            None => DirectionStrategy::FrontierSize,
        };

        SolverConfig {
            database_path,
            direction_strategy,
        }
    }

    fn default_database_path() -> PathBuf {
        let home_dir = dirs::home_dir().unwrap_or_default();
        home_dir.join("data").join("wikiwalk").join("graph.db")
    }
}

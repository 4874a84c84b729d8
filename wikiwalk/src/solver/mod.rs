//! The Path Solver (§4.2): resolves two titles to page IDs and finds every
//! shortest path between them.
//!
//! Grounded on `WikiTaskSolver.find_shortest_path` in
//! `examples/original_source/src/wiki_arena/solver/solver.py` for the
//! overall flow (Tier-2 bookkeeping before the trivial-case check, trivial
//! case short-circuit, unique-ID batch title conversion, solve-summary
//! logging), and on the teacher's `GraphDB::bfs` for wiring a solver method
//! around a stored connection and returning a serializable response.

mod bfs;

use std::collections::HashSet;
use std::time::Instant;

use serde::Serialize;

use crate::cache::{BackwardSnapshot, Tier1Cache, Tier2Cache};
use crate::config::DirectionStrategy;
use crate::errors::SolverError;
use crate::graph_store::GraphStore;

/// The result of a `shortest_paths` call: every shortest path as a list of
/// readable titles, the shared path length, and how long the solve took.
#[derive(Debug, Clone, Serialize)]
pub struct SolverResponse {
    pub paths: Vec<Vec<String>>,
    pub path_length: u32,
    pub computation_time_ms: f64,
}

/// Finds shortest paths between titles in a `GraphStore`, backed by the
/// Tier-1/Tier-2 query-scoped cache.
pub struct Solver {
    store: GraphStore,
    tier1: Tier1Cache,
    tier2: Tier2Cache,
    direction_strategy: DirectionStrategy,
}

impl Solver {
    pub fn new(store: GraphStore, direction_strategy: DirectionStrategy) -> Self {
        Solver {
            store,
            tier1: Tier1Cache::new(),
            tier2: Tier2Cache::new(),
            direction_strategy,
        }
    }

    /// Finds every shortest path from `start_title` to `target_title`.
    pub async fn shortest_paths(
        &self,
        start_title: &str,
        target_title: &str,
    ) -> Result<SolverResponse, SolverError> {
        let started = Instant::now();

        let start_id = self
            .tier1
            .get_page_id(&self.store, start_title)
            .await?
            .ok_or_else(|| SolverError::StartPageNotFound(start_title.to_owned()))?;
        let target_id = self
            .tier1
            .get_page_id(&self.store, target_title)
            .await?
            .ok_or_else(|| SolverError::TargetPageNotFound(target_title.to_owned()))?;

        if start_id == target_id {
            self.tier2.touch_target(target_id).await;
            let title = self
                .tier1
                .get_page_title(&self.store, start_id)
                .await?
                .unwrap_or_else(|| start_title.to_owned());
            return Ok(SolverResponse {
                paths: vec![vec![title]],
                path_length: 0,
                computation_time_ms: elapsed_ms(started),
            });
        }

        let strategy = self.direction_strategy;
        let outcome = self
            .tier2
            .run_exclusive(target_id, move |existing| {
                let store = &self.store;
                let tier1 = &self.tier1;
                async move {
                    let initial_backward = existing;
                    let outcome = bfs::bidirectional_bfs(
                        store,
                        tier1,
                        start_id,
                        target_id,
                        strategy,
                        initial_backward,
                    )
                    .await;
                    match outcome {
                        Ok(outcome) => {
                            let fresh_snapshot = if outcome.backward_was_fresh {
                                Some(BackwardSnapshot {
                                    visited: outcome.visited_backward.clone(),
                                    unvisited: outcome.unvisited_backward.clone(),
                                })
                            } else {
                                None
                            };
                            (Ok(outcome), fresh_snapshot)
                        }
                        Err(e) => (Err(e), None),
                    }
                }
            })
            .await?;

        if outcome.paths.is_empty() {
            return Err(SolverError::NoPath {
                start: start_title.to_owned(),
                target: target_title.to_owned(),
            });
        }

        let unique_ids: Vec<u32> = outcome
            .paths
            .iter()
            .flatten()
            .copied()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let titles = self.tier1.batch_page_titles(&self.store, &unique_ids).await?;

        let mut rendered_paths = Vec::with_capacity(outcome.paths.len());
        'paths: for path in &outcome.paths {
            let mut rendered = Vec::with_capacity(path.len());
            for &id in path {
                match titles.get(&id).and_then(|t| t.clone()) {
                    Some(title) => rendered.push(title),
                    None => {
                        log::warn!("dropping path containing page {id} with no resolvable title");
                        continue 'paths;
                    }
                }
            }
            rendered_paths.push(rendered);
        }

        if rendered_paths.is_empty() {
            return Err(SolverError::NoPath {
                start: start_title.to_owned(),
                target: target_title.to_owned(),
            });
        }

        let path_length = rendered_paths[0].len() as u32 - 1;
        let computation_time_ms = elapsed_ms(started);
        log::info!(
            "solved {start_title:?} -> {target_title:?}: {} path(s) of length {path_length} in {} level(s), {computation_time_ms:.1}ms",
            rendered_paths.len(),
            outcome.levels,
        );

        Ok(SolverResponse {
            paths: rendered_paths,
            path_length,
            computation_time_ms,
        })
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

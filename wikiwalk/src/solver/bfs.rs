//! Bidirectional BFS over page IDs with full shortest-path enumeration.
//!
//! Grounded directly on `WikiTaskSolver._bidirectional_bfs` and
//! `_get_paths_recursive` in
//! `examples/original_source/src/wiki_arena/solver/solver.py` for the
//! level/intersection/reconstruction control flow (it is the only
//! reference that enumerates *all* shortest paths and supports both
//! direction strategies), expressed in the teacher's own idiom for a
//! Rust bidirectional BFS: `u32`-keyed parent maps, an explicit sentinel
//! for "no parent", and recursive path rendering guarded by the
//! already-visited map (`src/bfs.rs::breadth_first_search` /
//! `render_paths` / `NeighborList`).

use std::collections::HashMap;

use itertools::Itertools;

use crate::cache::{BackwardSnapshot, Tier1Cache};
use crate::config::DirectionStrategy;
use crate::errors::SolverError;
use crate::graph_store::GraphStore;

pub(crate) type ParentMap = HashMap<u32, Vec<Option<u32>>>;

pub(crate) struct BfsOutcome {
    pub paths: Vec<Vec<u32>>,
    pub levels: u32,
    pub visited_backward: ParentMap,
    pub unvisited_backward: ParentMap,
    /// True if the backward side was not seeded from a Tier-2 snapshot,
    /// i.e. the state it ends with is eligible to become the next one.
    pub backward_was_fresh: bool,
}

/// Runs one bidirectional BFS from `start_id` to `target_id`. `initial_backward`,
/// when present, seeds the backward side from a reused Tier-2 snapshot
/// (`visited`, `unvisited`); the forward side always starts fresh.
pub(crate) async fn bidirectional_bfs(
    store: &GraphStore,
    tier1: &Tier1Cache,
    start_id: u32,
    target_id: u32,
    strategy: DirectionStrategy,
    initial_backward: Option<BackwardSnapshot>,
) -> Result<BfsOutcome, SolverError> {
    let mut unvisited_forward: ParentMap = HashMap::from([(start_id, vec![None])]);
    let mut visited_forward: ParentMap = HashMap::new();

    let backward_was_fresh = initial_backward.is_none();
    let BackwardSnapshot {
        visited: mut visited_backward,
        unvisited: mut unvisited_backward,
    } = initial_backward.unwrap_or_else(|| BackwardSnapshot {
        visited: HashMap::new(),
        unvisited: HashMap::from([(target_id, vec![None])]),
    });

    let mut final_paths: Vec<Vec<u32>> = Vec::new();
    let mut level: u32 = 0;

    while final_paths.is_empty() && !unvisited_forward.is_empty() && !unvisited_backward.is_empty()
    {
        let mut expand_forward = match strategy {
            DirectionStrategy::FrontierSize => unvisited_forward.len() < unvisited_backward.len(),
            DirectionStrategy::EdgeCountQuery => {
                let forward_ids: Vec<u32> = unvisited_forward.keys().copied().collect();
                let backward_ids: Vec<u32> = unvisited_backward.keys().copied().collect();
                let forward_count = tier1.outgoing_count_sum(store, &forward_ids).await?;
                let backward_count = tier1.incoming_count_sum(store, &backward_ids).await?;
                forward_count < backward_count
            }
        };
        if unvisited_forward.is_empty() {
            expand_forward = false;
        }
        if unvisited_backward.is_empty() {
            expand_forward = true;
        }

        if expand_forward {
            let frontier: Vec<u32> = unvisited_forward.keys().copied().collect();
            merge_into(&mut visited_forward, std::mem::take(&mut unvisited_forward));

            let fetches = frontier.iter().map(|&id| tier1.get_outgoing(store, id));
            let neighbor_lists = futures::future::join_all(fetches).await;

            let mut new_frontier: ParentMap = HashMap::new();
            for (&src_id, neighbors) in frontier.iter().zip(neighbor_lists) {
                for next_id in neighbors?.into_iter().unique() {
                    if !visited_forward.contains_key(&next_id) {
                        new_frontier.entry(next_id).or_default().push(Some(src_id));
                    }
                }
            }
            unvisited_forward = new_frontier;
        } else {
            let frontier: Vec<u32> = unvisited_backward.keys().copied().collect();
            merge_into(&mut visited_backward, std::mem::take(&mut unvisited_backward));

            let fetches = frontier.iter().map(|&id| tier1.get_incoming(store, id));
            let neighbor_lists = futures::future::join_all(fetches).await;

            let mut new_frontier: ParentMap = HashMap::new();
            for (&dst_id, neighbors) in frontier.iter().zip(neighbor_lists) {
                for prev_id in neighbors?.into_iter().unique() {
                    if !visited_backward.contains_key(&prev_id) {
                        new_frontier.entry(prev_id).or_default().push(Some(dst_id));
                    }
                }
            }
            unvisited_backward = new_frontier;
        }

        let meeting_nodes: Vec<u32> = if expand_forward {
            unvisited_forward
                .keys()
                .copied()
                .filter(|id| visited_backward.contains_key(id) || unvisited_backward.contains_key(id))
                .collect()
        } else {
            unvisited_backward
                .keys()
                .copied()
                .filter(|id| visited_forward.contains_key(id) || unvisited_forward.contains_key(id))
                .collect()
        };

        for meeting_id in meeting_nodes {
            let forward_parents = unvisited_forward
                .get(&meeting_id)
                .or_else(|| visited_forward.get(&meeting_id));
            let backward_parents = unvisited_backward
                .get(&meeting_id)
                .or_else(|| visited_backward.get(&meeting_id));

            for path in reconstruct_paths(
                meeting_id,
                start_id,
                target_id,
                forward_parents,
                backward_parents,
                &visited_forward,
                &visited_backward,
            ) {
                if !final_paths.contains(&path) {
                    final_paths.push(path);
                }
            }
        }

        level += 1;
    }

    Ok(BfsOutcome {
        paths: final_paths,
        levels: level,
        visited_backward,
        unvisited_backward,
        backward_was_fresh,
    })
}

/// Promotes a level's frontier into the side's visited set, merging parent
/// lists for any node already present there (defensive: under the graph's
/// invariants a promoted node is never already visited, but a node's
/// parent list can still legitimately gain entries across repeated merges
/// of the same key within one promotion).
fn merge_into(visited: &mut ParentMap, unvisited: ParentMap) {
    for (id, new_parents) in unvisited {
        let entry = visited.entry(id).or_default();
        for parent in new_parents {
            if !entry.contains(&parent) {
                entry.push(parent);
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn reconstruct_paths(
    meeting_id: u32,
    start_id: u32,
    target_id: u32,
    forward_parents: Option<&Vec<Option<u32>>>,
    backward_parents: Option<&Vec<Option<u32>>>,
    visited_forward: &ParentMap,
    visited_backward: &ParentMap,
) -> Vec<Vec<u32>> {
    let forward_prefixes = match forward_parents {
        Some(parents) => render_paths(parents, visited_forward),
        None if meeting_id == start_id => vec![Vec::new()],
        None => return Vec::new(),
    };
    let backward_suffixes = match backward_parents {
        Some(parents) => render_paths(parents, visited_backward),
        None if meeting_id == target_id => vec![Vec::new()],
        None => return Vec::new(),
    };

    let mut paths = Vec::with_capacity(forward_prefixes.len() * backward_suffixes.len());
    for prefix in &forward_prefixes {
        for suffix in &backward_suffixes {
            let mut path = prefix.clone();
            path.push(meeting_id);
            path.extend(suffix.iter().rev().copied());
            paths.push(path);
        }
    }
    paths
}

/// Recursively enumerates every path from a BFS origin (`None` parent) to
/// the children named by `parents`, walking the side's visited map. The
/// visited-map guard against re-entering a node breaks the cycles the link
/// graph contains in abundance; the only recursion here is over the
/// parent relation, a DAG by construction of level-synchronous BFS.
fn render_paths(parents: &[Option<u32>], visited: &ParentMap) -> Vec<Vec<u32>> {
    let mut paths = Vec::new();
    for parent in parents {
        match parent {
            None => paths.push(Vec::new()),
            Some(id) => {
                let grandparents = match visited.get(id) {
                    Some(g) => g,
                    None => {
                        log::error!("path reconstruction: {id} missing from visited map");
                        continue;
                    }
                };
                for mut prefix in render_paths(grandparents, visited) {
                    prefix.push(*id);
                    paths.push(prefix);
                }
            }
        }
    }
    paths
}

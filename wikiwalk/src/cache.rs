//! The Query-Scoped Cache (§4.3): a per-process Tier-1 memoization layer
//! plus a Tier-2 backward-BFS snapshot scoped to the active target.
//!
//! Grounded on `WikiTaskSolver`'s `self.title_to_page_id` /
//! `self.cached_backward_bfs_state` in
//! `examples/original_source/src/wiki_arena/solver/solver.py`, expressed
//! with the teacher's preference for `std::sync::RwLock`-guarded maps
//! (`wikiwalk::redirect::RedirectMap`) for the monotonic Tier-1 caches and
//! a `tokio::sync::Mutex` for the single stateful resource that must be
//! serialized across an entire BFS.

use std::collections::HashMap;
use std::future::Future;
use std::sync::RwLock;

use crate::errors::GraphStoreError;
use crate::graph_store::GraphStore;

type ParentMap = HashMap<u32, Vec<Option<u32>>>;

/// A backward-BFS state snapshot, keyed implicitly by the target it was
/// computed against (tracked separately in `Tier2Cache`).
#[derive(Clone, Default)]
pub(crate) struct BackwardSnapshot {
    pub visited: ParentMap,
    pub unvisited: ParentMap,
}

/// Per-process memoization of title/ID lookups and adjacency data. Entries
/// are never invalidated: the underlying graph is immutable for the
/// lifetime of the process.
pub(crate) struct Tier1Cache {
    title_to_id: RwLock<HashMap<String, Option<u32>>>,
    id_to_title: RwLock<HashMap<u32, Option<String>>>,
    outgoing: RwLock<HashMap<u32, Vec<u32>>>,
    incoming: RwLock<HashMap<u32, Vec<u32>>>,
    outgoing_count: RwLock<HashMap<u32, u64>>,
    incoming_count: RwLock<HashMap<u32, u64>>,
}

impl Tier1Cache {
    pub fn new() -> Self {
        Tier1Cache {
            title_to_id: RwLock::new(HashMap::new()),
            id_to_title: RwLock::new(HashMap::new()),
            outgoing: RwLock::new(HashMap::new()),
            incoming: RwLock::new(HashMap::new()),
            outgoing_count: RwLock::new(HashMap::new()),
            incoming_count: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get_page_id(
        &self,
        store: &GraphStore,
        title: &str,
    ) -> Result<Option<u32>, GraphStoreError> {
        if let Some(cached) = self.title_to_id.read().unwrap().get(title) {
            return Ok(*cached);
        }
        let resolved = store.resolve_title(title, 0).await?;
        self.title_to_id
            .write()
            .unwrap()
            .insert(title.to_owned(), resolved);
        Ok(resolved)
    }

    pub async fn get_page_title(
        &self,
        store: &GraphStore,
        id: u32,
    ) -> Result<Option<String>, GraphStoreError> {
        if let Some(cached) = self.id_to_title.read().unwrap().get(&id) {
            return Ok(cached.clone());
        }
        let title = store.page_title(id).await?;
        self.id_to_title.write().unwrap().insert(id, title.clone());
        Ok(title)
    }

    pub async fn get_outgoing(
        &self,
        store: &GraphStore,
        id: u32,
    ) -> Result<Vec<u32>, GraphStoreError> {
        if let Some(cached) = self.outgoing.read().unwrap().get(&id) {
            return Ok(cached.clone());
        }
        let links = store.outgoing(id).await?;
        self.outgoing_count
            .write()
            .unwrap()
            .insert(id, links.len() as u64);
        self.outgoing.write().unwrap().insert(id, links.clone());
        Ok(links)
    }

    pub async fn get_incoming(
        &self,
        store: &GraphStore,
        id: u32,
    ) -> Result<Vec<u32>, GraphStoreError> {
        if let Some(cached) = self.incoming.read().unwrap().get(&id) {
            return Ok(cached.clone());
        }
        let links = store.incoming(id).await?;
        self.incoming_count
            .write()
            .unwrap()
            .insert(id, links.len() as u64);
        self.incoming.write().unwrap().insert(id, links.clone());
        Ok(links)
    }

    pub async fn batch_page_titles(
        &self,
        store: &GraphStore,
        ids: &[u32],
    ) -> Result<HashMap<u32, Option<String>>, GraphStoreError> {
        let mut result = HashMap::with_capacity(ids.len());
        let mut missing = Vec::new();
        {
            let cache = self.id_to_title.read().unwrap();
            for &id in ids {
                match cache.get(&id) {
                    Some(title) => {
                        result.insert(id, title.clone());
                    }
                    None => missing.push(id),
                }
            }
        }
        if !missing.is_empty() {
            let titles = store.batch_page_titles(&missing).await?;
            let mut cache = self.id_to_title.write().unwrap();
            for (id, title) in missing.into_iter().zip(titles) {
                cache.insert(id, title.clone());
                result.insert(id, title);
            }
        }
        Ok(result)
    }

    /// Sums outgoing counts, fetching only the IDs not already cached
    /// individually. Per the Open Question in §9, counts missing from the
    /// cache are summed via a single aggregate query rather than
    /// attributed back to individual pages.
    pub async fn outgoing_count_sum(
        &self,
        store: &GraphStore,
        ids: &[u32],
    ) -> Result<u64, GraphStoreError> {
        self.count_sum(ids, &self.outgoing_count, |missing| async move {
            store.outgoing_count_sum(&missing).await
        })
        .await
    }

    pub async fn incoming_count_sum(
        &self,
        store: &GraphStore,
        ids: &[u32],
    ) -> Result<u64, GraphStoreError> {
        self.count_sum(ids, &self.incoming_count, |missing| async move {
            store.incoming_count_sum(&missing).await
        })
        .await
    }

    async fn count_sum<F, Fut>(
        &self,
        ids: &[u32],
        cache: &RwLock<HashMap<u32, u64>>,
        fetch_missing: F,
    ) -> Result<u64, GraphStoreError>
    where
        F: FnOnce(Vec<u32>) -> Fut,
        Fut: Future<Output = Result<u64, GraphStoreError>>,
    {
        let mut total = 0u64;
        let mut missing = Vec::new();
        {
            let guard = cache.read().unwrap();
            for &id in ids {
                match guard.get(&id) {
                    Some(count) => total += count,
                    None => missing.push(id),
                }
            }
        }
        if !missing.is_empty() {
            total += fetch_missing(missing).await?;
        }
        Ok(total)
    }
}

struct Tier2State {
    active_target_id: Option<u32>,
    snapshot: Option<BackwardSnapshot>,
}

/// The active-target backward-BFS snapshot (§4.3 Tier 2). Exclusive access
/// is held for the duration of a whole query via `run_exclusive`, which is
/// one of the two serialization strategies the concurrency model allows.
pub(crate) struct Tier2Cache {
    state: tokio::sync::Mutex<Tier2State>,
}

impl Tier2Cache {
    pub fn new() -> Self {
        Tier2Cache {
            state: tokio::sync::Mutex::new(Tier2State {
                active_target_id: None,
                snapshot: None,
            }),
        }
    }

    /// Records a target-change invalidation without running a BFS. Used by
    /// the solver's trivial `start == target` path, which still performs
    /// cache bookkeeping per §4.3 even though it never touches the
    /// snapshot.
    pub async fn touch_target(&self, target_id: u32) {
        let mut state = self.state.lock().await;
        if state.active_target_id != Some(target_id) {
            state.active_target_id = Some(target_id);
            state.snapshot = None;
        }
    }

    /// Runs `f` with exclusive access to the snapshot for `target_id`,
    /// invalidating it first if the target has changed. `f` receives a
    /// clone of the existing snapshot (or `None`) and returns its result
    /// alongside an optional new snapshot to store. The lock is held
    /// across `f`'s whole execution, so a concurrent call against the same
    /// cache observes either this query's full effect or none of it.
    pub async fn run_exclusive<F, Fut, T>(&self, target_id: u32, f: F) -> T
    where
        F: FnOnce(Option<BackwardSnapshot>) -> Fut,
        Fut: Future<Output = (T, Option<BackwardSnapshot>)>,
    {
        let mut state = self.state.lock().await;
        if state.active_target_id != Some(target_id) {
            state.active_target_id = Some(target_id);
            state.snapshot = None;
        }
        let existing = state.snapshot.clone();
        let (result, fresh_snapshot) = f(existing).await;
        if let Some(snapshot) = fresh_snapshot {
            if state.active_target_id == Some(target_id) {
                state.snapshot = Some(snapshot);
            }
        }
        result
    }
}

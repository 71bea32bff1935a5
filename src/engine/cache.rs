//! Per-turn speculative task cache, keyed by tile index.
//!
//! A generation counter is bumped once per roll; completions stamped with an
//! older generation are discarded. Overlapping fetches for the same tile are
//! tolerated; content is idempotent-equivalent, so last write wins.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::tasks::{FallbackPool, TaskGenerator, TaskRequest, TaskSet};

#[derive(Default)]
struct CacheInner {
    generation: u64,
    map: HashMap<usize, TaskSet>,
}

#[derive(Default)]
pub struct TaskCache {
    inner: Mutex<CacheInner>,
}

impl TaskCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate everything and start a new turn's generation.
    pub fn begin_turn(&self) -> u64 {
        let mut inner = self.inner.lock().expect("task cache poisoned");
        inner.generation += 1;
        inner.map.clear();
        inner.generation
    }

    pub fn generation(&self) -> u64 {
        self.inner.lock().expect("task cache poisoned").generation
    }

    /// Insert a completed fetch. Returns false (and drops the set) when the
    /// turn has already moved on to a newer generation.
    pub fn insert(&self, generation: u64, tile: usize, set: TaskSet) -> bool {
        let mut inner = self.inner.lock().expect("task cache poisoned");
        if inner.generation != generation {
            return false;
        }
        inner.map.insert(tile, set);
        true
    }

    pub fn get(&self, tile: usize) -> Option<TaskSet> {
        self.inner
            .lock()
            .expect("task cache poisoned")
            .map
            .get(&tile)
            .cloned()
    }

    pub fn contains(&self, tile: usize) -> bool {
        self.inner
            .lock()
            .expect("task cache poisoned")
            .map
            .contains_key(&tile)
    }
}

/// Fire one background fetch per tile. Requires a tokio runtime; outside one
/// (plain unit tests, sync callers) prefetching is skipped and landings fall
/// back to live fetches.
pub fn spawn_prefetch(
    cache: &Arc<TaskCache>,
    generator: &Arc<dyn TaskGenerator>,
    generation: u64,
    requests: Vec<(usize, TaskRequest)>,
) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        tracing::debug!("no async runtime, skipping prefetch");
        return;
    };

    for (tile, request) in requests {
        if cache.contains(tile) {
            continue;
        }
        let cache = Arc::clone(cache);
        let generator = Arc::clone(generator);
        handle.spawn(async move {
            let set = match generator.generate(request.clone()).await {
                Ok(set) => set,
                Err(e) => {
                    tracing::warn!(tile, error = %e, "prefetch failed, using fallback pool");
                    FallbackPool::build(&request)
                }
            };
            if !cache.insert(generation, tile, set) {
                tracing::debug!(tile, generation, "discarded stale prefetch");
            }
        });
    }
}

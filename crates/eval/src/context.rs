//! Per-evaluation memoization of criterion results.
//!
//! Each criterion id owns one slot. The first caller to reach an empty
//! slot runs the evaluation; concurrent callers for the same id block
//! until that single result is published, then share it. Map shards are
//! only locked long enough to fetch or create a slot, never while a
//! criterion is being evaluated, so evaluations that recurse into other
//! criteria cannot deadlock on the map itself.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tracing::trace;

use crate::types::EvaluationResult;

type Slot = Arc<OnceLock<Arc<EvaluationResult>>>;

#[derive(Debug, Default)]
pub struct EvaluationContext {
    slots: DashMap<String, Slot>,
    evaluations: AtomicUsize,
}

impl EvaluationContext {
    pub fn new() -> Self {
        EvaluationContext::default()
    }

    /// Return the cached result for `id`, running `evaluate` if none exists.
    /// `evaluate` runs at most once per id for the lifetime of the context.
    ///
    /// `evaluate` must not ask for `id` again, directly or through other
    /// criteria; specification validation rules that out.
    pub fn get_or_evaluate<F>(&self, id: &str, evaluate: F) -> Arc<EvaluationResult>
    where
        F: FnOnce() -> EvaluationResult,
    {
        let slot = self.slot(id);
        let mut computed = false;
        let result = slot.get_or_init(|| {
            computed = true;
            self.evaluations.fetch_add(1, Ordering::Relaxed);
            Arc::new(evaluate())
        });
        if !computed {
            trace!(criterion = id, "cache hit");
        }
        Arc::clone(result)
    }

    /// The finished result for `id`, if any. Never waits for an evaluation
    /// in progress.
    pub fn get_cached(&self, id: &str) -> Option<Arc<EvaluationResult>> {
        self.slots.get(id).and_then(|slot| slot.get().cloned())
    }

    /// How many evaluations actually ran (cache misses).
    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }

    /// Number of finished results.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|entry| entry.value().get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, id: &str) -> Slot {
        if let Some(slot) = self.slots.get(id) {
            return Arc::clone(slot.value());
        }
        Arc::clone(self.slots.entry(id.to_string()).or_default().value())
    }
}

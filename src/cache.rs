//! Single-slot store for the most recent summary.
//!
//! Created empty at startup and owned by the API state. Every read and every
//! write is atomic; nothing serialises the solves that produce the values,
//! so concurrent writers resolve last-writer-wins.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::summary::Summary;

#[derive(Debug, Default)]
pub struct ResultCache {
    slot: RwLock<Option<Arc<Summary>>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value, if any.
    pub fn get(&self) -> Option<Arc<Summary>> {
        self.slot.read().clone()
    }

    /// Replaces the cached value unconditionally and returns it.
    pub fn store(&self, summary: Summary) -> Arc<Summary> {
        let summary = Arc::new(summary);
        *self.slot.write() = Some(Arc::clone(&summary));
        debug!(converged = summary.converged(), "result cache overwritten");
        summary
    }

    /// Stores `summary` only if the slot is still empty.
    ///
    /// Returns whatever the slot holds afterwards, so a value written by a
    /// concurrent [`ResultCache::store`] is kept rather than clobbered.
    pub fn fill_if_empty(&self, summary: Summary) -> Arc<Summary> {
        let mut slot = self.slot.write();
        match slot.as_ref() {
            Some(existing) => Arc::clone(existing),
            None => {
                let summary = Arc::new(summary);
                *slot = Some(Arc::clone(&summary));
                debug!(converged = summary.converged(), "result cache populated");
                summary
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::Divergence;

    fn diverged(msg: &str) -> Summary {
        Summary::Diverged(Divergence::new(msg))
    }

    #[test]
    fn starts_empty() {
        assert!(ResultCache::new().get().is_none());
    }

    #[test]
    fn store_overwrites() {
        let cache = ResultCache::new();
        cache.store(diverged("first"));
        cache.store(diverged("second"));
        assert_eq!(cache.get().as_deref(), Some(&diverged("second")));
    }

    #[test]
    fn fill_if_empty_keeps_existing_value() {
        let cache = ResultCache::new();
        let first = cache.fill_if_empty(diverged("base"));
        assert_eq!(*first, diverged("base"));

        cache.store(diverged("scenario"));
        let kept = cache.fill_if_empty(diverged("late base"));
        assert_eq!(*kept, diverged("scenario"));
    }
}

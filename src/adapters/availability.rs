use std::future::Future;
use std::sync::RwLock;

/// Memoized capability probe for one external tool.
///
/// The first definite answer wins and sticks for the process lifetime;
/// `invalidate` is the operational escape hatch for re-probing after a
/// previously-missing tool gets installed. Concurrent first probes race to
/// the same value, so no further synchronization is needed. The lock guard
/// is never held across an await.
pub struct AvailabilityCache {
    cell: RwLock<Option<bool>>,
}

impl AvailabilityCache {
    pub fn new() -> Self {
        Self {
            cell: RwLock::new(None),
        }
    }

    /// Return the cached answer, running `probe` only on the first call.
    pub async fn get_or_probe<F, Fut>(&self, probe: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = bool>,
    {
        if let Some(known) = *self.cell.read().unwrap() {
            return known;
        }

        let answer = probe().await;

        let mut cell = self.cell.write().unwrap();
        *cell.get_or_insert(answer)
    }

    /// Forget the memoized answer so the next call re-probes.
    pub fn invalidate(&self) {
        *self.cell.write().unwrap() = None;
    }

    /// Current cached value, if any probe has completed.
    pub fn peek(&self) -> Option<bool> {
        *self.cell.read().unwrap()
    }
}

impl Default for AvailabilityCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_second_call_is_a_cache_hit() {
        let cache = AvailabilityCache::new();
        let probes = AtomicUsize::new(0);

        let first = cache
            .get_or_probe(|| async {
                probes.fetch_add(1, Ordering::SeqCst);
                true
            })
            .await;
        let second = cache
            .get_or_probe(|| async {
                probes.fetch_add(1, Ordering::SeqCst);
                false
            })
            .await;

        assert!(first);
        assert!(second, "first answer wins");
        assert_eq!(probes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_negative_answer_is_also_sticky() {
        let cache = AvailabilityCache::new();

        assert!(!cache.get_or_probe(|| async { false }).await);
        assert!(!cache.get_or_probe(|| async { true }).await);
        assert_eq!(cache.peek(), Some(false));
    }

    #[tokio::test]
    async fn test_invalidate_forces_reprobe() {
        let cache = AvailabilityCache::new();

        assert!(!cache.get_or_probe(|| async { false }).await);
        cache.invalidate();
        assert_eq!(cache.peek(), None);
        assert!(cache.get_or_probe(|| async { true }).await);
    }
}

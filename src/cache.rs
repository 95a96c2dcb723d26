// src/cache.rs

use crate::model::ChangeSet;
use std::collections::HashMap;
use std::sync::Arc;

/// Result of asking the cache for a commit's change set.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Ready(Arc<ChangeSet>),
    /// A request for this id is already outstanding
    Pending,
    /// Nothing known yet; the caller must issue the request. The id is now pending.
    Fetch,
}

#[derive(Debug)]
enum Entry {
    Pending,
    Ready(Arc<ChangeSet>),
}

/// Memoized change sets keyed by commit id.
///
/// Entries are kept for the life of the process. The key space is bounded by
/// the number of loaded commits and values are summaries, not raw diffs.
#[derive(Debug, Default)]
pub struct ChangeSetCache {
    entries: HashMap<String, Entry>,
}

impl ChangeSetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_fetch(&mut self, id: &str) -> Lookup {
        match self.entries.get(id) {
            Some(Entry::Ready(set)) => Lookup::Ready(Arc::clone(set)),
            Some(Entry::Pending) => Lookup::Pending,
            None => {
                self.entries.insert(id.to_string(), Entry::Pending);
                Lookup::Fetch
            }
        }
    }

    /// Records the outcome of a fetch.
    ///
    /// Successes are kept; a failure clears the key so a later request fetches again.
    pub fn complete(
        &mut self,
        id: &str,
        result: Result<ChangeSet, String>,
    ) -> Result<Arc<ChangeSet>, String> {
        match result {
            Ok(set) => {
                let set = Arc::new(set);
                self.entries.insert(id.to_string(), Entry::Ready(Arc::clone(&set)));
                Ok(set)
            }
            Err(reason) => {
                self.entries.remove(id);
                Err(reason)
            }
        }
    }

    #[cfg(test)]
    pub fn get(&self, id: &str) -> Option<Arc<ChangeSet>> {
        match self.entries.get(id) {
            Some(Entry::Ready(set)) => Some(Arc::clone(set)),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn is_pending(&self, id: &str) -> bool {
        matches!(self.entries.get(id), Some(Entry::Pending))
    }

    /// Number of memoized change sets.
    pub fn len(&self) -> usize {
        self.entries.values().filter(|e| matches!(e, Entry::Ready(_))).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_lookup_requests_then_reports_pending() {
        let mut cache = ChangeSetCache::new();
        assert_eq!(cache.get_or_fetch("c0"), Lookup::Fetch);
        assert_eq!(cache.get_or_fetch("c0"), Lookup::Pending);
        assert!(cache.is_pending("c0"));
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn completed_sets_are_memoized() {
        let mut cache = ChangeSetCache::new();
        cache.get_or_fetch("c0");
        let set = ChangeSet { file_count: 1, total_additions: 3, ..ChangeSet::default() };
        let stored = cache.complete("c0", Ok(set.clone())).unwrap();

        assert_eq!(*stored, set);
        match cache.get_or_fetch("c0") {
            Lookup::Ready(found) => assert!(Arc::ptr_eq(&found, &stored)),
            other => panic!("expected a cached set, got {other:?}"),
        }
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn failures_are_not_memoized() {
        let mut cache = ChangeSetCache::new();
        cache.get_or_fetch("c0");
        let err = cache.complete("c0", Err("object not found".into())).unwrap_err();

        assert_eq!(err, "object not found");
        assert!(cache.get("c0").is_none());
        assert_eq!(cache.get_or_fetch("c0"), Lookup::Fetch);
    }
}

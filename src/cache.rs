//! Per-domain cache of check listings.
//!
//! Entries have no TTL. Every mutation that can change a domain's check list
//! must invalidate that domain, and a change to the domain set itself must
//! invalidate everything.

use crate::api::{Check, CheckId, DomainId};

use std::collections::HashMap;

/// Last known check list per domain.
#[derive(Debug, Default)]
pub struct EntityCache {
    entries: HashMap<DomainId, Vec<Check>>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, domain_id: DomainId) -> Option<&[Check]> {
        self.entries.get(&domain_id).map(Vec::as_slice)
    }

    /// Replace the entry for `domain_id` with a freshly fetched list.
    pub fn put(&mut self, domain_id: DomainId, checks: Vec<Check>) {
        self.entries.insert(domain_id, checks);
    }

    pub fn invalidate(&mut self, domain_id: DomainId) {
        if self.entries.remove(&domain_id).is_some() {
            tracing::debug!("EntityCache: invalidated domain {}", domain_id);
        }
    }

    pub fn invalidate_all(&mut self) {
        if !self.entries.is_empty() {
            tracing::debug!("EntityCache: invalidated {} domains", self.entries.len());
        }
        self.entries.clear();
    }

    /// Domain that owns `check_id`, if any cached listing contains it.
    pub fn owner_of(&self, check_id: CheckId) -> Option<DomainId> {
        self.entries
            .iter()
            .find(|(_, checks)| checks.iter().any(|c| c.id == check_id))
            .map(|(domain_id, _)| *domain_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::check;

    #[test]
    fn test_put_get_invalidate() {
        let mut cache = EntityCache::new();
        assert!(cache.get(1).is_none());

        cache.put(1, vec![check(10, 1, "http")]);
        cache.put(2, vec![check(20, 2, "tcp"), check(21, 2, "icmp")]);
        assert_eq!(cache.get(1).map(|c| c.len()), Some(1));
        assert_eq!(cache.len(), 2);

        cache.invalidate(1);
        assert!(cache.get(1).is_none());
        assert!(cache.get(2).is_some());

        // Invalidating a missing entry is a no-op
        cache.invalidate(42);

        cache.invalidate_all();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_put_overwrites_whole_entry() {
        let mut cache = EntityCache::new();
        cache.put(1, vec![check(10, 1, "http"), check(11, 1, "tcp")]);
        cache.put(1, vec![check(12, 1, "udp")]);

        let ids: Vec<_> = cache.get(1).unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![12]);
    }

    #[test]
    fn test_owner_of() {
        let mut cache = EntityCache::new();
        cache.put(1, vec![check(10, 1, "http")]);
        cache.put(2, vec![check(20, 2, "tcp")]);

        assert_eq!(cache.owner_of(20), Some(2));
        assert_eq!(cache.owner_of(99), None);
    }
}

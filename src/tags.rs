//! Tag Index Module
//!
//! Concurrent mapping between tags and the cache keys written under them,
//! used for bulk invalidation. A forward map (tag -> keys) answers "which
//! keys carry this tag"; a reverse map (key -> tags) makes pruning a removed
//! key O(its own tags) instead of a full scan.
//!
//! Locking is scoped to individual map entries (DashMap shard locks); there
//! is no index-wide lock. A tag whose key set becomes empty is deleted so
//! stale tags cannot accumulate.

use std::collections::HashSet;

use dashmap::DashMap;

// == Tag Index ==
/// Concurrent tag -> keys index with a reverse key -> tags map.
#[derive(Debug, Default)]
pub struct TagIndex {
    /// tag -> set of keys currently written under it
    by_tag: DashMap<String, HashSet<String>>,
    /// key -> set of tags it was last written with
    by_key: DashMap<String, HashSet<String>>,
}

impl TagIndex {
    // == Constructor ==
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    // == Insert ==
    /// Records that `key` was written with `tags`, replacing any previous
    /// membership wholesale. Passing no tags simply clears the key's
    /// membership.
    pub fn insert(&self, key: &str, tags: &[String]) {
        // Entries are replaced on re-set, so membership is too
        self.remove_key(key);

        if tags.is_empty() {
            return;
        }

        for tag in tags {
            self.by_tag
                .entry(tag.clone())
                .or_default()
                .insert(key.to_string());
        }
        self.by_key
            .insert(key.to_string(), tags.iter().cloned().collect());
    }

    // == Add ==
    /// Adds `key` to a single tag without touching the key's other
    /// memberships. Used to restore keys whose removal did not go through.
    pub fn add(&self, key: &str, tag: &str) {
        self.by_tag
            .entry(tag.to_string())
            .or_default()
            .insert(key.to_string());
        self.by_key
            .entry(key.to_string())
            .or_default()
            .insert(tag.to_string());
    }

    // == Remove Key ==
    /// Prunes `key` from every tag set referencing it. Tag sets that become
    /// empty are deleted. Returns the number of tags the key was pruned from.
    pub fn remove_key(&self, key: &str) -> usize {
        let Some((_, tags)) = self.by_key.remove(key) else {
            return 0;
        };

        let mut pruned = 0;
        for tag in &tags {
            if let Some(mut keys) = self.by_tag.get_mut(tag) {
                if keys.remove(key) {
                    pruned += 1;
                }
            }
            // Re-check emptiness under the entry lock to avoid racing a
            // concurrent insert into the same tag
            self.by_tag.remove_if(tag, |_, keys| keys.is_empty());
        }
        pruned
    }

    // == Snapshot And Clear ==
    /// Atomically takes the key set for `tag` and drops the tag.
    ///
    /// Keys added to the tag after the snapshot is taken survive until the
    /// next invalidation of that tag (next-call consistency).
    pub fn snapshot_and_clear(&self, tag: &str) -> Vec<String> {
        let Some((_, keys)) = self.by_tag.remove(tag) else {
            return Vec::new();
        };

        for key in &keys {
            if let Some(mut tags) = self.by_key.get_mut(key) {
                tags.remove(tag);
            }
            self.by_key.remove_if(key, |_, tags| tags.is_empty());
        }

        keys.into_iter().collect()
    }

    // == Lookups ==
    /// Returns the keys currently recorded under `tag`.
    pub fn keys_for(&self, tag: &str) -> Vec<String> {
        self.by_tag
            .get(tag)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the tags the key was last written with.
    pub fn tags_for(&self, key: &str) -> Vec<String> {
        self.by_key
            .get(key)
            .map(|tags| tags.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of live tags.
    pub fn tag_count(&self) -> usize {
        self.by_tag.len()
    }

    /// True when no tag has any member.
    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }

    // == Clear ==
    /// Drops the entire index.
    pub fn clear(&self) {
        self.by_tag.clear();
        self.by_key.clear();
    }
}

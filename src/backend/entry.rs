//! Stored Entry Module
//!
//! Defines the byte-level record a backend holds for one cache key. Entries
//! are immutable once written; a re-set replaces the record wholesale.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// == Cache Priority ==
/// Advisory priority attached at write time. Only a backend's eviction
/// policy consults it; lower priorities are evicted first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum CachePriority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

// == Stored Entry ==
/// Encoded payload plus the metadata a backend needs to expire, evict, and
/// hand the bytes back to the codec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    /// Encoded (and possibly compressed) value bytes
    pub payload: Vec<u8>,
    /// Whether the payload must be inflated before decoding
    pub compressed: bool,
    /// When the entry was written
    pub created_at: DateTime<Utc>,
    /// Absolute expiry, None = never expires
    pub expires_at: Option<DateTime<Utc>>,
    /// Tags the entry was written with
    pub tags: Vec<String>,
    /// Advisory eviction priority
    pub priority: CachePriority,
}

impl StoredEntry {
    // == Constructor ==
    /// Creates an entry expiring `ttl` from now. A TTL too large for the
    /// timestamp representation is treated as "never expires".
    pub fn new(
        payload: Vec<u8>,
        compressed: bool,
        ttl: Option<Duration>,
        tags: Vec<String>,
        priority: CachePriority,
    ) -> Self {
        let now = Utc::now();
        let expires_at = ttl
            .and_then(|t| chrono::Duration::from_std(t).ok())
            .map(|d| now + d);

        Self {
            payload,
            compressed,
            created_at: now,
            expires_at,
            tags,
            priority,
        }
    }

    // == Is Expired ==
    /// An entry is expired once the current time reaches its expiry.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => Utc::now() >= expires,
            None => false,
        }
    }

    // == Remaining TTL ==
    /// Time left before expiry: `Some(ZERO)` when already expired, `None`
    /// when the entry never expires.
    pub fn remaining_ttl(&self) -> Option<Duration> {
        self.expires_at.map(|expires| {
            (expires - Utc::now())
                .to_std()
                .unwrap_or(Duration::ZERO)
        })
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_without_ttl_never_expires() {
        let entry = StoredEntry::new(b"v".to_vec(), false, None, vec![], CachePriority::Normal);

        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired());
        assert!(entry.remaining_ttl().is_none());
    }

    #[test]
    fn test_entry_with_ttl() {
        let entry = StoredEntry::new(
            b"v".to_vec(),
            false,
            Some(Duration::from_secs(60)),
            vec!["t".to_string()],
            CachePriority::High,
        );

        assert!(!entry.is_expired());
        let remaining = entry.remaining_ttl().unwrap();
        assert!(remaining <= Duration::from_secs(60));
        assert!(remaining >= Duration::from_secs(59));
    }

    #[test]
    fn test_expiry_boundary() {
        let mut entry = StoredEntry::new(b"v".to_vec(), false, None, vec![], CachePriority::Normal);
        entry.expires_at = Some(Utc::now());

        assert!(entry.is_expired(), "entry should expire at the boundary");
        assert_eq!(entry.remaining_ttl(), Some(Duration::ZERO));
    }

    #[test]
    fn test_priority_ordering() {
        assert!(CachePriority::Low < CachePriority::Normal);
        assert!(CachePriority::Normal < CachePriority::High);
        assert!(CachePriority::High < CachePriority::Critical);
        assert_eq!(CachePriority::default(), CachePriority::Normal);
    }
}

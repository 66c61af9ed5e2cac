//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

use crate::cache::Value;

// == Cache Entry ==
/// A single cache entry: the stored value plus its expiry metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: Value,
    /// Absolute expiration instant on the monotonic clock, None = never expires
    pub expires_at: Option<Instant>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry with an optional TTL.
    ///
    /// A zero `ttl` produces an entry that is already expired at insert
    /// time: it occupies a slot until removed, but every read treats the
    /// key as absent. `None` means the entry never expires; that shape is
    /// only reachable through the raw insertion path.
    pub fn new(value: Value, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is expired once the current instant is
    /// greater than or equal to the expiration instant, so a zero-TTL entry
    /// reads as expired immediately.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => expires <= Instant::now(),
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns the remaining TTL, or None if no expiration is set.
    ///
    /// An expired entry reports a zero remainder.
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(Instant::now()))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_entry_no_ttl() {
        let entry = CacheEntry::new(Value::from("test_value"), None);

        assert_eq!(entry.value, Value::from("test_value"));
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired());
        assert!(entry.ttl_remaining().is_none());
    }

    #[test]
    fn test_entry_with_ttl() {
        let entry = CacheEntry::new(Value::from("test_value"), Some(Duration::from_secs(60)));

        assert!(entry.expires_at.is_some());
        assert!(!entry.is_expired());

        let remaining = entry.ttl_remaining().unwrap();
        assert!(remaining <= Duration::from_secs(60));
        assert!(remaining >= Duration::from_secs(59));
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new(Value::from("test_value"), Some(Duration::from_millis(20)));

        assert!(!entry.is_expired());

        sleep(Duration::from_millis(40));

        assert!(entry.is_expired());
        assert_eq!(entry.ttl_remaining().unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_zero_ttl_expired_at_insert() {
        let entry = CacheEntry::new(Value::from(1i64), Some(Duration::ZERO));

        assert!(entry.is_expired(), "zero-TTL entry should read as expired");
        assert_eq!(entry.ttl_remaining().unwrap(), Duration::ZERO);
    }
}

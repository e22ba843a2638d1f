use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A single stored value plus its lazy expiration. Expiration is checked on read (`is_expired`)
/// rather than via a background sweep.
#[derive(Clone)]
pub struct ValueEntry {
    pub(crate) value: String,
    expiration: Option<Instant>,
}

impl ValueEntry {
    /// Builds an entry with expiration relative to now, as `SET ... EX`/`PX` express it.
    pub fn new(value: String, ex: Option<u64>, px: Option<u64>) -> ValueEntry {
        let expiration = match (px, ex) {
            (Some(ms), _) => Some(Instant::now() + Duration::from_millis(ms)),
            (_, Some(s)) => Some(Instant::now() + Duration::from_secs(s)),
            _ => None,
        };
        ValueEntry { value, expiration }
    }

    /// Builds an entry with no expiration.
    pub fn no_expire(value: String) -> ValueEntry {
        ValueEntry { value, expiration: None }
    }

    /// Builds an entry from an absolute millisecond-since-epoch expiration, as stored on disk by
    /// the RDB-style snapshot format. `None` means the key never expires.
    pub fn new_absolute(value: String, expire_at_ms: Option<u64>) -> ValueEntry {
        let expiration = expire_at_ms.map(|at_ms| {
            let now_ms = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64;
            let remaining = at_ms.saturating_sub(now_ms);
            Instant::now() + Duration::from_millis(remaining)
        });
        ValueEntry { value, expiration }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: String) {
        self.value = value;
    }

    pub fn append(&mut self, suffix: &str) -> usize {
        self.value.push_str(suffix);
        self.value.len()
    }

    pub fn is_expired(&self) -> bool {
        if let Some(expiration) = self.expiration {
            Instant::now() > expiration
        } else {
            false
        }
    }

    /// Milliseconds remaining until this entry would expire, as an absolute epoch timestamp,
    /// for round-tripping through `DUMP`.
    pub fn expires_at_ms(&self) -> Option<u64> {
        self.expiration.map(|at| {
            let now = Instant::now();
            let now_epoch_ms = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64;
            if at >= now {
                now_epoch_ms + (at - now).as_millis() as u64
            } else {
                now_epoch_ms
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entry_without_ttl_never_expires() {
        let e = ValueEntry::no_expire("v".into());
        assert!(!e.is_expired());
        assert_eq!(e.expires_at_ms(), None);
    }

    #[test]
    fn px_zero_is_already_expired() {
        let e = ValueEntry::new("v".into(), None, Some(0));
        std::thread::sleep(Duration::from_millis(1));
        assert!(e.is_expired());
    }

    #[test]
    fn append_grows_value_and_returns_new_length() {
        let mut e = ValueEntry::no_expire("foo".into());
        let len = e.append("bar");
        assert_eq!(len, 6);
        assert_eq!(e.value(), "foobar");
    }
}

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Identity of a stored object: the bucket it lives in and its name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    pub bucket: String,
    pub name: String,
}

impl ObjectId {
    pub fn new(bucket: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.name)
    }
}

/// Source of the `creation date` stamp, in unix seconds
pub trait Clock {
    fn now_unix(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        // A clock before 1970 is treated as the epoch itself
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

/// Always reports the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_unix(&self) -> i64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_display() {
        let id = ObjectId::new("photos", "2024/cat.jpg");
        assert_eq!(id.to_string(), "photos/2024/cat.jpg");
    }

    #[test]
    fn test_clocks() {
        assert_eq!(FixedClock(1_700_000_000).now_unix(), 1_700_000_000);
        assert!(SystemClock.now_unix() > 1_600_000_000);
    }
}

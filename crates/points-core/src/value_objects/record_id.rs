//! RecordId - 64-bit time-ordered unique identifier
//!
//! Layout: 42 bits of milliseconds since the program epoch, 10 bits of
//! worker id, 12 bits of per-millisecond sequence. Sortable by creation
//! time, which keeps ledger and audit scans in insertion order.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Time-ordered 64-bit identifier for users, submissions, ledger and audit rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RecordId(i64);

impl RecordId {
    /// Program epoch: 2023-01-01 00:00:00 UTC (milliseconds).
    pub const EPOCH: i64 = 1_672_531_200_000;

    /// Sentinel actor id for audit rows written by the engine itself.
    pub const SYSTEM: RecordId = RecordId(0);

    #[inline]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn into_inner(self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn is_system(&self) -> bool {
        self.0 == 0
    }

    /// Milliseconds since the Unix epoch encoded in this id.
    #[inline]
    pub fn timestamp_millis(&self) -> i64 {
        (self.0 >> 22) + Self::EPOCH
    }

    pub fn parse(s: &str) -> Result<Self, RecordIdParseError> {
        s.parse::<i64>()
            .map(RecordId)
            .map_err(|_| RecordIdParseError::InvalidFormat)
    }
}

/// Error when parsing a RecordId from string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RecordIdParseError {
    #[error("invalid record id format")]
    InvalidFormat,
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<RecordId> for i64 {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

impl std::str::FromStr for RecordId {
    type Err = RecordIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordId::parse(s)
    }
}

// Serialized as a string: these ids cross a JSON boundary and must survive
// JavaScript number precision.
impl Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<i64>()
            .map(RecordId)
            .map_err(|_| serde::de::Error::custom("invalid record id string"))
    }
}

/// Thread-safe RecordId generator.
///
/// A mutex over (last timestamp, sequence) is plenty here: id generation is
/// never on a hot path compared to the database round-trips around it.
pub struct RecordIdGenerator {
    worker_id: u16,
    state: Mutex<GeneratorState>,
}

struct GeneratorState {
    last_millis: i64,
    sequence: i64,
}

impl RecordIdGenerator {
    /// # Panics
    /// Panics if `worker_id >= 1024`.
    pub fn new(worker_id: u16) -> Self {
        assert!(worker_id < 1024, "worker id must be < 1024");
        Self {
            worker_id,
            state: Mutex::new(GeneratorState {
                last_millis: 0,
                sequence: 0,
            }),
        }
    }

    pub fn generate(&self) -> RecordId {
        let mut state = self.state.lock().expect("id generator lock");

        let mut now = current_millis();
        if now < state.last_millis {
            // Clock went backwards; reuse the last timestamp so ids stay monotonic.
            now = state.last_millis;
        }

        if now == state.last_millis {
            state.sequence = (state.sequence + 1) & 0xFFF;
            if state.sequence == 0 {
                // Sequence exhausted for this millisecond.
                while current_millis() <= state.last_millis {
                    std::hint::spin_loop();
                }
                now = current_millis();
                state.last_millis = now;
            }
        } else {
            state.last_millis = now;
            state.sequence = 0;
        }

        let id = ((now - RecordId::EPOCH) << 22)
            | (i64::from(self.worker_id) << 12)
            | state.sequence;
        RecordId::new(id)
    }

    pub fn worker_id(&self) -> u16 {
        self.worker_id
    }
}

#[inline]
fn current_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_system_sentinel() {
        assert!(RecordId::SYSTEM.is_system());
        assert!(!RecordId::new(1).is_system());
    }

    #[test]
    fn test_parse_and_display() {
        let id = RecordId::parse("123456789").unwrap();
        assert_eq!(id.into_inner(), 123_456_789);
        assert_eq!(id.to_string(), "123456789");
        assert!(RecordId::parse("not-a-number").is_err());
    }

    #[test]
    fn test_serialize_as_string() {
        let id = RecordId::new(123_456_789_012_345_678);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"123456789012345678\"");

        let back: RecordId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_generator_unique_and_monotonic() {
        let generator = RecordIdGenerator::new(3);
        let mut seen = HashSet::new();
        let mut last = RecordId::new(0);
        for _ in 0..2000 {
            let id = generator.generate();
            assert!(seen.insert(id), "duplicate id generated");
            assert!(id > last, "ids must be monotonically increasing");
            last = id;
        }
    }

    #[test]
    fn test_generator_timestamp_roundtrip() {
        let generator = RecordIdGenerator::new(1);
        let before = current_millis();
        let id = generator.generate();
        let after = current_millis();
        assert!(id.timestamp_millis() >= before && id.timestamp_millis() <= after);
    }

    #[test]
    fn test_generator_thread_safety() {
        let generator = Arc::new(RecordIdGenerator::new(7));
        let mut handles = vec![];
        for _ in 0..4 {
            let generator = Arc::clone(&generator);
            handles.push(thread::spawn(move || {
                (0..1000).map(|_| generator.generate()).collect::<Vec<_>>()
            }));
        }
        let mut all = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(all.insert(id), "ids must be unique across threads");
            }
        }
        assert_eq!(all.len(), 4000);
    }

    #[test]
    #[should_panic(expected = "worker id must be < 1024")]
    fn test_generator_rejects_large_worker_id() {
        RecordIdGenerator::new(1024);
    }
}

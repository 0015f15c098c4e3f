//! Identifiers, logical time, and turn records
//!
//! A turn is the processing of exactly one `ActivityEvent` by the session.
//! Time is logical: milliseconds since the session started, supplied by
//! whoever drives the session. Nothing here reads a wall clock.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use std::time::Duration;
use uuid::Uuid;

use super::stage::Stage;

/// Milliseconds since session start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Millis(pub u64);

impl Millis {
    /// Session start
    pub fn zero() -> Self {
        Self(0)
    }

    /// Convert an elapsed duration, saturating at `u64::MAX`
    pub fn from_duration(elapsed: Duration) -> Self {
        Self(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
    }

    /// Time elapsed since `earlier`, zero if `earlier` is in the future
    pub fn since(&self, earlier: Millis) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<u64> for Millis {
    type Output = Millis;

    fn add(self, rhs: u64) -> Millis {
        Millis(self.0.saturating_add(rhs))
    }
}

impl fmt::Display for Millis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random SessionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one `speak` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UtteranceId(pub u64);

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "utterance-{}", self.0)
    }
}

/// Identifier of one camera access request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request-{}", self.0)
    }
}

/// Monotonic sequence used to mint utterance and request ids
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Sequence(pub u64);

impl Sequence {
    /// Advance and return the new value
    pub fn next(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }
}

/// What happened to an event during its turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnOutcome {
    /// Event changed session state
    Applied,
    /// Event was valid but had no effect (duplicate or stale)
    Dropped,
    /// Event was rejected with a reason
    Rejected(String),
}

/// Record of one processed event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    /// Turn number, starting at 1
    pub turn: u64,
    /// Logical time the event was processed
    pub at: Millis,
    /// Short event name
    pub event: String,
    /// Stage before the event
    pub stage_before: Stage,
    /// Stage after the event
    pub stage_after: Stage,
    /// Result of processing
    pub outcome: TurnOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_arithmetic() {
        let start = Millis(100);
        assert_eq!(start + 500, Millis(600));
        assert_eq!(Millis(600).since(start), 500);
        assert_eq!(start.since(Millis(600)), 0);
        assert_eq!(Millis(u64::MAX) + 1, Millis(u64::MAX));
    }

    #[test]
    fn test_millis_from_duration() {
        assert_eq!(Millis::from_duration(Duration::from_secs(2)), Millis(2000));
    }

    #[test]
    fn test_sequence_is_monotonic() {
        let mut seq = Sequence::default();
        assert_eq!(seq.next(), 1);
        assert_eq!(seq.next(), 2);
    }
}

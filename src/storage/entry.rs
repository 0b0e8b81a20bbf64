use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A single log event held by the [`EntryStore`](super::EntryStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: Timestamp,
    pub log_type: String,
    pub severity: f64,
}

impl LogEntry {
    pub fn new(timestamp: i64, log_type: impl Into<String>, severity: f64) -> Self {
        Self {
            timestamp: Timestamp::At(timestamp as f64),
            log_type: log_type.into(),
            severity,
        }
    }
}

/// A numeric timestamp, or the not-a-number value produced by a token
/// that failed to parse.
///
/// Timestamps carry no range limit, so the value is an `f64`; fractional and
/// infinite values compare normally. `At` never holds NaN or negative zero;
/// build from raw floats with [`Timestamp::from`].
///
/// Like `f64::NAN`, `NotANumber` is unordered: every `<`, `>` or `==`
/// comparison involving it is false.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum Timestamp {
    At(f64),
    NotANumber,
}

impl Timestamp {
    pub fn value(self) -> Option<f64> {
        match self {
            Timestamp::At(ts) => Some(ts),
            Timestamp::NotANumber => None,
        }
    }

    pub fn is_nan(self) -> bool {
        matches!(self, Timestamp::NotANumber)
    }
}

impl From<f64> for Timestamp {
    fn from(ts: f64) -> Self {
        if ts.is_nan() {
            Timestamp::NotANumber
        } else {
            // -0.0 + 0.0 == +0.0; Arrow's float ordering would put -0.0 below 0.0.
            Timestamp::At(ts + 0.0)
        }
    }
}

impl From<Option<f64>> for Timestamp {
    fn from(ts: Option<f64>) -> Self {
        ts.map_or(Timestamp::NotANumber, Timestamp::from)
    }
}

impl From<Timestamp> for Option<f64> {
    fn from(ts: Timestamp) -> Self {
        ts.value()
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        matches!((self, other), (Timestamp::At(a), Timestamp::At(b)) if a == b)
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Timestamp::At(a), Timestamp::At(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Which side of a pivot timestamp a range query selects. Both sides are strict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Before,
    After,
}

impl Direction {
    pub fn admits(self, timestamp: Timestamp, pivot: Timestamp) -> bool {
        match self {
            Direction::Before => timestamp < pivot,
            Direction::After => timestamp > pivot,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Before => write!(f, "BEFORE"),
            Direction::After => write!(f, "AFTER"),
        }
    }
}

//! Half-open periods `[start, end)`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::TemporalError;

use super::Timestamp;

/// A half-open period. `start < end` holds for every constructed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl Period {
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self, TemporalError> {
        if start < end {
            Ok(Self { start, end })
        } else {
            Err(TemporalError::InvalidPeriodBounds(format!(
                "start ({start}) must be before end ({end})"
            )))
        }
    }

    /// `[start, ∞)`.
    pub fn open(start: Timestamp) -> Result<Self, TemporalError> {
        Self::new(start, Timestamp::Infinity)
    }

    pub fn is_open(&self) -> bool {
        self.end.is_infinity()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_inverted_periods_are_rejected() {
        let a = Timestamp::parse("2020-01-01").unwrap();
        let b = Timestamp::parse("2021-01-01").unwrap();
        assert!(Period::new(a, b).is_ok());
        assert!(Period::new(a, a).is_err());
        assert!(Period::new(b, a).is_err());
        assert!(Period::open(a).unwrap().is_open());
        assert!(Period::open(Timestamp::Infinity).is_err());
    }
}

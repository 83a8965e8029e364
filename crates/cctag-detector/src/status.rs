use std::fmt;

use serde::{Deserialize, Serialize};

/// Validity class of a detected marker. Only [`DetectionStatus::Reliable`]
/// markers carry a trustworthy id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStatus {
    Reliable,
    TooFewOuterPoints,
    NoCollectedCuts,
    NoSelectedCuts,
    IdNotReliable,
    Degenerate,
}

impl DetectionStatus {
    /// Integer code as printed by the CLI. `1` is the only valid code.
    pub fn code(self) -> i32 {
        match self {
            DetectionStatus::Reliable => 1,
            DetectionStatus::TooFewOuterPoints => -1,
            DetectionStatus::NoCollectedCuts => -2,
            DetectionStatus::NoSelectedCuts => -3,
            DetectionStatus::IdNotReliable => -5,
            DetectionStatus::Degenerate => -6,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            1 => DetectionStatus::Reliable,
            -1 => DetectionStatus::TooFewOuterPoints,
            -2 => DetectionStatus::NoCollectedCuts,
            -3 => DetectionStatus::NoSelectedCuts,
            -5 => DetectionStatus::IdNotReliable,
            -6 => DetectionStatus::Degenerate,
            _ => return None,
        })
    }

    pub fn is_reliable(self) -> bool {
        self == DetectionStatus::Reliable
    }

    // Lower is better; used to pick a survivor among overlapping detections.
    pub(crate) fn rank(self) -> u8 {
        match self {
            DetectionStatus::Reliable => 0,
            DetectionStatus::IdNotReliable => 1,
            DetectionStatus::NoSelectedCuts => 2,
            DetectionStatus::NoCollectedCuts => 3,
            DetectionStatus::Degenerate => 4,
            DetectionStatus::TooFewOuterPoints => 5,
        }
    }
}

impl fmt::Display for DetectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for s in [
            DetectionStatus::Reliable,
            DetectionStatus::TooFewOuterPoints,
            DetectionStatus::NoCollectedCuts,
            DetectionStatus::NoSelectedCuts,
            DetectionStatus::IdNotReliable,
            DetectionStatus::Degenerate,
        ] {
            assert_eq!(DetectionStatus::from_code(s.code()), Some(s));
        }
        assert_eq!(DetectionStatus::from_code(0), None);
        assert_eq!(DetectionStatus::Reliable.to_string(), "1");
    }
}

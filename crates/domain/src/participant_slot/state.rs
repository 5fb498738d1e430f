//! Participant-slot state machine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::booking::SlotError;

/// Where one participant stands for one slot.
///
/// State transitions:
/// ```text
/// Unavailable ◄──── unmark ──── Available ──── book ───► Booked
///      │                          ▲                        │
///      └────────── mark ──────────┴──────── cancel ────────┘
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantStatus {
    #[default]
    Unavailable,
    Available,
    Booked,
}

impl ParticipantStatus {
    pub fn can_mark_available(&self) -> bool {
        matches!(self, ParticipantStatus::Unavailable)
    }

    pub fn can_unmark_available(&self) -> bool {
        matches!(self, ParticipantStatus::Available)
    }

    pub fn can_book(&self) -> bool {
        matches!(self, ParticipantStatus::Available)
    }

    pub fn can_cancel(&self) -> bool {
        matches!(self, ParticipantStatus::Booked)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantStatus::Unavailable => "UNAVAILABLE",
            ParticipantStatus::Available => "AVAILABLE",
            ParticipantStatus::Booked => "BOOKED",
        }
    }
}

impl std::fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ParticipantStatus {
    type Err = SlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        [
            ParticipantStatus::Unavailable,
            ParticipantStatus::Available,
            ParticipantStatus::Booked,
        ]
        .into_iter()
        .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
        .ok_or_else(|| SlotError::InvalidParticipantStatus(s.to_string()))
    }
}

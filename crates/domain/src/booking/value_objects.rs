//! Participant and booking value objects.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{SlotError, require_identifier};

/// The role a participant plays in a training session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantType {
    Student,
    Aircraft,
    Instructor,
}

impl ParticipantType {
    /// All participant types, in booking order.
    pub const ALL: [ParticipantType; 3] = [
        ParticipantType::Student,
        ParticipantType::Aircraft,
        ParticipantType::Instructor,
    ];

    /// Returns the type name as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantType::Student => "STUDENT",
            ParticipantType::Aircraft => "AIRCRAFT",
            ParticipantType::Instructor => "INSTRUCTOR",
        }
    }

    /// Lowercase form, used in composite aggregate ids.
    pub fn as_key(&self) -> &'static str {
        match self {
            ParticipantType::Student => "student",
            ParticipantType::Aircraft => "aircraft",
            ParticipantType::Instructor => "instructor",
        }
    }
}

impl std::fmt::Display for ParticipantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ParticipantType {
    type Err = SlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        ParticipantType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| SlotError::InvalidParticipantType(s.to_string()))
    }
}

/// A student, aircraft or instructor identified within its role.
///
/// Ordered by type first, then id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub participant_type: ParticipantType,
    pub id: String,
}

impl Participant {
    /// Creates a participant without validating the id.
    pub fn new(id: impl Into<String>, participant_type: ParticipantType) -> Self {
        Self {
            participant_type,
            id: id.into(),
        }
    }

    /// Creates a participant, trimming the id and rejecting blank ones.
    pub fn try_new(id: &str, participant_type: ParticipantType) -> Result<Self, SlotError> {
        let id = require_identifier("participant_id", id)?;
        Ok(Self::new(id, participant_type))
    }

    /// Parses both fields from request text.
    pub fn parse(id: &str, participant_type: &str) -> Result<Self, SlotError> {
        let participant_type = participant_type.parse()?;
        Self::try_new(id, participant_type)
    }

    pub fn student(id: impl Into<String>) -> Self {
        Self::new(id, ParticipantType::Student)
    }

    pub fn aircraft(id: impl Into<String>) -> Self {
        Self::new(id, ParticipantType::Aircraft)
    }

    pub fn instructor(id: impl Into<String>) -> Self {
        Self::new(id, ParticipantType::Instructor)
    }
}

impl std::fmt::Display for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.participant_type, self.id)
    }
}

/// One participant's share of a reservation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub participant: Participant,
    pub booking_id: String,
}

impl Booking {
    pub fn new(participant: Participant, booking_id: impl Into<String>) -> Self {
        Self {
            participant,
            booking_id: booking_id.into(),
        }
    }
}

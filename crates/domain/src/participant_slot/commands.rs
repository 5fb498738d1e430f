//! Participant-slot commands.

/// Commands accepted by the participant-slot aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantSlotCommand {
    MarkAvailable,
    UnmarkAvailable,
    Book { booking_id: String },
    Cancel { booking_id: String },
}

impl ParticipantSlotCommand {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            ParticipantSlotCommand::MarkAvailable => "mark_available",
            ParticipantSlotCommand::UnmarkAvailable => "unmark_available",
            ParticipantSlotCommand::Book { .. } => "book",
            ParticipantSlotCommand::Cancel { .. } => "cancel",
        }
    }
}

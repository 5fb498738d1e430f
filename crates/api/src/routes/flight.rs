//! Flight booking, availability and participant slot endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{BookReservation, Participant, ParticipantStatus, Timeslot};
use event_store::{EventEnvelope, EventStore};
use projections::{ParticipantSlotEntry, ParticipantSlotsView, ProjectionProcessor};
use scheduling::{BookingCoordinator, ConditionsService};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Conditions service shared by every request.
pub type SharedConditions = Arc<dyn ConditionsService>;

/// Shared application state accessible from all handlers.
pub struct AppState<S: EventStore> {
    pub coordinator: BookingCoordinator<S, SharedConditions>,
    pub participant_slots: Arc<ParticipantSlotsView>,
    pub projection_processor: Arc<ProjectionProcessor<S>>,
}

// -- Request types --

/// Fields are optional so that a missing one is reported as a 400 naming
/// the field rather than a body rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub student_id: Option<String>,
    pub aircraft_id: Option<String>,
    pub instructor_id: Option<String>,
    pub booking_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRequest {
    pub participant_id: Option<String>,
    pub participant_type: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantResponse {
    pub participant_id: String,
    pub participant_type: String,
}

impl From<&Participant> for ParticipantResponse {
    fn from(participant: &Participant) -> Self {
        Self {
            participant_id: participant.id.clone(),
            participant_type: participant.participant_type.as_str().to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingEntryResponse {
    pub participant_id: String,
    pub participant_type: String,
    pub booking_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotResponse {
    pub slot_id: String,
    pub available: Vec<ParticipantResponse>,
    pub bookings: Vec<BookingEntryResponse>,
}

impl SlotResponse {
    fn from_slot(slot_id: &str, slot: &Timeslot) -> Self {
        Self {
            slot_id: slot_id.to_string(),
            available: slot.available().map(ParticipantResponse::from).collect(),
            bookings: slot
                .bookings()
                .map(|booking| BookingEntryResponse {
                    participant_id: booking.participant.id.clone(),
                    participant_type: booking.participant.participant_type.as_str().to_string(),
                    booking_id: booking.booking_id.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub slot_id: String,
    pub booking_id: String,
    pub participants: Vec<ParticipantResponse>,
}

#[derive(Serialize)]
pub struct SlotsResponse {
    pub slots: Vec<ParticipantSlotEntry>,
}

/// Response type for event envelope data.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelopeResponse {
    pub event_id: String,
    pub event_type: String,
    pub aggregate_id: String,
    pub version: i64,
    pub timestamp: String,
    pub payload: serde_json::Value,
}

impl From<EventEnvelope> for EventEnvelopeResponse {
    fn from(e: EventEnvelope) -> Self {
        Self {
            event_id: e.event_id.to_string(),
            event_type: e.event_type,
            aggregate_id: e.aggregate_id.to_string(),
            version: e.version.as_i64(),
            timestamp: e.timestamp.to_rfc3339(),
            payload: e.payload,
        }
    }
}

// -- Handlers --

/// POST /flight/bookings/{slot_id}: book a student, aircraft and instructor.
#[tracing::instrument(skip(state, req))]
pub async fn book<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(slot_id): Path<String>,
    Json(req): Json<BookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let reservation = BookReservation::new(
        required("studentId", req.student_id)?,
        required("aircraftId", req.aircraft_id)?,
        required("instructorId", req.instructor_id)?,
        required("bookingId", req.booking_id)?,
    );
    let booking_id = reservation.booking_id.clone();

    let result = state.coordinator.book(&slot_id, reservation).await?;

    let participants = result
        .events
        .iter()
        .map(|event| ParticipantResponse::from(&event.participant()))
        .collect();

    Ok((
        StatusCode::CREATED,
        Json(BookingResponse {
            slot_id: slot_id.trim().to_string(),
            booking_id,
            participants,
        }),
    ))
}

/// DELETE /flight/bookings/{slot_id}/{booking_id}: cancel a booking.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((slot_id, booking_id)): Path<(String, String)>,
) -> Result<Json<SlotResponse>, ApiError> {
    let result = state.coordinator.cancel(&slot_id, &booking_id).await?;
    Ok(Json(SlotResponse::from_slot(slot_id.trim(), &result.aggregate)))
}

/// GET /flight/slots/{participant_id}/{status}: slots where the participant
/// has the given status, read from the projection after catching up.
#[tracing::instrument(skip(state))]
pub async fn slots_by_status<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((participant_id, status)): Path<(String, String)>,
) -> Result<Json<SlotsResponse>, ApiError> {
    let status: ParticipantStatus = status.parse()?;

    state.projection_processor.run_catch_up().await?;

    let slots = state
        .participant_slots
        .slots_by_status(participant_id.trim(), status)
        .await;

    Ok(Json(SlotsResponse { slots }))
}

/// GET /flight/availability/{slot_id}: current state of a slot.
#[tracing::instrument(skip(state))]
pub async fn get_availability<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(slot_id): Path<String>,
) -> Result<Json<SlotResponse>, ApiError> {
    let slot = state.coordinator.get_slot(&slot_id).await?;
    Ok(Json(SlotResponse::from_slot(slot_id.trim(), &slot)))
}

/// POST /flight/availability/{slot_id}: mark a participant available.
#[tracing::instrument(skip(state, req))]
pub async fn mark_available<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(slot_id): Path<String>,
    Json(req): Json<AvailabilityRequest>,
) -> Result<Json<SlotResponse>, ApiError> {
    let participant = parse_participant(req)?;
    let result = state
        .coordinator
        .mark_available(&slot_id, participant)
        .await?;
    Ok(Json(SlotResponse::from_slot(slot_id.trim(), &result.aggregate)))
}

/// DELETE /flight/availability/{slot_id}: withdraw a participant's availability.
#[tracing::instrument(skip(state, req))]
pub async fn unmark_available<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(slot_id): Path<String>,
    Json(req): Json<AvailabilityRequest>,
) -> Result<Json<SlotResponse>, ApiError> {
    let participant = parse_participant(req)?;
    let result = state
        .coordinator
        .unmark_available(&slot_id, participant)
        .await?;
    Ok(Json(SlotResponse::from_slot(slot_id.trim(), &result.aggregate)))
}

/// GET /flight/availability/{slot_id}/events: the slot's event stream.
#[tracing::instrument(skip(state))]
pub async fn events<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(slot_id): Path<String>,
) -> Result<Json<Vec<EventEnvelopeResponse>>, ApiError> {
    let envelopes = state.coordinator.slot_events(&slot_id).await?;
    Ok(Json(
        envelopes
            .into_iter()
            .map(EventEnvelopeResponse::from)
            .collect(),
    ))
}

fn required(field: &str, value: Option<String>) -> Result<String, ApiError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ApiError::BadRequest(format!("{field} is required"))),
    }
}

fn parse_participant(req: AvailabilityRequest) -> Result<Participant, ApiError> {
    let participant_id = required("participantId", req.participant_id)?;
    let participant_type = required("participantType", req.participant_type)?;
    Ok(Participant::parse(&participant_id, &participant_type)?)
}

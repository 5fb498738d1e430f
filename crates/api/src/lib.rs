//! HTTP API server for the flight training scheduler.
//!
//! Provides REST endpoints for availability, bookings and participant slot
//! queries, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use event_store::EventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use projections::{ParticipantSlotsView, Projection, ProjectionProcessor};
use scheduling::{BookingCoordinator, DEFAULT_CONDITIONS_TIMEOUT, InMemoryConditionsService};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::flight::{AppState, SharedConditions};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: EventStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/flight/bookings/{slot_id}", post(routes::flight::book::<S>))
        .route(
            "/flight/bookings/{slot_id}/{booking_id}",
            axum::routing::delete(routes::flight::cancel::<S>),
        )
        .route(
            "/flight/slots/{participant_id}/{status}",
            get(routes::flight::slots_by_status::<S>),
        )
        .route(
            "/flight/availability/{slot_id}",
            get(routes::flight::get_availability::<S>)
                .post(routes::flight::mark_available::<S>)
                .delete(routes::flight::unmark_available::<S>),
        )
        .route(
            "/flight/availability/{slot_id}/events",
            get(routes::flight::events::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state around the given conditions service.
pub fn create_state<S: EventStore + Clone + 'static>(
    event_store: S,
    conditions: SharedConditions,
    conditions_timeout: Duration,
) -> (
    Arc<AppState<S>>,
    Arc<ProjectionProcessor<S>>,
    Arc<ParticipantSlotsView>,
) {
    let coordinator = BookingCoordinator::new(event_store.clone(), conditions)
        .with_conditions_timeout(conditions_timeout);

    let participant_slots = Arc::new(ParticipantSlotsView::new());

    let mut processor = ProjectionProcessor::new(event_store);
    processor.register(Box::new(participant_slots.as_ref().clone()) as Box<dyn Projection>);
    let processor = Arc::new(processor);

    let state = Arc::new(AppState {
        coordinator,
        participant_slots: participant_slots.clone(),
        projection_processor: processor.clone(),
    });

    (state, processor, participant_slots)
}

/// Creates the default application state. No conditions source is
/// configured, so every slot is judged flyable.
pub fn create_default_state<S: EventStore + Clone + 'static>(
    event_store: S,
) -> (
    Arc<AppState<S>>,
    Arc<ProjectionProcessor<S>>,
    Arc<ParticipantSlotsView>,
) {
    create_state(
        event_store,
        Arc::new(InMemoryConditionsService::new()),
        DEFAULT_CONDITIONS_TIMEOUT,
    )
}

//! HTTP API server with observability for the card registry.
//!
//! Provides REST endpoints for issuing and assigning cards, enrolling
//! students, and browsing the event log, with structured logging (tracing)
//! and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use application::Application;
use axum::Router;
use axum::routing::{get, post, put};
use common::Clock;
use event_store::EventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::{AppState, cards, events, students};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: EventStore + Clone + 'static>(
    state: AppState<S>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/cards", post(cards::create::<S>).get(cards::list::<S>))
        .route("/cards/available", get(cards::available::<S>))
        .route("/cards/assigned", get(cards::assigned::<S>))
        .route("/cards/expiring", get(cards::expiring::<S>))
        .route("/cards/{id}", get(cards::get::<S>))
        .route("/cards/{id}/assign", post(cards::assign::<S>))
        .route("/cards/{id}/unassign", post(cards::unassign::<S>))
        .route("/cards/{id}/status", post(cards::change_status::<S>))
        .route("/cards/{id}/report-lost", post(cards::report_lost::<S>))
        .route("/cards/{id}/report-stolen", post(cards::report_stolen::<S>))
        .route("/cards/{id}/report-damaged", post(cards::report_damaged::<S>))
        .route(
            "/students",
            post(students::create::<S>).get(students::list::<S>),
        )
        .route("/students/active", get(students::active::<S>))
        .route("/students/search", get(students::search::<S>))
        .route("/students/{id}", get(students::get::<S>))
        .route("/students/{id}/card", get(students::card::<S>))
        .route("/students/{id}/status", post(students::change_status::<S>))
        .route("/students/{id}/profile", put(students::update_profile::<S>))
        .route("/events", get(events::list::<S>))
        .route("/events/aggregate/{id}", get(events::for_aggregate::<S>))
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

/// Wires the command handlers, read models, and projections around one store.
///
/// The read models start empty; call [`Application::catch_up`] before serving
/// when the store already holds events.
pub fn create_state<S: EventStore + Clone + 'static>(
    event_store: S,
    clock: Arc<dyn Clock>,
) -> AppState<S> {
    Arc::new(Application::new(event_store, clock))
}

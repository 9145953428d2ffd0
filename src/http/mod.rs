//! Thin HTTP surface.
//!
//! Routes parse input, call the service layer, and map error kinds to
//! status codes. No business decisions live here; in particular the
//! single-vote and verification-before-write rules are enforced by the
//! orchestrator, never by route wiring.

mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::ports::LedgerGateway;
use crate::service::{LedgerQueryService, VoteOrchestrator};

/// Static facts reported by the info endpoints.
#[derive(Clone)]
pub struct ServiceInfo {
    pub contract_address: String,
    pub network_name: String,
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<VoteOrchestrator>,
    pub query: Arc<LedgerQueryService>,
    pub ledger: Arc<dyn LedgerGateway>,
    pub info: ServiceInfo,
}

/// Build the route table.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/vote", post(handlers::cast_vote))
        .route("/votes/count", get(handlers::vote_count))
        .route("/votes/all", get(handlers::list_votes))
        .route("/check/:tag_id", get(handlers::check_tag))
        .route("/choice/:choice_id", get(handlers::choice_votes))
        .route("/winner", get(handlers::winner))
        .route("/initialize", post(handlers::initialize))
        .route("/reset", post(handlers::reset_vote))
        .route("/owner", get(handlers::owner))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

//! Route handlers and the error-to-status mapping.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::errors::{LedgerError, VoteError};
use crate::domain::types::{VoteListEntry, VoteRequest};

use super::AppState;

/// Structured failure body: every error response carries both a
/// machine-readable kind and a human-readable cause.
pub struct ApiFailure {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "kind": self.kind,
            "error": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<VoteError> for ApiFailure {
    fn from(error: VoteError) -> Self {
        let status = match &error {
            VoteError::Validation(_) => StatusCode::BAD_REQUEST,
            VoteError::Duplicate { .. } => StatusCode::CONFLICT,
            VoteError::Verification { .. } => StatusCode::FORBIDDEN,
            VoteError::LedgerWrite(_) | VoteError::LedgerQuery(_) => StatusCode::BAD_GATEWAY,
            VoteError::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl From<LedgerError> for ApiFailure {
    fn from(error: LedgerError) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            kind: "ledger_query",
            message: error.to_string(),
        }
    }
}

pub async fn root(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "Server running",
        "contract": state.info.contract_address,
        "network": state.info.network_name,
        "message": "RFID voting gateway with face verification",
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "OK",
        "contract": state.info.contract_address,
    }))
}

pub async fn cast_vote(
    State(state): State<AppState>,
    Json(request): Json<VoteRequest>,
) -> Result<Json<serde_json::Value>, ApiFailure> {
    let tag_id = request.tag_id.clone();
    let choice_id = request.choice_id;
    let receipt = state.orchestrator.cast(request).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Vote successfully cast",
        "tagId": tag_id,
        "choiceId": choice_id,
        "txHash": receipt.tx_hash,
        "blockNumber": receipt.block_number,
        "gasUsed": receipt.gas_used,
    })))
}

pub async fn vote_count(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiFailure> {
    let count = state.query.count().await?;
    Ok(Json(json!({ "success": true, "voteCount": count })))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListingResponse {
    success: bool,
    total_votes: u64,
    votes: Vec<VoteListEntry>,
}

pub async fn list_votes(State(state): State<AppState>) -> Result<Json<ListingResponse>, ApiFailure> {
    let (total_votes, votes) = state.query.list_all().await?;
    Ok(Json(ListingResponse {
        success: true,
        total_votes,
        votes,
    }))
}

pub async fn check_tag(
    State(state): State<AppState>,
    Path(tag_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiFailure> {
    let has_voted = state.query.has_voted(&tag_id).await?;
    Ok(Json(json!({
        "success": true,
        "tagId": tag_id,
        "hasVoted": has_voted,
    })))
}

pub async fn choice_votes(
    State(state): State<AppState>,
    Path(choice_id): Path<u64>,
) -> Result<Json<serde_json::Value>, ApiFailure> {
    let votes = state.query.votes_for(choice_id).await?;
    Ok(Json(json!({
        "success": true,
        "choiceId": choice_id,
        "votes": votes,
    })))
}

pub async fn winner(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiFailure> {
    let winner = state.query.winning_choice().await?;
    Ok(Json(json!({ "success": true, "winner": winner })))
}

/// One-time contract setup. The ledger enforces both ownership and
/// idempotence, so a repeat call comes back as a write rejection.
pub async fn initialize(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiFailure> {
    let pending = state
        .ledger
        .initialize()
        .await
        .map_err(VoteError::LedgerWrite)?;
    let receipt = state
        .ledger
        .wait_for_confirmation(&pending)
        .await
        .map_err(VoteError::LedgerWrite)?;
    Ok(Json(json!({
        "success": true,
        "message": "Contract initialized",
        "txHash": receipt.tx_hash,
        "blockNumber": receipt.block_number,
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequest {
    tag_id: String,
}

/// Owner-privileged: the ledger contract enforces authorization and
/// rejects the write for anyone else.
pub async fn reset_vote(
    State(state): State<AppState>,
    Json(request): Json<ResetRequest>,
) -> Result<Json<serde_json::Value>, ApiFailure> {
    if request.tag_id.trim().is_empty() {
        return Err(VoteError::Validation("tagId must not be empty".into()).into());
    }

    let pending = state
        .ledger
        .reset_vote(&request.tag_id)
        .await
        .map_err(VoteError::LedgerWrite)?;
    let receipt = state
        .ledger
        .wait_for_confirmation(&pending)
        .await
        .map_err(VoteError::LedgerWrite)?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Vote reset for tag {}", request.tag_id),
        "txHash": receipt.tx_hash,
        "blockNumber": receipt.block_number,
    })))
}

pub async fn owner(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiFailure> {
    let owner = state.ledger.owner().await?;
    Ok(Json(json!({ "success": true, "owner": owner })))
}

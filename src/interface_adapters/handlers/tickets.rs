use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

use crate::domain::ticket::build_ticket_id;
use crate::domain::PlayerTicket;
use crate::interface_adapters::protocol::{
    ErrorResponse, JoinRequest, JoinResponse, LeaveResponse, PollResponse, QueueStatus,
};
use crate::interface_adapters::state::AppState;
use crate::use_cases::ReserveOutcome;

// Enqueue a player for matchmaking, or hand back their existing ticket.
pub async fn join(
    State(state): State<Arc<AppState>>,
    Json(request): Json<JoinRequest>,
) -> Result<Json<JoinResponse>, (StatusCode, Json<ErrorResponse>)> {
    if request.player_id.trim().is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "player_id is required",
        ));
    }

    // Fast path: the player already holds an active ticket.
    if let Some(ticket_id) = state.engine.active_ticket_for_player(&request.player_id) {
        return Ok(Json(JoinResponse {
            ticket_id,
            status: QueueStatus::Queued,
        }));
    }

    let ticket_id = build_ticket_id();
    let ticket = PlayerTicket::new(
        request.player_id.clone(),
        request.rating,
        request.region,
        request.reported_ping_ms,
    );

    match state.engine.try_reserve_ticket(&ticket_id, &request.player_id) {
        ReserveOutcome::Reserved => {
            state.engine.enqueue(ticket_id.clone(), ticket);
            Ok(Json(JoinResponse {
                ticket_id,
                status: QueueStatus::Queued,
            }))
        }
        // A concurrent join won the reservation; hand back its ticket.
        ReserveOutcome::AlreadyReserved { ticket_id } => Ok(Json(JoinResponse {
            ticket_id,
            status: QueueStatus::Queued,
        })),
    }
}

// Report whether a ticket has been matched yet. Unknown tickets read as
// still searching.
pub async fn poll(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<String>,
) -> Json<PollResponse> {
    match state.engine.match_by_ticket(&ticket_id) {
        Some(found) => Json(PollResponse {
            status: QueueStatus::Matched,
            match_record: Some(found),
        }),
        None => Json(PollResponse {
            status: QueueStatus::Searching,
            match_record: None,
        }),
    }
}

// Withdraw a ticket; unknown tickets are acknowledged all the same.
pub async fn leave(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<String>,
) -> Json<LeaveResponse> {
    state.engine.remove_ticket(ticket_id);
    Json(LeaveResponse { removed: true })
}

// Helper to build a JSON error response.
fn error_response(status: StatusCode, message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            message: message.to_string(),
        }),
    )
}

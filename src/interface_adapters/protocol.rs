use serde::{Deserialize, Serialize};

use crate::domain::Match;

// Request payload for joining the matchmaking queue.
#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub player_id: String,
    pub rating: Option<u32>,
    pub region: Option<String>,
    pub reported_ping_ms: Option<u32>,
}

// Response payload returned after a join request.
#[derive(Debug, Serialize)]
pub struct JoinResponse {
    pub ticket_id: String,
    pub status: QueueStatus,
}

// Response payload for polling a ticket.
#[derive(Debug, Serialize)]
pub struct PollResponse {
    pub status: QueueStatus,
    #[serde(rename = "match")]
    pub match_record: Option<Match>,
}

// Response payload acknowledging a leave request.
#[derive(Debug, Serialize)]
pub struct LeaveResponse {
    pub removed: bool,
}

// Liveness probe payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

// Where a ticket currently stands.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Queued,
    Searching,
    Matched,
}

// Simple error envelope for JSON responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

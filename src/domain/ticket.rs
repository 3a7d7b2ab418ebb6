use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

// A player's outstanding request to be matched.
#[derive(Debug, Clone)]
pub struct PlayerTicket {
    pub player_id: String,
    pub rating: Option<u32>,
    pub region: Option<String>,
    pub reported_ping_ms: Option<u32>,
    // Stamped by the engine when the add command is applied, never by the caller.
    pub enqueued_at: u64,
}

impl PlayerTicket {
    // Create a ticket for a player; the engine assigns the timestamp later.
    pub fn new(
        player_id: String,
        rating: Option<u32>,
        region: Option<String>,
        reported_ping_ms: Option<u32>,
    ) -> Self {
        Self {
            player_id,
            rating,
            region,
            reported_ping_ms,
            enqueued_at: 0,
        }
    }
}

// Build a transport-facing ticket identifier.
pub fn build_ticket_id() -> String {
    Uuid::new_v4().to_string()
}

// Get the current time as epoch seconds.
pub fn current_epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

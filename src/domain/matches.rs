use serde::Serialize;
use uuid::Uuid;

// An immutable record pairing exactly two players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    pub match_id: String,
    pub player_a: String,
    pub player_b: String,
    pub created_at: u64,
}

impl Match {
    // Returns true if the player is one of the two participants.
    pub fn involves(&self, player_id: &str) -> bool {
        self.player_a == player_id || self.player_b == player_id
    }
}

// Build a unique match identifier.
pub fn build_match_id() -> String {
    Uuid::new_v4().simple().to_string()
}

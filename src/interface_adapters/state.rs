use std::sync::Arc;

use crate::use_cases::MatchmakingEngine;

// Shared application state for the HTTP handlers.
pub struct AppState {
    pub engine: Arc<MatchmakingEngine>,
}

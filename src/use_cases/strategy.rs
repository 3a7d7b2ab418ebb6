use crate::domain::{Match, PlayerTicket};
use crate::use_cases::shutdown::ShutdownSignal;

// Failure surfaced by a strategy while producing matches. The engine treats
// it as transient: log, back off briefly, keep the loop alive.
#[derive(Debug)]
pub enum StrategyError {
    Internal(String),
}

// Defines how players are paired. Implementations own the pool of waiting
// tickets and are only ever called from the engine's processing loop, so
// they need no internal synchronization.
pub trait MatchmakingStrategy: Send {
    // Insert a ticket into the pool. A ticket for an already-pooled player
    // replaces the old one and moves to the back of the queue.
    fn add_ticket(&mut self, ticket: PlayerTicket);

    // Remove the player's ticket from the pool; no-op if absent.
    fn remove_ticket(&mut self, player_id: &str);

    // Produce every match available right now without waiting for more
    // tickets. Matched tickets leave the pool as part of production, and the
    // shutdown signal is checked between pairings.
    fn try_make_matches(
        &mut self,
        shutdown: &ShutdownSignal,
    ) -> Result<Vec<Match>, StrategyError>;
}

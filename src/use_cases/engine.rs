use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::domain::ticket::current_epoch_seconds;
use crate::domain::{Match, PlayerTicket};
use crate::use_cases::shutdown::ShutdownSignal;
use crate::use_cases::strategy::MatchmakingStrategy;

// Pause after a strategy failure before the loop tries again.
const STRATEGY_FAILURE_BACKOFF: Duration = Duration::from_millis(250);

// Commands applied exclusively inside the processing loop.
#[derive(Debug)]
enum Command {
    Add {
        ticket_id: String,
        ticket: PlayerTicket,
    },
    Remove {
        ticket_id: String,
    },
}

// Outcome of an atomic ticket reservation.
#[derive(Debug, PartialEq, Eq)]
pub enum ReserveOutcome {
    // The caller now owns the player's only active ticket.
    Reserved,
    // The player already holds an active ticket.
    AlreadyReserved { ticket_id: String },
}

/// Single-writer matchmaking coordinator.
///
/// Request handlers submit commands through an unbounded channel and read
/// the indices directly; exactly one processing task applies commands and
/// drives the strategy. The strategy and its pairing order therefore need
/// no locking of their own.
pub struct MatchmakingEngine {
    ops_tx: mpsc::UnboundedSender<Command>,
    ticket_to_player: DashMap<String, String>,
    player_to_ticket: DashMap<String, String>,
    player_to_match: DashMap<String, Match>,
    in_pool: DashMap<String, ()>,
}

impl MatchmakingEngine {
    // Construct the engine and spawn its processing loop.
    pub fn start(
        strategy: Box<dyn MatchmakingStrategy>,
        shutdown: Arc<ShutdownSignal>,
    ) -> Arc<Self> {
        let (ops_tx, ops_rx) = mpsc::unbounded_channel();
        let engine = Arc::new(Self {
            ops_tx,
            ticket_to_player: DashMap::new(),
            player_to_ticket: DashMap::new(),
            player_to_match: DashMap::new(),
            in_pool: DashMap::new(),
        });

        tokio::spawn(engine_task(
            Arc::clone(&engine),
            ops_rx,
            strategy,
            shutdown,
        ));

        engine
    }

    // Submit an add command; returns once the command is queued, not once
    // it is processed.
    pub fn enqueue(&self, ticket_id: String, ticket: PlayerTicket) {
        // After shutdown the receiver is gone and accepted commands are
        // dropped by contract, so a closed channel is not an error here.
        let _ = self.ops_tx.send(Command::Add { ticket_id, ticket });
    }

    // Submit a remove command; removing unknown tickets is a no-op.
    pub fn remove_ticket(&self, ticket_id: String) {
        let _ = self.ops_tx.send(Command::Remove { ticket_id });
    }

    // Atomically bind a ticket to a player unless one is already bound.
    // Losing callers learn the winning ticket id.
    pub fn try_reserve_ticket(&self, ticket_id: &str, player_id: &str) -> ReserveOutcome {
        match self.player_to_ticket.entry(player_id.to_string()) {
            Entry::Occupied(existing) => ReserveOutcome::AlreadyReserved {
                ticket_id: existing.get().clone(),
            },
            Entry::Vacant(slot) => {
                slot.insert(ticket_id.to_string());
                self.ticket_to_player
                    .insert(ticket_id.to_string(), player_id.to_string());
                ReserveOutcome::Reserved
            }
        }
    }

    // Current ticket id for a player, if any.
    pub fn active_ticket_for_player(&self, player_id: &str) -> Option<String> {
        self.player_to_ticket
            .get(player_id)
            .map(|entry| entry.value().clone())
    }

    // Resolve ticket id -> player id -> match.
    pub fn match_by_ticket(&self, ticket_id: &str) -> Option<Match> {
        let player_id = self
            .ticket_to_player
            .get(ticket_id)
            .map(|entry| entry.value().clone())?;
        self.player_to_match
            .get(&player_id)
            .map(|entry| entry.value().clone())
    }

    // True while the player's ticket sits in the strategy pool.
    pub fn is_in_pool(&self, player_id: &str) -> bool {
        self.in_pool.contains_key(player_id)
    }

    // Apply one command. Only the processing loop calls this, which is what
    // keeps the engine single-writer.
    fn apply(&self, command: Command, strategy: &mut dyn MatchmakingStrategy) {
        match command {
            Command::Add {
                ticket_id,
                mut ticket,
            } => {
                ticket.enqueued_at = current_epoch_seconds();

                match self.player_to_ticket.entry(ticket.player_id.clone()) {
                    Entry::Occupied(existing) => {
                        // A different bound id means this add lost the race
                        // with an earlier reservation; the earlier one wins.
                        if existing.get() != &ticket_id {
                            debug!(%ticket_id, player_id = %ticket.player_id, "discarding superseded add");
                            return;
                        }
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(ticket_id.clone());
                        self.ticket_to_player
                            .insert(ticket_id.clone(), ticket.player_id.clone());
                    }
                }

                let player_id = ticket.player_id.clone();
                if !self.player_to_match.contains_key(&player_id)
                    && self.in_pool.insert(player_id.clone(), ()).is_none()
                {
                    debug!(%ticket_id, %player_id, "ticket pooled");
                    strategy.add_ticket(ticket);
                }
            }
            Command::Remove { ticket_id } => {
                if let Some((_, player_id)) = self.ticket_to_player.remove(&ticket_id) {
                    self.player_to_ticket.remove(&player_id);
                    self.in_pool.remove(&player_id);
                    strategy.remove_ticket(&player_id);
                    debug!(%ticket_id, %player_id, "ticket removed");
                }
            }
        }
    }

    // Record a produced match for both players and clear their pool entries.
    // The ticket bindings stay so polls can still resolve the match.
    fn record_match(&self, produced: Match) {
        info!(
            match_id = %produced.match_id,
            player_a = %produced.player_a,
            player_b = %produced.player_b,
            "match formed"
        );
        self.in_pool.remove(&produced.player_a);
        self.in_pool.remove(&produced.player_b);
        self.player_to_match
            .insert(produced.player_a.clone(), produced.clone());
        self.player_to_match.insert(produced.player_b.clone(), produced);
    }
}

// Processing loop: drain commands, form matches, then suspend until the
// next command or shutdown.
async fn engine_task(
    engine: Arc<MatchmakingEngine>,
    mut ops_rx: mpsc::UnboundedReceiver<Command>,
    mut strategy: Box<dyn MatchmakingStrategy>,
    shutdown: Arc<ShutdownSignal>,
) {
    info!("matchmaking loop started");

    while !shutdown.is_raised() {
        // 1) Drain newly submitted commands quickly.
        let mut drained = 0usize;
        while let Ok(command) = ops_rx.try_recv() {
            engine.apply(command, strategy.as_mut());
            drained += 1;
        }

        // 2) Ask the strategy to form matches.
        let produced = match strategy.try_make_matches(&shutdown) {
            Ok(matches) => {
                let produced = matches.len();
                for formed in matches {
                    engine.record_match(formed);
                }
                produced
            }
            Err(err) => {
                // Transient fault: keep the loop alive and back off briefly.
                error!(?err, "matchmaking strategy failed");
                tokio::time::sleep(STRATEGY_FAILURE_BACKOFF).await;
                continue;
            }
        };

        // 3) Nothing to do: release the task until the next command.
        if drained == 0 && produced == 0 {
            tokio::select! {
                _ = shutdown.raised() => break,
                command = ops_rx.recv() => match command {
                    Some(command) => engine.apply(command, strategy.as_mut()),
                    // Every sender is gone; no more work can arrive.
                    None => break,
                },
            }
        }
    }

    info!("matchmaking loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ticket::build_ticket_id;
    use crate::use_cases::fifo::FifoQueueStrategy;
    use crate::use_cases::strategy::StrategyError;

    fn ticket(player_id: &str) -> PlayerTicket {
        PlayerTicket::new(player_id.to_string(), None, None, None)
    }

    fn start_fifo_engine() -> (Arc<MatchmakingEngine>, Arc<ShutdownSignal>) {
        let shutdown = Arc::new(ShutdownSignal::new());
        let engine =
            MatchmakingEngine::start(Box::new(FifoQueueStrategy::new()), Arc::clone(&shutdown));
        (engine, shutdown)
    }

    // Reserve-then-enqueue, the way the transport layer joins a player.
    fn join(engine: &MatchmakingEngine, player_id: &str) -> String {
        let ticket_id = build_ticket_id();
        match engine.try_reserve_ticket(&ticket_id, player_id) {
            ReserveOutcome::Reserved => {
                engine.enqueue(ticket_id.clone(), ticket(player_id));
                ticket_id
            }
            ReserveOutcome::AlreadyReserved { ticket_id } => ticket_id,
        }
    }

    async fn wait_for_match(engine: &MatchmakingEngine, ticket_id: &str) -> Match {
        for _ in 0..200 {
            if let Some(found) = engine.match_by_ticket(ticket_id) {
                return found;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected a match for ticket {ticket_id}");
    }

    // Give the loop time to drain anything already submitted.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn when_two_players_join_then_they_are_matched_together() {
        let (engine, _shutdown) = start_fifo_engine();

        let ticket_p1 = join(&engine, "p1");
        let ticket_p2 = join(&engine, "p2");

        let found = wait_for_match(&engine, &ticket_p1).await;
        assert!(found.involves("p1"));
        assert!(found.involves("p2"));

        // Both tickets resolve to the same match.
        let other = wait_for_match(&engine, &ticket_p2).await;
        assert_eq!(found.match_id, other.match_id);
    }

    #[tokio::test]
    async fn when_four_players_join_then_pairs_follow_join_order() {
        let (engine, _shutdown) = start_fifo_engine();

        let ticket_p1 = join(&engine, "p1");
        let ticket_p2 = join(&engine, "p2");
        let ticket_p3 = join(&engine, "p3");
        let ticket_p4 = join(&engine, "p4");

        let first = wait_for_match(&engine, &ticket_p1).await;
        assert!(first.involves("p1"));
        assert!(first.involves("p2"));

        let second = wait_for_match(&engine, &ticket_p3).await;
        assert!(second.involves("p3"));
        assert!(second.involves("p4"));

        assert_ne!(first.match_id, second.match_id);
        assert_eq!(wait_for_match(&engine, &ticket_p2).await.match_id, first.match_id);
        assert_eq!(wait_for_match(&engine, &ticket_p4).await.match_id, second.match_id);
    }

    #[tokio::test]
    async fn when_reservations_race_then_exactly_one_wins() {
        let (engine, _shutdown) = start_fifo_engine();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let engine = Arc::clone(&engine);
            handles.push(tokio::spawn(async move {
                let ticket_id = build_ticket_id();
                (
                    ticket_id.clone(),
                    engine.try_reserve_ticket(&ticket_id, "p1"),
                )
            }));
        }

        let mut winners = Vec::new();
        let mut observed = Vec::new();
        for handle in handles {
            let (ticket_id, outcome) = handle.await.expect("reserve task should finish");
            match outcome {
                ReserveOutcome::Reserved => winners.push(ticket_id),
                ReserveOutcome::AlreadyReserved { ticket_id } => observed.push(ticket_id),
            }
        }

        assert_eq!(winners.len(), 1);
        assert_eq!(observed.len(), 7);
        // Every loser saw the winning ticket id.
        assert!(observed.iter().all(|ticket_id| ticket_id == &winners[0]));
        assert_eq!(
            engine.active_ticket_for_player("p1"),
            Some(winners[0].clone())
        );
    }

    #[tokio::test]
    async fn when_a_ticket_is_removed_before_matching_then_the_player_never_matches() {
        let (engine, _shutdown) = start_fifo_engine();

        let ticket_p1 = join(&engine, "p1");
        settle().await;
        engine.remove_ticket(ticket_p1.clone());

        let ticket_p2 = join(&engine, "p2");
        let _ticket_p3 = join(&engine, "p3");

        let found = wait_for_match(&engine, &ticket_p2).await;
        assert!(found.involves("p2"));
        assert!(found.involves("p3"));
        assert!(!found.involves("p1"));

        assert_eq!(engine.match_by_ticket(&ticket_p1), None);
        assert!(!engine.is_in_pool("p1"));
        assert_eq!(engine.active_ticket_for_player("p1"), None);
    }

    #[tokio::test]
    async fn when_removing_an_unknown_ticket_then_matchmaking_is_unaffected() {
        let (engine, _shutdown) = start_fifo_engine();

        engine.remove_ticket("no-such-ticket".to_string());
        settle().await;

        let ticket_p1 = join(&engine, "p1");
        let _ticket_p2 = join(&engine, "p2");

        let found = wait_for_match(&engine, &ticket_p1).await;
        assert!(found.involves("p1"));
        assert!(found.involves("p2"));
    }

    #[tokio::test]
    async fn when_five_players_join_then_two_matches_form_and_one_waits() {
        let (engine, _shutdown) = start_fifo_engine();

        let tickets: Vec<String> = ["p1", "p2", "p3", "p4", "p5"]
            .iter()
            .map(|player_id| join(&engine, player_id))
            .collect();

        wait_for_match(&engine, &tickets[0]).await;
        wait_for_match(&engine, &tickets[2]).await;
        settle().await;

        // Matched players left the pool; the odd player out still waits.
        for player_id in ["p1", "p2", "p3", "p4"] {
            assert!(!engine.is_in_pool(player_id));
        }
        assert!(engine.is_in_pool("p5"));
        assert_eq!(engine.match_by_ticket(&tickets[4]), None);
    }

    #[tokio::test]
    async fn when_the_same_player_joins_twice_then_the_first_ticket_wins() {
        let (engine, _shutdown) = start_fifo_engine();

        let ticket_first = join(&engine, "p1");
        let ticket_second = join(&engine, "p1");
        assert_eq!(ticket_first, ticket_second);

        // Simulate the race where a stale add for a different ticket id was
        // already queued before the reservation check.
        let stale_ticket = build_ticket_id();
        engine.enqueue(stale_ticket.clone(), ticket("p1"));
        settle().await;

        assert_eq!(
            engine.active_ticket_for_player("p1"),
            Some(ticket_first.clone())
        );
        assert_eq!(engine.match_by_ticket(&stale_ticket), None);

        // The pool holds one entry for p1, so a second player completes it.
        let ticket_p2 = join(&engine, "p2");
        let found = wait_for_match(&engine, &ticket_p2).await;
        assert!(found.involves("p1"));
        assert!(found.involves("p2"));
        assert_eq!(wait_for_match(&engine, &ticket_first).await.match_id, found.match_id);
    }

    #[tokio::test]
    async fn when_shutdown_is_raised_then_later_commands_are_dropped() {
        let (engine, shutdown) = start_fifo_engine();

        shutdown.raise();
        settle().await;

        let ticket_p1 = join(&engine, "p1");
        let _ticket_p2 = join(&engine, "p2");
        settle().await;

        // Reservations are synchronous and still succeed, but the loop is
        // gone so nothing is pooled or matched.
        assert!(!engine.is_in_pool("p1"));
        assert!(!engine.is_in_pool("p2"));
        assert_eq!(engine.match_by_ticket(&ticket_p1), None);
    }

    // Fails a configured number of times before delegating to FIFO, mirroring
    // a strategy that hits a transient internal error.
    struct FlakyStrategy {
        inner: FifoQueueStrategy,
        failures_left: u32,
    }

    impl MatchmakingStrategy for FlakyStrategy {
        fn add_ticket(&mut self, ticket: PlayerTicket) {
            self.inner.add_ticket(ticket);
        }

        fn remove_ticket(&mut self, player_id: &str) {
            self.inner.remove_ticket(player_id);
        }

        fn try_make_matches(
            &mut self,
            shutdown: &ShutdownSignal,
        ) -> Result<Vec<Match>, StrategyError> {
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(StrategyError::Internal("injected failure".to_string()));
            }
            self.inner.try_make_matches(shutdown)
        }
    }

    #[tokio::test]
    async fn when_the_strategy_fails_then_the_loop_recovers_and_matches() {
        let shutdown = Arc::new(ShutdownSignal::new());
        let strategy = FlakyStrategy {
            inner: FifoQueueStrategy::new(),
            failures_left: 2,
        };
        let engine = MatchmakingEngine::start(Box::new(strategy), Arc::clone(&shutdown));

        let ticket_p1 = join(&engine, "p1");
        let _ticket_p2 = join(&engine, "p2");

        // Two failure rounds back off 250ms each before pairing succeeds.
        let found = wait_for_match(&engine, &ticket_p1).await;
        assert!(found.involves("p1"));
        assert!(found.involves("p2"));
    }

    #[tokio::test]
    async fn when_matches_form_then_players_are_never_queued_and_matched_at_once() {
        let (engine, _shutdown) = start_fifo_engine();

        let tickets: Vec<String> = ["p1", "p2", "p3"]
            .iter()
            .map(|player_id| join(&engine, player_id))
            .collect();
        wait_for_match(&engine, &tickets[0]).await;
        settle().await;

        for (ticket_id, player_id) in tickets.iter().zip(["p1", "p2", "p3"]) {
            let matched = engine.match_by_ticket(ticket_id).is_some();
            let queued = engine.is_in_pool(player_id);
            assert!(
                matched != queued,
                "player {player_id} must be exactly one of queued or matched"
            );
        }
    }
}

use std::collections::HashMap;

use crate::domain::matches::build_match_id;
use crate::domain::ticket::current_epoch_seconds;
use crate::domain::{Match, PlayerTicket};
use crate::use_cases::shutdown::ShutdownSignal;
use crate::use_cases::strategy::{MatchmakingStrategy, StrategyError};

// One pool entry plus its queue linkage.
#[derive(Debug)]
struct Node {
    ticket: PlayerTicket,
    prev: Option<usize>,
    next: Option<usize>,
}

// Strict first-in-first-out pairing.
//
// The pool is a doubly-linked list over slab-allocated nodes with a
// player-id index kept in lockstep, so insertion, removal by player and
// popping the oldest ticket are all O(1).
#[derive(Debug, Default)]
pub struct FifoQueueStrategy {
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    index: HashMap<String, usize>,
}

impl FifoQueueStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn push_back(&mut self, ticket: PlayerTicket) {
        let player_id = ticket.player_id.clone();
        let node = Node {
            ticket,
            prev: self.tail,
            next: None,
        };

        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                slot
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };

        match self.tail {
            Some(tail) => {
                if let Some(tail_node) = self.slots[tail].as_mut() {
                    tail_node.next = Some(slot);
                }
            }
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
        self.index.insert(player_id, slot);
    }

    // Detach a node and recycle its slot. The index entry is the caller's
    // responsibility.
    fn unlink(&mut self, slot: usize) -> Option<PlayerTicket> {
        let node = self.slots[slot].take()?;

        match node.prev {
            Some(prev) => {
                if let Some(prev_node) = self.slots[prev].as_mut() {
                    prev_node.next = node.next;
                }
            }
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => {
                if let Some(next_node) = self.slots[next].as_mut() {
                    next_node.prev = node.prev;
                }
            }
            None => self.tail = node.prev,
        }

        self.free.push(slot);
        Some(node.ticket)
    }

    fn pop_front(&mut self) -> Option<PlayerTicket> {
        let slot = self.head?;
        let ticket = self.unlink(slot)?;
        self.index.remove(&ticket.player_id);
        Some(ticket)
    }
}

impl MatchmakingStrategy for FifoQueueStrategy {
    fn add_ticket(&mut self, ticket: PlayerTicket) {
        // Last write wins: a re-queued player moves to the back of the line.
        if let Some(stale) = self.index.remove(&ticket.player_id) {
            self.unlink(stale);
        }
        self.push_back(ticket);
    }

    fn remove_ticket(&mut self, player_id: &str) {
        if let Some(slot) = self.index.remove(player_id) {
            self.unlink(slot);
        }
    }

    fn try_make_matches(
        &mut self,
        shutdown: &ShutdownSignal,
    ) -> Result<Vec<Match>, StrategyError> {
        let mut matches = Vec::new();

        // Pair the two oldest tickets in lock-step; popping as we go keeps
        // emission at most once per ticket.
        while !shutdown.is_raised() && self.len() >= 2 {
            let Some(first) = self.pop_front() else { break };
            let Some(second) = self.pop_front() else { break };

            matches.push(Match {
                match_id: build_match_id(),
                player_a: first.player_id,
                player_b: second.player_id,
                created_at: current_epoch_seconds(),
            });
        }

        Ok(matches)
    }
}

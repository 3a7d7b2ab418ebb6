// Use cases layer: the matchmaking engine and its pluggable strategies.

pub mod engine;
pub mod fifo;
pub mod shutdown;
pub mod strategy;

pub use engine::{MatchmakingEngine, ReserveOutcome};
pub use fifo::FifoQueueStrategy;
pub use shutdown::ShutdownSignal;
pub use strategy::{MatchmakingStrategy, StrategyError};

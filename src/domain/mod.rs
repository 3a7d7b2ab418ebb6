// Domain layer: matchmaking value records and identifier helpers.

pub mod matches;
pub mod ticket;

pub use matches::Match;
pub use ticket::PlayerTicket;

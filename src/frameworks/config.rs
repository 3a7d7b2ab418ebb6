use std::env;

// Runtime/server constants (not matchmaking policy).

pub fn http_port() -> u16 {
    env::var("MATCHMAKING_PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(3003)
}

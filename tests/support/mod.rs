// Boot one service instance per test on an ephemeral port.
//
// Matchmaking pairs whichever tickets arrive, so tests must not share a
// server: a lone player from one scenario would get matched against another
// scenario's players. One server per test keeps every pairing deterministic.
pub async fn spawn_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral test port");
    let address = listener.local_addr().expect("get local addr");

    tokio::spawn(async move {
        matchmaking_server::run(listener)
            .await
            .expect("test server failed");
    });

    format!("http://{address}")
}

//! Wiremock startup for sandboxes that forbid binding localhost.
//!
//! Tests skip with a note on stderr unless `RELAY_REQUIRE_SOCKET_TESTS` is
//! set to `1`/`true`/`yes`, in which case an unbindable socket fails the test.

use std::net::TcpListener;
use std::panic::Location;

use wiremock::MockServer;

fn sockets_required() -> bool {
    std::env::var("RELAY_REQUIRE_SOCKET_TESTS")
        .is_ok_and(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

/// Starts a mock server, or returns `None` when localhost sockets are unavailable.
#[track_caller]
pub fn start_mock_server_or_skip() -> impl Future<Output = Option<MockServer>> {
    let caller = Location::caller();
    let bindable = TcpListener::bind("127.0.0.1:0").is_ok();
    async move {
        if bindable {
            return Some(MockServer::start().await);
        }
        assert!(
            !sockets_required(),
            "cannot bind localhost for wiremock test at {caller}"
        );
        eprintln!("skipping wiremock test at {caller}: localhost bind refused");
        None
    }
}

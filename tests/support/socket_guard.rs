use std::net::TcpListener;
use std::path::Path;
use std::panic::Location;

use tokio_util::sync::CancellationToken;

use fileshare_core::FileServer;
use fileshare_core::server::PathResolver;

#[must_use]
pub fn socket_tests_required() -> bool {
    std::env::var("FILESHARE_REQUIRE_SOCKET_TESTS")
        .ok()
        .is_some_and(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

#[track_caller]
#[must_use]
pub fn should_skip_socket_bound_test() -> bool {
    if TcpListener::bind("127.0.0.1:0").is_ok() {
        return false;
    }

    let location = Location::caller();
    let message = format!(
        "[socket-bound-test] cannot bind localhost socket at {}:{}; server-backed test cannot run in this environment",
        location.file(),
        location.line()
    );
    if socket_tests_required() {
        panic!("{message}. Set FILESHARE_REQUIRE_SOCKET_TESTS=0 to allow local skip behavior.");
    }

    eprintln!(
        "{message}. Skipping test. Set FILESHARE_REQUIRE_SOCKET_TESTS=1 to fail-fast instead."
    );
    true
}

/// A file server running on an ephemeral localhost port.
pub struct RunningServer {
    pub base_url: String,
    shutdown: CancellationToken,
    task: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl RunningServer {
    pub async fn stop(self) {
        self.shutdown.cancel();
        self.task.await.unwrap().unwrap();
    }
}

/// Serves `root` on 127.0.0.1, or returns `None` when sockets are unavailable.
pub async fn start_file_server_or_skip(root: &Path) -> Option<RunningServer> {
    if should_skip_socket_bound_test() {
        return None;
    }
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let server = FileServer::with_resolver(PathResolver::new(root).unwrap());
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(server.serve_with_listener(listener, shutdown.clone()));
    Some(RunningServer {
        base_url,
        shutdown,
        task,
    })
}

#[allow(dead_code)]
pub trait SocketSkipReturn {
    fn socket_skip_return() -> Self;
}

impl SocketSkipReturn for () {
    fn socket_skip_return() -> Self {}
}

impl SocketSkipReturn for Result<(), Box<dyn std::error::Error>> {
    fn socket_skip_return() -> Self {
        Ok(())
    }
}

#[allow(dead_code)]
pub fn socket_skip_return<T: SocketSkipReturn>() -> T {
    T::socket_skip_return()
}

//! Background server management for the fakes

use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// An axum router served on a random local port
pub struct FakeServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl FakeServer {
    /// Bind `127.0.0.1:0` and serve `router` in the background
    pub async fn spawn(name: &'static str, router: Router) -> Result<Self, TestError> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(TestError::Bind)?;
        let addr = listener.local_addr().map_err(TestError::Bind)?;

        debug!(name, %addr, "Starting fake server");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                error!(name, error = %e, "Fake server stopped");
            }
        });

        Ok(Self { addr, handle })
    }

    /// Base URL, without a trailing slash
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Errors that can occur starting a fake
#[derive(Debug)]
pub enum TestError {
    Bind(std::io::Error),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Bind(e) => write!(f, "Failed to bind fake server: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

// ── In-process server handle ──

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};

use crate::routes;
use crate::state::{AppState, Fixtures};
use crate::telemetry::{SeededTelemetry, TelemetrySource};

/// Telemetry seed used when the caller does not pick one.
pub const DEFAULT_SEED: u64 = 42;

/// A running mock backend on an ephemeral localhost port.
///
/// The listener stops when [`shutdown`](Self::shutdown) is called or the
/// handle is dropped; each instance carries its own fixture state, so
/// parallel tests never see each other's mutations.
pub struct MockServer {
    addr: SocketAddr,
    cancel: CancellationToken,
    task: JoinHandle<()>,
    _guard: DropGuard,
}

impl MockServer {
    /// Start with the default deterministic telemetry seed.
    pub async fn start() -> io::Result<Self> {
        Self::start_seeded(DEFAULT_SEED).await
    }

    /// Start with a chosen telemetry seed.
    pub async fn start_seeded(seed: u64) -> io::Result<Self> {
        Self::start_with(Arc::new(SeededTelemetry::new(seed))).await
    }

    /// Start with a caller-supplied telemetry source.
    pub async fn start_with(telemetry: Arc<dyn TelemetrySource>) -> io::Result<Self> {
        Self::bind_with(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)), telemetry).await
    }

    /// Bind a chosen address instead of an ephemeral port. This is the
    /// standalone entry point; tests want [`start`](Self::start).
    pub async fn bind(addr: SocketAddr, seed: u64) -> io::Result<Self> {
        Self::bind_with(addr, Arc::new(SeededTelemetry::new(seed))).await
    }

    async fn bind_with(addr: SocketAddr, telemetry: Arc<dyn TelemetrySource>) -> io::Result<Self> {
        let state = AppState {
            fixtures: Arc::new(Fixtures::seeded()),
            telemetry,
        };
        let app = routes::router(state);

        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let cancel = CancellationToken::new();

        let shutdown = cancel.clone();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await });
            if let Err(e) = serve.await {
                debug!(error = %e, "mock backend exited with an error");
            }
        });
        info!(%addr, "mock console backend listening");

        Ok(Self {
            addr,
            cancel: cancel.clone(),
            task,
            _guard: cancel.drop_guard(),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL for pointing a client at this instance.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}

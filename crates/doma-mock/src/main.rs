// Standalone mock console backend.
//
// Binds the same router the integration tests use, so a frontend or an
// ad-hoc client can talk to a live, seeded API without real hardware.

use std::net::SocketAddr;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use doma_mock::{DEFAULT_SEED, MockServer};

/// Development mock of the Doma console backend.
#[derive(Parser)]
#[command(name = "doma-mock", version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "DOMA_MOCK_ADDR", default_value = "127.0.0.1:3000")]
    addr: SocketAddr,

    /// Telemetry seed; equal seeds replay the same reading sequence.
    #[arg(long, env = "DOMA_MOCK_SEED", default_value_t = DEFAULT_SEED)]
    seed: u64,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing();

    if let Err(e) = run(args).await {
        eprintln!("doma-mock: {e}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

async fn run(args: Args) -> std::io::Result<()> {
    let server = MockServer::bind(args.addr, args.seed).await?;
    info!("mock console API at {}", server.base_url());
    info!("Ctrl-C stops the server");

    tokio::signal::ctrl_c().await?;
    server.shutdown().await;
    Ok(())
}

use anyhow::Context;
use backend::{serve, RelayState};
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// chessduel relay server
#[derive(Parser, Debug)]
#[command(name = "chessduel-relay", version)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:3000")]
    bind: SocketAddr,

    /// Seconds a dropped player's seat is held for them to rejoin
    #[arg(long, default_value_t = 10)]
    rejoin_grace: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let listener = TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("cannot bind {}", args.bind))?;
    serve(listener, RelayState::new(Duration::from_secs(args.rejoin_grace))).await?;
    Ok(())
}

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use lgtmbot::config::DEFAULT_SECRETS_DIR;
use lgtmbot::{create_app, FileSecretProvider, ServerState};

#[derive(clap::Parser)]
struct Opts {
    /// Directory containing the `gitea-host`, `gitea-token` and `webhook-secret` files.
    #[arg(long, env = "LGTMBOT_SECRETS_DIR", default_value = DEFAULT_SECRETS_DIR)]
    secrets_dir: PathBuf,

    /// Address on which webhooks are received.
    #[arg(long, env = "LGTMBOT_BIND", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,
}

async fn server(state: ServerState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Cannot bind to {addr}"))?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app).await?;
    Ok(())
}

fn try_main(opts: Opts) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Cannot build tokio runtime")?;

    tracing::info!("Reading secrets from {}", opts.secrets_dir.display());
    let secrets = FileSecretProvider::new(opts.secrets_dir);
    let state = ServerState::new(Arc::new(secrets));

    runtime.block_on(server(state, opts.bind))?;
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let opts = Opts::parse();
    if let Err(error) = try_main(opts) {
        eprintln!("Error: {error:?}");
        std::process::exit(1);
    }
}

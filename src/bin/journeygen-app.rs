use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use journeygen::app::api::{AppState, build_router};
use journeygen::app::curriculum_store::LocalFsCurriculumStore;
use journeygen::config::GenerationConfig;
use journeygen::pipeline::Pipeline;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct AppArgs {
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    /// Store generated curricula under this directory (disabled when omitted).
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    journeygen::logging::init()?;

    let args = AppArgs::parse();
    tracing::info!(?args, "starting journeygen-app");

    let config = GenerationConfig::from_env().context("load config")?;
    tracing::info!(
        model = %config.model,
        max_tokens = config.max_tokens,
        retries = config.retry.retries,
        schema_policy = ?config.schema_policy,
        "generation config"
    );
    let pipeline = Pipeline::from_config(config)?;

    let shutdown = CancellationToken::new();
    let mut state = AppState::new(pipeline).with_cancel(shutdown.clone());
    match &args.data_dir {
        Some(dir) => {
            tracing::info!(data_dir = %dir.display(), "using local filesystem curriculum store");
            state = state.with_store(Arc::new(LocalFsCurriculumStore::new(dir.clone())));
        }
        None => tracing::info!("curriculum storage disabled"),
    }

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {}: {err}", args.addr))?;
    tracing::info!(addr = %args.addr, "listening");

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "install ctrl-c handler");
            return;
        }
        tracing::info!("shutdown requested");
        signal.cancel();
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

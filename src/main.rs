use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    journeygen::logging::init().context("init logging")?;

    let cli = journeygen::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        journeygen::cli::Command::Generate(args) => {
            journeygen::commands::generate(args)
                .await
                .context("generate")?;
        }
        journeygen::cli::Command::Quiz(args) => {
            journeygen::commands::quiz(args).await.context("quiz")?;
        }
    }

    Ok(())
}

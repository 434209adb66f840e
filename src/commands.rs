use std::fs::OpenOptions;
use std::io::Write as _;

use anyhow::Context as _;
use tokio_util::sync::CancellationToken;

use crate::app::model::{GenerateJourneyResponse, GenerateQuizResponse};
use crate::cli::{GenerateArgs, QuizArgs};
use crate::config::GenerationConfig;
use crate::pipeline::{self, JourneyRequest, Pipeline};

pub async fn generate(args: GenerateArgs) -> anyhow::Result<()> {
    let request = JourneyRequest::new(&args.references, args.count, args.title.clone())?;
    ensure_writable(args.out.as_deref(), args.force)?;
    let pipeline = Pipeline::from_config(GenerationConfig::from_env()?)?;
    let cancel = cancel_on_ctrl_c();

    let assembled = pipeline.generate_journey(&request, &cancel).await?;
    if assembled.is_empty() {
        anyhow::bail!(
            "failed to generate modules (termination: {})",
            assembled.termination.as_str()
        );
    }
    if assembled.is_short() {
        tracing::warn!(
            requested = assembled.requested_count,
            actual = assembled.actual_count,
            termination = assembled.termination.as_str(),
            "curriculum is shorter than requested"
        );
    }

    let response = GenerateJourneyResponse {
        assembled,
        curriculum_id: None,
    };
    let json = serde_json::to_string_pretty(&response).context("serialize curriculum")?;
    emit(args.out.as_deref(), &json, args.force)
}

pub async fn quiz(args: QuizArgs) -> anyhow::Result<()> {
    let topic = pipeline::validate_topic(Some(&args.topic))?;
    ensure_writable(args.out.as_deref(), args.force)?;
    let pipeline = Pipeline::from_config(GenerationConfig::from_env()?)?;
    let cancel = cancel_on_ctrl_c();

    let questions = pipeline.generate_quiz(topic, &cancel).await?;
    let json = serde_json::to_string_pretty(&GenerateQuizResponse { questions })
        .context("serialize quiz")?;
    emit(args.out.as_deref(), &json, args.force)
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let guard = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted; cancelling");
            guard.cancel();
        }
    });
    cancel
}

fn ensure_writable(out: Option<&str>, force: bool) -> anyhow::Result<()> {
    if let Some(path) = out
        && std::path::Path::new(path).exists()
        && !force
    {
        anyhow::bail!("output already exists: {path}");
    }
    Ok(())
}

fn emit(out: Option<&str>, json: &str, force: bool) -> anyhow::Result<()> {
    match out {
        Some(path) => write_output(path, json, force),
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}").context("write stdout")?;
            stdout.flush().context("flush stdout")
        }
    }
}

/// Without `force`, `create_new` refuses an existing file.
fn write_output(path: &str, contents: &str, force: bool) -> anyhow::Result<()> {
    if let Some(parent) = std::path::Path::new(path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir: {}", parent.display()))?;
    }

    let mut options = OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }

    let mut file = options
        .open(path)
        .with_context(|| format!("open output: {path}"))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("write output: {path}"))?;
    file.write_all(b"\n")
        .with_context(|| format!("write output: {path}"))?;
    file.flush()
        .with_context(|| format!("flush output: {path}"))?;
    tracing::info!(out = %path, "wrote output");
    Ok(())
}

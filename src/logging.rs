use anyhow::Context as _;

pub const LOG_FORMAT_ENV: &str = "JOURNEYGEN_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => anyhow::bail!("unknown log format: {other}. expected one of: text, json"),
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        match std::env::var(LOG_FORMAT_ENV) {
            Ok(raw) => Self::parse(&raw).with_context(|| format!("invalid {LOG_FORMAT_ENV}")),
            Err(_) => Ok(Self::Text),
        }
    }
}

pub fn init() -> anyhow::Result<()> {
    init_with_format(LogFormat::from_env()?)
}

pub fn init_with_format(format: LogFormat) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
        .context("build log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}

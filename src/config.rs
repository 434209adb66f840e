use std::str::FromStr;
use std::time::Duration;

use anyhow::Context as _;

use crate::retry::RetryPolicy;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MAX_TOKENS: u32 = 4000;

/// What to do with modules that fail schema validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SchemaPolicy {
    /// Log the verdict and keep the module as emitted.
    #[default]
    Lenient,
    /// Drop rejected modules before they are accumulated.
    Strict,
}

impl SchemaPolicy {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "lenient" => Ok(Self::Lenient),
            "strict" => Ok(Self::Strict),
            other => anyhow::bail!("unsupported schema policy: {other}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub openai_base_url: String,
    pub openai_api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,

    /// Overrides the REST base derived from each reference's host.
    pub wiki_api_base: Option<String>,

    pub http_timeout: Duration,
    pub model_timeout: Duration,
    pub retry: RetryPolicy,

    pub schema_policy: SchemaPolicy,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_owned(),
            openai_api_key: None,
            model: DEFAULT_MODEL.to_owned(),
            max_tokens: DEFAULT_MAX_TOKENS,
            wiki_api_base: None,
            http_timeout: Duration::from_secs(30),
            model_timeout: Duration::from_secs(120),
            retry: RetryPolicy::fail_fast(),
            schema_policy: SchemaPolicy::Lenient,
        }
    }
}

impl GenerationConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(base_url) = get("OPENAI_BASE_URL") {
            config.openai_base_url = base_url;
        }
        config.openai_api_key = get("OPENAI_API_KEY");
        if let Some(model) = get("JOURNEYGEN_MODEL") {
            config.model = model;
        }
        if let Some(raw) = get("JOURNEYGEN_MAX_TOKENS") {
            config.max_tokens = parse_var("JOURNEYGEN_MAX_TOKENS", &raw)?;
        }
        config.wiki_api_base = get("JOURNEYGEN_WIKI_API_BASE");

        if let Some(raw) = get("JOURNEYGEN_HTTP_TIMEOUT_SECS") {
            config.http_timeout =
                Duration::from_secs(parse_var("JOURNEYGEN_HTTP_TIMEOUT_SECS", &raw)?);
        }
        if let Some(raw) = get("JOURNEYGEN_MODEL_TIMEOUT_SECS") {
            config.model_timeout =
                Duration::from_secs(parse_var("JOURNEYGEN_MODEL_TIMEOUT_SECS", &raw)?);
        }
        if let Some(raw) = get("JOURNEYGEN_RETRIES") {
            config.retry.retries = parse_var("JOURNEYGEN_RETRIES", &raw)?;
        }
        if let Some(raw) = get("JOURNEYGEN_RETRY_BACKOFF_MS") {
            config.retry.initial_backoff =
                Duration::from_millis(parse_var("JOURNEYGEN_RETRY_BACKOFF_MS", &raw)?);
        }
        if let Some(raw) = get("JOURNEYGEN_RETRY_MAX_BACKOFF_MS") {
            config.retry.max_backoff =
                Duration::from_millis(parse_var("JOURNEYGEN_RETRY_MAX_BACKOFF_MS", &raw)?);
        }
        if let Some(raw) = get("JOURNEYGEN_SCHEMA_POLICY") {
            config.schema_policy = SchemaPolicy::parse(&raw).with_context(|| {
                format!("invalid JOURNEYGEN_SCHEMA_POLICY={raw:?}. expected one of: lenient, strict")
            })?;
        }

        if config.http_timeout.is_zero() || config.model_timeout.is_zero() {
            anyhow::bail!("timeouts must be > 0");
        }
        if config.max_tokens == 0 {
            anyhow::bail!("JOURNEYGEN_MAX_TOKENS must be > 0");
        }

        Ok(config)
    }

    pub fn require_api_key(&self) -> anyhow::Result<&str> {
        self.openai_api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY is not set"))
    }

    /// Policy for calls to the generative service.
    pub fn model_retry(&self) -> RetryPolicy {
        self.retry.with_attempt_timeout(self.model_timeout)
    }

    /// Policy for article summary fetches.
    pub fn fetch_retry(&self) -> RetryPolicy {
        self.retry.with_attempt_timeout(self.http_timeout)
    }
}

fn parse_var<T>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>()
        .with_context(|| format!("invalid {key}={raw:?}"))
}

use anyhow::Context as _;
use async_trait::async_trait;

use crate::config::GenerationConfig;

/// One call to a generative text model.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, instructions: &str, input: &str) -> anyhow::Result<String>;
}

pub fn chat_completions_endpoint(base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    format!("{base_url}/chat/completions")
}

#[derive(Clone)]
pub struct OpenAiChatClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl std::fmt::Debug for OpenAiChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiChatClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl OpenAiChatClient {
    pub fn from_config(config: &GenerationConfig) -> anyhow::Result<Self> {
        let api_key = config.require_api_key()?.to_owned();
        let client = reqwest::Client::builder()
            .timeout(config.model_timeout)
            .build()
            .context("build http client")?;

        Ok(Self {
            client,
            endpoint: chat_completions_endpoint(&config.openai_base_url),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiChatClient {
    async fn generate(&self, instructions: &str, input: &str) -> anyhow::Result<String> {
        tracing::debug!(
            model = %self.model,
            max_tokens = self.max_tokens,
            input_chars = input.len(),
            "chat completion"
        );
        chat_completion_text(
            &self.client,
            &self.endpoint,
            &self.api_key,
            &self.model,
            instructions,
            input,
            self.max_tokens,
        )
        .await
    }
}

pub async fn chat_completion_text(
    client: &reqwest::Client,
    endpoint: &str,
    api_key: &str,
    model: &str,
    instructions: &str,
    input: &str,
    max_tokens: u32,
) -> anyhow::Result<String> {
    let body = serde_json::json!({
        "model": model,
        "messages": [
            { "role": "system", "content": instructions },
            { "role": "user", "content": input },
        ],
        "max_tokens": max_tokens,
    });

    let response = client
        .post(endpoint)
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await
        .with_context(|| format!("POST {endpoint}"))?;

    let status = response.status();
    let raw = response.text().await.context("read OpenAI response body")?;
    if !status.is_success() {
        let message = parse_error_message(&raw).unwrap_or_else(|| raw.clone());
        anyhow::bail!("OpenAI API error ({status}): {message}");
    }

    let value: serde_json::Value = serde_json::from_str(&raw).context("parse OpenAI response")?;
    extract_message_content(&value).context("extract message content")
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    let message = value.get("error")?.get("message")?.as_str()?.to_owned();
    Some(message)
}

// A null `content` (refusals, filtered output) comes back as an empty string so
// the caller's parser decides what it means.
fn extract_message_content(value: &serde_json::Value) -> anyhow::Result<String> {
    let choice = value
        .get("choices")
        .and_then(|v| v.as_array())
        .and_then(|choices| choices.first())
        .ok_or_else(|| anyhow::anyhow!("missing `choices[0]` in response"))?;

    let message = choice
        .get("message")
        .ok_or_else(|| anyhow::anyhow!("missing `choices[0].message` in response"))?;

    Ok(message
        .get("content")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_owned())
}

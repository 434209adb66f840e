use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;

use crate::source::{ArticleSource, Reference};

const CLIENT_USER_AGENT: &str = "journeygen/0.1 (learning journey generator)";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleSummary {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub extract: String,
    #[serde(default)]
    pub thumbnail: Option<Thumbnail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
    pub source: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaItem {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub srcset: Vec<MediaSource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaSource {
    pub src: String,
}

#[derive(Debug, Deserialize)]
struct MediaList {
    #[serde(default)]
    items: Vec<MediaItem>,
}

/// Wikipedia REST client (`/page/summary`, `/page/media-list`).
#[derive(Debug, Clone)]
pub struct WikipediaClient {
    http: reqwest::Client,
    api_base: Option<String>,
}

impl WikipediaClient {
    pub fn new(timeout: Duration, api_base: Option<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("build wikipedia http client")?;
        Ok(Self {
            http,
            api_base: api_base.map(|base| base.trim_end_matches('/').to_owned()),
        })
    }

    fn api_base_for(&self, reference: &Reference) -> String {
        match &self.api_base {
            Some(base) => base.clone(),
            None => format!("{}/api/rest_v1", reference.origin()),
        }
    }

    fn endpoint(&self, reference: &Reference, kind: &str) -> String {
        format!("{}/page/{kind}/{}", self.api_base_for(reference), reference.id())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, endpoint: &str) -> anyhow::Result<T> {
        let response = self
            .http
            .get(endpoint)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .with_context(|| format!("GET {endpoint}"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("GET {endpoint}: HTTP {status}");
        }

        let raw = response
            .text()
            .await
            .with_context(|| format!("read body: {endpoint}"))?;
        serde_json::from_str(&raw).with_context(|| format!("parse json: {endpoint}"))
    }
}

#[async_trait]
impl ArticleSource for WikipediaClient {
    async fn summary(&self, reference: &Reference) -> anyhow::Result<ArticleSummary> {
        let endpoint = self.endpoint(reference, "summary");
        self.get_json(&endpoint).await
    }

    async fn media_list(&self, reference: &Reference) -> anyhow::Result<Vec<MediaItem>> {
        let endpoint = self.endpoint(reference, "media-list");
        let list: MediaList = self.get_json(&endpoint).await?;
        Ok(list.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_follow_reference_host_unless_overridden() -> anyhow::Result<()> {
        let reference = Reference::parse("https://de.wikipedia.org/wiki/Rost_(Chemie)")?;

        let derived = WikipediaClient::new(Duration::from_secs(1), None)?;
        assert_eq!(
            derived.endpoint(&reference, "summary"),
            "https://de.wikipedia.org/api/rest_v1/page/summary/Rost_(Chemie)"
        );

        let overridden =
            WikipediaClient::new(Duration::from_secs(1), Some("http://127.0.0.1:9/api/".into()))?;
        assert_eq!(
            overridden.endpoint(&reference, "media-list"),
            "http://127.0.0.1:9/api/page/media-list/Rost_(Chemie)"
        );
        Ok(())
    }

    #[test]
    fn media_list_payload_tolerates_missing_fields() -> anyhow::Result<()> {
        let list: MediaList = serde_json::from_str(
            r#"{"items":[{"type":"image","title":"File:A.jpg","srcset":[{"src":"//x/a.jpg","scale":"1x"}]},{"type":"video"}]}"#,
        )?;
        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[0].srcset[0].src, "//x/a.jpg");
        assert!(list.items[1].srcset.is_empty());
        Ok(())
    }
}

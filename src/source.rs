use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::formats::{Image, SourceArticle};
use crate::retry::{self, RetryPolicy};
use crate::wikipedia::{ArticleSummary, MediaItem};

/// Media-list images kept per article.
pub const MAX_SECONDARY_IMAGES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid reference (expected https://<lang>.wikipedia.org/wiki/<Title>): {0}")]
pub struct InvalidReference(pub String);

/// A reference URL together with its canonical article identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    url: Url,
    id: String,
}

impl Reference {
    pub fn parse(raw: &str) -> Result<Self, InvalidReference> {
        let invalid = || InvalidReference(raw.to_owned());

        let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(invalid());
        }
        let host = url.host_str().ok_or_else(invalid)?;
        if host != "wikipedia.org" && !host.ends_with(".wikipedia.org") {
            return Err(invalid());
        }
        let id = url
            .path()
            .strip_prefix("/wiki/")
            .map(|rest| rest.trim_end_matches('/'))
            .filter(|rest| !rest.is_empty())
            .ok_or_else(invalid)?
            .to_owned();

        Ok(Self { url, id })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Canonical identifier as it appears in the URL path (still percent-encoded).
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn origin(&self) -> String {
        self.url.origin().ascii_serialization()
    }

    /// Human-readable article name: percent-decoded, underscores as spaces.
    pub fn display_name(&self) -> String {
        let decoded = urlencoding::decode(&self.id)
            .map(|c| c.into_owned())
            .unwrap_or_else(|_| self.id.clone());
        decoded.replace('_', " ")
    }
}

/// Reference-resolution and media-listing collaborators.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    async fn summary(&self, reference: &Reference) -> anyhow::Result<ArticleSummary>;
    async fn media_list(&self, reference: &Reference) -> anyhow::Result<Vec<MediaItem>>;
}

#[derive(Debug, Clone)]
pub struct Aggregated {
    pub articles: Vec<SourceArticle>,
    /// Article texts joined by a blank line.
    pub text: String,
    /// Primary images of all articles, then secondary images of all articles.
    pub images: Vec<Image>,
}

#[derive(Debug)]
struct FetchedArticle {
    text: String,
    primary: Option<Image>,
    secondary: Vec<Image>,
}

/// Fetches every reference concurrently and folds them into one corpus.
///
/// A failed summary fetch fails the whole aggregation; a failed media listing
/// only loses that article's supplementary images.
pub async fn aggregate(
    source: Arc<dyn ArticleSource>,
    references: &[Reference],
    fetch_retry: RetryPolicy,
    cancel: &CancellationToken,
) -> anyhow::Result<Aggregated> {
    let mut join_set = tokio::task::JoinSet::new();
    for (index, reference) in references.iter().cloned().enumerate() {
        let source = Arc::clone(&source);
        let cancel = cancel.clone();
        join_set.spawn(async move {
            let fetched = fetch_article(source.as_ref(), &reference, fetch_retry, &cancel)
                .await
                .with_context(|| format!("fetch reference: {}", reference.url()));
            (index, fetched)
        });
    }

    let mut fetched: Vec<Option<FetchedArticle>> = references.iter().map(|_| None).collect();
    while let Some(joined) = join_set.join_next().await {
        let (index, article) = joined.context("join reference fetch task")?;
        fetched[index] = Some(article?);
    }

    let fetched = fetched
        .into_iter()
        .enumerate()
        .map(|(idx, item)| item.ok_or_else(|| anyhow::anyhow!("missing article for reference {idx}")))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let text = fetched
        .iter()
        .map(|a| a.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    let images = fetched
        .iter()
        .filter_map(|a| a.primary.clone())
        .chain(fetched.iter().flat_map(|a| a.secondary.iter().cloned()))
        .collect::<Vec<_>>();
    let articles = fetched
        .into_iter()
        .map(|a| SourceArticle {
            text: a.text,
            images: a.primary.into_iter().chain(a.secondary).collect(),
        })
        .collect::<Vec<_>>();

    tracing::info!(
        articles = articles.len(),
        text_chars = text.len(),
        images = images.len(),
        "aggregated sources"
    );

    Ok(Aggregated {
        articles,
        text,
        images,
    })
}

async fn fetch_article(
    source: &dyn ArticleSource,
    reference: &Reference,
    fetch_retry: RetryPolicy,
    cancel: &CancellationToken,
) -> anyhow::Result<FetchedArticle> {
    let media_policy = RetryPolicy {
        retries: 0,
        ..fetch_retry
    };
    let (summary, media) = tokio::join!(
        retry::run(&fetch_retry, cancel, "article summary", || source
            .summary(reference)),
        retry::run(&media_policy, cancel, "media list", || source
            .media_list(reference)),
    );
    let summary = summary?;

    let secondary = match media {
        Ok(items) => secondary_images(items),
        Err(err) if retry::is_cancelled(&err) => return Err(err),
        Err(err) => {
            tracing::warn!(
                reference = %reference.url(),
                error = %format!("{err:#}"),
                "media list unavailable; continuing without supplementary images"
            );
            Vec::new()
        }
    };

    if summary.extract.trim().is_empty() {
        tracing::warn!(reference = %reference.url(), "article summary has no text");
    }

    let primary = summary.thumbnail.as_ref().map(|thumb| Image {
        url: thumb.source.clone(),
        title: thumb
            .title
            .clone()
            .or_else(|| summary.title.clone())
            .unwrap_or_else(|| reference.display_name()),
    });

    Ok(FetchedArticle {
        text: summary.extract,
        primary,
        secondary,
    })
}

fn secondary_images(items: Vec<MediaItem>) -> Vec<Image> {
    items
        .into_iter()
        .filter(|item| item.kind == "image")
        .filter_map(|item| {
            let src = item.srcset.first()?.src.trim();
            if src.is_empty() {
                return None;
            }
            Some(Image {
                url: absolutize_src(src),
                title: item.title,
            })
        })
        .take(MAX_SECONDARY_IMAGES)
        .collect()
}

fn absolutize_src(src: &str) -> String {
    match src.strip_prefix("//") {
        Some(rest) => format!("https://{rest}"),
        None => src.to_owned(),
    }
}

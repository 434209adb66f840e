use std::sync::Arc;

use anyhow::Context as _;
use tokio_util::sync::CancellationToken;

use crate::assemble::{self, AssembledCurriculum};
use crate::config::GenerationConfig;
use crate::formats::QuizQuestion;
use crate::openai::{OpenAiChatClient, TextGenerator};
use crate::orchestrator::{BatchOrchestrator, SourceContext};
use crate::quiz;
use crate::source::{self, ArticleSource, InvalidReference, Reference};
use crate::wikipedia::WikipediaClient;

pub const DEFAULT_MODULE_COUNT: usize = 10;
pub const MAX_MODULE_COUNT: usize = 100;

/// Request problems detected before any pipeline work happens.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("references must be a non-empty list of article URLs")]
    MissingReferences,
    #[error(transparent)]
    InvalidReference(#[from] InvalidReference),
    #[error("topic is required")]
    MissingTopic,
}

/// A validated curriculum request.
#[derive(Debug, Clone)]
pub struct JourneyRequest {
    pub references: Vec<Reference>,
    pub module_count: usize,
    pub curriculum_title: Option<String>,
}

impl JourneyRequest {
    pub fn new(
        references: &[String],
        target_module_count: Option<i64>,
        curriculum_title: Option<String>,
    ) -> Result<Self, InputError> {
        let references = references
            .iter()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .map(Reference::parse)
            .collect::<Result<Vec<_>, _>>()?;
        if references.is_empty() {
            return Err(InputError::MissingReferences);
        }

        Ok(Self {
            references,
            module_count: clamp_module_count(target_module_count),
            curriculum_title: curriculum_title
                .map(|t| t.trim().to_owned())
                .filter(|t| !t.is_empty()),
        })
    }
}

pub fn clamp_module_count(requested: Option<i64>) -> usize {
    match requested {
        None => DEFAULT_MODULE_COUNT,
        Some(n) => n.clamp(1, MAX_MODULE_COUNT as i64) as usize,
    }
}

pub fn validate_topic(topic: Option<&str>) -> Result<&str, InputError> {
    topic
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(InputError::MissingTopic)
}

/// Aggregator, orchestrator and assembler wired to their collaborators.
#[derive(Clone)]
pub struct Pipeline {
    source: Arc<dyn ArticleSource>,
    generator: Arc<dyn TextGenerator>,
    config: GenerationConfig,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn ArticleSource>,
        generator: Arc<dyn TextGenerator>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            source,
            generator,
            config,
        }
    }

    pub fn from_config(config: GenerationConfig) -> anyhow::Result<Self> {
        let source = WikipediaClient::new(config.http_timeout, config.wiki_api_base.clone())
            .context("build wikipedia client")?;
        let generator = OpenAiChatClient::from_config(&config).context("build openai client")?;
        Ok(Self::new(Arc::new(source), Arc::new(generator), config))
    }

    pub async fn generate_journey(
        &self,
        request: &JourneyRequest,
        cancel: &CancellationToken,
    ) -> anyhow::Result<AssembledCurriculum> {
        tracing::info!(
            references = request.references.len(),
            module_count = request.module_count,
            "generate journey"
        );

        let aggregated = source::aggregate(
            Arc::clone(&self.source),
            &request.references,
            self.config.fetch_retry(),
            cancel,
        )
        .await
        .context("aggregate sources")?;

        let reference_urls = request
            .references
            .iter()
            .map(|r| r.url().to_string())
            .collect::<Vec<_>>();
        let sources = SourceContext {
            references: &reference_urls,
            curriculum_title: request.curriculum_title.as_deref(),
            text: &aggregated.text,
            images: &aggregated.images,
        };

        let outcome = BatchOrchestrator::new(self.generator.as_ref())
            .with_retry(self.config.model_retry())
            .with_schema_policy(self.config.schema_policy)
            .run(request.module_count, &sources, cancel)
            .await
            .context("generate modules")?;

        Ok(assemble::assemble(
            outcome,
            &request.references,
            request.curriculum_title.as_deref(),
            aggregated.images,
        ))
    }

    pub async fn generate_quiz(
        &self,
        topic: &str,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Vec<QuizQuestion>> {
        quiz::generate_quiz(
            self.generator.as_ref(),
            topic,
            &self.config.model_retry(),
            cancel,
        )
        .await
    }
}

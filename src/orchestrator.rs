use anyhow::Context as _;
use tokio_util::sync::CancellationToken;

use crate::config::SchemaPolicy;
use crate::formats::{Image, Module, Termination};
use crate::openai::TextGenerator;
use crate::parse::{self, Verdict};
use crate::prompt::{self, CURRICULUM_INSTRUCTIONS, PromptInput};
use crate::retry::{self, Cancelled, RetryPolicy};

/// Mutable state of one generation request. Lives only as long as the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRun {
    pub requested_count: usize,
    pub accumulated: Vec<Module>,
    /// Continuation anchor for the next prompt.
    pub last_title: Option<String>,
    pub batch_index: usize,
}

impl GenerationRun {
    pub fn new(requested_count: usize) -> Self {
        Self {
            requested_count,
            accumulated: Vec::new(),
            last_title: None,
            batch_index: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.requested_count.saturating_sub(self.accumulated.len())
    }

    fn accept(&mut self, modules: Vec<Module>) {
        if let Some(last) = modules.last() {
            self.last_title = Some(last.title.clone());
        }
        self.accumulated.extend(modules);
        self.batch_index += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub run: GenerationRun,
    pub termination: Termination,
}

/// What the prompt needs to know about the aggregated sources.
#[derive(Debug, Clone, Copy)]
pub struct SourceContext<'a> {
    pub references: &'a [String],
    pub curriculum_title: Option<&'a str>,
    pub text: &'a str,
    pub images: &'a [Image],
}

pub struct BatchOrchestrator<'a> {
    generator: &'a dyn TextGenerator,
    retry: RetryPolicy,
    schema_policy: SchemaPolicy,
}

impl<'a> BatchOrchestrator<'a> {
    pub fn new(generator: &'a dyn TextGenerator) -> Self {
        Self {
            generator,
            retry: RetryPolicy::fail_fast(),
            schema_policy: SchemaPolicy::Lenient,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_schema_policy(mut self, schema_policy: SchemaPolicy) -> Self {
        self.schema_policy = schema_policy;
        self
    }

    /// Generates batches sequentially until the target is met, the model
    /// stalls, or its output can't be parsed.
    ///
    /// Every accepted batch adds at least one module, so the loop runs at most
    /// `requested_count` times. Only a failed model call (after retries) or
    /// cancellation is an error; every other stop keeps what was accumulated.
    pub async fn run(
        &self,
        requested_count: usize,
        sources: &SourceContext<'_>,
        cancel: &CancellationToken,
    ) -> anyhow::Result<RunOutcome> {
        let mut run = GenerationRun::new(requested_count);

        let termination = loop {
            if run.accumulated.len() >= run.requested_count {
                break Termination::Complete;
            }
            if cancel.is_cancelled() {
                return Err(Cancelled.into());
            }

            let remaining = run.remaining();
            let batch_size = prompt::batch_size(remaining);
            let prompt = prompt::build_curriculum_prompt(&PromptInput {
                references: sources.references,
                remaining,
                curriculum_title: sources.curriculum_title,
                last_module_title: run.last_title.as_deref(),
                source_text: sources.text,
                images: sources.images,
            });

            tracing::info!(
                batch_index = run.batch_index,
                batch_size,
                accumulated = run.accumulated.len(),
                requested = run.requested_count,
                "generate batch"
            );
            let raw = retry::run(&self.retry, cancel, "generate batch", || {
                self.generator.generate(CURRICULUM_INSTRUCTIONS, &prompt)
            })
            .await
            .with_context(|| format!("generate batch {}", run.batch_index))?;

            let modules = match parse::parse_modules(&raw) {
                Ok(modules) => modules,
                Err(err) => {
                    tracing::warn!(
                        batch_index = run.batch_index,
                        error = %err,
                        output_chars = raw.len(),
                        "batch output could not be parsed; stopping"
                    );
                    break Termination::ParseFailed;
                }
            };
            if modules.is_empty() {
                tracing::info!(batch_index = run.batch_index, "model returned no modules; stopping");
                break Termination::Stalled;
            }

            let modules = self.screen(run.batch_index, modules);
            if modules.is_empty() {
                tracing::warn!(
                    batch_index = run.batch_index,
                    "every module in the batch was rejected; stopping"
                );
                break Termination::ParseFailed;
            }

            run.accept(modules);
        };

        tracing::info!(
            termination = termination.as_str(),
            batches = run.batch_index,
            accumulated = run.accumulated.len(),
            requested = run.requested_count,
            "generation finished"
        );
        Ok(RunOutcome { run, termination })
    }

    fn screen(&self, batch_index: usize, modules: Vec<Module>) -> Vec<Module> {
        modules
            .into_iter()
            .filter(|module| match parse::validate_module(module) {
                Verdict::Valid => true,
                Verdict::Rejected { reasons } => {
                    let keep = self.schema_policy == SchemaPolicy::Lenient;
                    tracing::warn!(
                        batch_index,
                        title = %module.title,
                        reasons = ?reasons,
                        kept = keep,
                        "module failed schema validation"
                    );
                    keep
                }
            })
            .collect()
    }
}

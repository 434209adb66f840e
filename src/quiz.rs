use anyhow::Context as _;
use tokio_util::sync::CancellationToken;

use crate::formats::QuizQuestion;
use crate::openai::TextGenerator;
use crate::parse;
use crate::retry::{self, RetryPolicy};

pub const QUIZ_QUESTION_COUNT: usize = 5;

pub const QUIZ_INSTRUCTIONS: &str =
    "You are a quiz author. You write clear multiple-choice questions and reply with JSON only.";

pub fn build_quiz_prompt(topic: &str) -> String {
    format!(
        "Task: Write a multiple-choice quiz about the topic below.\n\
\n\
Topic: {topic}\n\
\n\
Hard rules:\n\
- Produce exactly {QUIZ_QUESTION_COUNT} questions.\n\
- Each question MUST have `question`, `options` (4 strings), `correctAnswer` \
(0-based index into `options`), and `explanation`.\n\
\n\
Output:\n\
- Output ONLY a JSON array (no markdown fences, no commentary).\n\
- Schema:\n\
  [{{\"question\":\"...\",\"options\":[\"...\"],\"correctAnswer\":0,\"explanation\":\"...\"}}]\n",
        topic = topic.trim(),
    )
}

/// Single-shot quiz generation: one model call, no batching.
pub async fn generate_quiz(
    generator: &dyn TextGenerator,
    topic: &str,
    retry_policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> anyhow::Result<Vec<QuizQuestion>> {
    let prompt = build_quiz_prompt(topic);
    tracing::info!(topic = %topic.trim(), "generate quiz");

    let raw = retry::run(retry_policy, cancel, "generate quiz", || {
        generator.generate(QUIZ_INSTRUCTIONS, &prompt)
    })
    .await?;

    let mut questions = parse::parse_quiz_questions(&raw).context("parse quiz output")?;
    if questions.is_empty() {
        anyhow::bail!("model returned no quiz questions");
    }
    if questions.len() != QUIZ_QUESTION_COUNT {
        tracing::warn!(
            returned = questions.len(),
            expected = QUIZ_QUESTION_COUNT,
            "quiz question count differs from request"
        );
    }
    questions.truncate(QUIZ_QUESTION_COUNT);
    Ok(questions)
}

use serde::Deserialize;

use crate::formats::{Module, QuizQuestion, lenient};

pub const QUIZ_QUESTIONS_PER_MODULE: usize = 3;

pub const LESSON_TEXT_FALLBACK_WARNING: &str =
    "The model did not provide lesson text; showing the summary instead.";

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("no JSON array found in model output")]
    MissingArray,
    #[error("model output is not a valid JSON array: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawModule {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    lesson_text: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    lesson_text_warning: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    summary: Option<String>,
    #[serde(default, deserialize_with = "lenient::questions")]
    quiz: Option<Vec<QuizQuestion>>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    image_url: Option<String>,
}

impl RawModule {
    fn into_module(self) -> Module {
        let summary = self.summary.unwrap_or_default();
        let (lesson_text, lesson_text_warning) = match self.lesson_text {
            Some(text) if !text.trim().is_empty() => (text, self.lesson_text_warning),
            _ => (
                summary.clone(),
                Some(LESSON_TEXT_FALLBACK_WARNING.to_owned()),
            ),
        };

        Module {
            title: self.title.unwrap_or_default(),
            lesson_text,
            lesson_text_warning,
            summary,
            quiz: self.quiz.unwrap_or_default(),
            image_url: self.image_url.filter(|url| !url.trim().is_empty()),
        }
    }
}

/// Everything from the first `[` on. Trailing text after the array is not stripped.
pub fn extract_json_array(text: &str) -> Result<&str, ParseError> {
    let start = text.find('[').ok_or(ParseError::MissingArray)?;
    Ok(&text[start..])
}

/// Parses one batch of model output into modules.
///
/// An empty array is a valid result. Missing `lessonText` falls back to the
/// summary and sets `lessonTextWarning`.
pub fn parse_modules(raw: &str) -> Result<Vec<Module>, ParseError> {
    let payload = extract_json_array(raw)?;
    let modules: Vec<RawModule> = serde_json::from_str(payload)?;
    Ok(modules.into_iter().map(RawModule::into_module).collect())
}

pub fn parse_quiz_questions(raw: &str) -> Result<Vec<QuizQuestion>, ParseError> {
    let payload = extract_json_array(raw)?;
    Ok(serde_json::from_str(payload)?)
}

/// Result of checking a parsed module against the shape learners expect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Rejected { reasons: Vec<String> },
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

pub fn validate_module(module: &Module) -> Verdict {
    let mut reasons = Vec::new();

    if module.title.trim().is_empty() {
        reasons.push("title is empty".to_owned());
    }
    if module.lesson_text.trim().is_empty() {
        reasons.push("lessonText and summary are both empty".to_owned());
    }
    if module.quiz.len() != QUIZ_QUESTIONS_PER_MODULE {
        reasons.push(format!(
            "quiz has {} question(s), expected {QUIZ_QUESTIONS_PER_MODULE}",
            module.quiz.len()
        ));
    }
    for (idx, question) in module.quiz.iter().enumerate() {
        reasons.extend(question_problems(question).map(|p| format!("quiz[{idx}]: {p}")));
    }

    if reasons.is_empty() {
        Verdict::Valid
    } else {
        Verdict::Rejected { reasons }
    }
}

fn question_problems(question: &QuizQuestion) -> impl Iterator<Item = String> {
    let mut problems = Vec::new();
    if question.question.trim().is_empty() {
        problems.push("question text is empty".to_owned());
    }
    if question.options.is_empty() {
        problems.push("no options".to_owned());
    }
    let in_range = usize::try_from(question.correct_answer)
        .map(|idx| idx < question.options.len())
        .unwrap_or(false);
    if !question.options.is_empty() && !in_range {
        problems.push(format!(
            "correctAnswer {} is out of range for {} option(s)",
            question.correct_answer,
            question.options.len()
        ));
    }
    problems.into_iter()
}

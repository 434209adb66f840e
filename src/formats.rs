use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    pub title: String,
}

/// Text and images gathered for one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceArticle {
    pub text: String,
    /// Thumbnail first (when present), then media-list images.
    pub images: Vec<Image>,
}

/// Accepted as the model emits it: nulls and mistyped values fall back to
/// defaults here and are judged later by schema validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    #[serde(default, deserialize_with = "lenient::string")]
    pub question: String,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub options: Vec<String>,
    /// `-1` when the model sent something that is not an index.
    #[serde(default, deserialize_with = "lenient::index")]
    pub correct_answer: i64,
    #[serde(default, deserialize_with = "lenient::string")]
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub title: String,
    pub lesson_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_text_warning: Option<String>,
    pub summary: String,
    pub quiz: Vec<QuizQuestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Curriculum {
    pub title: String,
    pub description: String,
    pub modules: Vec<Module>,
}

/// How a generation run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Complete,
    Stalled,
    ParseFailed,
}

impl Termination {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Stalled => "stalled",
            Self::ParseFailed => "parse_failed",
        }
    }
}

/// Field deserializers that coerce loosely typed model output instead of failing.
pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::QuizQuestion;

    fn text(value: Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
        Ok(text(Value::deserialize(de)?).unwrap_or_default())
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
        Ok(text(Value::deserialize(de)?))
    }

    pub fn strings<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<String>, D::Error> {
        Ok(match Value::deserialize(de)? {
            Value::Array(items) => items.into_iter().filter_map(text).collect(),
            _ => Vec::new(),
        })
    }

    pub fn index<'de, D: Deserializer<'de>>(de: D) -> Result<i64, D::Error> {
        let parsed = match Value::deserialize(de)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        Ok(parsed.unwrap_or(-1))
    }

    /// Non-array values become no questions; non-object entries are skipped.
    pub fn questions<'de, D: Deserializer<'de>>(
        de: D,
    ) -> Result<Option<Vec<QuizQuestion>>, D::Error> {
        Ok(match Value::deserialize(de)? {
            Value::Array(items) => Some(
                items
                    .into_iter()
                    .filter(Value::is_object)
                    .filter_map(|item| serde_json::from_value(item).ok())
                    .collect(),
            ),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiz_question_coerces_loose_types() -> anyhow::Result<()> {
        let question: QuizQuestion = serde_json::from_str(
            r#"{"question":"Q","options":[1,"two",null,3.5],"correctAnswer":"1","explanation":null}"#,
        )?;
        assert_eq!(question.options, vec!["1", "two", "3.5"]);
        assert_eq!(question.correct_answer, 1);
        assert_eq!(question.explanation, "");

        let question: QuizQuestion =
            serde_json::from_str(r#"{"question":7,"options":"a","correctAnswer":2.0}"#)?;
        assert_eq!(question.question, "7");
        assert!(question.options.is_empty());
        assert_eq!(question.correct_answer, 2);
        Ok(())
    }

    #[test]
    fn non_index_answer_is_flagged_with_minus_one() -> anyhow::Result<()> {
        for raw in [r#""first""#, "null", "1.5", "[0]"] {
            let question: QuizQuestion =
                serde_json::from_str(&format!(r#"{{"question":"Q","correctAnswer":{raw}}}"#))?;
            assert_eq!(question.correct_answer, -1, "{raw}");
        }
        let question: QuizQuestion = serde_json::from_str(r#"{"question":"Q"}"#)?;
        assert_eq!(question.correct_answer, 0);
        Ok(())
    }
}

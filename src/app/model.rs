use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assemble::AssembledCurriculum;
use crate::formats::QuizQuestion;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateJourneyRequest {
    #[serde(default)]
    pub references: Option<Vec<String>>,
    #[serde(default)]
    pub target_module_count: Option<i64>,
    #[serde(default)]
    pub curriculum_title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateJourneyResponse {
    #[serde(flatten)]
    pub assembled: AssembledCurriculum,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curriculum_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateQuizRequest {
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateQuizResponse {
    pub questions: Vec<QuizQuestion>,
}

/// A generated curriculum as persisted by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCurriculum {
    pub curriculum_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub references: Vec<String>,
    #[serde(flatten)]
    pub assembled: AssembledCurriculum,
}

impl StoredCurriculum {
    pub fn new(references: Vec<String>, assembled: AssembledCurriculum) -> Self {
        Self {
            curriculum_id: Uuid::new_v4(),
            created_at: Utc::now(),
            references,
            assembled,
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::formats::{Curriculum, Image, Termination};
use crate::orchestrator::RunOutcome;
use crate::source::Reference;

pub const DEFAULT_JOURNEY_TITLE: &str = "AI-Generated Journey";

/// Final curriculum plus how it compares to what was asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssembledCurriculum {
    pub curriculum: Curriculum,
    pub images: Vec<Image>,
    pub requested_count: usize,
    pub actual_count: usize,
    pub termination: Termination,
}

impl AssembledCurriculum {
    pub fn is_empty(&self) -> bool {
        self.curriculum.modules.is_empty()
    }

    pub fn is_short(&self) -> bool {
        self.actual_count < self.requested_count
    }
}

pub fn assemble(
    outcome: RunOutcome,
    references: &[Reference],
    curriculum_title: Option<&str>,
    images: Vec<Image>,
) -> AssembledCurriculum {
    let RunOutcome { run, termination } = outcome;
    let requested_count = run.requested_count;

    let mut modules = run.accumulated;
    if modules.len() > requested_count {
        tracing::debug!(
            dropped = modules.len() - requested_count,
            "trimming modules beyond the requested count"
        );
        modules.truncate(requested_count);
    }

    let title = curriculum_title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .or_else(|| {
            modules
                .first()
                .map(|m| m.title.trim().to_owned())
                .filter(|t| !t.is_empty())
        })
        .unwrap_or_else(|| DEFAULT_JOURNEY_TITLE.to_owned());

    let actual_count = modules.len();
    AssembledCurriculum {
        curriculum: Curriculum {
            title,
            description: describe_sources(references),
            modules,
        },
        images,
        requested_count,
        actual_count,
        termination,
    }
}

/// Static description derived from the reference list, not the content.
pub fn describe_sources(references: &[Reference]) -> String {
    let names = references
        .iter()
        .map(Reference::display_name)
        .collect::<Vec<_>>();
    let noun = if names.len() == 1 { "article" } else { "articles" };
    format!(
        "A learning journey generated from {} source {noun}: {}.",
        names.len(),
        names.join(", ")
    )
}

use crate::formats::Image;

/// Modules requested per model call.
pub const BATCH_SIZE: usize = 3;

/// Informal upper bound for a module's lesson text.
pub const LESSON_WORD_LIMIT: usize = 120;

pub const CURRICULUM_INSTRUCTIONS: &str = "You are an instructional designer. \
You turn reference articles into short, accurate learning modules with quizzes. \
You reply with JSON only.";

pub fn batch_size(remaining: usize) -> usize {
    remaining.min(BATCH_SIZE)
}

#[derive(Debug, Clone, Copy)]
pub struct PromptInput<'a> {
    pub references: &'a [String],
    pub remaining: usize,
    pub curriculum_title: Option<&'a str>,
    pub last_module_title: Option<&'a str>,
    pub source_text: &'a str,
    pub images: &'a [Image],
}

/// Builds the prompt for the next batch. Same input, same prompt.
pub fn build_curriculum_prompt(input: &PromptInput<'_>) -> String {
    let count = batch_size(input.remaining);
    let noun = if count == 1 { "module" } else { "modules" };

    let mut context = String::new();
    if let Some(title) = input.curriculum_title.filter(|t| !t.trim().is_empty()) {
        context.push_str(&format!("- Journey title: {}\n", title.trim()));
    }
    context.push_str(&format!(
        "- Source articles: {}\n",
        input.references.join(", ")
    ));
    context.push_str(&format!("- Modules still needed overall: {}\n", input.remaining));

    let continuation = match input.last_module_title {
        Some(last) => format!(
            "- The previous module was titled \"{last}\".\n\
- Continue thematically or chronologically from that module.\n\
- Do not repeat content that module or earlier ones already covered.\n"
        ),
        None => "- This is the first batch: start with the foundations of the topic.\n".to_owned(),
    };

    let images = if input.images.is_empty() {
        "(none)\n".to_owned()
    } else {
        input
            .images
            .iter()
            .map(|image| format!("- {} | {}\n", image.url, image.title))
            .collect::<String>()
    };

    format!(
        "Task: Write the next {count} {noun} of a learning journey built from the source articles below.\n\
\n\
Context:\n\
{context}\
\n\
Continuation:\n\
{continuation}\
\n\
Hard rules:\n\
- Produce exactly {count} {noun}.\n\
- Each module MUST have:\n\
  - `title` (non-empty)\n\
  - `lessonText`: at most about {LESSON_WORD_LIMIT} words; mark key terms with **bold**\n\
  - `summary`: one or two sentences\n\
  - `quiz`: exactly 3 multiple-choice questions, each with `question`, `options` (4 strings), \
`correctAnswer` (0-based index into `options`), and `explanation`\n\
- A module MAY set `imageUrl` to one URL from the image list when it fits the lesson.\n\
- Use ONLY facts present in the source text.\n\
\n\
BEGIN_SOURCE_TEXT\n\
{source_text}\n\
END_SOURCE_TEXT\n\
\n\
BEGIN_IMAGES\n\
{images}\
END_IMAGES\n\
\n\
Output:\n\
- Output ONLY a JSON array of exactly {count} module objects (no markdown fences, no commentary).\n\
- Schema:\n\
  [{{\"title\":\"...\",\"lessonText\":\"...\",\"summary\":\"...\",\"quiz\":[{{\"question\":\"...\",\"options\":[\"...\"],\"correctAnswer\":0,\"explanation\":\"...\"}}],\"imageUrl\":\"...\"}}]\n",
        source_text = input.source_text.trim(),
    )
}

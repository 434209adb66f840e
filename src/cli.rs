use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a learning journey from encyclopedia articles.
    Generate(GenerateArgs),
    /// Generate a standalone multiple-choice quiz for a topic.
    Quiz(QuizArgs),
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Article URL (repeatable), e.g. https://en.wikipedia.org/wiki/Tide.
    #[arg(long = "reference", required = true)]
    pub references: Vec<String>,

    /// Number of modules to generate (clamped to 1..=100).
    #[arg(long, allow_negative_numbers = true)]
    pub count: Option<i64>,

    /// Journey title (defaults to the first module's title).
    #[arg(long)]
    pub title: Option<String>,

    /// Output JSON file (prints to stdout when omitted).
    #[arg(long)]
    pub out: Option<String>,

    /// Overwrite the output file if it exists.
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct QuizArgs {
    /// Topic to write questions about.
    #[arg(long)]
    pub topic: String,

    /// Output JSON file (prints to stdout when omitted).
    #[arg(long)]
    pub out: Option<String>,

    /// Overwrite the output file if it exists.
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

use anyhow::Result;
use clap::{Parser, Subcommand};
use deckhand::commands;

#[derive(Parser)]
#[command(name = "deckhand")]
#[command(
  about = "Deckhand - Paper-to-Media Content Studio\nRetrieval-backed slide outlines and speech scripts from research papers"
)]
#[command(version)]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Fetch recent papers from a remote source into the local store
  Crawl {
    /// Search keywords (space-separated)
    #[arg(required = true)]
    keywords: Vec<String>,
    /// Maximum number of papers to fetch
    #[arg(short, long, default_value = "10")]
    max: usize,
    /// Only papers submitted within the last N days
    #[arg(short, long)]
    days: Option<i64>,
    /// Paper source to crawl
    #[arg(long, default_value = "arxiv")]
    source: String,
    /// Pause between processed entries, in milliseconds
    #[arg(long, default_value = "500")]
    delay_ms: u64,
  },
  /// Generate a slide outline and/or speech script for a stored paper
  Generate {
    /// Paper id or exact title
    paper: String,
    /// Produce the slide outline
    #[arg(long)]
    ppt: bool,
    /// Produce the speech script
    #[arg(long)]
    speech: bool,
    /// Delivery style: academic, accessible, technical or custom
    #[arg(short, long, default_value = "academic")]
    style: String,
    /// Free-text style description, required with --style custom
    #[arg(long)]
    custom_style: Option<String>,
    /// Generative backend: openai, claude, gemini or custom
    #[arg(short, long, default_value = "openai")]
    backend: String,
    /// Sampling temperature in [0, 1]
    #[arg(short, long, default_value = "0.7")]
    temperature: f32,
  },
  /// Rebuild embedding partitions from stored records
  Reindex {
    /// Record kind to refresh; all four when omitted
    kind: Option<String>,
  },
  /// Rank stored records of a kind against a query
  Search {
    /// Record kind to search (ppt_methods, speech_methods, history_contents, papers)
    kind: String,
    /// Query text
    query: String,
    /// Number of results to show
    #[arg(short, long, default_value = "5")]
    top: usize,
  },
  /// List records of a kind
  List {
    /// Record kind to list
    kind: String,
  },
  /// Show one record in full
  Show {
    /// Record kind
    kind: String,
    /// Record id
    id: String,
  },
  /// Add a record to the store
  Add {
    /// Record kind
    kind: String,
    /// Record title
    title: String,
    /// Record body text
    content: String,
    /// Content type for history records: ppt or speech
    #[arg(long)]
    content_type: Option<String>,
  },
  /// Delete a record from the store
  Delete {
    /// Record kind
    kind: String,
    /// Record id
    id: String,
  },
  /// Load the starter methods and sample paper
  Seed,
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  let result = match cli.command {
    Command::Crawl { keywords, max, days, source, delay_ms } => {
      commands::crawl(&keywords.join(" "), max, days, &source, delay_ms).await
    }
    Command::Generate { paper, ppt, speech, style, custom_style, backend, temperature } => {
      commands::generate(
        &paper,
        ppt,
        speech,
        &style,
        custom_style.as_deref(),
        &backend,
        temperature,
      )
      .await
    }
    Command::Reindex { kind } => commands::reindex(kind.as_deref()),
    Command::Search { kind, query, top } => commands::search(&kind, &query, top),
    Command::List { kind } => commands::list(&kind),
    Command::Show { kind, id } => commands::show(&kind, &id),
    Command::Add { kind, title, content, content_type } => {
      commands::add(&kind, &title, &content, content_type.as_deref())
    }
    Command::Delete { kind, id } => commands::delete(&kind, &id),
    Command::Seed => commands::seed(),
  };

  if let Err(e) = result {
    quill::error(&format!("{e:#}"));
    std::process::exit(1);
  }
  Ok(())
}

//! CLI command handlers. Thin wiring over the library: open the store,
//! run the operation, narrate through quill, print results to stdout.

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use colored::*;
use std::sync::Arc;

use crate::arxiv::{create_source, CrawlQuery};
use crate::crawler::Crawler;
use crate::embedder::{HashEmbedder, TextEmbedder};
use crate::embeddings::EmbeddingStore;
use crate::generator::{GenerationRequest, Generator, Style};
use crate::pipeline::{ProgressFn, RunOutcome};
use crate::record::{ContentKind, Record, RecordKind};
use crate::retrieval::RetrievalGateway;
use crate::storage::{FileStore, RecordStore};

/// The collaborators every command shares
struct Studio {
  store: Arc<dyn RecordStore>,
  embeddings: Arc<EmbeddingStore>,
  gateway: Arc<RetrievalGateway>,
}

fn open_studio() -> Studio {
  let store: Arc<dyn RecordStore> = Arc::new(FileStore::new());
  let embeddings = Arc::new(EmbeddingStore::load(Arc::clone(&store), default_embedder()));
  let gateway = Arc::new(RetrievalGateway::new(Arc::clone(&store), Arc::clone(&embeddings)));
  Studio { store, embeddings, gateway }
}

/// With the neural feature on, prefer the ONNX model and fall back to the
/// hash embedder when it cannot be loaded. Without it, hash embeddings.
fn default_embedder() -> Arc<dyn TextEmbedder> {
  #[cfg(feature = "neural")]
  {
    match crate::embedder::OnnxEmbedder::new() {
      Ok(model) => return Arc::new(model),
      Err(e) => {
        quill::warn(&format!("Neural embedder unavailable, using hash embedder: {}", e))
      }
    }
  }
  Arc::new(HashEmbedder::default())
}

fn progress_logger(label: &'static str) -> ProgressFn {
  Arc::new(move |percent| quill::info(&format!("{label}: {percent}%")))
}

/// Fetch recent papers from a remote source, persist the new ones, reindex
pub async fn crawl(
  keywords: &str,
  max_results: usize,
  days_back: Option<i64>,
  source_name: &str,
  delay_ms: u64,
) -> Result<()> {
  let studio = open_studio();
  let source = create_source(source_name)?;
  let crawler = Crawler::new(Arc::clone(&studio.store), source).with_delay_ms(delay_ms);

  let query = CrawlQuery { keywords: keywords.to_string(), max_results, days_back };

  let (tx, rx) = tokio::sync::oneshot::channel();
  crawler.start(
    query,
    progress_logger("Crawl"),
    Box::new(move |outcome, report| {
      let _ = tx.send((outcome, report));
    }),
  )?;
  let (outcome, report) = rx.await?;

  match outcome {
    RunOutcome::Completed => {
      println!(
        "{} Crawl finished: {} fetched, {} new, {} already stored",
        "✓".green(),
        report.fetched,
        report.persisted.to_string().green(),
        report.skipped_duplicates
      );
      if report.persisted > 0 {
        let indexed = studio.embeddings.refresh(RecordKind::Paper)?;
        println!("{} Indexed {} papers", "✓".green(), indexed);
      }
      Ok(())
    }
    RunOutcome::Cancelled => {
      quill::warn("Crawl cancelled; partial batch kept");
      Ok(())
    }
    RunOutcome::Failed => bail!("Crawl failed, see log output"),
  }
}

/// Generate outline and/or script for a stored paper, then reindex history
#[allow(clippy::too_many_arguments)]
pub async fn generate(
  target: &str,
  ppt: bool,
  speech: bool,
  style: &str,
  custom_style: Option<&str>,
  backend: &str,
  temperature: f32,
) -> Result<()> {
  let studio = open_studio();
  let paper = resolve_paper(studio.store.as_ref(), target)?;

  // Both outputs unless the caller narrowed the request
  let (generate_ppt, generate_speech) = if ppt || speech { (ppt, speech) } else { (true, true) };

  let request = GenerationRequest {
    paper_id: Some(paper.id.clone()),
    title: paper.title.clone(),
    summary: paper.content.clone(),
    generate_ppt,
    generate_speech,
    style: Style::parse(style, custom_style)?,
    backend: backend.to_string(),
    temperature,
  };

  quill::announce(&format!("Generating for: {}", paper.title));
  let generator = Generator::new(Arc::clone(&studio.store), Arc::clone(&studio.gateway));

  let (tx, rx) = tokio::sync::oneshot::channel();
  generator.start(
    request,
    progress_logger("Generation"),
    Box::new(move |outcome, result| {
      let _ = tx.send((outcome, result));
    }),
  )?;
  let (outcome, result) = rx.await?;

  match outcome {
    RunOutcome::Completed => {
      if let Some(outline) = &result.ppt {
        println!("\n=== {} ===\n{}", "Slide outline".cyan(), outline);
      }
      if let Some(script) = &result.speech {
        println!("\n=== {} ===\n{}", "Speech script".cyan(), script);
      }
      let indexed = studio.embeddings.refresh(RecordKind::History)?;
      println!(
        "\n{} Generation finished for {} ({} history records indexed)",
        "✓".green(),
        paper.title.cyan(),
        indexed
      );
      Ok(())
    }
    RunOutcome::Cancelled => {
      quill::warn("Generation cancelled");
      Ok(())
    }
    RunOutcome::Failed => bail!("Generation failed, see log output"),
  }
}

/// Rebuild one embedding partition, or all four
pub fn reindex(kind: Option<&str>) -> Result<()> {
  let studio = open_studio();

  match kind {
    Some(value) => {
      let kind = RecordKind::parse(value)?;
      let count = studio.embeddings.refresh(kind)?;
      println!("{} Reindexed {} ({} records)", "✓".green(), kind.to_string().cyan(), count);
    }
    None => {
      let mut failures = 0;
      for (kind, outcome) in studio.embeddings.refresh_all() {
        match outcome {
          Ok(count) => {
            println!("{} {} ({} records)", "✓".green(), kind.to_string().cyan(), count)
          }
          Err(e) => {
            failures += 1;
            quill::error(&format!("{} failed: {}", kind, e));
          }
        }
      }
      if failures > 0 {
        bail!("{} partition(s) failed to refresh", failures);
      }
    }
  }
  Ok(())
}

/// Rank stored records of a kind against a query
pub fn search(kind: &str, query: &str, top: usize) -> Result<()> {
  let studio = open_studio();
  let kind = RecordKind::parse(kind)?;
  let hits = studio.embeddings.search(kind, query, top)?;

  if hits.is_empty() {
    println!("No matches found for: {}", query.yellow());
    return Ok(());
  }

  for (rank, hit) in hits.iter().enumerate() {
    println!(
      "{:>2}. {} {} ({})",
      rank + 1,
      format!("{:.3}", hit.score).green(),
      hit.title.cyan(),
      hit.id.yellow()
    );
  }
  Ok(())
}

/// List records of a kind, one per line
pub fn list(kind: &str) -> Result<()> {
  let studio = open_studio();
  let kind = RecordKind::parse(kind)?;
  let records = studio.store.list_records(kind)?;

  if records.is_empty() {
    println!("No {} records found", kind);
    return Ok(());
  }

  for record in records {
    match record.content_type {
      Some(tag) => println!("{} {} [{}]", record.id.yellow(), record.title.cyan(), tag.label()),
      None => println!("{} {}", record.id.yellow(), record.title.cyan()),
    }
  }
  Ok(())
}

/// Show one record in full
pub fn show(kind: &str, id: &str) -> Result<()> {
  let studio = open_studio();
  let kind = RecordKind::parse(kind)?;
  let record = studio
    .store
    .get_by_id(kind, id)?
    .ok_or_else(|| anyhow!("No {} record with id {}", kind, id))?;

  println!("=== {} ===", record.title.cyan());
  if let Some(authors) = &record.authors {
    println!("Authors: {authors}");
  }
  if let Some(url) = &record.url {
    println!("URL: {url}");
  }
  if let Some(source) = &record.source {
    println!("Source: {source}");
  }
  if let Some(published) = &record.published_at {
    println!("Published: {}", published.format("%Y-%m-%d"));
  }
  if let Some(tag) = record.content_type {
    println!("Type: {}", tag.label());
  }
  if let Some(paper_id) = &record.paper_id {
    println!("Paper: {paper_id}");
  }
  println!("---\n{}", record.content);
  Ok(())
}

/// Add a record and refresh its partition
pub fn add(kind: &str, title: &str, content: &str, content_type: Option<&str>) -> Result<()> {
  let studio = open_studio();
  let kind = RecordKind::parse(kind)?;

  let record = match kind {
    RecordKind::History => {
      let tag = content_type
        .ok_or_else(|| anyhow!("History records need --content-type (ppt or speech)"))?;
      Record::history(title, content, parse_content_kind(tag)?, None)
    }
    _ => Record::new(title, content),
  };

  let saved = studio.store.upsert(kind, record)?;
  studio.embeddings.refresh(kind)?;
  println!("{} Added {} record {}", "✓".green(), kind.to_string().cyan(), saved.id.yellow());
  Ok(())
}

/// Delete a record and refresh its partition
pub fn delete(kind: &str, id: &str) -> Result<()> {
  let studio = open_studio();
  let kind = RecordKind::parse(kind)?;

  if !studio.store.delete(kind, id)? {
    bail!("No {} record with id {}", kind, id);
  }
  studio.embeddings.refresh(kind)?;
  println!("{} Deleted {} record {}", "✓".green(), kind.to_string().cyan(), id.yellow());
  Ok(())
}

/// Load the starter methods and sample paper, once per empty kind
pub fn seed() -> Result<()> {
  let studio = open_studio();

  let batches = [
    (RecordKind::PptMethod, ppt_method_fixtures()),
    (RecordKind::SpeechMethod, speech_method_fixtures()),
    (RecordKind::Paper, paper_fixtures()),
  ];

  for (kind, fixtures) in batches {
    let seeded = seed_kind(studio.store.as_ref(), kind, fixtures)?;
    if seeded > 0 {
      let indexed = studio.embeddings.refresh(kind)?;
      println!(
        "{} Seeded {} with {} records ({} indexed)",
        "✓".green(),
        kind.to_string().cyan(),
        seeded,
        indexed
      );
    } else {
      println!("{} already has records, skipping", kind.to_string().cyan());
    }
  }
  Ok(())
}

/// Id lookup first, then exact title
fn resolve_paper(store: &dyn RecordStore, target: &str) -> Result<Record> {
  if let Some(paper) = store.get_by_id(RecordKind::Paper, target)? {
    return Ok(paper);
  }
  if let Some(paper) = store.get_by_title(RecordKind::Paper, target)? {
    return Ok(paper);
  }
  Err(anyhow!("No stored paper matches '{}' (try 'deckhand list papers')", target))
}

fn parse_content_kind(value: &str) -> Result<ContentKind> {
  match value.to_lowercase().as_str() {
    "ppt" => Ok(ContentKind::Ppt),
    "speech" => Ok(ContentKind::Speech),
    other => Err(anyhow!("Unknown content type '{}' (expected ppt or speech)", other)),
  }
}

fn seed_kind(store: &dyn RecordStore, kind: RecordKind, fixtures: Vec<Record>) -> Result<usize> {
  if !store.list_records(kind)?.is_empty() {
    return Ok(0);
  }
  let count = fixtures.len();
  for record in fixtures {
    store.upsert(kind, record)?;
  }
  Ok(count)
}

fn ppt_method_fixtures() -> Vec<Record> {
  vec![
    Record::new(
      "Problem-Solution Deck Frame",
      "Open with the problem the paper attacks and why existing approaches fall short. \
       Follow with one slide per component of the proposed solution, then results against \
       baselines, then limitations and takeaways. Keep one idea per slide and lead each \
       slide title with the claim it supports.",
    ),
    Record::new(
      "Three-Act Deck Frame",
      "Act one sets context and stakes: the field, the gap, the question. Act two walks \
       the method top-down, diagrams before math. Act three lands the results, ablations \
       and what the audience should remember. Close with one slide stating the single \
       headline finding.",
    ),
  ]
}

fn speech_method_fixtures() -> Vec<Record> {
  vec![
    Record::new(
      "Hook, Body, Closing Frame",
      "Start with a hook that makes the problem concrete within thirty seconds. The body \
       walks the idea in three beats, each ending with a plain-language recap. Close by \
       restating the headline result and what it changes for the listener.",
    ),
    Record::new(
      "Plain-Language Analogy Frame",
      "Anchor the core mechanism to one everyday analogy introduced early, and return to \
       it at every technical step. Spell out numbers sparingly and round aggressively. \
       End each section with the analogy updated to cover what was just explained.",
    ),
  ]
}

fn paper_fixtures() -> Vec<Record> {
  let published = DateTime::parse_from_rfc3339("2017-06-12T17:57:34Z")
    .map(|dt| dt.with_timezone(&Utc))
    .ok();
  vec![Record::paper(
    "Attention Is All You Need",
    "We propose a new simple network architecture, the Transformer, based solely on \
     attention mechanisms, dispensing with recurrence and convolutions entirely. \
     Experiments on two machine translation tasks show these models to be superior in \
     quality while being more parallelizable and requiring significantly less time to \
     train.",
    "Ashish Vaswani, Noam Shazeer, Niki Parmar, Jakob Uszkoreit, Llion Jones, \
     Aidan N. Gomez, Lukasz Kaiser, Illia Polosukhin",
    "http://arxiv.org/pdf/1706.03762v7",
    "arxiv",
    published,
  )]
}

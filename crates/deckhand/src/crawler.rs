use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::arxiv::{CrawlQuery, PaperSource};
use crate::pipeline::{
  spawn_run, PipelineError, ProgressFn, ProgressReporter, RunOutcome, SingleFlight,
};
use crate::record::RecordKind;
use crate::storage::RecordStore;

/// Pause between processed entries, keeping outbound request rate polite
pub const DEFAULT_THROTTLE_MS: u64 = 500;

/// Counts for one crawl run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlReport {
  pub fetched: usize,
  pub persisted: usize,
  pub skipped_duplicates: usize,
}

/// The crawl orchestrator: pulls papers from a remote source and persists
/// the new ones. Same single-flight contract as the generation side; a
/// cancelled run keeps the entries it had already accepted.
pub struct Crawler {
  store: Arc<dyn RecordStore>,
  source: Arc<dyn PaperSource>,
  gate: Arc<SingleFlight>,
  delay_ms: u64,
}

impl Crawler {
  pub fn new(store: Arc<dyn RecordStore>, source: Arc<dyn PaperSource>) -> Self {
    Self { store, source, gate: Arc::new(SingleFlight::new()), delay_ms: DEFAULT_THROTTLE_MS }
  }

  pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
    self.delay_ms = delay_ms;
    self
  }

  pub fn is_running(&self) -> bool {
    self.gate.is_running()
  }

  /// Request cooperative cancellation, observed at entry boundaries
  pub fn cancel(&self) {
    self.gate.cancel();
  }

  /// Launch a crawl; rejected with `Busy` while one is in flight
  pub fn start(
    &self,
    query: CrawlQuery,
    on_progress: ProgressFn,
    on_complete: Box<dyn FnOnce(RunOutcome, CrawlReport) + Send>,
  ) -> Result<(), PipelineError> {
    let store = Arc::clone(&self.store);
    let source = Arc::clone(&self.source);
    let gate = Arc::clone(&self.gate);
    let delay_ms = self.delay_ms;
    let reporter = ProgressReporter::new(on_progress);

    let work = async move { run_crawl(store, source, gate, query, delay_ms, reporter).await };

    spawn_run(Arc::clone(&self.gate), work, on_complete)
  }
}

async fn run_crawl(
  store: Arc<dyn RecordStore>,
  source: Arc<dyn PaperSource>,
  gate: Arc<SingleFlight>,
  query: CrawlQuery,
  delay_ms: u64,
  reporter: ProgressReporter,
) -> (RunOutcome, CrawlReport) {
  let mut report = CrawlReport::default();

  quill::info(&format!(
    "Fetching up to {} papers from {} for '{}'",
    query.max_results,
    source.name(),
    query.keywords
  ));

  let papers = match source.fetch(&query).await {
    Ok(papers) => papers,
    Err(e) => {
      quill::error(&format!("Paper fetch failed: {}", e));
      return (RunOutcome::Failed, report);
    }
  };
  report.fetched = papers.len();

  let mut seen_titles: HashSet<String> = match store.list_records(RecordKind::Paper) {
    Ok(records) => records.into_iter().map(|r| r.title).collect(),
    Err(e) => {
      quill::error(&format!("Could not read stored papers: {}", e));
      return (RunOutcome::Failed, report);
    }
  };

  let total = papers.len();
  if total == 0 {
    reporter.report(100);
    return (RunOutcome::Completed, report);
  }

  let mut outcome = RunOutcome::Completed;
  let mut accepted = Vec::new();

  for (index, paper) in papers.into_iter().enumerate() {
    if gate.is_cancelled() {
      outcome = RunOutcome::Cancelled;
      break;
    }

    // Exact title match against what storage already holds
    if seen_titles.contains(&paper.title) {
      report.skipped_duplicates += 1;
      quill::verbose(&format!("Already stored, skipping: {}", paper.title));
    } else {
      seen_titles.insert(paper.title.clone());
      accepted.push(paper);
    }

    reporter.report(((index + 1) * 100 / total) as u8);

    if delay_ms > 0 && index + 1 < total {
      tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
  }

  // Partial batches are valid; a cancelled run persists what it accepted
  for paper in accepted {
    let title = paper.title.clone();
    match store.upsert(RecordKind::Paper, paper) {
      Ok(_) => report.persisted += 1,
      Err(e) => quill::warn(&format!("Could not save paper '{}': {}", title, e)),
    }
  }

  (outcome, report)
}

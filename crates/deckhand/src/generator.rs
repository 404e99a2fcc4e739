use anyhow::{anyhow, Result};
use std::sync::Arc;

use crate::backend::{create_backend, GenerativeBackend};
use crate::pipeline::{
  spawn_run, PipelineError, ProgressFn, ProgressReporter, RunOutcome, SingleFlight,
};
use crate::prompt;
use crate::record::{ContentKind, Record, RecordKind};
use crate::retrieval::RetrievalGateway;
use crate::storage::RecordStore;

/// Delivery style for generated outputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Style {
  Academic,
  Accessible,
  Technical,
  Custom(String),
}

impl Style {
  /// The literal directive embedded in prompts
  pub fn directive(&self) -> &str {
    match self {
      Style::Academic => "academic: precise terminology, stay close to the paper's own claims",
      Style::Accessible => "accessible: plain language, everyday analogies, no jargon",
      Style::Technical => "technical deep dive: expert audience, keep the math and caveats",
      Style::Custom(description) => description,
    }
  }

  /// Parse a CLI-supplied style name; `custom` requires a description
  pub fn parse(value: &str, custom_description: Option<&str>) -> Result<Self> {
    match value.to_lowercase().as_str() {
      "academic" => Ok(Style::Academic),
      "accessible" => Ok(Style::Accessible),
      "technical" => Ok(Style::Technical),
      "custom" => custom_description
        .map(|d| Style::Custom(d.to_string()))
        .ok_or_else(|| anyhow!("Style 'custom' needs a description (--custom-style)")),
      other => Err(anyhow!(
        "Unknown style '{}' (expected academic, accessible, technical or custom)",
        other
      )),
    }
  }
}

/// What to produce for one paper
#[derive(Debug, Clone)]
pub struct GenerationRequest {
  /// Caller-supplied paper reference, used when no stored paper matches the
  /// title exactly
  pub paper_id: Option<String>,
  pub title: String,
  pub summary: String,
  pub generate_ppt: bool,
  pub generate_speech: bool,
  pub style: Style,
  /// Registry key resolved at start time
  pub backend: String,
  /// Sampling temperature in [0, 1]
  pub temperature: f32,
}

/// What a run produced. `None` means the output was not requested or was
/// dropped by cancellation; backend failures substitute labeled placeholders
/// instead of clearing the field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationResult {
  pub ppt: Option<String>,
  pub speech: Option<String>,
}

/// The generation orchestrator: retrieval context, one backend call per
/// requested output, history persistence. At most one run in flight per
/// instance; a second `start` is rejected with `Busy`.
pub struct Generator {
  store: Arc<dyn RecordStore>,
  gateway: Arc<RetrievalGateway>,
  gate: Arc<SingleFlight>,
}

impl Generator {
  pub fn new(store: Arc<dyn RecordStore>, gateway: Arc<RetrievalGateway>) -> Self {
    Self { store, gateway, gate: Arc::new(SingleFlight::new()) }
  }

  pub fn is_running(&self) -> bool {
    self.gate.is_running()
  }

  /// Request cooperative cancellation; the worker observes it between stages
  pub fn cancel(&self) {
    self.gate.cancel();
  }

  /// Resolve the requested backend and launch the run. Fails synchronously
  /// with `BackendError::Unsupported` for unknown names, a credential error
  /// for unconfigured ones, or `PipelineError::Busy` while a run is in
  /// flight.
  pub fn start(
    &self,
    request: GenerationRequest,
    on_progress: ProgressFn,
    on_complete: Box<dyn FnOnce(RunOutcome, GenerationResult) + Send>,
  ) -> Result<()> {
    let backend = create_backend(&request.backend)?;
    self.start_with_backend(request, backend, on_progress, on_complete).map_err(Into::into)
  }

  /// Same contract with an explicit backend; the injection point tests use
  pub fn start_with_backend(
    &self,
    request: GenerationRequest,
    backend: Arc<dyn GenerativeBackend>,
    on_progress: ProgressFn,
    on_complete: Box<dyn FnOnce(RunOutcome, GenerationResult) + Send>,
  ) -> Result<(), PipelineError> {
    let store = Arc::clone(&self.store);
    let gateway = Arc::clone(&self.gateway);
    let gate = Arc::clone(&self.gate);
    let reporter = ProgressReporter::new(on_progress);

    let work =
      async move { run_generation(store, gateway, gate, backend, request, reporter).await };

    spawn_run(Arc::clone(&self.gate), work, on_complete)
  }
}

struct RetrievalContext {
  ppt_methods: Vec<Record>,
  speech_methods: Vec<Record>,
  history: Vec<Record>,
}

impl RetrievalContext {
  /// Highest-ranked history exemplar of the same output kind, if any
  fn exemplar(&self, kind: ContentKind) -> Option<&Record> {
    self.history.iter().find(|r| r.content_type == Some(kind))
  }
}

async fn run_generation(
  store: Arc<dyn RecordStore>,
  gateway: Arc<RetrievalGateway>,
  gate: Arc<SingleFlight>,
  backend: Arc<dyn GenerativeBackend>,
  request: GenerationRequest,
  reporter: ProgressReporter,
) -> (RunOutcome, GenerationResult) {
  let mut result = GenerationResult::default();
  let query = format!("{}\n{}", request.title, request.summary);

  // Stage 1: retrieval context
  let context = match gather_context(&gateway, &request, &query) {
    Ok(context) => context,
    Err(e) => {
      quill::error(&format!("Retrieval failed, aborting run: {}", e));
      return (RunOutcome::Failed, result);
    }
  };
  reporter.report(10);

  if gate.is_cancelled() {
    return (RunOutcome::Cancelled, result);
  }

  // Stage 2: slide outline
  if request.generate_ppt {
    let prompt_text = prompt::outline_prompt(
      &request.title,
      &request.summary,
      &context.ppt_methods,
      context.exemplar(ContentKind::Ppt),
      request.style.directive(),
    );
    result.ppt =
      Some(complete_or_placeholder(&backend, &prompt_text, &request, ContentKind::Ppt).await);
  }
  reporter.report(60);

  if gate.is_cancelled() {
    return (RunOutcome::Cancelled, result);
  }

  // Stage 3: speech script
  if request.generate_speech {
    let prompt_text = prompt::script_prompt(
      &request.title,
      &request.summary,
      &context.speech_methods,
      context.exemplar(ContentKind::Speech),
      request.style.directive(),
    );
    result.speech =
      Some(complete_or_placeholder(&backend, &prompt_text, &request, ContentKind::Speech).await);
  }
  reporter.report(100);

  if gate.is_cancelled() {
    return (RunOutcome::Cancelled, result);
  }

  // Stage 4: persist outputs as history, always before the terminal callback
  persist_outputs(store.as_ref(), &request, &result);

  (RunOutcome::Completed, result)
}

fn gather_context(
  gateway: &RetrievalGateway,
  request: &GenerationRequest,
  query: &str,
) -> Result<RetrievalContext> {
  let ppt_methods = if request.generate_ppt {
    gateway.fetch_top(RecordKind::PptMethod, query, prompt::METHOD_EXEMPLAR_CAP)?
  } else {
    Vec::new()
  };

  let speech_methods = if request.generate_speech {
    gateway.fetch_top(RecordKind::SpeechMethod, query, prompt::METHOD_EXEMPLAR_CAP)?
  } else {
    Vec::new()
  };

  let history = gateway.fetch_top(RecordKind::History, query, 3)?;

  Ok(RetrievalContext { ppt_methods, speech_methods, history })
}

async fn complete_or_placeholder(
  backend: &Arc<dyn GenerativeBackend>,
  prompt_text: &str,
  request: &GenerationRequest,
  kind: ContentKind,
) -> String {
  match backend.complete(prompt_text, request.temperature).await {
    Ok(text) => text,
    Err(e) => {
      quill::warn(&format!(
        "{} backend failed for the {} output, substituting placeholder: {}",
        backend.name(),
        kind,
        e
      ));
      prompt::placeholder(kind, &request.title, backend.name())
    }
  }
}

fn persist_outputs(
  store: &dyn RecordStore,
  request: &GenerationRequest,
  result: &GenerationResult,
) {
  let paper_ref = resolve_paper_reference(store, request);

  let outputs = [(ContentKind::Ppt, &result.ppt), (ContentKind::Speech, &result.speech)];
  for (kind, output) in outputs {
    if let Some(content) = output {
      let title = format!("{} - {}", request.title, kind.label());
      let record = Record::history(&title, content, kind, paper_ref.clone());
      if let Err(e) = store.upsert(RecordKind::History, record) {
        quill::error(&format!("Failed to save {} history record: {}", kind, e));
      }
    }
  }
}

/// Exact title match wins; the caller-supplied id is the fallback. The
/// reference is weak either way, so lookup failures only cost the link.
fn resolve_paper_reference(store: &dyn RecordStore, request: &GenerationRequest) -> Option<String> {
  match store.get_by_title(RecordKind::Paper, &request.title) {
    Ok(Some(paper)) => Some(paper.id),
    Ok(None) => request.paper_id.clone(),
    Err(e) => {
      quill::warn(&format!("Paper lookup failed, keeping caller-supplied reference: {}", e));
      request.paper_id.clone()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::storage::MemoryStore;

  #[test]
  fn test_style_parse_fixed_names() {
    assert_eq!(Style::parse("academic", None).unwrap(), Style::Academic);
    assert_eq!(Style::parse("Accessible", None).unwrap(), Style::Accessible);
    assert_eq!(Style::parse("TECHNICAL", None).unwrap(), Style::Technical);
    assert!(Style::parse("breezy", None).is_err());
  }

  #[test]
  fn test_style_custom_requires_description() {
    assert!(Style::parse("custom", None).is_err());
    let style = Style::parse("custom", Some("pirate voice")).unwrap();
    assert_eq!(style.directive(), "pirate voice");
  }

  fn request_for(title: &str, paper_id: Option<String>) -> GenerationRequest {
    GenerationRequest {
      paper_id,
      title: title.to_string(),
      summary: "summary".to_string(),
      generate_ppt: true,
      generate_speech: true,
      style: Style::Academic,
      backend: "mock".to_string(),
      temperature: 0.7,
    }
  }

  #[test]
  fn test_paper_reference_prefers_exact_title_match() {
    let store = MemoryStore::new();
    let paper = Record::paper("Attention", "abs", "V. et al", "http://x", "arxiv", None);
    let stored_id = paper.id.clone();
    store.upsert(RecordKind::Paper, paper).unwrap();

    let request = request_for("Attention", Some("caller-id".to_string()));
    assert_eq!(resolve_paper_reference(&store, &request), Some(stored_id));
  }

  #[test]
  fn test_paper_reference_falls_back_to_caller_id() {
    let store = MemoryStore::new();
    let request = request_for("Unknown paper", Some("caller-id".to_string()));
    assert_eq!(resolve_paper_reference(&store, &request), Some("caller-id".to_string()));

    let detached = request_for("Unknown paper", None);
    assert_eq!(resolve_paper_reference(&store, &detached), None);
  }

  #[test]
  fn test_persist_outputs_writes_one_record_per_output() {
    let store = MemoryStore::new();
    let request = request_for("Attention", None);
    let result = GenerationResult {
      ppt: Some("outline text".to_string()),
      speech: Some("script text".to_string()),
    };

    persist_outputs(&store, &request, &result);

    let history = store.list_records(RecordKind::History).unwrap();
    assert_eq!(history.len(), 2);

    let titles: Vec<&str> = history.iter().map(|r| r.title.as_str()).collect();
    assert!(titles.contains(&"Attention - PPT"));
    assert!(titles.contains(&"Attention - Speech"));
  }

  #[test]
  fn test_persist_outputs_skips_absent_fields() {
    let store = MemoryStore::new();
    let request = request_for("Attention", None);
    let result = GenerationResult { ppt: Some("outline".to_string()), speech: None };

    persist_outputs(&store, &request, &result);

    let history = store.list_records(RecordKind::History).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].content_type, Some(ContentKind::Ppt));
  }
}

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The four record categories stored and embedded independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
  PptMethod,
  SpeechMethod,
  History,
  Paper,
}

impl RecordKind {
  pub const ALL: [RecordKind; 4] =
    [RecordKind::PptMethod, RecordKind::SpeechMethod, RecordKind::History, RecordKind::Paper];

  /// Stable name used in file names and CLI arguments
  pub fn as_str(&self) -> &'static str {
    match self {
      RecordKind::PptMethod => "ppt_methods",
      RecordKind::SpeechMethod => "speech_methods",
      RecordKind::History => "history_contents",
      RecordKind::Paper => "papers",
    }
  }

  /// Parse a CLI-supplied kind name (long form or short alias)
  pub fn parse(value: &str) -> Result<Self> {
    match value.to_lowercase().as_str() {
      "ppt_methods" | "ppt-methods" | "ppt" => Ok(RecordKind::PptMethod),
      "speech_methods" | "speech-methods" | "speech" => Ok(RecordKind::SpeechMethod),
      "history_contents" | "history-contents" | "history" => Ok(RecordKind::History),
      "papers" | "paper" => Ok(RecordKind::Paper),
      other => Err(anyhow!(
        "Unknown record kind '{}' (expected ppt_methods, speech_methods, history_contents or papers)",
        other
      )),
    }
  }
}

impl std::fmt::Display for RecordKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Which derivative output a history record holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentKind {
  #[serde(rename = "PPT")]
  Ppt,
  #[serde(rename = "Speech")]
  Speech,
}

impl ContentKind {
  /// Human-facing tag, also the on-disk representation
  pub fn label(&self) -> &'static str {
    match self {
      ContentKind::Ppt => "PPT",
      ContentKind::Speech => "Speech",
    }
  }

  /// The method partition that informs this kind of output
  pub fn method_kind(&self) -> RecordKind {
    match self {
      ContentKind::Ppt => RecordKind::PptMethod,
      ContentKind::Speech => RecordKind::SpeechMethod,
    }
  }
}

impl std::fmt::Display for ContentKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.label())
  }
}

/// One stored record. A single struct covers all four kinds; the optional
/// fields only carry data for the kinds that use them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
  pub id: String,
  pub title: String,
  /// Method or history body; the abstract for papers
  pub content: String,

  // History-only fields
  #[serde(skip_serializing_if = "Option::is_none")]
  pub content_type: Option<ContentKind>,
  /// Weak reference to the originating paper; the paper may be gone
  #[serde(skip_serializing_if = "Option::is_none")]
  pub paper_id: Option<String>,

  // Paper-only fields
  #[serde(skip_serializing_if = "Option::is_none")]
  pub authors: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub url: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub source: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub published_at: Option<DateTime<Utc>>,

  pub created_at: DateTime<Utc>,
}

impl Record {
  pub fn new(title: &str, content: &str) -> Self {
    Self {
      id: Uuid::new_v4().to_string(),
      title: title.to_string(),
      content: content.to_string(),
      content_type: None,
      paper_id: None,
      authors: None,
      url: None,
      source: None,
      published_at: None,
      created_at: Utc::now(),
    }
  }

  /// Create a history record carrying a generated output
  pub fn history(
    title: &str,
    content: &str,
    content_type: ContentKind,
    paper_id: Option<String>,
  ) -> Self {
    Self { content_type: Some(content_type), paper_id, ..Self::new(title, content) }
  }

  /// Create a paper record; `content` holds the abstract
  pub fn paper(
    title: &str,
    summary: &str,
    authors: &str,
    url: &str,
    source: &str,
    published_at: Option<DateTime<Utc>>,
  ) -> Self {
    Self {
      authors: Some(authors.to_string()),
      url: Some(url.to_string()),
      source: Some(source.to_string()),
      published_at,
      ..Self::new(title, summary)
    }
  }

  /// The text handed to the embedding backend
  pub fn embedding_text(&self) -> String {
    format!("{}\n{}", self.title, self.content)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_kind_parse_accepts_aliases() {
    assert_eq!(RecordKind::parse("ppt").unwrap(), RecordKind::PptMethod);
    assert_eq!(RecordKind::parse("speech_methods").unwrap(), RecordKind::SpeechMethod);
    assert_eq!(RecordKind::parse("HISTORY").unwrap(), RecordKind::History);
    assert_eq!(RecordKind::parse("paper").unwrap(), RecordKind::Paper);
    assert!(RecordKind::parse("notes").is_err());
  }

  #[test]
  fn test_kind_round_trips_through_as_str() {
    for kind in RecordKind::ALL {
      assert_eq!(RecordKind::parse(kind.as_str()).unwrap(), kind);
    }
  }

  #[test]
  fn test_content_kind_serializes_as_label() {
    let json = serde_json::to_string(&ContentKind::Ppt).unwrap();
    assert_eq!(json, "\"PPT\"");
    let parsed: ContentKind = serde_json::from_str("\"Speech\"").unwrap();
    assert_eq!(parsed, ContentKind::Speech);
  }

  #[test]
  fn test_method_record_skips_unused_fields() {
    let record = Record::new("Problem-first deck", "Open with the pain point");
    let json = serde_json::to_string(&record).unwrap();
    assert!(!json.contains("content_type"));
    assert!(!json.contains("paper_id"));
    assert!(!json.contains("authors"));
  }

  #[test]
  fn test_history_record_keeps_weak_paper_reference() {
    let record =
      Record::history("Attention - PPT", "Slide 1 ...", ContentKind::Ppt, Some("p-1".into()));
    assert_eq!(record.content_type, Some(ContentKind::Ppt));
    assert_eq!(record.paper_id.as_deref(), Some("p-1"));

    let detached = Record::history("Attention - PPT", "Slide 1 ...", ContentKind::Ppt, None);
    assert!(detached.paper_id.is_none());
  }

  #[test]
  fn test_embedding_text_joins_title_and_content() {
    let record = Record::new("Attention Is All You Need", "We propose the Transformer");
    assert_eq!(record.embedding_text(), "Attention Is All You Need\nWe propose the Transformer");
  }
}

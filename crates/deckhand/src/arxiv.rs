//! Remote paper source over the arXiv Atom API.

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, Mutex};

use crate::record::Record;

const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";

/// What to ask a remote source for
#[derive(Debug, Clone)]
pub struct CrawlQuery {
  /// Free-text keywords, whitespace separated
  pub keywords: String,
  pub max_results: usize,
  /// Restrict to papers submitted within the last N days
  pub days_back: Option<i64>,
}

/// A remote catalog of papers the crawler can pull from
#[async_trait::async_trait]
pub trait PaperSource: Send + Sync {
  fn name(&self) -> &str;

  /// Fetch up to `max_results` papers matching the query, newest first
  async fn fetch(&self, query: &CrawlQuery) -> Result<Vec<Record>>;
}

/// Resolve a source by name
pub fn create_source(name: &str) -> Result<Arc<dyn PaperSource>> {
  match name.to_lowercase().as_str() {
    "arxiv" => Ok(Arc::new(ArxivSource::new())),
    other => Err(anyhow!("Unsupported paper source: {}", other)),
  }
}

/// arXiv's Atom query endpoint
pub struct ArxivSource {
  client: reqwest::Client,
}

impl ArxivSource {
  pub fn new() -> Self {
    Self { client: reqwest::Client::new() }
  }
}

impl Default for ArxivSource {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait::async_trait]
impl PaperSource for ArxivSource {
  fn name(&self) -> &str {
    "arxiv"
  }

  async fn fetch(&self, query: &CrawlQuery) -> Result<Vec<Record>> {
    let search_query = build_query(&query.keywords, query.days_back);
    let max_results = query.max_results.to_string();

    let response = self
      .client
      .get(ARXIV_API_URL)
      .query(&[
        ("search_query", search_query.as_str()),
        ("start", "0"),
        ("max_results", max_results.as_str()),
        ("sortBy", "submittedDate"),
        ("sortOrder", "descending"),
      ])
      .send()
      .await?;

    if !response.status().is_success() {
      bail!("arXiv API request failed with status: {}", response.status());
    }

    let body = response.text().await?;
    parse_feed(&body)
  }
}

/// Build the arXiv search expression: every keyword against the `all:` field,
/// OR-joined, optionally wrapped with a submission-date window.
pub fn build_query(keywords: &str, days_back: Option<i64>) -> String {
  let terms = keywords
    .split_whitespace()
    .map(|word| format!("all:{word}"))
    .collect::<Vec<_>>()
    .join(" OR ");

  match days_back {
    Some(days) => {
      let end = Utc::now();
      let start = end - Duration::days(days);
      format!(
        "({}) AND submittedDate:[{} TO {}]",
        terms,
        start.format("%Y%m%d000000"),
        end.format("%Y%m%d235959")
      )
    }
    None => terms,
  }
}

#[derive(Debug, Deserialize)]
struct Feed {
  #[serde(rename = "entry", default)]
  entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
  id: String,
  title: String,
  summary: String,
  published: String,
  #[serde(rename = "author", default)]
  authors: Vec<Author>,
  #[serde(rename = "link", default)]
  links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct Author {
  name: String,
}

#[derive(Debug, Deserialize)]
struct Link {
  #[serde(rename = "@href")]
  href: String,
  #[serde(rename = "@title")]
  title: Option<String>,
}

fn parse_feed(xml: &str) -> Result<Vec<Record>> {
  let feed: Feed =
    quick_xml::de::from_str(xml).map_err(|e| anyhow!("Failed to parse arXiv feed: {}", e))?;
  Ok(feed.entries.into_iter().map(record_from_entry).collect())
}

fn record_from_entry(entry: Entry) -> Record {
  let title = collapse_whitespace(&entry.title);
  let summary = collapse_whitespace(&entry.summary);
  let authors =
    entry.authors.iter().map(|a| a.name.trim().to_string()).collect::<Vec<_>>().join(", ");

  // Prefer the link arXiv labels as the pdf; fall back to the first link,
  // then the entry's own id (the abstract page)
  let url = entry
    .links
    .iter()
    .find(|link| link.title.as_deref() == Some("pdf"))
    .or_else(|| entry.links.first())
    .map(|link| link.href.clone())
    .unwrap_or(entry.id);

  let published =
    DateTime::parse_from_rfc3339(entry.published.trim()).map(|dt| dt.with_timezone(&Utc)).ok();

  Record::paper(&title, &summary, &authors, &url, "arxiv", published)
}

/// arXiv wraps titles and abstracts across lines; collapse runs of
/// whitespace to single spaces
fn collapse_whitespace(text: &str) -> String {
  if let Ok(ws) = Regex::new(r"\s+") {
    ws.replace_all(text.trim(), " ").into_owned()
  } else {
    text.trim().to_string()
  }
}

/// Canned source for tests: fixed records, optional failure, recorded queries
pub struct MockSource {
  records: Vec<Record>,
  fail: bool,
  queries: Mutex<Vec<CrawlQuery>>,
}

impl MockSource {
  pub fn new(records: Vec<Record>) -> Self {
    Self { records, fail: false, queries: Mutex::new(Vec::new()) }
  }

  pub fn with_failure() -> Self {
    Self { records: Vec::new(), fail: true, queries: Mutex::new(Vec::new()) }
  }

  pub fn recorded_queries(&self) -> Vec<CrawlQuery> {
    self.queries.lock().map(|q| q.clone()).unwrap_or_default()
  }
}

#[async_trait::async_trait]
impl PaperSource for MockSource {
  fn name(&self) -> &str {
    "mock"
  }

  async fn fetch(&self, query: &CrawlQuery) -> Result<Vec<Record>> {
    if let Ok(mut queries) = self.queries.lock() {
      queries.push(query.clone());
    }
    if self.fail {
      bail!("Mock source failure");
    }
    Ok(self.records.clone())
  }
}

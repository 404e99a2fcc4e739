use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::config;
use crate::embedder::TextEmbedder;
use crate::record::{ContentKind, RecordKind};
use crate::similarity::cosine_similarity;
use crate::storage::RecordStore;

/// One cached embedding plus the snapshots a search result can show without a
/// storage round trip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingEntry {
  pub title: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub content_type: Option<ContentKind>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub paper_id: Option<String>,
  pub embedding: Vec<f32>,
}

/// Derived per-kind cache, keyed by record id. Safe to discard and rebuild
/// from the record store at any time.
pub type Partition = BTreeMap<String, EmbeddingEntry>;

/// A ranked search hit
#[derive(Debug, Clone)]
pub struct SearchHit {
  pub id: String,
  pub title: String,
  pub score: f32,
}

/// On-disk location of one partition file
pub fn partition_path(kind: RecordKind) -> Result<PathBuf> {
  Ok(config::embeddings_dir()?.join(format!("{}_embeddings.json", kind.as_str())))
}

/// Four independent embedding partitions, loaded once at construction and
/// fully replaced by `refresh`. Searches are served from memory; the files
/// exist so the next process start does not have to re-embed everything.
pub struct EmbeddingStore {
  store: Arc<dyn RecordStore>,
  embedder: Arc<dyn TextEmbedder>,
  partitions: RwLock<HashMap<RecordKind, Partition>>,
}

impl EmbeddingStore {
  /// Read all four partitions from disk. Missing or unreadable files become
  /// empty partitions; construction itself never fails on cache state.
  pub fn load(store: Arc<dyn RecordStore>, embedder: Arc<dyn TextEmbedder>) -> Self {
    let mut partitions = HashMap::new();
    for kind in RecordKind::ALL {
      partitions.insert(kind, read_partition(kind));
    }

    Self { store, embedder, partitions: RwLock::new(partitions) }
  }

  /// Re-embed every record of `kind` and atomically replace its partition,
  /// on disk first (temp file + rename), then in memory. Records the backend
  /// cannot embed are skipped with a warning. On any error the previously
  /// loaded partition stays authoritative.
  pub fn refresh(&self, kind: RecordKind) -> Result<usize> {
    let records = self.store.list_records(kind)?;

    let mut partition = Partition::new();
    for record in &records {
      match self.embedder.embed(&record.embedding_text()) {
        Ok(embedding) => {
          partition.insert(
            record.id.clone(),
            EmbeddingEntry {
              title: record.title.clone(),
              content_type: record.content_type,
              paper_id: record.paper_id.clone(),
              embedding,
            },
          );
        }
        Err(e) => {
          quill::warn(&format!("Skipping '{}' in {} partition: {}", record.title, kind, e));
        }
      }
    }

    write_partition(kind, &partition)?;

    let count = partition.len();
    self
      .partitions
      .write()
      .map_err(|_| anyhow!("Partition lock poisoned"))?
      .insert(kind, partition);

    Ok(count)
  }

  /// Refresh all four kinds; one kind failing does not stop the others
  pub fn refresh_all(&self) -> Vec<(RecordKind, Result<usize>)> {
    RecordKind::ALL.iter().map(|&kind| (kind, self.refresh(kind))).collect()
  }

  /// Rank every entry of `kind` against `query` by cosine similarity and
  /// return the best `top_k`. Exact score ties order by ascending id so
  /// repeated searches are reproducible.
  pub fn search(&self, kind: RecordKind, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
    let partitions = self.partitions.read().map_err(|_| anyhow!("Partition lock poisoned"))?;
    let partition = match partitions.get(&kind) {
      Some(p) if !p.is_empty() => p,
      _ => return Ok(Vec::new()),
    };

    let query_embedding = self.embedder.embed(query)?;

    let mut hits: Vec<SearchHit> = partition
      .iter()
      .map(|(id, entry)| SearchHit {
        id: id.clone(),
        title: entry.title.clone(),
        score: cosine_similarity(&query_embedding, &entry.embedding),
      })
      .collect();

    hits.sort_by(|a, b| {
      b.score
        .partial_cmp(&a.score)
        .unwrap_or(std::cmp::Ordering::Equal)
        .then_with(|| a.id.cmp(&b.id))
    });
    hits.truncate(top_k);

    Ok(hits)
  }
}

fn read_partition(kind: RecordKind) -> Partition {
  let path = match partition_path(kind) {
    Ok(path) => path,
    Err(_) => return Partition::new(),
  };

  if !path.exists() {
    return Partition::new();
  }

  let content = match fs::read_to_string(&path) {
    Ok(content) => content,
    Err(e) => {
      quill::warn(&format!("Cannot read partition {}, starting empty: {}", path.display(), e));
      return Partition::new();
    }
  };

  match serde_json::from_str(&content) {
    Ok(partition) => partition,
    Err(e) => {
      quill::warn(&format!("Partition {} is corrupt, starting empty: {}", path.display(), e));
      Partition::new()
    }
  }
}

fn write_partition(kind: RecordKind, partition: &Partition) -> Result<()> {
  let path = partition_path(kind)?;
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent)?;
  }

  let content = serde_json::to_string_pretty(partition)?;

  // Swap in atomically so an interrupted write cannot corrupt the partition
  let temp_path = path.with_extension("json.tmp");
  fs::write(&temp_path, content)
    .with_context(|| format!("Failed to write {}", temp_path.display()))?;
  fs::rename(&temp_path, &path)
    .with_context(|| format!("Failed to replace {}", path.display()))?;

  Ok(())
}

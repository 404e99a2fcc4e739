use anyhow::Result;
use std::sync::Arc;

use crate::embeddings::EmbeddingStore;
use crate::record::{Record, RecordKind};
use crate::storage::RecordStore;

/// Joins ranked search hits back to full records. The embedding partitions
/// are caches and can trail the record store, so ids that no longer resolve
/// are silently dropped while rank order is kept for the rest.
pub struct RetrievalGateway {
  store: Arc<dyn RecordStore>,
  embeddings: Arc<EmbeddingStore>,
}

impl RetrievalGateway {
  pub fn new(store: Arc<dyn RecordStore>, embeddings: Arc<EmbeddingStore>) -> Self {
    Self { store, embeddings }
  }

  pub fn fetch_top(&self, kind: RecordKind, query: &str, top_k: usize) -> Result<Vec<Record>> {
    let hits = self.embeddings.search(kind, query, top_k)?;

    let mut records = Vec::with_capacity(hits.len());
    for hit in hits {
      if let Some(record) = self.store.get_by_id(kind, &hit.id)? {
        records.push(record);
      }
    }

    Ok(records)
  }
}

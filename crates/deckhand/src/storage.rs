use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::config;
use crate::record::{Record, RecordKind};

/// Storage collaborator consumed by the embedding store and the orchestrators.
/// Operations are synchronous and expected to be locally fast.
pub trait RecordStore: Send + Sync {
  fn list_records(&self, kind: RecordKind) -> Result<Vec<Record>>;
  fn get_by_id(&self, kind: RecordKind, id: &str) -> Result<Option<Record>>;
  fn get_by_title(&self, kind: RecordKind, title: &str) -> Result<Option<Record>>;
  fn upsert(&self, kind: RecordKind, record: Record) -> Result<Record>;
  fn delete(&self, kind: RecordKind, id: &str) -> Result<bool>;
}

/// File-backed record store: one pretty-printed JSON document per kind under
/// the data root. The documents are authoritative, unlike the embedding
/// partitions derived from them, so an unreadable document is an error here
/// rather than an empty result.
pub struct FileStore;

impl FileStore {
  pub fn new() -> Self {
    Self
  }

  fn document_path(kind: RecordKind) -> Result<PathBuf> {
    Ok(config::records_dir()?.join(format!("{}.json", kind.as_str())))
  }

  fn read_document(kind: RecordKind) -> Result<BTreeMap<String, Record>> {
    let path = Self::document_path(kind)?;
    if !path.exists() {
      return Ok(BTreeMap::new());
    }

    let content = fs::read_to_string(&path)
      .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
      .map_err(|e| anyhow!("Record document {} is not valid JSON: {}", path.display(), e))
  }

  fn write_document(kind: RecordKind, records: &BTreeMap<String, Record>) -> Result<()> {
    let path = Self::document_path(kind)?;
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(records)?;
    fs::write(&path, content)
      .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
  }
}

impl Default for FileStore {
  fn default() -> Self {
    Self::new()
  }
}

impl RecordStore for FileStore {
  fn list_records(&self, kind: RecordKind) -> Result<Vec<Record>> {
    Ok(Self::read_document(kind)?.into_values().collect())
  }

  fn get_by_id(&self, kind: RecordKind, id: &str) -> Result<Option<Record>> {
    Ok(Self::read_document(kind)?.remove(id))
  }

  fn get_by_title(&self, kind: RecordKind, title: &str) -> Result<Option<Record>> {
    Ok(Self::read_document(kind)?.into_values().find(|r| r.title == title))
  }

  fn upsert(&self, kind: RecordKind, record: Record) -> Result<Record> {
    if record.id.is_empty() {
      return Err(anyhow!("Cannot store a record without an id"));
    }

    let mut records = Self::read_document(kind)?;
    records.insert(record.id.clone(), record.clone());
    Self::write_document(kind, &records)?;
    Ok(record)
  }

  fn delete(&self, kind: RecordKind, id: &str) -> Result<bool> {
    let mut records = Self::read_document(kind)?;
    let removed = records.remove(id).is_some();
    if removed {
      Self::write_document(kind, &records)?;
    }
    Ok(removed)
  }
}

/// In-memory record store for tests and dry runs
pub struct MemoryStore {
  records: Mutex<BTreeMap<RecordKind, BTreeMap<String, Record>>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self { records: Mutex::new(BTreeMap::new()) }
  }
}

impl Default for MemoryStore {
  fn default() -> Self {
    Self::new()
  }
}

impl RecordStore for MemoryStore {
  fn list_records(&self, kind: RecordKind) -> Result<Vec<Record>> {
    let records = self.records.lock().map_err(|_| anyhow!("Record store lock poisoned"))?;
    Ok(records.get(&kind).map(|m| m.values().cloned().collect()).unwrap_or_default())
  }

  fn get_by_id(&self, kind: RecordKind, id: &str) -> Result<Option<Record>> {
    let records = self.records.lock().map_err(|_| anyhow!("Record store lock poisoned"))?;
    Ok(records.get(&kind).and_then(|m| m.get(id).cloned()))
  }

  fn get_by_title(&self, kind: RecordKind, title: &str) -> Result<Option<Record>> {
    let records = self.records.lock().map_err(|_| anyhow!("Record store lock poisoned"))?;
    Ok(records.get(&kind).and_then(|m| m.values().find(|r| r.title == title).cloned()))
  }

  fn upsert(&self, kind: RecordKind, record: Record) -> Result<Record> {
    if record.id.is_empty() {
      return Err(anyhow!("Cannot store a record without an id"));
    }

    let mut records = self.records.lock().map_err(|_| anyhow!("Record store lock poisoned"))?;
    records.entry(kind).or_default().insert(record.id.clone(), record.clone());
    Ok(record)
  }

  fn delete(&self, kind: RecordKind, id: &str) -> Result<bool> {
    let mut records = self.records.lock().map_err(|_| anyhow!("Record store lock poisoned"))?;
    Ok(records.get_mut(&kind).map(|m| m.remove(id).is_some()).unwrap_or(false))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_memory_store_round_trip() {
    let store = MemoryStore::new();
    let record = Record::new("Three-act deck", "Setup, tension, resolution");
    let id = record.id.clone();

    store.upsert(RecordKind::PptMethod, record).unwrap();

    let fetched = store.get_by_id(RecordKind::PptMethod, &id).unwrap().unwrap();
    assert_eq!(fetched.title, "Three-act deck");

    let by_title = store.get_by_title(RecordKind::PptMethod, "Three-act deck").unwrap();
    assert!(by_title.is_some());

    assert!(store.delete(RecordKind::PptMethod, &id).unwrap());
    assert!(!store.delete(RecordKind::PptMethod, &id).unwrap());
    assert!(store.get_by_id(RecordKind::PptMethod, &id).unwrap().is_none());
  }

  #[test]
  fn test_memory_store_kinds_are_isolated() {
    let store = MemoryStore::new();
    store.upsert(RecordKind::PptMethod, Record::new("A", "a")).unwrap();

    assert_eq!(store.list_records(RecordKind::PptMethod).unwrap().len(), 1);
    assert!(store.list_records(RecordKind::SpeechMethod).unwrap().is_empty());
  }

  #[test]
  fn test_upsert_replaces_by_id() {
    let store = MemoryStore::new();
    let mut record = Record::new("Hook first", "Open with a question");
    let id = record.id.clone();
    store.upsert(RecordKind::SpeechMethod, record.clone()).unwrap();

    record.content = "Open with a story".to_string();
    store.upsert(RecordKind::SpeechMethod, record).unwrap();

    let records = store.list_records(RecordKind::SpeechMethod).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, id);
    assert_eq!(records[0].content, "Open with a story");
  }

  #[test]
  fn test_empty_id_is_rejected() {
    let store = MemoryStore::new();
    let mut record = Record::new("x", "y");
    record.id.clear();
    assert!(store.upsert(RecordKind::Paper, record).is_err());
  }
}

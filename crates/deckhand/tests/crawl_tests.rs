use deckhand::arxiv::{CrawlQuery, MockSource};
use deckhand::crawler::Crawler;
use deckhand::pipeline::{PipelineError, ProgressFn, RunOutcome};
use deckhand::record::{Record, RecordKind};
use deckhand::storage::{MemoryStore, RecordStore};
use std::sync::{Arc, Mutex};

fn paper(title: &str) -> Record {
  Record::paper(title, "abstract", "Author", "http://arxiv.org/pdf/0000.00000v1", "arxiv", None)
}

fn query() -> CrawlQuery {
  CrawlQuery { keywords: "sparse attention".to_string(), max_results: 25, days_back: Some(7) }
}

fn no_progress() -> ProgressFn {
  Arc::new(|_| {})
}

#[tokio::test]
async fn test_crawl_persists_fetched_papers() {
  let store = Arc::new(MemoryStore::new());
  let source = Arc::new(MockSource::new(vec![paper("One"), paper("Two"), paper("Three")]));
  let crawler = Crawler::new(store.clone(), source).with_delay_ms(0);

  let delivered = Arc::new(Mutex::new(Vec::new()));
  let sink = Arc::clone(&delivered);
  let on_progress: ProgressFn = Arc::new(move |p| sink.lock().unwrap().push(p));

  let (tx, rx) = tokio::sync::oneshot::channel();
  crawler
    .start(
      query(),
      on_progress,
      Box::new(move |outcome, report| {
        let _ = tx.send((outcome, report));
      }),
    )
    .unwrap();
  let (outcome, report) = rx.await.unwrap();

  assert_eq!(outcome, RunOutcome::Completed);
  assert_eq!(report.fetched, 3);
  assert_eq!(report.persisted, 3);
  assert_eq!(report.skipped_duplicates, 0);
  assert_eq!(store.list_records(RecordKind::Paper).unwrap().len(), 3);

  // One progress step per entry, ending at 100
  assert_eq!(*delivered.lock().unwrap(), vec![33, 66, 100]);
}

#[tokio::test]
async fn test_crawl_skips_titles_already_stored() {
  let store = Arc::new(MemoryStore::new());
  store.upsert(RecordKind::Paper, paper("Already Here")).unwrap();

  let source = Arc::new(MockSource::new(vec![paper("Already Here"), paper("Brand New")]));
  let crawler = Crawler::new(store.clone(), source).with_delay_ms(0);

  let (tx, rx) = tokio::sync::oneshot::channel();
  crawler
    .start(
      query(),
      no_progress(),
      Box::new(move |outcome, report| {
        let _ = tx.send((outcome, report));
      }),
    )
    .unwrap();
  let (outcome, report) = rx.await.unwrap();

  assert_eq!(outcome, RunOutcome::Completed);
  assert_eq!(report.fetched, 2);
  assert_eq!(report.persisted, 1);
  assert_eq!(report.skipped_duplicates, 1);
  assert_eq!(store.list_records(RecordKind::Paper).unwrap().len(), 2);
}

#[tokio::test]
async fn test_duplicates_within_one_batch_are_collapsed() {
  let store = Arc::new(MemoryStore::new());
  let source = Arc::new(MockSource::new(vec![paper("Same Title"), paper("Same Title")]));
  let crawler = Crawler::new(store.clone(), source).with_delay_ms(0);

  let (tx, rx) = tokio::sync::oneshot::channel();
  crawler
    .start(
      query(),
      no_progress(),
      Box::new(move |outcome, report| {
        let _ = tx.send((outcome, report));
      }),
    )
    .unwrap();
  let (_, report) = rx.await.unwrap();

  assert_eq!(report.persisted, 1);
  assert_eq!(report.skipped_duplicates, 1);
  assert_eq!(store.list_records(RecordKind::Paper).unwrap().len(), 1);
}

#[tokio::test]
async fn test_cancel_keeps_the_partial_batch() {
  let store = Arc::new(MemoryStore::new());
  let source = Arc::new(MockSource::new(vec![paper("One"), paper("Two"), paper("Three")]));
  let crawler = Arc::new(Crawler::new(store.clone(), source).with_delay_ms(0));

  // Cancel right after the first entry reports; observed at the next boundary
  let handle = Arc::clone(&crawler);
  let on_progress: ProgressFn = Arc::new(move |percent| {
    if percent == 33 {
      handle.cancel();
    }
  });

  let (tx, rx) = tokio::sync::oneshot::channel();
  crawler
    .start(
      query(),
      on_progress,
      Box::new(move |outcome, report| {
        let _ = tx.send((outcome, report));
      }),
    )
    .unwrap();
  let (outcome, report) = rx.await.unwrap();

  assert_eq!(outcome, RunOutcome::Cancelled);
  assert_eq!(report.fetched, 3);
  assert_eq!(report.persisted, 1);

  let kept = store.list_records(RecordKind::Paper).unwrap();
  assert_eq!(kept.len(), 1);
  assert_eq!(kept[0].title, "One");
}

#[tokio::test]
async fn test_second_start_is_rejected_while_running() {
  let store = Arc::new(MemoryStore::new());
  let source = Arc::new(MockSource::new(vec![paper("One"), paper("Two")]));
  let crawler = Crawler::new(store.clone(), source).with_delay_ms(50);

  let (tx, rx) = tokio::sync::oneshot::channel();
  crawler
    .start(
      query(),
      no_progress(),
      Box::new(move |outcome, report| {
        let _ = tx.send((outcome, report));
      }),
    )
    .unwrap();

  let rejected = crawler.start(query(), no_progress(), Box::new(|_, _| {}));
  assert_eq!(rejected.unwrap_err(), PipelineError::Busy);
  assert!(crawler.is_running());

  let (outcome, report) = rx.await.unwrap();
  assert_eq!(outcome, RunOutcome::Completed);
  assert_eq!(report.persisted, 2);

  // The gate reopens after completion
  let (tx2, rx2) = tokio::sync::oneshot::channel();
  crawler
    .start(
      query(),
      no_progress(),
      Box::new(move |outcome, report| {
        let _ = tx2.send((outcome, report));
      }),
    )
    .unwrap();
  let (outcome, _) = rx2.await.unwrap();
  assert_eq!(outcome, RunOutcome::Completed);
}

#[tokio::test]
async fn test_source_receives_the_caller_query() {
  let store = Arc::new(MemoryStore::new());
  let source = Arc::new(MockSource::new(Vec::new()));
  let source_handle = Arc::clone(&source);
  let crawler = Crawler::new(store.clone(), source).with_delay_ms(0);

  let (tx, rx) = tokio::sync::oneshot::channel();
  crawler
    .start(
      query(),
      no_progress(),
      Box::new(move |outcome, report| {
        let _ = tx.send((outcome, report));
      }),
    )
    .unwrap();
  rx.await.unwrap();

  let queries = source_handle.recorded_queries();
  assert_eq!(queries.len(), 1);
  assert_eq!(queries[0].keywords, "sparse attention");
  assert_eq!(queries[0].max_results, 25);
  assert_eq!(queries[0].days_back, Some(7));
}

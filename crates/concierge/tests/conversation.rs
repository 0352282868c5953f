mod common;

use std::sync::Arc;

use common::{
  ingestor, keyword_store, orchestrator, temp_query_log, FailingEmbedder, FailingQueryLog,
  FakeAssistant, FakeFileStore, Reply,
};
use concierge::config::RetrievalConfig;
use concierge::conversation::QueryRequest;
use concierge::error::ConversationError;
use concierge::ingest::IngestRequest;
use concierge::models::{RunStatus, SourceKind};
use concierge::query_log::QueryLog;
use concierge::vector_store::{MemoryVectorBackend, VectorStore};

fn ask(query: &str) -> QueryRequest {
  QueryRequest { query: query.to_string(), thread_id: None, user_id: Some("resident_7".into()) }
}

fn pool_document() -> IngestRequest {
  IngestRequest {
    file_bytes: "Pool is open 6am–10pm".as_bytes().to_vec(),
    filename: "pool.txt".to_string(),
    title: "Pool Hours".to_string(),
    description: "Summer season".to_string(),
    category: "Amenities".to_string(),
    document_id: Some("pool".to_string()),
  }
}

fn loose_retrieval() -> RetrievalConfig {
  RetrievalConfig { threshold: 0.5, ..Default::default() }
}

#[tokio::test]
async fn test_end_to_end_pool_hours() {
  let store = keyword_store();
  let files = Arc::new(FakeFileStore::new());
  let assistant =
    Arc::new(FakeAssistant::completing(Reply::FileSearch).with_files(files.clone()));
  let (_dir, log) = temp_query_log();

  let ingested = ingestor(&store, &files, None).ingest(pool_document()).await.unwrap();
  assert!(ingested.searchable);

  let conversation = orchestrator(&store, &files, &assistant, log.clone(), loose_retrieval());
  let answer = conversation.answer(ask("What are the pool hours?")).await.unwrap();

  assert!(answer.vector_context_used);
  assert_eq!(answer.vector_source_count, 1);
  assert!(answer.answer.contains('6') && answer.answer.contains("10"));

  let vector_source = &answer.sources[0];
  assert_eq!(vector_source.kind, SourceKind::VectorDocument);
  assert_eq!(vector_source.id, ingested.vector_document_id);
  assert!(vector_source.similarity.unwrap() > 0.5);

  // The uploaded original file is attached and reported as a source
  assert_eq!(answer.attached_file_count, 1);
  assert!(answer.sources.iter().any(|s| s.id == "openai_file_file-1"));
  assert_eq!(assistant.last_attachments(), vec!["file-1".to_string()]);

  let prompt = &assistant.prompts(&answer.thread_id)[0];
  assert!(prompt.starts_with("Based on the following relevant information:"));
  assert!(prompt.contains("[1] Pool Hours (Category: Amenities)"));
  assert!(prompt.contains("Please answer: What are the pool hours?"));

  let history = log.history(10, Some("resident_7")).await.unwrap();
  assert_eq!(history.len(), 1);
  assert_eq!(history[0].answer, answer.answer);
  assert_eq!(history[0].thread_id.as_deref(), Some(answer.thread_id.as_str()));
}

#[tokio::test]
async fn test_expired_run_is_reported_with_its_status() {
  let store = keyword_store();
  let files = Arc::new(FakeFileStore::new());
  let assistant =
    Arc::new(FakeAssistant::new(&[RunStatus::Queued, RunStatus::Expired], Reply::Echo));
  let (_dir, log) = temp_query_log();

  let err = orchestrator(&store, &files, &assistant, log.clone(), RetrievalConfig::default())
    .answer(ask("Where do I park?"))
    .await
    .unwrap_err();

  match err {
    ConversationError::RunFailed { status, last_error } => {
      assert_eq!(status, RunStatus::Expired);
      assert!(last_error.is_some());
    }
    other => panic!("expected RunFailed, got {other:?}"),
  }
  assert!(log.history(10, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cancelled_and_incomplete_runs_fail() {
  for terminal in [RunStatus::Cancelled, RunStatus::Incomplete, RunStatus::Failed] {
    let store = keyword_store();
    let files = Arc::new(FakeFileStore::new());
    let assistant = Arc::new(FakeAssistant::new(&[terminal], Reply::Echo));
    let (_dir, log) = temp_query_log();

    let err = orchestrator(&store, &files, &assistant, log, RetrievalConfig::default())
      .answer(ask("Gym hours?"))
      .await
      .unwrap_err();
    assert!(matches!(err, ConversationError::RunFailed { status, .. } if status == terminal));
  }
}

#[tokio::test]
async fn test_run_that_never_finishes_times_out() {
  let store = keyword_store();
  let files = Arc::new(FakeFileStore::new());
  let assistant = Arc::new(FakeAssistant::new(&[RunStatus::InProgress], Reply::Echo));
  let (_dir, log) = temp_query_log();

  let err = orchestrator(&store, &files, &assistant, log, RetrievalConfig::default())
    .answer(ask("Laundry hours?"))
    .await
    .unwrap_err();

  match err {
    ConversationError::RunTimeout { run_id, elapsed } => {
      assert_eq!(run_id, "run_1");
      assert!(elapsed.as_millis() >= 1000);
    }
    other => panic!("expected RunTimeout, got {other:?}"),
  }
}

#[tokio::test]
async fn test_non_terminal_states_keep_polling() {
  let store = keyword_store();
  let files = Arc::new(FakeFileStore::new());
  let statuses = [
    RunStatus::Queued,
    RunStatus::RequiresAction,
    RunStatus::Cancelling,
    RunStatus::InProgress,
    RunStatus::Completed,
  ];
  let assistant = Arc::new(FakeAssistant::new(&statuses, Reply::Fixed("Done".into())));
  let (_dir, log) = temp_query_log();

  let answer = orchestrator(&store, &files, &assistant, log, RetrievalConfig::default())
    .answer(ask("Any news?"))
    .await
    .unwrap();
  assert_eq!(answer.answer, "Done");
}

#[tokio::test]
async fn test_empty_corpus_sends_raw_query() {
  let store = keyword_store();
  let files = Arc::new(FakeFileStore::new());
  let assistant = Arc::new(FakeAssistant::completing(Reply::Fixed("No idea".into())));
  let (_dir, log) = temp_query_log();

  let answer = orchestrator(&store, &files, &assistant, log, RetrievalConfig::default())
    .answer(ask("Are pets allowed?"))
    .await
    .unwrap();

  assert!(!answer.vector_context_used);
  assert_eq!(answer.vector_source_count, 0);
  assert!(answer.sources.is_empty());
  assert_eq!(assistant.prompts(&answer.thread_id), vec!["Are pets allowed?".to_string()]);
}

#[tokio::test]
async fn test_audit_failure_does_not_fail_the_answer() {
  let store = keyword_store();
  let files = Arc::new(FakeFileStore::new());
  let assistant = Arc::new(FakeAssistant::completing(Reply::Fixed("Answer".into())));

  let answer = orchestrator(&store, &files, &assistant, Arc::new(FailingQueryLog), loose_retrieval())
    .answer(ask("Gym hours?"))
    .await
    .unwrap();
  assert_eq!(answer.answer, "Answer");
}

#[tokio::test]
async fn test_empty_query_is_rejected() {
  let store = keyword_store();
  let files = Arc::new(FakeFileStore::new());
  let assistant = Arc::new(FakeAssistant::completing(Reply::Echo));
  let (_dir, log) = temp_query_log();

  let err = orchestrator(&store, &files, &assistant, log, RetrievalConfig::default())
    .answer(ask("   "))
    .await
    .unwrap_err();
  assert!(matches!(err, ConversationError::EmptyQuery));
  assert_eq!(assistant.threads_created(), 0);
}

#[tokio::test]
async fn test_query_embedding_failure_is_hard() {
  let store = VectorStore::new(Arc::new(FailingEmbedder), Arc::new(MemoryVectorBackend::new(4)));
  let files = Arc::new(FakeFileStore::new());
  let assistant = Arc::new(FakeAssistant::completing(Reply::Echo));
  let (_dir, log) = temp_query_log();

  let err = orchestrator(&store, &files, &assistant, log, RetrievalConfig::default())
    .answer(ask("Pool hours?"))
    .await
    .unwrap_err();
  assert!(matches!(err, ConversationError::Embedding(_)));
}

#[tokio::test]
async fn test_attachments_are_filtered_and_capped() {
  let store = keyword_store();
  let files = Arc::new(FakeFileStore::new());
  files.seed("old.txt", 300);
  files.seed("photo.png", 10);
  let newest = files.seed("rules.pdf", 5);
  files.seed("archive.zip", 1);
  let assistant = Arc::new(FakeAssistant::completing(Reply::Fixed("ok".into())));
  let (_dir, log) = temp_query_log();

  let retrieval = RetrievalConfig { max_attached_files: 1, ..Default::default() };
  let answer = orchestrator(&store, &files, &assistant, log, retrieval)
    .answer(ask("Rules?"))
    .await
    .unwrap();

  assert_eq!(answer.attached_file_count, 1);
  assert_eq!(assistant.last_attachments(), vec![newest.clone()]);
  assert_eq!(answer.sources[0].id, format!("openai_file_{newest}"));
}

#[tokio::test]
async fn test_file_listing_failure_is_soft() {
  let store = keyword_store();
  let files = Arc::new(FakeFileStore::unlistable());
  let assistant = Arc::new(FakeAssistant::completing(Reply::Fixed("ok".into())));
  let (_dir, log) = temp_query_log();

  let answer = orchestrator(&store, &files, &assistant, log, RetrievalConfig::default())
    .answer(ask("Parking?"))
    .await
    .unwrap();
  assert_eq!(answer.attached_file_count, 0);
  assert!(assistant.last_attachments().is_empty());
}

#[tokio::test]
async fn test_existing_thread_is_reused() {
  let store = keyword_store();
  let files = Arc::new(FakeFileStore::new());
  let assistant = Arc::new(FakeAssistant::completing(Reply::Fixed("again".into())));
  let (_dir, log) = temp_query_log();

  let request = QueryRequest {
    query: "And on weekends?".to_string(),
    thread_id: Some("thread_existing".to_string()),
    user_id: None,
  };
  let answer = orchestrator(&store, &files, &assistant, log, RetrievalConfig::default())
    .answer(request)
    .await
    .unwrap();

  assert_eq!(answer.thread_id, "thread_existing");
  assert_eq!(assistant.threads_created(), 0);
}

#[tokio::test]
async fn test_missing_assistant_reply() {
  let store = keyword_store();
  let files = Arc::new(FakeFileStore::new());
  let assistant = Arc::new(FakeAssistant::completing(Reply::Silent));
  let (_dir, log) = temp_query_log();

  let err = orchestrator(&store, &files, &assistant, log, RetrievalConfig::default())
    .answer(ask("Hello?"))
    .await
    .unwrap_err();
  assert!(matches!(err, ConversationError::NoAnswer { thread_id } if thread_id == "thread_1"));
}

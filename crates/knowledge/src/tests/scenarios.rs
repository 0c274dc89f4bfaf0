//! End-to-end pipeline scenarios against fakes.

use super::{harness, sentence_chunker, RecordingEmbedder};
use crate::triggers::Event;
use crate::types::Document;
use crate::vector_index::{point_id, VectorIndex};
use ragline_core::AppError;
use serde_json::json;
use tempfile::TempDir;

#[tokio::test]
async fn test_two_sentence_chunks_are_searchable() {
    let embedder = RecordingEmbedder::new(3)
        .with_vector("A. B.", vec![1.0, 0.0, 0.0])
        .with_vector("C.", vec![0.0, 1.0, 0.0]);
    let h = harness(embedder, sentence_chunker(2, 0));

    let outcome = h
        .services
        .ingestion()
        .ingest_document(&Document::new("doc1", "A. B. C."))
        .await
        .unwrap();

    assert_eq!(outcome.ingested, 2);
    assert_eq!(h.index.count("docs").await.unwrap(), 2);

    let results = h.index.search("docs", &[1.0, 0.0, 0.0], 2).await.unwrap();
    assert_eq!(results[0].text, "A. B.");
    assert_eq!(results[0].id, point_id("doc1", 0));
    assert_eq!(results[0].source, "doc1");

    let results = h.index.search("docs", &[0.0, 1.0, 0.0], 2).await.unwrap();
    assert_eq!(results[0].text, "C.");
}

#[tokio::test]
async fn test_empty_document_writes_nothing() {
    let h = harness(RecordingEmbedder::new(3), sentence_chunker(2, 0));

    for text in ["", "   \n\t "] {
        let outcome = h
            .services
            .ingestion()
            .ingest_document(&Document::new("empty", text))
            .await
            .unwrap();
        assert_eq!(outcome.ingested, 0);
    }

    assert_eq!(h.embedder.call_count(), 0);
    assert_eq!(h.index.count("docs").await.unwrap(), 0);
}

#[tokio::test]
async fn test_zero_top_k_fails_before_embedding() {
    let h = harness(RecordingEmbedder::new(3), sentence_chunker(2, 0));

    for top_k in [0, -3] {
        let err = h.services.ask("What is A?", Some(top_k)).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    let err = h.services.ask("   ", None).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));

    assert_eq!(h.embedder.call_count(), 0);
    assert!(h.llm.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_collection_still_asks_model() {
    let h = harness(RecordingEmbedder::new(3), sentence_chunker(2, 0));

    let outcome = h.services.ask("Anything there?", None).await.unwrap();

    assert_eq!(outcome.num_contexts, 0);
    assert!(outcome.sources.is_empty());
    assert_eq!(outcome.answer, "recorded answer");

    let requests = h.llm.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let user = &requests[0].messages[1].content;
    assert!(user.contains("Context:\n\n\nQuestion: Anything there?"));
}

#[tokio::test]
async fn test_reingestion_is_idempotent() {
    let h = harness(RecordingEmbedder::new(8), sentence_chunker(1, 0));
    let document = Document::new("report.txt", "First fact. Second fact. Third fact.");

    let first = h.services.ingestion().ingest_document(&document).await.unwrap();
    let second = h.services.ingestion().ingest_document(&document).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(h.index.count("docs").await.unwrap(), 3);
}

#[tokio::test]
async fn test_reingestion_with_new_text_overwrites_points() {
    let embedder = RecordingEmbedder::new(2)
        .with_vector("Old text.", vec![1.0, 0.0])
        .with_vector("New text.", vec![0.0, 1.0]);
    let h = harness(embedder, sentence_chunker(1, 0));

    h.services
        .ingestion()
        .ingest_document(&Document::new("doc", "Old text."))
        .await
        .unwrap();
    h.services
        .ingestion()
        .ingest_document(&Document::new("doc", "New text."))
        .await
        .unwrap();

    assert_eq!(h.index.count("docs").await.unwrap(), 1);
    let results = h.index.search("docs", &[1.0, 0.0], 5).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].text, "New text.");
}

#[tokio::test]
async fn test_query_returns_ordered_contexts_and_unique_sources() {
    let embedder = RecordingEmbedder::new(2)
        .with_vector("Cats purr.", vec![1.0, 0.0])
        .with_vector("Cats sleep.", vec![0.9, 0.1])
        .with_vector("Dogs bark.", vec![0.0, 1.0])
        .with_vector("Tell me about cats", vec![1.0, 0.05]);
    let h = harness(embedder, sentence_chunker(1, 0));

    h.services
        .ingestion()
        .ingest_document(&Document::new("cats.txt", "Cats purr. Cats sleep."))
        .await
        .unwrap();
    h.services
        .ingestion()
        .ingest_document(&Document::new("dogs.txt", "Dogs bark."))
        .await
        .unwrap();

    let outcome = h.services.ask("Tell me about cats", Some(2)).await.unwrap();

    assert_eq!(outcome.num_contexts, 2);
    assert_eq!(outcome.sources, vec!["cats.txt"]);

    let user = h.llm.last_user_message().unwrap();
    let purr = user.find("Cats purr.").unwrap();
    let sleep = user.find("Cats sleep.").unwrap();
    assert!(purr < sleep);
    assert!(!user.contains("Dogs bark."));
}

#[tokio::test]
async fn test_events_drive_both_pipelines() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("notes.txt");
    std::fs::write(&path, "Rust is fast. Rust is safe.").unwrap();

    let h = harness(RecordingEmbedder::new(16), sentence_chunker(1, 0));

    let ingest = Event::new(
        "rag/innggest_pdf",
        json!({"pdf_path": path, "source": "notes"}),
    );
    let result = h.services.handle_event(&ingest).await.unwrap();
    assert_eq!(result, json!({"ingested": 2}));

    let query = Event::new("rag/query_pdf_ai", json!({"question": "Is Rust safe?"}));
    let result = h.services.handle_event(&query).await.unwrap();
    assert_eq!(result["answer"], "recorded answer");
    assert_eq!(result["sources"], json!(["notes"]));
    assert_eq!(result["num_contexts"], 2);
}

#[tokio::test]
async fn test_stats_and_reset() {
    let h = harness(RecordingEmbedder::new(4), sentence_chunker(1, 0));
    h.services
        .ingestion()
        .ingest_document(&Document::new("doc", "One. Two."))
        .await
        .unwrap();

    let stats = h.services.stats().await.unwrap();
    assert_eq!(stats.points, 2);
    assert_eq!(stats.backend, "memory");
    assert_eq!(stats.collection, "docs");

    h.services.reset().await.unwrap();
    assert_eq!(h.services.stats().await.unwrap().points, 0);
}

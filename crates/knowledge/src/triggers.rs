//! Event triggers consumed from an external orchestrator.
//!
//! Events are JSON objects `{"name": ..., "data": {...}}`. Two are understood:
//!
//! - `rag/ingest_pdf` (also accepted as `rag/innggest_pdf`), data
//!   `{pdf_path | document_path, source?}`, result `{ingested}`
//! - `rag/query_pdf_ai`, data `{question, top_k?}`, result
//!   `{answer, sources, num_contexts}`

use std::path::PathBuf;

use ragline_core::{AppError, AppResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const INGEST_EVENT: &str = "rag/ingest_pdf";
pub const INGEST_EVENT_ALIAS: &str = "rag/innggest_pdf";
pub const QUERY_EVENT: &str = "rag/query_pdf_ai";

/// A raw event as delivered by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,

    #[serde(default)]
    pub data: serde_json::Value,
}

impl Event {
    pub fn new(name: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Parse an event from JSON text.
    pub fn from_json(text: &str) -> AppResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| AppError::InvalidArgument(format!("Malformed event: {}", e)))
    }
}

/// Data of an ingestion event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestRequest {
    #[serde(alias = "document_path")]
    pub pdf_path: PathBuf,

    /// Defaults to the path
    #[serde(default)]
    pub source: Option<String>,
}

/// Data of a query event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,

    #[serde(default)]
    pub top_k: Option<i64>,
}

/// A validated trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Ingest(IngestRequest),
    Query(QueryRequest),
}

impl Trigger {
    /// Map an event to a trigger, rejecting unknown names and malformed data.
    pub fn from_event(event: &Event) -> AppResult<Self> {
        match event.name.as_str() {
            INGEST_EVENT | INGEST_EVENT_ALIAS => {
                parse_data(&event.name, &event.data).map(Trigger::Ingest)
            }
            QUERY_EVENT => parse_data(&event.name, &event.data).map(Trigger::Query),
            other => Err(AppError::InvalidArgument(format!(
                "Unknown event '{}'. Expected one of: {}, {}",
                other, INGEST_EVENT, QUERY_EVENT
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Trigger::Ingest(_) => INGEST_EVENT,
            Trigger::Query(_) => QUERY_EVENT,
        }
    }
}

fn parse_data<T: DeserializeOwned>(name: &str, data: &serde_json::Value) -> AppResult<T> {
    serde_json::from_value(data.clone())
        .map_err(|e| AppError::InvalidArgument(format!("Invalid data for '{}': {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ingest_event_and_alias() {
        for name in [INGEST_EVENT, INGEST_EVENT_ALIAS] {
            let event = Event::new(name, json!({"pdf_path": "docs/a.pdf"}));
            assert_eq!(
                Trigger::from_event(&event).unwrap(),
                Trigger::Ingest(IngestRequest {
                    pdf_path: PathBuf::from("docs/a.pdf"),
                    source: None,
                })
            );
        }
    }

    #[test]
    fn test_ingest_event_accepts_document_path_and_source() {
        let event = Event::from_json(
            r#"{"name":"rag/ingest_pdf","data":{"document_path":"a.txt","source":"manual"}}"#,
        )
        .unwrap();

        match Trigger::from_event(&event).unwrap() {
            Trigger::Ingest(request) => {
                assert_eq!(request.pdf_path, PathBuf::from("a.txt"));
                assert_eq!(request.source.as_deref(), Some("manual"));
            }
            other => panic!("Expected ingest trigger, got {:?}", other),
        }
    }

    #[test]
    fn test_query_event() {
        let event = Event::new(QUERY_EVENT, json!({"question": "What?", "top_k": 3}));
        assert_eq!(
            Trigger::from_event(&event).unwrap(),
            Trigger::Query(QueryRequest {
                question: "What?".to_string(),
                top_k: Some(3),
            })
        );
    }

    #[test]
    fn test_invalid_events() {
        let missing_path = Event::new(INGEST_EVENT, json!({"source": "x"}));
        assert!(matches!(
            Trigger::from_event(&missing_path),
            Err(AppError::InvalidArgument(_))
        ));

        let unknown = Event::new("rag/unknown", json!({}));
        assert!(matches!(
            Trigger::from_event(&unknown),
            Err(AppError::InvalidArgument(_))
        ));

        assert!(matches!(
            Event::from_json("not json"),
            Err(AppError::InvalidArgument(_))
        ));
    }
}

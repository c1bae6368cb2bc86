//! Request and result types of the use cases.

use serde::Serialize;

use crate::database::Row;

/// Question received from a chat
#[derive(Debug, Clone)]
pub struct QuestionRequest {
    pub chat_id:  i64,
    pub question: String
}

/// Everything known about one answered (or refused) question.
///
/// `formatted_response` is always set and is what gets sent back to the chat.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub success:            bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows:               Option<Vec<Row>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count:          Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql:                Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error:              Option<String>,
    pub formatted_response: String
}

impl QueryOutcome {
    /// Failed outcome; the response is the error prefixed by `prefix`
    pub fn failure(error: impl Into<String>, prefix: &str, sql: Option<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            rows: None,
            row_count: None,
            sql,
            formatted_response: format!("❌ {}{}", prefix, error),
            error: Some(error)
        }
    }
}

/// Progress of one indexing run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    /// Tables described and saved by this run
    pub trained:   usize,
    /// Tables this run tried but could not describe
    pub failed:    usize,
    /// Tables still lacking a description afterwards
    pub remaining: usize
}

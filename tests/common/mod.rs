// SPDX-FileCopyrightText: 2025 RAprogramm
// SPDX-License-Identifier: MIT

#![allow(dead_code)]

use std::{collections::VecDeque, sync::Mutex};

use async_trait::async_trait;
use sql_query_bot::{
    catalog::{CatalogStore, TableDescriptor},
    database::{DatabaseGateway, QueryResult, Row},
    error::{AppResult, llm_api_error, messaging_error},
    llm::{Completion, LanguageModel, PromptRequest},
    messaging::{MessageGateway, OutgoingMessage},
    schema::TableDefinition
};

pub fn descriptor(name: &str, keywords: &[&str]) -> TableDescriptor {
    TableDescriptor {
        name:           name.to_string(),
        description:    format!("{} table", name),
        keywords:       keywords.iter().map(|k| k.to_string()).collect(),
        sample_columns: vec!["id".to_string()],
        relationships:  vec![]
    }
}

pub fn row(pairs: &[(&str, serde_json::Value)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Replays scripted answers and records every prompt
#[derive(Default)]
pub struct ScriptedModel {
    answers:      Mutex<VecDeque<AppResult<String>>>,
    pub requests: Mutex<Vec<PromptRequest>>
}

impl ScriptedModel {
    pub fn new(answers: Vec<AppResult<String>>) -> Self {
        Self {
            answers:  Mutex::new(answers.into()),
            requests: Mutex::new(Vec::new())
        }
    }

    pub fn answering(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    pub fn prompts(&self) -> Vec<PromptRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: &PromptRequest) -> AppResult<Completion> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self
            .answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(llm_api_error("no scripted answer left")));
        next.map(|text| Completion {
            text
        })
    }
}

/// In-memory database with fixed rows and schema
#[derive(Default)]
pub struct FakeDatabase {
    pub result:   QueryResult,
    pub tables:   Vec<TableDefinition>,
    pub executed: Mutex<Vec<String>>
}

impl FakeDatabase {
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            result: QueryResult::from_rows(rows),
            ..Default::default()
        }
    }

    pub fn with_tables(tables: Vec<TableDefinition>) -> Self {
        Self {
            tables,
            ..Default::default()
        }
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl DatabaseGateway for FakeDatabase {
    async fn execute(&self, sql: &str) -> AppResult<QueryResult> {
        self.executed.lock().unwrap().push(sql.to_string());
        Ok(self.result.clone())
    }

    async fn live_schema(&self) -> AppResult<Vec<TableDefinition>> {
        Ok(self.tables.clone())
    }
}

/// In-memory catalog keyed by table name
#[derive(Default)]
pub struct MemoryCatalog {
    pub entries: Mutex<Vec<TableDescriptor>>,
    pub fail:    bool
}

impl MemoryCatalog {
    pub fn with(entries: Vec<TableDescriptor>) -> Self {
        Self {
            entries: Mutex::new(entries),
            fail:    false
        }
    }

    pub fn failing() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            fail:    true
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|d| d.name.clone())
            .collect()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn indexed_table_names(&self) -> AppResult<Vec<String>> {
        Ok(self.names())
    }

    async fn upsert(&self, descriptors: &[TableDescriptor]) -> AppResult<()> {
        let mut entries = self.entries.lock().unwrap();
        for descriptor in descriptors {
            match entries.iter_mut().find(|e| e.name == descriptor.name) {
                Some(existing) => *existing = descriptor.clone(),
                None => entries.push(descriptor.clone())
            }
        }
        Ok(())
    }

    async fn list_all(&self) -> AppResult<Vec<TableDescriptor>> {
        if self.fail {
            return Err(llm_api_error("catalog offline"));
        }
        Ok(self.entries.lock().unwrap().clone())
    }
}

/// Records delivered messages and typing indicators
#[derive(Default)]
pub struct RecordingMessenger {
    pub sent:   Mutex<Vec<OutgoingMessage>>,
    pub typing: Mutex<Vec<i64>>,
    pub fail:   bool
}

#[async_trait]
impl MessageGateway for RecordingMessenger {
    async fn send_message(&self, message: &OutgoingMessage) -> AppResult<()> {
        if self.fail {
            return Err(messaging_error("Telegram API error: Bad Request"));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn send_typing(&self, chat_id: i64) -> AppResult<()> {
        self.typing.lock().unwrap().push(chat_id);
        Ok(())
    }
}

//! Question → SQL → rows → reply.

use std::sync::Arc;

use crate::{
    app::types::{QueryOutcome, QuestionRequest},
    catalog::{CatalogStore, render_context},
    database::DatabaseGateway,
    error::AppResult,
    llm::{LanguageModel, PromptRequest, strip_code_fences},
    output::format_query_result,
    ranker::rank,
    schema::Schema,
    validator::Validator
};

/// Instructions prepended to every SQL generation prompt
pub const SQL_SYSTEM_PROMPT: &str = "You are a PostgreSQL expert. Given a database schema and a \
natural language question, generate a valid SELECT SQL query.

RULES:
1. ONLY generate SELECT queries (no INSERT, UPDATE, DELETE, DROP, etc.)
2. Return ONLY the SQL query, no explanations
3. Use proper PostgreSQL syntax
4. If the question cannot be answered with a query, respond with: SELECT 'Cannot answer this question' AS error
5. Limit results to 100 rows maximum unless specified
6. Use table aliases for readability

IMPORTANT: Return ONLY the SQL query, nothing else.";

/// Schema context used when no catalogued table matches the question
#[derive(Debug, Clone, Default)]
pub enum DefaultContext {
    /// Fixed text, e.g. a rendered DDL file
    Static(String),
    /// Summary of the live schema, fetched per question
    #[default]
    LiveSchema
}

/// Answers one chat question end to end.
///
/// Collaborator calls run sequentially: catalog, language model, database.
/// Every outcome, including failures, carries a ready-to-send response.
pub struct ProcessQuestion {
    llm:             Arc<dyn LanguageModel>,
    database:        Arc<dyn DatabaseGateway>,
    catalog:         Arc<dyn CatalogStore>,
    validator:       Validator,
    default_context: DefaultContext
}

impl ProcessQuestion {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        database: Arc<dyn DatabaseGateway>,
        catalog: Arc<dyn CatalogStore>
    ) -> Self {
        Self {
            llm,
            database,
            catalog,
            validator: Validator::new(),
            default_context: DefaultContext::default()
        }
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_default_context(mut self, default_context: DefaultContext) -> Self {
        self.default_context = default_context;
        self
    }

    pub async fn execute(&self, request: &QuestionRequest) -> QueryOutcome {
        let question = request.question.trim();
        if question.is_empty() {
            return QueryOutcome::failure("Question cannot be empty", "", None);
        }
        tracing::info!(chat_id = request.chat_id, question, "Processing question");
        match self.answer(question).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(chat_id = request.chat_id, error = %e, "Question failed");
                QueryOutcome::failure(e.to_string(), "Error: ", None)
            }
        }
    }

    async fn answer(&self, question: &str) -> AppResult<QueryOutcome> {
        let context = self.schema_context(question).await?;
        let request = PromptRequest::new(
            format!("{}\n\nDATABASE SCHEMA:\n{}", SQL_SYSTEM_PROMPT, context),
            format!("USER QUESTION: {}\n\nSQL QUERY:", question)
        );
        let completion = self.llm.complete(&request).await?;
        let sql = strip_code_fences(&completion.text);

        let verdict = self.validator.validate(&sql);
        if let Some(reason) = verdict.error() {
            tracing::warn!(%sql, %reason, "Generated SQL rejected");
            return Ok(QueryOutcome::failure(reason.to_string(), "", Some(sql)));
        }

        let result = self.database.execute(&sql).await?;
        if let Some(error) = result.error {
            return Ok(QueryOutcome::failure(error, "Query error: ", Some(sql)));
        }

        let formatted_response = format_query_result(&result.rows, result.row_count);
        Ok(QueryOutcome {
            success: true,
            row_count: Some(result.row_count),
            rows: Some(result.rows),
            sql: Some(sql),
            error: None,
            formatted_response
        })
    }

    /// Ranked catalog tables for `question`, or the default context.
    ///
    /// An unreachable catalog is treated like an empty ranking.
    pub async fn schema_context(&self, question: &str) -> AppResult<String> {
        match self.catalog.list_all().await {
            Ok(catalog) => {
                let ranked = rank(question, &catalog);
                if !ranked.is_empty() {
                    let names: Vec<&str> = ranked.iter().map(|t| t.name.as_str()).collect();
                    tracing::info!(tables = ?names, "Using ranked catalog context");
                    return Ok(render_context(&ranked));
                }
            }
            Err(e) => tracing::warn!(error = %e, "Catalog unavailable, using default context")
        }
        match &self.default_context {
            DefaultContext::Static(context) => Ok(context.clone()),
            DefaultContext::LiveSchema => {
                let tables = self.database.live_schema().await?;
                Ok(Schema::from_tables(tables).to_summary())
            }
        }
    }
}

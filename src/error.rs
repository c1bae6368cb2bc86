pub use masterror::{AppError, AppResult};

/// Create file read error
pub fn file_read_error(path: &str, source: std::io::Error) -> AppError {
    AppError::internal(format!("Failed to read file '{}': {}", path, source))
}

/// Create schema parse error with optional position info
pub fn schema_parse_error(message: impl Into<String>) -> AppError {
    let msg = message.into();
    AppError::bad_request(format_sql_error("Schema parse error", &msg))
}

/// Create error for a table description the language model got wrong
pub fn description_parse_error(table: &str, message: impl Into<String>) -> AppError {
    AppError::bad_request(format!(
        "Invalid description for table '{}': {}",
        table,
        message.into()
    ))
}

/// Create LLM API error
pub fn llm_api_error(message: impl Into<String>) -> AppError {
    AppError::service(message.into())
}

/// Create messaging API error
pub fn messaging_error(message: impl Into<String>) -> AppError {
    AppError::service(message.into())
}

/// Create database error
pub fn database_error(err: sqlx::Error) -> AppError {
    let msg = match &err {
        sqlx::Error::Database(db) => format!("Database error: {}", db.message()),
        sqlx::Error::PoolTimedOut => String::from("Database error: connection pool timed out"),
        other => format!("Database error: {}", other)
    };
    AppError::service(msg)
}

/// Create HTTP error
pub fn http_error(err: reqwest::Error) -> AppError {
    let msg = if err.is_timeout() {
        format!("Request timeout: {}", err)
    } else if err.is_connect() {
        format!("Connection failed: {}", err)
    } else if err.is_status() {
        format!("HTTP error {}: {}", err.status().unwrap_or_default(), err)
    } else {
        err.to_string()
    };
    AppError::service(msg)
}

/// Create config error
pub fn config_error(message: impl Into<String>) -> AppError {
    AppError::bad_request(message.into())
}

/// Format SQL error with position highlighting
fn format_sql_error(prefix: &str, message: &str) -> String {
    // sqlparser format: "... at Line: X, Column Y"
    if let Some(pos) = extract_position(message) {
        format!(
            "{} at line {}, column {}:\n  {}",
            prefix, pos.line, pos.column, message
        )
    } else {
        format!("{}:\n  {}", prefix, message)
    }
}

struct SqlPosition {
    line:   usize,
    column: usize
}

fn extract_position(message: &str) -> Option<SqlPosition> {
    let line_marker = "Line: ";
    let col_marker = ", Column ";

    let line_start = message.find(line_marker)? + line_marker.len();
    let col_offset = message[line_start..].find(col_marker)?;
    let line_str = &message[line_start..line_start + col_offset];
    let col_start = line_start + col_offset + col_marker.len();
    let col_end = message[col_start..]
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(message.len() - col_start);
    let col_str = &message[col_start..col_start + col_end];

    match (line_str.parse(), col_str.parse()) {
        (Ok(line), Ok(column)) => Some(SqlPosition {
            line,
            column
        }),
        _ => None
    }
}

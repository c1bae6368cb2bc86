use colored::Colorize;
use serde::Serialize;

use crate::{database::Row, ranker::ScoredTable, validator::Verdict};

/// Telegram rejects messages over 4096 characters
const MAX_MESSAGE_LENGTH: usize = 4000;
/// Room kept for the closing `</pre>` and the footer note
const FOOTER_RESERVE: usize = 64;
const MAX_DISPLAY_ROWS: usize = 20;
const CELL_WIDTH: usize = 15;
const TRUNCATED_NOTE: &str = "\n\n<i>... (truncated)</i>";

/// Output format for CLI results
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml
}

/// Output options
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format:  OutputFormat,
    pub colored: bool
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            format:  OutputFormat::Text,
            colored: true
        }
    }
}

/// Render query rows as a Telegram HTML message.
///
/// Lines are only added while the message stays under the Telegram limit, so
/// the result is always balanced markup: `<pre>` is closed and no escaped
/// entity is split.
pub fn format_query_result(rows: &[Row], row_count: usize) -> String {
    if rows.is_empty() {
        return String::from("📭 <b>No results found</b>");
    }

    let mut message = format!(
        "📊 <b>Results: {} row{}</b>\n\n",
        row_count,
        if row_count == 1 { "" } else { "s" }
    );
    let budget = MAX_MESSAGE_LENGTH - FOOTER_RESERVE;

    // Single value (count, sum, ...)
    if rows.len() == 1
        && rows[0].len() == 1
        && let Some((key, value)) = rows[0].first()
    {
        message.push_str(&format!("<b>{}:</b> ", escape_html(key)));
        let value = escape_html(&format_value(value));
        let room = budget.saturating_sub(message.chars().count());
        let shown = cut_escaped(&value, room);
        message.push_str(shown);
        if shown.len() < value.len() {
            message.push_str(TRUNCATED_NOTE);
        }
        return message;
    }

    let headers: Vec<&String> = rows[0].keys().collect();
    let header_line = headers
        .iter()
        .map(|h| escape_html(&fit_cell(h)))
        .collect::<Vec<_>>()
        .join(" | ");
    let rule = "-".repeat((headers.len() * 18).min(60));

    message.push_str("<pre>");
    let mut length = message.chars().count();
    let mut truncated = false;

    if !push_line(&mut message, &mut length, &header_line, budget) {
        // Header alone is wider than a message: keep what fits
        let room = budget.saturating_sub(length + 1);
        message.push('\n');
        message.push_str(cut_escaped(&header_line, room));
        truncated = true;
    } else if !push_line(&mut message, &mut length, &rule, budget) {
        truncated = true;
    }

    let mut shown = 0;
    if !truncated {
        for row in rows.iter().take(MAX_DISPLAY_ROWS) {
            let line = headers
                .iter()
                .map(|h| {
                    let value = row.get(h.as_str()).map(format_value).unwrap_or_default();
                    escape_html(&fit_cell(&value))
                })
                .collect::<Vec<_>>()
                .join(" | ");
            if !push_line(&mut message, &mut length, &line, budget) {
                truncated = true;
                break;
            }
            shown += 1;
        }
    }
    message.push_str("\n</pre>");

    if truncated {
        message.push_str(TRUNCATED_NOTE);
    } else if rows.len() > shown {
        message.push_str(&format!(
            "\n\n<i>... and {} more rows</i>",
            rows.len() - shown
        ));
    }
    message
}

/// Append `line` on a new line if it fits in `budget` characters
fn push_line(message: &mut String, length: &mut usize, line: &str, budget: usize) -> bool {
    let cost = 1 + line.chars().count();
    if *length + cost > budget {
        return false;
    }
    message.push('\n');
    message.push_str(line);
    *length += cost;
    true
}

/// First `max_chars` characters of escaped text, never ending inside an
/// entity such as `&amp;`
fn cut_escaped(text: &str, max_chars: usize) -> &str {
    let end = text
        .char_indices()
        .nth(max_chars)
        .map_or(text.len(), |(idx, _)| idx);
    let head = &text[..end];
    match head.rfind('&') {
        Some(amp) if !head[amp..].contains(';') => &head[..amp],
        _ => head
    }
}

/// Pad or cut a cell to a fixed width, marking cuts with `..`
fn fit_cell(text: &str) -> String {
    if text.chars().count() > CELL_WIDTH {
        let head: String = text.chars().take(CELL_WIDTH - 2).collect();
        format!("{}..", head)
    } else {
        format!("{:<width$}", text, width = CELL_WIDTH)
    }
}

fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::from("NULL"),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => value.to_string(),
        other => other.to_string()
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[derive(Serialize)]
struct VerdictReport<'a> {
    sql:     &'a str,
    #[serde(flatten)]
    verdict: &'a Verdict,
    message: Option<String>
}

/// Render a validation verdict for the terminal
pub fn format_verdict(sql: &str, verdict: &Verdict, opts: &OutputOptions) -> String {
    let report = VerdictReport {
        sql,
        verdict,
        message: verdict.message()
    };
    match opts.format {
        OutputFormat::Json => serde_json::to_string_pretty(&report).unwrap_or_default(),
        OutputFormat::Yaml => serde_yaml::to_string(&report).unwrap_or_default(),
        OutputFormat::Text => match verdict.message() {
            None if opts.colored => format!("{} read-only query", "VALID".green().bold()),
            None => String::from("VALID read-only query"),
            Some(message) if opts.colored => format!("{} {}", "REJECTED".red().bold(), message),
            Some(message) => format!("REJECTED {}", message)
        }
    }
}

#[derive(Serialize)]
struct RankingReport<'a> {
    question: &'a str,
    tables:   &'a [ScoredTable<'a>]
}

/// Render a ranking for the terminal
pub fn format_ranking(question: &str, ranked: &[ScoredTable<'_>], opts: &OutputOptions) -> String {
    let report = RankingReport {
        question,
        tables: ranked
    };
    match opts.format {
        OutputFormat::Json => serde_json::to_string_pretty(&report).unwrap_or_default(),
        OutputFormat::Yaml => serde_yaml::to_string(&report).unwrap_or_default(),
        OutputFormat::Text => {
            if ranked.is_empty() {
                return String::from("No relevant tables (default context would be used)");
            }
            let mut output = String::new();
            for (i, scored) in ranked.iter().enumerate() {
                let name = if opts.colored {
                    scored.table.name.cyan().bold().to_string()
                } else {
                    scored.table.name.clone()
                };
                output.push_str(&format!("{}. {} (score: {})\n", i + 1, name, scored.score));
                if !scored.table.description.is_empty() {
                    output.push_str(&format!("   {}\n", scored.table.description));
                }
            }
            output
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_cell_pads_short_text() {
        assert_eq!(fit_cell("id"), "id             ");
    }

    #[test]
    fn test_fit_cell_cuts_long_text() {
        assert_eq!(fit_cell("a_very_long_column_name"), "a_very_long_c..");
    }

    #[test]
    fn test_fit_cell_counts_chars_not_bytes() {
        assert_eq!(fit_cell("привет").chars().count(), CELL_WIDTH);
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&serde_json::Value::Null), "NULL");
        assert_eq!(format_value(&serde_json::json!("text")), "text");
        assert_eq!(format_value(&serde_json::json!(42)), "42");
        assert_eq!(format_value(&serde_json::json!({"a": 1})), "{\"a\":1}");
    }

    #[test]
    fn test_cut_escaped_keeps_entities_whole() {
        assert_eq!(cut_escaped("a &amp; b", 4), "a ");
        assert_eq!(cut_escaped("a &amp; b", 7), "a &amp;");
        assert_eq!(cut_escaped("abc", 10), "abc");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a<b & c>d"), "a&lt;b &amp; c&gt;d");
    }
}

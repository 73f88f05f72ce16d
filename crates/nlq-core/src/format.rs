//! Result formatting
//!
//! Post-execution presentation: search-term highlighting, pagination
//! metadata and a result summary. Formatting never fails past its boundary:
//! when highlighting cannot be built the original rows are returned
//! untouched with the error noted in the summary.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::classify::normalize::is_hangul;

/// One result row as returned by the execution collaborator.
pub type Row = serde_json::Map<String, Value>;

/// Formatting options.
#[derive(Debug, Clone)]
pub struct FormatConfig {
    /// Match terms case-insensitively.
    pub case_insensitive: bool,
    /// Match whole words only instead of substrings.
    pub whole_word: bool,
    /// Maximum highlights applied per field.
    pub max_highlights_per_field: usize,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            case_insensitive: true,
            whole_word: false,
            max_highlights_per_field: 5,
        }
    }
}

/// Pagination metadata, 1-based pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub page: usize,
    pub page_size: usize,
    pub total_rows: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

/// Per-field statistics for the summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldStats {
    pub null_count: usize,
    /// JSON type seen most often in this field.
    pub dominant_type: String,
}

/// Result summary: counts, field statistics and query features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSummary {
    pub total_rows: usize,
    pub field_count: usize,
    pub fields: BTreeMap<String, FieldStats>,
    pub query_length: usize,
    pub term_count: usize,
    /// Korean follow-up hints, only populated for empty result sets.
    pub suggestions: Vec<String>,
    /// Set when formatting itself failed and rows were passed through.
    pub error: Option<String>,
}

/// Formatted response for one page of results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormattedResult {
    pub rows: Vec<Row>,
    pub page_info: PageInfo,
    pub summary: ResultSummary,
}

/// Result formatter service.
pub struct ResultFormatter {
    config: FormatConfig,
}

impl ResultFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatConfig::default(),
        }
    }

    pub fn with_config(config: FormatConfig) -> Self {
        Self { config }
    }

    /// Highlight, paginate and summarize a result set.
    pub fn format(
        &self,
        rows: &[Row],
        query: &str,
        page: usize,
        page_size: usize,
    ) -> FormattedResult {
        let terms = extract_terms(query);
        let (page_rows, page_info) = paginate(rows, page, page_size);

        let (highlighted, error) = match self.build_highlighter(&terms) {
            Ok(highlighter) => {
                let rows = page_rows
                    .iter()
                    .map(|row| self.highlight_row(row, highlighter.as_ref()))
                    .collect();
                (rows, None)
            }
            Err(e) => {
                tracing::warn!(error = %e, "highlighting failed, returning rows unmodified");
                (page_rows.to_vec(), Some(e))
            }
        };

        let mut summary = summarize(rows, query, terms.len());
        summary.error = error;

        FormattedResult {
            rows: highlighted,
            page_info,
            summary,
        }
    }

    /// Build the single-pass alternation matcher over all terms.
    fn build_highlighter(&self, terms: &[String]) -> Result<Option<Regex>, String> {
        if terms.is_empty() {
            return Ok(None);
        }
        // Terms are matched against HTML-escaped text, so escape them the
        // same way before building the pattern.
        let alternation = terms
            .iter()
            .map(|t| regex::escape(&html_escape(t)))
            .collect::<Vec<_>>()
            .join("|");
        let mut pattern = format!("({})", alternation);
        if self.config.whole_word {
            pattern = format!(r"\b{}\b", pattern);
        }
        if self.config.case_insensitive {
            pattern = format!("(?i){}", pattern);
        }
        Regex::new(&pattern)
            .map(Some)
            .map_err(|e| format!("highlight pattern: {}", e))
    }

    fn highlight_row(&self, row: &Row, highlighter: Option<&Regex>) -> Row {
        let mut out = Row::new();
        for (key, value) in row {
            let formatted = match value {
                Value::String(text) => {
                    let escaped = html_escape(text);
                    let marked = match highlighter {
                        Some(re) => re
                            .replacen(
                                &escaped,
                                self.config.max_highlights_per_field,
                                "<mark>${1}</mark>",
                            )
                            .into_owned(),
                        None => escaped,
                    };
                    Value::String(marked)
                }
                other => other.clone(),
            };
            out.insert(key.clone(), formatted);
        }
        out
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Split the query into highlight terms: quoted phrases stay whole, terms
/// of a single non-Hangul character are dropped.
fn extract_terms(query: &str) -> Vec<String> {
    let mut terms = Vec::new();
    let mut rest = query;

    // Pull quoted phrases out first.
    while let Some(start) = rest.find('"') {
        if let Some(len) = rest[start + 1..].find('"') {
            let phrase = &rest[start + 1..start + 1 + len];
            if !phrase.trim().is_empty() {
                terms.push(phrase.trim().to_string());
            }
            rest = &rest[start + 1 + len + 1..];
        } else {
            break;
        }
    }

    let unquoted: String = query
        .split('"')
        .step_by(2)
        .collect::<Vec<_>>()
        .join(" ");
    for word in unquoted.split_whitespace() {
        let mut chars = word.chars();
        let first = match chars.next() {
            Some(c) => c,
            None => continue,
        };
        if chars.next().is_none() && !is_hangul(first) {
            continue;
        }
        if !terms.iter().any(|t| t == word) {
            terms.push(word.to_string());
        }
    }
    terms
}

fn paginate(rows: &[Row], page: usize, page_size: usize) -> (Vec<Row>, PageInfo) {
    let page_size = page_size.max(1);
    let total_rows = rows.len();
    let total_pages = total_rows.div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);

    let start = (page - 1) * page_size;
    let end = (start + page_size).min(total_rows);
    let page_rows = if start < total_rows {
        rows[start..end].to_vec()
    } else {
        Vec::new()
    };

    let info = PageInfo {
        page,
        page_size,
        total_rows,
        total_pages,
        has_next: page < total_pages,
        has_prev: page > 1,
    };
    (page_rows, info)
}

fn summarize(rows: &[Row], query: &str, term_count: usize) -> ResultSummary {
    let mut fields: BTreeMap<String, FieldStats> = BTreeMap::new();
    let mut type_counts: BTreeMap<String, BTreeMap<&'static str, usize>> = BTreeMap::new();

    for row in rows {
        for (key, value) in row {
            let entry = fields.entry(key.clone()).or_insert_with(|| FieldStats {
                null_count: 0,
                dominant_type: "null".to_string(),
            });
            if value.is_null() {
                entry.null_count += 1;
            }
            *type_counts
                .entry(key.clone())
                .or_default()
                .entry(json_type_name(value))
                .or_insert(0) += 1;
        }
    }
    for (key, counts) in &type_counts {
        if let Some((type_name, _)) = counts
            .iter()
            .filter(|(name, _)| **name != "null")
            .max_by_key(|(_, count)| **count)
        {
            if let Some(stats) = fields.get_mut(key) {
                stats.dominant_type = (*type_name).to_string();
            }
        }
    }

    let suggestions = if rows.is_empty() {
        vec![
            "검색어를 더 짧게 줄여보세요".to_string(),
            "조건을 줄이거나 기간을 넓혀보세요".to_string(),
            "고객 이름이나 날짜 표현을 확인해보세요".to_string(),
        ]
    } else {
        Vec::new()
    };

    ResultSummary {
        total_rows: rows.len(),
        field_count: fields.len(),
        fields,
        query_length: query.chars().count(),
        term_count,
        suggestions,
        error: None,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Escape HTML-significant characters so result content cannot inject
/// markup around the highlight tags.
fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

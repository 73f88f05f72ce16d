//! SQL security validation
//!
//! Defense-in-depth gate over generated SQL. Five independent passes run
//! unconditionally - no short-circuiting - so the report is exhaustive even
//! when the statement is already doomed to be blocked: a single detector's
//! false-negative must never be fatal.
//!
//! The validator never fails past its boundary: every call produces a
//! complete [`SqlValidationReport`], and an internal fault maps to a
//! Blocked report carrying a CRITICAL `validation_error` issue.

pub mod lexer;
pub mod patterns;
pub mod types;

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::error::LexError;
use crate::schema;
use lexer::Token;
pub use types::{SqlValidationReport, ThreatLevel, ValidationIssue, ValidationVerdict};

/// SQL security validator service.
///
/// Construct once at startup; all pattern tables are compiled on first use
/// and shared process-wide.
pub struct SqlValidator;

impl SqlValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a statement and optional bind parameters.
    pub fn validate(
        &self,
        sql: &str,
        parameters: Option<&BTreeMap<String, String>>,
    ) -> SqlValidationReport {
        let mut issues = Vec::new();
        let lexed = lexer::tokenize(sql);

        issues.extend(self.check_basic_safety(sql));
        issues.extend(self.check_injection_patterns(sql));
        issues.extend(self.check_tokens(&lexed));
        issues.extend(self.check_binder_sanity(sql, &lexed, parameters));
        issues.extend(self.check_whitelist(sql));

        let report = SqlValidationReport::from_issues(issues);
        if !report.execution_allowed {
            tracing::warn!(verdict = ?report.verdict, digest = %report.digest(), "statement rejected");
        }
        report
    }

    /// Pass 1: empty check, read-only prefix, deny-listed keywords, length
    /// cap.
    fn check_basic_safety(&self, sql: &str) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let trimmed = sql.trim();

        if trimmed.is_empty() {
            issues.push(ValidationIssue::new(
                ThreatLevel::Critical,
                "empty_query",
                "statement is empty",
            ));
            return issues;
        }

        let first_word = trimmed
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_uppercase();
        if first_word != "SELECT" {
            issues.push(
                ValidationIssue::new(
                    ThreatLevel::High,
                    "non_select_query",
                    format!("statement must start with SELECT, found '{}'", first_word),
                )
                .with_suggestion("only read-only SELECT statements are accepted"),
            );
        }

        for m in patterns::DENY_KEYWORD_RE.find_iter(trimmed) {
            issues.push(
                ValidationIssue::new(
                    ThreatLevel::Critical,
                    "dangerous_keyword",
                    format!("forbidden keyword '{}'", m.as_str()),
                )
                .with_location(format!("offset {}", m.start())),
            );
        }

        if trimmed.len() > patterns::MAX_QUERY_LENGTH {
            issues.push(ValidationIssue::new(
                ThreatLevel::Medium,
                "query_too_long",
                format!(
                    "statement length {} exceeds cap {}",
                    trimmed.len(),
                    patterns::MAX_QUERY_LENGTH
                ),
            ));
        }

        issues
    }

    /// Pass 2: pre-compiled injection pattern scan, every match CRITICAL.
    fn check_injection_patterns(&self, sql: &str) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for (index, re) in patterns::INJECTION_PATTERNS.iter().enumerate() {
            if let Some(m) = re.find(sql) {
                let excerpt: String = m.as_str().chars().take(50).collect();
                issues.push(
                    ValidationIssue::new(
                        ThreatLevel::Critical,
                        "sql_injection_pattern",
                        format!("injection pattern #{} matched", index),
                    )
                    .with_location(excerpt),
                );
            }
        }
        issues
    }

    /// Pass 3: comment and string-literal token analysis.
    fn check_tokens(&self, lexed: &Result<Vec<Token>, LexError>) -> Vec<ValidationIssue> {
        let tokens = match lexed {
            Ok(tokens) => tokens,
            // Malformation is pass 4's finding; nothing to scan here.
            Err(_) => return Vec::new(),
        };

        let mut issues = Vec::new();
        for token in tokens {
            match token {
                Token::Comment(text) => {
                    let lowered = text.to_lowercase();
                    for keyword in patterns::SUSPICIOUS_COMMENT_KEYWORDS {
                        if lowered.contains(keyword) {
                            issues.push(
                                ValidationIssue::new(
                                    ThreatLevel::High,
                                    "suspicious_comment",
                                    format!("comment contains '{}'", keyword),
                                )
                                .with_location(text.trim().to_string()),
                            );
                        }
                    }
                }
                Token::StringLiteral(text) => {
                    let lowered = text.to_lowercase();
                    for keyword in patterns::LITERAL_SQL_KEYWORDS {
                        if lowered
                            .split(|c: char| !c.is_alphanumeric() && c != '_')
                            .any(|w| w == *keyword)
                        {
                            issues.push(
                                ValidationIssue::new(
                                    ThreatLevel::Medium,
                                    "keyword_in_literal",
                                    format!("string literal embeds SQL keyword '{}'", keyword),
                                )
                                .with_location(text.clone()),
                            );
                        }
                    }
                }
                _ => {}
            }
        }
        issues
    }

    /// Pass 4: confirm the statement is constructible as a parameterized
    /// statement and sanity-check the parameter dictionary.
    fn check_binder_sanity(
        &self,
        _sql: &str,
        lexed: &Result<Vec<Token>, LexError>,
        parameters: Option<&BTreeMap<String, String>>,
    ) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if let Err(e) = lexed {
            issues.push(ValidationIssue::new(
                ThreatLevel::High,
                "unparseable_statement",
                format!("statement cannot be bound: {}", e),
            ));
        }

        if let Ok(tokens) = lexed {
            for token in tokens {
                if let Token::BindParam(name) = token {
                    if !patterns::PARAM_NAME_RE.is_match(name) {
                        issues.push(ValidationIssue::new(
                            ThreatLevel::Medium,
                            "invalid_parameter_name",
                            format!("bind parameter ':{}' has an invalid name", name),
                        ));
                    }
                }
            }
        }

        if let Some(params) = parameters {
            for (name, value) in params {
                if !patterns::PARAM_NAME_RE.is_match(name) {
                    issues.push(ValidationIssue::new(
                        ThreatLevel::Medium,
                        "invalid_parameter_name",
                        format!("parameter key '{}' has an invalid name", name),
                    ));
                }
                if value.len() > patterns::MAX_PARAM_VALUE_LENGTH {
                    issues.push(ValidationIssue::new(
                        ThreatLevel::Low,
                        "oversized_parameter_value",
                        format!(
                            "parameter '{}' value length {} exceeds {}",
                            name,
                            value.len(),
                            patterns::MAX_PARAM_VALUE_LENGTH
                        ),
                    ));
                }
            }
        }

        issues
    }

    /// Pass 5: table and column allow-list enforcement.
    fn check_whitelist(&self, sql: &str) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        let tables: Vec<String> = patterns::TABLE_NAME_RE
            .captures_iter(sql)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().to_lowercase())
            .collect();

        let mut allowed_columns: BTreeSet<&'static str> = BTreeSet::new();
        for table in &tables {
            match schema::find_table(table) {
                Some(def) => {
                    allowed_columns.extend(def.columns.iter().map(|c| c.name));
                }
                None => {
                    issues.push(
                        ValidationIssue::new(
                            ThreatLevel::High,
                            "unauthorized_table",
                            format!("table '{}' is not allow-listed", table),
                        )
                        .with_suggestion("query customers, memos or events"),
                    );
                }
            }
        }

        // Column check is a best-effort heuristic over the projection list;
        // it only applies when every referenced table is known.
        if tables.is_empty() || !issues.is_empty() {
            return issues;
        }
        if let Some(caps) = patterns::SELECT_CLAUSE_RE.captures(sql) {
            let clause = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            for raw in clause.split(',') {
                if let Some(column) = Self::extract_column(raw) {
                    if !allowed_columns.contains(column.as_str()) {
                        issues.push(ValidationIssue::new(
                            ThreatLevel::Medium,
                            "unauthorized_column",
                            format!("column '{}' is not allow-listed for the queried tables", column),
                        ));
                    }
                }
            }
        }

        issues
    }

    /// Reduce one projection item to a bare column name.
    ///
    /// Strips DISTINCT, `AS` aliases, trailing bare aliases, one level of
    /// function wrapping and table prefixes. `*` and literals pass through
    /// as always-permitted. Known-limited: nested calls and subqueries are
    /// not understood, by design.
    fn extract_column(raw: &str) -> Option<String> {
        let mut item = raw.trim();

        // ASCII prefix check: byte indexing into a lowercased copy is not
        // safe for characters whose lowercase form has a different length.
        const DISTINCT: &str = "distinct ";
        if item.len() >= DISTINCT.len()
            && item.is_char_boundary(DISTINCT.len())
            && item[..DISTINCT.len()].eq_ignore_ascii_case(DISTINCT)
        {
            item = item[DISTINCT.len()..].trim_start();
        }

        // Strip "AS alias". ASCII byte search keeps positions valid on the
        // original string; ASCII matches always sit on char boundaries.
        let needle = b" as ";
        if let Some(pos) = item
            .as_bytes()
            .windows(needle.len())
            .position(|w| w.eq_ignore_ascii_case(needle))
        {
            item = item[..pos].trim();
        }

        // Trailing bare alias: "password pw" -> "password". Function
        // expressions keep their argument handling below.
        if !item.contains('(') {
            if let Some(first) = item.split_whitespace().next() {
                item = first;
            }
        }

        // One level of function wrapping: COUNT(x) -> x
        if let (Some(open), true) = (item.find('('), item.ends_with(')')) {
            item = item[open + 1..item.len() - 1].trim();
        }

        // Table prefix: customers.name -> name
        if let Some(pos) = item.rfind('.') {
            item = item[pos + 1..].trim();
        }

        let item = item.trim();
        if item == "*" || item.is_empty() {
            return None;
        }
        // Numeric or quoted literals are always permitted.
        if item.chars().next().map(|c| c.is_ascii_digit() || c == '\'').unwrap_or(false) {
            return None;
        }
        // Anything that is not a plain identifier is beyond this heuristic.
        if !item
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return None;
        }
        Some(item.to_lowercase())
    }
}

impl Default for SqlValidator {
    fn default() -> Self {
        Self::new()
    }
}

//! Security pattern tables
//!
//! Deny-lists and injection-detection regexes for the SQL validator. Like
//! the classification patterns, these are versioned configuration data:
//! compiled once, testable on their own, and tuned independently of the
//! validation engine.

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum accepted statement length before a MEDIUM issue is raised.
pub const MAX_QUERY_LENGTH: usize = 5000;

/// Maximum accepted bind-parameter value length before a LOW issue.
pub const MAX_PARAM_VALUE_LENGTH: usize = 1000;

/// DDL/DML/DCL and system-function keywords that must never appear in a
/// read-only statement. Matched whole-word, case-insensitive; every hit is
/// CRITICAL.
pub static DENY_KEYWORDS: &[&str] = &[
    "insert",
    "update",
    "delete",
    "drop",
    "create",
    "alter",
    "truncate",
    "grant",
    "revoke",
    "exec",
    "execute",
    "merge",
    "call",
    "shutdown",
    "xp_cmdshell",
    "sp_executesql",
    "load_file",
    "outfile",
    "dumpfile",
];

/// Whole-word matcher over [`DENY_KEYWORDS`].
pub static DENY_KEYWORD_RE: Lazy<Regex> = Lazy::new(|| {
    let alternation = DENY_KEYWORDS.join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternation)).expect("deny-keyword regex")
});

/// Injection attack shapes, OWASP-style taxonomy: comment-based,
/// UNION-based, boolean-based, time-based, stacked statements, string
/// concatenation, encoding tricks and metadata probing. Any match is
/// CRITICAL.
pub static INJECTION_PATTERN_SOURCES: &[&str] = &[
    // Comment-based
    r"--",
    r"(?s)/\*.*?\*/",
    r"(?m)#.*$",
    // UNION-based
    r"(?i)\bunion\b[\s\S]*\bselect\b",
    // Boolean-based tautologies
    r"(?i)\b(?:or|and)\s+'?\d+'?\s*=\s*'?\d+'?",
    r"(?i)\b(?:or|and)\s+'[^']*'\s*=\s*'[^']*'",
    r"(?i)\b(?:or|and)\s+true\b",
    // Time-based
    r"(?i)\bsleep\s*\(",
    r"(?i)\bpg_sleep\s*\(",
    r"(?i)\bwaitfor\s+delay\b",
    r"(?i)\bbenchmark\s*\(",
    // Stacked statements
    r";\s*\S",
    // String concatenation / encoding
    r"\|\|",
    r"(?i)\bconcat\s*\(",
    r"(?i)\bchar\s*\(",
    r"(?i)\bchr\s*\(",
    r"(?i)\b0x[0-9a-f]{8,}",
    // Metadata probing
    r"(?i)\binformation_schema\b",
    r"(?i)\bpg_catalog\b|\bpg_tables\b",
    r"(?i)\bsysobjects\b|\bsyscolumns\b|\bmysql\s*\.\s*user\b",
];

/// Compiled injection patterns, index-aligned with
/// [`INJECTION_PATTERN_SOURCES`].
pub static INJECTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    INJECTION_PATTERN_SOURCES
        .iter()
        .map(|s| Regex::new(s).expect("injection pattern"))
        .collect()
});

/// Keywords that make a comment suspicious (HIGH when found inside one).
pub static SUSPICIOUS_COMMENT_KEYWORDS: &[&str] = &[
    "drop", "delete", "insert", "update", "truncate", "union", "exec", "shutdown",
];

/// SQL keywords that are suspicious inside a string literal (MEDIUM).
pub static LITERAL_SQL_KEYWORDS: &[&str] =
    &["select", "union", "insert", "update", "delete", "drop"];

/// Extracts table names after FROM / JOIN.
pub static TABLE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:from|join)\s+([A-Za-z_][A-Za-z0-9_]*)").expect("table-name regex")
});

/// Captures the projection list of the outermost SELECT clause.
pub static SELECT_CLAUSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^\s*select\s+(.*?)\s+from\b").expect("select-clause regex"));

/// Valid bind-parameter name.
pub static PARAM_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("param-name regex"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deny_keyword_whole_word_only() {
        assert!(DENY_KEYWORD_RE.is_match("DROP TABLE customers"));
        assert!(DENY_KEYWORD_RE.is_match("select * from t; delete from t"));
        // "created_at" contains "create" but is not a whole-word match.
        assert!(!DENY_KEYWORD_RE.is_match("SELECT created_at FROM customers"));
        assert!(!DENY_KEYWORD_RE.is_match("SELECT updated_at FROM customers"));
    }

    #[test]
    fn test_injection_patterns_compile() {
        assert_eq!(INJECTION_PATTERNS.len(), INJECTION_PATTERN_SOURCES.len());
        assert!(INJECTION_PATTERNS.len() >= 20);
    }

    #[test]
    fn test_boolean_tautology_detected() {
        let sql = "SELECT * FROM customers WHERE id = 1 OR 1=1";
        assert!(INJECTION_PATTERNS.iter().any(|re| re.is_match(sql)));
    }

    #[test]
    fn test_plain_where_one_equals_one_not_a_tautology_hit() {
        // The rule generator emits `WHERE 1 = 1` with no OR/AND prefix;
        // that must not trip the boolean-based patterns.
        let sql = "SELECT COUNT(*) AS cnt FROM customers WHERE 1 = 1";
        assert!(!INJECTION_PATTERNS.iter().any(|re| re.is_match(sql)));
    }

    #[test]
    fn test_union_select_detected() {
        let sql = "SELECT name FROM customers UNION SELECT password FROM admin";
        assert!(INJECTION_PATTERNS.iter().any(|re| re.is_match(sql)));
    }

    #[test]
    fn test_stacked_statement_detected() {
        let sql = "SELECT 1; DROP TABLE customers";
        assert!(INJECTION_PATTERNS.iter().any(|re| re.is_match(sql)));
    }

    #[test]
    fn test_trailing_semicolon_alone_is_clean() {
        let sql = "SELECT * FROM customers;";
        assert!(!INJECTION_PATTERNS.iter().any(|re| re.is_match(sql)));
    }

    #[test]
    fn test_table_name_extraction() {
        let sql = "SELECT * FROM customers LEFT JOIN memos ON customers.id = memos.customer_id";
        let tables: Vec<&str> = TABLE_NAME_RE
            .captures_iter(sql)
            .map(|c| c.get(1).unwrap().as_str())
            .collect();
        assert_eq!(tables, vec!["customers", "memos"]);
    }

    #[test]
    fn test_select_clause_capture() {
        let caps = SELECT_CLAUSE_RE
            .captures("SELECT name, age FROM customers")
            .unwrap();
        assert_eq!(&caps[1], "name, age");
    }
}

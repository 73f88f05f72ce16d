//! Validation report structures

use serde::{Deserialize, Serialize};

/// Severity of a detected problem. Totally ordered: `Low < Medium < High <
/// Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Aggregate verdict over all detected issues. Worse-wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationVerdict {
    Safe,
    Suspicious,
    Dangerous,
    Blocked,
}

/// One detected problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub threat_level: ThreatLevel,

    /// Taxonomy tag, e.g. `dangerous_keyword`, `sql_injection_pattern`.
    pub category: String,

    pub description: String,

    /// Where in the statement the problem was found, when known.
    pub location: Option<String>,

    /// Remediation hint, when one exists.
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    pub fn new(
        threat_level: ThreatLevel,
        category: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            threat_level,
            category: category.into(),
            description: description.into(),
            location: None,
            suggestion: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Aggregate validation verdict.
///
/// Invariant: `execution_allowed` is true iff no CRITICAL or HIGH issue is
/// present and at most 2 MEDIUM issues are present; any CRITICAL issue
/// forces `verdict = Blocked`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlValidationReport {
    pub is_valid: bool,
    pub verdict: ValidationVerdict,
    pub issues: Vec<ValidationIssue>,
    pub execution_allowed: bool,
}

/// MEDIUM issues tolerated before a suspicious statement becomes invalid.
const MEDIUM_TOLERANCE: usize = 2;

impl SqlValidationReport {
    /// Compute the verdict from a full issue set (severity-ordered,
    /// worse-wins).
    pub fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        let count_at = |level: ThreatLevel| {
            issues.iter().filter(|i| i.threat_level == level).count()
        };
        let criticals = count_at(ThreatLevel::Critical);
        let highs = count_at(ThreatLevel::High);
        let mediums = count_at(ThreatLevel::Medium);

        let verdict = if criticals > 0 {
            ValidationVerdict::Blocked
        } else if highs > 0 {
            ValidationVerdict::Dangerous
        } else if mediums > 0 {
            ValidationVerdict::Suspicious
        } else {
            ValidationVerdict::Safe
        };

        let execution_allowed = criticals == 0 && highs == 0 && mediums <= MEDIUM_TOLERANCE;

        Self {
            is_valid: execution_allowed,
            verdict,
            issues,
            execution_allowed,
        }
    }

    /// Blocked report for an internal validator failure.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::from_issues(vec![ValidationIssue::new(
            ThreatLevel::Critical,
            "validation_error",
            format!("validator internal error: {}", message.into()),
        )])
    }

    /// Issues at or above a severity.
    pub fn issues_at_least(&self, level: ThreatLevel) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.threat_level >= level)
    }

    /// Short human-readable digest of the worst problems.
    pub fn digest(&self) -> String {
        let worst = match self.issues.iter().max_by_key(|i| i.threat_level) {
            Some(issue) => issue,
            None => return "no issues".to_string(),
        };
        format!(
            "{:?}: {} ({} issue{})",
            self.verdict,
            worst.category,
            self.issues.len(),
            if self.issues.len() == 1 { "" } else { "s" }
        )
    }
}

//! Document Validation Reports
//!
//! Structural checks collect every problem they find instead of stopping at
//! the first one, so an operator fixing a radio-map file sees the whole list.

use std::fmt;

use serde::Serialize;

/// Everything a validation pass found
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    /// Validation errors (must be fixed)
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (should be reviewed)
    pub warnings: Vec<ValidationIssue>,

    /// Informational messages
    pub info: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// No errors (warnings allowed)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// File an issue under its severity
    pub fn push(&mut self, issue: ValidationIssue) {
        match issue.severity {
            Severity::Error => self.errors.push(issue),
            Severity::Warning => self.warnings.push(issue),
            Severity::Info => self.info.push(issue),
        }
    }

    pub fn error(&mut self, issue_type: IssueType, field: Option<String>, message: impl Into<String>) {
        self.push(ValidationIssue::new(issue_type, field, message, Severity::Error));
    }

    pub fn warning(&mut self, issue_type: IssueType, field: Option<String>, message: impl Into<String>) {
        self.push(ValidationIssue::new(issue_type, field, message, Severity::Warning));
    }

    pub fn note(&mut self, issue_type: IssueType, field: Option<String>, message: impl Into<String>) {
        self.push(ValidationIssue::new(issue_type, field, message, Severity::Info));
    }

    pub fn total_issues(&self) -> usize {
        self.errors.len() + self.warnings.len() + self.info.len()
    }

    pub fn first_error(&self) -> Option<&ValidationIssue> {
        self.errors.first()
    }
}

/// Individual validation issue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub issue_type: IssueType,
    /// Offending key path, e.g. `cells.3,4.beacon_stats.B1`
    pub field: Option<String>,
    pub message: String,
    pub severity: Severity,
}

impl ValidationIssue {
    pub fn new(
        issue_type: IssueType,
        field: Option<String>,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self { issue_type, field, message: message.into(), severity }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{field}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    /// Required key is absent or empty
    MissingField,
    /// Unsupported value for an enumerated key
    Unsupported,
    /// Two cells share coordinates
    DuplicateCoordinates,
    /// Statistic is negative or not finite
    InvalidStatistic,
    /// Cell lies outside the floor plan
    OutOfBounds,
    /// Cell id does not spell its coordinates
    IdMismatch,
    /// Beacon has stats but no known position
    UnpositionedBeacon,
    /// Cell sits on a wall
    OnWall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issues_are_filed_by_severity() {
        let mut report = ValidationReport::new();
        assert!(report.is_valid());

        report.warning(IssueType::IdMismatch, Some("cells.a".into()), "id does not match (1, 2)");
        report.note(IssueType::UnpositionedBeacon, None, "B9 has no position");
        assert!(report.is_valid());

        report.error(IssueType::MissingField, Some("cells".into()), "no cells");
        assert!(!report.is_valid());
        assert_eq!(report.total_issues(), 3);
        assert_eq!(report.first_error().unwrap().to_string(), "cells: no cells");
    }
}

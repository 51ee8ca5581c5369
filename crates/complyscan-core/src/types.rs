//! Core types for ComplyScan

use serde::{Deserialize, Serialize};

/// Issue and regulation lists as kept by a result store.
///
/// Both lists are ordered; the order is the classifier's ranking order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResult {
    /// Identified issue category names
    pub issues: Vec<String>,

    /// Flattened regulation references
    pub regulations: Vec<String>,
}

impl StoredResult {
    /// Create a stored result from issue and regulation lists
    pub fn new(issues: Vec<String>, regulations: Vec<String>) -> Self {
        Self {
            issues,
            regulations,
        }
    }

    /// True when no issue was recorded
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Structured analysis result returned to HTTP clients
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Identified issue categories, ranked
    pub identified_issues: Vec<String>,

    /// Regulation references for all identified issues, flattened
    pub relevant_regulations: Vec<String>,

    /// One explanation per identified issue
    pub explanations: Vec<String>,

    /// One recommendation per identified issue
    pub recommendations: Vec<String>,

    /// Whether the result came from the result store
    #[serde(default)]
    pub cached: bool,
}

impl AnalysisReport {
    /// Issue and regulation lists for persistence
    pub fn to_stored(&self) -> StoredResult {
        StoredResult::new(
            self.identified_issues.clone(),
            self.relevant_regulations.clone(),
        )
    }

    /// True when the classifier produced no category
    pub fn is_empty(&self) -> bool {
        self.identified_issues.is_empty()
    }

    /// Both issue and regulation lists are non-empty
    pub fn is_recordable(&self) -> bool {
        !self.identified_issues.is_empty() && !self.relevant_regulations.is_empty()
    }
}

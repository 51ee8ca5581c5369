//! ComplyScan Core
//!
//! Types, traits, and utilities shared across ComplyScan components.
//!
//! This crate provides:
//! - The error taxonomy and result alias
//! - Input normalization (the result store key)
//! - The compliance knowledge base mapping issue categories to regulations
//! - Report types exchanged between the analyzer, the stores and HTTP clients

pub mod error;
pub mod knowledge;
pub mod normalize;
pub mod types;

pub use error::{Error, Result};
pub use knowledge::{CategoryGuidance, IssueCategory, KnowledgeBase, RegulationEntry};
pub use normalize::{fingerprint, normalize, normalize_with_limit, MAX_INPUT_CHARS};
pub use types::{AnalysisReport, StoredResult};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::knowledge::KnowledgeBase;
    pub use crate::normalize::normalize;
    pub use crate::types::{AnalysisReport, StoredResult};
}

//! ComplyScan Server
//!
//! HTTP front end for compliance issue analysis: accepts a free-text business
//! description, classifies it into issue categories and answers with the
//! related regulations, explanations and audit recommendations.

pub mod analyzer;
pub mod config;
pub mod routes;
pub mod static_files;

pub use analyzer::{Analysis, Analyzer};
pub use config::AppConfig;
pub use routes::{create_router, AppError, AppState};

//! Error types for ComplyScan

/// Result type alias using ComplyScan's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for ComplyScan operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Request input rejected before analysis
    #[error("validation error: {0}")]
    Validation(String),

    /// Forward pass or tokenization failed inside the classifier
    #[error("inference error: {0}")]
    Inference(String),

    /// Result store (cache or database) errors
    #[error("store error: {0}")]
    Store(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Analysis exceeded its deadline
    #[error("operation timed out after {0}s")]
    Timeout(u64),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new inference error
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error came from the model forward pass
    pub fn is_inference(&self) -> bool {
        matches!(self, Self::Inference(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind() {
        assert_eq!(
            Error::store("disk full").to_string(),
            "store error: disk full"
        );
        assert_eq!(Error::Timeout(30).to_string(), "operation timed out after 30s");
    }

    #[test]
    fn test_is_inference() {
        assert!(Error::inference("nan in logits").is_inference());
        assert!(!Error::internal("boom").is_inference());
    }
}

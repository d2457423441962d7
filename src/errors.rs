//! Error types for kb-retriever
//!
//! Resolution and search errors propagate unchanged to the pipeline caller;
//! [`RetrievalError::Context`] adds which step failed without hiding the
//! underlying error.

use thiserror::Error;

/// Main error type for knowledge-base retrieval
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Missing or invalid bindings on a declaration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Referenced object does not exist in the config store
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: &'static str,
        namespace: String,
        name: String,
    },

    /// Vector index type with no client implementation
    #[error("unknown vectorstore type: {0}")]
    UnsupportedBackend(String),

    /// Embedder type with no client implementation
    #[error("unknown embedder type: {0}")]
    UnsupportedEmbedder(String),

    /// Embedding, search or completion backend failure
    #[error("Backend call failed: {0}")]
    Backend(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Manifest and config parse errors
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cancellation token fired or deadline elapsed
    #[error("Operation cancelled")]
    Cancelled,

    /// An error annotated with the step that produced it
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<RetrievalError>,
    },
}

/// Coarse classification of a [`RetrievalError`], looking through context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    NotFound,
    UnsupportedBackend,
    Backend,
    Cancelled,
    Other,
}

impl RetrievalError {
    /// Wrap this error with a description of the failing step
    pub fn context(self, context: impl Into<String>) -> Self {
        RetrievalError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with all context layers removed
    pub fn root(&self) -> &RetrievalError {
        match self {
            RetrievalError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            RetrievalError::Configuration(_) => ErrorKind::Configuration,
            RetrievalError::NotFound { .. } => ErrorKind::NotFound,
            RetrievalError::UnsupportedBackend(_) | RetrievalError::UnsupportedEmbedder(_) => {
                ErrorKind::UnsupportedBackend
            }
            RetrievalError::Backend(_) | RetrievalError::Http(_) => ErrorKind::Backend,
            RetrievalError::Cancelled => ErrorKind::Cancelled,
            _ => ErrorKind::Other,
        }
    }
}

/// Result type alias for retrieval operations
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Attach step context to the error side of a [`Result`]
pub trait ResultExt<T> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|err| err.context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RetrievalError::NotFound {
            kind: "knowledgebase",
            namespace: "arcadia".to_string(),
            name: "hr-docs".to_string(),
        };
        assert_eq!(err.to_string(), "knowledgebase arcadia/hr-docs not found");
    }

    #[test]
    fn test_context_preserves_kind() {
        let err: Result<()> = Err(RetrievalError::UnsupportedBackend("milvus".to_string()));
        let err = err
            .with_context(|| "resolve vector index")
            .with_context(|| "knowledge base hr-docs")
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UnsupportedBackend);
        assert!(err.to_string().starts_with("knowledge base hr-docs: resolve vector index"));
        assert!(err.to_string().contains("milvus"));
        assert!(matches!(err.root(), RetrievalError::UnsupportedBackend(t) if t == "milvus"));
    }

    #[test]
    fn test_cancelled_kind() {
        assert_eq!(RetrievalError::Cancelled.kind(), ErrorKind::Cancelled);
        assert_eq!(
            RetrievalError::Backend("timeout".to_string()).kind(),
            ErrorKind::Backend
        );
    }
}

//! Cache-level errors: shader compilation failures.

use thiserror::Error;

/// Result type alias for kernelforge-cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while compiling a shader into a pipeline and inserting
/// it into the cache.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The `Device` implementation rejected the shader source. The
    /// offending source text is attached for diagnosis; the cache entry
    /// is not inserted.
    #[error("shader compilation failed: {message}\n--- source ---\n{source_text}")]
    CompilationFailed {
        /// Backend-reported failure message.
        message: String,
        /// The full shader source text that failed to compile.
        source_text: String,
    },
}

impl Error {
    /// Whether this error is a compilation failure (currently the only
    /// variant, kept as a named predicate for symmetry with the other
    /// crates' error enums and to absorb future variants without
    /// breaking callers that match on it).
    pub fn is_compilation_error(&self) -> bool {
        matches!(self, Error::CompilationFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compilation_failed_message_embeds_source_text() {
        let err = Error::CompilationFailed {
            message: "unexpected token".to_string(),
            source_text: "kernel void gemm(".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("unexpected token"));
        assert!(msg.contains("kernel void gemm("));
    }

    #[test]
    fn is_compilation_error_is_always_true_today() {
        let err = Error::CompilationFailed {
            message: String::new(),
            source_text: String::new(),
        };
        assert!(err.is_compilation_error());
    }
}

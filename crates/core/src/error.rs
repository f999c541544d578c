//! Error types for the agentflow domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each stage of a run has its own error enum; the top-level [`Error`]
//! wraps them so callers can match on the stage that failed.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The top-level error type for all agentflow operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Catalog loading ---
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    // --- Execution order ---
    #[error("Dependency graph error: {0}")]
    Graph(#[from] GraphError),

    // --- External renderer ---
    #[error("Renderer error: {0}")]
    Render(#[from] RenderError),

    // --- Filesystem polling ---
    #[error("Wait error: {0}")]
    Wait(#[from] WaitError),

    // --- Response format negotiation ---
    #[error("Negotiation error: {0}")]
    Negotiation(#[from] NegotiationError),

    #[error("Resource '{0}' is required but missing from the catalog")]
    MissingResource(String),

    #[error("Failed to read request body: {reason}")]
    RequestBody { reason: String },

    #[error("HTTP method \"{method}\" not allowed!")]
    UnsupportedMethod { method: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl Error {
    /// Attach the offending path to an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Stage errors ---

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to walk {}: {reason}", root.display())]
    Walk { root: PathBuf, reason: String },

    #[error("Failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("Duplicate resource id '{id}' in {} and {}", first.display(), second.display())]
    DuplicateResource {
        id: String,
        first: PathBuf,
        second: PathBuf,
    },
}

#[derive(Debug, Clone, Error)]
pub enum GraphError {
    #[error("dependency cycle detected: {}", cycle.join(" -> "))]
    Cycle { cycle: Vec<String> },
}

#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("Failed to start '{binary}': {reason}")]
    Spawn { binary: String, reason: String },

    #[error("command failed with exit code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("Renderer timed out after {secs}s evaluating {}", path.display())]
    Timeout { path: PathBuf, secs: u64 },

    #[error("Renderer produced unusable output: {0}")]
    InvalidOutput(String),
}

#[derive(Debug, Clone, Error)]
pub enum WaitError {
    #[error("timeout exceeded after {waited:?} while waiting for {target}")]
    Timeout { target: String, waited: Duration },

    #[error("resource ID {id} does not exist in {}", record.display())]
    ResourceMissing { id: String, record: PathBuf },

    #[error("timestamp for resource ID {id} is unset in {}", record.display())]
    TimestampUnset { id: String, record: PathBuf },
}

#[derive(Debug, Clone, Error)]
pub enum NegotiationError {
    #[error("no valid response flag file found in {}", dir.display())]
    NoResponseFlag { dir: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_error_names_the_path() {
        let err = Error::Graph(GraphError::Cycle {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        });
        assert!(err.to_string().contains("a -> b -> a"));
    }

    #[test]
    fn unsupported_method_contains_method() {
        let err = Error::UnsupportedMethod {
            method: "POST".into(),
        };
        assert_eq!(err.to_string(), "HTTP method \"POST\" not allowed!");
    }

    #[test]
    fn negotiation_error_message() {
        let err = NegotiationError::NoResponseFlag {
            dir: PathBuf::from("/agent/actions/api"),
        };
        assert!(err.to_string().starts_with("no valid response flag file found"));
    }

    #[test]
    fn io_helper_keeps_path() {
        let err = Error::io(
            "/tmp/missing.pkl",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("/tmp/missing.pkl"));
    }
}

//! Error types for the serve-side engine
//!
//! The build pipeline reports failures through `anyhow`; everything the
//! loaded engine can return to a host goes through `EngineError` so the
//! host can map each kind onto its own error surface.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors surfaced by the graph loader, the spatial index, and the search.
#[derive(Debug)]
pub enum EngineError {
    /// File open, read, or map failed. Carries the offending path.
    Io { path: PathBuf, source: io::Error },

    /// Magic mismatch, truncated blob, or a sizes-block inconsistency.
    /// The message names the offending field.
    BadFormat(String),

    /// A node index outside `[0, num_nodes)`.
    OutOfRange(String),

    /// A contract violation in the query parameter record.
    InvalidParam(String),

    /// Nearest-neighbour query against an empty spatial index.
    NotLoaded,
}

impl EngineError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            source,
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            EngineError::BadFormat(msg) => write!(f, "Bad artifact format: {}", msg),
            EngineError::OutOfRange(msg) => write!(f, "Index out of range: {}", msg),
            EngineError::InvalidParam(msg) => write!(f, "Invalid parameter: {}", msg),
            EngineError::NotLoaded => write!(f, "Spatial index is empty; engine not loaded"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

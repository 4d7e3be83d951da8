use thiserror::Error;

/// Result type alias for scan and resolution operations
pub type Result<T> = std::result::Result<T, ScanError>;

/// Errors that can occur while discovering and resolving resources
#[derive(Error, Debug)]
pub enum ScanError {
    /// Reading a file or directory failed
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path that could not be read
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// File content could not be decoded into any known structure
    #[error("failed to decode {path}: {reason}")]
    Decode {
        /// Path of the offending file
        path: String,
        /// Decoder message
        reason: String,
    },

    /// Key material in a format or algorithm we cannot handle
    #[error("unsupported key: {0}")]
    UnsupportedKey(String),

    /// None of the given roots exist
    #[error("none of the given root paths exist")]
    NoRoots,

    /// A lookup found nothing
    #[error("{target} not found")]
    NotFound {
        /// Name that was searched for
        target: String,
    },

    /// The scan was cancelled before it completed
    #[error("scan cancelled")]
    Cancelled,

    /// A background task panicked or was aborted
    #[error("background task failed: {0}")]
    Task(String),
}

impl ScanError {
    /// Build an I/O error for `path`.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true for a lookup that found nothing (never a processing failure)
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if the operation stopped because of cancellation
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns true for per-item failures that only cost one file
    #[must_use]
    pub const fn is_per_item(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::Decode { .. } | Self::UnsupportedKey(_)
        )
    }
}

impl From<ScanError> for std::io::Error {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::Io { source, .. } => source,
            ScanError::NotFound { .. } | ScanError::NoRoots => {
                Self::new(std::io::ErrorKind::NotFound, err)
            }
            ScanError::Cancelled => Self::new(std::io::ErrorKind::Interrupted, err),
            ScanError::Decode { .. } | ScanError::UnsupportedKey(_) => {
                Self::new(std::io::ErrorKind::InvalidData, err)
            }
            ScanError::Task(_) => Self::other(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_io_not_found() {
        let err = ScanError::NotFound {
            target: "ca.pem".into(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_cancelled());

        let io: std::io::Error = err.into();
        assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
        assert!(io.to_string().contains("ca.pem"));
    }

    #[test]
    fn io_error_keeps_source() {
        let err = ScanError::io(
            "/keys/a.pem",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.is_per_item());
        assert!(err.to_string().contains("/keys/a.pem"));

        let io: std::io::Error = err.into();
        assert_eq!(io.kind(), std::io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn cancelled_is_not_per_item() {
        assert!(ScanError::Cancelled.is_cancelled());
        assert!(!ScanError::Cancelled.is_per_item());
        assert!(!ScanError::NoRoots.is_per_item());
    }
}

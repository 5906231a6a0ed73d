// Error types shared by the storage adapters and the save/load pipelines

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NoteError {
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
    #[error("OUT_OF_RANGE: no path assigned to note id {0}")]
    OutOfRange(u32),
    #[error("INVALID_PATH: {0}")]
    InvalidPath(String),
    /// Primary file was renamed, the revision namespace was not, and moving
    /// the primary file back failed too. The note is split across two names.
    #[error("ROLLBACK_FAILED: {from} -> {to}: {reason}")]
    RollbackFailed {
        from: String,
        to: String,
        reason: String,
    },
    #[error("CONFIG: {0}")]
    Config(String),
}

impl NoteError {
    /// Errors that leave storage in a state the user has to look at.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::RollbackFailed { .. } | Self::OutOfRange(_))
    }
}

impl From<std::io::Error> for NoteError {
    fn from(value: std::io::Error) -> Self {
        if value.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(value.to_string())
        } else {
            Self::Io(value.to_string())
        }
    }
}

impl From<serde_yaml::Error> for NoteError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Config(value.to_string())
    }
}

pub type NoteResult<T> = Result<T, NoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_maps_to_not_found() {
        let err: NoteError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, NoteError::NotFound(_)));

        let err: NoteError = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope").into();
        assert!(matches!(err, NoteError::Io(_)));
    }

    #[test]
    fn rollback_and_range_errors_are_fatal() {
        let err = NoteError::RollbackFailed {
            from: "a.html".to_string(),
            to: "b.html".to_string(),
            reason: "denied".to_string(),
        };
        assert!(err.is_fatal());
        assert!(NoteError::OutOfRange(3).is_fatal());
        assert!(!NoteError::Io("x".to_string()).is_fatal());
        assert_eq!(err.to_string(), "ROLLBACK_FAILED: a.html -> b.html: denied");
    }
}

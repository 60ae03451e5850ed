use thiserror::Error;

use crate::bundle::ImageRole;
use crate::history::HistoryError;

/// Coarse classification of a failure, used by callers to decide whether to
/// report, retry, or escalate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The submission itself is malformed; the client has to fix it.
    Structural,
    /// Recognition failed on one image; resubmitting may succeed.
    Recognition,
    /// Something on our side broke.
    Internal,
}

#[derive(Error, Debug)]
pub enum ProofshotError {
    #[error("Missing image for role '{0}'")]
    MissingRole(ImageRole),

    #[error("More than one image supplied for role '{0}'")]
    DuplicateRole(ImageRole),

    #[error("Unreadable image for role '{role}': {reason}")]
    InvalidImage { role: ImageRole, reason: String },

    #[error("OCR timed out after {timeout_ms}ms on role '{role}'")]
    OcrTimeout { role: ImageRole, timeout_ms: u64 },

    #[error("OCR failed on role '{role}': {reason}")]
    OcrFailed { role: ImageRole, reason: String },

    #[error("OCR engine error: {0}")]
    Ocr(String),

    #[error("Image processing error: {0}")]
    Imaging(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("History store error: {0}")]
    History(#[from] HistoryError),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl ProofshotError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingRole(_) | Self::DuplicateRole(_) | Self::InvalidImage { .. } => {
                ErrorKind::Structural
            }
            Self::OcrTimeout { .. } | Self::OcrFailed { .. } => ErrorKind::Recognition,
            Self::Ocr(_) | Self::Imaging(_) | Self::Config(_) | Self::History(_) | Self::Task(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Only structural problems are the client's to correct.
    pub fn is_client_error(&self) -> bool {
        self.kind() == ErrorKind::Structural
    }

    /// Recognition failures should be retried by the caller.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Recognition
    }
}

impl From<tokio::task::JoinError> for ProofshotError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProofshotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert!(ProofshotError::MissingRole(ImageRole::Like).is_client_error());
        assert!(ProofshotError::InvalidImage {
            role: ImageRole::Reply2,
            reason: "truncated".into(),
        }
        .is_client_error());

        let timeout = ProofshotError::OcrTimeout {
            role: ImageRole::Comment1,
            timeout_ms: 5000,
        };
        assert!(timeout.is_retryable());
        assert!(!timeout.is_client_error());

        let internal = ProofshotError::Imaging("encoder failed".into());
        assert_eq!(internal.kind(), ErrorKind::Internal);
        assert!(!internal.is_retryable());
    }

    #[test]
    fn test_error_messages_name_the_role() {
        let err = ProofshotError::OcrTimeout {
            role: ImageRole::Reply1,
            timeout_ms: 250,
        };
        assert_eq!(err.to_string(), "OCR timed out after 250ms on role 'reply1'");
    }
}

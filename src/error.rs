//! Error taxonomy and command outcomes.
//!
//! Every fallible core operation returns [`Result`], whose error type
//! [`SyncError`] renders directly as the user-facing notification text.
//! Editor commands finish with an [`Outcome`], which keeps a dismissed
//! prompt ([`Outcome::Cancelled`]) apart from a real failure.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The service answered with an HTTP-style failure.
    #[error("Http Error: {status} - {message}, check configuration")]
    Transport { status: u16, message: String },

    /// The service rejected the request semantically (bad guid, quota, auth).
    #[error("{domain} Error: {code} - {parameter}")]
    Service {
        domain: String,
        code: String,
        parameter: String,
    },

    #[error("Failed to read attachment {}: {source}", path.display())]
    AttachmentRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed front matter at line {line}: {text:?} {problem}")]
    FrontMatter {
        line: usize,
        text: String,
        problem: &'static str,
    },

    #[error("Failed to write attachment {}: {source}", path.display())]
    AttachmentWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed note markup: {0}")]
    Markup(String),

    #[error("Notebook not found: {0}")]
    NotebookNotFound(String),

    #[error("Note not found: {0}")]
    NoteNotFound(String),

    #[error("Document is not tracked: {0}")]
    UntrackedDocument(String),

    #[error("No active document")]
    NoActiveDocument,

    #[error("Unexpected Error: {0}")]
    Unexpected(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// Why a command flow stopped early.
///
/// Flows inside the command layer return `std::result::Result<T, Abort>` so
/// that both a failed service call and a dismissed prompt can short-circuit
/// with `?`.
#[derive(Debug)]
pub enum Abort {
    Cancelled,
    Failed(SyncError),
}

impl From<SyncError> for Abort {
    fn from(err: SyncError) -> Self {
        Abort::Failed(err)
    }
}

/// Final result of an editor command.
#[derive(Debug)]
pub enum Outcome<T> {
    Succeeded(T),
    Cancelled,
    Failed(SyncError),
}

impl<T> Outcome<T> {
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Outcome::Succeeded(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn succeeded(self) -> Option<T> {
        match self {
            Outcome::Succeeded(value) => Some(value),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&SyncError> {
        match self {
            Outcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

impl<T> From<std::result::Result<T, Abort>> for Outcome<T> {
    fn from(result: std::result::Result<T, Abort>) -> Self {
        match result {
            Ok(value) => Outcome::Succeeded(value),
            Err(Abort::Cancelled) => Outcome::Cancelled,
            Err(Abort::Failed(err)) => Outcome::Failed(err),
        }
    }
}

/// Turn an optional prompt answer into a flow step.
pub fn selected<T>(answer: Option<T>) -> std::result::Result<T, Abort> {
    answer.ok_or(Abort::Cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_message_matches_notification_format() {
        let err = SyncError::Transport {
            status: 401,
            message: "Unauthorized".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Http Error: 401 - Unauthorized, check configuration"
        );
    }

    #[test]
    fn service_message_names_domain_code_and_parameter() {
        let err = SyncError::Service {
            domain: "Evernote".to_string(),
            code: "BAD_DATA_FORMAT".to_string(),
            parameter: "Note.title".to_string(),
        };
        assert_eq!(err.to_string(), "Evernote Error: BAD_DATA_FORMAT - Note.title");
    }

    #[test]
    fn attachment_read_message_includes_path() {
        let err = SyncError::AttachmentRead {
            path: PathBuf::from("/tmp/missing.png"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("/tmp/missing.png"));
    }

    #[test]
    fn attachment_write_message_includes_path() {
        let err = SyncError::AttachmentWrite {
            path: PathBuf::from("/tmp/notesync-1/report.txt"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().starts_with("Failed to write attachment /tmp/notesync-1/report.txt"));
    }

    #[test]
    fn abort_converts_into_outcome() {
        let cancelled: Outcome<()> = Err::<(), _>(Abort::Cancelled).into();
        assert!(cancelled.is_cancelled());

        let failed: Outcome<()> =
            Err::<(), _>(Abort::from(SyncError::Unexpected("boom".into()))).into();
        assert!(failed.is_failed());
        assert!(matches!(failed.failure(), Some(SyncError::Unexpected(_))));
        assert!(cancelled.failure().is_none());

        let ok: Outcome<u8> = Ok::<_, Abort>(7).into();
        assert_eq!(ok.succeeded(), Some(7));
    }

    #[test]
    fn selected_maps_dismissal_to_cancel() {
        assert!(matches!(selected::<String>(None), Err(Abort::Cancelled)));
        assert_eq!(selected(Some(3)).ok(), Some(3));
    }
}

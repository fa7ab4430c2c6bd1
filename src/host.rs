//! The editor host seam.
//!
//! [`EditorHost`] is everything the command layer needs from the editor:
//! the active document, a way to open new documents, pickers and input
//! boxes, notifications, and opening files or URLs externally. A prompt
//! the user dismisses returns `None`.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::DocumentId;

/// Snapshot of the document the user is working on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveDocument {
    pub id: DocumentId,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[async_trait]
pub trait EditorHost: Send + Sync {
    fn active_document(&self) -> Option<ActiveDocument>;

    /// Open a new markdown document holding `text`.
    async fn open_document(&self, text: &str) -> Result<DocumentId>;

    /// Quick pick among `items`.
    async fn pick(&self, placeholder: &str, items: &[String]) -> Option<String>;

    async fn input(&self, placeholder: &str) -> Option<String>;

    fn notify(&self, level: NoticeLevel, message: &str);

    /// Warning with one action button; `true` when the user chose it.
    async fn warn_with_action(&self, message: &str, action: &str) -> bool;

    /// Transient status bar text.
    fn status(&self, message: &str);

    /// Open a file path or URL with the system's default handler.
    async fn open_external(&self, target: &str) -> Result<()>;
}

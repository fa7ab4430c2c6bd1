//! Per-document bindings: which remote note a document came from and which
//! local files are staged to go up with its next publish.
//!
//! Staging is purely local. Nothing reaches the service until the document
//! is published, and closing a document drops whatever was staged for it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Result, SyncError};
use crate::models::{Attachment, DocumentId, Note};
use crate::service::NoteService;

pub const SERVER_LABEL: &str = "(server) ";
pub const LOCAL_LABEL: &str = "(local) ";

/// A local file recorded against a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedAttachment {
    pub path: PathBuf,
    pub attachment: Attachment,
}

impl StagedAttachment {
    pub fn file_name(&self) -> &str {
        self.attachment.file_name()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Binding {
    bound_note: Option<Note>,
    staged: Vec<StagedAttachment>,
    server_resources: Option<Vec<Attachment>>,
}

impl Binding {
    pub fn bound_note(&self) -> Option<&Note> {
        self.bound_note.as_ref()
    }

    pub fn staged(&self) -> &[StagedAttachment] {
        &self.staged
    }
}

/// Result of an unstage request. Only `Removed` changed anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unstaged {
    Removed(usize),
    NotStaged,
    NoBinding,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentSource {
    Server,
    Local(PathBuf),
}

/// One row of the attachment picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentEntry {
    pub label: String,
    pub source: AttachmentSource,
    pub attachment: Attachment,
}

#[derive(Debug, Default)]
pub struct BindingRegistry {
    bindings: HashMap<DocumentId, Binding>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `doc` with an empty staging list.
    ///
    /// Called for freshly created documents and notes opened from the
    /// service, never on ordinary edits.
    pub fn init_binding(&mut self, doc: &DocumentId) {
        self.bindings.entry(doc.clone()).or_default().staged.clear();
    }

    pub fn bind_note(&mut self, doc: &DocumentId, note: Note) {
        let binding = self.bindings.entry(doc.clone()).or_default();
        binding.bound_note = Some(note);
        binding.server_resources = None;
    }

    pub fn is_tracked(&self, doc: &DocumentId) -> bool {
        self.bindings.contains_key(doc)
    }

    pub fn bound_note(&self, doc: &DocumentId) -> Option<&Note> {
        self.bindings.get(doc).and_then(Binding::bound_note)
    }

    pub fn staged(&self, doc: &DocumentId) -> &[StagedAttachment] {
        self.bindings
            .get(doc)
            .map(Binding::staged)
            .unwrap_or_default()
    }

    /// Read `path`, hash it and append it to the document's staging list.
    ///
    /// Staging the same path twice yields two entries.
    pub async fn stage_attachment(&mut self, doc: &DocumentId, path: &Path) -> Result<&Attachment> {
        if !self.is_tracked(doc) {
            return Err(SyncError::UntrackedDocument(doc.to_string()));
        }

        let body = tokio::fs::read(path)
            .await
            .map_err(|source| SyncError::AttachmentRead {
                path: path.to_path_buf(),
                source,
            })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        let attachment = Attachment::from_bytes(file_name, mime.essence_str(), body);

        tracing::debug!(doc = %doc, path = %path.display(), size = attachment.data.size, "staged attachment");

        let staged = &mut self
            .bindings
            .get_mut(doc)
            .ok_or_else(|| SyncError::UntrackedDocument(doc.to_string()))?
            .staged;
        staged.push(StagedAttachment {
            path: path.to_path_buf(),
            attachment,
        });
        Ok(&staged[staged.len() - 1].attachment)
    }

    /// Drop every staged entry named `file_name`.
    pub fn unstage_attachment(&mut self, doc: &DocumentId, file_name: &str) -> Unstaged {
        let Some(binding) = self.bindings.get_mut(doc) else {
            return Unstaged::NoBinding;
        };

        // locate first, then remove by predicate
        if !binding.staged.iter().any(|s| s.file_name() == file_name) {
            return Unstaged::NotStaged;
        }
        let before = binding.staged.len();
        binding.staged.retain(|s| s.file_name() != file_name);
        let removed = before - binding.staged.len();

        tracing::debug!(doc = %doc, file_name, removed, "unstaged attachment");
        Unstaged::Removed(removed)
    }

    /// Server resources (fetched once, then snapshotted) followed by staged
    /// local files. Untracked documents have nothing to list.
    pub async fn list_attachments(
        &mut self,
        doc: &DocumentId,
        service: &dyn NoteService,
    ) -> Result<Vec<AttachmentEntry>> {
        let Some(binding) = self.bindings.get_mut(doc) else {
            return Ok(Vec::new());
        };

        if binding.server_resources.is_none() {
            if let Some(note) = &binding.bound_note {
                let resources = service.get_note_resources(&note.guid).await?;
                binding.server_resources = Some(resources);
            }
        }

        let server = binding
            .server_resources
            .iter()
            .flatten()
            .map(|attachment| AttachmentEntry {
                label: format!("{SERVER_LABEL}{}", attachment.file_name()),
                source: AttachmentSource::Server,
                attachment: attachment.clone(),
            });
        let local = binding.staged.iter().map(|staged| AttachmentEntry {
            label: format!("{LOCAL_LABEL}{}", staged.file_name()),
            source: AttachmentSource::Local(staged.path.clone()),
            attachment: staged.attachment.clone(),
        });

        Ok(server.chain(local).collect())
    }

    /// Record a successful publish: bind the returned note, forget the
    /// staged files (the server has them now) and the stale snapshot.
    pub fn commit_publish(&mut self, doc: &DocumentId, note: Note) {
        let binding = self.bindings.entry(doc.clone()).or_default();
        binding.bound_note = Some(note);
        binding.staged.clear();
        binding.server_resources = None;
    }

    /// Forget everything about a closed document, staged files included.
    pub fn clear_on_close(&mut self, doc: &DocumentId) -> Option<Binding> {
        self.bindings.remove(doc)
    }
}

//! Publish reconciliation: turn a locally edited document into the minimal
//! set of service mutations.
//!
//! ```text
//! text ─▶ front matter ─▶ codec ─▶ resolve notebook ─┬─ bound ─▶ update
//!                                                     └─ new ───▶ create
//! ```
//!
//! The update path only uploads resources when there is something to
//! upload: with neither server nor staged resources it calls
//! [`update_note_content`](crate::service::NoteService::update_note_content)
//! and never the resources endpoint.
//!
//! Notebook resolution is by exact name. An unknown name creates a new
//! notebook on the service, so a typo in the `notebook:` field provisions
//! a new notebook rather than failing. An empty name uses the service's
//! default notebook.
//!
//! Bindings and staged attachments are only touched after the final
//! service call succeeds; any error leaves them exactly as they were.

use std::sync::Arc;

use crate::cache::Snapshot;
use crate::codec::embed_resource_references;
use crate::error::Result;
use crate::frontmatter::{extract_front_matter, FrontMatter};
use crate::models::{Attachment, DocumentId, Note, Notebook};
use crate::service::{NoteContent, NoteService};
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub action: PublishAction,
    pub notebook_name: String,
    pub title: String,
    pub note: Note,
}

impl PublishReport {
    /// Notification text, e.g. `Work>>Plans created successfully.`
    pub fn message(&self) -> String {
        let verb = match self.action {
            PublishAction::Created => "created",
            PublishAction::Updated => "updated",
        };
        format!("{}>>{} {} successfully.", self.notebook_name, self.title, verb)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNotebook {
    pub guid: String,
    pub name: String,
    pub created: bool,
}

/// Map a front-matter notebook name onto a notebook guid.
///
/// A newly created notebook is appended to `snapshot` right away since it
/// now exists on the service regardless of what happens next.
pub async fn resolve_notebook(
    snapshot: &mut Snapshot,
    service: &dyn NoteService,
    name: &str,
) -> Result<ResolvedNotebook> {
    if name.is_empty() {
        let Notebook { guid, name } = service.get_default_notebook().await?;
        return Ok(ResolvedNotebook {
            guid,
            name,
            created: false,
        });
    }

    if let Some(notebook) = snapshot.notebook_by_name(name) {
        return Ok(ResolvedNotebook {
            guid: notebook.guid.clone(),
            name: notebook.name.clone(),
            created: false,
        });
    }

    tracing::warn!(notebook = name, "notebook not found locally, creating it");
    let notebook = service.create_notebook(name).await?;
    snapshot.add_notebook(notebook.clone());
    Ok(ResolvedNotebook {
        guid: notebook.guid,
        name: notebook.name,
        created: true,
    })
}

/// Publish `text` as the content of `doc`.
pub async fn publish(session: &mut Session, doc: &DocumentId, text: &str) -> Result<PublishReport> {
    let extracted = extract_front_matter(text)?;
    let front = FrontMatter::from(&extracted.metadata);
    let markup = session.codec.to_markup(extracted.content)?;

    let service = Arc::clone(&session.service);
    let codec = Arc::clone(&session.codec);
    let snapshot = session.cache.ensure_ready(service.as_ref()).await?;
    let notebook = resolve_notebook(snapshot, service.as_ref(), &front.notebook).await?;

    let staged: Vec<Attachment> = session
        .bindings
        .staged(doc)
        .iter()
        .map(|s| s.attachment.clone())
        .collect();
    let bound_guid = session.bindings.bound_note(doc).map(|n| n.guid.clone());

    let content = |markup: String| NoteContent {
        title: front.title.clone(),
        markup,
        tag_names: front.tags.clone(),
        notebook_guid: notebook.guid.clone(),
    };

    let (action, note) = match bound_guid {
        Some(guid) => {
            let server = service.get_note_resources(&guid).await?;
            if server.is_empty() && staged.is_empty() {
                tracing::info!(doc = %doc, note = %guid, "updating note content");
                let note = service.update_note_content(&guid, &content(markup)).await?;
                (PublishAction::Updated, note)
            } else {
                tracing::info!(
                    doc = %doc,
                    note = %guid,
                    staged = staged.len(),
                    server = server.len(),
                    "updating note with resources"
                );
                let merged: Vec<Attachment> = staged.into_iter().chain(server).collect();
                let markup = embed_resource_references(codec.as_ref(), &markup, &merged)?;
                let mut note = service
                    .update_note_resources(&guid, &content(markup), &merged)
                    .await?;
                if note.resources.is_none() {
                    note.resources = Some(merged);
                }
                (PublishAction::Updated, note)
            }
        }
        None => {
            tracing::info!(doc = %doc, staged = staged.len(), "creating note");
            let markup = embed_resource_references(codec.as_ref(), &markup, &staged)?;
            let mut note = service.create_note(&content(markup), &staged).await?;
            if note.resources.is_none() && !staged.is_empty() {
                note.resources = Some(staged);
            }
            (PublishAction::Created, note)
        }
    };

    // every service call succeeded; commit
    if let Some(snapshot) = session.cache.snapshot_mut() {
        snapshot.upsert_note(Note {
            resources: None,
            ..note.clone()
        });
    }
    session.bindings.commit_publish(doc, note.clone());

    Ok(PublishReport {
        action,
        notebook_name: notebook.name,
        title: front.title,
        note,
    })
}

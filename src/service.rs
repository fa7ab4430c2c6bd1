//! The remote note service seam.
//!
//! The core never talks to the network itself. Everything it needs from the
//! note service goes through [`NoteService`], so a production client (with
//! its own authentication, retry and backoff) and the in-process
//! [`MemoryNoteService`](crate::memory::MemoryNoteService) are
//! interchangeable.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`list_tags`](NoteService::list_tags) | All tags in the account |
//! | [`list_notebooks`](NoteService::list_notebooks) | All notebooks |
//! | [`list_all_note_metadata`](NoteService::list_all_note_metadata) | Note metadata in one notebook, up to the service's page limit |
//! | [`create_notebook`](NoteService::create_notebook) | Create a notebook by name |
//! | [`get_default_notebook`](NoteService::get_default_notebook) | The account's default notebook |
//! | [`create_note`](NoteService::create_note) | Create a note with resources |
//! | [`update_note_content`](NoteService::update_note_content) | Update a note without touching its resources |
//! | [`update_note_resources`](NoteService::update_note_resources) | Update a note and replace its resource set |
//! | [`get_note_resources`](NoteService::get_note_resources) | Resource metadata of a note |
//! | [`get_note_content`](NoteService::get_note_content) | Markup of a note |
//! | [`get_resource`](NoteService::get_resource) | One resource, body included |
//! | [`search_notes`](NoteService::search_notes) | Notes matching a service query |
//! | [`list_recent_notes`](NoteService::list_recent_notes) | Recently updated notes |
//!
//! Every method may fail with [`SyncError::Transport`](crate::error::SyncError::Transport)
//! or [`SyncError::Service`](crate::error::SyncError::Service). The core
//! surfaces both and never retries.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Attachment, Note, Notebook, Tag};

/// Fields sent with every note create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteContent {
    pub title: String,
    pub markup: String,
    pub tag_names: Vec<String>,
    pub notebook_guid: String,
}

#[async_trait]
pub trait NoteService: Send + Sync {
    async fn list_tags(&self) -> Result<Vec<Tag>>;

    async fn list_notebooks(&self) -> Result<Vec<Notebook>>;

    /// Titles and ids only, no bodies.
    async fn list_all_note_metadata(&self, notebook_guid: &str) -> Result<Vec<Note>>;

    async fn create_notebook(&self, name: &str) -> Result<Notebook>;

    async fn get_default_notebook(&self) -> Result<Notebook>;

    async fn create_note(&self, content: &NoteContent, resources: &[Attachment]) -> Result<Note>;

    async fn update_note_content(&self, guid: &str, content: &NoteContent) -> Result<Note>;

    /// Update a note and replace its resources with `resources`.
    ///
    /// Server-known resources in the set carry their guid; staged ones
    /// carry their body.
    async fn update_note_resources(
        &self,
        guid: &str,
        content: &NoteContent,
        resources: &[Attachment],
    ) -> Result<Note>;

    /// Resource metadata attached to a note. Empty when the note has none.
    async fn get_note_resources(&self, guid: &str) -> Result<Vec<Attachment>>;

    async fn get_note_content(&self, guid: &str) -> Result<String>;

    async fn get_resource(&self, guid: &str) -> Result<Attachment>;

    async fn search_notes(&self, query: &str) -> Result<Vec<Note>>;

    async fn list_recent_notes(&self) -> Result<Vec<Note>>;
}

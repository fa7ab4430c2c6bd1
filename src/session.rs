//! Session-scoped context shared by every core operation.
//!
//! A [`Session`] owns the synchronization cache and the binding registry for
//! the lifetime of one editor session, together with the service and codec
//! collaborators. Nothing in it is persisted: dropping the session drops
//! every cached notebook, binding and staged attachment.

use std::sync::Arc;

use crate::bindings::BindingRegistry;
use crate::cache::{Snapshot, SyncCache, SyncSummary};
use crate::codec::ContentCodec;
use crate::error::Result;
use crate::frontmatter::render_front_matter;
use crate::models::{DocumentId, Note};
use crate::service::NoteService;

pub struct Session {
    pub(crate) service: Arc<dyn NoteService>,
    pub(crate) codec: Arc<dyn ContentCodec>,
    pub(crate) cache: SyncCache,
    pub(crate) bindings: BindingRegistry,
}

impl Session {
    pub fn new(service: Arc<dyn NoteService>, codec: Arc<dyn ContentCodec>) -> Self {
        Self {
            service,
            codec,
            cache: SyncCache::new(),
            bindings: BindingRegistry::new(),
        }
    }

    pub fn service(&self) -> &dyn NoteService {
        self.service.as_ref()
    }

    pub fn cache(&self) -> &SyncCache {
        &self.cache
    }

    pub fn bindings(&self) -> &BindingRegistry {
        &self.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut BindingRegistry {
        &mut self.bindings
    }

    /// Full, explicit resynchronization.
    pub async fn synchronize(&mut self) -> Result<SyncSummary> {
        self.cache.synchronize(self.service.as_ref()).await
    }

    /// Lazily synchronize on first use and hand back the snapshot.
    pub async fn ensure_ready(&mut self) -> Result<&mut Snapshot> {
        self.cache.ensure_ready(self.service.as_ref()).await
    }

    /// Fetch a note's markup and render it as an editable document:
    /// header first, converted body after.
    pub async fn load_note_document(&mut self, note: &Note) -> Result<String> {
        let service = Arc::clone(&self.service);
        let snapshot = self.cache.ensure_ready(service.as_ref()).await?;
        let tags = snapshot.tag_names_for(&note.tag_guids);
        let notebook = snapshot
            .notebook_by_guid(&note.notebook_guid)
            .map(|nb| nb.name.clone())
            .unwrap_or_default();

        let markup = service.get_note_content(&note.guid).await?;
        let body = self.codec.to_markdown(&markup)?;
        Ok(format!("{}{}", render_front_matter(&note.title, &tags, &notebook), body))
    }

    /// Track a document that was just opened from `note`.
    pub fn bind_opened_note(&mut self, doc: &DocumentId, note: Note) {
        self.bindings.init_binding(doc);
        self.bindings.bind_note(doc, note);
    }

    /// Track a brand-new, unpublished document.
    pub fn track_new_document(&mut self, doc: &DocumentId) {
        self.bindings.init_binding(doc);
    }

    pub fn close_document(&mut self, doc: &DocumentId) {
        if self.bindings.clear_on_close(doc).is_some() {
            tracing::debug!(doc = %doc, "document closed, binding dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::PlainTextCodec;
    use crate::memory::MemoryNoteService;

    #[tokio::test]
    async fn load_note_document_prefixes_header() {
        let service = Arc::new(MemoryNoteService::new());
        let nb = service.add_notebook("Journal");
        let tag = service.add_tag("daily");
        let markup = PlainTextCodec.to_markup("Dear diary").unwrap();
        let note = service.add_note(&nb.guid, "Monday", &markup, vec![tag.guid.clone()], &[]);

        let mut session = Session::new(service.clone(), Arc::new(PlainTextCodec));
        let text = session.load_note_document(&note).await.unwrap();

        assert_eq!(
            text,
            "---\ntitle: Monday\ntags: daily\nnotebook: Journal\n---\nDear diary"
        );
        assert!(session.cache().is_ready());
    }
}

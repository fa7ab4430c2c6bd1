//! In-memory [`NoteService`] implementation for tests and offline use.
//!
//! Keeps notebooks, notes, tags and resources in maps behind
//! `std::sync::RwLock`. Every call is appended to a call log so tests can
//! assert which endpoints a flow touched, and individual operations can be
//! told to fail once with a transport error.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{Result, SyncError};
use crate::models::{Attachment, Note, Notebook, Tag};
use crate::service::{NoteContent, NoteService};

/// Domain name used in service-domain errors.
pub const DOMAIN: &str = "NoteStore";

const DEFAULT_PAGE_LIMIT: usize = 200;
const RECENT_LIMIT: usize = 10;

struct StoredNote {
    note: Note,
    markup: String,
    resource_guids: Vec<String>,
    updated_seq: u64,
}

#[derive(Default)]
struct Inner {
    notebooks: Vec<Notebook>,
    default_notebook: Option<String>,
    tags: Vec<Tag>,
    notes: HashMap<String, StoredNote>,
    resources: HashMap<String, Attachment>,
    seq: u64,
}

impl Inner {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn require_notebook(&self, guid: &str) -> Result<()> {
        if self.notebooks.iter().any(|nb| nb.guid == guid) {
            Ok(())
        } else {
            Err(domain_error("ENML_VALIDATION", &format!("Note.notebookGuid {guid}")))
        }
    }

    fn tag_guids_for(&mut self, names: &[String]) -> Vec<String> {
        names
            .iter()
            .map(|name| match self.tags.iter().find(|t| &t.name == name) {
                Some(tag) => tag.guid.clone(),
                None => {
                    let tag = Tag {
                        guid: new_guid(),
                        name: name.clone(),
                    };
                    let guid = tag.guid.clone();
                    self.tags.push(tag);
                    guid
                }
            })
            .collect()
    }

    /// Keep known resources by guid, store new ones under fresh guids.
    fn store_resources(&mut self, resources: &[Attachment]) -> Vec<String> {
        resources
            .iter()
            .map(|resource| match &resource.guid {
                Some(guid) if self.resources.contains_key(guid) => guid.clone(),
                _ => {
                    let guid = new_guid();
                    let mut stored = resource.clone();
                    stored.guid = Some(guid.clone());
                    self.resources.insert(guid.clone(), stored);
                    guid
                }
            })
            .collect()
    }

    fn resource_metadata(&self, guids: &[String]) -> Vec<Attachment> {
        guids
            .iter()
            .filter_map(|guid| self.resources.get(guid))
            .map(|resource| {
                let mut meta = resource.clone();
                meta.data.body.clear();
                meta
            })
            .collect()
    }

    fn note_with_resources(&self, stored: &StoredNote) -> Note {
        let mut note = stored.note.clone();
        note.resources = if stored.resource_guids.is_empty() {
            None
        } else {
            Some(self.resource_metadata(&stored.resource_guids))
        };
        note
    }
}

fn new_guid() -> String {
    Uuid::new_v4().to_string()
}

fn domain_error(code: &str, parameter: &str) -> SyncError {
    SyncError::Service {
        domain: DOMAIN.to_string(),
        code: code.to_string(),
        parameter: parameter.to_string(),
    }
}

/// In-process note service.
pub struct MemoryNoteService {
    inner: RwLock<Inner>,
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, (u16, String)>>,
    page_limit: usize,
}

impl MemoryNoteService {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }

    pub fn with_page_limit(mut self, limit: usize) -> Self {
        self.page_limit = limit;
        self
    }

    /// Insert a notebook; the first one inserted becomes the default.
    pub fn insert_notebook(&self, notebook: Notebook) -> Notebook {
        let mut inner = self.inner.write().unwrap();
        if inner.default_notebook.is_none() {
            inner.default_notebook = Some(notebook.guid.clone());
        }
        inner.notebooks.push(notebook.clone());
        notebook
    }

    pub fn add_notebook(&self, name: &str) -> Notebook {
        self.insert_notebook(Notebook {
            guid: new_guid(),
            name: name.to_string(),
        })
    }

    pub fn set_default_notebook(&self, guid: &str) {
        self.inner.write().unwrap().default_notebook = Some(guid.to_string());
    }

    pub fn add_tag(&self, name: &str) -> Tag {
        let tag = Tag {
            guid: new_guid(),
            name: name.to_string(),
        };
        self.inner.write().unwrap().tags.push(tag.clone());
        tag
    }

    /// Seed a note directly, bypassing the call log.
    pub fn add_note(
        &self,
        notebook_guid: &str,
        title: &str,
        markup: &str,
        tag_guids: Vec<String>,
        resources: &[Attachment],
    ) -> Note {
        let mut inner = self.inner.write().unwrap();
        let resource_guids = inner.store_resources(resources);
        let note = Note {
            guid: new_guid(),
            title: title.to_string(),
            notebook_guid: notebook_guid.to_string(),
            tag_guids,
            resources: None,
        };
        let updated_seq = inner.next_seq();
        inner.notes.insert(
            note.guid.clone(),
            StoredNote {
                note: note.clone(),
                markup: markup.to_string(),
                resource_guids,
                updated_seq,
            },
        );
        note
    }

    /// Make the next call to `operation` fail with an HTTP-style error.
    ///
    /// `list_all_note_metadata` also accepts `list_all_note_metadata:<guid>`
    /// to target a single notebook.
    pub fn fail_next(&self, operation: &str, status: u16, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(operation.to_string(), (status, message.to_string()));
    }

    /// Every call made so far, in order, by operation name.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == operation)
            .count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn note_markup(&self, guid: &str) -> Option<String> {
        self.inner
            .read()
            .unwrap()
            .notes
            .get(guid)
            .map(|stored| stored.markup.clone())
    }

    pub fn notebooks(&self) -> Vec<Notebook> {
        self.inner.read().unwrap().notebooks.clone()
    }

    fn record(&self, operation: &str, key: Option<&str>) -> Result<()> {
        self.calls.lock().unwrap().push(operation.to_string());

        let mut failures = self.failures.lock().unwrap();
        let keyed = key.map(|k| format!("{operation}:{k}"));
        let injected = keyed
            .and_then(|k| failures.remove(&k))
            .or_else(|| failures.remove(operation));
        match injected {
            Some((status, message)) => Err(SyncError::Transport { status, message }),
            None => Ok(()),
        }
    }
}

impl Default for MemoryNoteService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NoteService for MemoryNoteService {
    async fn list_tags(&self) -> Result<Vec<Tag>> {
        self.record("list_tags", None)?;
        Ok(self.inner.read().unwrap().tags.clone())
    }

    async fn list_notebooks(&self) -> Result<Vec<Notebook>> {
        self.record("list_notebooks", None)?;
        Ok(self.inner.read().unwrap().notebooks.clone())
    }

    async fn list_all_note_metadata(&self, notebook_guid: &str) -> Result<Vec<Note>> {
        self.record("list_all_note_metadata", Some(notebook_guid))?;
        let inner = self.inner.read().unwrap();
        let mut stored: Vec<&StoredNote> = inner
            .notes
            .values()
            .filter(|s| s.note.notebook_guid == notebook_guid)
            .collect();
        stored.sort_by(|a, b| b.updated_seq.cmp(&a.updated_seq));
        Ok(stored
            .into_iter()
            .take(self.page_limit)
            .map(|s| s.note.clone())
            .collect())
    }

    async fn create_notebook(&self, name: &str) -> Result<Notebook> {
        self.record("create_notebook", None)?;
        let mut inner = self.inner.write().unwrap();
        if inner.notebooks.iter().any(|nb| nb.name == name) {
            return Err(domain_error("DATA_CONFLICT", "Notebook.name"));
        }
        let notebook = Notebook {
            guid: new_guid(),
            name: name.to_string(),
        };
        inner.notebooks.push(notebook.clone());
        Ok(notebook)
    }

    async fn get_default_notebook(&self) -> Result<Notebook> {
        self.record("get_default_notebook", None)?;
        let inner = self.inner.read().unwrap();
        inner
            .default_notebook
            .as_ref()
            .and_then(|guid| inner.notebooks.iter().find(|nb| &nb.guid == guid))
            .cloned()
            .ok_or_else(|| domain_error("DATA_REQUIRED", "defaultNotebook"))
    }

    async fn create_note(&self, content: &NoteContent, resources: &[Attachment]) -> Result<Note> {
        self.record("create_note", None)?;
        let mut inner = self.inner.write().unwrap();
        inner.require_notebook(&content.notebook_guid)?;

        let tag_guids = inner.tag_guids_for(&content.tag_names);
        let resource_guids = inner.store_resources(resources);
        let updated_seq = inner.next_seq();
        let stored = StoredNote {
            note: Note {
                guid: new_guid(),
                title: content.title.clone(),
                notebook_guid: content.notebook_guid.clone(),
                tag_guids,
                resources: None,
            },
            markup: content.markup.clone(),
            resource_guids,
            updated_seq,
        };
        let note = inner.note_with_resources(&stored);
        inner.notes.insert(note.guid.clone(), stored);
        Ok(note)
    }

    async fn update_note_content(&self, guid: &str, content: &NoteContent) -> Result<Note> {
        self.record("update_note_content", None)?;
        let mut inner = self.inner.write().unwrap();
        inner.require_notebook(&content.notebook_guid)?;
        if !inner.notes.contains_key(guid) {
            return Err(domain_error("UNKNOWN", &format!("Note.guid {guid}")));
        }

        let tag_guids = inner.tag_guids_for(&content.tag_names);
        let updated_seq = inner.next_seq();
        let Some(stored) = inner.notes.get_mut(guid) else {
            return Err(domain_error("UNKNOWN", &format!("Note.guid {guid}")));
        };
        stored.note.title = content.title.clone();
        stored.note.notebook_guid = content.notebook_guid.clone();
        stored.note.tag_guids = tag_guids;
        stored.markup = content.markup.clone();
        stored.updated_seq = updated_seq;
        Ok(stored.note.clone())
    }

    async fn update_note_resources(
        &self,
        guid: &str,
        content: &NoteContent,
        resources: &[Attachment],
    ) -> Result<Note> {
        self.record("update_note_resources", None)?;
        let mut inner = self.inner.write().unwrap();
        inner.require_notebook(&content.notebook_guid)?;
        if !inner.notes.contains_key(guid) {
            return Err(domain_error("UNKNOWN", &format!("Note.guid {guid}")));
        }

        let tag_guids = inner.tag_guids_for(&content.tag_names);
        let resource_guids = inner.store_resources(resources);
        let updated_seq = inner.next_seq();
        let Some(stored) = inner.notes.get_mut(guid) else {
            return Err(domain_error("UNKNOWN", &format!("Note.guid {guid}")));
        };
        stored.note.title = content.title.clone();
        stored.note.notebook_guid = content.notebook_guid.clone();
        stored.note.tag_guids = tag_guids;
        stored.markup = content.markup.clone();
        stored.resource_guids = resource_guids;
        stored.updated_seq = updated_seq;

        let stored = &inner.notes[guid];
        Ok(inner.note_with_resources(stored))
    }

    async fn get_note_resources(&self, guid: &str) -> Result<Vec<Attachment>> {
        self.record("get_note_resources", None)?;
        let inner = self.inner.read().unwrap();
        let stored = inner
            .notes
            .get(guid)
            .ok_or_else(|| domain_error("UNKNOWN", &format!("Note.guid {guid}")))?;
        Ok(inner.resource_metadata(&stored.resource_guids))
    }

    async fn get_note_content(&self, guid: &str) -> Result<String> {
        self.record("get_note_content", None)?;
        self.inner
            .read()
            .unwrap()
            .notes
            .get(guid)
            .map(|stored| stored.markup.clone())
            .ok_or_else(|| domain_error("UNKNOWN", &format!("Note.guid {guid}")))
    }

    async fn get_resource(&self, guid: &str) -> Result<Attachment> {
        self.record("get_resource", None)?;
        self.inner
            .read()
            .unwrap()
            .resources
            .get(guid)
            .cloned()
            .ok_or_else(|| domain_error("UNKNOWN", &format!("Resource.guid {guid}")))
    }

    async fn search_notes(&self, query: &str) -> Result<Vec<Note>> {
        self.record("search_notes", None)?;
        let needle = query.to_lowercase();
        let inner = self.inner.read().unwrap();
        let mut hits: Vec<&StoredNote> = inner
            .notes
            .values()
            .filter(|s| {
                s.note.title.to_lowercase().contains(&needle)
                    || s.markup.to_lowercase().contains(&needle)
            })
            .collect();
        hits.sort_by(|a, b| b.updated_seq.cmp(&a.updated_seq));
        Ok(hits.into_iter().map(|s| s.note.clone()).collect())
    }

    async fn list_recent_notes(&self) -> Result<Vec<Note>> {
        self.record("list_recent_notes", None)?;
        let inner = self.inner.read().unwrap();
        let mut stored: Vec<&StoredNote> = inner.notes.values().collect();
        stored.sort_by(|a, b| b.updated_seq.cmp(&a.updated_seq));
        Ok(stored
            .into_iter()
            .take(RECENT_LIMIT)
            .map(|s| s.note.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(notebook_guid: &str, title: &str) -> NoteContent {
        NoteContent {
            title: title.to_string(),
            markup: "<en-note></en-note>".to_string(),
            tag_names: vec!["a".to_string()],
            notebook_guid: notebook_guid.to_string(),
        }
    }

    #[tokio::test]
    async fn create_then_list_metadata() {
        let service = MemoryNoteService::new();
        let nb = service.add_notebook("Work");
        let note = service.create_note(&content(&nb.guid, "T"), &[]).await.unwrap();

        let listed = service.list_all_note_metadata(&nb.guid).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].guid, note.guid);
        assert_eq!(service.list_tags().await.unwrap()[0].name, "a");
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let service = MemoryNoteService::new();
        service.fail_next("list_notebooks", 503, "Service Unavailable");
        let err = service.list_notebooks().await.unwrap_err();
        assert!(matches!(err, SyncError::Transport { status: 503, .. }));
        assert!(service.list_notebooks().await.is_ok());
        assert_eq!(service.call_count("list_notebooks"), 2);
    }

    #[tokio::test]
    async fn resources_keep_guid_and_drop_body_in_metadata() {
        let service = MemoryNoteService::new();
        let nb = service.add_notebook("Work");
        let attachment = Attachment::from_bytes("a.txt", "text/plain", b"abc".to_vec());
        let note = service
            .create_note(&content(&nb.guid, "T"), &[attachment])
            .await
            .unwrap();

        let resources = service.get_note_resources(&note.guid).await.unwrap();
        assert_eq!(resources.len(), 1);
        assert!(resources[0].data.body.is_empty());
        let guid = resources[0].guid.clone().unwrap();

        let full = service.get_resource(&guid).await.unwrap();
        assert_eq!(full.data.body, b"abc");

        let updated = service
            .update_note_resources(&note.guid, &content(&nb.guid, "T2"), &resources)
            .await
            .unwrap();
        let kept = updated.resources.unwrap();
        assert_eq!(kept[0].guid.as_deref(), Some(guid.as_str()));
    }

    #[tokio::test]
    async fn unknown_notebook_is_a_domain_error() {
        let service = MemoryNoteService::new();
        let err = service.create_note(&content("nope", "T"), &[]).await.unwrap_err();
        assert!(matches!(err, SyncError::Service { .. }));
    }
}

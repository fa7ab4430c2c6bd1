//! Synchronization cache: notebooks, notes grouped by notebook, tag names.
//!
//! The cache is a state machine:
//!
//! ```text
//!  Uninitialized ──synchronize──▶ Refreshing ──ok──▶ Ready
//!        ▲                            │                 │
//!        └────────── err ─────────────┘◀──synchronize───┘
//!                 (previous snapshot restored)
//! ```
//!
//! A refresh is never incremental and never partial: the new [`Snapshot`]
//! is only installed once every fetch has resolved. If any fetch fails the
//! previous snapshot (if any) stays in effect.

use std::collections::{BTreeMap, HashMap};

use futures::future::try_join_all;

use crate::error::{Result, SyncError};
use crate::models::{Note, Notebook, Tag};
use crate::service::NoteService;

/// One complete, consistent view of the account's metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    notebooks: Vec<Notebook>,
    notes_by_notebook: HashMap<String, Vec<Note>>,
    tag_names: BTreeMap<String, String>,
}

/// Notes of one notebook, as seen by a picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotebookNotes<'a> {
    Notes(&'a [Note]),
    /// The notebook exists but holds no notes.
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub tags: usize,
    pub notebooks: usize,
    pub notes: usize,
}

impl Snapshot {
    pub fn from_parts(notebooks: Vec<Notebook>, notes: Vec<Note>, tags: Vec<Tag>) -> Self {
        let mut notes_by_notebook: HashMap<String, Vec<Note>> = HashMap::new();
        for note in notes {
            notes_by_notebook
                .entry(note.notebook_guid.clone())
                .or_default()
                .push(note);
        }
        let tag_names = tags.into_iter().map(|t| (t.guid, t.name)).collect();
        Self {
            notebooks,
            notes_by_notebook,
            tag_names,
        }
    }

    pub fn notebooks(&self) -> &[Notebook] {
        &self.notebooks
    }

    pub fn notebook_names(&self) -> Vec<String> {
        self.notebooks.iter().map(|nb| nb.name.clone()).collect()
    }

    /// Exact, case-sensitive name match.
    pub fn notebook_by_name(&self, name: &str) -> Option<&Notebook> {
        self.notebooks.iter().find(|nb| nb.name == name)
    }

    pub fn notebook_by_guid(&self, guid: &str) -> Option<&Notebook> {
        self.notebooks.iter().find(|nb| nb.guid == guid)
    }

    pub fn notes_in_notebook(&self, name: &str) -> Result<NotebookNotes<'_>> {
        let notebook = self
            .notebook_by_name(name)
            .ok_or_else(|| SyncError::NotebookNotFound(name.to_string()))?;
        Ok(match self.notes_by_notebook.get(&notebook.guid) {
            Some(notes) if !notes.is_empty() => NotebookNotes::Notes(notes),
            _ => NotebookNotes::Empty,
        })
    }

    pub fn note_count(&self) -> usize {
        self.notes_by_notebook.values().map(Vec::len).sum()
    }

    pub fn tag_name(&self, guid: &str) -> Option<&str> {
        self.tag_names.get(guid).map(String::as_str)
    }

    /// Names for `guids`, skipping any the cache does not know.
    pub fn tag_names_for(&self, guids: &[String]) -> Vec<String> {
        guids
            .iter()
            .filter_map(|guid| self.tag_name(guid))
            .map(str::to_string)
            .collect()
    }

    /// All known tag names, sorted and de-duplicated.
    pub fn tag_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tag_names.values().cloned().collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn add_notebook(&mut self, notebook: Notebook) {
        if self.notebook_by_guid(&notebook.guid).is_none() {
            self.notebooks.push(notebook);
        }
    }

    /// Insert or replace a note in its notebook's slot, creating the slot.
    pub fn upsert_note(&mut self, note: Note) {
        for notes in self.notes_by_notebook.values_mut() {
            notes.retain(|n| n.guid != note.guid);
        }
        self.notes_by_notebook
            .entry(note.notebook_guid.clone())
            .or_default()
            .push(note);
    }
}

#[derive(Debug, Default)]
enum CacheState {
    #[default]
    Uninitialized,
    Refreshing {
        previous: Option<Snapshot>,
    },
    Ready(Snapshot),
}

/// Session-scoped metadata cache with lazy initialization.
#[derive(Debug, Default)]
pub struct SyncCache {
    state: CacheState,
}

impl SyncCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, CacheState::Ready(_))
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(self.state, CacheState::Refreshing { .. })
    }

    /// The snapshot currently in effect.
    ///
    /// While a refresh is in flight this is the previous snapshot.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match &self.state {
            CacheState::Ready(snapshot) => Some(snapshot),
            CacheState::Refreshing { previous } => previous.as_ref(),
            CacheState::Uninitialized => None,
        }
    }

    pub fn snapshot_mut(&mut self) -> Option<&mut Snapshot> {
        match &mut self.state {
            CacheState::Ready(snapshot) => Some(snapshot),
            CacheState::Refreshing { previous } => previous.as_mut(),
            CacheState::Uninitialized => None,
        }
    }

    /// Refetch everything and install the result atomically.
    pub async fn synchronize(&mut self, service: &dyn NoteService) -> Result<SyncSummary> {
        let previous = match std::mem::take(&mut self.state) {
            CacheState::Ready(snapshot) => Some(snapshot),
            CacheState::Refreshing { previous } => previous,
            CacheState::Uninitialized => None,
        };
        self.state = CacheState::Refreshing { previous };

        match fetch_snapshot(service).await {
            Ok(snapshot) => {
                let summary = SyncSummary {
                    tags: snapshot.tag_names.len(),
                    notebooks: snapshot.notebooks.len(),
                    notes: snapshot.note_count(),
                };
                tracing::info!(
                    tags = summary.tags,
                    notebooks = summary.notebooks,
                    notes = summary.notes,
                    "synchronization finished"
                );
                self.state = CacheState::Ready(snapshot);
                Ok(summary)
            }
            Err(err) => {
                tracing::warn!("synchronization failed, keeping previous cache: {}", err);
                self.restore();
                Err(err)
            }
        }
    }

    /// Synchronize unless a snapshot is already installed.
    pub async fn ensure_ready(&mut self, service: &dyn NoteService) -> Result<&mut Snapshot> {
        if !self.is_ready() {
            tracing::debug!("cache not ready, synchronizing");
            self.synchronize(service).await?;
        }
        match &mut self.state {
            CacheState::Ready(snapshot) => Ok(snapshot),
            _ => Err(SyncError::Unexpected("cache not ready after synchronization".into())),
        }
    }

    /// Empty when the cache has never been synchronized.
    pub fn list_notebook_names(&self) -> Vec<String> {
        self.snapshot().map(Snapshot::notebook_names).unwrap_or_default()
    }

    pub fn list_notes_in_notebook(&self, name: &str) -> Result<NotebookNotes<'_>> {
        match self.snapshot() {
            Some(snapshot) => snapshot.notes_in_notebook(name),
            None => Err(SyncError::NotebookNotFound(name.to_string())),
        }
    }

    fn restore(&mut self) {
        self.state = match std::mem::take(&mut self.state) {
            CacheState::Refreshing {
                previous: Some(snapshot),
            } => CacheState::Ready(snapshot),
            CacheState::Refreshing { previous: None } => CacheState::Uninitialized,
            other => other,
        };
    }
}

async fn fetch_snapshot(service: &dyn NoteService) -> Result<Snapshot> {
    let tags = service.list_tags().await?;
    let notebooks = service.list_notebooks().await?;
    tracing::debug!(notebooks = notebooks.len(), "fetching note metadata");

    let fetches = notebooks
        .iter()
        .map(|nb| service.list_all_note_metadata(&nb.guid));
    let notes: Vec<Note> = try_join_all(fetches).await?.into_iter().flatten().collect();

    Ok(Snapshot::from_parts(notebooks, notes, tags))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(guid: &str, title: &str, notebook: &str) -> Note {
        Note {
            guid: guid.into(),
            title: title.into(),
            notebook_guid: notebook.into(),
            tag_guids: vec![],
            resources: None,
        }
    }

    fn snapshot() -> Snapshot {
        Snapshot::from_parts(
            vec![
                Notebook { guid: "nb1".into(), name: "Work".into() },
                Notebook { guid: "nb2".into(), name: "Empty".into() },
            ],
            vec![note("n1", "Plan", "nb1"), note("n2", "Review", "nb1")],
            vec![
                Tag { guid: "t1".into(), name: "urgent".into() },
                Tag { guid: "t2".into(), name: "later".into() },
            ],
        )
    }

    #[test]
    fn empty_notebook_is_distinct_from_missing_notebook() {
        let snap = snapshot();
        assert_eq!(snap.notes_in_notebook("Empty").unwrap(), NotebookNotes::Empty);
        assert!(matches!(
            snap.notes_in_notebook("Nope"),
            Err(SyncError::NotebookNotFound(name)) if name == "Nope"
        ));
        match snap.notes_in_notebook("Work").unwrap() {
            NotebookNotes::Notes(notes) => assert_eq!(notes.len(), 2),
            NotebookNotes::Empty => panic!("expected notes"),
        }
    }

    #[test]
    fn tag_names_resolve_and_skip_unknown() {
        let snap = snapshot();
        let names = snap.tag_names_for(&["t2".into(), "missing".into(), "t1".into()]);
        assert_eq!(names, vec!["later", "urgent"]);
        assert_eq!(snap.tag_names(), vec!["later", "urgent"]);
    }

    #[test]
    fn upsert_note_creates_slot_and_replaces_existing() {
        let mut snap = snapshot();
        snap.upsert_note(note("n3", "Fresh", "nb2"));
        assert!(matches!(snap.notes_in_notebook("Empty").unwrap(), NotebookNotes::Notes(n) if n.len() == 1));

        snap.upsert_note(note("n1", "Plan v2", "nb2"));
        match snap.notes_in_notebook("Work").unwrap() {
            NotebookNotes::Notes(notes) => assert!(notes.iter().all(|n| n.guid != "n1")),
            NotebookNotes::Empty => panic!("Work still holds n2"),
        }
        assert_eq!(snap.note_count(), 3);
    }

    #[test]
    fn add_notebook_ignores_known_guid() {
        let mut snap = snapshot();
        snap.add_notebook(Notebook { guid: "nb1".into(), name: "Work".into() });
        snap.add_notebook(Notebook { guid: "nb3".into(), name: "New".into() });
        assert_eq!(snap.notebook_names(), vec!["Work", "Empty", "New"]);
    }

    #[test]
    fn uninitialized_cache_reads_are_empty() {
        let cache = SyncCache::new();
        assert!(!cache.is_ready());
        assert!(cache.list_notebook_names().is_empty());
        assert!(cache.list_notes_in_notebook("Work").is_err());
    }
}

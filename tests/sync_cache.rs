//! Integration tests for synchronization: lazy initialization, grouping of
//! note metadata by notebook, and fail-atomic refresh.

use std::sync::Arc;

use notesync::cache::{NotebookNotes, SyncCache};
use notesync::codec::PlainTextCodec;
use notesync::error::SyncError;
use notesync::memory::MemoryNoteService;
use notesync::models::Notebook;
use notesync::session::Session;

fn seeded() -> MemoryNoteService {
    let service = MemoryNoteService::new();
    let work = service.insert_notebook(Notebook {
        guid: "nb-work".into(),
        name: "Work".into(),
    });
    let home = service.insert_notebook(Notebook {
        guid: "nb-home".into(),
        name: "Home".into(),
    });
    service.add_notebook("Archive");
    let tag = service.add_tag("urgent");
    service.add_note(&work.guid, "Plan", "<en-note/>", vec![tag.guid.clone()], &[]);
    service.add_note(&work.guid, "Review", "<en-note/>", vec![], &[]);
    service.add_note(&home.guid, "Groceries", "<en-note/>", vec![], &[]);
    service
}

#[tokio::test]
async fn synchronize_groups_notes_by_notebook() {
    let service = seeded();
    let mut cache = SyncCache::new();

    let summary = cache.synchronize(&service).await.unwrap();
    assert_eq!(summary.notebooks, 3);
    assert_eq!(summary.notes, 3);
    assert_eq!(summary.tags, 1);

    assert_eq!(cache.list_notebook_names(), vec!["Work", "Home", "Archive"]);
    match cache.list_notes_in_notebook("Work").unwrap() {
        NotebookNotes::Notes(notes) => {
            let mut titles: Vec<&str> = notes.iter().map(|n| n.title.as_str()).collect();
            titles.sort();
            assert_eq!(titles, vec!["Plan", "Review"]);
        }
        NotebookNotes::Empty => panic!("Work has notes"),
    }
    assert_eq!(
        cache.list_notes_in_notebook("Archive").unwrap(),
        NotebookNotes::Empty
    );
    assert!(matches!(
        cache.list_notes_in_notebook("Nowhere"),
        Err(SyncError::NotebookNotFound(_))
    ));

    // one metadata fetch per notebook
    assert_eq!(service.call_count("list_all_note_metadata"), 3);
}

#[tokio::test]
async fn failed_metadata_fetch_keeps_previous_cache() {
    let service = seeded();
    let mut cache = SyncCache::new();
    cache.synchronize(&service).await.unwrap();
    let before = cache.snapshot().cloned().unwrap();

    // the server changes, but the refresh fails half way
    service.add_notebook("Fresh");
    service.fail_next("list_all_note_metadata:nb-home", 500, "Internal Server Error");

    let err = cache.synchronize(&service).await.unwrap_err();
    assert!(matches!(err, SyncError::Transport { status: 500, .. }));
    assert!(cache.is_ready());
    assert_eq!(cache.snapshot(), Some(&before));
    assert!(!cache.list_notebook_names().contains(&"Fresh".to_string()));

    // a later successful refresh picks the change up
    cache.synchronize(&service).await.unwrap();
    assert!(cache.list_notebook_names().contains(&"Fresh".to_string()));
}

#[tokio::test]
async fn failed_first_sync_leaves_cache_uninitialized() {
    let service = seeded();
    service.fail_next("list_tags", 401, "Unauthorized");

    let mut cache = SyncCache::new();
    assert!(cache.synchronize(&service).await.is_err());
    assert!(!cache.is_ready());
    assert!(!cache.is_refreshing());
    assert!(cache.snapshot().is_none());
}

#[tokio::test]
async fn ensure_ready_synchronizes_once() {
    let service = Arc::new(seeded());
    let mut session = Session::new(service.clone(), Arc::new(PlainTextCodec));

    session.ensure_ready().await.unwrap();
    session.ensure_ready().await.unwrap();
    assert_eq!(service.call_count("list_notebooks"), 1);

    // an explicit resync always refetches
    session.synchronize().await.unwrap();
    assert_eq!(service.call_count("list_notebooks"), 2);
}

#[tokio::test]
async fn page_limit_caps_notes_per_notebook() {
    let service = MemoryNoteService::new().with_page_limit(2);
    let nb = service.add_notebook("Big");
    for i in 0..5 {
        service.add_note(&nb.guid, &format!("note {i}"), "<en-note/>", vec![], &[]);
    }

    let mut cache = SyncCache::new();
    let summary = cache.synchronize(&service).await.unwrap();
    assert_eq!(summary.notes, 2);
}

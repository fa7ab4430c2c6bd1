//! Editor commands.
//!
//! [`Workbench`] wires a [`Session`] to an [`EditorHost`] and implements the
//! user-facing commands. Each command runs its flow, then reports the result
//! exactly once: failures become an error notification, dismissed prompts
//! end silently, and nothing escapes to the host as a panic or error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use uuid::Uuid;

use crate::bindings::{AttachmentSource, Unstaged};
use crate::cache::{NotebookNotes, SyncSummary};
use crate::config::Config;
use crate::error::{selected, Abort, Outcome, SyncError};
use crate::frontmatter::FrontMatter;
use crate::host::{ActiveDocument, EditorHost, NoticeLevel};
use crate::models::{Attachment, DocumentId, Note};
use crate::publish::{publish, PublishReport};
use crate::session::Session;

/// Extra picker entry that returns to the notebook list.
pub const BACK_ENTRY: &str = "back...";

pub const TITLE_LINE: usize = 1;
pub const TAGS_LINE: usize = 2;
pub const NOTEBOOK_LINE: usize = 3;

/// Developer token pages, by service region.
pub const TOKEN_PAGES: [(&str, &str); 2] = [
    ("China", "https://app.yinxiang.com/api/DeveloperToken.action"),
    ("Other", "https://www.evernote.com/api/DeveloperToken.action"),
];

pub const MISSING_CREDENTIALS: &str = "Please use the token command to get the token and note store URL, \
     add them to the configuration, and then restart the editor.";

type Flow<T> = std::result::Result<T, Abort>;

pub struct Workbench<H: EditorHost> {
    config: Config,
    session: Session,
    host: H,
    save_tips: bool,
}

impl<H: EditorHost> Workbench<H> {
    /// Warns through `host` when the service credentials are not configured.
    pub fn new(config: Config, session: Session, host: H) -> Self {
        if config.missing_credentials() {
            tracing::warn!("service token or note store URL not configured");
            host.notify(NoticeLevel::Warning, MISSING_CREDENTIALS);
        }
        let save_tips = config.editor.save_tips;
        Self {
            config,
            session,
            host,
            save_tips,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn save_tips_enabled(&self) -> bool {
        self.save_tips
    }

    // ─── Commands ───────────────────────────────────────────────────

    pub async fn sync(&mut self) -> Outcome<SyncSummary> {
        let result = self.run_sync().await;
        self.finish(result)
    }

    pub async fn new_note(&mut self) -> Outcome<DocumentId> {
        let result = self.run_new_note().await;
        self.finish(result)
    }

    /// Browse notebook → note and open the chosen note.
    pub async fn navigate(&mut self) -> Outcome<DocumentId> {
        let result = self.run_navigate().await;
        self.finish(result)
    }

    pub async fn search(&mut self) -> Outcome<DocumentId> {
        let result = self.run_search().await;
        self.finish(result)
    }

    pub async fn open_recent(&mut self) -> Outcome<DocumentId> {
        let result = self.run_open_recent().await;
        self.finish(result)
    }

    /// Stage a local file against the active document. Returns its file name.
    pub async fn attach(&mut self) -> Outcome<String> {
        let result = self.run_attach().await;
        self.finish(result)
    }

    pub async fn remove_attachment(&mut self) -> Outcome<Unstaged> {
        let result = self.run_remove_attachment().await;
        self.finish(result)
    }

    /// Pick an attachment and open it. Returns the opened path, if any.
    pub async fn list_resources(&mut self) -> Outcome<Option<PathBuf>> {
        let result = self.run_list_resources().await;
        self.finish(result)
    }

    pub async fn publish(&mut self) -> Outcome<PublishReport> {
        let result = self.run_publish().await;
        self.finish(result)
    }

    /// Open the active document's note in the browser. Returns the URL.
    pub async fn open_in_browser(&mut self) -> Outcome<Option<String>> {
        let result = self.run_open_in_browser().await;
        self.finish(result)
    }

    /// Pick a service region and open its developer token page.
    pub async fn open_dev_page(&mut self) -> Outcome<String> {
        let result = self.run_open_dev_page().await;
        self.finish(result)
    }

    /// Completion items for a 0-based header line.
    pub fn completions(&self, line: usize) -> Vec<String> {
        let Some(snapshot) = self.session.cache().snapshot() else {
            return Vec::new();
        };
        match line {
            TAGS_LINE => snapshot.tag_names(),
            NOTEBOOK_LINE => snapshot.notebook_names(),
            _ => Vec::new(),
        }
    }

    pub fn on_close(&mut self, doc: &DocumentId) {
        self.session.close_document(doc);
    }

    /// Remind the user that saving is not publishing, until they opt out.
    pub async fn on_save(&mut self) {
        if !self.save_tips {
            return;
        }
        let ignore = self
            .host
            .warn_with_action("Saving to local won't sync the remote. Try publish", "Ignore")
            .await;
        if ignore {
            self.save_tips = false;
        }
    }

    // ─── Flows ──────────────────────────────────────────────────────

    async fn run_sync(&mut self) -> Flow<SyncSummary> {
        self.host.status("Synchronizing your account...");
        let summary = self.session.synchronize().await?;
        self.host.status("Synchronizing succeeded!");
        Ok(summary)
    }

    async fn run_new_note(&mut self) -> Flow<DocumentId> {
        self.session.ensure_ready().await?;
        let header = FrontMatter::default().render();
        let doc = self.host.open_document(&header).await?;
        self.session.track_new_document(&doc);
        Ok(doc)
    }

    async fn run_navigate(&mut self) -> Flow<DocumentId> {
        loop {
            let names = self.session.ensure_ready().await?.notebook_names();
            let notebook = selected(self.host.pick("Select a notebook", &names).await)?;

            let notes: Vec<Note> = match self.session.cache().list_notes_in_notebook(&notebook)? {
                NotebookNotes::Notes(notes) => notes.to_vec(),
                NotebookNotes::Empty => {
                    self.host
                        .notify(NoticeLevel::Info, "Can not open an empty notebook.");
                    continue;
                }
            };

            let mut titles: Vec<String> = notes.iter().map(|n| n.title.clone()).collect();
            titles.push(BACK_ENTRY.to_string());
            let choice = selected(self.host.pick("Select a note", &titles).await)?;
            if choice == BACK_ENTRY {
                continue;
            }

            let note = notes
                .into_iter()
                .find(|n| n.title == choice)
                .ok_or_else(|| SyncError::NoteNotFound(choice.clone()))?;
            return self.open_note(note).await;
        }
    }

    async fn run_search(&mut self) -> Flow<DocumentId> {
        self.session.ensure_ready().await?;
        let query = selected(
            self.host
                .input("Use the note service's search grammar to search notes.")
                .await,
        )?;
        let notes = self.session.service().search_notes(&query).await?;
        if notes.is_empty() {
            self.host.notify(NoticeLevel::Info, "No matching notes.");
            return Err(Abort::Cancelled);
        }

        let labels = self.labels_with_notebook(&notes);
        let choice = selected(self.host.pick("Select a note", &labels).await)?;
        let note = pick_by_label(notes, &labels, &choice)?;
        self.open_note(note).await
    }

    async fn run_open_recent(&mut self) -> Flow<DocumentId> {
        self.session.ensure_ready().await?;
        let notes = self.session.service().list_recent_notes().await?;
        let titles: Vec<String> = notes.iter().map(|n| n.title.clone()).collect();
        let choice = selected(self.host.pick("Select a recent note", &titles).await)?;
        let note = pick_by_label(notes, &titles, &choice)?;
        self.open_note(note).await
    }

    async fn run_attach(&mut self) -> Flow<String> {
        let active = self.active()?;
        self.session.ensure_ready().await?;

        let input = selected(self.host.input("Full path of your attachment:").await)?;
        let (path, configured) = self.config.resolve_upload_path(&input);
        if !configured {
            self.host.notify(
                NoticeLevel::Warning,
                "Attachments upload folder not set, you may have to use absolute file path.",
            );
        }

        let name = self
            .session
            .bindings_mut()
            .stage_attachment(&active.id, &path)
            .await?
            .file_name()
            .to_string();
        self.host.notify(
            NoticeLevel::Info,
            &format!("{name} has been attached to current note."),
        );
        Ok(name)
    }

    async fn run_remove_attachment(&mut self) -> Flow<Unstaged> {
        let active = self.active()?;
        if !self.session.bindings().is_tracked(&active.id) {
            self.host
                .notify(NoticeLevel::Info, "Current document has no attachments to remove.");
            return Ok(Unstaged::NoBinding);
        }

        let names: Vec<String> = self
            .session
            .bindings()
            .staged(&active.id)
            .iter()
            .map(|s| s.file_name().to_string())
            .collect();
        if names.is_empty() {
            self.host
                .notify(NoticeLevel::Info, "No local attachment to remove.");
            return Ok(Unstaged::NotStaged);
        }

        let choice = selected(self.host.pick("Select an attachment to remove", &names).await)?;
        let outcome = self
            .session
            .bindings_mut()
            .unstage_attachment(&active.id, &choice);
        let message = match outcome {
            Unstaged::Removed(_) => format!("{choice} has been removed from current note."),
            Unstaged::NotStaged => format!("{choice} is not attached to current note."),
            Unstaged::NoBinding => "Current document has no attachments to remove.".to_string(),
        };
        self.host.notify(NoticeLevel::Info, &message);
        Ok(outcome)
    }

    async fn run_list_resources(&mut self) -> Flow<Option<PathBuf>> {
        let active = self.active()?;
        let service = Arc::clone(&self.session.service);
        let entries = self
            .session
            .bindings_mut()
            .list_attachments(&active.id, service.as_ref())
            .await?;
        if entries.is_empty() {
            self.host.notify(NoticeLevel::Info, "No resource to show.");
            return Ok(None);
        }

        let labels: Vec<String> = entries.iter().map(|e| e.label.clone()).collect();
        let choice = selected(self.host.pick("Select an attachment", &labels).await)?;
        let entry = entries
            .into_iter()
            .find(|e| e.label == choice)
            .ok_or_else(|| SyncError::Unexpected(format!("unknown attachment {choice}")))?;

        let target = match entry.source {
            AttachmentSource::Local(path) => path,
            AttachmentSource::Server => self.download(&entry.attachment).await?,
        };
        self.host
            .open_external(&target.display().to_string())
            .await?;
        Ok(Some(target))
    }

    async fn run_publish(&mut self) -> Flow<PublishReport> {
        let active = self.active()?;
        self.host.status("Publishing the note...");
        let report = publish(&mut self.session, &active.id, &active.text).await?;
        self.host.notify(NoticeLevel::Info, &report.message());
        Ok(report)
    }

    async fn run_open_in_browser(&mut self) -> Flow<Option<String>> {
        let active = self.active()?;
        let Some(guid) = self
            .session
            .bindings()
            .bound_note(&active.id)
            .map(|n| n.guid.clone())
        else {
            self.host.notify(
                NoticeLevel::Warning,
                "Can not open the note, maybe not on the server",
            );
            return Ok(None);
        };

        let url = self
            .config
            .note_web_url(&guid)
            .map_err(|e| SyncError::Unexpected(e.to_string()))?;
        self.host.open_external(&url).await?;
        Ok(Some(url))
    }

    async fn run_open_dev_page(&mut self) -> Flow<String> {
        let regions: Vec<String> = TOKEN_PAGES.iter().map(|(r, _)| r.to_string()).collect();
        let choice = selected(self.host.pick("Select your service region", &regions).await)?;
        let url = TOKEN_PAGES
            .iter()
            .find(|(region, _)| *region == choice)
            .map(|(_, url)| url.to_string())
            .ok_or_else(|| SyncError::Unexpected(format!("unknown region {choice}")))?;
        self.host.open_external(&url).await?;
        Ok(url)
    }

    // ─── Helpers ────────────────────────────────────────────────────

    async fn open_note(&mut self, note: Note) -> Flow<DocumentId> {
        let text = self.session.load_note_document(&note).await?;
        let doc = self.host.open_document(&text).await?;
        self.session.bind_opened_note(&doc, note);
        Ok(doc)
    }

    /// Fetch a server attachment into a fresh download directory.
    async fn download(&self, attachment: &Attachment) -> Flow<PathBuf> {
        let guid = attachment
            .guid
            .as_deref()
            .ok_or_else(|| SyncError::Unexpected("server attachment without guid".into()))?;
        let resource = self.session.service().get_resource(guid).await?;

        let dir = self.config.attachments.download_folder.join(format!(
            "{}{}",
            self.config.attachments.download_prefix,
            Uuid::new_v4()
        ));
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| SyncError::AttachmentWrite {
                path: dir.clone(),
                source,
            })?;

        // never let a server-supplied name escape the download directory
        let file_name = Path::new(resource.file_name())
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| guid.into());
        let path = dir.join(file_name);
        tokio::fs::write(&path, &resource.data.body)
            .await
            .map_err(|source| SyncError::AttachmentWrite {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(path = %path.display(), "downloaded attachment");
        Ok(path)
    }

    fn labels_with_notebook(&self, notes: &[Note]) -> Vec<String> {
        let snapshot = self.session.cache().snapshot();
        notes
            .iter()
            .map(|note| {
                let notebook = snapshot
                    .and_then(|s| s.notebook_by_guid(&note.notebook_guid))
                    .map(|nb| nb.name.as_str())
                    .unwrap_or_default();
                format!("{}>>{}", notebook, note.title)
            })
            .collect()
    }

    fn active(&self) -> Flow<ActiveDocument> {
        self.host
            .active_document()
            .ok_or(Abort::Failed(SyncError::NoActiveDocument))
    }

    fn finish<T>(&self, result: Flow<T>) -> Outcome<T> {
        let outcome = Outcome::from(result);
        match &outcome {
            Outcome::Failed(err) => {
                tracing::error!("command failed: {}", err);
                self.host.notify(NoticeLevel::Error, &err.to_string());
            }
            Outcome::Cancelled => tracing::debug!("command cancelled"),
            Outcome::Succeeded(_) => {}
        }
        outcome
    }
}

/// Select the note whose label (same index) matches `choice`.
fn pick_by_label(notes: Vec<Note>, labels: &[String], choice: &str) -> Flow<Note> {
    let idx = labels
        .iter()
        .position(|label| label == choice)
        .ok_or_else(|| SyncError::NoteNotFound(choice.to_string()))?;
    notes
        .into_iter()
        .nth(idx)
        .ok_or_else(|| Abort::Failed(SyncError::NoteNotFound(choice.to_string())))
}

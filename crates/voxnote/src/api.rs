//! # Notebook Facade
//!
//! [`Notebook`] is the single entry point for a UI. It owns the store, the history
//! manager, the interpreter and one [`EditSession`] per open page, and dispatches:
//!
//! - **Page operations**: create (with skeleton document and parent link), rename,
//!   delete with cascade, list the page tree
//! - **Voice commands**: transcripts or audio, routed to the page's session
//! - **Direct edits**: documents changed in the block editor, with the same link
//!   checks and undo history as voice commands
//! - **Confirmation**: answering a pending destructive command
//! - **Persistence**: driving autosave with [`Notebook::tick`] and [`Notebook::flush_all`]
//!
//! ## What the Facade Does NOT Do
//!
//! - **Editing logic**: lives in the executor and the session
//! - **I/O**: no stdout, stderr or prompts; results carry [`Notice`]s instead
//! - **Timers**: the caller decides when to tick
//!
//! ## Generic Over Storage
//!
//! `Notebook<S: DataStore, K: KeyValueStore>`:
//! - Production: `Notebook<FileStore, FsKv>` (see [`crate::init`])
//! - Testing: `Notebook<InMemoryStore, MemKv>`

use std::collections::HashMap;
use std::time::Instant;

use crate::config::VoxConfig;
use crate::error::{Result, VoxError};
use crate::executor::{ConfirmationRequest, Notice};
use crate::graph::{self, PageNode};
use crate::history::HistoryManager;
use crate::interpreter::{
    CommandInterpreter, IntentProvider, InterpreterSettings, TranscriptionProvider,
};
use crate::model::{Block, BlockId, Document, Page, PageId, PageLinkProps};
use crate::session::{CommandResult, EditSession, Services};
use crate::store::kv::KeyValueStore;
use crate::store::DataStore;

/// Result of a page-level operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResult {
    /// Pages created or modified by the operation.
    pub affected_pages: Vec<Page>,
    pub deleted_pages: Vec<PageId>,
    pub messages: Vec<Notice>,
}

impl PageResult {
    pub fn with_affected_pages(mut self, pages: Vec<Page>) -> Self {
        self.affected_pages = pages;
        self
    }

    pub fn add_message(&mut self, message: Notice) {
        self.messages.push(message);
    }
}

pub struct Notebook<S: DataStore, K: KeyValueStore> {
    store: S,
    history: HistoryManager<K>,
    interpreter: CommandInterpreter,
    config: VoxConfig,
    sessions: HashMap<PageId, EditSession>,
}

impl<S: DataStore, K: KeyValueStore> Notebook<S, K> {
    pub fn new(store: S, kv: K, config: VoxConfig) -> Self {
        Self {
            store,
            history: HistoryManager::new(kv, config.history_limit()),
            interpreter: CommandInterpreter::new(InterpreterSettings::from(&config)),
            config,
            sessions: HashMap::new(),
        }
    }

    /// Adds an external intent provider behind the local grammar.
    pub fn with_provider(mut self, provider: impl IntentProvider + 'static) -> Self {
        self.interpreter = CommandInterpreter::new(InterpreterSettings::from(&self.config))
            .with_provider(provider);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Undo and redo depths of a page, for enabling toolbar buttons.
    pub fn history_depths(&mut self, id: PageId) -> Result<(usize, usize)> {
        self.history.depths(id)
    }

    pub fn config(&self) -> &VoxConfig {
        &self.config
    }

    // --- Pages ---

    /// Creates a page with the skeleton document. A child page also gets a link at
    /// the end of its parent's document.
    pub fn create_page(
        &mut self,
        parent_id: Option<PageId>,
        title: Option<&str>,
        icon: Option<&str>,
    ) -> Result<PageResult> {
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(self.config.default_page_title.as_str())
            .to_string();
        let icon = icon
            .filter(|i| !i.trim().is_empty())
            .unwrap_or(self.config.default_page_icon.as_str())
            .to_string();

        let page = self.store.create_page(parent_id, &title, &icon)?;
        let mut result = PageResult::default().with_affected_pages(vec![page.clone()]);
        result.add_message(Notice::success(format!("Created page \"{}\"", title)));

        if let Some(parent) = parent_id {
            let link = Block::link_to(PageLinkProps {
                page_id: page.id(),
                page_title: page.title().to_string(),
                page_icon: page.metadata.icon.clone(),
            });
            if let Err(e) = self.edit_document(parent, |doc| doc.append(vec![link])) {
                // The parent relation is already stored; the next open relinks it.
                tracing::warn!(page = %page.id(), parent = %parent, error = %e, "link not added");
                result.add_message(Notice::warning(format!(
                    "Page created, but the link in its parent could not be saved: {}",
                    e
                )));
            }
        }
        Ok(result)
    }

    pub fn get_page(&self, id: PageId) -> Result<Page> {
        if let Some(session) = self.sessions.get(&id) {
            return Ok(session.page().clone());
        }
        self.store.get_page(id)?.ok_or(VoxError::PageNotFound(id))
    }

    pub fn list_tree(&self) -> Result<Vec<PageNode>> {
        Ok(graph::build_tree(&self.store.list_meta()?))
    }

    pub fn rename_page(&mut self, id: PageId, title: &str, icon: Option<&str>) -> Result<PageResult> {
        let mut page = self.store.get_page(id)?.ok_or(VoxError::PageNotFound(id))?;
        if let Some(session) = self.sessions.get(&id) {
            page.content = session.document().clone();
        }
        page.metadata.title = title.trim().to_string();
        if let Some(icon) = icon {
            page.metadata.icon = icon.to_string();
        }
        let saved = self.store.save_page(&page)?;

        let mut result = PageResult::default().with_affected_pages(vec![saved.clone()]);
        result.add_message(Notice::success(format!("Renamed page to \"{}\"", saved.title())));
        Ok(result)
    }

    /// Deletes a page and all its descendants, then removes its link from the parent.
    pub fn delete_page(&mut self, id: PageId) -> Result<PageResult> {
        let page = self.store.get_page(id)?.ok_or(VoxError::PageNotFound(id))?;
        let report = self.store.delete_page(id)?;

        let mut result = PageResult {
            deleted_pages: report.deleted.clone(),
            ..Default::default()
        };
        self.forget_pages(&report.deleted);
        for (failed, error) in &report.failed {
            result.add_message(Notice::warning(format!(
                "Could not delete page {}: {}",
                failed, error
            )));
        }

        if report.deleted.contains(&id) {
            result.add_message(Notice::success(format!(
                "Deleted \"{}\" and {} subpage(s)",
                page.title(),
                report.deleted.len() - 1
            )));
            if let Some(parent) = page.parent_id() {
                let unlinked = self.edit_document(parent, |doc| {
                    let links: Vec<BlockId> = doc
                        .iter()
                        .filter(|b| b.page_link().is_some_and(|l| l.page_id == id))
                        .map(|b| b.id().clone())
                        .collect();
                    doc.remove_by_id(&links)
                });
                if let Err(e) = unlinked {
                    tracing::warn!(page = %id, parent = %parent, error = %e, "link not removed");
                }
            }
        }
        Ok(result)
    }

    // --- Sessions ---

    /// Opens an edit session for a page (a no-op if one is open) and returns its
    /// document.
    pub fn open_page(&mut self, id: PageId) -> Result<Document> {
        self.session_mut(id, Instant::now())
            .map(|session| session.document().clone())
    }

    /// Saves any pending edits and ends the session. A failed save keeps the
    /// session open.
    pub fn close_page(&mut self, id: PageId) -> Result<bool> {
        let Some(mut session) = self.sessions.remove(&id) else {
            return Ok(false);
        };
        if let Err(e) = session.flush(&mut self.store, Instant::now()) {
            self.sessions.insert(id, session);
            return Err(e);
        }
        Ok(true)
    }

    pub fn document(&self, id: PageId) -> Option<&Document> {
        self.sessions.get(&id).map(EditSession::document)
    }

    pub fn is_open(&self, id: PageId) -> bool {
        self.sessions.contains_key(&id)
    }

    // --- Commands ---

    /// Runs one spoken command against a page, opening it if needed.
    pub fn submit_transcript(&mut self, page_id: PageId, transcript: &str) -> Result<CommandResult> {
        let now = Instant::now();
        self.session_mut(page_id, now)?;
        let Self {
            store,
            history,
            interpreter,
            sessions,
            ..
        } = self;
        let session = sessions
            .get_mut(&page_id)
            .ok_or(VoxError::PageNotFound(page_id))?;
        let mut services = Services {
            store,
            history,
            interpreter,
        };
        let result = session.submit(transcript, &mut services, now)?;
        self.forget_pages(&result.deleted_pages);
        Ok(result)
    }

    /// Transcribes audio and runs the result. Nothing changes if no usable text
    /// came back.
    pub fn submit_audio<T: TranscriptionProvider>(
        &mut self,
        page_id: PageId,
        provider: &T,
        audio: &T::Audio,
    ) -> Result<CommandResult> {
        let transcription = provider.transcribe(audio)?;
        let text = transcription
            .usable_text()
            .ok_or_else(|| VoxError::Transcription("no speech was recognized".to_string()))?
            .to_string();
        self.submit_transcript(page_id, &text)
    }

    /// Commits a document the user edited directly, opening the page if needed.
    ///
    /// Page links missing from `document` delete their pages and everything under
    /// them, so the UI must confirm before removing a link block.
    pub fn apply_edit(&mut self, page_id: PageId, document: Document) -> Result<PageResult> {
        let now = Instant::now();
        self.session_mut(page_id, now)?;
        let Self {
            store,
            history,
            sessions,
            ..
        } = self;
        let session = sessions
            .get_mut(&page_id)
            .ok_or(VoxError::PageNotFound(page_id))?;
        let edit = session.apply_edit(document, store, history, now)?;
        let affected = if edit.changed {
            vec![session.page().clone()]
        } else {
            Vec::new()
        };
        self.forget_pages(&edit.deleted_pages);

        Ok(PageResult {
            affected_pages: affected,
            deleted_pages: edit.deleted_pages,
            messages: edit.messages,
        })
    }

    /// Runs the command waiting for confirmation on a page.
    pub fn confirm(&mut self, page_id: PageId) -> Result<Option<CommandResult>> {
        let now = Instant::now();
        let Self {
            store,
            history,
            interpreter,
            sessions,
            ..
        } = self;
        let Some(session) = sessions.get_mut(&page_id) else {
            return Ok(None);
        };
        let mut services = Services {
            store,
            history,
            interpreter,
        };
        let result = session.confirm(&mut services, now)?;
        if let Some(result) = &result {
            self.forget_pages(&result.deleted_pages);
        }
        Ok(result)
    }

    pub fn decline(&mut self, page_id: PageId) -> Option<ConfirmationRequest> {
        self.sessions.get_mut(&page_id)?.decline()
    }

    pub fn pending_confirmation(&self, page_id: PageId) -> Option<&ConfirmationRequest> {
        self.sessions.get(&page_id)?.pending_confirmation()
    }

    // --- Persistence ---

    /// Saves every session whose quiet period has passed. All sessions are tried;
    /// the first failure is returned after the rest were attempted.
    pub fn tick(&mut self, now: Instant) -> Result<usize> {
        self.save_sessions(|session, store| session.tick(store, now))
    }

    /// Saves every pending edit immediately.
    pub fn flush_all(&mut self) -> Result<usize> {
        let now = Instant::now();
        self.save_sessions(|session, store| session.flush(store, now))
    }

    pub fn is_saving(&self, page_id: PageId) -> bool {
        self.sessions
            .get(&page_id)
            .is_some_and(EditSession::is_saving)
    }

    fn save_sessions<F>(&mut self, mut save: F) -> Result<usize>
    where
        F: FnMut(&mut EditSession, &mut S) -> Result<bool>,
    {
        let mut saved = 0;
        let mut first_error = None;
        for session in self.sessions.values_mut() {
            match save(session, &mut self.store) {
                Ok(true) => saved += 1,
                Ok(false) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(saved),
        }
    }

    /// Drops sessions and undo history of pages that no longer exist.
    fn forget_pages(&mut self, deleted: &[PageId]) {
        for id in deleted {
            self.sessions.remove(id);
            if let Err(e) = self.history.clear(*id) {
                tracing::warn!(page = %id, error = %e, "history not cleared");
            }
        }
    }

    fn session_mut(&mut self, id: PageId, now: Instant) -> Result<&mut EditSession> {
        if !self.sessions.contains_key(&id) {
            let session = EditSession::open(&mut self.store, id, self.config.autosave_delay(), now)?;
            self.sessions.insert(id, session);
        }
        self.sessions.get_mut(&id).ok_or(VoxError::PageNotFound(id))
    }

    /// Applies `edit` to a page's document: through its session when open, otherwise
    /// straight to the store.
    fn edit_document<F>(&mut self, id: PageId, edit: F) -> Result<()>
    where
        F: FnOnce(&Document) -> Document,
    {
        if let Some(session) = self.sessions.get_mut(&id) {
            let document = edit(session.document());
            session.replace_document(document, &mut self.history, Instant::now());
            return Ok(());
        }
        let mut page = self.store.get_page(id)?.ok_or(VoxError::PageNotFound(id))?;
        let document = edit(&page.content);
        if document != page.content {
            page.content = document;
            self.store.save_page(&page)?;
        }
        Ok(())
    }
}

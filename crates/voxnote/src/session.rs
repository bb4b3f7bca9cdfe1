//! # Edit Sessions
//!
//! An [`EditSession`] owns the working copy of one page's document while it is open.
//! It runs every command through the full pipeline:
//!
//! ```text
//! transcript ─► interpreter ─► executor ─► link validator ─► history ─► autosave
//!                                 │
//!                          undo / redo ─► history ─► link validator (replay)
//! ```
//!
//! Services (store, history, interpreter) are borrowed per call through [`Services`],
//! so a session is plain state and the [`Notebook`](crate::api::Notebook) decides
//! who owns what.
//!
//! ## Ordering
//!
//! Commands run to completion in submission order. A command submitted while another
//! is still running on the same page is refused with
//! [`VoxError::OperationInFlight`]; undo/redo and ordinary edits share that flag.
//!
//! ## Saving
//!
//! Every committed document is pushed into a [`Debouncer`]; [`EditSession::tick`]
//! writes the latest one once the page has been quiet for the configured delay. A
//! failed save keeps the document in memory, keeps the saving indicator on and
//! retries after the next quiet period.

use std::time::{Duration, Instant};

use crate::debounce::Debouncer;
use crate::error::{Result, VoxError};
use crate::executor::{self, ConfirmationRequest, ExecContext, Notice, Outcome, Selection, SideEffect};
use crate::history::HistoryManager;
use crate::interpreter::{CommandInterpreter, EditIntent, IntentSource};
use crate::links::{self, ReconcileMode};
use crate::model::{Document, Page, PageId};
use crate::store::kv::KeyValueStore;
use crate::store::DataStore;

/// The collaborators a session needs for one call.
pub struct Services<'a, S: DataStore, K: KeyValueStore> {
    pub store: &'a mut S,
    pub history: &'a mut HistoryManager<K>,
    pub interpreter: &'a CommandInterpreter,
}

/// Everything the caller needs to render the outcome of one command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResult {
    pub intent: EditIntent,
    pub source: IntentSource,
    pub outcome: Outcome,
    /// The page's document after the command.
    pub document: Document,
    pub created_pages: Vec<Page>,
    /// Pages removed because their links were deleted.
    pub deleted_pages: Vec<PageId>,
    pub selection: Option<Selection>,
    /// Set when the command is waiting for [`EditSession::confirm`].
    pub confirmation: Option<ConfirmationRequest>,
    pub messages: Vec<Notice>,
}

impl CommandResult {
    fn new(intent: EditIntent, source: IntentSource, outcome: Outcome, document: Document) -> Self {
        Self {
            intent,
            source,
            outcome,
            document,
            created_pages: Vec::new(),
            deleted_pages: Vec::new(),
            selection: None,
            confirmation: None,
            messages: Vec::new(),
        }
    }

    pub fn add_message(&mut self, message: Notice) {
        self.messages.push(message);
    }

    /// Whether the document changed.
    pub fn changed(&self) -> bool {
        self.outcome.is_mutation()
    }

    fn absorb(&mut self, effects: Vec<SideEffect>) {
        for effect in effects {
            match effect {
                SideEffect::PageCreated(page) => self.created_pages.push(page),
                SideEffect::ConfirmationRequired(request) => self.confirmation = Some(request),
                SideEffect::Selection(selection) => self.selection = Some(selection),
                SideEffect::Notice(notice) => self.messages.push(notice),
            }
        }
    }
}

/// Outcome of an edit made directly in the editor.
#[derive(Debug, Clone, PartialEq)]
pub struct EditResult {
    pub document: Document,
    pub changed: bool,
    /// Pages removed because their links were deleted.
    pub deleted_pages: Vec<PageId>,
    pub messages: Vec<Notice>,
}

#[derive(Debug, Clone)]
struct PendingConfirmation {
    intent: EditIntent,
    source: IntentSource,
    transcript: String,
    request: ConfirmationRequest,
}

#[derive(Debug)]
pub struct EditSession {
    page: Page,
    pending: Option<PendingConfirmation>,
    autosave: Debouncer<Document>,
    saving: bool,
    in_flight: bool,
}

impl EditSession {
    /// Loads a page and restores links to children that lost theirs.
    pub fn open<S: DataStore>(
        store: &mut S,
        page_id: PageId,
        autosave_delay: Duration,
        now: Instant,
    ) -> Result<Self> {
        let page = store
            .get_page(page_id)?
            .ok_or(VoxError::PageNotFound(page_id))?;
        let report = links::reconcile(store, page_id, &page.content, ReconcileMode::Initial)?;

        let mut session = Self {
            page,
            pending: None,
            autosave: Debouncer::new(autosave_delay),
            saving: false,
            in_flight: false,
        };
        if report.changed_document() {
            session.commit(report.document, now);
        }
        tracing::debug!(page = %page_id, "session opened");
        Ok(session)
    }

    pub fn page_id(&self) -> PageId {
        self.page.id()
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn document(&self) -> &Document {
        &self.page.content
    }

    /// The "saving" indicator: on from the first unsaved edit until a save succeeds.
    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    pub fn pending_confirmation(&self) -> Option<&ConfirmationRequest> {
        self.pending.as_ref().map(|p| &p.request)
    }

    /// Interprets and applies one transcript.
    ///
    /// A confirmation still pending from an earlier command is dropped.
    pub fn submit<S: DataStore, K: KeyValueStore>(
        &mut self,
        transcript: &str,
        services: &mut Services<'_, S, K>,
        now: Instant,
    ) -> Result<CommandResult> {
        self.begin()?;
        if let Some(stale) = self.pending.take() {
            tracing::debug!(intent = stale.intent.name(), "pending confirmation superseded");
        }

        let interpretation = services
            .interpreter
            .interpret_with_source(transcript, &self.page.content);
        let mut result = self.dispatch(
            interpretation.intent,
            interpretation.source,
            transcript,
            false,
            services,
            now,
        );
        if let Some(failure) = &interpretation.failure {
            result
                .messages
                .insert(0, Notice::info(format!("Assistant unavailable: {}", failure)));
        }

        self.in_flight = false;
        Ok(result)
    }

    /// Runs the command waiting for confirmation, re-resolved against the current
    /// document. `None` if nothing was pending.
    pub fn confirm<S: DataStore, K: KeyValueStore>(
        &mut self,
        services: &mut Services<'_, S, K>,
        now: Instant,
    ) -> Result<Option<CommandResult>> {
        self.begin()?;
        let Some(pending) = self.pending.take() else {
            self.in_flight = false;
            return Ok(None);
        };
        let result = self.dispatch(
            pending.intent,
            pending.source,
            &pending.transcript,
            true,
            services,
            now,
        );
        self.in_flight = false;
        Ok(Some(result))
    }

    /// Drops the command waiting for confirmation.
    pub fn decline(&mut self) -> Option<ConfirmationRequest> {
        self.pending.take().map(|pending| {
            tracing::debug!(intent = pending.intent.name(), "confirmation declined");
            pending.request
        })
    }

    /// Commits a document edited directly in the editor (typing, block moves,
    /// block deletion). Links removed by the edit delete their pages, so the caller
    /// must have confirmed any such deletion already.
    pub fn apply_edit<S: DataStore, K: KeyValueStore>(
        &mut self,
        document: Document,
        store: &mut S,
        history: &mut HistoryManager<K>,
        now: Instant,
    ) -> Result<EditResult> {
        self.begin()?;
        let page_id = self.page.id();
        let before = self.page.content.clone();
        if document == before {
            self.in_flight = false;
            return Ok(EditResult {
                document,
                changed: false,
                deleted_pages: Vec::new(),
                messages: Vec::new(),
            });
        }

        let linked = reconcile_live(store, page_id, &before, document);
        let mut messages = linked.messages;
        if let Err(e) = history.record(page_id, &before) {
            tracing::warn!(page = %page_id, error = %e, "history not persisted");
            messages.push(Notice::warning("Undo history could not be saved"));
        }
        self.commit(linked.document.clone(), now);
        self.in_flight = false;

        Ok(EditResult {
            document: linked.document,
            changed: true,
            deleted_pages: linked.deleted_pages,
            messages,
        })
    }

    /// Commits a document produced outside the command pipeline (page creation or
    /// deletion through the API). Recorded in history like any other edit.
    pub fn replace_document<K: KeyValueStore>(
        &mut self,
        document: Document,
        history: &mut HistoryManager<K>,
        now: Instant,
    ) {
        if document == self.page.content {
            return;
        }
        if let Err(e) = history.record(self.page.id(), &self.page.content) {
            tracing::warn!(page = %self.page.id(), error = %e, "history not persisted");
        }
        self.commit(document, now);
    }

    /// Saves the latest document if the quiet period has passed. Returns whether a
    /// save happened.
    pub fn tick<S: DataStore>(&mut self, store: &mut S, now: Instant) -> Result<bool> {
        match self.autosave.take_due(now) {
            Some(document) => self.save(store, document, now),
            None => Ok(false),
        }
    }

    /// Saves the latest document now, if there is one.
    pub fn flush<S: DataStore>(&mut self, store: &mut S, now: Instant) -> Result<bool> {
        match self.autosave.take() {
            Some(document) => self.save(store, document, now),
            None => Ok(false),
        }
    }

    fn begin(&mut self) -> Result<()> {
        if self.in_flight {
            return Err(VoxError::OperationInFlight(self.page.id()));
        }
        self.in_flight = true;
        Ok(())
    }

    fn commit(&mut self, document: Document, now: Instant) {
        self.page.content = document.clone();
        self.autosave.push(document, now);
        self.saving = true;
    }

    fn save<S: DataStore>(&mut self, store: &mut S, document: Document, now: Instant) -> Result<bool> {
        let page_id = self.page.id();
        let outcome = store
            .get_page(page_id)
            .and_then(|stored| stored.ok_or(VoxError::PageNotFound(page_id)))
            .and_then(|mut stored| {
                stored.content = document.clone();
                store.save_page(&stored)
            });

        match outcome {
            Ok(saved) => {
                self.page.metadata = saved.metadata;
                self.saving = self.autosave.is_pending();
                tracing::debug!(page = %page_id, "document saved");
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(page = %page_id, error = %e, "save failed, will retry");
                if !self.autosave.is_pending() {
                    self.autosave.push(document, now);
                }
                self.saving = true;
                Err(e)
            }
        }
    }

    fn dispatch<S: DataStore, K: KeyValueStore>(
        &mut self,
        intent: EditIntent,
        source: IntentSource,
        transcript: &str,
        confirmed: bool,
        services: &mut Services<'_, S, K>,
        now: Instant,
    ) -> CommandResult {
        if intent.is_history() {
            return self.replay(intent, source, services, now);
        }

        let page_id = self.page.id();
        let before = self.page.content.clone();
        let mut ctx = ExecContext {
            store: &mut *services.store,
            page_id,
            transcript,
            confirmed,
        };
        let execution = executor::apply(&intent, &before, &mut ctx);

        let mut result = CommandResult::new(
            intent.clone(),
            source,
            execution.outcome.clone(),
            before.clone(),
        );
        result.absorb(execution.side_effects);

        match &execution.outcome {
            Outcome::ConfirmationRequired => {
                if let Some(request) = result.confirmation.clone() {
                    self.pending = Some(PendingConfirmation {
                        intent,
                        source,
                        transcript: transcript.to_string(),
                        request,
                    });
                }
                return result;
            }
            outcome if !outcome.is_mutation() => return result,
            _ => {}
        }

        let linked = reconcile_live(services.store, page_id, &before, execution.document);
        result.deleted_pages = linked.deleted_pages;
        result.messages.extend(linked.messages);
        let document = linked.document;

        if let Err(e) = services.history.record(page_id, &before) {
            tracing::warn!(page = %page_id, error = %e, "history not persisted");
            result.add_message(Notice::warning("Undo history could not be saved"));
        }
        self.commit(document.clone(), now);
        result.document = document;
        result
    }

    fn replay<S: DataStore, K: KeyValueStore>(
        &mut self,
        intent: EditIntent,
        source: IntentSource,
        services: &mut Services<'_, S, K>,
        now: Instant,
    ) -> CommandResult {
        let page_id = self.page.id();
        let current = self.page.content.clone();
        let mut result = CommandResult::new(intent.clone(), source, Outcome::Delegated, current.clone());

        services.history.begin_replay();
        let (verb, done, replayed) = match intent {
            EditIntent::Undo { steps } => ("undo", "undone", services.history.undo(page_id, &current, steps)),
            EditIntent::Redo { steps } => ("redo", "redone", services.history.redo(page_id, &current, steps)),
            _ => {
                services.history.end_replay();
                return result;
            }
        };

        match replayed {
            Err(e) => {
                tracing::warn!(page = %page_id, error = %e, "history unavailable");
                result.outcome = Outcome::no_op(format!("could not {}", verb));
                result.add_message(Notice::error(format!("Could not {}: {}", verb, e)));
            }
            Ok(replay) if replay.is_empty() => {
                result.outcome = Outcome::no_op(format!("nothing to {}", verb));
                result.add_message(Notice::info(format!("Nothing to {}", verb)));
            }
            Ok(replay) => {
                let document =
                    match links::reconcile(services.store, page_id, &replay.document, ReconcileMode::Replay) {
                        Ok(report) => report.document,
                        Err(e) => {
                            tracing::warn!(page = %page_id, error = %e, "link reconciliation failed");
                            replay.document.clone()
                        }
                    };
                if replay.is_partial() {
                    result.add_message(Notice::info(format!(
                        "Only {} of {} steps could be {}",
                        replay.applied, replay.requested, done
                    )));
                }
                result.outcome = Outcome::Applied {
                    changed: replay.applied,
                };
                self.commit(document.clone(), now);
                result.document = document;
            }
        }
        services.history.end_replay();
        result
    }
}

struct LiveLinks {
    document: Document,
    deleted_pages: Vec<PageId>,
    messages: Vec<Notice>,
}

/// Runs the live link check on an edited document. A failed check keeps the
/// edited document and reports a warning.
fn reconcile_live<S: DataStore>(store: &mut S, page_id: PageId, before: &Document, edited: Document) -> LiveLinks {
    match links::reconcile(store, page_id, &edited, ReconcileMode::Live { previous: before }) {
        Ok(report) => {
            let mut messages = Vec::new();
            if !report.pages_deleted.is_empty() {
                messages.push(Notice::info(format!(
                    "Deleted {} linked page(s)",
                    report.pages_deleted.len()
                )));
            }
            for (failed, error) in &report.delete_failures {
                messages.push(Notice::warning(format!("Could not delete page {}: {}", failed, error)));
            }
            LiveLinks {
                document: report.document,
                deleted_pages: report.pages_deleted,
                messages,
            }
        }
        Err(e) => {
            tracing::warn!(page = %page_id, error = %e, "link reconciliation failed");
            LiveLinks {
                document: edited,
                deleted_pages: Vec::new(),
                messages: vec![Notice::warning(format!("Could not check page links: {}", e))],
            }
        }
    }
}

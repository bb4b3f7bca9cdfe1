//! # Intent Executor
//!
//! Applies one [`EditIntent`] to a document and reports what happened. This is where
//! edits actually take effect; the interpreter only describes them.
//!
//! ## Contract
//!
//! [`apply`] never fails. It returns an [`Execution`] holding:
//! - `document`: the resulting document (the input, unchanged, for no-ops)
//! - `outcome`: applied, no-op, awaiting confirmation, delegated, or fallback
//! - `side_effects`: created pages, selections, confirmation requests, notices
//!
//! Selectors are resolved against the document passed in, never against the snapshot
//! the interpreter saw.
//!
//! ## What the Executor Does NOT Do
//!
//! - **History**: undo/redo are answered with [`Outcome::Delegated`]; the session
//!   hands them to the history manager.
//! - **Link reconciliation and persistence**: the session runs the link validator
//!   and schedules the save after a mutating execution.
//! - **Prompting**: destructive deletions of page links return
//!   [`Outcome::ConfirmationRequired`]; the caller asks and resubmits with
//!   [`ExecContext::confirmed`] set.
//!
//! ## Modules
//!
//! - [`resolve`]: selector and text-scope resolution
//! - [`insert`]: `InsertContent` and the plain-paragraph fallback
//! - [`format`]: `ApplyFormatting`
//! - [`blocks`]: `ChangeBlockType` and block deletion
//! - [`text`]: `ReplaceText`, text deletion and `SelectText`
//! - [`pages`]: `CreateLinkedPage`

use serde::Serialize;

use crate::interpreter::{EditIntent, Target};
use crate::model::{BlockId, Document, Page, PageId};
use crate::store::DataStore;

pub mod blocks;
pub mod format;
pub mod insert;
pub mod pages;
pub mod resolve;
pub mod text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient, user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: MessageLevel,
    pub content: String,
}

impl Notice {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

/// Everything an execution needs besides the intent and the document.
pub struct ExecContext<'a, S: DataStore> {
    pub store: &'a mut S,
    /// The page whose document is being edited.
    pub page_id: PageId,
    /// The raw transcript, used for the plain-paragraph fallback.
    pub transcript: &'a str,
    /// Destructive deletions were confirmed by the user.
    pub confirmed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The document changed; `changed` counts affected blocks or occurrences.
    Applied { changed: usize },
    /// Nothing matched or nothing needed doing. Not an error.
    NoOp { reason: String },
    /// A text selection was produced; the document is unchanged.
    Selected { matches: usize },
    /// The edit needs explicit user confirmation before it runs.
    ConfirmationRequired,
    /// Undo/redo: handled by the history manager.
    Delegated,
    /// The intended edit failed; the transcript was recorded as a paragraph instead.
    Fallback { error: String },
}

impl Outcome {
    pub fn no_op(reason: impl Into<String>) -> Self {
        Outcome::NoOp {
            reason: reason.into(),
        }
    }

    /// Whether the execution produced a new document to commit.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Outcome::Applied { .. } | Outcome::Fallback { .. })
    }
}

/// A case-insensitive text match inside one inline run. Offsets are byte offsets
/// into the run's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextMatch {
    pub block_id: BlockId,
    pub run: usize,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub block_ids: Vec<BlockId>,
    pub ranges: Vec<TextMatch>,
}

/// The request the UI turns into a confirmation dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationRequest {
    pub message: String,
    /// Pages that will be deleted along with their links.
    pub pages: Vec<PageId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    PageCreated(Page),
    ConfirmationRequired(ConfirmationRequest),
    Selection(Selection),
    Notice(Notice),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub document: Document,
    pub outcome: Outcome,
    pub side_effects: Vec<SideEffect>,
}

impl Execution {
    pub fn unchanged(document: &Document, outcome: Outcome) -> Self {
        Self {
            document: document.clone(),
            outcome,
            side_effects: Vec::new(),
        }
    }

    pub fn applied(document: Document, changed: usize) -> Self {
        Self {
            document,
            outcome: Outcome::Applied { changed },
            side_effects: Vec::new(),
        }
    }

    pub fn with_effect(mut self, effect: SideEffect) -> Self {
        self.side_effects.push(effect);
        self
    }

    pub fn with_notice(self, notice: Notice) -> Self {
        self.with_effect(SideEffect::Notice(notice))
    }

    pub fn notices(&self) -> impl Iterator<Item = &Notice> {
        self.side_effects.iter().filter_map(|effect| match effect {
            SideEffect::Notice(notice) => Some(notice),
            _ => None,
        })
    }
}

/// Applies `intent` to `document`.
pub fn apply<S: DataStore>(
    intent: &EditIntent,
    document: &Document,
    ctx: &mut ExecContext<'_, S>,
) -> Execution {
    let execution = match intent {
        EditIntent::InsertContent { blocks } => insert::run(document, blocks),
        EditIntent::ApplyFormatting {
            target,
            style,
            value,
        } => format::run(document, target, *style, value),
        EditIntent::SelectText { target } => text::select(document, target),
        EditIntent::ReplaceText {
            find,
            replace_with,
            scope,
        } => text::replace(document, find, replace_with, scope.as_ref()),
        EditIntent::DeleteRange {
            scope: Target::Blocks(selector),
        } => blocks::delete(document, selector, ctx.confirmed),
        EditIntent::DeleteRange {
            scope: Target::Text(range),
        } => text::delete(document, range),
        EditIntent::ChangeBlockType {
            target,
            new_type,
            props,
        } => blocks::change_type(document, target, *new_type, props),
        EditIntent::CreateLinkedPage { title, icon } => pages::create_linked(document, title, icon, ctx),
        EditIntent::Undo { .. } | EditIntent::Redo { .. } => {
            Execution::unchanged(document, Outcome::Delegated)
        }
        EditIntent::Unrecognized { raw_text } => insert::plain_text(document, raw_text),
    };

    tracing::debug!(
        intent = intent.name(),
        outcome = ?execution.outcome,
        "intent executed"
    );
    execution
}

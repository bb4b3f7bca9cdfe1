//! # History Manager
//!
//! Per-page undo/redo of whole-document snapshots.
//!
//! ## Rules
//!
//! - Every committed edit pushes the document as it was *before* the edit onto the
//!   undo stack and clears the redo stack.
//! - Undo pops a snapshot and pushes the current document onto redo; redo mirrors it.
//!   Multi-step requests stop early when a stack runs dry and report how many steps
//!   were actually applied.
//! - Both stacks are bounded; the oldest entries are dropped first.
//! - While a replay is in progress ([`HistoryManager::begin_replay`]), `record` is a
//!   no-op, so documents produced by undo/redo never land on the undo stack.
//!
//! ## Persistence
//!
//! Stacks are stored in a [`KeyValueStore`] under `undo_<pageId>` and
//! `redo_<pageId>` as JSON arrays of documents, oldest first. An empty stack deletes
//! its key. Stacks are loaded lazily the first time a page is touched; a value that
//! fails to parse is logged and treated as empty.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{Document, PageId};
use crate::store::kv::KeyValueStore;

/// Default bound on each stack.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub document: Document,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn now(document: Document) -> Self {
        Self {
            document,
            timestamp: Utc::now(),
        }
    }
}

/// Result of an undo or redo request.
#[derive(Debug, Clone, PartialEq)]
pub struct Replay {
    pub document: Document,
    pub applied: usize,
    pub requested: usize,
}

impl Replay {
    pub fn is_partial(&self) -> bool {
        self.applied < self.requested
    }

    pub fn is_empty(&self) -> bool {
        self.applied == 0
    }
}

#[derive(Debug, Default)]
struct Stacks {
    undo: Vec<HistoryEntry>,
    redo: Vec<HistoryEntry>,
}

fn undo_key(page: PageId) -> String {
    format!("undo_{}", page)
}

fn redo_key(page: PageId) -> String {
    format!("redo_{}", page)
}

fn trim(entries: &mut Vec<HistoryEntry>, limit: usize) {
    if entries.len() > limit {
        let drop_count = entries.len() - limit;
        entries.drain(0..drop_count);
    }
}

pub struct HistoryManager<K: KeyValueStore> {
    kv: K,
    limit: usize,
    pages: HashMap<PageId, Stacks>,
    replaying: bool,
}

impl<K: KeyValueStore> HistoryManager<K> {
    pub fn new(kv: K, limit: usize) -> Self {
        Self {
            kv,
            limit: limit.max(1),
            pages: HashMap::new(),
            replaying: false,
        }
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    pub fn into_kv(self) -> K {
        self.kv
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn begin_replay(&mut self) {
        self.replaying = true;
    }

    pub fn end_replay(&mut self) {
        self.replaying = false;
    }

    pub fn is_replaying(&self) -> bool {
        self.replaying
    }

    /// Records the pre-edit snapshot of a committed edit.
    pub fn record(&mut self, page: PageId, before: &Document) -> Result<()> {
        if self.replaying {
            tracing::debug!(page = %page, "replay in progress, not recording");
            return Ok(());
        }
        let limit = self.limit;
        let stacks = self.stacks(page)?;
        stacks.undo.push(HistoryEntry::now(before.clone()));
        trim(&mut stacks.undo, limit);
        stacks.redo.clear();
        tracing::debug!(page = %page, depth = stacks.undo.len(), "history recorded");
        self.persist(page)
    }

    /// Steps back up to `steps` times from `current`.
    pub fn undo(&mut self, page: PageId, current: &Document, steps: usize) -> Result<Replay> {
        self.step(page, current, steps, Direction::Undo)
    }

    /// Steps forward up to `steps` times from `current`.
    pub fn redo(&mut self, page: PageId, current: &Document, steps: usize) -> Result<Replay> {
        self.step(page, current, steps, Direction::Redo)
    }

    /// Undo and redo depth of a page.
    pub fn depths(&mut self, page: PageId) -> Result<(usize, usize)> {
        let stacks = self.stacks(page)?;
        Ok((stacks.undo.len(), stacks.redo.len()))
    }

    pub fn can_undo(&mut self, page: PageId) -> Result<bool> {
        Ok(self.depths(page)?.0 > 0)
    }

    pub fn can_redo(&mut self, page: PageId) -> Result<bool> {
        Ok(self.depths(page)?.1 > 0)
    }

    /// Forgets a page's history, in memory and in the key-value store.
    pub fn clear(&mut self, page: PageId) -> Result<()> {
        self.pages.remove(&page);
        self.kv.delete(&undo_key(page))?;
        self.kv.delete(&redo_key(page))
    }

    fn step(&mut self, page: PageId, current: &Document, steps: usize, direction: Direction) -> Result<Replay> {
        let limit = self.limit;
        let stacks = self.stacks(page)?;
        let (from, to) = match direction {
            Direction::Undo => (&mut stacks.undo, &mut stacks.redo),
            Direction::Redo => (&mut stacks.redo, &mut stacks.undo),
        };

        let mut document = current.clone();
        let mut applied = 0;
        while applied < steps {
            let Some(entry) = from.pop() else {
                break;
            };
            to.push(HistoryEntry::now(document));
            document = entry.document;
            applied += 1;
        }
        trim(to, limit);

        tracing::debug!(
            page = %page,
            ?direction,
            requested = steps,
            applied,
            "history replayed"
        );
        if applied > 0 {
            self.persist(page)?;
        }
        Ok(Replay {
            document,
            applied,
            requested: steps,
        })
    }

    fn stacks(&mut self, page: PageId) -> Result<&mut Stacks> {
        if !self.pages.contains_key(&page) {
            let loaded = Stacks {
                undo: self.load(&undo_key(page))?,
                redo: self.load(&redo_key(page))?,
            };
            self.pages.insert(page, loaded);
        }
        Ok(self.pages.entry(page).or_default())
    }

    fn load(&self, key: &str) -> Result<Vec<HistoryEntry>> {
        let Some(raw) = self.kv.get(key)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<Document>>(&raw) {
            Ok(documents) => {
                let mut entries: Vec<HistoryEntry> = documents.into_iter().map(HistoryEntry::now).collect();
                trim(&mut entries, self.limit);
                Ok(entries)
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding unreadable history");
                Ok(Vec::new())
            }
        }
    }

    fn persist(&self, page: PageId) -> Result<()> {
        let Some(stacks) = self.pages.get(&page) else {
            return Ok(());
        };
        self.write(&undo_key(page), &stacks.undo)?;
        self.write(&redo_key(page), &stacks.redo)
    }

    fn write(&self, key: &str, entries: &[HistoryEntry]) -> Result<()> {
        if entries.is_empty() {
            return self.kv.delete(key);
        }
        let documents: Vec<&Document> = entries.iter().map(|e| &e.document).collect();
        self.kv.set(key, &serde_json::to_string(&documents)?)
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Undo,
    Redo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Block;
    use crate::store::kv::MemKv;

    fn doc(text: &str) -> Document {
        Document::from_blocks(vec![Block::paragraph(text).with_id("p")]).unwrap()
    }

    fn manager() -> HistoryManager<MemKv> {
        HistoryManager::new(MemKv::new(), DEFAULT_HISTORY_LIMIT)
    }

    #[test]
    fn test_undo_then_redo_is_symmetric() {
        let mut history = manager();
        let page = PageId::new();
        let (a, b) = (doc("a"), doc("b"));

        history.record(page, &a).unwrap();
        let undone = history.undo(page, &b, 1).unwrap();
        assert_eq!(undone.document, a);
        assert_eq!(undone.applied, 1);

        let redone = history.redo(page, &undone.document, 1).unwrap();
        assert_eq!(redone.document, b);
        assert_eq!(history.depths(page).unwrap(), (1, 0));
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let mut history = manager();
        let page = PageId::new();
        history.record(page, &doc("a")).unwrap();
        history.undo(page, &doc("b"), 1).unwrap();
        assert!(history.can_redo(page).unwrap());

        history.record(page, &doc("a")).unwrap();
        assert!(!history.can_redo(page).unwrap());
    }

    #[test]
    fn test_multi_step_stops_when_exhausted() {
        let mut history = manager();
        let page = PageId::new();
        history.record(page, &doc("1")).unwrap();
        history.record(page, &doc("2")).unwrap();

        let replay = history.undo(page, &doc("3"), 5).unwrap();
        assert_eq!(replay.document, doc("1"));
        assert_eq!(replay.applied, 2);
        assert!(replay.is_partial());
        assert_eq!(history.depths(page).unwrap(), (0, 2));
    }

    #[test]
    fn test_undo_with_empty_stack_returns_current() {
        let mut history = manager();
        let page = PageId::new();
        let replay = history.undo(page, &doc("x"), 1).unwrap();
        assert!(replay.is_empty());
        assert_eq!(replay.document, doc("x"));
    }

    #[test]
    fn test_stack_is_bounded_dropping_oldest() {
        let mut history = HistoryManager::new(MemKv::new(), 3);
        let page = PageId::new();
        for i in 0..5 {
            history.record(page, &doc(&i.to_string())).unwrap();
        }
        assert_eq!(history.depths(page).unwrap(), (3, 0));
        let replay = history.undo(page, &doc("5"), 3).unwrap();
        assert_eq!(replay.document, doc("2"));
    }

    #[test]
    fn test_replay_guard_suppresses_recording() {
        let mut history = manager();
        let page = PageId::new();
        history.begin_replay();
        history.record(page, &doc("a")).unwrap();
        history.end_replay();
        assert_eq!(history.depths(page).unwrap(), (0, 0));
    }

    #[test]
    fn test_pages_are_independent() {
        let mut history = manager();
        let (one, two) = (PageId::new(), PageId::new());
        history.record(one, &doc("a")).unwrap();
        assert!(history.can_undo(one).unwrap());
        assert!(!history.can_undo(two).unwrap());
    }

    #[test]
    fn test_stacks_persist_and_reload() {
        let mut history = manager();
        let page = PageId::new();
        history.record(page, &doc("a")).unwrap();
        history.record(page, &doc("b")).unwrap();
        history.undo(page, &doc("c"), 1).unwrap();

        let kv = history.into_kv();
        assert!(kv.get(&format!("undo_{}", page)).unwrap().is_some());
        assert!(kv.get(&format!("redo_{}", page)).unwrap().is_some());

        let mut reloaded = HistoryManager::new(kv, DEFAULT_HISTORY_LIMIT);
        assert_eq!(reloaded.depths(page).unwrap(), (1, 1));
        let replay = reloaded.undo(page, &doc("b"), 1).unwrap();
        assert_eq!(replay.document, doc("a"));
    }

    #[test]
    fn test_empty_stack_deletes_key() {
        let mut history = manager();
        let page = PageId::new();
        history.record(page, &doc("a")).unwrap();
        history.undo(page, &doc("b"), 1).unwrap();
        assert!(history.kv().get(&format!("undo_{}", page)).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_value_starts_empty() {
        let kv = MemKv::new();
        let page = PageId::new();
        kv.set(&format!("undo_{}", page), "{not json").unwrap();
        let mut history = HistoryManager::new(kv, DEFAULT_HISTORY_LIMIT);
        assert_eq!(history.depths(page).unwrap(), (0, 0));
    }

    #[test]
    fn test_persist_failure_propagates_but_keeps_memory() {
        let mut history = manager();
        let page = PageId::new();
        history.kv().set_simulate_write_error(true);
        assert!(history.record(page, &doc("a")).is_err());
        assert_eq!(history.depths(page).unwrap(), (1, 0));
    }

    #[test]
    fn test_clear_forgets_everything() {
        let mut history = manager();
        let page = PageId::new();
        history.record(page, &doc("a")).unwrap();
        history.clear(page).unwrap();
        assert!(history.kv().is_empty());
        assert_eq!(history.depths(page).unwrap(), (0, 0));
    }
}

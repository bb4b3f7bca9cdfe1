//! # Storage Layer
//!
//! The page graph lives behind the [`DataStore`] trait. The editing core never
//! talks to a database directly; it only needs these operations with these
//! semantics, so a remote backend can be dropped in by implementing the trait.
//!
//! ## Layering
//!
//! ```text
//! DataStore (trait)             what the core consumes
//!    └── PageStore<B>           page-graph rules: parents exist, no cycles,
//!          │                    cascade deletion, monotonic timestamps
//!          └── StorageBackend   raw I/O: index + per-page content blobs
//!                ├── MemBackend (tests, embedding)
//!                └── FsBackend  (JSON files on disk)
//! ```
//!
//! ## Write Ordering
//!
//! Content is written before the index. A crash in between leaves an unreferenced
//! content blob (harmless) rather than an index entry pointing at nothing.
//!
//! ## Cascade Deletion
//!
//! [`DataStore::delete_page`] removes the page and every transitive descendant,
//! deepest first. A page that fails to delete is reported in the
//! [`DeleteReport`] and the remaining pages are still processed; its ancestors are
//! kept so no surviving page ever points at a deleted parent.
//!
//! ## Storage Layout (FsBackend)
//!
//! ```text
//! <data dir>/
//! ├── pages.json            # Index: PageId -> PageMeta
//! ├── page-{uuid}.json      # Document of each page
//! └── history/              # Persisted undo/redo stacks (see kv.rs)
//! ```

use serde::Serialize;

use crate::error::Result;
use crate::model::{Page, PageId, PageMeta};

pub mod backend;
pub mod fs;
pub mod fs_backend;
pub mod kv;
pub mod mem_backend;
pub mod memory;
pub mod page_store;

/// Outcome of a cascading delete.
#[derive(Debug, Default, Clone, Serialize)]
pub struct DeleteReport {
    pub deleted: Vec<PageId>,
    pub failed: Vec<(PageId, String)>,
}

impl DeleteReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Abstract interface for the page graph.
pub trait DataStore {
    /// Create a page under `parent_id` (or at the root) with a skeleton document.
    fn create_page(&mut self, parent_id: Option<PageId>, title: &str, icon: &str) -> Result<Page>;

    /// Get a page by id. `Ok(None)` if it does not exist.
    fn get_page(&self, id: PageId) -> Result<Option<Page>>;

    /// Create or update a page, returning it as stored.
    fn save_page(&mut self, page: &Page) -> Result<Page>;

    /// Delete a page and all of its descendants.
    fn delete_page(&mut self, id: PageId) -> Result<DeleteReport>;

    /// Direct children of a page, oldest first.
    fn get_child_pages(&self, parent_id: PageId) -> Result<Vec<Page>>;

    /// Every page, with content.
    fn load_all_pages(&self) -> Result<Vec<Page>>;

    /// Every page's metadata, without reading content.
    fn list_meta(&self) -> Result<Vec<PageMeta>>;
}

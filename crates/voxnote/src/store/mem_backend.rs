use super::backend::StorageBackend;
use crate::error::{Result, VoxError};
use crate::model::{PageId, PageMeta};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

/// In-memory storage backend for testing and embedding.
///
/// Uses `RefCell` for interior mutability since the editing core is single-threaded.
/// This keeps the `StorageBackend` trait on `&self` for all methods.
#[derive(Default)]
pub struct MemBackend {
    index: RefCell<HashMap<PageId, PageMeta>>,
    content: RefCell<HashMap<PageId, String>>,
    simulate_write_error: RefCell<bool>,
    failing_deletes: RefCell<HashSet<PageId>>,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable write error simulation for testing error handling.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        *self.simulate_write_error.borrow_mut() = simulate;
    }

    /// Make deleting the content of `id` fail, for partial cascade tests.
    pub fn fail_delete_of(&self, id: PageId) {
        self.failing_deletes.borrow_mut().insert(id);
    }

    fn check_writable(&self) -> Result<()> {
        if *self.simulate_write_error.borrow() {
            return Err(VoxError::Store("Simulated write error".to_string()));
        }
        Ok(())
    }
}

impl StorageBackend for MemBackend {
    fn load_index(&self) -> Result<HashMap<PageId, PageMeta>> {
        Ok(self.index.borrow().clone())
    }

    fn save_index(&self, new_index: &HashMap<PageId, PageMeta>) -> Result<()> {
        self.check_writable()?;
        *self.index.borrow_mut() = new_index.clone();
        Ok(())
    }

    fn read_content(&self, id: &PageId) -> Result<Option<String>> {
        Ok(self.content.borrow().get(id).cloned())
    }

    fn write_content(&self, id: &PageId, text: &str) -> Result<()> {
        self.check_writable()?;
        self.content.borrow_mut().insert(*id, text.to_string());
        Ok(())
    }

    fn delete_content(&self, id: &PageId) -> Result<()> {
        if self.failing_deletes.borrow().contains(id) {
            return Err(VoxError::Store(format!("Simulated delete error for {}", id)));
        }
        self.content.borrow_mut().remove(id);
        Ok(())
    }
}

//! Key-value persistence for small per-page state (undo/redo stacks).
//!
//! Keys are flat strings such as `undo_<pageId>`. Values are opaque strings; the
//! history module stores JSON in them.

use super::fs_backend::atomic_write;
use crate::error::{Result, VoxError};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<()>;
}

#[derive(Default)]
pub struct MemKv {
    entries: RefCell<HashMap<String, String>>,
    simulate_write_error: RefCell<bool>,
}

impl MemKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_simulate_write_error(&self, simulate: bool) {
        *self.simulate_write_error.borrow_mut() = simulate;
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if *self.simulate_write_error.borrow() {
            return Err(VoxError::Store("Simulated write error".to_string()));
        }
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// One file per key under a directory.
pub struct FsKv {
    dir: PathBuf,
}

impl FsKv {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

impl KeyValueStore for FsKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path).map_err(VoxError::Io)?))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(VoxError::Io)?;
        }
        atomic_write(&self.dir, &self.path_for(key), value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(path).map_err(VoxError::Io)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn mem_kv_set_get_delete() {
        let kv = MemKv::new();
        kv.set("undo_x", "[]").unwrap();
        assert_eq!(kv.get("undo_x").unwrap().as_deref(), Some("[]"));
        kv.delete("undo_x").unwrap();
        assert!(kv.get("undo_x").unwrap().is_none());
        kv.delete("undo_x").unwrap();
    }

    #[test]
    fn fs_kv_persists_to_disk() {
        let dir = TempDir::new().unwrap();
        let kv = FsKv::new(dir.path().join("history"));
        kv.set("redo_abc", "[[]]").unwrap();

        let reopened = FsKv::new(dir.path().join("history"));
        assert_eq!(reopened.get("redo_abc").unwrap().as_deref(), Some("[[]]"));
        reopened.delete("redo_abc").unwrap();
        assert!(reopened.get("redo_abc").unwrap().is_none());
    }
}

//! # Notebook Setup
//!
//! Wires a file-backed [`Notebook`] together: data directory, configuration, page
//! store and history store.
//!
//! ## Data Directory
//!
//! Resolved in order:
//! 1. The `data_override` argument, when given
//! 2. The `VOXNOTE_DATA` environment variable (mostly for tests)
//! 3. The OS data directory for `voxnote` (via the `directories` crate)
//!
//! ## Configuration
//!
//! `voxnote.toml` is read from the global data directory and, when an override is
//! given, from the override directory too. Files are merged, so an override only
//! needs the keys it changes. A missing or unreadable file falls back to defaults.
//!
//! ## Layout
//!
//! ```text
//! <data dir>/
//! ├── voxnote.toml
//! ├── pages.json
//! ├── page-{uuid}.json
//! └── history/
//!     ├── undo_{uuid}.json
//!     └── redo_{uuid}.json
//! ```

use std::path::PathBuf;

use clapfig::{Clapfig, SearchMode, SearchPath};
use directories::ProjectDirs;

use crate::api::Notebook;
use crate::config::VoxConfig;
use crate::error::{Result, VoxError};
use crate::store::fs::FileStore;
use crate::store::kv::FsKv;

pub const DATA_ENV_VAR: &str = "VOXNOTE_DATA";
pub const CONFIG_FILE: &str = "voxnote.toml";

pub struct NotebookContext {
    pub notebook: Notebook<FileStore, FsKv>,
    pub config: VoxConfig,
    pub data_dir: PathBuf,
}

/// The global data directory: `VOXNOTE_DATA` if set, else the OS default.
pub fn global_data_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(DATA_ENV_VAR) {
        return Ok(PathBuf::from(dir));
    }
    ProjectDirs::from("com", "voxnote", "voxnote")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| VoxError::Config("could not determine a data directory".to_string()))
}

pub fn load_config(search_dirs: &[PathBuf]) -> VoxConfig {
    Clapfig::builder()
        .app_name("voxnote")
        .file_name(CONFIG_FILE)
        .search_paths(search_dirs.iter().cloned().map(SearchPath::Path).collect())
        .search_mode(SearchMode::Merge)
        .load()
        .unwrap_or_default()
}

pub fn initialize(data_override: Option<PathBuf>) -> Result<NotebookContext> {
    let (data_dir, search_dirs) = match data_override {
        Some(dir) => {
            // An explicit directory works even where no global one can be found.
            let mut search: Vec<PathBuf> = global_data_dir().into_iter().collect();
            search.push(dir.clone());
            (dir, search)
        }
        None => {
            let global_dir = global_data_dir()?;
            (global_dir.clone(), vec![global_dir])
        }
    };

    let config = load_config(&search_dirs);
    tracing::debug!(data_dir = %data_dir.display(), "initializing notebook");

    let store = FileStore::new(data_dir.clone());
    let kv = FsKv::new(data_dir.join("history"));
    let notebook = Notebook::new(store, kv, config.clone());

    Ok(NotebookContext {
        notebook,
        config,
        data_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DataStore;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config(&[dir.path().to_path_buf()]);
        assert_eq!(config, VoxConfig::default());
    }

    #[test]
    fn test_later_dirs_override_earlier_ones() {
        let global = TempDir::new().unwrap();
        let workspace = TempDir::new().unwrap();
        fs::write(
            global.path().join(CONFIG_FILE),
            "history_limit = 10\nautosave_delay_ms = 200\n",
        )
        .unwrap();
        fs::write(workspace.path().join(CONFIG_FILE), "history_limit = 3\n").unwrap();

        let config = load_config(&[global.path().to_path_buf(), workspace.path().to_path_buf()]);
        assert_eq!(config.history_limit, 3);
        assert_eq!(config.autosave_delay_ms, 200);
    }

    #[test]
    fn test_initialize_with_override_uses_file_store() {
        let dir = TempDir::new().unwrap();
        let mut ctx = initialize(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(ctx.data_dir, dir.path());

        let page = ctx
            .notebook
            .create_page(None, Some("Inbox"), None)
            .unwrap()
            .affected_pages[0]
            .id();
        ctx.notebook.submit_transcript(page, "add a task water plants").unwrap();
        ctx.notebook.flush_all().unwrap();

        assert!(dir.path().join("pages.json").exists());
        assert!(dir.path().join("history").exists());

        let reopened = FileStore::new(dir.path().to_path_buf());
        let stored = reopened.get_page(page).unwrap().unwrap();
        assert!(stored.content.plain_text().contains("water plants"));
    }
}

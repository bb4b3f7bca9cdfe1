use super::backend::StorageBackend;
use crate::error::{Result, VoxError};
use crate::model::{PageId, PageMeta};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const INDEX_FILE: &str = "pages.json";

pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn page_path(&self, id: &PageId) -> PathBuf {
        self.root.join(format!("page-{}.json", id))
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(VoxError::Io)?;
        }
        Ok(())
    }
}

/// Writes `content` to a temp file in `dir` and renames it over `target`.
pub(crate) fn atomic_write(dir: &Path, target: &Path, content: &str) -> Result<()> {
    let tmp = dir.join(format!(".tmp-{}", Uuid::new_v4()));
    fs::write(&tmp, content).map_err(VoxError::Io)?;
    fs::rename(&tmp, target).map_err(VoxError::Io)?;
    Ok(())
}

impl StorageBackend for FsBackend {
    fn load_index(&self) -> Result<HashMap<PageId, PageMeta>> {
        let index_file = self.root.join(INDEX_FILE);
        if !index_file.exists() {
            return Ok(HashMap::new());
        }
        let content = fs::read_to_string(index_file).map_err(VoxError::Io)?;
        let index: HashMap<PageId, PageMeta> =
            serde_json::from_str(&content).map_err(VoxError::Serialization)?;
        Ok(index)
    }

    fn save_index(&self, index: &HashMap<PageId, PageMeta>) -> Result<()> {
        self.ensure_dir()?;
        let content = serde_json::to_string_pretty(index).map_err(VoxError::Serialization)?;
        atomic_write(&self.root, &self.root.join(INDEX_FILE), &content)
    }

    fn read_content(&self, id: &PageId) -> Result<Option<String>> {
        let path = self.page_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).map_err(VoxError::Io)?;
        Ok(Some(content))
    }

    fn write_content(&self, id: &PageId, content: &str) -> Result<()> {
        self.ensure_dir()?;
        atomic_write(&self.root, &self.page_path(id), content)
    }

    fn delete_content(&self, id: &PageId) -> Result<()> {
        let path = self.page_path(id);
        if path.exists() {
            fs::remove_file(path).map_err(VoxError::Io)?;
        }
        Ok(())
    }
}

use super::fs_backend::FsBackend;
use super::page_store::PageStore;
use std::path::PathBuf;

pub type FileStore = PageStore<FsBackend>;

impl FileStore {
    pub fn new(root: PathBuf) -> Self {
        PageStore::with_backend(FsBackend::new(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Block;
    use crate::store::backend::StorageBackend;
    use crate::store::DataStore;
    use tempfile::TempDir;

    #[test]
    fn test_pages_persist_across_store_instances() {
        let dir = TempDir::new().unwrap();
        let page_id = {
            let mut store = FileStore::new(dir.path().to_path_buf());
            let mut page = store.create_page(None, "Journal", "📓").unwrap();
            page.content = page.content.append(vec![Block::paragraph("Dear diary")]);
            store.save_page(&page).unwrap();
            page.id()
        };

        let store = FileStore::new(dir.path().to_path_buf());
        let page = store.get_page(page_id).unwrap().unwrap();
        assert_eq!(page.title(), "Journal");
        assert!(page.content.plain_text().contains("Dear diary"));
    }

    #[test]
    fn test_delete_removes_files() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::new(dir.path().to_path_buf());
        let root = store.create_page(None, "Root", "📄").unwrap();
        let child = store.create_page(Some(root.id()), "Child", "📄").unwrap();

        store.delete_page(root.id()).unwrap();

        assert!(!dir.path().join(format!("page-{}.json", child.id())).exists());
        let leftovers = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with("page-"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_no_tmp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::new(dir.path().to_path_buf());
        store.create_page(None, "Atomic", "📄").unwrap();

        for entry in std::fs::read_dir(dir.path()).unwrap() {
            let name = entry.unwrap().file_name().to_string_lossy().to_string();
            assert!(!name.starts_with(".tmp-"), "Found leftover tmp file: {}", name);
        }
    }
}

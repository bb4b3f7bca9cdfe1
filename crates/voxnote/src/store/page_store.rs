use super::backend::StorageBackend;
use super::{DataStore, DeleteReport};
use crate::error::{Result, VoxError};
use crate::graph;
use crate::model::{Document, Page, PageId, PageMeta};
use std::collections::HashSet;

pub struct PageStore<B: StorageBackend> {
    /// The underlying storage backend.
    /// Exposed as pub(crate) for testing and internal access only.
    pub(crate) backend: B,
}

impl<B: StorageBackend> PageStore<B> {
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn load_content(&self, id: &PageId) -> Result<Document> {
        // Missing content reads as an empty document; the next save heals it.
        match self.backend.read_content(id)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Document::new()),
        }
    }

    fn write_page(&self, page: &Page) -> Result<()> {
        // 1. Content first so the index never points at nothing
        let content = serde_json::to_string(&page.content)?;
        self.backend.write_content(&page.metadata.id, &content)?;

        // 2. Index
        let mut index = self.backend.load_index()?;
        index.insert(page.metadata.id, page.metadata.clone());
        self.backend.save_index(&index)
    }
}

impl<B: StorageBackend> DataStore for PageStore<B> {
    fn create_page(&mut self, parent_id: Option<PageId>, title: &str, icon: &str) -> Result<Page> {
        if let Some(parent) = parent_id {
            if !self.backend.load_index()?.contains_key(&parent) {
                return Err(VoxError::ParentNotFound(parent));
            }
        }
        let page = Page::new(title.to_string(), icon.to_string(), parent_id);
        self.write_page(&page)?;
        tracing::debug!(page = %page.id(), parent = ?parent_id, "page created");
        Ok(page)
    }

    fn get_page(&self, id: PageId) -> Result<Option<Page>> {
        let index = self.backend.load_index()?;
        let Some(metadata) = index.get(&id).cloned() else {
            return Ok(None);
        };
        let content = self.load_content(&id)?;
        Ok(Some(Page { metadata, content }))
    }

    fn save_page(&mut self, page: &Page) -> Result<Page> {
        let index = self.backend.load_index()?;
        let id = page.metadata.id;

        if let Some(parent) = page.metadata.parent_id {
            if !index.contains_key(&parent) {
                return Err(VoxError::ParentNotFound(parent));
            }
            let all: Vec<PageMeta> = index.values().cloned().collect();
            if graph::would_create_cycle(&all, id, parent) {
                return Err(VoxError::CycleDetected { page: id, parent });
            }
        }

        let mut saved = page.clone();
        if let Some(existing) = index.get(&id) {
            saved.metadata.created_at = existing.created_at;
            // touch() only moves forward from the stored timestamp
            saved.metadata.updated_at = existing.updated_at.max(saved.metadata.updated_at);
        }
        saved.metadata.touch();
        self.write_page(&saved)?;
        Ok(saved)
    }

    fn delete_page(&mut self, id: PageId) -> Result<DeleteReport> {
        let mut index = self.backend.load_index()?;
        if !index.contains_key(&id) {
            return Err(VoxError::PageNotFound(id));
        }

        let all: Vec<PageMeta> = index.values().cloned().collect();
        let mut targets: Vec<PageId> = vec![id];
        targets.extend(graph::descendants_of(&all, id).into_iter().map(|p| p.id));

        let mut report = DeleteReport::default();
        let mut blocked: HashSet<PageId> = HashSet::new();

        // Deepest first: a child is always handled before its parent.
        for target in targets.into_iter().rev() {
            if blocked.contains(&target) {
                report.failed.push((
                    target,
                    "a descendant could not be deleted".to_string(),
                ));
                continue;
            }
            match self.backend.delete_content(&target) {
                Ok(()) => {
                    index.remove(&target);
                    report.deleted.push(target);
                }
                Err(e) => {
                    tracing::warn!(page = %target, error = %e, "failed to delete page, continuing");
                    report.failed.push((target, e.to_string()));
                    blocked.extend(graph::ancestors_of(&all, target));
                }
            }
        }

        self.backend.save_index(&index)?;
        tracing::debug!(
            root = %id,
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "cascade delete finished"
        );
        Ok(report)
    }

    fn get_child_pages(&self, parent_id: PageId) -> Result<Vec<Page>> {
        let all: Vec<PageMeta> = self.backend.load_index()?.into_values().collect();
        graph::children_of(&all, parent_id)
            .into_iter()
            .map(|metadata| {
                let content = self.load_content(&metadata.id)?;
                Ok(Page { metadata, content })
            })
            .collect()
    }

    fn load_all_pages(&self) -> Result<Vec<Page>> {
        let mut pages = Vec::new();
        for (id, metadata) in self.backend.load_index()? {
            let content = self.load_content(&id)?;
            pages.push(Page { metadata, content });
        }
        pages.sort_by_key(|p| p.metadata.created_at);
        Ok(pages)
    }

    fn list_meta(&self) -> Result<Vec<PageMeta>> {
        let mut metas: Vec<PageMeta> = self.backend.load_index()?.into_values().collect();
        metas.sort_by_key(|m| m.created_at);
        Ok(metas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Block;
    use crate::store::mem_backend::MemBackend;

    fn make_store() -> PageStore<MemBackend> {
        PageStore::with_backend(MemBackend::new())
    }

    // --- Basic CRUD Tests ---

    #[test]
    fn test_create_and_get_page() {
        let mut store = make_store();
        let page = store.create_page(None, "Inbox", "📥").unwrap();

        let fetched = store.get_page(page.id()).unwrap().unwrap();
        assert_eq!(fetched.title(), "Inbox");
        assert_eq!(fetched.metadata.icon, "📥");
        assert_eq!(fetched.content, page.content);
    }

    #[test]
    fn test_get_missing_page_is_none() {
        let store = make_store();
        assert!(store.get_page(PageId::new()).unwrap().is_none());
    }

    #[test]
    fn test_create_under_missing_parent_fails() {
        let mut store = make_store();
        let result = store.create_page(Some(PageId::new()), "Orphan", "📄");
        assert!(matches!(result, Err(VoxError::ParentNotFound(_))));
    }

    #[test]
    fn test_save_updates_content_and_bumps_updated_at() {
        let mut store = make_store();
        let mut page = store.create_page(None, "Inbox", "📥").unwrap();
        let before = page.metadata.updated_at;

        page.content = page.content.append(vec![Block::paragraph("hello")]);
        let saved = store.save_page(&page).unwrap();
        assert!(saved.metadata.updated_at > before);
        assert_eq!(saved.metadata.created_at, page.metadata.created_at);

        let fetched = store.get_page(page.id()).unwrap().unwrap();
        assert!(fetched.content.plain_text().contains("hello"));
    }

    #[test]
    fn test_save_rejects_cycles() {
        let mut store = make_store();
        let root = store.create_page(None, "Root", "📄").unwrap();
        let child = store.create_page(Some(root.id()), "Child", "📄").unwrap();

        let mut moved = store.get_page(root.id()).unwrap().unwrap();
        moved.metadata.parent_id = Some(child.id());
        let result = store.save_page(&moved);
        assert!(matches!(result, Err(VoxError::CycleDetected { .. })));
    }

    #[test]
    fn test_save_rejects_self_parent() {
        let mut store = make_store();
        let mut page = store.create_page(None, "Root", "📄").unwrap();
        page.metadata.parent_id = Some(page.id());
        assert!(store.save_page(&page).is_err());
    }

    #[test]
    fn test_child_pages_are_listed_oldest_first() {
        let mut store = make_store();
        let root = store.create_page(None, "Root", "📄").unwrap();
        let a = store.create_page(Some(root.id()), "A", "📄").unwrap();
        let b = store.create_page(Some(root.id()), "B", "📄").unwrap();
        store.create_page(None, "Other", "📄").unwrap();

        let children: Vec<PageId> = store
            .get_child_pages(root.id())
            .unwrap()
            .iter()
            .map(Page::id)
            .collect();
        assert_eq!(children, vec![a.id(), b.id()]);
    }

    // --- Cascade Deletion Tests ---

    #[test]
    fn test_delete_cascades_to_all_descendants() {
        let mut store = make_store();
        let root = store.create_page(None, "Root", "📄").unwrap();
        let a = store.create_page(Some(root.id()), "A", "📄").unwrap();
        let a1 = store.create_page(Some(a.id()), "A1", "📄").unwrap();
        store.create_page(Some(a1.id()), "A1x", "📄").unwrap();
        let keep = store.create_page(None, "Keep", "📄").unwrap();

        let report = store.delete_page(a.id()).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.deleted.len(), 3);

        let remaining = store.load_all_pages().unwrap();
        assert_eq!(remaining.len(), 2);
        let remaining_ids: HashSet<PageId> = remaining.iter().map(Page::id).collect();
        assert_eq!(remaining_ids, HashSet::from([root.id(), keep.id()]));
        for page in &remaining {
            if let Some(parent) = page.parent_id() {
                assert!(remaining_ids.contains(&parent));
            }
        }
        assert!(store.backend.read_content(&a1.id()).unwrap().is_none());
    }

    #[test]
    fn test_delete_missing_page_errors() {
        let mut store = make_store();
        let result = store.delete_page(PageId::new());
        assert!(matches!(result, Err(VoxError::PageNotFound(_))));
    }

    #[test]
    fn test_partial_cascade_keeps_going_and_keeps_ancestors() {
        let mut store = make_store();
        let root = store.create_page(None, "Root", "📄").unwrap();
        let bad = store.create_page(Some(root.id()), "Bad", "📄").unwrap();
        let good = store.create_page(Some(root.id()), "Good", "📄").unwrap();
        store.backend.fail_delete_of(bad.id());

        let report = store.delete_page(root.id()).unwrap();
        assert!(!report.is_complete());
        assert_eq!(report.deleted, vec![good.id()]);
        let failed: HashSet<PageId> = report.failed.iter().map(|(id, _)| *id).collect();
        assert_eq!(failed, HashSet::from([bad.id(), root.id()]));

        // Survivors never point at a deleted parent
        assert!(store.get_page(root.id()).unwrap().is_some());
        assert!(store.get_page(bad.id()).unwrap().is_some());
        assert!(store.get_page(good.id()).unwrap().is_none());
    }

    // --- Error Handling Tests ---

    #[test]
    fn test_save_fails_on_write_error() {
        let mut store = make_store();
        let page = store.create_page(None, "Test", "📄").unwrap();
        store.backend.set_simulate_write_error(true);
        assert!(store.save_page(&page).is_err());
    }

    #[test]
    fn test_missing_content_reads_as_empty_document() {
        let mut store = make_store();
        let page = store.create_page(None, "Test", "📄").unwrap();
        store.backend.delete_content(&page.id()).unwrap();
        let fetched = store.get_page(page.id()).unwrap().unwrap();
        assert!(fetched.content.is_empty());
    }
}

use super::mem_backend::MemBackend;
use super::page_store::PageStore;

pub type InMemoryStore = PageStore<MemBackend>;

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        PageStore::with_backend(MemBackend::new())
    }
}

// --- Test Fixtures ---

#[cfg(any(test, feature = "test_utils"))]
pub mod fixtures {
    use super::*;
    use crate::model::{Block, BlockKind, Page, PageId, PageLinkProps};
    use crate::store::DataStore;

    pub struct StoreFixture {
        pub store: InMemoryStore,
    }

    impl Default for StoreFixture {
        fn default() -> Self {
            Self::new()
        }
    }

    impl StoreFixture {
        pub fn new() -> Self {
            Self {
                store: InMemoryStore::new(),
            }
        }

        pub fn with_root(mut self, title: &str) -> Self {
            self.store.create_page(None, title, "📄").unwrap();
            self
        }

        /// Adds a child under `parent` and a matching link block at the end of the
        /// parent's document, the way a linked-page command would.
        pub fn with_linked_child(mut self, parent: PageId, title: &str) -> Self {
            let child = self.store.create_page(Some(parent), title, "📄").unwrap();
            let mut parent_page = self.store.get_page(parent).unwrap().unwrap();
            parent_page.content = parent_page.content.append(vec![link_block(&child)]);
            self.store.save_page(&parent_page).unwrap();
            self
        }

        pub fn page_titled(&self, title: &str) -> Page {
            self.store
                .load_all_pages()
                .unwrap()
                .into_iter()
                .find(|p| p.title() == title)
                .unwrap()
        }
    }

    pub fn link_block(page: &Page) -> Block {
        Block::new(BlockKind::PageLink(PageLinkProps {
            page_id: page.id(),
            page_title: page.title().to_string(),
            page_icon: page.metadata.icon.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::StoreFixture;
    use super::*;
    use crate::store::DataStore;

    #[test]
    fn test_fixtures_build_linked_tree() {
        let fixture = StoreFixture::default().with_root("Home");
        let home = fixture.page_titled("Home");
        let fixture = fixture.with_linked_child(home.id(), "Projects");

        let home = fixture.page_titled("Home");
        let projects = fixture.page_titled("Projects");
        assert_eq!(projects.parent_id(), Some(home.id()));
        assert_eq!(home.content.page_link_ids(), vec![projects.id()]);
    }

    #[test]
    fn test_empty_store_lists_nothing() {
        let store = InMemoryStore::new();
        assert!(store.load_all_pages().unwrap().is_empty());
        assert!(store.list_meta().unwrap().is_empty());
    }
}

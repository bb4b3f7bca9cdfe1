//! # Link Consistency Validator
//!
//! Keeps the `pageLink` blocks of a page's document in one-to-one correspondence with
//! the page's children in the store.
//!
//! | Situation                              | Initial | Live | Replay |
//! |----------------------------------------|---------|------|--------|
//! | link to a page that is not a child     | to text | to text | to text |
//! | second link to the same child          | to text | to text | to text |
//! | child with no link                     | append  | -    | -      |
//! | link removed since `previous`          | -       | cascade delete | - |
//! | link title/icon out of date            | refresh | refresh | refresh |
//!
//! "To text" turns the link into a paragraph holding the old title, with the same
//! block id. Replay mode never deletes pages: undoing past a link deletion does not
//! resurrect the page, and redoing it does not delete anything twice.
//!
//! Reconciliation is idempotent: running it on its own output changes nothing.

use std::collections::{HashMap, HashSet};

use crate::error::{Result, VoxError};
use crate::model::{Block, BlockKind, Document, InlineRun, Page, PageId, PageLinkProps};
use crate::store::DataStore;

#[derive(Debug, Clone, Copy)]
pub enum ReconcileMode<'a> {
    /// First load of a page: orphaned children get their link back.
    Initial,
    /// After a live edit. Links missing compared to `previous` were deleted by the
    /// user; their pages go too.
    Live { previous: &'a Document },
    /// After undo/redo. Nothing is created or deleted in the store.
    Replay,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkReport {
    pub document: Document,
    pub stale_replaced: usize,
    pub links_added: usize,
    pub titles_refreshed: usize,
    pub pages_deleted: Vec<PageId>,
    pub delete_failures: Vec<(PageId, String)>,
}

impl LinkReport {
    /// Whether the document was rewritten.
    pub fn changed_document(&self) -> bool {
        self.stale_replaced + self.links_added + self.titles_refreshed > 0
    }
}

pub fn reconcile<S: DataStore>(
    store: &mut S,
    page_id: PageId,
    document: &Document,
    mode: ReconcileMode<'_>,
) -> Result<LinkReport> {
    let mut pages_deleted = Vec::new();
    let mut delete_failures = Vec::new();

    if let ReconcileMode::Live { previous } = mode {
        let remaining: HashSet<PageId> = document.page_link_ids().into_iter().collect();
        let removed = previous
            .page_link_ids()
            .into_iter()
            .filter(|id| !remaining.contains(id));
        for linked in removed {
            match store.get_page(linked)? {
                Some(page) if page.parent_id() == Some(page_id) => {}
                _ => continue,
            }
            match store.delete_page(linked) {
                Ok(report) => {
                    pages_deleted.extend(report.deleted);
                    delete_failures.extend(report.failed);
                }
                Err(VoxError::PageNotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
    }

    let children = store.get_child_pages(page_id)?;
    let by_id: HashMap<PageId, &Page> = children.iter().map(|p| (p.id(), p)).collect();

    let mut seen: HashSet<PageId> = HashSet::new();
    let mut stale_replaced = 0;
    let mut titles_refreshed = 0;
    let mut document = document.map_blocks(|block| {
        let Some(link) = block.page_link().cloned() else {
            return;
        };
        match by_id.get(&link.page_id) {
            Some(child) if seen.insert(link.page_id) => {
                let fresh = PageLinkProps {
                    page_id: link.page_id,
                    page_title: child.title().to_string(),
                    page_icon: child.metadata.icon.clone(),
                };
                if fresh != link && block.set_kind(BlockKind::PageLink(fresh)).is_ok() {
                    titles_refreshed += 1;
                }
            }
            _ => {
                if demote(block, &link.page_title) {
                    stale_replaced += 1;
                }
            }
        }
    });

    let mut links_added = 0;
    if matches!(mode, ReconcileMode::Initial) {
        let orphans: Vec<Block> = children
            .iter()
            .filter(|child| !seen.contains(&child.id()))
            .map(|child| {
                Block::link_to(PageLinkProps {
                    page_id: child.id(),
                    page_title: child.title().to_string(),
                    page_icon: child.metadata.icon.clone(),
                })
            })
            .collect();
        links_added = orphans.len();
        if links_added > 0 {
            document = document.append(orphans);
        }
    }

    if stale_replaced + links_added + titles_refreshed + pages_deleted.len() > 0 {
        tracing::debug!(
            page = %page_id,
            stale_replaced,
            links_added,
            titles_refreshed,
            pages_deleted = pages_deleted.len(),
            "links reconciled"
        );
    }
    for (failed, error) in &delete_failures {
        tracing::warn!(page = %failed, error = %error, "linked page not deleted");
    }

    Ok(LinkReport {
        document,
        stale_replaced,
        links_added,
        titles_refreshed,
        pages_deleted,
        delete_failures,
    })
}

/// Turns a link into a paragraph holding `title`. Same id.
fn demote(block: &mut Block, title: &str) -> bool {
    if block.set_kind(BlockKind::Paragraph).is_err() {
        return false;
    }
    let content = if title.is_empty() {
        Vec::new()
    } else {
        vec![InlineRun::plain(title)]
    };
    block.set_content(content).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockType;
    use crate::store::memory::fixtures::{link_block, StoreFixture};

    fn home_with_children(titles: &[&str]) -> StoreFixture {
        let mut fixture = StoreFixture::new().with_root("Home");
        let home = fixture.page_titled("Home").id();
        for title in titles {
            fixture = fixture.with_linked_child(home, title);
        }
        fixture
    }

    #[test]
    fn test_consistent_document_is_untouched() {
        let mut fixture = home_with_children(&["A", "B"]);
        let home = fixture.page_titled("Home");
        let report = reconcile(&mut fixture.store, home.id(), &home.content, ReconcileMode::Initial).unwrap();
        assert_eq!(report.document, home.content);
        assert!(!report.changed_document());
    }

    #[test]
    fn test_stale_link_becomes_paragraph_with_title() {
        let mut fixture = home_with_children(&["Gone"]);
        let home = fixture.page_titled("Home");
        let gone = fixture.page_titled("Gone");
        fixture.store.delete_page(gone.id()).unwrap();

        let link_id = home.content.blocks().last().unwrap().id().clone();
        let report = reconcile(&mut fixture.store, home.id(), &home.content, ReconcileMode::Replay).unwrap();
        assert_eq!(report.stale_replaced, 1);
        let block = report.document.find_by_id(&link_id).unwrap();
        assert_eq!(block.block_type(), BlockType::Paragraph);
        assert_eq!(block.plain_text(), "Gone");
    }

    #[test]
    fn test_duplicate_link_is_demoted() {
        let mut fixture = home_with_children(&["A"]);
        let home = fixture.page_titled("Home");
        let a = fixture.page_titled("A");
        let doc = home.content.append(vec![link_block(&a)]);

        let report = reconcile(&mut fixture.store, home.id(), &doc, ReconcileMode::Replay).unwrap();
        assert_eq!(report.stale_replaced, 1);
        assert_eq!(report.document.page_link_ids(), vec![a.id()]);
    }

    #[test]
    fn test_orphans_are_linked_only_on_initial_load() {
        let mut fixture = StoreFixture::new().with_root("Home");
        let home = fixture.page_titled("Home");
        let orphan = fixture.store.create_page(Some(home.id()), "Orphan", "🧸").unwrap();

        let live = reconcile(
            &mut fixture.store,
            home.id(),
            &home.content,
            ReconcileMode::Live {
                previous: &home.content,
            },
        )
        .unwrap();
        assert_eq!(live.links_added, 0);

        let initial = reconcile(&mut fixture.store, home.id(), &home.content, ReconcileMode::Initial).unwrap();
        assert_eq!(initial.links_added, 1);
        let link = initial.document.blocks().last().unwrap().page_link().unwrap().clone();
        assert_eq!(link.page_id, orphan.id());
        assert_eq!(link.page_icon, "🧸");
    }

    #[test]
    fn test_removed_link_cascades_in_live_mode() {
        let mut fixture = home_with_children(&["Projects"]);
        let projects = fixture.page_titled("Projects");
        fixture = fixture.with_linked_child(projects.id(), "Sub");
        let home = fixture.page_titled("Home");

        let link_id = home.content.blocks().last().unwrap().id().clone();
        let edited = home.content.remove_by_id(&[link_id]);
        let report = reconcile(
            &mut fixture.store,
            home.id(),
            &edited,
            ReconcileMode::Live {
                previous: &home.content,
            },
        )
        .unwrap();

        assert_eq!(report.pages_deleted.len(), 2);
        assert_eq!(fixture.store.load_all_pages().unwrap().len(), 1);
        assert_eq!(report.document, edited);
    }

    #[test]
    fn test_replay_never_deletes() {
        let mut fixture = home_with_children(&["Keep"]);
        let home = fixture.page_titled("Home");
        let link_id = home.content.blocks().last().unwrap().id().clone();
        let edited = home.content.remove_by_id(&[link_id]);

        let report = reconcile(&mut fixture.store, home.id(), &edited, ReconcileMode::Replay).unwrap();
        assert!(report.pages_deleted.is_empty());
        assert_eq!(fixture.store.load_all_pages().unwrap().len(), 2);
    }

    #[test]
    fn test_titles_are_refreshed() {
        let mut fixture = home_with_children(&["Old"]);
        let mut child = fixture.page_titled("Old");
        child.metadata.title = "New".to_string();
        fixture.store.save_page(&child).unwrap();
        let home = fixture.page_titled("Home");

        let report = reconcile(&mut fixture.store, home.id(), &home.content, ReconcileMode::Replay).unwrap();
        assert_eq!(report.titles_refreshed, 1);
        let link = report.document.blocks().last().unwrap().page_link().unwrap().clone();
        assert_eq!(link.page_title, "New");
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut fixture = home_with_children(&["A", "Gone"]);
        let home = fixture.page_titled("Home");
        let gone = fixture.page_titled("Gone");
        fixture.store.delete_page(gone.id()).unwrap();
        fixture.store.create_page(Some(home.id()), "Orphan", "📄").unwrap();

        let first = reconcile(&mut fixture.store, home.id(), &home.content, ReconcileMode::Initial).unwrap();
        assert!(first.changed_document());
        let second = reconcile(&mut fixture.store, home.id(), &first.document, ReconcileMode::Initial).unwrap();
        assert_eq!(second.document, first.document);
        assert!(!second.changed_document());
    }
}

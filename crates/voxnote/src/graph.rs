//! # Page Tree Helpers
//!
//! Pages form a tree through `parent_id`, independent of block nesting. Every
//! path that needs "this page and everything under it" (cascade deletion, link
//! reconciliation, cycle checks) goes through the pure functions here instead of
//! walking the tree ad hoc.
//!
//! All functions take a flat slice of [`PageMeta`], which is what the store's index
//! holds, so no content has to be loaded.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::model::{PageId, PageMeta};

/// Every transitive descendant of `root_id`, parents before children.
/// The root itself is not included.
pub fn descendants_of(all_pages: &[PageMeta], root_id: PageId) -> Vec<PageMeta> {
    let by_parent = children_index(all_pages);
    let mut out = Vec::new();
    let mut visited = HashSet::from([root_id]);
    let mut queue = vec![root_id];

    while let Some(current) = queue.pop() {
        if let Some(children) = by_parent.get(&current) {
            for child in children {
                // The store forbids cycles, but corrupt data must not loop forever.
                if visited.insert(child.id) {
                    out.push((*child).clone());
                    queue.push(child.id);
                }
            }
        }
    }
    out
}

/// Ancestors of `page_id`, nearest first. Stops at a root, a missing parent, or a
/// repeated id.
pub fn ancestors_of(all_pages: &[PageMeta], page_id: PageId) -> Vec<PageId> {
    let by_id: HashMap<PageId, &PageMeta> = all_pages.iter().map(|p| (p.id, p)).collect();
    let mut out = Vec::new();
    let mut seen = HashSet::from([page_id]);
    let mut current = by_id.get(&page_id).and_then(|p| p.parent_id);

    while let Some(id) = current {
        if !seen.insert(id) {
            tracing::warn!("cycle detected above page {}", page_id);
            break;
        }
        out.push(id);
        current = by_id.get(&id).and_then(|p| p.parent_id);
    }
    out
}

/// True if making `new_parent` the parent of `page_id` would make the page its own
/// ancestor.
pub fn would_create_cycle(all_pages: &[PageMeta], page_id: PageId, new_parent: PageId) -> bool {
    new_parent == page_id || ancestors_of(all_pages, new_parent).contains(&page_id)
}

/// Direct children of `parent_id`, oldest first.
pub fn children_of(all_pages: &[PageMeta], parent_id: PageId) -> Vec<PageMeta> {
    let mut children: Vec<PageMeta> = all_pages
        .iter()
        .filter(|p| p.parent_id == Some(parent_id))
        .cloned()
        .collect();
    children.sort_by_key(|p| p.created_at);
    children
}

/// A page with its nested children, for navigation listings.
#[derive(Debug, Clone, Serialize)]
pub struct PageNode {
    pub page: PageMeta,
    pub children: Vec<PageNode>,
}

/// Builds the forest of root pages. Pages whose parent is missing are treated as
/// roots so they stay reachable.
pub fn build_tree(all_pages: &[PageMeta]) -> Vec<PageNode> {
    let ids: HashSet<PageId> = all_pages.iter().map(|p| p.id).collect();
    let by_parent = children_index(all_pages);

    let mut roots: Vec<&PageMeta> = all_pages
        .iter()
        .filter(|p| p.parent_id.is_none_or(|parent| !ids.contains(&parent)))
        .collect();
    roots.sort_by_key(|p| p.created_at);

    let mut visited = HashSet::new();
    roots
        .into_iter()
        .filter_map(|p| build_node(p, &by_parent, &mut visited))
        .collect()
}

fn build_node(
    page: &PageMeta,
    by_parent: &HashMap<PageId, Vec<&PageMeta>>,
    visited: &mut HashSet<PageId>,
) -> Option<PageNode> {
    if !visited.insert(page.id) {
        return None;
    }
    let children = by_parent
        .get(&page.id)
        .map(|kids| {
            kids.iter()
                .filter_map(|k| build_node(k, by_parent, visited))
                .collect()
        })
        .unwrap_or_default();
    Some(PageNode {
        page: page.clone(),
        children,
    })
}

fn children_index(all_pages: &[PageMeta]) -> HashMap<PageId, Vec<&PageMeta>> {
    let mut by_parent: HashMap<PageId, Vec<&PageMeta>> = HashMap::new();
    for page in all_pages {
        if let Some(parent) = page.parent_id {
            by_parent.entry(parent).or_default().push(page);
        }
    }
    for kids in by_parent.values_mut() {
        kids.sort_by_key(|p| p.created_at);
    }
    by_parent
}

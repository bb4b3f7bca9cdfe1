//! Selector resolution.
//!
//! Positional selectors (`FromEnd`, `FromStart`, `Everything`) look at top-level blocks
//! only. `Containing` and nested `AllOfType` walk the whole tree depth-first.
//!
//! Single-target selectors yield at most one id. When a phrase like "this" does not
//! name a block, the interpreter emits "last block", so the last matching block wins.

use std::collections::HashSet;

use crate::interpreter::BlockSelector;
use crate::model::{Block, BlockId, BlockType, Document};

/// Ids of the blocks `selector` points at, in document order.
pub fn resolve(document: &Document, selector: &BlockSelector) -> Vec<BlockId> {
    let of_type = |block: &&Block, wanted: &Option<BlockType>| {
        wanted.map_or(true, |t| block.block_type() == t)
    };

    match selector {
        BlockSelector::FromEnd { block_type, index } => document
            .blocks()
            .iter()
            .rev()
            .filter(|b| of_type(b, block_type))
            .nth(*index)
            .map(|b| vec![b.id().clone()])
            .unwrap_or_default(),
        BlockSelector::FromStart { block_type, index } => document
            .blocks()
            .iter()
            .filter(|b| of_type(b, block_type))
            .nth(*index)
            .map(|b| vec![b.id().clone()])
            .unwrap_or_default(),
        BlockSelector::AllOfType {
            block_type,
            nested: true,
        } => document
            .iter()
            .filter(|b| b.block_type() == *block_type)
            .map(|b| b.id().clone())
            .collect(),
        BlockSelector::AllOfType {
            block_type,
            nested: false,
        } => document
            .blocks()
            .iter()
            .filter(|b| b.block_type() == *block_type)
            .map(|b| b.id().clone())
            .collect(),
        BlockSelector::Containing { text, block_type } => {
            let needle = text.to_lowercase();
            document
                .iter()
                .filter(|b| of_type(b, block_type))
                .find(|b| searchable_text(b).to_lowercase().contains(&needle))
                .map(|b| vec![b.id().clone()])
                .unwrap_or_default()
        }
        BlockSelector::Id(id) => {
            if document.contains(id) {
                vec![id.clone()]
            } else {
                Vec::new()
            }
        }
        BlockSelector::Everything => document.blocks().iter().map(|b| b.id().clone()).collect(),
    }
}

/// The blocks a text operation may touch: everything when `scope` is `None`,
/// otherwise the matched blocks and their descendants. `None` in the result means
/// "whole document".
pub fn text_scope(document: &Document, scope: Option<&BlockSelector>) -> Option<HashSet<BlockId>> {
    let selector = scope?;
    let roots: HashSet<BlockId> = resolve(document, selector).into_iter().collect();
    let mut ids = HashSet::new();
    collect_subtrees(document.blocks(), &roots, false, &mut ids);
    Some(ids)
}

fn collect_subtrees(blocks: &[Block], roots: &HashSet<BlockId>, inside: bool, out: &mut HashSet<BlockId>) {
    for block in blocks {
        let included = inside || roots.contains(block.id());
        if included {
            out.insert(block.id().clone());
        }
        collect_subtrees(block.children(), roots, included, out);
    }
}

/// Page ids linked from the subtrees rooted at `ids`.
pub fn linked_pages_under(document: &Document, ids: &[BlockId]) -> Vec<crate::model::PageId> {
    let roots: HashSet<BlockId> = ids.iter().cloned().collect();
    let mut subtree = HashSet::new();
    collect_subtrees(document.blocks(), &roots, false, &mut subtree);
    document
        .iter()
        .filter(|b| subtree.contains(b.id()))
        .filter_map(|b| b.page_link().map(|link| link.page_id))
        .collect()
}

/// Text a "containing" selector matches against. Page links match on their title.
fn searchable_text(block: &Block) -> String {
    match block.page_link() {
        Some(link) => link.page_title.clone(),
        None => block.plain_text(),
    }
}

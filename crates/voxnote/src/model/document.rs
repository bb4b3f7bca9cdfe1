//! # Documents
//!
//! A [`Document`] is the ordered list of top-level blocks of one page.
//!
//! Every operation here is a pure transformation: it takes `&self` and returns a new
//! document. Undo snapshots and link reconciliation can then compare "before" and
//! "after" values without worrying about aliasing.
//!
//! ## Invariants
//!
//! - Block ids are unique across the whole tree. Deserialization rejects duplicates;
//!   insert operations give colliding incoming blocks fresh ids.
//! - Ids survive in-place edits, so callers can diff documents by id.
//!
//! ## Robustness
//!
//! Voice commands frequently reference the wrong anchor. [`Document::insert_after`]
//! never fails: an unknown anchor appends at the end of the top level.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VoxError};
use crate::model::block::{Block, BlockId};
use crate::model::page::PageId;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Block>", into = "Vec<Block>")]
pub struct Document {
    blocks: Vec<Block>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a document, rejecting duplicate block ids.
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self> {
        let doc = Self { blocks };
        doc.validate()?;
        Ok(doc)
    }

    /// The default content of a freshly created page: a title heading and an
    /// empty paragraph to type into.
    pub fn skeleton(title: &str) -> Self {
        Self {
            blocks: vec![Block::heading(1, title), Block::paragraph("")],
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Depth-first, pre-order iteration over every block in the tree.
    pub fn iter(&self) -> DepthFirst<'_> {
        DepthFirst {
            stack: self.blocks.iter().rev().collect(),
        }
    }

    pub fn find_by_id(&self, id: &BlockId) -> Option<&Block> {
        self.iter().find(|b| b.id() == id)
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.find_by_id(id).is_some()
    }

    pub fn last_top_level_id(&self) -> Option<&BlockId> {
        self.blocks.last().map(Block::id)
    }

    /// Ids of every page referenced by a `pageLink` block, in document order.
    pub fn page_link_ids(&self) -> Vec<PageId> {
        self.iter()
            .filter_map(|b| b.page_link().map(|l| l.page_id))
            .collect()
    }

    pub fn plain_text(&self) -> String {
        self.iter()
            .map(Block::plain_text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Inserts `new_blocks` as siblings right after `anchor`, wherever it lives in
    /// the tree. A missing or unknown anchor appends to the top level.
    pub fn insert_after(&self, anchor: Option<&BlockId>, new_blocks: Vec<Block>) -> Document {
        let new_blocks = self.with_unique_ids(new_blocks);
        let mut blocks = self.blocks.clone();

        if let Some(anchor) = anchor {
            if insert_after_in(&mut blocks, anchor, &new_blocks) {
                return Document { blocks };
            }
            tracing::debug!("anchor {} not found, appending instead", anchor);
        }

        blocks.extend(new_blocks);
        Document { blocks }
    }

    /// Appends after the last top-level block (or as the first block of an empty
    /// document).
    pub fn append(&self, new_blocks: Vec<Block>) -> Document {
        self.insert_after(self.last_top_level_id(), new_blocks)
    }

    /// Removes every block whose id is in `ids`, searching children recursively.
    /// Removing a block removes its subtree.
    pub fn remove_by_id(&self, ids: &[BlockId]) -> Document {
        let ids: HashSet<&BlockId> = ids.iter().collect();
        Document {
            blocks: remove_in(&self.blocks, &ids),
        }
    }

    /// Replaces the whole content, keeping the first occurrence of any repeated id
    /// and re-identifying later ones.
    pub fn replace_all(&self, new_blocks: Vec<Block>) -> Document {
        Document::default().insert_after(None, new_blocks)
    }

    /// Returns a copy where `f` has been applied to every block whose id is in `ids`.
    /// Page-link children are never visited because page links have none.
    pub fn update_blocks<F>(&self, ids: &HashSet<BlockId>, mut f: F) -> Document
    where
        F: FnMut(&mut Block),
    {
        let mut blocks = self.blocks.clone();
        visit_mut(&mut blocks, &mut |block| {
            if ids.contains(block.id()) {
                f(block);
            }
        });
        Document { blocks }
    }

    /// Returns a copy where `f` has been applied to every block in the tree.
    pub fn map_blocks<F>(&self, mut f: F) -> Document
    where
        F: FnMut(&mut Block),
    {
        let mut blocks = self.blocks.clone();
        visit_mut(&mut blocks, &mut f);
        Document { blocks }
    }

    /// Replaces the block with id `id` (and its subtree) by `replacement`.
    pub fn replace_block(&self, id: &BlockId, replacement: Block) -> Document {
        let mut blocks = self.blocks.clone();
        replace_in(&mut blocks, id, &replacement);
        Document { blocks }
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for block in self.iter() {
            if !seen.insert(block.id()) {
                return Err(VoxError::DuplicateBlock(block.id().clone()));
            }
        }
        Ok(())
    }

    /// Gives fresh ids to incoming blocks that collide with this document or with
    /// each other.
    fn with_unique_ids(&self, mut incoming: Vec<Block>) -> Vec<Block> {
        let mut seen: HashSet<BlockId> = self.iter().map(|b| b.id().clone()).collect();
        visit_mut(&mut incoming, &mut |block| {
            if !seen.insert(block.id().clone()) {
                let fresh = BlockId::new();
                seen.insert(fresh.clone());
                block.set_id(fresh);
            }
        });
        incoming
    }
}

impl TryFrom<Vec<Block>> for Document {
    type Error = VoxError;

    fn try_from(blocks: Vec<Block>) -> Result<Self> {
        Document::from_blocks(blocks)
    }
}

impl From<Document> for Vec<Block> {
    fn from(doc: Document) -> Self {
        doc.blocks
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = &'a Block;
    type IntoIter = DepthFirst<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct DepthFirst<'a> {
    stack: Vec<&'a Block>,
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = &'a Block;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.stack.pop()?;
        self.stack.extend(block.children().iter().rev());
        Some(block)
    }
}

fn visit_mut<F>(blocks: &mut [Block], f: &mut F)
where
    F: FnMut(&mut Block),
{
    for block in blocks.iter_mut() {
        f(block);
        visit_mut(block.children_vec_mut(), f);
    }
}

fn insert_after_in(blocks: &mut Vec<Block>, anchor: &BlockId, new_blocks: &[Block]) -> bool {
    if let Some(pos) = blocks.iter().position(|b| b.id() == anchor) {
        let tail = blocks.split_off(pos + 1);
        blocks.extend(new_blocks.iter().cloned());
        blocks.extend(tail);
        return true;
    }
    blocks
        .iter_mut()
        .any(|b| insert_after_in(b.children_vec_mut(), anchor, new_blocks))
}

fn remove_in(blocks: &[Block], ids: &HashSet<&BlockId>) -> Vec<Block> {
    blocks
        .iter()
        .filter(|b| !ids.contains(b.id()))
        .map(|b| {
            let mut kept = b.clone();
            let children = remove_in(b.children(), ids);
            *kept.children_vec_mut() = children;
            kept
        })
        .collect()
}

fn replace_in(blocks: &mut [Block], id: &BlockId, replacement: &Block) -> bool {
    for block in blocks.iter_mut() {
        if block.id() == id {
            *block = replacement.clone();
            return true;
        }
        if replace_in(block.children_vec_mut(), id, replacement) {
            return true;
        }
    }
    false
}

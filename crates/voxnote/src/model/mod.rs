//! # Domain Model
//!
//! - [`block`]: [`Block`](block::Block), its closed set of kinds and the editor wire format
//! - [`document`]: [`Document`](document::Document), the immutable block tree of one page
//! - [`page`]: [`Page`](page::Page) and [`PageMeta`](page::PageMeta), nodes of the page tree

pub mod block;
pub mod document;
pub mod page;

pub use block::{Block, BlockId, BlockKind, BlockType, InlineRun, PageLinkProps, Styles};
pub use document::Document;
pub use page::{Page, PageId, PageMeta};

use super::{Execution, Notice, Outcome};
use crate::model::{Block, Document};

/// Appends dictated blocks after the last top-level block.
///
/// Page links are never inserted from dictation: a link without a page behind it
/// would be stale the moment it lands. They are dropped with a warning at any
/// depth.
pub fn run(document: &Document, blocks: &[Block]) -> Execution {
    let mut dropped = 0;
    let content = without_links(blocks, &mut dropped);

    if content.is_empty() {
        let execution = Execution::unchanged(document, Outcome::no_op("nothing to insert"));
        return if dropped == 0 {
            execution
        } else {
            execution.with_notice(Notice::warning("Page links can only be created with a new page"))
        };
    }

    let count = content.len();
    let mut execution = Execution::applied(document.append(content), count);
    if dropped > 0 {
        tracing::warn!(dropped, "page links dropped from dictation");
        execution = execution.with_notice(Notice::warning(format!(
            "Skipped {} page link(s); use \"create a page\" instead",
            dropped
        )));
    }
    execution
}

fn without_links(blocks: &[Block], dropped: &mut usize) -> Vec<Block> {
    let mut kept = Vec::with_capacity(blocks.len());
    for block in blocks {
        if block.is_page_link() {
            *dropped += 1;
            continue;
        }
        let mut block = block.clone();
        if !block.children().is_empty() {
            let children = without_links(block.children(), dropped);
            // only page links refuse children
            if block.set_children(children).is_err() {
                continue;
            }
        }
        kept.push(block);
    }
    kept
}

/// Records text verbatim as a paragraph at the end of the document.
pub fn plain_text(document: &Document, text: &str) -> Execution {
    let text = text.trim();
    if text.is_empty() {
        return Execution::unchanged(document, Outcome::no_op("empty transcript"));
    }
    Execution::applied(document.append(vec![Block::paragraph(text)]), 1)
        .with_notice(Notice::info("Command not recognized, added as text"))
}

use std::collections::HashSet;

use serde_json::{Map, Value};

use super::resolve::{linked_pages_under, resolve};
use super::{ConfirmationRequest, Execution, Notice, Outcome, SideEffect};
use crate::interpreter::BlockSelector;
use crate::model::{Block, BlockId, BlockKind, BlockType, Document};

/// Converts the matched blocks to `new_type`, keeping ids, runs and children.
///
/// Type-specific props not given in `props` carry over where they still apply:
/// a heading stays at its level, a checked task stays checked.
pub fn change_type(
    document: &Document,
    target: &BlockSelector,
    new_type: BlockType,
    props: &Map<String, Value>,
) -> Execution {
    if new_type == BlockType::PageLink {
        return Execution::unchanged(document, Outcome::no_op("blocks cannot become page links"))
            .with_notice(Notice::warning("Use \"create a page\" to add a page link"));
    }

    let matched = resolve(document, target);
    if matched.is_empty() {
        return Execution::unchanged(document, Outcome::no_op(format!("no {} found", target)));
    }
    let ids: HashSet<BlockId> = matched.into_iter().collect();

    let mut changed = 0;
    let updated = document.update_blocks(&ids, |block| {
        if block.is_page_link() {
            return;
        }
        let Ok(kind) = BlockKind::from_type(new_type, &carried_props(block, props)) else {
            return;
        };
        if *block.kind() != kind && block.set_kind(kind).is_ok() {
            changed += 1;
        }
    });

    if changed == 0 {
        return Execution::unchanged(
            document,
            Outcome::no_op(format!("{} is already a {}", target, new_type)),
        );
    }
    Execution::applied(updated, changed)
}

fn carried_props(block: &Block, props: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = props.clone();
    match block.kind() {
        BlockKind::Heading { level } => {
            merged.entry("level").or_insert_with(|| Value::from(*level));
        }
        BlockKind::TodoListItem { checked } => {
            merged.entry("checked").or_insert(Value::Bool(*checked));
        }
        BlockKind::Code {
            language: Some(language),
        } => {
            merged
                .entry("language")
                .or_insert_with(|| Value::String(language.clone()));
        }
        _ => {}
    }
    merged
}

/// Removes the matched blocks and their subtrees.
///
/// If the removed subtrees hold page links, the linked pages will be deleted once
/// the links are gone. That needs `confirmed`; without it the document is left
/// alone and a confirmation request is emitted.
pub fn delete(document: &Document, selector: &BlockSelector, confirmed: bool) -> Execution {
    let matched = resolve(document, selector);
    if matched.is_empty() {
        return Execution::unchanged(document, Outcome::no_op(format!("no {} found", selector)));
    }

    let linked = linked_pages_under(document, &matched);
    if !linked.is_empty() && !confirmed {
        let message = if linked.len() == 1 {
            "This also deletes a linked page and everything under it.".to_string()
        } else {
            format!(
                "This also deletes {} linked pages and everything under them.",
                linked.len()
            )
        };
        tracing::debug!(pages = linked.len(), "block deletion needs confirmation");
        return Execution::unchanged(document, Outcome::ConfirmationRequired).with_effect(
            SideEffect::ConfirmationRequired(ConfirmationRequest {
                message,
                pages: linked,
            }),
        );
    }

    Execution::applied(document.remove_by_id(&matched), matched.len())
}

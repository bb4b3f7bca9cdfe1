//! Text-level operations: replace, delete and select.
//!
//! Matching is case-insensitive and literal. Every inline run of every block in
//! scope is scanned, children included. A match never spans two runs. Within a
//! run, match ranges are taken from the original text and applied from the last to
//! the first so earlier offsets stay valid.

use regex::{Regex, RegexBuilder};

use super::resolve::{resolve, text_scope};
use super::{Execution, Outcome, Selection, SideEffect, TextMatch};
use crate::interpreter::{BlockSelector, Target, TextRange};
use crate::model::{Block, Document, InlineRun};

fn needle(find: &str) -> Option<Regex> {
    if find.trim().is_empty() {
        return None;
    }
    RegexBuilder::new(&regex::escape(find))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Rewrites matching runs in the blocks `scope` covers. `edit` receives the run
/// text and every match range found in it, in order. Returns the new document
/// and the number of matches edited.
fn edit_runs<F>(document: &Document, scope: Option<&BlockSelector>, pattern: &Regex, mut edit: F) -> (Document, usize)
where
    F: FnMut(&mut String, &[(usize, usize)]),
{
    let allowed = text_scope(document, scope);
    let mut count = 0;
    let updated = document.map_blocks(|block| {
        if allowed.as_ref().is_some_and(|ids| !ids.contains(block.id())) {
            return;
        }
        let Some(runs) = block.content_mut() else {
            return;
        };
        for run in runs.iter_mut() {
            let ranges: Vec<(usize, usize)> = pattern
                .find_iter(&run.text)
                .map(|m| (m.start(), m.end()))
                .collect();
            if ranges.is_empty() {
                continue;
            }
            edit(&mut run.text, &ranges);
            count += ranges.len();
        }
        runs.retain(|run: &InlineRun| !run.text.is_empty());
    });
    (updated, count)
}

pub fn replace(
    document: &Document,
    find: &str,
    replace_with: &str,
    scope: Option<&BlockSelector>,
) -> Execution {
    let Some(pattern) = needle(find) else {
        return Execution::unchanged(document, Outcome::no_op("nothing to replace"));
    };
    let (updated, count) = edit_runs(document, scope, &pattern, |text, ranges| {
        for &(start, end) in ranges.iter().rev() {
            text.replace_range(start..end, replace_with);
        }
    });
    if count == 0 {
        return Execution::unchanged(document, Outcome::no_op(format!("\"{}\" not found", find)));
    }
    Execution::applied(updated, count)
}

/// Deletes every occurrence of the range's text, together with one adjacent space
/// so no double spaces are left behind. Runs that end up empty are dropped.
pub fn delete(document: &Document, range: &TextRange) -> Execution {
    let Some(pattern) = needle(&range.text) else {
        return Execution::unchanged(document, Outcome::no_op("nothing to delete"));
    };
    let (updated, count) = edit_runs(document, range.within.as_ref(), &pattern, |text, ranges| {
        for (start, end) in with_adjacent_space(text, ranges).into_iter().rev() {
            text.replace_range(start..end, "");
        }
    });
    if count == 0 {
        return Execution::unchanged(
            document,
            Outcome::no_op(format!("\"{}\" not found", range.text)),
        );
    }
    Execution::applied(updated, count)
}

/// Widens each match by one neighbouring space, measured against the unedited
/// text, then merges ranges that overlap or touch.
fn with_adjacent_space(text: &str, ranges: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(ranges.len());
    for &(start, end) in ranges {
        let widened = if text[end..].starts_with(' ') {
            (start, end + 1)
        } else if text[..start].ends_with(' ') {
            (start - 1, end)
        } else {
            (start, end)
        };
        match merged.last_mut() {
            Some(last) if widened.0 <= last.1 => last.1 = last.1.max(widened.1),
            _ => merged.push(widened),
        }
    }
    merged
}

/// Computes a selection. Never mutates the document.
pub fn select(document: &Document, target: &Target) -> Execution {
    let selection = match target {
        Target::Blocks(selector) => Selection {
            block_ids: resolve(document, selector),
            ranges: Vec::new(),
        },
        Target::Text(range) => select_text(document, range),
    };

    let matches = if selection.ranges.is_empty() {
        selection.block_ids.len()
    } else {
        selection.ranges.len()
    };
    if matches == 0 {
        return Execution::unchanged(document, Outcome::no_op("nothing to select"));
    }
    Execution::unchanged(document, Outcome::Selected { matches })
        .with_effect(SideEffect::Selection(selection))
}

fn select_text(document: &Document, range: &TextRange) -> Selection {
    let mut selection = Selection::default();
    let Some(pattern) = needle(&range.text) else {
        return selection;
    };
    let allowed = text_scope(document, range.within.as_ref());

    let in_scope = |block: &&Block| allowed.as_ref().map_or(true, |ids| ids.contains(block.id()));
    for block in document.iter().filter(in_scope) {
        let before = selection.ranges.len();
        for (run_index, run) in block.content().iter().enumerate() {
            selection
                .ranges
                .extend(pattern.find_iter(&run.text).map(|m| TextMatch {
                    block_id: block.id().clone(),
                    run: run_index,
                    start: m.start(),
                    end: m.end(),
                }));
        }
        if selection.ranges.len() > before {
            selection.block_ids.push(block.id().clone());
        }
    }
    selection
}

use std::collections::HashSet;

use super::resolve::resolve;
use super::{Execution, Notice, Outcome};
use crate::interpreter::{BlockSelector, StyleName, StyleValue};
use crate::model::{BlockId, Document, Styles};

/// Applies an inline style to every run of the matched blocks.
///
/// Only the blocks' own runs are styled, not their children. Page links have no
/// runs and are skipped. Setting a color to "default" clears it.
pub fn run(document: &Document, target: &BlockSelector, style: StyleName, value: &StyleValue) -> Execution {
    let matched = resolve(document, target);
    if matched.is_empty() {
        return Execution::unchanged(document, Outcome::no_op(format!("no {} found", target)));
    }

    let skipped_links = matched
        .iter()
        .filter_map(|id| document.find_by_id(id))
        .filter(|b| b.is_page_link())
        .count();
    let ids: HashSet<BlockId> = matched.into_iter().collect();

    let mut changed = 0;
    let updated = document.update_blocks(&ids, |block| {
        let Some(runs) = block.content_mut() else {
            return;
        };
        let mut touched = false;
        for run in runs.iter_mut() {
            touched |= set_style(&mut run.styles, style, value);
        }
        if touched {
            changed += 1;
        }
    });

    let mut execution = if changed == 0 {
        Execution::unchanged(document, Outcome::no_op(format!("{} already {}", target, style)))
    } else {
        Execution::applied(updated, changed)
    };
    if skipped_links > 0 {
        execution = execution.with_notice(Notice::info("Page links cannot be formatted"));
    }
    execution
}

/// Sets one style on `styles`; returns whether anything changed.
fn set_style(styles: &mut Styles, style: StyleName, value: &StyleValue) -> bool {
    let before = styles.clone();
    match (style, value) {
        (StyleName::Bold, StyleValue::Flag(on)) => styles.bold = *on,
        (StyleName::Italic, StyleValue::Flag(on)) => styles.italic = *on,
        (StyleName::Underline, StyleValue::Flag(on)) => styles.underline = *on,
        (StyleName::Strike, StyleValue::Flag(on)) => styles.strike = *on,
        (StyleName::Code, StyleValue::Flag(on)) => styles.code = *on,
        (StyleName::TextColor, StyleValue::Text(color)) => styles.text_color = color_value(color),
        (StyleName::BackgroundColor, StyleValue::Text(color)) => {
            styles.background_color = color_value(color)
        }
        // EditIntent::formatting rejects mismatched values
        _ => {}
    }
    *styles != before
}

fn color_value(color: &str) -> Option<String> {
    let color = color.trim().to_lowercase();
    (color != "default" && !color.is_empty()).then_some(color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Block, BlockKind, BlockType, InlineRun, PageId, PageLinkProps};

    fn doc() -> Document {
        Document::from_blocks(vec![
            Block::heading(1, "Title").with_id("h"),
            Block::paragraph("one").with_id("p1"),
            Block::paragraph("two")
                .with_id("p2")
                .with_children(vec![Block::paragraph("child").with_id("c")])
                .unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_bolds_last_paragraph_only() {
        let d = doc();
        let execution = run(
            &d,
            &BlockSelector::last(Some(BlockType::Paragraph)),
            StyleName::Bold,
            &StyleValue::Flag(true),
        );
        assert_eq!(execution.outcome, Outcome::Applied { changed: 1 });
        let out = &execution.document;
        assert!(out.find_by_id(&"p2".into()).unwrap().content()[0].styles.bold);
        assert!(!out.find_by_id(&"p1".into()).unwrap().content()[0].styles.bold);
        assert!(!out.find_by_id(&"c".into()).unwrap().content()[0].styles.bold);
        let ids: Vec<_> = out.iter().map(|b| b.id().clone()).collect();
        let before: Vec<_> = d.iter().map(|b| b.id().clone()).collect();
        assert_eq!(ids, before);
    }

    #[test]
    fn test_all_runs_in_block_are_styled() {
        let mut block = Block::paragraph("").with_id("p");
        block
            .set_content(vec![InlineRun::plain("a "), InlineRun::plain("b")])
            .unwrap();
        let d = Document::from_blocks(vec![block]).unwrap();
        let execution = run(
            &d,
            &BlockSelector::Id("p".into()),
            StyleName::Italic,
            &StyleValue::Flag(true),
        );
        let runs = execution.document.blocks()[0].content().to_vec();
        assert!(runs.iter().all(|r| r.styles.italic));
    }

    #[test]
    fn test_colors_and_default_reset() {
        let d = doc();
        let target = BlockSelector::Id("p1".into());
        let red = run(&d, &target, StyleName::TextColor, &StyleValue::Text("Red".into()));
        let styles = &red.document.find_by_id(&"p1".into()).unwrap().content()[0].styles;
        assert_eq!(styles.text_color.as_deref(), Some("red"));

        let reset = run(
            &red.document,
            &target,
            StyleName::TextColor,
            &StyleValue::Text("default".into()),
        );
        let styles = &reset.document.find_by_id(&"p1".into()).unwrap().content()[0].styles;
        assert!(styles.text_color.is_none());
    }

    #[test]
    fn test_already_styled_is_no_op() {
        let d = doc();
        let target = BlockSelector::Id("p1".into());
        let once = run(&d, &target, StyleName::Bold, &StyleValue::Flag(true));
        let twice = run(&once.document, &target, StyleName::Bold, &StyleValue::Flag(true));
        assert!(matches!(twice.outcome, Outcome::NoOp { .. }));
        assert_eq!(twice.document, once.document);
    }

    #[test]
    fn test_zero_matches_leave_document_equal() {
        let d = doc();
        let execution = run(
            &d,
            &BlockSelector::last(Some(BlockType::Code)),
            StyleName::Bold,
            &StyleValue::Flag(true),
        );
        assert!(matches!(execution.outcome, Outcome::NoOp { .. }));
        assert_eq!(execution.document, d);
    }

    #[test]
    fn test_page_links_are_skipped() {
        let link = Block::new(BlockKind::PageLink(PageLinkProps {
            page_id: PageId::new(),
            page_title: "Sub".into(),
            page_icon: "📄".into(),
        }))
        .with_id("l");
        let d = Document::from_blocks(vec![link]).unwrap();
        let execution = run(
            &d,
            &BlockSelector::Everything,
            StyleName::Bold,
            &StyleValue::Flag(true),
        );
        assert_eq!(execution.document, d);
        assert!(execution.document.blocks()[0].content().is_empty());
        assert_eq!(execution.notices().count(), 1);
    }
}

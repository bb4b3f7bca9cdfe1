use std::collections::HashSet;

use serde_json::{json, Map, Value};
use voxnote::executor::{self, ExecContext, Outcome};
use voxnote::history::HistoryManager;
use voxnote::interpreter::{BlockSelector, EditIntent, StyleName, StyleValue, Target, TextRange};
use voxnote::links::{self, ReconcileMode};
use voxnote::model::{Block, BlockKind, BlockType, Document, PageId, PageLinkProps};
use voxnote::store::kv::{KeyValueStore, MemKv};
use voxnote::store::memory::InMemoryStore;
use voxnote::store::DataStore;

fn apply(store: &mut InMemoryStore, page: PageId, intent: &EditIntent, doc: &Document) -> executor::Execution {
    let mut ctx = ExecContext {
        store,
        page_id: page,
        transcript: "",
        confirmed: true,
    };
    executor::apply(intent, doc, &mut ctx)
}

fn link_to(page_id: PageId, title: &str) -> Block {
    Block::link_to(PageLinkProps {
        page_id,
        page_title: title.to_string(),
        page_icon: "📄".to_string(),
    })
}

#[test]
fn document_json_round_trips_exactly() {
    let raw = json!([
        {
            "id": "h1",
            "type": "heading",
            "props": {"level": 2, "textColor": "blue", "backgroundColor": "default", "textAlignment": "left", "customFlag": true},
            "content": [{"type": "text", "text": "Agenda", "styles": {"bold": true}}],
            "children": []
        },
        {
            "id": "t1",
            "type": "todoListItem",
            "props": {"checked": true, "textColor": "default", "backgroundColor": "default", "textAlignment": "left"},
            "content": [{"type": "text", "text": "ship it", "styles": {}}],
            "children": [
                {
                    "id": "p1",
                    "type": "paragraph",
                    "props": {"textColor": "default", "backgroundColor": "yellow", "textAlignment": "center"},
                    "content": [{"type": "text", "text": "details", "styles": {"textColor": "red"}}],
                    "children": []
                }
            ]
        }
    ]);

    let doc: Document = serde_json::from_value(raw.clone()).unwrap();
    let encoded = serde_json::to_value(&doc).unwrap();
    let decoded: Document = serde_json::from_value(encoded.clone()).unwrap();
    assert_eq!(decoded, doc);
    assert_eq!(serde_json::to_value(&decoded).unwrap(), encoded);

    let ids: Vec<&str> = doc.iter().map(|b| b.id().as_str()).collect();
    assert_eq!(ids, vec!["h1", "t1", "p1"]);
    assert_eq!(encoded[0]["props"]["customFlag"], Value::Bool(true));
}

#[test]
fn duplicate_block_ids_are_rejected_on_load() {
    let raw = json!([
        {"id": "same", "type": "paragraph", "props": {}, "content": [], "children": []},
        {"id": "same", "type": "paragraph", "props": {}, "content": [], "children": []}
    ]);
    assert!(serde_json::from_value::<Document>(raw).is_err());
}

#[test]
fn page_links_stay_empty_after_every_operation() {
    let mut store = InMemoryStore::new();
    let home = store.create_page(None, "Home", "🏠").unwrap();
    let child = store.create_page(Some(home.id()), "Reading list", "📚").unwrap();
    let doc = Document::from_blocks(vec![
        Block::paragraph("Reading list for the summer"),
        link_to(child.id(), "Reading list"),
    ])
    .unwrap();

    let intents = vec![
        EditIntent::formatting(BlockSelector::Everything, StyleName::Bold, StyleValue::Flag(true)).unwrap(),
        EditIntent::formatting(
            BlockSelector::Everything,
            StyleName::TextColor,
            StyleValue::Text("red".to_string()),
        )
        .unwrap(),
        EditIntent::ChangeBlockType {
            target: BlockSelector::Everything,
            new_type: BlockType::Heading,
            props: Map::new(),
        },
        EditIntent::ReplaceText {
            find: "reading".to_string(),
            replace_with: "watch".to_string(),
            scope: None,
        },
        EditIntent::DeleteRange {
            scope: Target::Text(TextRange {
                text: "list".to_string(),
                within: None,
            }),
        },
        EditIntent::CreateLinkedPage {
            title: "Another".to_string(),
            icon: "📄".to_string(),
        },
    ];

    for intent in &intents {
        let execution = apply(&mut store, home.id(), intent, &doc);
        for block in execution.document.iter() {
            if block.is_page_link() {
                assert!(block.content().is_empty(), "{} gave a link content", intent.name());
                assert!(block.children().is_empty(), "{} gave a link children", intent.name());
            }
        }
        assert!(execution.document.validate().is_ok());
    }
}

#[test]
fn page_links_reject_content_by_construction() {
    let mut link = link_to(PageId::new(), "X");
    assert!(link.set_content(vec![voxnote::model::InlineRun::plain("no")]).is_err());
    assert!(link.set_children(vec![Block::paragraph("no")]).is_err());
    assert!(link.clone().with_children(vec![Block::paragraph("no")]).is_err());
    assert!(Block::with_text(
        BlockKind::PageLink(link.page_link().unwrap().clone()),
        "no"
    )
    .is_err());
}

#[test]
fn undo_then_redo_is_symmetric() {
    let page = PageId::new();
    let mut history = HistoryManager::new(MemKv::new(), 100);
    let d0 = Document::from_blocks(vec![Block::paragraph("zero")]).unwrap();
    let d1 = d0.append(vec![Block::paragraph("one")]);
    let d2 = d1.append(vec![Block::paragraph("two")]);

    history.record(page, &d0).unwrap();
    history.record(page, &d1).unwrap();

    let undone = history.undo(page, &d2, 1).unwrap();
    assert_eq!(undone.document, d1);
    let redone = history.redo(page, &undone.document, 1).unwrap();
    assert_eq!(redone.document, d2);

    let back = history.undo(page, &d2, 5).unwrap();
    assert_eq!(back.document, d0);
    assert_eq!((back.applied, back.requested), (2, 5));
    let forward = history.redo(page, &back.document, 2).unwrap();
    assert_eq!(forward.document, d2);
}

#[test]
fn new_edit_clears_redo() {
    let page = PageId::new();
    let kv = MemKv::new();
    let mut history = HistoryManager::new(kv, 100);
    let d0 = Document::new();
    let d1 = d0.append(vec![Block::paragraph("one")]);
    let other = d0.append(vec![Block::paragraph("different")]);

    history.record(page, &d0).unwrap();
    history.undo(page, &d1, 1).unwrap();
    assert!(history.can_redo(page).unwrap());

    history.record(page, &d0).unwrap();
    assert!(!history.can_redo(page).unwrap());
    assert!(history.redo(page, &other, 1).unwrap().is_empty());
    assert!(history.kv().get(&format!("redo_{}", page)).unwrap().is_none());
}

#[test]
fn zero_match_selectors_are_no_ops() {
    let mut store = InMemoryStore::new();
    let page = store.create_page(None, "P", "📄").unwrap().id();
    let doc = Document::from_blocks(vec![Block::paragraph("only text")]).unwrap();

    let intents = vec![
        EditIntent::formatting(
            BlockSelector::last(Some(BlockType::Quote)),
            StyleName::Italic,
            StyleValue::Flag(true),
        )
        .unwrap(),
        EditIntent::ReplaceText {
            find: "absent".to_string(),
            replace_with: "x".to_string(),
            scope: None,
        },
        EditIntent::DeleteRange {
            scope: Target::Blocks(BlockSelector::Containing {
                text: "absent".to_string(),
                block_type: None,
            }),
        },
        EditIntent::ChangeBlockType {
            target: BlockSelector::FromStart {
                block_type: Some(BlockType::Heading),
                index: 0,
            },
            new_type: BlockType::Quote,
            props: Map::new(),
        },
        EditIntent::SelectText {
            target: Target::Text(TextRange {
                text: "absent".to_string(),
                within: None,
            }),
        },
    ];

    for intent in &intents {
        let execution = apply(&mut store, page, intent, &doc);
        assert!(
            matches!(execution.outcome, Outcome::NoOp { .. }),
            "{} was not a no-op",
            intent.name()
        );
        assert_eq!(execution.document, doc);
    }
}

#[test]
fn reconciliation_is_idempotent_in_every_mode() {
    let mut store = InMemoryStore::new();
    let home = store.create_page(None, "Home", "🏠").unwrap();
    let kept = store.create_page(Some(home.id()), "Kept", "📄").unwrap();
    store.create_page(Some(home.id()), "Orphan", "📄").unwrap();
    let stranger = store.create_page(None, "Elsewhere", "📄").unwrap();

    let doc = Document::from_blocks(vec![
        link_to(kept.id(), "Old title"),
        link_to(kept.id(), "Kept"),
        link_to(stranger.id(), "Elsewhere"),
        link_to(PageId::new(), "Ghost"),
    ])
    .unwrap();

    for mode in [ReconcileMode::Initial, ReconcileMode::Replay] {
        let first = links::reconcile(&mut store, home.id(), &doc, mode).unwrap();
        let second = links::reconcile(&mut store, home.id(), &first.document, mode).unwrap();
        assert_eq!(second.document, first.document);
        assert!(!second.changed_document());
    }

    let first = links::reconcile(&mut store, home.id(), &doc, ReconcileMode::Initial).unwrap();
    let linked: HashSet<PageId> = first.document.page_link_ids().into_iter().collect();
    let children: HashSet<PageId> = store
        .get_child_pages(home.id())
        .unwrap()
        .iter()
        .map(|p| p.id())
        .collect();
    assert_eq!(linked, children);
    assert_eq!(first.document.page_link_ids().len(), children.len());
}

#[test]
fn cascade_delete_removes_exactly_the_subtree() {
    let mut store = InMemoryStore::new();
    let root = store.create_page(None, "Root", "📄").unwrap().id();
    let target = store.create_page(Some(root), "Target", "📄").unwrap().id();
    let a = store.create_page(Some(target), "A", "📄").unwrap().id();
    let b = store.create_page(Some(target), "B", "📄").unwrap().id();
    store.create_page(Some(a), "A1", "📄").unwrap();
    store.create_page(Some(a), "A2", "📄").unwrap();
    store.create_page(Some(b), "B1", "📄").unwrap();
    let sibling = store.create_page(Some(root), "Sibling", "📄").unwrap().id();
    let before = store.load_all_pages().unwrap().len();

    let report = store.delete_page(target).unwrap();
    let descendants = 5;
    assert_eq!(report.deleted.len(), descendants + 1);
    assert!(report.is_complete());

    let remaining = store.list_meta().unwrap();
    assert_eq!(remaining.len(), before - (descendants + 1));
    let ids: HashSet<PageId> = remaining.iter().map(|m| m.id).collect();
    assert_eq!(ids, HashSet::from([root, sibling]));
    for meta in &remaining {
        if let Some(parent) = meta.parent_id {
            assert!(ids.contains(&parent), "dangling parent on {}", meta.title);
        }
    }
}

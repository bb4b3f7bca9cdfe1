//! # Local Command Grammar
//!
//! Rule-based recognition of the commands people actually say while editing. It runs
//! before any external provider, so common commands work offline and instantly.
//!
//! Rules are tried in a fixed order and the first one that produces an intent wins.
//! The order matters where phrasings overlap:
//!
//! ```text
//! history       "undo", "redo the last three changes"
//! lists         "make a to-do list with tasks A and B"
//! pages         "create a page called Notes"
//! unformat      "remove bold from the first heading"
//! block type    "turn the first paragraph into a heading"   (before "make X bold")
//! color         "make the last paragraph red"
//! formatting    "make the last paragraph bold", "underline this"
//! replace       "replace X with Y [in <blocks>]"             (after block type: "change X to Y")
//! todo state    "check off buy groceries"
//! delete        "delete the heading that says X", "delete the word X"
//! select        "select the last heading"
//! dictation     "add a heading Weekly review", "add a task call mom"
//! ```
//!
//! Block references are parsed into [`BlockSelector`]s; nothing here looks at the
//! document. A rule whose block reference cannot be parsed does not match, which lets
//! later rules try the same words.

use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

use super::intent::{BlockSelector, EditIntent, StyleName, StyleValue, Target, TextRange};
use super::InterpreterSettings;
use crate::model::{Block, BlockKind, BlockType};

type Rule = fn(&str, &InterpreterSettings) -> Option<EditIntent>;

const RULES: &[Rule] = &[
    history,
    list_dictation,
    create_page,
    remove_style,
    change_block_type,
    color,
    formatting,
    replace,
    todo_state,
    delete,
    select,
    block_dictation,
];

/// Runs the rules over a transcript. `None` means no rule matched.
pub(crate) fn parse(transcript: &str, settings: &InterpreterSettings) -> Option<EditIntent> {
    let text = normalize(transcript);
    if text.is_empty() {
        return None;
    }
    RULES.iter().find_map(|rule| rule(&text, settings))
}

fn pattern(src: &str) -> Regex {
    Regex::new(src).expect("grammar patterns are valid")
}

const COLORS: &str = "red|orange|yellow|green|blue|purple|pink|gray|grey|brown";
const STYLE_WORDS: &str = r"bold|italics?|italici[sz]ed|underlined?|strike\s*through|struck\s+through|crossed\s+out|code|monospaced?";
const NUMBERS: &str = "[1-3]|one|two|three";

static POLITE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)^(?:(?:hey|ok|okay),?\s+)?(?:(?:please|can\s+you|could\s+you|would\s+you|i\s+want\s+to|i'd\s+like\s+to|let's)\s+)*")
});
static POLITE_SUFFIX: Lazy<Regex> = Lazy::new(|| pattern(r"(?i),?\s+(?:please|thanks|thank\s+you)$"));

static HISTORY: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)^(?P<op>undo|redo)\b(?P<rest>.*)$"));

static LIST: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)^(?:make|create|add|start|write|begin|new)\s+(?:me\s+)?(?:a\s+|an\s+)?(?:new\s+)?(?P<kind>to-?\s?do|todo|task|checklist|check|bullet(?:ed)?(?:\s+point)?|numbered|number|shopping|grocery)\s+list\b(?P<rest>.*)$")
});
static LIST_ITEMS: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)(?:^\s*:|\b(?:with|of|containing|including|saying)\b)\s*(?:the\s+)?(?:following\s+)?(?:(?:tasks?|items?|entries|things|points?|bullets?)\b)?\s*:?\s*(?:like\s+)?(?P<items>.+)$")
});
static ITEM_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)\s*(?:,|;|\band\s+then\b|\bthen\b|\band\b)\s*"));

static CREATE_PAGE: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)^(?:create|make|add|start|open|new)\s+(?:a\s+|an\s+)?(?:new\s+)?(?:linked\s+|child\s+|sub-?)?page(?:\s+(?:called|named|titled|for|about))?(?:\s+(?P<title>.+?))?(?:\s+with\s+(?:an?\s+|the\s+)?icon\s+(?P<icon>\S+))?$")
});

static REMOVE_STYLE: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)^(?:remove|clear|take\s+off|turn\s+off|drop)\s+(?:the\s+)?(?P<style>bold(?:ing)?|italics?|underlin(?:e|ing)|strike\s*through|code|highlight(?:ing)?|colou?r)\s+(?:formatting\s+|styling\s+)?(?:from|on|in|of)\s+(?P<target>.+)$")
});
static UN_STYLE: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)^un(?P<style>bold|italici[sz]e|underline)\s+(?P<target>.+)$"));

static CHANGE_TYPE_INTO: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)^(?:turn|convert|change|make|transform|switch)\s+(?P<target>.+?)\s+(?:into|to)\s+(?:an?\s+)?(?P<kind>.+)$")
});
static CHANGE_TYPE_MAKE: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)^make\s+(?P<target>.+?)\s+an?\s+(?P<kind>.+)$"));

static COLOR: Lazy<Regex> = Lazy::new(|| {
    pattern(&format!(
        r"(?i)^(?:make|colou?r|turn|paint|set)\s+(?P<target>.+?)\s+(?:to\s+|in\s+)?(?P<color>{COLORS}|default)(?:\s+text)?$"
    ))
});
static HIGHLIGHT: Lazy<Regex> = Lazy::new(|| {
    pattern(&format!(
        r"(?i)^(?:highlight|shade)\s+(?P<target>.+?)\s+(?:in\s+)?(?P<color>{COLORS})$"
    ))
});

static FORMAT_MAKE: Lazy<Regex> = Lazy::new(|| {
    pattern(&format!(
        r"(?i)^(?:make|set|turn|format|mark|put)\s+(?P<target>.+?)\s+(?:as\s+|to\s+|in\s+|into\s+)?(?P<neg>not\s+|non-?)?(?P<style>{STYLE_WORDS})$"
    ))
});
static FORMAT_VERB: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)^(?P<style>bold|embolden|italici[sz]e|underline|strike\s*through|cross\s+out)\s+(?P<target>.+)$")
});

static REPLACE: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)^(?:replace|change|swap|substitute)\s+(?:all\s+(?:occurrences\s+of\s+|instances\s+of\s+)?|every\s+(?:occurrence\s+of\s+)?|the\s+(?:words?|text|phrase)\s+)?(?P<find>.+?)\s+(?:with|to|for|into|by)\s+(?P<repl>.+?)(?:\s+(?P<conn>in|within|inside|on)\s+(?P<scope>.+))?$")
});

static CHECK: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)^(?P<verb>check(?:\s+off)?|tick(?:\s+off)?|uncheck|untick)\s+(?P<target>.+)$"));
static MARK_AS: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)^mark\s+(?P<target>.+?)\s+as\s+(?P<state>done|complete|completed|finished|checked|not\s+done|incomplete|undone|unchecked|open)$")
});

static DELETE: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)^(?:delete|remove|erase|clear|cut|scratch|get\s+rid\s+of)\s+(?P<target>.+)$")
});
static SELECT: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)^(?:select|highlight|find|go\s+to)\s+(?P<target>.+)$"));

static BLOCK_DICTATION: Lazy<Regex> = Lazy::new(|| {
    pattern(&format!(
        r"(?i)^(?:add|insert|create|write|new|append|start)\s+(?:a\s+|an\s+)?(?:new\s+)?(?P<kind>(?:level\s+(?:{NUMBERS})\s+)?(?:sub-?)?(?:heading|header|title)(?:\s+(?:level\s+)?(?:{NUMBERS})\b)?|h[1-3]|paragraph|bullet(?:\s+point)?|numbered(?:\s+list)?\s+item|to-?\s?do(?:\s+item)?|todo|task|checklist\s+item|quote|code\s+block|note|line)\b\s*(?:(?:called|saying|that\s+says|with\s+(?:the\s+)?text|reading|titled|named|about)\b\s*)?:?\s*(?P<text>.*)$"
    ))
});

static HEADING_KIND: Lazy<Regex> = Lazy::new(|| {
    pattern(&format!(
        r"(?i)^(?:(?:level\s+)?(?P<pre>{NUMBERS})\s+)?(?P<sub>sub-?)?(?:heading|header|title|h(?P<h>[1-3]))(?:\s+(?:level\s+)?(?P<post>{NUMBERS}))?$"
    ))
});

static EVERYTHING: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)^(?:the\s+)?(?:everything|all|all\s+of\s+it|all\s+(?:the\s+)?(?:text|content|blocks)|(?:whole|entire)\s+(?:page|document|note|thing)|page|document)$")
});
static DEICTIC: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)^(?:this|that|it|the\s+current)(?:\s+(?P<noun>.+))?$"));
static BY_ID: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)^(?:the\s+)?block\s+(?:with\s+)?id\s+(?P<id>\S+)$"));
static ALL_OF: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)^(?:all|every|each)\s+(?:of\s+)?(?:the\s+)?(?P<nested>nested\s+)?(?P<noun>.+?)(?P<deep>\s+(?:including\s+nested(?:\s+ones)?|at\s+any\s+level|everywhere))?$")
});
static CONTAINING: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)^(?:the\s+)?(?:(?P<noun>.+?)\s+)?(?:that\s+says|which\s+says|that\s+reads|saying|containing|that\s+contains|which\s+contains|with\s+(?:the\s+)?(?:text|words?)|about|called|titled|named|mentioning|with)\s+(?P<text>.+)$")
});
static FROM_END: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)^(?:the\s+)?(?P<ord>\w+)\s+(?:from\s+(?:the\s+)?(?:end|bottom)|to\s+last|last)\s*(?P<noun>.*)$")
});
static ORDINAL: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)^(?:the\s+)?(?P<ord>last|final|bottom|penultimate|first|top|second|third|fourth|fifth|sixth|seventh|eighth|ninth|tenth|\d+(?:st|nd|rd|th))\b\s*(?P<noun>.*)$")
});

static TEXT_RANGE: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)^(?:the\s+)?(?:words?|text|phrase|sentence|term)\s+(?P<text>.+?)(?:\s+(?P<conn>in|from|within|inside|on)\s+(?P<scope>.+))?$")
});
static QUOTED: Lazy<Regex> = Lazy::new(|| {
    pattern(r#"(?i)^["“'‘](?P<text>[^"”’]+)["”'’](?:\s+(?P<conn>in|from|within|inside|on)\s+(?P<scope>.+))?$"#)
});
static TRAILING_SCOPE: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)^(?P<text>.+?)\s+(?:in|from|within|inside|on)\s+(?P<scope>.+)$"));

// --- Rules ---

fn history(text: &str, _: &InterpreterSettings) -> Option<EditIntent> {
    let caps = HISTORY.captures(text)?;
    let steps = group(&caps, "rest").and_then(count_in).unwrap_or(1);
    let op = group(&caps, "op")?;
    Some(if op.eq_ignore_ascii_case("undo") {
        EditIntent::undo(steps)
    } else {
        EditIntent::redo(steps)
    })
}

fn list_dictation(text: &str, _: &InterpreterSettings) -> Option<EditIntent> {
    let caps = LIST.captures(text)?;
    let kind = group(&caps, "kind")?.to_lowercase();
    let kind = if kind.starts_with("bullet") || kind == "shopping" || kind == "grocery" {
        BlockKind::BulletListItem
    } else if kind.starts_with("number") {
        BlockKind::NumberedListItem
    } else {
        BlockKind::TodoListItem { checked: false }
    };

    let items: Vec<String> = group(&caps, "rest")
        .and_then(|rest| LIST_ITEMS.captures(rest))
        .and_then(|items| group(&items, "items").map(split_items))
        .unwrap_or_default();

    let blocks = if items.is_empty() {
        vec![Block::new(kind)]
    } else {
        items
            .into_iter()
            .map(|item| Block::with_text(kind.clone(), item))
            .collect::<crate::error::Result<Vec<_>>>()
            .ok()?
    };
    Some(EditIntent::InsertContent { blocks })
}

fn create_page(text: &str, settings: &InterpreterSettings) -> Option<EditIntent> {
    let caps = CREATE_PAGE.captures(text)?;
    let title = group(&caps, "title")
        .map(clean_quotes)
        .filter(|t| !t.is_empty())
        .map(capitalize)
        .unwrap_or_else(|| settings.default_page_title.clone());
    let icon = group(&caps, "icon")
        .map(str::to_string)
        .unwrap_or_else(|| settings.default_page_icon.clone());
    Some(EditIntent::CreateLinkedPage { title, icon })
}

fn remove_style(text: &str, _: &InterpreterSettings) -> Option<EditIntent> {
    let caps = REMOVE_STYLE.captures(text).or_else(|| UN_STYLE.captures(text))?;
    let style = spoken_style(group(&caps, "style")?)?;
    let target = parse_selector(group(&caps, "target")?)?;
    let value = if style.takes_text() {
        StyleValue::Text("default".to_string())
    } else {
        StyleValue::Flag(false)
    };
    EditIntent::formatting(target, style, value).ok()
}

fn change_block_type(text: &str, _: &InterpreterSettings) -> Option<EditIntent> {
    [&*CHANGE_TYPE_INTO, &*CHANGE_TYPE_MAKE]
        .iter()
        .find_map(|re| {
            let caps = re.captures(text)?;
            let (new_type, props) = parse_kind(group(&caps, "kind")?)?;
            let target = parse_selector(group(&caps, "target")?)?;
            Some(EditIntent::ChangeBlockType {
                target,
                new_type,
                props,
            })
        })
}

fn color(text: &str, _: &InterpreterSettings) -> Option<EditIntent> {
    let (caps, style) = match COLOR.captures(text) {
        Some(caps) => (caps, StyleName::TextColor),
        None => (HIGHLIGHT.captures(text)?, StyleName::BackgroundColor),
    };
    let target = parse_selector(group(&caps, "target")?)?;
    let color = group(&caps, "color")?.to_lowercase().replace("grey", "gray");
    EditIntent::formatting(target, style, StyleValue::Text(color)).ok()
}

fn formatting(text: &str, _: &InterpreterSettings) -> Option<EditIntent> {
    let caps = FORMAT_MAKE.captures(text).or_else(|| FORMAT_VERB.captures(text))?;
    let style = spoken_style(group(&caps, "style")?)?;
    let target = parse_selector(group(&caps, "target")?)?;
    let on = group(&caps, "neg").is_none();
    EditIntent::formatting(target, style, StyleValue::Flag(on)).ok()
}

fn replace(text: &str, _: &InterpreterSettings) -> Option<EditIntent> {
    let caps = REPLACE.captures(text)?;
    let find = clean_quotes(group(&caps, "find")?);
    if find.is_empty() {
        return None;
    }
    let mut replace_with = clean_quotes(group(&caps, "repl")?);
    let mut scope = None;
    if let (Some(conn), Some(scope_text)) = (group(&caps, "conn"), group(&caps, "scope")) {
        match parse_selector(scope_text) {
            Some(selector) => scope = Some(selector),
            // "replace cat with dog in the house": the tail was part of the replacement
            None => {
                replace_with =
                    clean_quotes(&format!("{} {} {}", group(&caps, "repl")?, conn, scope_text))
            }
        }
    }
    Some(EditIntent::ReplaceText {
        find,
        replace_with,
        scope,
    })
}

fn todo_state(text: &str, _: &InterpreterSettings) -> Option<EditIntent> {
    let (target, checked) = if let Some(caps) = CHECK.captures(text) {
        let verb = group(&caps, "verb")?.to_lowercase();
        (group(&caps, "target")?, !verb.starts_with("un"))
    } else {
        let caps = MARK_AS.captures(text)?;
        let state = group(&caps, "state")?.to_lowercase();
        let open = matches!(state.as_str(), "incomplete" | "undone" | "unchecked" | "open")
            || state.starts_with("not");
        (group(&caps, "target")?, !open)
    };

    let target = match parse_selector(target) {
        Some(BlockSelector::FromEnd {
            block_type: None,
            index,
        }) => BlockSelector::FromEnd {
            block_type: Some(BlockType::TodoListItem),
            index,
        },
        Some(BlockSelector::FromStart {
            block_type: None,
            index,
        }) => BlockSelector::FromStart {
            block_type: Some(BlockType::TodoListItem),
            index,
        },
        Some(selector) => selector,
        None => BlockSelector::Containing {
            text: clean_quotes(target),
            block_type: Some(BlockType::TodoListItem),
        },
    };

    let mut props = Map::new();
    props.insert("checked".to_string(), Value::Bool(checked));
    Some(EditIntent::ChangeBlockType {
        target,
        new_type: BlockType::TodoListItem,
        props,
    })
}

fn delete(text: &str, _: &InterpreterSettings) -> Option<EditIntent> {
    let caps = DELETE.captures(text)?;
    let scope = parse_target(group(&caps, "target")?)?;
    Some(EditIntent::DeleteRange { scope })
}

fn select(text: &str, _: &InterpreterSettings) -> Option<EditIntent> {
    let caps = SELECT.captures(text)?;
    let target = parse_target(group(&caps, "target")?)?;
    Some(EditIntent::SelectText { target })
}

fn block_dictation(text: &str, _: &InterpreterSettings) -> Option<EditIntent> {
    let caps = BLOCK_DICTATION.captures(text)?;
    let kind_phrase = group(&caps, "kind")?.to_lowercase();
    let (block_type, props) = match kind_phrase.as_str() {
        "note" | "line" => (BlockType::Paragraph, Map::new()),
        other => parse_kind(other)?,
    };
    let kind = BlockKind::from_type(block_type, &props).ok()?;
    let body = group(&caps, "text").map(clean_quotes).unwrap_or_default();
    let block = Block::with_text(kind, body).ok()?;
    Some(EditIntent::InsertContent {
        blocks: vec![block],
    })
}

// --- Phrases ---

/// Parses a select/delete target: an explicit text fragment (quoted, or introduced
/// by "the word"), a block reference, or words scoped to a block reference. Bare
/// words match nothing so the transcript can fall back to dictation.
fn parse_target(phrase: &str) -> Option<Target> {
    if let Some(range) = explicit_text_range(phrase) {
        return Some(Target::Text(range));
    }
    if let Some(selector) = parse_selector(phrase) {
        return Some(Target::Blocks(selector));
    }

    if let Some(caps) = TRAILING_SCOPE.captures(phrase) {
        if let (Some(text), Some(within)) = (
            group(&caps, "text"),
            group(&caps, "scope").and_then(parse_selector),
        ) {
            return Some(Target::Text(TextRange {
                text: clean_quotes(text),
                within: Some(within),
            }));
        }
    }
    None
}

fn explicit_text_range(phrase: &str) -> Option<TextRange> {
    let caps = QUOTED
        .captures(phrase)
        .or_else(|| TEXT_RANGE.captures(phrase))?;
    let text = clean_quotes(group(&caps, "text")?);
    match (group(&caps, "conn"), group(&caps, "scope")) {
        (Some(conn), Some(scope)) => match parse_selector(scope) {
            Some(within) => Some(TextRange {
                text,
                within: Some(within),
            }),
            None => Some(TextRange {
                text: clean_quotes(&format!("{} {} {}", text, conn, scope)),
                within: None,
            }),
        },
        _ => Some(TextRange { text, within: None }),
    }
}

/// Parses a spoken block reference such as "the last paragraph", "all headings" or
/// "the heading that says intro".
pub(crate) fn parse_selector(phrase: &str) -> Option<BlockSelector> {
    let phrase = phrase.trim();
    if phrase.is_empty() {
        return None;
    }
    everything(phrase)
        .or_else(|| deictic(phrase))
        .or_else(|| by_id(phrase))
        .or_else(|| all_of(phrase))
        .or_else(|| containing(phrase))
        .or_else(|| from_end(phrase))
        .or_else(|| ordinal(phrase))
        .or_else(|| plain_noun(phrase))
}

fn everything(phrase: &str) -> Option<BlockSelector> {
    EVERYTHING
        .is_match(phrase)
        .then_some(BlockSelector::Everything)
}

fn deictic(phrase: &str) -> Option<BlockSelector> {
    let caps = DEICTIC.captures(phrase)?;
    let (block_type, _) = parse_noun(group(&caps, "noun").unwrap_or(""))?;
    Some(BlockSelector::last(block_type))
}

fn by_id(phrase: &str) -> Option<BlockSelector> {
    let caps = BY_ID.captures(phrase)?;
    Some(BlockSelector::Id(group(&caps, "id")?.into()))
}

fn all_of(phrase: &str) -> Option<BlockSelector> {
    let caps = ALL_OF.captures(phrase)?;
    let (block_type, _) = parse_noun(group(&caps, "noun")?)?;
    let nested = group(&caps, "nested").is_some() || group(&caps, "deep").is_some();
    Some(match block_type {
        Some(block_type) => BlockSelector::AllOfType { block_type, nested },
        None => BlockSelector::Everything,
    })
}

fn containing(phrase: &str) -> Option<BlockSelector> {
    let caps = CONTAINING.captures(phrase)?;
    let block_type = match group(&caps, "noun") {
        Some(noun) => parse_noun(strip_ordinal(noun))?.0,
        None => None,
    };
    let text = clean_quotes(group(&caps, "text")?);
    (!text.is_empty()).then_some(BlockSelector::Containing { text, block_type })
}

fn from_end(phrase: &str) -> Option<BlockSelector> {
    let caps = FROM_END.captures(phrase)?;
    let index = match group(&caps, "ord")?.to_lowercase().as_str() {
        "next" => 1,
        other => ordinal_index(other)?,
    };
    let (block_type, _) = parse_noun(group(&caps, "noun").unwrap_or(""))?;
    Some(BlockSelector::FromEnd { block_type, index })
}

fn ordinal(phrase: &str) -> Option<BlockSelector> {
    let caps = ORDINAL.captures(phrase)?;
    let (block_type, _) = parse_noun(group(&caps, "noun").unwrap_or(""))?;
    Some(match group(&caps, "ord")?.to_lowercase().as_str() {
        "last" | "final" | "bottom" => BlockSelector::FromEnd {
            block_type,
            index: 0,
        },
        "penultimate" => BlockSelector::FromEnd {
            block_type,
            index: 1,
        },
        other => BlockSelector::FromStart {
            block_type,
            index: ordinal_index(other)?,
        },
    })
}

/// "the heading" means the last heading; "headings" means all of them.
fn plain_noun(phrase: &str) -> Option<BlockSelector> {
    let (block_type, plural) = parse_noun(phrase)?;
    Some(match (block_type, plural) {
        (Some(block_type), true) => BlockSelector::AllOfType {
            block_type,
            nested: false,
        },
        (None, true) => BlockSelector::Everything,
        (block_type, false) => BlockSelector::last(block_type),
    })
}

/// Resolves a noun to a block type. `Some((None, _))` is a generic noun such as
/// "block"; the flag reports a plural.
fn parse_noun(noun: &str) -> Option<(Option<BlockType>, bool)> {
    let lowered = noun.trim().to_lowercase();
    let noun = lowered.strip_prefix("the ").unwrap_or(&lowered).trim();
    match noun {
        "" | "block" | "line" | "item" | "one" | "entry" | "thing" | "bit" | "part" => {
            return Some((None, false))
        }
        "blocks" | "lines" | "items" | "ones" | "entries" | "things" => return Some((None, true)),
        _ => {}
    }
    if let Some(block_type) = block_type_named(noun) {
        return Some((Some(block_type), false));
    }
    let singular = noun.strip_suffix('s')?;
    block_type_named(singular).map(|t| (Some(t), true))
}

fn block_type_named(noun: &str) -> Option<BlockType> {
    match noun {
        "page" | "subpage" | "sub-page" | "child page" => return Some(BlockType::PageLink),
        "subheading" | "sub-heading" => return Some(BlockType::Heading),
        "bulleted" | "bulleted item" => return Some(BlockType::BulletListItem),
        "checkbox" | "check box" => return Some(BlockType::TodoListItem),
        "plain text" | "normal text" | "regular text" | "body text" => {
            return Some(BlockType::Paragraph)
        }
        _ => {}
    }
    if let Ok(block_type) = BlockType::from_str(noun) {
        return Some(block_type);
    }
    [" list item", " item", " block", " list"]
        .iter()
        .filter_map(|suffix| noun.strip_suffix(suffix))
        .find_map(|stem| BlockType::from_str(stem.trim()).ok())
}

/// Parses a target block kind ("heading level two", "h2", "bullet point", "quote").
/// Page links are never a valid target.
fn parse_kind(phrase: &str) -> Option<(BlockType, Map<String, Value>)> {
    let lowered = phrase.trim().to_lowercase();
    let phrase = lowered
        .strip_prefix("a ")
        .or_else(|| lowered.strip_prefix("an "))
        .unwrap_or(&lowered)
        .trim();

    let mut props = Map::new();
    if let Some(caps) = HEADING_KIND.captures(phrase) {
        let level = group(&caps, "h")
            .or_else(|| group(&caps, "pre"))
            .or_else(|| group(&caps, "post"))
            .and_then(parse_number)
            .unwrap_or(if group(&caps, "sub").is_some() { 2 } else { 1 })
            .clamp(1, 3);
        props.insert("level".to_string(), Value::from(level));
        return Some((BlockType::Heading, props));
    }

    let block_type = block_type_named(phrase)
        .or_else(|| phrase.strip_suffix('s').and_then(block_type_named))?;
    (block_type != BlockType::PageLink).then_some((block_type, props))
}

fn spoken_style(word: &str) -> Option<StyleName> {
    let word = word.to_lowercase();
    let word = word.split_whitespace().collect::<Vec<_>>().join(" ");
    let canonical = match word.as_str() {
        "bolding" | "embolden" => "bold",
        "italicise" | "italicised" | "italicized" => "italicize",
        "underlining" => "underline",
        "strike through" => "strikethrough",
        "struck through" => "struck",
        "cross out" => "crossed out",
        "highlighting" => "highlight",
        "colour" => "color",
        other => other,
    };
    StyleName::from_str(canonical).ok()
}

// --- Words ---

fn group<'t>(caps: &Captures<'t>, name: &str) -> Option<&'t str> {
    caps.name(name)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
}

fn normalize(transcript: &str) -> String {
    let collapsed = transcript.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed
        .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ',' | ';' | ':'))
        .trim();
    let without_prefix = POLITE_PREFIX.replace(trimmed, "");
    POLITE_SUFFIX
        .replace(&without_prefix, "")
        .trim()
        .to_string()
}

fn clean_quotes(text: &str) -> String {
    text.trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '“' | '”' | '‘' | '’'))
        .trim()
        .to_string()
}

fn capitalize(text: String) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => text,
    }
}

fn split_items(items: &str) -> Vec<String> {
    ITEM_SEPARATOR
        .split(items)
        .map(clean_quotes)
        .filter(|item| !item.is_empty())
        .collect()
}

fn strip_ordinal(noun: &str) -> &str {
    ORDINAL
        .captures(noun)
        .and_then(|caps| caps.name("noun"))
        .map_or(noun, |m| m.as_str())
}

/// Zero-based index for ordinal words: "first" is 0, "3rd" is 2.
fn ordinal_index(word: &str) -> Option<usize> {
    let position = match word {
        "first" | "top" => 1,
        "second" => 2,
        "third" => 3,
        "fourth" => 4,
        "fifth" => 5,
        "sixth" => 6,
        "seventh" => 7,
        "eighth" => 8,
        "ninth" => 9,
        "tenth" => 10,
        other => other
            .trim_end_matches(|c: char| c.is_ascii_alphabetic())
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0 && other.len() > n.to_string().len())?,
    };
    Some(position - 1)
}

/// First count mentioned in a phrase ("the last three changes", "4 times", "twice").
fn count_in(phrase: &str) -> Option<usize> {
    phrase
        .split(|c: char| !c.is_alphanumeric())
        .find_map(parse_number)
}

pub(crate) fn parse_number(word: &str) -> Option<usize> {
    if let Ok(n) = word.parse::<usize>() {
        return (n > 0).then_some(n);
    }
    Some(match word.to_lowercase().as_str() {
        "one" | "once" => 1,
        "two" | "twice" | "couple" => 2,
        "three" | "thrice" | "few" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        "fifteen" => 15,
        "twenty" => 20,
        _ => return None,
    })
}

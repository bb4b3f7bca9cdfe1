//! Raw intent payloads from an external [`IntentProvider`](super::IntentProvider).
//!
//! Providers answer with loosely structured JSON. Everything is validated here and
//! either normalized into an [`EditIntent`] or rejected with
//! [`VoxError::Interpretation`]; the interpreter turns rejections into
//! `Unrecognized`.
//!
//! ```json
//! { "intent": "insertContent",
//!   "blocks": [ { "type": "todoListItem", "text": "buy groceries" } ] }
//! { "intent": "applyFormatting", "target": { "last": "paragraph" },
//!   "style": "bold", "value": true }
//! { "intent": "replaceText", "find": "cat", "replaceWith": "dog",
//!   "scope": "the last paragraph" }
//! { "intent": "deleteRange", "scope": { "text": "groceries", "within": "last" } }
//! { "intent": "undo", "steps": "three" }
//! ```
//!
//! Targets are either a spoken phrase (parsed with the local selector grammar) or an
//! object with one of `last`, `first`, `fromEnd`, `fromStart`, `all`, `containing`,
//! `id`, `everything`, or `text` for a text range.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::grammar;
use super::intent::{BlockSelector, EditIntent, StyleName, StyleValue, Target, TextRange};
use super::InterpreterSettings;
use crate::error::{Result, VoxError};
use crate::model::{Block, BlockKind, BlockType, InlineRun, Styles};

/// Unvalidated provider output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawIntentPayload(pub Value);

impl From<Value> for RawIntentPayload {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl FromStr for RawIntentPayload {
    type Err = VoxError;

    fn from_str(s: &str) -> Result<Self> {
        serde_json::from_str(s)
            .map(Self)
            .map_err(|e| invalid(format!("payload is not JSON: {}", e)))
    }
}

impl RawIntentPayload {
    /// Validates the payload and converts it into a typed intent.
    ///
    /// `transcript` is carried into `Unrecognized` when the provider gives up.
    pub fn normalize(&self, transcript: &str, settings: &InterpreterSettings) -> Result<EditIntent> {
        let wire: WireIntent = serde_json::from_value(self.0.clone())
            .map_err(|e| invalid(format!("malformed intent payload: {}", e)))?;
        wire.into_intent(transcript, settings)
    }
}

#[derive(Deserialize)]
#[serde(tag = "intent", rename_all = "camelCase")]
enum WireIntent {
    InsertContent {
        blocks: Vec<WireBlock>,
    },
    ApplyFormatting {
        target: WireTarget,
        style: String,
        #[serde(default)]
        value: Value,
    },
    SelectText {
        target: WireTarget,
    },
    ReplaceText {
        find: String,
        #[serde(rename = "replaceWith", alias = "replace")]
        replace_with: String,
        #[serde(default)]
        scope: Option<WireTarget>,
    },
    DeleteRange {
        #[serde(alias = "target")]
        scope: WireTarget,
    },
    ChangeBlockType {
        target: WireTarget,
        #[serde(rename = "newType")]
        new_type: String,
        #[serde(default)]
        props: Map<String, Value>,
    },
    CreateLinkedPage {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        icon: Option<String>,
    },
    Undo {
        #[serde(default)]
        steps: Value,
    },
    Redo {
        #[serde(default)]
        steps: Value,
    },
    Unrecognized {},
}

#[derive(Deserialize)]
struct WireBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    styles: Styles,
    #[serde(default)]
    props: Map<String, Value>,
    #[serde(default)]
    children: Vec<WireBlock>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireTarget {
    Phrase(String),
    Range(Box<WireSelector>),
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct WireSelector {
    last: Option<String>,
    first: Option<String>,
    from_end: Option<usize>,
    from_start: Option<usize>,
    #[serde(rename = "type")]
    block_type: Option<String>,
    all: Option<String>,
    #[serde(default)]
    nested: bool,
    containing: Option<String>,
    id: Option<String>,
    #[serde(default)]
    everything: bool,
    text: Option<String>,
    within: Option<WireTarget>,
}

fn invalid(message: impl Into<String>) -> VoxError {
    VoxError::Interpretation(message.into())
}

impl WireIntent {
    fn into_intent(self, transcript: &str, settings: &InterpreterSettings) -> Result<EditIntent> {
        Ok(match self {
            WireIntent::InsertContent { blocks } => {
                let blocks: Vec<Block> = blocks
                    .into_iter()
                    .filter_map(|wire| match wire.into_block() {
                        Ok(block) => Some(block),
                        Err(e) => {
                            tracing::warn!(error = %e, "dropping invalid block from payload");
                            None
                        }
                    })
                    .collect();
                if blocks.is_empty() {
                    return Err(invalid("insertContent carries no usable blocks"));
                }
                EditIntent::InsertContent { blocks }
            }
            WireIntent::ApplyFormatting {
                target,
                style,
                value,
            } => {
                let style = StyleName::from_str(style.trim())
                    .map_err(|_| invalid(format!("unknown style {:?}", style)))?;
                let value = style_value(style, value)?;
                EditIntent::formatting(target.into_selector()?, style, value)?
            }
            WireIntent::SelectText { target } => EditIntent::SelectText {
                target: target.into_target()?,
            },
            WireIntent::ReplaceText {
                find,
                replace_with,
                scope,
            } => {
                let find = find.trim().to_string();
                if find.is_empty() {
                    return Err(invalid("replaceText needs a non-empty find string"));
                }
                EditIntent::ReplaceText {
                    find,
                    replace_with: replace_with.trim().to_string(),
                    scope: scope.map(WireTarget::into_selector).transpose()?,
                }
            }
            WireIntent::DeleteRange { scope } => EditIntent::DeleteRange {
                scope: scope.into_target()?,
            },
            WireIntent::ChangeBlockType {
                target,
                new_type,
                props,
            } => {
                let new_type = block_type(&new_type)?;
                if new_type == BlockType::PageLink {
                    return Err(invalid("blocks cannot be converted into page links"));
                }
                EditIntent::ChangeBlockType {
                    target: target.into_selector()?,
                    new_type,
                    props,
                }
            }
            WireIntent::CreateLinkedPage { title, icon } => EditIntent::CreateLinkedPage {
                title: non_empty(title).unwrap_or_else(|| settings.default_page_title.clone()),
                icon: non_empty(icon).unwrap_or_else(|| settings.default_page_icon.clone()),
            },
            WireIntent::Undo { steps } => EditIntent::undo(step_count(&steps)?),
            WireIntent::Redo { steps } => EditIntent::redo(step_count(&steps)?),
            WireIntent::Unrecognized {} => EditIntent::unrecognized(transcript.trim()),
        })
    }
}

impl WireBlock {
    fn into_block(self) -> Result<Block> {
        let block_type = block_type(&self.block_type)?;
        let kind = BlockKind::from_type(block_type, &self.props)?;
        let mut block = Block::new(kind);
        let text = self.text.trim();
        if !text.is_empty() {
            block.set_content(vec![InlineRun::styled(text, self.styles)])?;
        }
        let children = self
            .children
            .into_iter()
            .map(WireBlock::into_block)
            .collect::<Result<Vec<_>>>()?;
        block.set_children(children)?;
        Ok(block)
    }
}

impl WireTarget {
    fn into_target(self) -> Result<Target> {
        match self {
            WireTarget::Range(range) if range.text.is_some() => {
                let range = *range;
                let text = non_empty(range.text).ok_or_else(|| invalid("empty text range"))?;
                Ok(Target::Text(TextRange {
                    text,
                    within: range.within.map(WireTarget::into_selector).transpose()?,
                }))
            }
            other => other.into_selector().map(Target::Blocks),
        }
    }

    fn into_selector(self) -> Result<BlockSelector> {
        match self {
            WireTarget::Phrase(phrase) => match phrase.trim().to_lowercase().as_str() {
                "last" | "this" | "current" => Ok(BlockSelector::last(None)),
                "first" => Ok(BlockSelector::first(None)),
                "all" | "everything" | "document" => Ok(BlockSelector::Everything),
                _ => grammar::parse_selector(&phrase)
                    .ok_or_else(|| invalid(format!("unknown block reference {:?}", phrase))),
            },
            WireTarget::Range(range) => range.into_selector(),
        }
    }
}

impl WireSelector {
    fn into_selector(self) -> Result<BlockSelector> {
        let typed = optional_type(self.block_type.as_deref())?;
        if let Some(kind) = self.last {
            return Ok(BlockSelector::last(optional_type(Some(&kind))?));
        }
        if let Some(kind) = self.first {
            return Ok(BlockSelector::first(optional_type(Some(&kind))?));
        }
        if let Some(index) = self.from_end {
            return Ok(BlockSelector::FromEnd {
                block_type: typed,
                index,
            });
        }
        if let Some(index) = self.from_start {
            return Ok(BlockSelector::FromStart {
                block_type: typed,
                index,
            });
        }
        if let Some(kind) = self.all {
            return Ok(match optional_type(Some(&kind))? {
                Some(block_type) => BlockSelector::AllOfType {
                    block_type,
                    nested: self.nested,
                },
                None => BlockSelector::Everything,
            });
        }
        if let Some(text) = non_empty(self.containing) {
            return Ok(BlockSelector::Containing {
                text,
                block_type: typed,
            });
        }
        if let Some(id) = non_empty(self.id) {
            return Ok(BlockSelector::Id(id.into()));
        }
        if self.everything {
            return Ok(BlockSelector::Everything);
        }
        Err(invalid("block selector names no block"))
    }
}

fn block_type(name: &str) -> Result<BlockType> {
    BlockType::from_str(name.trim()).map_err(|_| invalid(format!("unknown block type {:?}", name)))
}

/// `None` for generic names ("block", "any", "").
fn optional_type(name: Option<&str>) -> Result<Option<BlockType>> {
    match name.map(str::trim) {
        None | Some("") => Ok(None),
        Some(n) if ["block", "any", "blocks"].contains(&n.to_lowercase().as_str()) => Ok(None),
        Some(n) => block_type(n).map(Some),
    }
}

fn style_value(style: StyleName, value: Value) -> Result<StyleValue> {
    Ok(match value {
        Value::Null => StyleValue::Flag(true),
        Value::Bool(flag) => StyleValue::Flag(flag),
        Value::String(s) if !style.takes_text() => match s.trim().to_lowercase().as_str() {
            "true" | "on" | "yes" => StyleValue::Flag(true),
            "false" | "off" | "no" => StyleValue::Flag(false),
            other => return Err(invalid(format!("{:?} is not a flag for {}", other, style))),
        },
        Value::String(s) => StyleValue::Text(s.trim().to_lowercase()),
        other => return Err(invalid(format!("unsupported style value {}", other))),
    })
}

fn step_count(steps: &Value) -> Result<usize> {
    match steps {
        Value::Null => Ok(1),
        Value::Number(n) => n
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| invalid(format!("invalid step count {}", n))),
        Value::String(s) => grammar::parse_number(s.trim())
            .ok_or_else(|| invalid(format!("invalid step count {:?}", s))),
        other => Err(invalid(format!("invalid step count {}", other))),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

//! Edit intents: the typed vocabulary between the interpreter and the executor.
//!
//! Intents never hold resolved block references for descriptive targets. "The last
//! paragraph" stays a [`BlockSelector`] until the executor resolves it against the
//! live document, which may have changed since the transcript was interpreted.

use std::fmt;

use serde_json::{Map, Value};
use strum::EnumString;

use crate::error::{Result, VoxError};
use crate::model::{Block, BlockId, BlockType};

/// Upper bound on undo/redo steps accepted from a single command.
pub const MAX_HISTORY_STEPS: usize = 50;

/// Abstract locator for blocks, resolved by the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockSelector {
    /// The `index`-th top-level block counting from the end (0 = last),
    /// optionally restricted to a type.
    FromEnd {
        block_type: Option<BlockType>,
        index: usize,
    },
    /// The `index`-th top-level block counting from the start (0 = first).
    FromStart {
        block_type: Option<BlockType>,
        index: usize,
    },
    /// Every block of a type: top-level only unless `nested`.
    AllOfType { block_type: BlockType, nested: bool },
    /// First block, depth-first, whose text contains `text` (case-insensitive).
    Containing {
        text: String,
        block_type: Option<BlockType>,
    },
    Id(BlockId),
    /// Every top-level block.
    Everything,
}

impl BlockSelector {
    pub fn last(block_type: Option<BlockType>) -> Self {
        BlockSelector::FromEnd {
            block_type,
            index: 0,
        }
    }

    pub fn first(block_type: Option<BlockType>) -> Self {
        BlockSelector::FromStart {
            block_type,
            index: 0,
        }
    }

    /// Whether the selector can match more than one block.
    pub fn is_multi(&self) -> bool {
        matches!(
            self,
            BlockSelector::AllOfType { .. } | BlockSelector::Everything
        )
    }
}

impl fmt::Display for BlockSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let type_name = |t: &Option<BlockType>| t.map_or("block".to_string(), |t| t.to_string());
        match self {
            BlockSelector::FromEnd { block_type, index: 0 } => {
                write!(f, "last {}", type_name(block_type))
            }
            BlockSelector::FromEnd { block_type, index } => {
                write!(f, "{} from the end {}", index + 1, type_name(block_type))
            }
            BlockSelector::FromStart { block_type, index: 0 } => {
                write!(f, "first {}", type_name(block_type))
            }
            BlockSelector::FromStart { block_type, index } => {
                write!(f, "{} {}", index + 1, type_name(block_type))
            }
            BlockSelector::AllOfType { block_type, .. } => write!(f, "all {}", block_type),
            BlockSelector::Containing { text, .. } => write!(f, "block containing \"{}\"", text),
            BlockSelector::Id(id) => write!(f, "block {}", id),
            BlockSelector::Everything => f.write_str("whole document"),
        }
    }
}

/// A piece of text, optionally restricted to the blocks a selector matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRange {
    pub text: String,
    pub within: Option<BlockSelector>,
}

/// What a select/delete command points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Blocks(BlockSelector),
    Text(TextRange),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum StyleName {
    #[strum(serialize = "bold", serialize = "strong")]
    Bold,
    #[strum(serialize = "italic", serialize = "italics", serialize = "italicize")]
    Italic,
    #[strum(serialize = "underline", serialize = "underlined")]
    Underline,
    #[strum(
        serialize = "strike",
        serialize = "strikethrough",
        serialize = "struck",
        serialize = "crossed out"
    )]
    Strike,
    #[strum(serialize = "code", serialize = "monospace", serialize = "monospaced")]
    Code,
    #[strum(serialize = "textColor", serialize = "color", serialize = "colour")]
    TextColor,
    #[strum(serialize = "backgroundColor", serialize = "highlight", serialize = "background")]
    BackgroundColor,
}

impl StyleName {
    /// Color styles take a string value, the others a flag.
    pub fn takes_text(&self) -> bool {
        matches!(self, StyleName::TextColor | StyleName::BackgroundColor)
    }
}

impl fmt::Display for StyleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StyleName::Bold => "bold",
            StyleName::Italic => "italic",
            StyleName::Underline => "underline",
            StyleName::Strike => "strike",
            StyleName::Code => "code",
            StyleName::TextColor => "textColor",
            StyleName::BackgroundColor => "backgroundColor",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleValue {
    Flag(bool),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditIntent {
    InsertContent {
        blocks: Vec<Block>,
    },
    ApplyFormatting {
        target: BlockSelector,
        style: StyleName,
        value: StyleValue,
    },
    SelectText {
        target: Target,
    },
    ReplaceText {
        find: String,
        replace_with: String,
        scope: Option<BlockSelector>,
    },
    DeleteRange {
        scope: Target,
    },
    ChangeBlockType {
        target: BlockSelector,
        new_type: BlockType,
        props: Map<String, Value>,
    },
    CreateLinkedPage {
        title: String,
        icon: String,
    },
    Undo {
        steps: usize,
    },
    Redo {
        steps: usize,
    },
    Unrecognized {
        raw_text: String,
    },
}

impl EditIntent {
    /// Formatting with a value checked against the style: flags for on/off styles,
    /// a non-empty string for colors.
    pub fn formatting(target: BlockSelector, style: StyleName, value: StyleValue) -> Result<Self> {
        match (&value, style.takes_text()) {
            (StyleValue::Flag(_), false) => {}
            (StyleValue::Text(t), true) if !t.trim().is_empty() => {}
            _ => {
                return Err(VoxError::Interpretation(format!(
                    "invalid value {:?} for style {}",
                    value, style
                )))
            }
        }
        Ok(EditIntent::ApplyFormatting {
            target,
            style,
            value,
        })
    }

    pub fn undo(steps: usize) -> Self {
        EditIntent::Undo {
            steps: steps.clamp(1, MAX_HISTORY_STEPS),
        }
    }

    pub fn redo(steps: usize) -> Self {
        EditIntent::Redo {
            steps: steps.clamp(1, MAX_HISTORY_STEPS),
        }
    }

    pub fn unrecognized(raw_text: impl Into<String>) -> Self {
        EditIntent::Unrecognized {
            raw_text: raw_text.into(),
        }
    }

    /// Undo and redo go to the history manager instead of the executor.
    pub fn is_history(&self) -> bool {
        matches!(self, EditIntent::Undo { .. } | EditIntent::Redo { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            EditIntent::InsertContent { .. } => "insertContent",
            EditIntent::ApplyFormatting { .. } => "applyFormatting",
            EditIntent::SelectText { .. } => "selectText",
            EditIntent::ReplaceText { .. } => "replaceText",
            EditIntent::DeleteRange { .. } => "deleteRange",
            EditIntent::ChangeBlockType { .. } => "changeBlockType",
            EditIntent::CreateLinkedPage { .. } => "createLinkedPage",
            EditIntent::Undo { .. } => "undo",
            EditIntent::Redo { .. } => "redo",
            EditIntent::Unrecognized { .. } => "unrecognized",
        }
    }
}

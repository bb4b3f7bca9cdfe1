//! # Blocks
//!
//! A [`Block`] is one node of a page's content tree. Its kind is a closed sum type
//! ([`BlockKind`]) so every operation that cares about block types (formatting,
//! type changes, serialization) matches exhaustively instead of dispatching on strings.
//!
//! ## Wire Format
//!
//! Blocks serialize to the editor's JSON shape, which is also the sync format with
//! the backend:
//!
//! ```json
//! {
//!   "id": "0b6c…",
//!   "type": "heading",
//!   "props": { "textColor": "default", "backgroundColor": "default",
//!              "textAlignment": "left", "level": 2 },
//!   "content": [ { "type": "text", "text": "Groceries", "styles": { "bold": true } } ],
//!   "children": []
//! }
//! ```
//!
//! Props the model does not know about are kept verbatim in [`BlockProps::extra`], so
//! a document loaded from the backend serializes back to the same JSON.
//!
//! ## Page Links
//!
//! `pageLink` blocks are content-less: no inline runs and no children. The fields of
//! [`Block`] are private and every mutator that could break this returns
//! [`VoxError::StructuralViolation`] instead.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::EnumString;
use uuid::Uuid;

use crate::error::{Result, VoxError};
use crate::model::page::PageId;

/// Opaque, document-unique block identifier.
///
/// Ids produced by the editor are UUID strings, but any string is accepted on load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BlockId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for BlockId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The type tag of a block, without its type-specific props.
///
/// Parsing is case-insensitive and accepts the spoken aliases the command grammar
/// produces ("todo", "bullet", "h1"...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "camelCase")]
#[strum(ascii_case_insensitive)]
pub enum BlockType {
    #[strum(serialize = "paragraph", serialize = "text", serialize = "line")]
    Paragraph,
    #[strum(serialize = "heading", serialize = "title", serialize = "header")]
    Heading,
    #[strum(
        serialize = "bulletListItem",
        serialize = "bullet",
        serialize = "bullet point",
        serialize = "bulleted list"
    )]
    BulletListItem,
    #[strum(
        serialize = "numberedListItem",
        serialize = "numbered",
        serialize = "numbered list",
        serialize = "number"
    )]
    NumberedListItem,
    #[strum(
        serialize = "todoListItem",
        serialize = "todo",
        serialize = "to-do",
        serialize = "to do",
        serialize = "checkListItem",
        serialize = "checklist",
        serialize = "task"
    )]
    TodoListItem,
    #[strum(serialize = "quote", serialize = "blockquote")]
    Quote,
    #[strum(serialize = "code", serialize = "codeBlock", serialize = "code block")]
    Code,
    #[strum(serialize = "pageLink", serialize = "page link", serialize = "link")]
    PageLink,
}

impl BlockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Paragraph => "paragraph",
            BlockType::Heading => "heading",
            BlockType::BulletListItem => "bulletListItem",
            BlockType::NumberedListItem => "numberedListItem",
            BlockType::TodoListItem => "todoListItem",
            BlockType::Quote => "quote",
            BlockType::Code => "code",
            BlockType::PageLink => "pageLink",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Props carried by a `pageLink` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLinkProps {
    pub page_id: PageId,
    pub page_title: String,
    pub page_icon: String,
}

/// What a block is, together with the props that only make sense for that kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    /// Level is clamped to 1..=3.
    Heading { level: u8 },
    BulletListItem,
    NumberedListItem,
    TodoListItem { checked: bool },
    Quote,
    Code { language: Option<String> },
    PageLink(PageLinkProps),
}

impl BlockKind {
    pub fn heading(level: u8) -> Self {
        BlockKind::Heading {
            level: level.clamp(1, 3),
        }
    }

    pub fn block_type(&self) -> BlockType {
        match self {
            BlockKind::Paragraph => BlockType::Paragraph,
            BlockKind::Heading { .. } => BlockType::Heading,
            BlockKind::BulletListItem => BlockType::BulletListItem,
            BlockKind::NumberedListItem => BlockType::NumberedListItem,
            BlockKind::TodoListItem { .. } => BlockType::TodoListItem,
            BlockKind::Quote => BlockType::Quote,
            BlockKind::Code { .. } => BlockType::Code,
            BlockKind::PageLink(_) => BlockType::PageLink,
        }
    }

    /// Builds a text-bearing kind from its type tag and a props object.
    ///
    /// `pageLink` cannot be built this way: a link needs a page, not props.
    pub fn from_type(block_type: BlockType, props: &Map<String, Value>) -> Result<Self> {
        Ok(match block_type {
            BlockType::Paragraph => BlockKind::Paragraph,
            BlockType::Heading => BlockKind::heading(
                props
                    .get("level")
                    .and_then(Value::as_u64)
                    .map(|l| l.min(3) as u8)
                    .unwrap_or(1),
            ),
            BlockType::BulletListItem => BlockKind::BulletListItem,
            BlockType::NumberedListItem => BlockKind::NumberedListItem,
            BlockType::TodoListItem => BlockKind::TodoListItem {
                checked: props
                    .get("checked")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            },
            BlockType::Quote => BlockKind::Quote,
            BlockType::Code => BlockKind::Code {
                language: props
                    .get("language")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            BlockType::PageLink => {
                return Err(VoxError::StructuralViolation(
                    "page links can only be created for an existing page".to_string(),
                ))
            }
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

fn default_color() -> String {
    "default".to_string()
}

/// Props shared by every block type.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockProps {
    pub text_color: String,
    pub background_color: String,
    pub text_alignment: Alignment,
    /// Props this model does not interpret, preserved for round-tripping.
    pub extra: BTreeMap<String, Value>,
}

impl Default for BlockProps {
    fn default() -> Self {
        Self {
            text_color: default_color(),
            background_color: default_color(),
            text_alignment: Alignment::Left,
            extra: BTreeMap::new(),
        }
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Inline styles of a text run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Styles {
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub underline: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub strike: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub code: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineRun {
    pub text: String,
    pub styles: Styles,
}

impl InlineRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            styles: Styles::default(),
        }
    }

    pub fn styled(text: impl Into<String>, styles: Styles) -> Self {
        Self {
            text: text.into(),
            styles,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBlock", into = "RawBlock")]
pub struct Block {
    id: BlockId,
    kind: BlockKind,
    props: BlockProps,
    content: Vec<InlineRun>,
    children: Vec<Block>,
}

impl Block {
    /// An empty block of the given kind with a fresh id.
    pub fn new(kind: BlockKind) -> Self {
        Self {
            id: BlockId::new(),
            kind,
            props: BlockProps::default(),
            content: Vec::new(),
            children: Vec::new(),
        }
    }

    /// A block holding a single unstyled run. Empty text yields no runs.
    pub fn with_text(kind: BlockKind, text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        let mut block = Self::new(kind);
        if !text.is_empty() {
            block.set_content(vec![InlineRun::plain(text)])?;
        }
        Ok(block)
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut block = Self::new(BlockKind::Paragraph);
        if !text.is_empty() {
            block.content.push(InlineRun::plain(text));
        }
        block
    }

    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        let text = text.into();
        let mut block = Self::new(BlockKind::heading(level));
        if !text.is_empty() {
            block.content.push(InlineRun::plain(text));
        }
        block
    }

    pub fn link_to(link: PageLinkProps) -> Self {
        Self::new(BlockKind::PageLink(link))
    }

    pub fn with_id(mut self, id: impl Into<BlockId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_children(mut self, children: Vec<Block>) -> Result<Self> {
        self.set_children(children)?;
        Ok(self)
    }

    pub fn id(&self) -> &BlockId {
        &self.id
    }

    pub(crate) fn set_id(&mut self, id: BlockId) {
        self.id = id;
    }

    pub fn kind(&self) -> &BlockKind {
        &self.kind
    }

    pub fn block_type(&self) -> BlockType {
        self.kind.block_type()
    }

    pub fn props(&self) -> &BlockProps {
        &self.props
    }

    pub fn props_mut(&mut self) -> &mut BlockProps {
        &mut self.props
    }

    pub fn content(&self) -> &[InlineRun] {
        &self.content
    }

    pub fn children(&self) -> &[Block] {
        &self.children
    }

    pub fn is_page_link(&self) -> bool {
        matches!(self.kind, BlockKind::PageLink(_))
    }

    pub fn page_link(&self) -> Option<&PageLinkProps> {
        match &self.kind {
            BlockKind::PageLink(link) => Some(link),
            _ => None,
        }
    }

    /// Concatenated text of this block's own runs (children excluded).
    pub fn plain_text(&self) -> String {
        self.content.iter().map(|run| run.text.as_str()).collect()
    }

    /// Mutable access to the runs. `None` for page links.
    pub fn content_mut(&mut self) -> Option<&mut Vec<InlineRun>> {
        if self.is_page_link() {
            None
        } else {
            Some(&mut self.content)
        }
    }

    /// Mutable access to the children. `None` for page links.
    pub fn children_mut(&mut self) -> Option<&mut Vec<Block>> {
        if self.is_page_link() {
            None
        } else {
            Some(&mut self.children)
        }
    }

    pub(crate) fn children_vec_mut(&mut self) -> &mut Vec<Block> {
        &mut self.children
    }

    pub fn set_content(&mut self, content: Vec<InlineRun>) -> Result<()> {
        if self.is_page_link() && !content.is_empty() {
            return Err(VoxError::StructuralViolation(format!(
                "page link {} cannot hold text",
                self.id
            )));
        }
        self.content = content;
        Ok(())
    }

    pub fn set_children(&mut self, children: Vec<Block>) -> Result<()> {
        if self.is_page_link() && !children.is_empty() {
            return Err(VoxError::StructuralViolation(format!(
                "page link {} cannot have children",
                self.id
            )));
        }
        self.children = children;
        Ok(())
    }

    /// Changes the kind in place, keeping id, props, runs and children.
    pub fn set_kind(&mut self, kind: BlockKind) -> Result<()> {
        if matches!(kind, BlockKind::PageLink(_))
            && (!self.content.is_empty() || !self.children.is_empty())
        {
            return Err(VoxError::StructuralViolation(format!(
                "block {} has content and cannot become a page link",
                self.id
            )));
        }
        self.kind = kind;
        Ok(())
    }
}

// --- Wire representation ---

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum RawInline {
    Text {
        text: String,
        #[serde(default)]
        styles: Styles,
    },
}

#[derive(Serialize, Deserialize)]
struct RawBlock {
    id: BlockId,
    #[serde(rename = "type")]
    block_type: BlockType,
    #[serde(default)]
    props: Map<String, Value>,
    #[serde(default)]
    content: Vec<RawInline>,
    #[serde(default)]
    children: Vec<Block>,
}

const COMMON_PROPS: [&str; 3] = ["textColor", "backgroundColor", "textAlignment"];

fn kind_prop_keys(block_type: BlockType) -> &'static [&'static str] {
    match block_type {
        BlockType::Heading => &["level"],
        BlockType::TodoListItem => &["checked"],
        BlockType::Code => &["language"],
        BlockType::PageLink => &["pageId", "pageTitle", "pageIcon"],
        BlockType::Paragraph
        | BlockType::BulletListItem
        | BlockType::NumberedListItem
        | BlockType::Quote => &[],
    }
}

fn string_prop(props: &Map<String, Value>, key: &str) -> Option<String> {
    props.get(key).and_then(Value::as_str).map(str::to_string)
}

impl TryFrom<RawBlock> for Block {
    type Error = VoxError;

    fn try_from(raw: RawBlock) -> Result<Self> {
        let kind = match raw.block_type {
            BlockType::PageLink => {
                let page_id = raw
                    .props
                    .get("pageId")
                    .and_then(Value::as_str)
                    .and_then(|s| s.parse::<PageId>().ok())
                    .ok_or_else(|| {
                        VoxError::StructuralViolation(format!(
                            "page link {} has no valid pageId",
                            raw.id
                        ))
                    })?;
                BlockKind::PageLink(PageLinkProps {
                    page_id,
                    page_title: string_prop(&raw.props, "pageTitle").unwrap_or_default(),
                    page_icon: string_prop(&raw.props, "pageIcon").unwrap_or_default(),
                })
            }
            other => BlockKind::from_type(other, &raw.props)?,
        };

        let text_alignment = raw
            .props
            .get("textAlignment")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        let known = kind_prop_keys(raw.block_type);
        let extra = raw
            .props
            .iter()
            .filter(|(k, _)| !COMMON_PROPS.contains(&k.as_str()) && !known.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let props = BlockProps {
            text_color: string_prop(&raw.props, "textColor").unwrap_or_else(default_color),
            background_color: string_prop(&raw.props, "backgroundColor")
                .unwrap_or_else(default_color),
            text_alignment,
            extra,
        };

        let content = raw
            .content
            .into_iter()
            .map(|inline| match inline {
                RawInline::Text { text, styles } => InlineRun { text, styles },
            })
            .collect();

        let mut block = Block {
            id: raw.id,
            kind,
            props,
            content: Vec::new(),
            children: Vec::new(),
        };
        block.set_content(content)?;
        block.set_children(raw.children)?;
        Ok(block)
    }
}

impl From<Block> for RawBlock {
    fn from(block: Block) -> Self {
        let block_type = block.kind.block_type();
        let mut props: Map<String, Value> = block.props.extra.into_iter().collect();
        props.insert("textColor".into(), Value::String(block.props.text_color));
        props.insert(
            "backgroundColor".into(),
            Value::String(block.props.background_color),
        );
        props.insert(
            "textAlignment".into(),
            serde_json::to_value(block.props.text_alignment).unwrap_or(Value::Null),
        );

        match block.kind {
            BlockKind::Heading { level } => {
                props.insert("level".into(), Value::from(level));
            }
            BlockKind::TodoListItem { checked } => {
                props.insert("checked".into(), Value::Bool(checked));
            }
            BlockKind::Code { language } => {
                if let Some(language) = language {
                    props.insert("language".into(), Value::String(language));
                }
            }
            BlockKind::PageLink(link) => {
                props.insert("pageId".into(), Value::String(link.page_id.to_string()));
                props.insert("pageTitle".into(), Value::String(link.page_title));
                props.insert("pageIcon".into(), Value::String(link.page_icon));
            }
            BlockKind::Paragraph
            | BlockKind::BulletListItem
            | BlockKind::NumberedListItem
            | BlockKind::Quote => {}
        }

        RawBlock {
            id: block.id,
            block_type,
            props,
            content: block
                .content
                .into_iter()
                .map(|run| RawInline::Text {
                    text: run.text,
                    styles: run.styles,
                })
                .collect(),
            children: block.children,
        }
    }
}

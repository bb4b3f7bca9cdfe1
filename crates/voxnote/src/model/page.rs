use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::document::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(Uuid);

impl PageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PageId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for PageId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for PageId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Everything about a page except its document.
///
/// The store keeps these in one index so the page tree can be listed without
/// reading any content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub id: PageId,
    pub title: String,
    pub icon: String,
    #[serde(default)]
    pub parent_id: Option<PageId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PageMeta {
    pub fn new(title: String, icon: String, parent_id: Option<PageId>) -> Self {
        let now = Utc::now();
        Self {
            id: PageId::new(),
            title,
            icon,
            parent_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Advances `updated_at`, strictly increasing even if the clock did not move.
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::milliseconds(1)
        };
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub metadata: PageMeta,
    pub content: Document,
}

impl Page {
    /// A new page whose document is the default heading + paragraph skeleton.
    pub fn new(title: String, icon: String, parent_id: Option<PageId>) -> Self {
        let content = Document::skeleton(&title);
        Self {
            metadata: PageMeta::new(title, icon, parent_id),
            content,
        }
    }

    pub fn id(&self) -> PageId {
        self.metadata.id
    }

    pub fn parent_id(&self) -> Option<PageId> {
        self.metadata.parent_id
    }

    pub fn title(&self) -> &str {
        &self.metadata.title
    }
}

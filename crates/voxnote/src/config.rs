//! # Configuration
//!
//! Configuration is managed by [`clapfig`], which handles layered loading from TOML
//! files, environment variables, and programmatic overrides.
//!
//! ## Storage Hierarchy
//!
//! Configuration is resolved in priority order:
//! 1. **Environment variables**: `VOXNOTE__HISTORY_LIMIT`, `VOXNOTE__AUTOSAVE_DELAY_MS`, etc.
//! 2. **Workspace Config**: `voxnote.toml` in an explicitly given workspace directory.
//! 3. **Global Config**: `voxnote.toml` in the data directory (via `directories`).
//! 4. **Compiled Defaults**: Built-in fallbacks via `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `history_limit` | `100` | Undo and redo entries kept per page |
//! | `autosave_delay_ms` | `1000` | Quiet period before a changed document is saved |
//! | `default_page_title` | `Untitled` | Title of pages created without one |
//! | `default_page_icon` | `📄` | Icon of pages created without one |
//! | `local_grammar` | `true` | Match built-in commands before asking the intent provider |
//! | `provider_timeout_ms` | `10000` | Provider answers slower than this are discarded; `0` disables |

use std::time::Duration;

use confique::Config;
use serde::{Deserialize, Serialize};

/// Configuration for voxnote, stored in `voxnote.toml`.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VoxConfig {
    /// Undo and redo entries kept per page; older ones are dropped.
    #[config(default = 100)]
    pub history_limit: usize,

    /// Milliseconds without edits before a document is saved.
    #[config(default = 1000)]
    pub autosave_delay_ms: u64,

    #[config(default = "Untitled")]
    pub default_page_title: String,

    #[config(default = "📄")]
    pub default_page_icon: String,

    /// Try the built-in command grammar before the intent provider.
    #[config(default = true)]
    pub local_grammar: bool,

    /// Provider answers slower than this are discarded. 0 disables the limit.
    #[config(default = 10000)]
    pub provider_timeout_ms: u64,
}

impl Default for VoxConfig {
    fn default() -> Self {
        Self {
            history_limit: 100,
            autosave_delay_ms: 1000,
            default_page_title: "Untitled".to_string(),
            default_page_icon: "📄".to_string(),
            local_grammar: true,
            provider_timeout_ms: 10_000,
        }
    }
}

impl VoxConfig {
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    /// The history bound, never below one entry.
    pub fn history_limit(&self) -> usize {
        self.history_limit.max(1)
    }
}

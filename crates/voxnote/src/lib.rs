//! # Voxnote Architecture
//!
//! Voxnote is the **editing core of a voice-driven, block-based note app**. It takes
//! a spoken command (as text), works out what the user meant, applies it to the
//! page's document and keeps the page graph, undo history and storage consistent.
//! Rendering, audio capture and speech recognition live outside.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs, init.rs)                                │
//! │  - Notebook facade: pages, sessions, commands, autosave     │
//! │  - Returns structured results with notices                  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Session Layer (session.rs)                                 │
//! │  - One open page: interpret → execute → reconcile links     │
//! │    → record history → debounced save                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Editing Layer (interpreter/, executor/, history/, links.rs)│
//! │  - Pure logic over Rust types, no I/O assumptions           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/)                                     │
//! │  - DataStore trait for the page graph, KeyValueStore for    │
//! │    history; in-memory and JSON-on-disk implementations      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: No I/O Assumptions in Core
//!
//! Nothing in this crate writes to stdout/stderr, installs a logging subscriber or
//! reads the clock on its own below the API layer. Sessions take `Instant`s from the
//! caller, which keeps autosave deterministic in tests.
//!
//! ## Module Overview
//!
//! - [`api`]: the [`Notebook`](api::Notebook) facade
//! - [`init`]: file-backed setup with layered configuration
//! - [`session`]: the per-page command pipeline
//! - [`interpreter`]: transcript → [`EditIntent`](interpreter::EditIntent)
//! - [`executor`]: applies intents to documents
//! - [`history`]: bounded, persisted undo/redo
//! - [`links`]: page-link consistency
//! - [`model`]: blocks, documents and pages
//! - [`store`]: page graph and key-value storage
//! - [`graph`]: page tree helpers
//! - [`debounce`]: autosave timing
//! - [`config`]: configuration
//! - [`error`]: error types

pub mod api;
pub mod config;
pub mod debounce;
pub mod error;
pub mod executor;
pub mod graph;
pub mod history;
pub mod init;
pub mod interpreter;
pub mod links;
pub mod model;
pub mod session;
pub mod store;

pub use api::{Notebook, PageResult};
pub use error::{Result, VoxError};
pub use session::{CommandResult, EditResult, EditSession};

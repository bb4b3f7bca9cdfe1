use thiserror::Error;

use crate::model::block::BlockId;
use crate::model::page::PageId;

#[derive(Error, Debug)]
pub enum VoxError {
    #[error("Page not found: {0}")]
    PageNotFound(PageId),

    #[error("Parent page not found: {0}")]
    ParentNotFound(PageId),

    #[error("Page {page} cannot be moved under {parent}: it would become its own ancestor")]
    CycleDetected { page: PageId, parent: PageId },

    #[error("Invalid block structure: {0}")]
    StructuralViolation(String),

    #[error("Duplicate block id in document: {0}")]
    DuplicateBlock(BlockId),

    #[error("A command is already running on page {0}")]
    OperationInFlight(PageId),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Interpretation failed: {0}")]
    Interpretation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, VoxError>;

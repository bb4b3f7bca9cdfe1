use crate::error::Result;
use crate::model::{PageId, PageMeta};
use std::collections::HashMap;

/// Abstract interface for raw storage I/O.
/// This trait handles the "how" of storage (filesystem vs memory),
/// while PageStore handles the "what" (parent rules, cascade deletion).
pub trait StorageBackend {
    // --- Index Operations ---

    /// Load the page index (pages.json)
    fn load_index(&self) -> Result<HashMap<PageId, PageMeta>>;

    /// Save the page index
    fn save_index(&self, index: &HashMap<PageId, PageMeta>) -> Result<()>;

    // --- Content Operations ---

    /// Read the serialized document of a page.
    /// Returns Ok(None) if no content was ever written.
    fn read_content(&self, id: &PageId) -> Result<Option<String>>;

    /// Write the serialized document of a page.
    /// MUST be atomic (e.g. write to tmp then rename) to avoid partial writes.
    fn write_content(&self, id: &PageId, content: &str) -> Result<()>;

    /// Delete the content of a page. Deleting missing content is not an error.
    fn delete_content(&self, id: &PageId) -> Result<()>;
}

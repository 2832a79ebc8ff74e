//! Base trait for all chunkers.

use crate::error::Result;

/// The core trait that all chunkers must implement.
///
/// A chunker splits a knowledge item's content into ordered pieces that are
/// embedded and stored individually. Position in the returned vector is the
/// chunk index and must be preserved by callers.
pub trait Chunker: Send + Sync {
    /// Get the name of this chunker.
    fn name(&self) -> &'static str;

    /// Split `content` into chunks of roughly `max_chunk_size` characters.
    ///
    /// # Returns
    /// At least one chunk, even for empty content.
    fn chunk(&self, content: &str, max_chunk_size: usize) -> Result<Vec<String>>;
}

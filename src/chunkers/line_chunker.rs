//! Line-aligned chunker for knowledge item content.

use super::base::Chunker;
use crate::error::{ExtractError, Result};

/// Greedy chunker that only breaks between lines.
///
/// Lines are accumulated until the next one would push the chunk past the
/// size limit; the chunk is then closed and trimmed. A single line longer
/// than the limit is never split, so the limit is a soft target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineChunker;

impl LineChunker {
    /// Create a new line chunker.
    pub fn new() -> Self {
        Self
    }
}

impl Chunker for LineChunker {
    fn name(&self) -> &'static str {
        "line"
    }

    fn chunk(&self, content: &str, max_chunk_size: usize) -> Result<Vec<String>> {
        if max_chunk_size == 0 {
            return Err(ExtractError::InvalidArgument(
                "max_chunk_size must be greater than zero".to_string(),
            ));
        }

        let mut chunks = Vec::new();
        let mut current = String::new();
        // Length of `current` in characters
        let mut current_len = 0;

        for line in content.split('\n') {
            let line_len = line.chars().count();

            if current_len > 0 && current_len + line_len > max_chunk_size {
                push_trimmed(&mut chunks, &current);
                current.clear();
                current_len = 0;
            }

            current.push_str(line);
            current.push('\n');
            current_len += line_len + 1;
        }

        push_trimmed(&mut chunks, &current);

        if chunks.is_empty() {
            chunks.push(content.to_string());
        }

        Ok(chunks)
    }
}

fn push_trimmed(chunks: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

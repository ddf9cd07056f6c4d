use super::types::{Chunker, TextChunk};

/// Overlapping window chunker for plain-text reference documents.
///
/// Windows are `max_chunk_chars` long and overlap by `overlap_chars`. A window
/// that stops short of the end of the text is cut back to its last sentence
/// or line break, provided the break lies in the second half of the window.
pub struct ReferenceChunker {
    max_chunk_chars: usize,
    overlap_chars: usize,
}

impl ReferenceChunker {
    pub fn new() -> Self {
        Self {
            max_chunk_chars: 1000,
            overlap_chars: 200,
        }
    }

    /// Custom window. `overlap_chars` must be smaller than half the window.
    pub fn with_window(max_chunk_chars: usize, overlap_chars: usize) -> Self {
        assert!(
            overlap_chars < max_chunk_chars / 2,
            "overlap must be smaller than half the chunk size"
        );
        Self {
            max_chunk_chars,
            overlap_chars,
        }
    }
}

impl Default for ReferenceChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for ReferenceChunker {
    fn chunk(&self, text: &str) -> Vec<TextChunk> {
        // Offsets are in characters, not bytes
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < len {
            let mut end = (start + self.max_chunk_chars).min(len);

            if end < len {
                let window = &chars[start..end];
                let break_point = window.iter().rposition(|&c| c == '.' || c == '\n');
                if let Some(bp) = break_point {
                    if bp * 2 > self.max_chunk_chars {
                        end = start + bp + 1;
                    }
                }
            }

            let content: String = chars[start..end].iter().collect();
            let content = content.trim();
            if !content.is_empty() {
                chunks.push(TextChunk {
                    content: content.to_string(),
                    chunk_index: chunks.len(),
                    char_offset: start,
                });
            }

            if end >= len {
                break;
            }
            start = end - self.overlap_chars;
        }

        chunks
    }
}

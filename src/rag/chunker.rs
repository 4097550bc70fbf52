//! Overlapping character-window text splitter.

/// Configuration for splitting ingested documents.
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks.
    pub chunk_overlap: usize,
    /// Hard cap on chunks per document.
    pub max_chunks: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            max_chunks: 200,
        }
    }
}

/// Split text into overlapping chunks, snapping to sentence boundaries
/// where one falls near the end of the window.
pub fn split_text(text: &str, config: &ChunkerConfig) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    let mut chunks = Vec::new();

    if total == 0 {
        return chunks;
    }

    let step = config.chunk_size.saturating_sub(config.chunk_overlap).max(1);
    let mut start = 0;

    while start < total && chunks.len() < config.max_chunks {
        let end = (start + config.chunk_size).min(total);
        let window: String = chars[start..end].iter().collect();

        let piece = if end < total {
            snap_to_sentence_boundary(&window)
        } else {
            window
        };

        let trimmed = piece.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        start += step;
    }

    chunks
}

/// Cut at the last sentence ending in the final 20% of the window, if any.
fn snap_to_sentence_boundary(text: &str) -> String {
    let endings = [". ", "! ", "? ", "。", "！", "？", ".\n", "!\n", "?\n"];

    let search_start = text
        .char_indices()
        .nth(text.chars().count() * 80 / 100)
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    let tail = &text[search_start..];

    for ending in endings {
        if let Some(pos) = tail.rfind(ending) {
            let cut = search_start + pos + ending.len();
            return text[..cut].to_string();
        }
    }

    text.to_string()
}

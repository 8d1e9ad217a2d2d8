//! Overlapping text chunker.
//!
//! Splits document text into passages of at most `max_chars` bytes with a
//! configured overlap between consecutive passages. Splitting prefers
//! natural boundaries — paragraph (`\n\n`), then line, then sentence, then
//! word — before falling back to a hard cut at a character boundary, so a
//! chunk is never severed mid-token when any boundary is available.
//!
//! Chunks never cross a document boundary. Each chunk receives a UUID and
//! a SHA-256 hash of its text.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::{Chunk, RawDocument};

/// Boundary preference order for choosing a split point inside a window.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Split text into overlapping passages of at most `max_chars` bytes.
///
/// Empty (or whitespace-only) input yields an empty output. `overlap`
/// must be smaller than `max_chars` (enforced by config validation).
pub fn split_text(text: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if text.len() <= max_chars {
        return vec![text.to_string()];
    }

    let len = text.len();
    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < len {
        let mut hard_end = floor_boundary(text, (start + max_chars).min(len));
        if hard_end <= start {
            hard_end = ceil_boundary(text, (start + 1).min(len));
        }
        let end = if hard_end >= len {
            len
        } else {
            split_point(text, start, hard_end)
        };

        let piece = text[start..end].trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }

        if end >= len {
            break;
        }
        let mut next = ceil_boundary(text, end.saturating_sub(overlap));
        if next <= start {
            next = end;
        }
        start = next;
    }

    chunks
}

/// Pick the latest natural boundary inside `[start, hard_end)`, trying each
/// separator class in preference order. Falls back to the hard cut.
fn split_point(text: &str, start: usize, hard_end: usize) -> usize {
    let window = &text[start..hard_end];
    for sep in SEPARATORS {
        if let Some(pos) = window.rfind(sep) {
            let cut = start + pos + sep.len();
            if cut > start {
                return cut;
            }
        }
    }
    hard_end
}

fn floor_boundary(text: &str, mut i: usize) -> usize {
    while i > 0 && !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_boundary(text: &str, mut i: usize) -> usize {
    while i < text.len() && !text.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// Chunk one document's text. Returned chunks carry the document's filename
/// as their source and contiguous indices starting at 0.
pub fn chunk_document(doc: &RawDocument, max_chars: usize, overlap: usize) -> Vec<Chunk> {
    split_text(&doc.text, max_chars, overlap)
        .into_iter()
        .enumerate()
        .map(|(i, text)| make_chunk(&doc.filename, i as i64, text))
        .collect()
}

fn make_chunk(source: &str, index: i64, text: String) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        source: source.to_string(),
        chunk_index: index,
        text,
        hash,
    }
}

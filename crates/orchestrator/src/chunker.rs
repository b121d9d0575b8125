//! Chunker (C3): splits a document into ordered, size-bounded text chunks
//! that respect paragraph boundaries.

/// `Split(text, maxChunkChars) → [chunk]`. Packs paragraphs (split on double
/// newline) into chunks of size <= `max_chunk_chars`. A single paragraph
/// exceeding the limit is emitted as its own oversized chunk — no
/// mid-paragraph splitting.
pub fn split(text: &str, max_chunk_chars: usize) -> Vec<String> {
    let paragraphs: Vec<&str> = text.split("\n\n").collect();
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in paragraphs {
        let added_len = if current.is_empty() {
            paragraph.len()
        } else {
            paragraph.len() + 2
        };

        if !current.is_empty() && current.len() + added_len > max_chunk_chars {
            chunks.push(std::mem::take(&mut current));
        }

        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);

        if current.len() > max_chunk_chars {
            chunks.push(std::mem::take(&mut current));
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_short_paragraphs_into_one_chunk() {
        let text = "para one.\n\npara two.\n\npara three.";
        let chunks = split(text, 4000);
        assert_eq!(chunks, vec![text.to_string()]);
    }

    #[test]
    fn splits_when_limit_exceeded() {
        let text = format!("{}\n\n{}", "a".repeat(10), "b".repeat(10));
        let chunks = split(&text, 15);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "a".repeat(10));
        assert_eq!(chunks[1], "b".repeat(10));
    }

    #[test]
    fn oversized_single_paragraph_is_its_own_chunk() {
        let huge = "x".repeat(5000);
        let chunks = split(&huge, 4000);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], huge);
    }

    #[test]
    fn concatenation_preserves_content_modulo_separators() {
        let text = "a\n\nb\n\nc";
        let chunks = split(text, 2);
        let rejoined = chunks.join("\n\n");
        assert_eq!(rejoined, text);
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(split("", 4000).is_empty());
    }
}

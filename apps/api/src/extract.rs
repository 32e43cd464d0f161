//! PDF text extraction for uploaded documents.
//!
//! Extraction never fails the pipeline: malformed or unreadable input is
//! logged and degrades to an empty page sequence, so the analysis stage
//! simply sees empty text for that document.

use tracing::warn;

/// Extracts page-level text from raw PDF bytes (index 0 = first page).
///
/// Returns an empty sequence for input that cannot be parsed. The
/// extraction library panics on some malformed files, so the call is
/// isolated behind `catch_unwind`.
pub fn extract_pages(bytes: &[u8]) -> Vec<String> {
    if bytes.is_empty() {
        warn!("PDF extraction skipped: empty document");
        return Vec::new();
    }

    let outcome = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes));

    match outcome {
        Ok(Ok(pages)) => pages,
        Ok(Err(e)) => {
            warn!("PDF extraction failed, continuing with empty text: {e}");
            Vec::new()
        }
        Err(_) => {
            warn!("PDF extraction panicked on malformed input, continuing with empty text");
            Vec::new()
        }
    }
}

/// Extracts all pages and joins them with newlines into a single text blob.
pub fn extract_joined_text(bytes: &[u8]) -> String {
    extract_pages(bytes).join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_bytes_yield_no_pages() {
        assert!(extract_pages(&[]).is_empty());
        assert_eq!(extract_joined_text(&[]), "");
    }

    #[test]
    fn test_corrupt_bytes_yield_no_pages() {
        let garbage = b"this is definitely not a pdf document";
        assert!(extract_pages(garbage).is_empty());
        assert_eq!(extract_joined_text(garbage), "");
    }

    #[test]
    fn test_truncated_header_yields_no_pages() {
        // A valid magic number followed by nothing parseable.
        let truncated = b"%PDF-1.7\n\xde\xad\xbe\xef";
        assert!(extract_pages(truncated).is_empty());
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Page-level text extraction built on lopdf.

use lopdf::Document;
use tracing::{debug, warn};

use super::DocumentError;

/// Extract the text of every page, preserving page order.
///
/// Pages whose content streams cannot be decoded contribute an empty block
/// rather than aborting the whole document.
pub(super) fn extract_pages(bytes: &[u8]) -> Result<Vec<String>, DocumentError> {
    let doc = Document::load_mem(bytes).map_err(|e| DocumentError::Decode(e.to_string()))?;

    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    let mut pages = Vec::with_capacity(page_numbers.len());
    let mut extracted_chars = 0usize;

    for page_number in page_numbers {
        match doc.extract_text(&[page_number]) {
            Ok(text) => {
                extracted_chars += text.trim().chars().count();
                pages.push(text);
            }
            Err(e) => {
                warn!("text extraction failed for page {}: {}", page_number, e);
                pages.push(String::new());
            }
        }
    }

    if extracted_chars == 0 {
        return Err(DocumentError::Empty);
    }

    debug!(
        "extracted {} pages, {} characters of text",
        pages.len(),
        extracted_chars
    );
    Ok(pages)
}

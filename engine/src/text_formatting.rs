use unicode_segmentation::UnicodeSegmentation;

/// Preview length of clipboard entries in the pickers.
pub const PREVIEW_GRAPHEMES: usize = 50;

/// Truncate `text` to `max_graphemes` grapheme clusters, appending `...` when anything was cut.
pub fn truncate_preview(text: &str, max_graphemes: usize) -> String {
    let mut graphemes = text.grapheme_indices(true);
    match graphemes.nth(max_graphemes) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

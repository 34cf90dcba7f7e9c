/// Break candidates are ignored unless they sit past this share of the window
const MIN_BREAK_RATIO: f64 = 0.3;

/// Splits text into ordered chunks of at most `max_chunk_size` characters
///
/// Each window of `max_chunk_size` characters is cut at the last code fence, else
/// the last blank line, else just after the last sentence end (`". "`), provided
/// that break lies more than 30% into the window. Otherwise the window is cut at its
/// hard edge. Chunks are trimmed and empty ones dropped. Every iteration advances by
/// at least one character, so any input terminates.
///
/// # Examples
///
/// ```
/// use doc_trawler::chunk_text;
///
/// assert!(chunk_text("", 100).is_empty());
/// assert_eq!(chunk_text("  short text  ", 100), vec!["short text".to_string()]);
///
/// let text = "First sentence here. Second sentence here. Third one.";
/// assert_eq!(
///     chunk_text(text, 30),
///     vec!["First sentence here.", "Second sentence here.", "Third one."]
/// );
/// ```
pub fn chunk_text(text: &str, max_chunk_size: usize) -> Vec<String> {
    let max_chunk_size = max_chunk_size.max(1);
    let threshold = max_chunk_size as f64 * MIN_BREAK_RATIO;

    // Byte offset of every char boundary, including the end of the text
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_len = boundaries.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < char_len {
        let window_end = (start + max_chunk_size).min(char_len);
        let window = &text[boundaries[start]..boundaries[window_end]];

        let to_chars = |byte_pos: usize| window[..byte_pos].chars().count();
        let past_threshold = |chars: &usize| *chars as f64 > threshold;

        let end = window
            .rfind("```")
            .map(to_chars)
            .filter(past_threshold)
            .or_else(|| window.rfind("\n\n").map(to_chars).filter(past_threshold))
            .or_else(|| {
                window
                    .rfind(". ")
                    .map(to_chars)
                    .filter(past_threshold)
                    .map(|pos| pos + 1)
            })
            .map_or(window_end, |pos| start + pos);

        let chunk = text[boundaries[start]..boundaries[end]].trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }

        start = end.max(start + 1);
    }

    chunks
}

use std::borrow::Cow;

/// Split raw text on blank lines and keep the trimmed paragraphs whose
/// character count is strictly greater than `min_chars`.
pub fn split_paragraphs(text: &str, min_chars: usize) -> Vec<&str> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| p.chars().count() > min_chars)
        .collect()
}

/// Windows line endings would hide the blank-line delimiter.
pub fn normalize_newlines(text: &str) -> Cow<'_, str> {
    if text.contains('\r') { Cow::Owned(text.replace("\r\n", "\n")) } else { Cow::Borrowed(text) }
}

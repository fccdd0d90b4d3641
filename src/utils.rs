

#[inline]
pub fn safe_truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}


#[inline]
pub fn safe_truncate_ellipsis(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        format!("{}...", safe_truncate(s, max_chars))
    } else {
        s.to_string()
    }
}

/// Content shown in operator reports: first 80 characters, `...` when cut.
pub fn content_preview(content: &str) -> String {
    safe_truncate_ellipsis(content, crate::CONTENT_PREVIEW_CHARS)
}

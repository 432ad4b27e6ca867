//! Shared utility functions

/// Shorten a string to at most `max_chars` characters, ending in "..." when
/// cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let truncated: String = s.chars().take(keep).collect();
    format!("{}...", truncated)
}

/// First line of a possibly multi-line message
pub fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or("")
}

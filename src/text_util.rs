/// Maximum number of characters in a result snippet before truncation.
pub const DEFAULT_SNIPPET_MAX_CHARS: usize = 300;

/// The file name part of a source path, accepting both `/` and `\`
/// separators. Falls back to the whole source when it ends in a separator.
pub fn display_name(source: &str) -> &str {
    match source.rsplit(['/', '\\']).next() {
        Some(name) if !name.is_empty() => name,
        _ => source,
    }
}

/// Cut `text` to at most `max_chars` characters, respecting UTF-8
/// boundaries. Returns the text and whether it was shortened.
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (&text[..byte_idx], true),
        None => (text, false),
    }
}

/// Collapse runs of whitespace (including newlines) into single spaces so a
/// chunk reads as one line in a result card.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build the snippet shown for a hit: whitespace collapsed, truncated, and
/// always followed by an ellipsis since a chunk is a fragment of a larger
/// document.
pub fn snippet(text: &str, max_chars: usize) -> String {
    let collapsed = collapse_whitespace(text);
    let (head, _) = truncate_chars(&collapsed, max_chars);
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_unix() {
        assert_eq!(display_name("docs/sub/ai_notes.txt"), "ai_notes.txt");
    }

    #[test]
    fn display_name_windows() {
        assert_eq!(display_name(r"docs\sub\ai_notes.txt"), "ai_notes.txt");
    }

    #[test]
    fn display_name_bare_and_trailing() {
        assert_eq!(display_name("notes.txt"), "notes.txt");
        assert_eq!(display_name("docs/"), "docs/");
    }

    #[test]
    fn truncate_short_text_untouched() {
        assert_eq!(truncate_chars("hello", 10), ("hello", false));
        assert_eq!(truncate_chars("hello", 5), ("hello", false));
    }

    #[test]
    fn truncate_multibyte() {
        assert_eq!(truncate_chars("金融科技", 2), ("金融", true));
    }

    #[test]
    fn snippet_collapses_and_appends_ellipsis() {
        assert_eq!(snippet("a\n\nb   c", 100), "a b c...");
        assert_eq!(snippet("abcdef", 3), "abc...");
    }
}

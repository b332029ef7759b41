/// Cut `text` to at most `max_chars` characters, ending in `…` when cut.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }

    let kept: String = text.chars().take(max_chars - 1).collect();
    format!("{}…", kept.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_unchanged() {
        assert_eq!(truncate_text("  sunset  ", 300), "sunset");
    }

    #[test]
    fn test_long_text_cut_with_ellipsis() {
        let text = "a".repeat(310);
        let cut = truncate_text(&text, 300);
        assert_eq!(cut.chars().count(), 300);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn test_counts_chars_not_bytes() {
        let text = "ñ".repeat(5);
        assert_eq!(truncate_text(&text, 5), text);
        assert_eq!(truncate_text(&text, 3), "ññ…");
    }
}

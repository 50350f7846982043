//! Publish caption synthesis.

/// Hashtags appended to captions, most important first.
pub const CAPTION_TAGS: &[&str] = &[
    "#history",
    "#shorts",
    "#historyfacts",
    "#forgottenhistory",
    "#didyouknow",
    "#archive",
    "#documentary",
];

/// Longest caption produced.
pub const MAX_CAPTION_CHARS: usize = 90;

/// Build the caption for `title`.
///
/// Tags are appended in order while the caption stays within
/// [`MAX_CAPTION_CHARS`]; the first tag that would overflow ends the list.
pub fn build_caption(title: &str) -> String {
    let mut caption: String = format!("{}: a forgotten chapter of history.", title.trim())
        .chars()
        .take(MAX_CAPTION_CHARS)
        .collect();

    for tag in CAPTION_TAGS {
        if caption.chars().count() + 1 + tag.chars().count() > MAX_CAPTION_CHARS {
            break;
        }
        caption.push(' ');
        caption.push_str(tag);
    }
    caption
}

/// Plain keywords sent as upload tags.
pub fn caption_tags() -> Vec<String> {
    CAPTION_TAGS
        .iter()
        .map(|t| t.trim_start_matches('#').to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn appended_tags(caption: &str) -> Vec<&str> {
        caption.split(' ').filter(|w| w.starts_with('#')).collect()
    }

    #[test]
    fn test_short_title_gets_tags_in_order() {
        let caption = build_caption("Gold Rush Tale");
        assert!(caption.starts_with("Gold Rush Tale: a forgotten chapter of history."));
        assert!(caption.chars().count() <= MAX_CAPTION_CHARS);

        let tags = appended_tags(&caption);
        assert!(!tags.is_empty());
        assert_eq!(tags, CAPTION_TAGS[..tags.len()].to_vec());
    }

    #[test]
    fn test_stops_at_first_overflow() {
        // 40 + 33 = 73 chars of text; " #history" and " #shorts" fill it to exactly 90
        let title = "A".repeat(40);
        let caption = build_caption(&title);
        assert_eq!(appended_tags(&caption), vec!["#history", "#shorts"]);
        assert_eq!(caption.chars().count(), MAX_CAPTION_CHARS);
    }

    #[test]
    fn test_long_title_is_bounded() {
        let caption = build_caption(&"Very Long Title ".repeat(10));
        assert!(caption.chars().count() <= MAX_CAPTION_CHARS);
        assert!(appended_tags(&caption).is_empty());
    }

    #[test]
    fn test_caption_tags_strip_hash() {
        let tags = caption_tags();
        assert_eq!(tags[0], "history");
        assert_eq!(tags.len(), CAPTION_TAGS.len());
    }
}

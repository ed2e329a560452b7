use crate::parsers::text;

#[cfg(test)]
mod basic_tests {
    use super::*;

    #[test]
    fn test_split_into_paragraphs() {
        assert_eq!(text::split_into_paragraphs("").len(), 0);

        let result = text::split_into_paragraphs("Line 1\nLine 2");
        assert_eq!(result, vec![vec!["Line 1", "Line 2"]]);

        let result = text::split_into_paragraphs("Paragraph 1.\n\n\n  \nParagraph 2.");
        assert_eq!(result, vec![vec!["Paragraph 1."], vec!["Paragraph 2."]]);
    }

    #[test]
    fn test_normalize_post_text_keeps_structure() {
        let input = "  Big   news!  \nWe shipped.\n\n\n\n  Details   below  ";
        assert_eq!(
            text::normalize_post_text(input),
            "Big news!\nWe shipped.\n\nDetails below"
        );
    }

    #[test]
    fn test_normalize_whitespace_only() {
        assert_eq!(text::normalize_post_text("   \n\t \r\n  "), "");
    }

    #[test]
    fn test_normalize_is_stable() {
        let once = text::normalize_post_text("a  b\n\n\nc");
        assert_eq!(text::normalize_post_text(&once), once);
    }
}

#[cfg(test)]
mod helper_tests {
    use super::*;

    #[test]
    fn test_strip_ui_lines() {
        let card = "Jane Doe\nLike\nComment\nThis is the real post content\nRepost\nshort";
        assert_eq!(text::strip_ui_lines(card), "This is the real post content");
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(text::truncate_chars("héllo", 2), "hé");
        assert_eq!(text::truncate_chars("abc", 10), "abc");
        assert_eq!(text::truncate_chars("", 3), "");
    }

    #[test]
    fn test_first_non_empty_line() {
        assert_eq!(text::first_non_empty_line("\n  \n  AI \nextra"), Some("AI"));
        assert_eq!(text::first_non_empty_line("  \n"), None);
    }
}

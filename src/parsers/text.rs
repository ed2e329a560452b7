//! Plain-text clean-up for scraped post content.

/// Button captions that leak into an activity card's text
const UI_NOISE: [&str; 6] = ["Like", "Comment", "Repost", "Send", "Follow", "Connect"];

/// Lines this short in an activity card are treated as UI chrome
const MIN_CONTENT_LINE_CHARS: usize = 10;

/// Splits text into paragraphs based on empty lines
pub fn split_into_paragraphs(text: &str) -> Vec<Vec<&str>> {
    let mut paragraphs: Vec<Vec<&str>> = Vec::new();
    let mut current_paragraph: Vec<&str> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            // Found an empty line, which marks a paragraph boundary
            if !current_paragraph.is_empty() {
                paragraphs.push(current_paragraph);
                current_paragraph = Vec::new();
            }
        } else {
            current_paragraph.push(trimmed);
        }
    }

    if !current_paragraph.is_empty() {
        paragraphs.push(current_paragraph);
    }

    paragraphs
}

/// Normalizes whitespace within a single line or paragraph
pub fn normalize_whitespace_in_segment(segment: &str) -> String {
    segment.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalizes scraped post text.
///
/// Line breaks inside a paragraph are kept, runs of blank lines collapse to
/// exactly one, and whitespace inside each line is collapsed.
pub fn normalize_post_text(text: &str) -> String {
    split_into_paragraphs(text)
        .iter()
        .map(|paragraph| {
            paragraph
                .iter()
                .map(|line| normalize_whitespace_in_segment(line))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Keeps only the lines of an activity card that look like post content
pub fn strip_ui_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !UI_NOISE.contains(line))
        .filter(|line| line.chars().count() > MIN_CONTENT_LINE_CHARS)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Returns at most `max_chars` characters of `text`, never splitting a character
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// First line with visible content, trimmed
pub fn first_non_empty_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|line| !line.is_empty())
}

//! PDF rendering of notes written in a small Markdown subset.
//!
//! Supported: `# ` and `## ` headings, `- ` bullets, numbered lines and blank
//! lines as vertical space. Everything else is a plain paragraph.

use crate::error::ExportError;
use printpdf::*;
use regex::Regex;
use std::io::BufWriter;
use std::sync::LazyLock;

pub const DOCUMENT_TITLE: &str = "Combined Structured Notes";

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const MARGIN_LEFT: f32 = 20.0;
const MARGIN_TOP: f32 = 280.0;
const MARGIN_BOTTOM: f32 = 20.0;

static NUMBERED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.").expect("static regex should be valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStyle {
    Title,
    Heading1,
    Heading2,
    Body,
    ListItem,
    Spacer,
}

impl BlockStyle {
    fn font_size(self) -> f32 {
        match self {
            BlockStyle::Title => 16.0,
            BlockStyle::Heading1 => 14.0,
            BlockStyle::Heading2 => 12.0,
            BlockStyle::Body | BlockStyle::ListItem | BlockStyle::Spacer => 10.0,
        }
    }

    /// Vertical space taken by one line, in millimetres
    fn line_height(self) -> f32 {
        match self {
            BlockStyle::Title => 10.0,
            BlockStyle::Heading1 => 8.0,
            BlockStyle::Heading2 => 7.0,
            BlockStyle::Body | BlockStyle::ListItem => 5.0,
            BlockStyle::Spacer => 3.0,
        }
    }

    /// Characters that fit on one line at this size
    fn wrap_width(self) -> usize {
        match self {
            BlockStyle::Title | BlockStyle::Heading1 => 60,
            BlockStyle::Heading2 => 75,
            BlockStyle::Body | BlockStyle::Spacer => 90,
            BlockStyle::ListItem => 85,
        }
    }

    fn left(self) -> Mm {
        match self {
            BlockStyle::ListItem => Mm(MARGIN_LEFT + 5.0),
            _ => Mm(MARGIN_LEFT),
        }
    }

    fn is_bold(self) -> bool {
        matches!(self, BlockStyle::Title | BlockStyle::Heading1 | BlockStyle::Heading2)
    }
}

/// One laid-out block of the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub style: BlockStyle,
    pub text: String,
}

impl Block {
    fn new(style: BlockStyle, text: impl Into<String>) -> Self {
        Self {
            style,
            text: text.into(),
        }
    }
}

/// Turns Markdown-subset text into styled blocks, one per source line
pub fn layout_markdown(text: &str) -> Vec<Block> {
    text.split('\n')
        .map(str::trim)
        .map(|line| {
            if line.is_empty() {
                Block::new(BlockStyle::Spacer, "")
            } else if let Some(heading) = line.strip_prefix("# ") {
                Block::new(BlockStyle::Heading1, heading)
            } else if let Some(heading) = line.strip_prefix("## ") {
                Block::new(BlockStyle::Heading2, heading)
            } else if let Some(item) = line.strip_prefix("- ") {
                Block::new(BlockStyle::ListItem, format!("\u{2022} {}", item))
            } else if NUMBERED_LINE.is_match(line) {
                Block::new(BlockStyle::ListItem, line)
            } else {
                Block::new(BlockStyle::Body, line)
            }
        })
        .collect()
}

/// Word-wraps `text` at `max_chars` characters
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let current_len = current.chars().count();
        if current_len + word.chars().count() + 1 > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Builtin PDF fonts only cover Latin-1
fn latin1(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2022}' => '\u{b7}',
            c if (c as u32) < 0x100 => c,
            _ => '?',
        })
        .collect()
}

/// Renders the titled document and returns the PDF bytes
pub fn render_pdf(title: &str, markdown: &str) -> Result<Vec<u8>, ExportError> {
    let (doc, page1, layer1) = PdfDocument::new(title, PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ExportError::Pdf(format!("font error: {}", e)))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ExportError::Pdf(format!("font error: {}", e)))?;

    let mut layer = doc.get_page(page1).get_layer(layer1);
    let mut y = MARGIN_TOP;
    let mut page_count = 1;

    let mut blocks = vec![Block::new(BlockStyle::Title, title), Block::new(BlockStyle::Spacer, "")];
    blocks.extend(layout_markdown(markdown));

    for block in &blocks {
        if block.style == BlockStyle::Spacer {
            y -= block.style.line_height();
            continue;
        }

        let font_ref = if block.style.is_bold() { &bold } else { &font };
        for line in wrap_text(&block.text, block.style.wrap_width()) {
            if y - block.style.line_height() < MARGIN_BOTTOM {
                page_count += 1;
                let (page, page_layer) =
                    doc.add_page(PAGE_WIDTH, PAGE_HEIGHT, format!("Layer {}", page_count));
                layer = doc.get_page(page).get_layer(page_layer);
                y = MARGIN_TOP;
            }
            layer.use_text(
                latin1(&line),
                block.style.font_size(),
                block.style.left(),
                Mm(y),
                font_ref,
            );
            y -= block.style.line_height();
        }
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| ExportError::Pdf(format!("save error: {}", e)))?;
    buf.into_inner()
        .map_err(|e| ExportError::Pdf(format!("buffer error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_markdown_subset() {
        let blocks = layout_markdown("# Post 1 Notes\n## Summary\n- point\n1. step\n\nplain");
        let styles: Vec<_> = blocks.iter().map(|b| b.style).collect();
        assert_eq!(
            styles,
            vec![
                BlockStyle::Heading1,
                BlockStyle::Heading2,
                BlockStyle::ListItem,
                BlockStyle::ListItem,
                BlockStyle::Spacer,
                BlockStyle::Body
            ]
        );
        assert_eq!(blocks[0].text, "Post 1 Notes");
        assert_eq!(blocks[2].text, "\u{2022} point");
        assert_eq!(blocks[3].text, "1. step");
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(wrap_text("aa bb cc", 5), vec!["aa bb", "cc"]);
        assert_eq!(wrap_text("", 10), vec![""]);
    }

    #[test]
    fn test_latin1_replaces_unsupported() {
        assert_eq!(latin1("caf\u{e9} \u{1F600}"), "caf\u{e9} ?");
    }

    #[test]
    fn test_render_pdf_paginates() {
        let body = (0..200)
            .map(|i| format!("- line {}", i))
            .collect::<Vec<_>>()
            .join("\n");
        let bytes = render_pdf(DOCUMENT_TITLE, &body).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}

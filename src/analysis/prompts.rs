//! Instruction templates sent to the generative model.
//!
//! Templates use `{name}` placeholders filled by [`render`].

/// Notes template; placeholders `{post_id}` and `{combined_text}`
pub const NOTES_PROMPT: &str = r#"You are an assistant. Create structured notes ONLY from the extracted text below.
Do not use external knowledge, assumptions or interpretations beyond what the text states.

### Input
Post ID: {post_id}
Extracted Text:
{combined_text}

### Rules
1. Headings and hierarchy: use `#` for the main heading, `##` for subheadings, `-` for bullet points and `1.` for numbered steps.
2. Code: preserve code exactly, inside code fences, with original indentation.
3. Tables and structured data: convert tables to Markdown tables with exact values; keep lists and outlines as they appear.
4. Math: keep visible LaTeX exactly; otherwise write symbols as-is.
5. Diagrams and charts described in the text: turn them into bullet points that keep the described relationships; mark gaps with [incomplete].
6. Keep the original order. Mark unclear or cut-off content with [unclear] or [cut-off]. Do not shorten unless the text itself does.
7. The notes must give a complete understanding of the post without extra context.
"#;

/// Topic classification template; placeholder `{content}`
pub const CLASSIFY_PROMPT: &str = r#"You classify social network posts into a single best-fit topic.
The topic is free-form, not restricted to a fixed list.

Rules:
- If the post clearly belongs to a field (for example AI, MCP, Startups, Cloud, Business, Career, Research, Technology), use that field.
- If it covers several subjects, pick the dominant one.
- Vague, motivational or general posts are "General".
- Image-only posts with little or no text are "Visual".
- Missing, empty or unreadable text is "Unknown".
- Spam, promotions and irrelevant ads are "Spam".

Post content:
"{content}"

Return only the topic label (one or two words) without explanation.
"#;

/// OCR instructions for a single post image
pub const IMAGE_PROMPT: &str = r#"You are an OCR and content extraction engine. Extract all visible information from this image as accurately as possible.
- Capture all text exactly, keeping punctuation, indentation, bullets, numbering and line breaks. Mark cut-off text as [incomplete].
- Extract code blocks exactly, ignoring syntax colouring.
- Represent tables as Markdown tables; keep visible LaTeX, otherwise write equations as plain text.
- Explain diagrams and charts: shapes, connections, flow, axes, values and the overall insight.
- Describe icons, logos and UI elements in words.
- Use Markdown hierarchy (#, ##, -, code fences) and keep the original order.
- Mark unclear handwriting as [unclear], uncertain reconstruction as [?], missing parts as [cut-off].
Give the raw extracted content first, then the structured explanation of visuals. Do not add information that is not visible.
"#;

/// OCR instructions for one page of a document carousel
pub const DOCUMENT_PAGE_PROMPT: &str = r#"You are an OCR engine. Transcribe all text on this document page exactly as printed, preserving reading order, line breaks, lists and tables (as Markdown tables).
Keep code and formulas verbatim. Mark unreadable parts as [unclear]. Output only the transcription.
"#;

/// Analysis instructions for a post video
pub const VIDEO_PROMPT: &str = r#"You are a video analysis and OCR engine. Extract everything visible and audible in this video as accurately as possible.
- Describe each scene chronologically: actions, interactions, transitions and camera changes.
- Extract all visible text (slides, captions, labels, subtitles) keeping line breaks; mark blurry or partial text as [unclear] or [cut-off].
- Capture any code exactly inside code fences.
- Explain diagrams, charts and flowcharts: labels, axes, legends, relationships and key insights.
- Represent tables as Markdown tables; keep visible LaTeX.
- Transcribe spoken words or captions and note relevant background sounds.
- Identify key objects, people's actions and the setting.
Use Markdown: `# Scene` for scenes, `## Extracted Text`, `## Code`, `## Diagram Explanation`.
First give the scene-by-scene description, then the structured extraction. Do not invent information.
"#;

/// Substitutes `{key}` placeholders in `template`
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |acc, (key, value)| {
            acc.replace(&format!("{{{}}}", key), value)
        })
}

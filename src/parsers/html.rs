use crate::parsers::manifest::DocumentConfig;
use crate::parsers::text;
use crate::record::PostSnapshot;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;

/// Selectors tried in order for the post body; the first non-empty one wins
pub const POST_TEXT_SELECTORS: [&str; 9] = [
    "div.feed-shared-update-v2__description",
    "div.update-components-text",
    "span.break-words",
    "div.feed-shared-text",
    "div.feed-shared-inline-show-more-text",
    r#"[data-test-id="main-feed-activity-card"] div.feed-shared-text"#,
    "div.update-components-text.update-components-update-v2__commentary",
    r#"[data-test-id="main-feed-activity-card"] .feed-shared-inline-show-more-text"#,
    "div.feed-shared-update-v2__description-wrapper",
];

const ACTIVITY_CARD: &str = r#"[data-test-id="main-feed-activity-card"]"#;

const IMAGE_SELECTORS: [&str; 4] = [
    "img.feed-shared-image__image",
    r#"img[class*="ivm-view-attr__img"]"#,
    "div.feed-shared-update-v2__content img",
    "div.update-components-image__container img",
];

/// Host serving post media; avatars and icons come from elsewhere
const MEDIA_HOST_MARKER: &str = "media.licdn.com";

const VIDEO_SELECTORS: [&str; 2] = ["video[src]", "video source[src]"];

pub const DOCUMENT_IFRAME: &str = r#"iframe[data-id="feed-paginated-document-content"], iframe[class*="document"], iframe[data-test-id="document-container"]"#;

const DOCUMENT_CONFIG_ATTR: &str = "data-native-document-config";

pub const SAVED_POST_ITEM: &str = "[data-chameleon-result-urn]";

const SAVED_POST_URN_ATTR: &str = "data-chameleon-result-urn";

/// Elements whose boundaries become line breaks in extracted text
const BLOCK_ELEMENTS: [&str; 8] = ["p", "div", "li", "ul", "ol", "h1", "h2", "h3"];

fn compile(selectors: &[&str]) -> Vec<Selector> {
    selectors
        .iter()
        .map(|s| Selector::parse(s).expect("static selector should be valid"))
        .collect()
}

static POST_TEXT: LazyLock<Vec<Selector>> = LazyLock::new(|| compile(&POST_TEXT_SELECTORS));
static ACTIVITY: LazyLock<Selector> = LazyLock::new(|| compile(&[ACTIVITY_CARD]).remove(0));
static IMAGES: LazyLock<Vec<Selector>> = LazyLock::new(|| compile(&IMAGE_SELECTORS));
static VIDEOS: LazyLock<Vec<Selector>> = LazyLock::new(|| compile(&VIDEO_SELECTORS));
static DOCUMENT: LazyLock<Selector> = LazyLock::new(|| compile(&[DOCUMENT_IFRAME]).remove(0));
static SAVED_ITEMS: LazyLock<Selector> = LazyLock::new(|| compile(&[SAVED_POST_ITEM]).remove(0));

/// Text of an element rendered roughly like a browser's `innerText`: source
/// whitespace collapses, block boundaries and `<br>` become line breaks
pub fn inner_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => push_collapsed(&mut out, text),
            Node::Element(el) if el.name() == "br" => out.push('\n'),
            Node::Element(el) if BLOCK_ELEMENTS.contains(&el.name()) => out.push('\n'),
            _ => {}
        }
    }
    text::normalize_post_text(&out)
}

fn push_collapsed(out: &mut String, text: &str) {
    for c in text.chars() {
        if c.is_whitespace() {
            if !out.is_empty() && !out.ends_with(' ') && !out.ends_with('\n') {
                out.push(' ');
            }
        } else {
            out.push(c);
        }
    }
}

/// Extracts the post body using the selector cascade, falling back to the
/// activity card with UI noise removed
pub fn post_text(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);

    for (selector, name) in POST_TEXT.iter().zip(POST_TEXT_SELECTORS.iter()) {
        if let Some(found) = doc
            .select(selector)
            .map(inner_text)
            .find(|text| !text.is_empty())
        {
            ::log::debug!("Text extracted using selector: {}", name);
            return Some(found);
        }
    }

    ::log::debug!("No text selector matched, trying activity card");
    doc.select(&ACTIVITY)
        .next()
        .map(|card| text::strip_ui_lines(&inner_text(card)))
        .filter(|text| !text.is_empty())
}

/// Post media images visible without opening the gallery, deduplicated in page order
pub fn snapshot_image_urls(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let urls = IMAGES
        .iter()
        .flat_map(|selector| doc.select(selector))
        .filter_map(|el| el.value().attr("src"))
        .filter(|src| src.contains(MEDIA_HOST_MARKER));
    dedupe(urls)
}

/// Downloadable video sources, including nested `<source>` elements
pub fn video_sources(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let urls = VIDEOS
        .iter()
        .flat_map(|selector| doc.select(selector))
        .filter_map(|el| el.value().attr("src"))
        .filter(|src| src.starts_with("http://") || src.starts_with("https://"));
    dedupe(urls)
}

/// Manifest URL of an embedded document carousel
pub fn document_manifest_url(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    doc.select(&DOCUMENT)
        .filter_map(|el| el.value().attr(DOCUMENT_CONFIG_ATTR))
        .find_map(DocumentConfig::manifest_url_from_attr)
}

/// URNs of the saved items listing, in page order
pub fn saved_post_urns(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    doc.select(&SAVED_ITEMS)
        .filter_map(|el| el.value().attr(SAVED_POST_URN_ATTR))
        .map(|urn| urn.to_string())
        .collect()
}

/// Everything the snapshot stage needs from one page source
pub fn parse_post_page(html: &str) -> PostSnapshot {
    PostSnapshot {
        text: post_text(html).unwrap_or_default(),
        image_urls: snapshot_image_urls(html),
        video_urls: video_sources(html),
        document_manifest_url: document_manifest_url(html),
    }
}

fn dedupe<'a>(urls: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.filter(|url| seen.insert(*url))
        .map(|url| url.to_string())
        .collect()
}

use crate::parsers::html;

const POST_PAGE: &str = r#"<html><body>
<div data-test-id="main-feed-activity-card">
  <div class="feed-shared-update-v2__description">
    <span>Shipping a new   release today.</span><br>
    <span>Highlights:</span>
    <p>faster builds</p>
  </div>
  <div class="update-components-image__container">
    <img src="https://media.licdn.com/dms/image/one.jpg">
    <img src="https://media.licdn.com/dms/image/two.jpg">
    <img src="https://static.licdn.com/avatar.png">
  </div>
  <img class="feed-shared-image__image" src="https://media.licdn.com/dms/image/one.jpg">
  <video src="https://dms.licdn.com/playlist/vid/a.mp4"></video>
  <video><source src="https://dms.licdn.com/playlist/vid/b.mp4"></video>
  <video src="blob:https://www.linkedin.com/123"></video>
  <iframe data-id="feed-paginated-document-content"
    data-native-document-config='{"doc":{"manifestUrl":"https://media.licdn.com/m?x=1&amp;amp;y=2"}}'></iframe>
</div>
</body></html>"#;

#[cfg(test)]
mod post_page_tests {
    use super::*;

    #[test]
    fn test_post_text_uses_first_selector() {
        let text = html::post_text(POST_PAGE).unwrap();
        assert_eq!(text, "Shipping a new release today.\nHighlights:\nfaster builds");
    }

    #[test]
    fn test_post_text_falls_back_to_activity_card() {
        let page = r#"<html><body><div data-test-id="main-feed-activity-card">
            <div>Like</div><div>Comment</div>
            <div>A long enough sentence about Rust.</div>
            <div>Follow</div>
        </div></body></html>"#;
        assert_eq!(
            html::post_text(page).as_deref(),
            Some("A long enough sentence about Rust.")
        );
    }

    #[test]
    fn test_post_text_none_when_nothing_matches() {
        assert_eq!(html::post_text("<html><body><p>unrelated</p></body></html>"), None);
    }

    #[test]
    fn test_snapshot_images_deduplicated_and_filtered() {
        assert_eq!(
            html::snapshot_image_urls(POST_PAGE),
            vec![
                "https://media.licdn.com/dms/image/one.jpg".to_string(),
                "https://media.licdn.com/dms/image/two.jpg".to_string(),
            ]
        );
    }

    #[test]
    fn test_video_sources_skip_blobs() {
        assert_eq!(
            html::video_sources(POST_PAGE),
            vec![
                "https://dms.licdn.com/playlist/vid/a.mp4".to_string(),
                "https://dms.licdn.com/playlist/vid/b.mp4".to_string(),
            ]
        );
    }

    #[test]
    fn test_document_manifest_url() {
        assert_eq!(
            html::document_manifest_url(POST_PAGE).as_deref(),
            Some("https://media.licdn.com/m?x=1&y=2")
        );
        assert_eq!(html::document_manifest_url("<html></html>"), None);
    }

    #[test]
    fn test_parse_post_page() {
        let snapshot = html::parse_post_page(POST_PAGE);
        assert!(snapshot.text.starts_with("Shipping"));
        assert_eq!(snapshot.image_urls.len(), 2);
        assert_eq!(snapshot.video_urls.len(), 2);
        assert!(snapshot.document_manifest_url.is_some());
    }
}

#[cfg(test)]
mod saved_posts_tests {
    use super::*;

    #[test]
    fn test_saved_post_urns_in_order() {
        let page = r#"<ul>
            <li data-chameleon-result-urn="urn:li:activity:1"></li>
            <li data-chameleon-result-urn="urn:li:article:2"></li>
            <li data-chameleon-result-urn="urn:li:activity:3"></li>
        </ul>"#;
        assert_eq!(
            html::saved_post_urns(page),
            vec!["urn:li:activity:1", "urn:li:article:2", "urn:li:activity:3"]
        );
    }
}

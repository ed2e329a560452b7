use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// One unit of work: a post to extract and summarize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Caller-chosen identifier (numbers are accepted and kept as text)
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,

    /// Public URL of the post
    pub url: String,
}

impl Post {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(n) => n.to_string(),
    })
}

/// Login credentials for the social network.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An entry of the saved-items listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPost {
    pub id: u32,
    pub urn: String,
    pub url: String,
}

/// Classification of one saved post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub id: u32,
    pub urn: String,
    pub url: String,
    /// Post text truncated for display
    pub description: String,
    pub topic: String,
}

/// Classification results grouped by topic, in first-seen topic order.
pub type TopicGroups = IndexMap<String, Vec<ClassificationResult>>;

/// Everything visible on a post page after a single visit.
///
/// Written by the snapshot stage of the extended pipeline; the content stages
/// fall back to it when their own lookup comes back empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSnapshot {
    pub text: String,
    pub image_urls: Vec<String>,
    pub video_urls: Vec<String>,
    pub document_manifest_url: Option<String>,
}

impl PostSnapshot {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
            && self.image_urls.is_empty()
            && self.video_urls.is_empty()
            && self.document_manifest_url.is_none()
    }
}

/// Field of [`ExtractionRecord`] owned by a single stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordField {
    SavedPosts,
    ClassifiedPosts,
    Snapshot,
    Text,
    Images,
    Documents,
    Videos,
}

impl RecordField {
    /// The empty form written when the owning stage fails.
    pub fn empty(self) -> FieldValue {
        match self {
            RecordField::SavedPosts => FieldValue::SavedPosts(Vec::new()),
            RecordField::ClassifiedPosts => FieldValue::ClassifiedPosts(TopicGroups::new()),
            RecordField::Snapshot => FieldValue::Snapshot(PostSnapshot::default()),
            RecordField::Text => FieldValue::Text(String::new()),
            RecordField::Images => FieldValue::Images(Vec::new()),
            RecordField::Documents => FieldValue::Documents(String::new()),
            RecordField::Videos => FieldValue::Videos(Vec::new()),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RecordField::SavedPosts => "saved posts",
            RecordField::ClassifiedPosts => "classified posts",
            RecordField::Snapshot => "post snapshot",
            RecordField::Text => "text",
            RecordField::Images => "images",
            RecordField::Documents => "documents",
            RecordField::Videos => "videos",
        }
    }
}

/// Value produced by a stage for its field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    SavedPosts(Vec<SavedPost>),
    ClassifiedPosts(TopicGroups),
    Snapshot(PostSnapshot),
    Text(String),
    Images(Vec<String>),
    Documents(String),
    Videos(Vec<String>),
}

impl FieldValue {
    pub fn field(&self) -> RecordField {
        match self {
            FieldValue::SavedPosts(_) => RecordField::SavedPosts,
            FieldValue::ClassifiedPosts(_) => RecordField::ClassifiedPosts,
            FieldValue::Snapshot(_) => RecordField::Snapshot,
            FieldValue::Text(_) => RecordField::Text,
            FieldValue::Images(_) => RecordField::Images,
            FieldValue::Documents(_) => RecordField::Documents,
            FieldValue::Videos(_) => RecordField::Videos,
        }
    }

    /// Number of items carried; a non-blank string counts as one.
    pub fn item_count(&self) -> usize {
        match self {
            FieldValue::SavedPosts(posts) => posts.len(),
            FieldValue::ClassifiedPosts(groups) => groups.values().map(Vec::len).sum(),
            FieldValue::Snapshot(snapshot) => usize::from(!snapshot.is_empty()),
            FieldValue::Text(text) | FieldValue::Documents(text) => {
                usize::from(!text.trim().is_empty())
            }
            FieldValue::Images(items) | FieldValue::Videos(items) => items.len(),
        }
    }
}

/// Per-post state threaded through the pipeline.
///
/// Every field starts in its empty form, and each stage overwrites exactly
/// one field, so nothing is ever left unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionRecord {
    pub url: String,
    pub email: String,
    pub password: String,
    pub saved_posts: Vec<SavedPost>,
    pub classified_posts: TopicGroups,
    pub snapshot: PostSnapshot,
    pub text: String,
    pub images: Vec<String>,
    pub documents: String,
    pub videos: Vec<String>,
}

impl ExtractionRecord {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_credentials(mut self, credentials: Option<&Credentials>) -> Self {
        if let Some(credentials) = credentials {
            self.email = credentials.email.clone();
            self.password = credentials.password.clone();
        }
        self
    }

    /// Credentials, if both email and password are present.
    pub fn credentials(&self) -> Option<Credentials> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            None
        } else {
            Some(Credentials::new(self.email.clone(), self.password.clone()))
        }
    }

    /// Stores a stage result in the field it belongs to.
    pub fn write(&mut self, value: FieldValue) {
        match value {
            FieldValue::SavedPosts(posts) => self.saved_posts = posts,
            FieldValue::ClassifiedPosts(groups) => self.classified_posts = groups,
            FieldValue::Snapshot(snapshot) => self.snapshot = snapshot,
            FieldValue::Text(text) => self.text = text,
            FieldValue::Images(images) => self.images = images,
            FieldValue::Documents(documents) => self.documents = documents,
            FieldValue::Videos(videos) => self.videos = videos,
        }
    }
}

/// Notes produced for one post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotesArtifact {
    pub post_id: String,
    pub notes: String,
}

impl NotesArtifact {
    pub fn new(post_id: impl Into<String>, notes: impl Into<String>) -> Self {
        Self {
            post_id: post_id.into(),
            notes: notes.into(),
        }
    }
}

impl fmt::Display for NotesArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "# Post {} Notes\n{}", self.post_id, self.notes)
    }
}

/// Joins per-post notes, in the given order, into the combined document.
pub fn combine_notes(artifacts: &[NotesArtifact]) -> String {
    artifacts
        .iter()
        .map(NotesArtifact::to_string)
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_id_accepts_numbers() {
        let posts: Vec<Post> =
            serde_json::from_str(r#"[{"id": 1, "url": "a"}, {"id": "x7", "url": "b"}]"#).unwrap();
        assert_eq!(posts[0].id, "1");
        assert_eq!(posts[1].id, "x7");
    }

    #[test]
    fn test_new_record_is_empty() {
        let record = ExtractionRecord::new("https://example.com/post");
        assert_eq!(record.text, "");
        assert!(record.images.is_empty());
        assert_eq!(record.documents, "");
        assert!(record.videos.is_empty());
        assert!(record.saved_posts.is_empty());
        assert!(record.classified_posts.is_empty());
        assert!(record.snapshot.is_empty());
        assert!(record.credentials().is_none());
    }

    #[test]
    fn test_write_targets_matching_field() {
        let mut record = ExtractionRecord::new("u");
        record.write(FieldValue::Images(vec!["a".into()]));
        record.write(FieldValue::Documents("doc".into()));
        assert_eq!(record.images, vec!["a".to_string()]);
        assert_eq!(record.documents, "doc");
        assert_eq!(record.text, "");
    }

    #[test]
    fn test_empty_matches_field() {
        for field in [
            RecordField::SavedPosts,
            RecordField::ClassifiedPosts,
            RecordField::Snapshot,
            RecordField::Text,
            RecordField::Images,
            RecordField::Documents,
            RecordField::Videos,
        ] {
            let empty = field.empty();
            assert_eq!(empty.field(), field);
            assert_eq!(empty.item_count(), 0);
        }
    }

    #[test]
    fn test_credentials_require_both_parts() {
        let record = ExtractionRecord::new("u").with_credentials(Some(&Credentials::new("a@b.c", "")));
        assert!(record.credentials().is_none());

        let record =
            ExtractionRecord::new("u").with_credentials(Some(&Credentials::new("a@b.c", "pw")));
        assert_eq!(record.credentials().unwrap().email, "a@b.c");
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let debug = format!("{:?}", Credentials::new("a@b.c", "hunter2"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_combine_notes_keeps_order() {
        let combined = combine_notes(&[
            NotesArtifact::new("1", "first"),
            NotesArtifact::new("2", "second"),
        ]);
        assert_eq!(combined, "# Post 1 Notes\nfirst\n\n# Post 2 Notes\nsecond");
    }
}

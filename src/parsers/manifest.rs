//! Document carousel manifests.
//!
//! A document post embeds a JSON config pointing at a manifest; the manifest
//! lists one image manifest per resolution, and the image manifest lists the
//! page images.

use serde::Deserialize;

/// Config stored in the document iframe's `data-native-document-config`
#[derive(Debug, Default, Deserialize)]
pub struct DocumentConfig {
    #[serde(default)]
    pub doc: DocumentRef,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRef {
    pub manifest_url: Option<String>,
}

impl DocumentConfig {
    /// Manifest URL from the raw attribute value, with leftover `&amp;` unescaped
    pub fn manifest_url_from_attr(raw: &str) -> Option<String> {
        let config: DocumentConfig = match serde_json::from_str(raw) {
            Ok(config) => config,
            Err(e) => {
                ::log::warn!("Failed to parse document config: {}", e);
                return None;
            }
        };
        config
            .doc
            .manifest_url
            .filter(|url| !url.trim().is_empty())
            .map(|url| url.replace("&amp;", "&"))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentManifest {
    #[serde(default)]
    pub per_resolutions: Vec<Resolution>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    #[serde(default)]
    pub width: u32,
    pub image_manifest_url: Option<String>,
}

impl DocumentManifest {
    /// Image manifest of the widest resolution that has one
    pub fn best_image_manifest_url(&self) -> Option<&str> {
        self.per_resolutions
            .iter()
            .filter(|resolution| resolution.image_manifest_url.is_some())
            .max_by_key(|resolution| resolution.width)
            .and_then(|resolution| resolution.image_manifest_url.as_deref())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ImageManifest {
    #[serde(default)]
    pub pages: Vec<String>,
}

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Base used when turning an activity URN into a post URL
pub const POST_URL_BASE: &str = "https://www.linkedin.com/feed/update/";

/// Configuration for deciding which URLs are accepted as posts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostUrlFilterConfig {
    /// Domains accepted as post hosts (subdomains included)
    #[serde(default = "default_allowed_domains")]
    pub allowed_domains: Vec<String>,

    /// Regex patterns the URL path must match (if empty, every path is accepted)
    #[serde(default = "default_include_patterns")]
    pub include_patterns: Vec<String>,

    /// Regex patterns that reject a URL (these take precedence over include patterns)
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

fn default_allowed_domains() -> Vec<String> {
    vec!["linkedin.com".to_string()]
}

fn default_include_patterns() -> Vec<String> {
    vec![
        r"^/feed/update/urn:li:[a-zA-Z]+:\d+".to_string(),
        r"^/posts/".to_string(),
    ]
}

impl Default for PostUrlFilterConfig {
    fn default() -> Self {
        Self {
            allowed_domains: default_allowed_domains(),
            include_patterns: default_include_patterns(),
            exclude_patterns: Vec::new(),
        }
    }
}

/// Validates and normalizes post URLs before they enter the pipeline
#[derive(Debug)]
pub struct PostUrlFilter {
    config: PostUrlFilterConfig,
    include_regexes: Vec<Regex>,
    exclude_regexes: Vec<Regex>,
}

impl Default for PostUrlFilter {
    fn default() -> Self {
        Self::new(PostUrlFilterConfig::default()).expect("Default regex patterns should be valid")
    }
}

impl PostUrlFilter {
    /// Create a new URL filter from configuration
    pub fn new(config: PostUrlFilterConfig) -> Result<Self, regex::Error> {
        let include_regexes = config
            .include_patterns
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;
        let exclude_regexes = config
            .exclude_patterns
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            config,
            include_regexes,
            exclude_regexes,
        })
    }

    /// Parse and check a post URL, returning its normalized form
    pub fn accept(&self, raw: &str) -> Option<Url> {
        let url = Url::parse(raw.trim()).ok()?;
        if self.is_post_url(&url) {
            Some(self.normalize_url(&url))
        } else {
            ::log::debug!("URL filter rejected: {}", raw);
            None
        }
    }

    /// Determine if a URL points at a post according to all filtering rules
    pub fn is_post_url(&self, url: &Url) -> bool {
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }

        if !self.is_in_domain_scope(url) {
            return false;
        }

        let path = url.path();
        if self.exclude_regexes.iter().any(|regex| regex.is_match(path)) {
            return false;
        }

        self.include_regexes.is_empty() || self.include_regexes.iter().any(|regex| regex.is_match(path))
    }

    fn is_in_domain_scope(&self, url: &Url) -> bool {
        let Some(host) = url.domain() else {
            return false;
        };
        self.config.allowed_domains.iter().any(|domain| {
            host == domain || host.ends_with(&format!(".{}", domain))
        })
    }

    /// Create a normalized version of the URL (query and fragment removed)
    pub fn normalize_url(&self, url: &Url) -> Url {
        let mut normalized = url.clone();
        normalized.set_query(None);
        normalized.set_fragment(None);
        normalized
    }
}

/// Builds the post URL for a saved-item URN; only activity URNs have one
pub fn url_for_urn(urn: &str) -> Option<String> {
    if urn.contains("urn:li:activity") {
        Some(format!("{}{}/", POST_URL_BASE, urn))
    } else {
        None
    }
}

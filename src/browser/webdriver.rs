use crate::browser::session::{BrowserSession, CookieSessionStore, SessionCookie};
use crate::browser::{GalleryStep, GalleryWalk, PostBrowser};
use crate::config::AppConfig;
use crate::error::BrowserError;
use crate::filter::url_for_urn;
use crate::parsers::html;
use crate::parsers::manifest::{DocumentManifest, ImageManifest};
use crate::record::{Credentials, PostSnapshot, SavedPost};
use async_trait::async_trait;
use fantoccini::cookies::Cookie;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use std::time::Duration;
use url::Url;

const SITE_ROOT: &str = "https://www.linkedin.com/";
const LOGIN_URL: &str = "https://www.linkedin.com/login";
const SAVED_POSTS_URL: &str = "https://www.linkedin.com/my-items/saved-posts/";

const USERNAME_INPUT: &str = "input#username";
const PASSWORD_INPUT: &str = "input#password";
const SUBMIT_BUTTON: &str = "button[type='submit']";
const SEE_MORE_BUTTON: &str = "button.feed-shared-inline-show-more-text__see-more-less-toggle";
const IMAGE_OVERLAY: &str = "div.update-components-image__container span";
const IMAGE_PREVIEW: &str = "div.update-components-image__container img";
const VIEWER_IMAGE: &str = "img.feed-shared-image-viewer__image";
const VIEWER_NEXT: &str = "button.feed-shared-image-viewer__view-image-button--next";
const PLAY_BUTTON: &str = "button.vjs-big-play-button";

const SAVED_POSTS_SCROLLS: usize = 10;
const SAVED_POSTS_WAIT: Duration = Duration::from_secs(60);
const DOCUMENT_WAIT: Duration = Duration::from_secs(5);
const PLAY_BUTTON_WAIT: Duration = Duration::from_secs(10);
const VIDEO_LOAD_WAIT: Duration = Duration::from_secs(3);
const VIEWER_STEP_WAIT: Duration = Duration::from_secs(2);

/// Alternative WebDriver endpoints tried after the configured one
const FALLBACK_WEBDRIVER_URLS: [&str; 4] = [
    "http://localhost:9515", // ChromeDriver default
    "http://localhost:4723", // Appium default
    "http://localhost:9222", // Chrome debug port default
    "http://127.0.0.1:4444", // Try with IP instead of localhost
];

/// [`PostBrowser`] backed by a WebDriver server.
///
/// Each call opens its own WebDriver session, restores the saved cookies (or
/// logs in when there are none), does its work and closes the session.
pub struct WebDriverBrowser {
    webdriver_url: String,
    headless: bool,
    page_settle: Duration,
    max_gallery_images: usize,
    session: CookieSessionStore,
    http_client: reqwest::Client,
}

impl WebDriverBrowser {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            headless: config.headless,
            page_settle: config.page_settle(),
            max_gallery_images: config.max_gallery_images,
            session: CookieSessionStore::new(config.session_file.clone()),
            http_client: reqwest::Client::new(),
        }
    }

    fn capabilities(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut args = vec!["--no-sandbox", "--disable-dev-shm-usage", "--window-size=1280,2000"];
        if self.headless {
            args.push("--headless=new");
        }

        let mut caps = serde_json::Map::new();
        caps.insert(
            "goog:chromeOptions".to_string(),
            serde_json::json!({ "args": args }),
        );
        caps
    }

    /// Connects to the configured WebDriver instance, then to common alternatives
    async fn connect(&self) -> Result<Client, BrowserError> {
        let mut builder = ClientBuilder::native();
        builder.capabilities(self.capabilities());

        match builder.connect(&self.webdriver_url).await {
            Ok(client) => {
                ::log::debug!("Connected to WebDriver at {}", self.webdriver_url);
                return Ok(client);
            }
            Err(e) => {
                ::log::error!(
                    "Failed to connect to WebDriver at {}: {}",
                    self.webdriver_url,
                    e
                );
            }
        }

        for url in FALLBACK_WEBDRIVER_URLS.iter() {
            if *url == self.webdriver_url {
                continue;
            }

            ::log::info!("Trying fallback WebDriver URL: {}", url);
            if let Ok(client) = builder.connect(url).await {
                ::log::debug!("Connected to fallback WebDriver at {}", url);
                return Ok(client);
            }
        }

        ::log::error!(
            "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
        );
        Err(BrowserError::Connect(
            std::iter::once(self.webdriver_url.as_str())
                .chain(FALLBACK_WEBDRIVER_URLS)
                .collect::<Vec<_>>()
                .join(", "),
        ))
    }

    /// Opens a WebDriver session that is authenticated if possible
    async fn open(&self, credentials: Option<&Credentials>) -> Result<Client, BrowserError> {
        let client = self.connect().await?;

        let outcome = match self.session.load().await {
            Ok(Some(saved)) => restore_cookies(&client, &saved).await,
            Ok(None) => match credentials {
                Some(credentials) => login(&client, credentials, self.page_settle).await,
                None => {
                    ::log::debug!("No saved session or credentials, browsing anonymously");
                    Ok(())
                }
            },
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => Ok(client),
            Err(e) => {
                close_client(client).await;
                Err(e)
            }
        }
    }

    /// Opens `url` in an authenticated session and waits for it to settle
    async fn open_post(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Client, BrowserError> {
        let parsed = Url::parse(url).map_err(|_| BrowserError::InvalidUrl(url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(BrowserError::InvalidUrl(url.to_string()));
        }

        let client = self.open(credentials).await?;
        if let Err(e) = client.goto(url).await {
            let err = navigation_error(e, "accessing", url);
            close_client(client).await;
            return Err(err);
        }
        tokio::time::sleep(self.page_settle).await;
        Ok(client)
    }

    async fn read_post_text(&self, client: &Client, url: &str) -> Result<String, BrowserError> {
        expand_see_more(client).await;
        let source = page_source(client, url).await?;
        Ok(html::post_text(&source).unwrap_or_default())
    }

    async fn walk_gallery(&self, client: &Client) -> Result<Vec<String>, BrowserError> {
        let opener = match client.find(Locator::Css(IMAGE_OVERLAY)).await {
            Ok(overlay) => overlay,
            Err(_) => match client.find(Locator::Css(IMAGE_PREVIEW)).await {
                Ok(preview) => preview,
                Err(_) => {
                    ::log::debug!("No image overlay or preview found");
                    return Ok(Vec::new());
                }
            },
        };
        opener
            .click()
            .await
            .map_err(|e| BrowserError::command("opening the image viewer", e))?;
        tokio::time::sleep(VIEWER_STEP_WAIT).await;

        let mut walk = GalleryWalk::new(self.max_gallery_images);
        loop {
            let Ok(image) = client.find(Locator::Css(VIEWER_IMAGE)).await else {
                break;
            };
            if let Some(src) = image
                .attr("src")
                .await
                .map_err(|e| BrowserError::command("reading a viewer image", e))?
            {
                if walk.visit(&src) == GalleryStep::Stop {
                    break;
                }
            }

            let Ok(next) = client.find(Locator::Css(VIEWER_NEXT)).await else {
                break;
            };
            next.click()
                .await
                .map_err(|e| BrowserError::command("advancing the image viewer", e))?;
            tokio::time::sleep(VIEWER_STEP_WAIT).await;
        }

        Ok(walk.into_urls())
    }

    async fn read_manifest_url(
        &self,
        client: &Client,
        url: &str,
    ) -> Result<Option<String>, BrowserError> {
        if client
            .wait()
            .at_most(DOCUMENT_WAIT)
            .for_element(Locator::Css(html::DOCUMENT_IFRAME))
            .await
            .is_err()
        {
            ::log::debug!("No document iframe on {}", url);
            return Ok(None);
        }
        let source = page_source(client, url).await?;
        Ok(html::document_manifest_url(&source))
    }

    async fn read_video_sources(&self, client: &Client, url: &str) -> Result<Vec<String>, BrowserError> {
        match client
            .wait()
            .at_most(PLAY_BUTTON_WAIT)
            .for_element(Locator::Css(PLAY_BUTTON))
            .await
        {
            Ok(button) => {
                if let Err(e) = button.click().await {
                    ::log::debug!("Play button did not respond: {}", e);
                }
            }
            Err(_) => ::log::debug!("No play button on {}", url),
        }
        tokio::time::sleep(VIDEO_LOAD_WAIT).await;

        let source = page_source(client, url).await?;
        Ok(html::video_sources(&source))
    }

    async fn read_snapshot(&self, client: &Client, url: &str) -> Result<PostSnapshot, BrowserError> {
        expand_see_more(client).await;
        let source = page_source(client, url).await?;
        Ok(html::parse_post_page(&source))
    }

    async fn read_saved_posts(&self, client: &Client) -> Result<Vec<SavedPost>, BrowserError> {
        client
            .goto(SAVED_POSTS_URL)
            .await
            .map_err(|e| navigation_error(e, "opening", SAVED_POSTS_URL))?;
        client
            .wait()
            .at_most(SAVED_POSTS_WAIT)
            .for_element(Locator::Css(html::SAVED_POST_ITEM))
            .await
            .map_err(|e| BrowserError::command("waiting for saved posts", e))?;

        for _ in 0..SAVED_POSTS_SCROLLS {
            client
                .execute("window.scrollBy(0, 3000);", vec![])
                .await
                .map_err(|e| BrowserError::command("scrolling saved posts", e))?;
            tokio::time::sleep(self.page_settle).await;
        }

        let source = page_source(client, SAVED_POSTS_URL).await?;
        let posts: Vec<SavedPost> = html::saved_post_urns(&source)
            .into_iter()
            .enumerate()
            .map(|(i, urn)| SavedPost {
                id: (i + 1) as u32,
                url: url_for_urn(&urn).unwrap_or_default(),
                urn,
            })
            .collect();

        ::log::info!("Found {} saved posts", posts.len());
        Ok(posts)
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, BrowserError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| BrowserError::command("fetching the document manifest", e))?;
        response
            .json()
            .await
            .map_err(|e| BrowserError::command("parsing the document manifest", e))
    }
}

#[async_trait]
impl PostBrowser for WebDriverBrowser {
    async fn prepare_session(&self, credentials: Option<&Credentials>) -> Result<(), BrowserError> {
        if self.session.load().await?.is_some() {
            ::log::info!("Using saved session from {}", self.session.path().display());
            return Ok(());
        }
        let Some(credentials) = credentials else {
            ::log::info!("No saved session and no credentials; pages are opened logged out");
            return Ok(());
        };

        let client = self.connect().await?;
        let result = async {
            login(&client, credentials, self.page_settle).await?;
            let cookies = client
                .get_all_cookies()
                .await
                .map_err(|e| BrowserError::command("reading cookies", e))?;
            let session = BrowserSession::new(cookies.iter().map(session_cookie).collect());
            self.session.save_if_absent(&session).await.map(|_| ())
        }
        .await;
        close_client(client).await;
        result
    }

    async fn post_text(&self, url: &str, credentials: Option<&Credentials>) -> Result<String, BrowserError> {
        let client = self.open_post(url, credentials).await?;
        let result = self.read_post_text(&client, url).await;
        close_client(client).await;
        result
    }

    async fn image_urls(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Vec<String>, BrowserError> {
        let client = self.open_post(url, credentials).await?;
        let result = self.walk_gallery(&client).await;
        close_client(client).await;
        result
    }

    async fn document_manifest_url(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Option<String>, BrowserError> {
        let client = self.open_post(url, credentials).await?;
        let result = self.read_manifest_url(&client, url).await;
        close_client(client).await;
        result
    }

    async fn document_pages(&self, manifest_url: &str) -> Result<Vec<String>, BrowserError> {
        let manifest: DocumentManifest = self.fetch_json(manifest_url).await?;
        let Some(image_manifest_url) = manifest.best_image_manifest_url() else {
            ::log::debug!("Document manifest lists no image resolutions");
            return Ok(Vec::new());
        };
        let pages: ImageManifest = self.fetch_json(image_manifest_url).await?;
        Ok(pages.pages)
    }

    async fn video_sources(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Vec<String>, BrowserError> {
        let client = self.open_post(url, credentials).await?;
        let result = self.read_video_sources(&client, url).await;
        close_client(client).await;
        result
    }

    async fn snapshot(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<PostSnapshot, BrowserError> {
        let client = self.open_post(url, credentials).await?;
        let result = self.read_snapshot(&client, url).await;
        close_client(client).await;
        result
    }

    async fn saved_posts(&self, credentials: &Credentials) -> Result<Vec<SavedPost>, BrowserError> {
        if credentials.email.trim().is_empty() || credentials.password.is_empty() {
            return Err(BrowserError::MissingCredentials);
        }
        let client = self.open(Some(credentials)).await?;
        let result = self.read_saved_posts(&client).await;
        close_client(client).await;
        result
    }
}

/// Fills the login form and waits for the redirect
async fn login(client: &Client, credentials: &Credentials, settle: Duration) -> Result<(), BrowserError> {
    ::log::info!("Logging in as {}", credentials.email);

    client
        .goto(LOGIN_URL)
        .await
        .map_err(|e| navigation_error(e, "opening", LOGIN_URL))?;

    let username = client
        .wait()
        .at_most(Duration::from_secs(60))
        .for_element(Locator::Css(USERNAME_INPUT))
        .await
        .map_err(|e| BrowserError::Login(format!("login form not found: {}", e)))?;
    username
        .send_keys(&credentials.email)
        .await
        .map_err(|e| BrowserError::command("typing the email", e))?;

    client
        .find(Locator::Css(PASSWORD_INPUT))
        .await
        .map_err(|e| BrowserError::Login(format!("password field not found: {}", e)))?
        .send_keys(&credentials.password)
        .await
        .map_err(|e| BrowserError::command("typing the password", e))?;

    client
        .find(Locator::Css(SUBMIT_BUTTON))
        .await
        .map_err(|e| BrowserError::command("finding the sign-in button", e))?
        .click()
        .await
        .map_err(|e| BrowserError::command("submitting the login form", e))?;

    tokio::time::sleep(settle).await;

    let landed = client
        .current_url()
        .await
        .map_err(|e| BrowserError::command("reading the URL after login", e))?;
    if landed.path().starts_with("/login") {
        return Err(BrowserError::Login("still on the login page".to_string()));
    }
    if landed.path().contains("checkpoint") {
        ::log::warn!("Login landed on a checkpoint page; verification may be required");
    } else {
        ::log::info!("Logged in");
    }
    Ok(())
}

async fn restore_cookies(client: &Client, session: &BrowserSession) -> Result<(), BrowserError> {
    // Cookies can only be set for the domain currently loaded
    client
        .goto(SITE_ROOT)
        .await
        .map_err(|e| navigation_error(e, "opening", SITE_ROOT))?;

    for saved in &session.cookies {
        if let Err(e) = client.add_cookie(driver_cookie(saved)).await {
            ::log::debug!("Skipping cookie {}: {}", saved.name, e);
        }
    }
    ::log::debug!("Restored {} cookies", session.cookies.len());
    Ok(())
}

fn session_cookie(cookie: &Cookie<'static>) -> SessionCookie {
    SessionCookie {
        name: cookie.name().to_string(),
        value: cookie.value().to_string(),
        domain: cookie.domain().map(str::to_string),
        path: cookie.path().map(str::to_string),
        secure: cookie.secure().unwrap_or(false),
        http_only: cookie.http_only().unwrap_or(false),
    }
}

fn driver_cookie(saved: &SessionCookie) -> Cookie<'static> {
    let mut cookie = Cookie::new(saved.name.clone(), saved.value.clone());
    if let Some(domain) = &saved.domain {
        cookie.set_domain(domain.clone());
    }
    if let Some(path) = &saved.path {
        cookie.set_path(path.clone());
    }
    cookie.set_secure(saved.secure);
    cookie.set_http_only(saved.http_only);
    cookie
}

async fn expand_see_more(client: &Client) {
    if let Ok(button) = client.find(Locator::Css(SEE_MORE_BUTTON)).await {
        match button.click().await {
            Ok(()) => ::log::debug!("Expanded 'see more' text"),
            Err(e) => ::log::debug!("Could not expand 'see more': {}", e),
        }
    }
}

async fn page_source(client: &Client, url: &str) -> Result<String, BrowserError> {
    client
        .source()
        .await
        .map_err(|e| navigation_error(e, "getting source for", url))
}

async fn close_client(client: Client) {
    if let Err(e) = client.close().await {
        ::log::warn!("Failed to close WebDriver session: {}", e);
    }
}

/// Logs a navigation failure and converts it
fn navigation_error(error: CmdError, context: &str, url: &str) -> BrowserError {
    if error.to_string().contains("Unable to find session") {
        ::log::warn!("Lost WebDriver session while {} {}", context, url);
    } else {
        ::log::error!("Failed {} {}: {}", context, url, error);
    }
    BrowserError::command(&format!("{} {}", context, url), error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_conversion_keeps_attributes() {
        let saved = SessionCookie {
            name: "li_at".to_string(),
            value: "token".to_string(),
            domain: Some("www.linkedin.com".to_string()),
            path: Some("/".to_string()),
            secure: true,
            http_only: true,
        };
        let cookie = driver_cookie(&saved);
        assert_eq!(session_cookie(&cookie), saved);
    }

    #[test]
    fn test_headless_capabilities() {
        let browser = WebDriverBrowser::from_config(&AppConfig::default());
        let caps = browser.capabilities();
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(args.iter().any(|arg| arg == "--headless=new"));
    }

    #[tokio::test]
    async fn test_invalid_post_url_rejected_before_connecting() {
        let browser = WebDriverBrowser::from_config(&AppConfig::default());
        let result = browser.post_text("file:///etc/passwd", None).await;
        assert!(matches!(result, Err(BrowserError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_saved_posts_require_credentials() {
        let browser = WebDriverBrowser::from_config(&AppConfig::default());
        let result = browser.saved_posts(&Credentials::new("", "")).await;
        assert!(matches!(result, Err(BrowserError::MissingCredentials)));
    }
}

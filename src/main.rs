use clap::Parser;
use post_notes::{App, BatchOutput};
use post_notes::browser::PostBrowser;
use post_notes::classify::group_by_topic;
use post_notes::config::AppConfig;
use post_notes::error::{BrowserError, Error, Result};
use post_notes::export::FileExporter;
use post_notes::record::{Credentials, Post, SavedPost};
use std::io::Write;
use std::path::{Path, PathBuf};

mod args;
use args::{Args, Command, LoginArgs};

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();

    let app = match args.config.as_deref() {
        Some(path) => match App::with_config_file(path) {
            Ok(app) => app,
            Err(e) => {
                ::log::error!("Failed to load configuration: {}", e);
                std::process::exit(1);
            }
        },
        None => App::new(AppConfig::default().with_env_overrides()),
    };

    if !matches!(args.command, Command::Serve { .. }) {
        println!("Note: post extraction requires a WebDriver server (e.g., ChromeDriver).");
        println!(
            "Set WEBDRIVER_URL if not using {}",
            app.config().webdriver_url
        );
    }

    let start_time = std::time::Instant::now();
    if let Err(e) = run(app, args.command).await {
        ::log::error!("{}", e);
        std::process::exit(1);
    }
    ::log::info!("Done in {:.2} seconds", start_time.elapsed().as_secs_f64());
}

async fn run(app: App, command: Command) -> Result<()> {
    match command {
        Command::Notes {
            urls,
            posts,
            output,
            login,
            concurrency,
        } => {
            let posts = match posts {
                Some(path) => load_posts(&path)?,
                None => urls
                    .into_iter()
                    .enumerate()
                    .map(|(i, url)| Post::new((i + 1).to_string(), url))
                    .collect(),
            };
            if posts.is_empty() {
                return Err(Error::Config("no posts given".to_string()));
            }
            let posts = validate_posts(&app, posts)?;

            let app = match concurrency {
                Some(n) => app.with_max_concurrency(n),
                None => app,
            };
            let result = app
                .batch_driver(false)
                .run(&posts, login.credentials().as_ref(), output.format, &output.filename)
                .await;
            let count = result.artifacts.len();
            let path = exported_path(result, &mut std::io::stdout())?;
            println!("Wrote notes for {} post(s) to {}", count, path.display());
        }
        Command::Saved { login } => {
            let credentials = require_credentials(&login)?;
            let saved = scrape_saved(&app, &credentials).await?;
            let path = app.exporter().save_saved_posts(&saved, "saved_posts")?;
            println!("Saved {} post(s) to {}", saved.len(), path.display());
        }
        Command::Classify { saved, login } => {
            let credentials = login.credentials();
            let saved = match saved {
                Some(path) => FileExporter::load_saved_posts(&path)?,
                None => {
                    let credentials = require_credentials(&login)?;
                    scrape_saved(&app, &credentials).await?
                }
            };

            let results = app
                .classifier()
                .classify_all(&saved, credentials.as_ref())
                .await;
            let exporter = app.exporter();
            let rows = exporter.save_classified(&results, "classified_posts")?;
            let groups = group_by_topic(results);
            let topics = groups.len();
            let sheets = exporter.save_grouped(&groups, "grouped_posts")?;
            println!(
                "Classified {} post(s) into {} topic(s): {}, {}",
                saved.len(),
                topics,
                rows.display(),
                sheets.display()
            );
        }
        Command::Extended { url, output, login } => {
            let credentials = require_credentials(&login)?;
            let posts = validate_posts(&app, vec![Post::new("1", url)])?;
            let result = app
                .batch_driver(true)
                .run(&posts, Some(&credentials), output.format, &output.filename)
                .await;
            let path = exported_path(result, &mut std::io::stdout())?;
            println!("Wrote notes to {}", path.display());
        }
        Command::Serve { bind } => {
            let bind_addr = bind.unwrap_or_else(|| app.config().bind_addr.clone());
            post_notes::server::serve(&app, &bind_addr).await?;
        }
    }
    Ok(())
}

/// The written file, or the combined notes printed to `out` when writing failed
fn exported_path(result: BatchOutput, out: &mut impl Write) -> Result<PathBuf> {
    match result.export {
        Ok(path) => Ok(path),
        Err(e) => {
            ::log::error!("Could not write notes ({}); printing them instead", e);
            writeln!(out, "{}", result.combined)?;
            Err(e.into())
        }
    }
}

fn load_posts(path: &Path) -> Result<Vec<Post>> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| Error::Config(format!("invalid posts file {}: {}", path.display(), e)))
}

/// Normalizes every URL, failing on the first one that is not a post
fn validate_posts(app: &App, posts: Vec<Post>) -> Result<Vec<Post>> {
    let filter = app.url_filter()?;
    posts
        .into_iter()
        .map(|post| match filter.accept(&post.url) {
            Some(url) => Ok(Post::new(post.id, url.as_str())),
            None => Err(BrowserError::InvalidUrl(post.url).into()),
        })
        .collect()
}

fn require_credentials(login: &LoginArgs) -> Result<Credentials> {
    login
        .credentials()
        .ok_or_else(|| BrowserError::MissingCredentials.into())
}

async fn scrape_saved(app: &App, credentials: &Credentials) -> Result<Vec<SavedPost>> {
    let browser = app.browser();
    browser.prepare_session(Some(credentials)).await?;
    Ok(browser.saved_posts(credentials).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use post_notes::error::ExportError;

    #[test]
    fn test_failed_export_still_prints_notes() {
        let result = BatchOutput {
            combined: "# Post 1 Notes\nkept".to_string(),
            artifacts: Vec::new(),
            export: Err(ExportError::Pdf("no fonts".to_string())),
        };
        let mut out = Vec::new();
        assert!(matches!(
            exported_path(result, &mut out),
            Err(Error::Export(ExportError::Pdf(_)))
        ));
        assert_eq!(String::from_utf8(out).unwrap(), "# Post 1 Notes\nkept\n");
    }

    #[test]
    fn test_successful_export_prints_nothing() {
        let result = BatchOutput {
            combined: "notes".to_string(),
            artifacts: Vec::new(),
            export: Ok(PathBuf::from("outputs/combined_notes.pdf")),
        };
        let mut out = Vec::new();
        let path = exported_path(result, &mut out).unwrap();
        assert_eq!(path, PathBuf::from("outputs/combined_notes.pdf"));
        assert!(out.is_empty());
    }
}

use clap::{Parser, Subcommand};
use post_notes::export::ExportFormat;
use post_notes::record::Credentials;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "post-notes")]
#[command(about = "Turns social network posts into structured notes")]
#[command(version)]
pub struct Args {
    /// JSON configuration file (defaults apply to anything it leaves out)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract and summarize posts into one combined document
    Notes {
        /// Post URLs, numbered from 1 in the order given
        urls: Vec<String>,

        /// JSON file with an array of {"id", "url"} objects
        #[arg(long, conflicts_with = "urls")]
        posts: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        login: LoginArgs,

        /// Number of posts processed at the same time
        #[arg(short, long)]
        concurrency: Option<usize>,
    },

    /// List the account's saved posts
    Saved {
        #[command(flatten)]
        login: LoginArgs,
    },

    /// Classify saved posts by topic
    Classify {
        /// Saved-posts JSON written by `saved` (scraped again if omitted)
        #[arg(long)]
        saved: Option<PathBuf>,

        #[command(flatten)]
        login: LoginArgs,
    },

    /// Run the extended pipeline (saved posts, classification, snapshot) for one post
    Extended {
        url: String,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        login: LoginArgs,
    },

    /// Serve the HTTP API
    Serve {
        /// Listen address (overrides the configuration)
        #[arg(long)]
        bind: Option<String>,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct OutputArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = ExportFormat::Pdf)]
    pub format: ExportFormat,

    /// Output file name, without extension
    #[arg(long, default_value = "combined_notes")]
    pub filename: String,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct LoginArgs {
    /// Account email
    #[arg(long)]
    pub email: Option<String>,

    /// Account password
    #[arg(long)]
    pub password: Option<String>,
}

impl LoginArgs {
    /// Credentials, if both parts were given
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.email, &self.password) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some(Credentials::new(email.clone(), password.clone()))
            }
            _ => None,
        }
    }
}

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Clone, Debug, Parser)]
#[command(name = "artifetch", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct App {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Download build artifacts into a directory.
    #[command(alias = "dl", name = "download")]
    Download(DownloadArg),
    /// Mirror a local directory to a file share.
    #[command(alias = "pub", name = "publish")]
    Publish(PublishArg),
}

#[derive(Clone, Debug, Args)]
pub struct DownloadArg {
    /// JSON file listing the build's artifacts.
    #[arg(long)]
    pub artifacts: PathBuf,

    /// Target directory. Overrides `target_directory` from the config file.
    #[arg(short, long)]
    pub target: Option<PathBuf>,

    /// TOML file with download parameters.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Download only the artifact with this name.
    #[arg(short, long)]
    pub name: Option<String>,

    /// Include/exclude glob pattern, in order. Repeatable.
    #[arg(short, long = "pattern")]
    pub patterns: Vec<String>,

    /// Project id used as request scope.
    #[arg(long)]
    pub project: Option<String>,

    #[arg(long)]
    pub parallelism: Option<usize>,

    /// Retries per item after the first attempt.
    #[arg(long)]
    pub retries: Option<u32>,

    /// Verify downloaded file sizes against the listing.
    #[arg(long)]
    pub check_sizes: bool,

    /// Unpack downloaded `.tar` files.
    #[arg(long)]
    pub extract_tars: bool,

    /// Put a single artifact under `<target>/<name>`.
    #[arg(long)]
    pub include_name: bool,

    /// Base URL of the artifact service, e.g. `https://dev.example.com/org`.
    #[arg(long)]
    pub service_url: Option<String>,

    /// Environment variable holding the service access token.
    #[arg(long, default_value = "ARTIFETCH_TOKEN")]
    pub token_env: String,
}

#[derive(Clone, Debug, Args)]
pub struct PublishArg {
    pub source: PathBuf,
    pub dest: PathBuf,

    #[arg(long, default_value_t = 8)]
    pub parallelism: usize,
}

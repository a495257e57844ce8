mod platform;

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use platform::app::{run_page, PageRequest};
use platform::logging::{self, LogDestination};
use platform::settings::{load_settings, AppSettings};

/// Renders CMS content and Instagram posts through the embed pipeline
/// against a simulated page and prints what ended up on it.
#[derive(Debug, Parser)]
#[command(name = "embed_app", version)]
struct Cli {
    /// HTML file with CMS article content.
    content: Option<PathBuf>,

    /// Instagram post URL to embed; may be repeated.
    #[arg(long = "post-url", value_name = "URL")]
    post_urls: Vec<String>,

    /// RON settings file.
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Simulated milliseconds to run after mounting.
    #[arg(long, value_name = "MS")]
    horizon_ms: Option<u64>,

    #[arg(long, value_enum, default_value_t = LogDestination::Terminal)]
    log: LogDestination,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::initialize(cli.log, cli.verbose);

    if cli.content.is_none() && cli.post_urls.is_empty() {
        anyhow::bail!("nothing to render: pass a content file or --post-url");
    }

    let settings = match &cli.settings {
        Some(path) => load_settings(path),
        None => AppSettings::default(),
    };

    let content_html = match &cli.content {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("failed to read content from {}", path.display()))?,
        ),
        None => None,
    };

    let report = run_page(
        &settings,
        PageRequest {
            content_html,
            post_urls: cli.post_urls,
            horizon: cli.horizon_ms.map(Duration::from_millis),
        },
    )?;
    print!("{report}");
    Ok(())
}

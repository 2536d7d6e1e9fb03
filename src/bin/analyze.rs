use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use page_critic::client::input::{GOALS_INPUT_ID, IMAGE_INPUT_ID, STYLE_INPUT_ID, URL_INPUT_ID};
use page_critic::client::{ConsoleSink, FileUpload, FormValues, Submitter};

/// Submit a comic page for critique and print the notes.
#[derive(Debug, Parser)]
#[command(name = "analyze", version)]
struct Cli {
    /// Base URL of the page-critic server
    #[arg(long, env = "ANALYZE_ENDPOINT", default_value = "http://127.0.0.1:3000")]
    endpoint: String,

    /// Page URL to analyze (sent as JSON)
    #[arg(long, required_unless_present = "image")]
    url: Option<String>,

    /// What the artist wants from this page
    #[arg(long)]
    goals: Option<String>,

    /// Local page image to upload instead of a URL
    #[arg(long, conflicts_with = "url")]
    image: Option<PathBuf>,

    /// Reading order for uploads: western or manga
    #[arg(long, default_value = "western")]
    style: String,

    /// Print the output region as HTML list markup
    #[arg(long)]
    html: bool,

    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();

    let mut inputs = FormValues::new()
        .with_value(URL_INPUT_ID, cli.url.unwrap_or_default())
        .with_value(GOALS_INPUT_ID, cli.goals.unwrap_or_default())
        .with_value(STYLE_INPUT_ID, cli.style);
    if let Some(path) = cli.image {
        let upload = FileUpload::read(&path)
            .await
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        inputs = inputs.with_file(IMAGE_INPUT_ID, upload);
    }

    let submitter = Submitter::new(&cli.endpoint, Duration::from_secs(cli.timeout_secs))?;
    let sink = ConsoleSink { html: cli.html };
    let rendered = submitter.submit(&inputs, &sink).await;

    if rendered.is_error() {
        std::process::exit(1);
    }
    Ok(())
}

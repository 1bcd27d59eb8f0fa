//! Command-line front end: upload a recording and wait for its document.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use nw_client::{
    ApiClient, ClientConfig, DocumentGenerator, GenerationState, TracingNotifier,
};

#[derive(Parser, Debug)]
#[command(name = "nw-generate")]
#[command(about = "Generate documentation from a screen recording", long_about = None)]
struct Cli {
    /// Recording to upload
    file: PathBuf,

    /// API base URL (overrides NW_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// MIME type of the recording (derived from the extension when omitted)
    #[arg(long)]
    mime_type: Option<String>,

    /// Write the document here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Seconds between polls (overrides NW_POLL_INTERVAL_SECS)
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Polls before giving up (overrides NW_POLL_MAX_ATTEMPTS)
    #[arg(long)]
    max_attempts: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env();
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }
    if let Some(secs) = cli.poll_interval {
        config.poll.interval = Duration::from_secs(secs);
    }
    if let Some(attempts) = cli.max_attempts {
        config.poll.max_attempts = attempts;
    }

    let client = ApiClient::new(&config).context("Failed to create API client")?;
    info!(api = %client.base_url(), "Using API");

    let generator = Arc::new(DocumentGenerator::new(
        Arc::new(client),
        Arc::new(TracingNotifier),
        config.poll,
    ));

    match cli.mime_type.as_deref() {
        Some(mime) => {
            let bytes = tokio::fs::read(&cli.file)
                .await
                .with_context(|| format!("Failed to read {}", cli.file.display()))?;
            let name = cli
                .file
                .file_name()
                .and_then(|n| n.to_str())
                .context("Recording path has no file name")?;
            generator.select_bytes(name, Some(mime), bytes).await;
        }
        None => generator
            .select_file(&cli.file)
            .await
            .with_context(|| format!("Failed to read {}", cli.file.display()))?,
    }

    // Ctrl-C abandons the attempt
    let on_interrupt = {
        let generator = Arc::clone(&generator);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, abandoning generation");
                generator.reset().await;
            }
        })
    };

    let state = generator.generate().await;
    on_interrupt.abort();

    match state {
        GenerationState::Succeeded => {
            let document = generator.document().await;
            match cli.output {
                Some(path) => {
                    tokio::fs::write(&path, document)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!(path = %path.display(), "Document written");
                }
                None => println!("{}", document),
            }
            Ok(())
        }
        GenerationState::Failed(failure) => anyhow::bail!("Generation failed: {}", failure),
        other => anyhow::bail!("Generation stopped in state {:?}", other),
    }
}

fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("nw=info".parse()?);

    // Logs go to stderr so stdout carries only the document
    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

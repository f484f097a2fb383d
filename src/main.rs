//! LazyWrite command line
//!
//! Generates text, a single image, or a whole illustrated book and prints
//! the result as JSON.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use clap::{Parser, Subcommand};
use lazywrite::{
    api::GeneratedImage,
    book::{BookAssembler, BookRenderer, JsonRenderer, MarkdownRenderer},
    config::{ConfigLoader, Environment, Settings},
    error::{ErrorResponse, LazywriteError},
    logging,
    router::spawn_recovery,
    CallOrchestrator,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// LazyWrite
///
/// Illustrated educational children's books from a single prompt.
#[derive(Parser, Debug)]
#[command(name = "lazywrite")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file (overrides LAZYWRITE_CONFIG and the default locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error (overrides LOG_LEVEL env var)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Environment: local, development, production (overrides APP_ENV env var)
    #[arg(short, long, global = true)]
    env: Option<Environment>,

    /// Forward calls to a LazyWrite deployment at SELF_URL instead of the providers
    #[arg(long, global = true)]
    remote: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate text for a prompt
    Text { prompt: String },

    /// Generate one image for a prompt
    Image {
        prompt: String,

        /// Write decoded image bytes here (base64 results only)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Assemble an illustrated book about a topic
    Book {
        topic: String,

        /// Write the book here; `.md` renders Markdown, anything else JSON
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => ConfigLoader::from_path(path)?,
        None => ConfigLoader::new()?,
    }
    .into_settings();

    if let Some(log_level) = &args.log_level {
        settings.log_level = log_level.clone();
    }
    if let Some(env) = args.env {
        settings.environment = env;
    }

    logging::init(&settings.log_level);

    let orchestrator = Arc::new(if args.remote {
        CallOrchestrator::remote(&settings)?
    } else {
        CallOrchestrator::from_settings(&settings)?
    });

    let recovery = settings
        .key_reset_interval()
        .map(|interval| spawn_recovery(orchestrator.key_pools(), interval));

    let outcome = run(args.command, orchestrator, &settings).await;

    if let Some(handle) = recovery {
        handle.abort();
    }

    match outcome {
        Ok(()) => Ok(()),
        Err(e) => match e.downcast_ref::<LazywriteError>() {
            Some(err) => {
                let response = ErrorResponse::from_error(err, settings.environment);
                tracing::error!(status = %response.status, "Request failed");
                println!("{}", serde_json::to_string_pretty(&response)?);
                std::process::exit(1);
            }
            None => Err(e),
        },
    }
}

async fn run(
    command: Command,
    orchestrator: Arc<CallOrchestrator>,
    settings: &Settings,
) -> Result<()> {
    match command {
        Command::Text { prompt } => {
            let text = orchestrator.generate_text(&prompt).await?;
            println!("{}", serde_json::to_string_pretty(&text)?);
        }
        Command::Image { prompt, out } => {
            let image = orchestrator.generate_image(&prompt).await?;
            match (&image, out) {
                (GeneratedImage::Base64 { image_base64 }, Some(path)) => {
                    let bytes = STANDARD
                        .decode(image_base64)
                        .context("Provider returned invalid base64 image data")?;
                    write_output(&path, &bytes)?;
                }
                (GeneratedImage::Url { .. }, Some(_)) => {
                    tracing::warn!("Provider returned a URL; nothing written");
                    println!("{}", serde_json::to_string_pretty(&image)?);
                }
                (_, None) => println!("{}", serde_json::to_string_pretty(&image)?),
            }
        }
        Command::Book { topic, out } => {
            let assembler = BookAssembler::new(orchestrator, settings.image_concurrency);
            let book = assembler.assemble(&topic).await?;

            let renderer: Box<dyn BookRenderer> = match out.as_deref().and_then(Path::extension) {
                Some(ext) if ext == "md" => Box::new(MarkdownRenderer),
                _ => Box::new(JsonRenderer { pretty: true }),
            };
            let rendered = renderer.render(&book)?;

            match out {
                Some(path) => write_output(&path, &rendered)?,
                None => println!("{}", String::from_utf8_lossy(&rendered)),
            }
        }
    }
    Ok(())
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "Wrote output");
    Ok(())
}

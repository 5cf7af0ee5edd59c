//! CLI binary for notelens.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use notelens::{
    analyze_extracted, extract_images, process, PipelineConfig, ResponseFormat, SizeLimitPolicy,
    UploadedImage,
};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # One-shot: extract, then analyse with instructions
  notelens run board1.jpg board2.jpg -i "list the action items"

  # Extract only (prints per-image text; edit, then analyse separately)
  notelens extract notes.png

  # Analyse edited text from a previous extract (reads JSON items on stdin)
  notelens extract notes.png --json > items.json
  notelens analyze -i "summarise" < items.json

  # Full JSON output
  notelens run notes.jpg -i "categorise these notes" --json

  # Start the HTTP server
  notelens serve --addr 127.0.0.1:3000

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY                  LLM API key
  GOOGLE_CREDENTIALS_BASE64       Base64-encoded Vision service-account JSON
  GOOGLE_APPLICATION_CREDENTIALS  Path to a Vision service-account JSON file
  NOTELENS_MODEL                  Override the analysis model
  NOTELENS_MAX_IMAGE_SIZE         Per-image size budget in bytes

SETUP:
  1. Set keys:   export OPENAI_API_KEY=sk-... GOOGLE_CREDENTIALS_BASE64=...
  2. Run:        notelens run whiteboard.jpg -i "list action items"
"#;

/// Extract and analyse handwritten / whiteboard notes with OCR and LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "notelens",
    version,
    about = "Extract and analyse handwritten / whiteboard notes with OCR and LLMs",
    arg_required_else_help = true,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// LLM model ID for the analysis call.
    #[arg(long, global = true, env = "NOTELENS_MODEL")]
    model: Option<String>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, global = true, env = "NOTELENS_TEMPERATURE")]
    temperature: Option<f32>,

    /// Per-image size budget in bytes.
    #[arg(long, global = true, env = "NOTELENS_MAX_IMAGE_SIZE")]
    max_image_size: Option<usize>,

    /// Oversized-image policy: normalize (compress in place) or reject.
    #[arg(long, global = true, env = "NOTELENS_SIZE_POLICY", value_enum, default_value = "normalize")]
    size_policy: SizePolicyArg,

    /// Concurrent OCR calls per batch.
    #[arg(long, global = true, env = "NOTELENS_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Request free prose instead of structured JSON from the LLM.
    #[arg(long, global = true, env = "NOTELENS_FREE_TEXT")]
    free_text: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "NOTELENS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, global = true, env = "NOTELENS_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// One-shot: extract text from images and analyse it.
    Run {
        /// Image files to process, in batch order.
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Free-form instructions guiding the analysis.
        #[arg(short, long)]
        instructions: String,

        /// Print the full result as JSON instead of readable text.
        #[arg(long)]
        json: bool,
    },

    /// Extract text only; edit the output, then feed it to `analyze`.
    Extract {
        /// Image files to process, in batch order.
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Print extracted items as JSON (the shape `analyze` reads).
        #[arg(long)]
        json: bool,
    },

    /// Analyse previously extracted items (JSON array on stdin).
    Analyze {
        /// Free-form instructions guiding the analysis.
        #[arg(short, long)]
        instructions: String,

        /// Print the full result as JSON instead of readable text.
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP server.
    Serve {
        /// Address to bind.
        #[arg(long, env = "NOTELENS_ADDR", default_value = "127.0.0.1:3000")]
        addr: SocketAddr,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum SizePolicyArg {
    Normalize,
    Reject,
}

impl From<SizePolicyArg> for SizeLimitPolicy {
    fn from(v: SizePolicyArg) -> Self {
        match v {
            SizePolicyArg::Normalize => SizeLimitPolicy::Normalize,
            SizePolicyArg::Reject => SizeLimitPolicy::Reject,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    match cli.command {
        Command::Run {
            ref images,
            ref instructions,
            json,
        } => {
            let batch = read_images(images).await?;
            let output = process(batch, instructions, &config)
                .await
                .context("Processing failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print_extracted(&output.extracted_texts);
                println!();
                print_analysis(&output.analysis);
            }
        }

        Command::Extract { ref images, json } => {
            let batch = read_images(images).await?;
            let items = extract_images(batch, &config)
                .await
                .context("Extraction failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                print_extracted(&items);
            }
        }

        Command::Analyze {
            ref instructions,
            json,
        } => {
            let mut stdin = String::new();
            io::Read::read_to_string(&mut io::stdin(), &mut stdin)
                .context("Failed to read stdin")?;
            let items: Vec<notelens::ExtractedText> =
                serde_json::from_str(&stdin).context("stdin is not a JSON item array")?;

            let analysis = analyze_extracted(&items, instructions, &config)
                .await
                .context("Analysis failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            } else {
                print_analysis(&analysis);
            }
        }

        Command::Serve { addr } => {
            notelens::server::serve(addr, config)
                .await
                .context("Server failed")?;
        }
    }

    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder().size_limit_policy(cli.size_policy.into());

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(bytes) = cli.max_image_size {
        builder = builder.max_image_size_bytes(bytes);
    }
    if let Some(n) = cli.concurrency {
        builder = builder.concurrency(n);
    }
    if cli.free_text {
        builder = builder.response_format(ResponseFormat::FreeText);
    }

    builder.build().context("Invalid configuration")
}

/// Read image files into a batch, preserving argument order.
async fn read_images(paths: &[PathBuf]) -> Result<Vec<UploadedImage>> {
    let mut batch = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read image '{}'", path.display()))?;
        batch.push(UploadedImage::new(bytes));
    }
    Ok(batch)
}

fn print_extracted(items: &[notelens::ExtractedText]) {
    for item in items {
        println!("--- Image {} ---", item.image_number);
        println!("{}", item.text);
    }
}

fn print_analysis(analysis: &notelens::AnalysisResult) {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if !analysis.summary.is_empty() {
        let _ = writeln!(out, "Summary\n  {}", analysis.summary);
    }
    if !analysis.categories.is_empty() {
        let _ = writeln!(out, "Categories\n  {}", analysis.categories.join(", "));
    }
    if !analysis.key_insights.is_empty() {
        let _ = writeln!(out, "Key insights");
        for insight in &analysis.key_insights {
            let _ = writeln!(out, "  - {insight}");
        }
    }
    if !analysis.action_steps.is_empty() {
        let _ = writeln!(out, "Action steps");
        for step in &analysis.action_steps {
            let _ = writeln!(out, "  - {step}");
        }
    }
}

//! copysmith - product description CLI
//!
//! Drafts a single description from a prompt, or works through a JSON
//! product export and saves the results.

use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use copysmith::batch::{BatchOptions, BatchRunner, JsonFileStore};
use copysmith::config::Secrets;
use copysmith::{DEFAULT_MAX_TOKENS, GenerationClient, GenerationOutcome, Product, Settings};

/// Copysmith CLI
#[derive(Parser)]
#[command(name = "copysmith")]
#[command(version = copysmith::PKG_VERSION)]
#[command(about = "Product description generator")]
struct Args {
    /// Config file (default: ~/.copysmith/config.toml, then /etc/copysmith/config.toml)
    #[arg(short, long, global = true, env = "COPYSMITH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate text for a single prompt
    Generate {
        /// Prompt (or omit to read from stdin)
        prompt: Option<String>,
        /// Upper bound on response length
        #[arg(short, long, default_value_t = DEFAULT_MAX_TOKENS)]
        max_tokens: u32,
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate full and short descriptions for every product in a file
    Batch {
        /// JSON array of products
        products: PathBuf,
        /// Where generated descriptions are saved
        #[arg(short, long, default_value = "descriptions.json")]
        output: PathBuf,
    },

    /// Print detailed build information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    if let Command::Version = args.command {
        println!("copysmith {}", copysmith::version_string());
        return Ok(());
    }

    let settings = Settings::load(args.config.as_deref())?;
    // A missing key is reported by the client as `missing_api_key`.
    let api_key = Secrets::load()?.api_key().unwrap_or_default();
    let client = GenerationClient::new(settings.generation_config(api_key))?;

    match args.command {
        Command::Generate {
            prompt,
            max_tokens,
            json,
        } => {
            let prompt = resolve_text(prompt, "generate")?;
            let outcome = client.generate(&prompt, max_tokens).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            }
            match outcome {
                GenerationOutcome::Success { text } => {
                    if !json {
                        println!("{text}");
                    }
                }
                GenerationOutcome::Failure { kind, message } => {
                    return Err(format!("{kind}: {message}").into());
                }
            }
        }

        Command::Batch { products, output } => {
            let products = read_products(&products)?;
            let store = JsonFileStore::new(output);
            let report = BatchRunner::new(&client, &store)
                .options(BatchOptions::from(&settings.batch))
                .run(&products)
                .await;

            for result in &report.results {
                match &result.outcome {
                    GenerationOutcome::Success { text } => println!(
                        "{} {}: ok ({} chars{})",
                        result.product_id,
                        result.field,
                        text.chars().count(),
                        if result.saved { ", saved" } else { "" }
                    ),
                    GenerationOutcome::Failure { kind, message } => {
                        println!("{} {}: {kind}: {message}", result.product_id, result.field)
                    }
                }
            }
            println!(
                "{} of {} fields generated, saved to {}",
                report.succeeded(),
                report.processed,
                store.path().display()
            );
        }

        Command::Version => unreachable!("handled above"),
    }

    Ok(())
}

/// Read a JSON array of products.
fn read_products(path: &Path) -> Result<Vec<Product>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let products: Vec<Product> = serde_json::from_str(&content)
        .map_err(|e| format!("failed to parse {}: {e}", path.display()))?;
    Ok(products)
}

/// Resolve text input from an optional CLI argument and/or stdin.
///
/// - arg only → arg
/// - stdin only → stdin
/// - both → `"{arg}\n\n{stdin}"`
/// - neither → error
fn resolve_text(arg: Option<String>, command: &str) -> Result<String, Box<dyn std::error::Error>> {
    let stdin_text = if io::stdin().is_terminal() {
        None
    } else {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Some(buf.trim().to_string()).filter(|s| !s.is_empty())
    };

    match (arg, stdin_text) {
        (Some(a), Some(s)) => Ok(format!("{a}\n\n{s}")),
        (Some(a), None) => Ok(a),
        (None, Some(s)) => Ok(s),
        (None, None) => {
            Err(format!("{command}: no prompt provided (pass it as argument or via stdin)").into())
        }
    }
}

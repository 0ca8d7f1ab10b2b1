use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use scholarly::{Assistant, Config, Outcome};
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "scholarly",
    version,
    about = "Translate documents and answer research questions from scholarly sources"
)]
struct Cli {
    /// Attempts per generation call, including the first (default: ASSISTANT_MAX_RETRIES or 3)
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..))]
    max_retries: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Translate text given as an argument, a file, or stdin
    Translate {
        /// Target language (default: ASSISTANT_LANGUAGE or Vietnamese)
        #[arg(long, short)]
        to: Option<String>,
        /// Read the text from a UTF-8 file
        #[arg(long, short, conflicts_with = "text")]
        file: Option<PathBuf>,
        text: Option<String>,
    },
    /// Search scholarly sources and synthesize a cited answer
    Ask {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("scholarly=info".parse()?),
        )
        .init();

    if let Err(e) = dotenv
        && !e.not_found()
    {
        warn!("failed to load .env: {e}");
    }

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(n) = cli.max_retries {
        config.max_retries = n;
    }

    let assistant = Assistant::from_config(&config)?;

    let outcome = match cli.command {
        Command::Translate { to, file, text } => {
            let text = match (file, text) {
                (Some(path), _) => tokio::fs::read_to_string(&path).await?,
                (None, Some(text)) => text,
                (None, None) => {
                    let mut buf = String::new();
                    tokio::io::stdin().read_to_string(&mut buf).await?;
                    buf
                }
            };
            let target = to.unwrap_or_else(|| assistant.language().to_string());
            assistant.translate_outcome(&text, &target).await
        }
        Command::Ask { query } => assistant.synthesize_outcome(&query.join(" ")).await,
    };

    println!("{outcome}");
    info!(success = outcome.is_success(), "done");

    Ok(match outcome {
        Outcome::Failed(_) => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}

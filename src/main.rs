//! # FPA Estimator CLI (`fpa`)
//!
//! Classifies free-form project stories into Function Point Analysis
//! function types and project types using a generative-AI classification
//! service, and re-classifies single stories with an attached `.docx`.
//!
//! ## Usage
//!
//! ```bash
//! fpa --config ./config/fpa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `fpa analyze [FILE]` | Classify stories from FILE (or stdin) and print the table |
//! | `fpa reanalyze --results R --story ID --doc D` | Re-classify one saved story using a `.docx` |
//! | `fpa extract FILE` | Print the text extracted from a `.docx` |
//! | `fpa serve` | Start the JSON HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! export GEMINI_API_KEY=...
//! fpa analyze sprint-23.txt --save sprint-23.json
//! fpa reanalyze --results sprint-23.json --story story-2-9f1c... --doc spec.docx
//! fpa serve
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use fpa_estimator::{commands, config, server};

/// FPA Estimator: Function Point Analysis story classification.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the file does not exist, built-in defaults are used.
#[derive(Parser)]
#[command(
    name = "fpa",
    about = "FPA Estimator: classify project stories for Function Point Analysis",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/fpa.toml")]
    config: PathBuf,

    /// Log debug output to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a list of stories.
    ///
    /// Sends the whole text to the classification service, assigns an id to
    /// each detected story and prints the classification table and summary.
    Analyze {
        /// File with the raw story text. Reads stdin when omitted or `-`.
        input: Option<PathBuf>,

        /// Print the analysis as JSON instead of a table.
        #[arg(long)]
        json: bool,

        /// Also print warnings and reasoning for every story.
        #[arg(long)]
        details: bool,

        /// Save the analysis as JSON for a later `reanalyze`.
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Re-classify one story of a saved analysis using a `.docx` document.
    ///
    /// The story keeps its id and original text. The saved analysis is
    /// rewritten with the new classification and a recomputed summary.
    Reanalyze {
        /// Analysis file written by `analyze --save`.
        #[arg(long)]
        results: PathBuf,

        /// Id of the story to re-classify.
        #[arg(long)]
        story: String,

        /// Context document (`.docx`).
        #[arg(long)]
        doc: PathBuf,

        /// Print the updated story as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the plain text extracted from a `.docx` document.
    Extract {
        /// Document to extract.
        doc: PathBuf,
    },

    /// Start the JSON HTTP API.
    ///
    /// Binds to `[server].bind` and keeps one analysis session in memory.
    Serve,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Analyze {
            input,
            json,
            details,
            save,
        } => {
            commands::run_analyze(&cfg, input, json, details, save).await?;
        }
        Commands::Reanalyze {
            results,
            story,
            doc,
            json,
        } => {
            commands::run_reanalyze(&cfg, &results, &story, &doc, json).await?;
        }
        Commands::Extract { doc } => {
            commands::run_extract(&cfg, &doc)?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

//! # docqa CLI
//!
//! The `docqa` binary answers questions about your own documents using a
//! local Ollama model. Stage files, build the index, then ask.
//!
//! ## Usage
//!
//! ```bash
//! docqa --config ./config/docqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa upload <files...>` | Copy PDF/DOCX/TXT files into the staging directory |
//! | `docqa build` | Rebuild the index snapshot from staged files |
//! | `docqa ask "<question>"` | Answer a question from the indexed documents |
//! | `docqa status` | Show staged files and snapshot metadata |
//! | `docqa serve` | Start the JSON HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # Stage a few documents
//! docqa upload report.pdf notes.docx faq.txt
//!
//! # Build the snapshot
//! docqa build
//!
//! # Ask away
//! docqa ask "What were the Q3 revenue figures?"
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use docqa::config;
use docqa::index;
use docqa::pipeline::Pipeline;
use docqa::server;
use docqa::staging;

/// docqa — question answering over your own documents, powered by a local
/// Ollama model.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docqa.example.toml` for a full example. Without a
/// config file, built-in defaults are used.
#[derive(Parser)]
#[command(
    name = "docqa",
    about = "docqa — question answering over your own documents via a local Ollama model",
    version,
    long_about = "docqa stages PDF, DOCX, and TXT files, chunks and embeds their text into a \
    vector index snapshot, and answers questions by retrieving the most relevant chunks and \
    prompting a local Ollama model with them."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/docqa.toml`. Built-in defaults apply when the
    /// file does not exist.
    #[arg(long, global = true, default_value = "./config/docqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Copy files into the staging directory.
    ///
    /// Files are staged under their original names; re-uploading a file
    /// overwrites the staged copy. Staging never triggers a rebuild —
    /// run `docqa build` when the set of documents is ready.
    Upload {
        /// Files to stage (PDF, DOCX, or TXT).
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Rebuild the index snapshot from all staged files.
    ///
    /// Extraction failures and unsupported formats are reported and
    /// skipped. The rebuild is always from scratch; on any failure the
    /// previous snapshot is left untouched.
    Build,

    /// Answer a question from the indexed documents.
    ///
    /// Embeds the question, retrieves the most similar chunks, and prompts
    /// the configured Ollama model with them. Requires a built index.
    Ask {
        /// The question to answer.
        question: String,

        /// Number of chunks to retrieve (defaults to `retrieval.top_k`).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Show staged files and index snapshot metadata.
    Status,

    /// Start the JSON HTTP server.
    ///
    /// Binds to the address configured in `[server].bind` and exposes
    /// upload, build, and ask endpoints.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Upload { files } => {
            let staged = staging::stage_files(&config.staging.dir, &files)?;
            println!(
                "Staged {} file(s) in {}",
                staged,
                config.staging.dir.display()
            );
            println!("Run `docqa build` to index them.");
        }

        Commands::Build => {
            let pipeline = Pipeline::new(config)?;
            let report = pipeline.build_index().await?;
            println!(
                "Indexed {} chunk(s) from {} document(s) -> {}",
                report.chunks,
                report.documents,
                report.snapshot.display()
            );
            for skipped in &report.skipped {
                println!("  skipped {}: {}", skipped.filename, skipped.reason);
            }
        }

        Commands::Ask { question, top_k } => {
            let top_k = top_k.unwrap_or(config.retrieval.top_k).max(1);
            let pipeline = Pipeline::new(config)?;
            let answer = pipeline.answer(&question, top_k).await?;
            println!("{}", answer.text);
            if !answer.sources.is_empty() {
                println!();
                println!("Sources:");
                for hit in &answer.sources {
                    println!("  {} (score {:.3})", hit.source, hit.score);
                }
            }
        }

        Commands::Status => {
            let staged = staging::list_staged(&config.staging.dir)?;
            if staged.is_empty() {
                println!("No files staged in {}", config.staging.dir.display());
            } else {
                println!("Staged files ({}):", config.staging.dir.display());
                for file in &staged {
                    println!("  {} ({} bytes)", file.name, file.bytes);
                }
            }

            let snapshot_path = config.index.snapshot_path();
            match index::snapshot_info(&snapshot_path).await? {
                Some(info) => {
                    println!("Snapshot: {}", snapshot_path.display());
                    println!("  model:      {}", info.model);
                    println!("  dimensions: {}", info.dims);
                    println!("  entries:    {}", info.entries);
                    println!("  created:    {}", info.created_at);
                }
                None => {
                    println!(
                        "No snapshot at {} (run `docqa build`)",
                        snapshot_path.display()
                    );
                }
            }
        }

        Commands::Serve => {
            server::run_server(&config).await?;
        }
    }

    Ok(())
}

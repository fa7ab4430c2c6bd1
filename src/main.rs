//! # notesync CLI
//!
//! Offline helpers around the document protocol the editor integration
//! uses: inspect and create front-matter headers, preview the markup a
//! publish would send, validate configuration and derive note links.
//!
//! ## Usage
//!
//! ```bash
//! notesync --config ./config/notesync.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `notesync frontmatter parse <file>` | Print a document's header as JSON |
//! | `notesync frontmatter new` | Print an empty or prefilled header |
//! | `notesync markup <file>` | Print the markup a publish would send |
//! | `notesync config check` | Load and validate the configuration |
//! | `notesync link <guid>` | Print the browser URL for a note |

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use notesync::codec::{embed_resource_references, ContentCodec, PlainTextCodec};
use notesync::config;
use notesync::frontmatter::{extract_front_matter, render_front_matter};
use notesync::models::Attachment;

/// notesync: note synchronization helpers for editor-hosted note clients.
#[derive(Parser)]
#[command(name = "notesync", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/notesync.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or create front-matter headers.
    Frontmatter {
        #[command(subcommand)]
        action: FrontmatterAction,
    },

    /// Print the note markup a publish of this document would send.
    ///
    /// Attachments given with `--attach` are referenced the same way staged
    /// attachments are.
    Markup {
        file: PathBuf,

        #[arg(long = "attach")]
        attachments: Vec<PathBuf>,
    },

    /// Configuration helpers.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Print the browser URL of a note.
    Link { guid: String },
}

#[derive(Subcommand)]
enum FrontmatterAction {
    /// Print the header of a document as JSON.
    Parse { file: PathBuf },

    /// Print a new header.
    New {
        #[arg(long, default_value = "")]
        title: String,

        /// Comma-separated tag names.
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,

        #[arg(long, default_value = "")]
        notebook: String,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Load the config file and report problems.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Frontmatter { action } => match action {
            FrontmatterAction::Parse { file } => {
                let text = tokio::fs::read_to_string(&file)
                    .await
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                let extracted = extract_front_matter(&text)?;
                let out = serde_json::json!({
                    "metadata": extracted.metadata,
                    "content_length": extracted.content.len(),
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            }
            FrontmatterAction::New {
                title,
                tags,
                notebook,
            } => {
                let tags: Vec<String> = tags
                    .iter()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect();
                print!("{}", render_front_matter(&title, &tags, &notebook));
            }
        },
        Commands::Markup { file, attachments } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let extracted = extract_front_matter(&text)?;
            let codec = PlainTextCodec;
            let markup = codec.to_markup(extracted.content)?;

            let mut resources = Vec::with_capacity(attachments.len());
            for path in &attachments {
                let body = tokio::fs::read(path)
                    .await
                    .with_context(|| format!("Failed to read attachment {}", path.display()))?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                let mime = mime_guess::from_path(path).first_or_octet_stream();
                resources.push(Attachment::from_bytes(name, mime.essence_str(), body));
            }

            println!("{}", embed_resource_references(&codec, &markup, &resources)?);
        }
        Commands::Config { action } => match action {
            ConfigAction::Check => {
                let cfg = config::load_config(&cli.config)?;
                println!("config ok: {}", cli.config.display());
                println!("  note store: {}", cfg.service.note_store_url);
                match &cfg.attachments.upload_folder {
                    Some(folder) => println!("  upload folder: {}", folder.display()),
                    None => println!("  upload folder: (not set)"),
                }
                println!(
                    "  download folder: {}",
                    cfg.attachments.download_folder.display()
                );
            }
        },
        Commands::Link { guid } => {
            let cfg = config::load_config(&cli.config)?;
            println!("{}", cfg.note_web_url(&guid)?);
        }
    }

    Ok(())
}

//! # gitfolio CLI (`folio`)
//!
//! The `folio` binary is the primary interface for gitfolio. It provides
//! commands for database initialization, saving files into collections,
//! liked-repo management, classification, evaluation, and starting the
//! JSON API server.
//!
//! ## Usage
//!
//! ```bash
//! folio --config ./config/folio.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `folio init` | Create the SQLite database and run schema migrations |
//! | `folio save` | Save a file into a collection (create or merge) |
//! | `folio collections <candidate>` | List a candidate's collections |
//! | `folio files` | List saved files, optionally scoped to a collection |
//! | `folio remove` | Remove a file from a collection |
//! | `folio like` | Flip the liked state of a repository |
//! | `folio liked <user>` | List a user's liked repositories |
//! | `folio classify <file-id>` | Classify a saved file |
//! | `folio evaluate <collection-id>` | Aggregate labels and persist the coverage score |
//! | `folio serve` | Start the JSON API server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use gitfolio::catalog::LabelCatalog;
use gitfolio::collections::{self, SaveRequest};
use gitfolio::models::RepoMetadata;
use gitfolio::store::{CollectionStore, SqliteStore};
use gitfolio::{classify, config, db, evaluate, likes, migrate, server};

/// gitfolio CLI — a collection curation and label aggregation engine for
/// GitHub code assessment.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/folio.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "folio",
    about = "gitfolio — curate GitHub files into collections and score their label coverage",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/folio.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v: debug, -vv: trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables
    /// (collections, files, membership edges, liked repos).
    /// This command is idempotent — running it multiple times is safe.
    Init,

    /// Save a file into a collection.
    ///
    /// Derives the file's identity from its download URL and either
    /// creates a new collection or merges into an existing one whose name
    /// matches case-insensitively. Safe to repeat: an identical save is a
    /// no-op.
    Save {
        /// Candidate (GitHub account) scope for the collection.
        #[arg(long)]
        candidate: String,

        /// Target collection name.
        #[arg(long)]
        collection: String,

        /// File name (e.g., `index.js`).
        #[arg(long)]
        file_name: String,

        /// Owner of the repository the file was found in.
        #[arg(long)]
        owner: String,

        /// Repository name the file was found in.
        #[arg(long)]
        repo: String,

        /// Raw download URL of the file.
        #[arg(long)]
        url: String,

        /// Programming language recorded on the collection.
        #[arg(long, default_value = "JavaScript")]
        language: String,

        /// Require the collection to already exist; fail instead of
        /// creating a new one when the name has no match.
        #[arg(long)]
        existing: bool,
    },

    /// List a candidate's collections with their scores.
    Collections {
        /// Candidate (GitHub account) scope.
        candidate: String,
    },

    /// List saved files.
    ///
    /// Without `--collection`, lists every saved file; with it, only the
    /// members of that collection.
    Files {
        /// Restrict to one collection.
        #[arg(long)]
        collection: Option<String>,
    },

    /// Remove a file from a collection.
    ///
    /// Deletes the membership edge only; the file record survives and may
    /// still belong to other collections.
    Remove {
        /// Collection id.
        #[arg(long)]
        collection: String,

        /// File id.
        #[arg(long)]
        file: String,
    },

    /// Flip the liked state of a repository.
    ///
    /// A strict toggle: liked becomes un-liked and vice versa. Not safe to
    /// blindly retry after a failure.
    Like {
        /// User performing the flip.
        #[arg(long)]
        user: String,

        /// Repository id.
        #[arg(long)]
        repo_id: String,

        /// Repository owner, persisted with the like.
        #[arg(long)]
        owner: String,

        /// Repository name, persisted with the like.
        #[arg(long)]
        repo: String,

        /// Repository language, persisted with the like.
        #[arg(long, default_value = "Unknown")]
        language: String,
    },

    /// List a user's liked repositories.
    Liked {
        /// User id.
        user: String,
    },

    /// Classify a saved file.
    ///
    /// Fetches the file's source text, sends it to the classifier, and
    /// replaces the file's label snapshot with the translated result.
    Classify {
        /// File id (as printed by `folio save`).
        file_id: String,
    },

    /// Evaluate a collection.
    ///
    /// Aggregates the label maps of the collection's classified files,
    /// computes the coverage score against the label catalog, and
    /// persists it onto the collection.
    Evaluate {
        /// Collection id.
        collection_id: String,
    },

    /// Start the JSON API server.
    ///
    /// Binds to the address configured in `[server].bind` and exposes the
    /// engine operations over HTTP.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Save {
            candidate,
            collection,
            file_name,
            owner,
            repo,
            url,
            language,
            existing,
        } => {
            let pool = db::connect(&cfg).await?;
            let store = SqliteStore::new(pool);

            if existing {
                let current = store.collections_for_candidate(&candidate).await?;
                collections::validate_existing_target(&current, &candidate, &collection)?;
            }

            let req = SaveRequest {
                candidate,
                collection_name: collection,
                language,
                file_name,
                owner,
                repo_name: repo,
                download_url: url,
            };
            let outcome = collections::save_file(&store, &req).await?;

            println!("save");
            println!("  collection: {}", outcome.collection_id);
            println!("  file: {}", outcome.file_id);
            println!(
                "  {}",
                if outcome.created {
                    "created new collection"
                } else {
                    "merged into existing collection"
                }
            );
            println!("ok");
        }
        Commands::Collections { candidate } => {
            let pool = db::connect(&cfg).await?;
            let store = SqliteStore::new(pool);
            let collections = store.collections_for_candidate(&candidate).await?;

            if collections.is_empty() {
                println!("No collections for candidate '{}'.", candidate);
            }
            for c in collections {
                let files = store.collection_files(&c.id).await?;
                let repos = store.collection_repos(&c.id).await?;
                println!(
                    "{}  {}  score={:.2}  files={}  repos={}",
                    c.id,
                    c.name,
                    c.score,
                    files.len(),
                    repos.len()
                );
            }
        }
        Commands::Files { collection } => {
            let pool = db::connect(&cfg).await?;
            let store = SqliteStore::new(pool);
            let files = match collection {
                Some(id) => store.collection_files(&id).await?,
                None => store.list_files().await?,
            };

            if files.is_empty() {
                println!("No files.");
            }
            for f in files {
                let status = if f.is_classified() {
                    "classified"
                } else {
                    "unclassified"
                };
                println!("{}  {}/{}/{}  {}", f.id, f.owner, f.repo_name, f.name, status);
            }
        }
        Commands::Remove { collection, file } => {
            let pool = db::connect(&cfg).await?;
            let store = SqliteStore::new(pool);
            let removed = collections::remove_file(&store, &collection, &file).await?;

            if removed {
                println!("Removed file from collection.");
            } else {
                println!("File was not a member of the collection.");
            }
        }
        Commands::Like {
            user,
            repo_id,
            owner,
            repo,
            language,
        } => {
            let pool = db::connect(&cfg).await?;
            let store = SqliteStore::new(pool);
            let metadata = RepoMetadata {
                owner_name: owner,
                repo_name: repo,
                language,
            };
            let outcome = likes::toggle_like(&store, &user, &repo_id, &metadata).await?;

            println!(
                "{}",
                if outcome.liked {
                    "Repository liked."
                } else {
                    "Repository un-liked."
                }
            );
        }
        Commands::Liked { user } => {
            let pool = db::connect(&cfg).await?;
            let store = SqliteStore::new(pool);
            let liked = store.liked_repos(&user).await?;

            if liked.is_empty() {
                println!("No liked repositories for user '{}'.", user);
            }
            for l in liked {
                println!("{}  {}/{}  {}", l.repo_id, l.owner_name, l.repo_name, l.language);
            }
        }
        Commands::Classify { file_id } => {
            let pool = db::connect(&cfg).await?;
            let store = SqliteStore::new(pool);
            let catalog = LabelCatalog::default();
            let labels =
                classify::classify_file(&store, &cfg.classifier, &catalog, &file_id).await?;

            println!("classify {}", file_id);
            if labels.is_empty() {
                println!("  no recognizable labels");
            }
            for (label, confidence) in &labels {
                println!("  {}: {:.2}%", label, confidence);
            }
            println!("ok");
        }
        Commands::Evaluate { collection_id } => {
            let pool = db::connect(&cfg).await?;
            let store = SqliteStore::new(pool);
            let catalog = LabelCatalog::default();
            let evaluation =
                evaluate::evaluate_collection(&store, &catalog, &collection_id).await?;

            println!("evaluate {}", collection_id);
            for (label, confidence) in &evaluation.labels {
                println!("  {}: {:.2}%", label, confidence);
            }
            println!(
                "  coverage: {:.2}% of {} labels",
                evaluation.score,
                catalog.size()
            );
            println!("ok");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

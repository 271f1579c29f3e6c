//! # Catalog Harness CLI (`catalog`)
//!
//! ## Usage
//!
//! ```bash
//! catalog --config ./config/catalog.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `catalog init` | Create the SQLite database and schema |
//! | `catalog load <file.json>` | Bulk-load products (upsert by id) |
//! | `catalog search "<query>"` | Keyword or hybrid product search |
//! | `catalog get <productId>` | Print one product |
//! | `catalog embed pending` | Embed products that have no vector yet |
//! | `catalog summary …` | Generate, get, update, delete or list summaries |
//! | `catalog tools list` | Print the tools agents can call |
//! | `catalog serve mcp` | Start the HTTP + MCP tool server |
//!
//! ## Logging
//!
//! Diagnostics go to stderr through `tracing`. Filter with `RUST_LOG`
//! (default `catalog_harness=info`); set `CATALOG_LOG_FORMAT=json` for
//! one JSON object per line.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use catalog_harness::summary_cmd::{self, SummaryAction};
use catalog_harness::tools::ToolRegistry;
use catalog_harness::{
    config, embed_cmd, get, load, migrate, search, server, SummaryContent,
};

/// Catalog Harness: product search and marketing-summary tools for AI agents.
#[derive(Parser)]
#[command(
    name = "catalog",
    about = "Catalog Harness: product search and marketing-summary tools for AI agents",
    version,
    long_about = "Catalog Harness stores a product catalog in SQLite with full-text and vector \
    indexes, manages marketing summaries per product, and exposes both as tools over a JSON \
    HTTP API and MCP."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/catalog.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file, the product and summary tables and
    /// the full-text index. Running it again is safe.
    Init,

    /// Bulk-load products from a JSON array file.
    Load {
        /// Path to the JSON file.
        file: PathBuf,

        /// Validate the file and print counts without writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Search products.
    Search {
        /// The search text.
        query: String,

        /// `keyword` (FTS5) or `hybrid` (keyword + vector fusion).
        /// Hybrid embeds the query with the configured provider.
        #[arg(long, default_value = "keyword")]
        mode: String,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print a product by id.
    Get {
        /// Product id.
        id: String,
    },

    /// Manage product embeddings.
    Embed {
        #[command(subcommand)]
        action: EmbedAction,
    },

    /// Manage product marketing summaries.
    Summary {
        #[command(subcommand)]
        action: SummaryCommand,
    },

    /// Inspect the tools exposed to agents.
    Tools {
        #[command(subcommand)]
        action: ToolsAction,
    },

    /// Start a server.
    Serve {
        #[command(subcommand)]
        service: ServeService,
    },
}

#[derive(Subcommand)]
enum EmbedAction {
    /// Embed products that have no embedding.
    Pending {
        /// Maximum number of products to embed in this run.
        #[arg(long)]
        limit: Option<usize>,

        /// Override the batch size from config (number of texts per API call).
        #[arg(long)]
        batch_size: Option<usize>,

        /// Show counts without performing any embedding.
        #[arg(long)]
        dry_run: bool,
    },
}

/// Authored summary fields.
#[derive(clap::Args)]
struct SummaryFields {
    #[arg(long)]
    title: String,
    #[arg(long)]
    short_description: String,
    #[arg(long)]
    marketing_copy: String,
}

impl SummaryFields {
    fn content(&self) -> SummaryContent<'_> {
        SummaryContent {
            title: &self.title,
            short_description: &self.short_description,
            marketing_copy: &self.marketing_copy,
        }
    }
}

#[derive(Subcommand)]
enum SummaryCommand {
    /// Create a summary; features, audience and use case are derived.
    Generate {
        product_id: String,
        #[command(flatten)]
        fields: SummaryFields,
    },
    /// Print the current summary for a product.
    Get { product_id: String },
    /// Replace the authored fields of the current summary.
    Update {
        product_id: String,
        #[command(flatten)]
        fields: SummaryFields,
    },
    /// Delete the current summary, if any.
    Delete { product_id: String },
    /// List every summary.
    List,
}

#[derive(Subcommand)]
enum ToolsAction {
    /// List registered tools with their parameters.
    List,
}

#[derive(Subcommand)]
enum ServeService {
    /// Serve `/tools/*`, `/health` and the `/mcp` endpoint on `[server].bind`.
    Mcp,
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "catalog_harness=info".into());

    let json = std::env::var("CATALOG_LOG_FORMAT").is_ok_and(|v| v == "json");
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Load { file, dry_run } => {
            load::run_load(&cfg, &file, dry_run).await?;
        }
        Commands::Search { query, mode, limit } => {
            search::run_search(&cfg, &query, &mode, limit).await?;
        }
        Commands::Get { id } => {
            get::run_get(&cfg, &id).await?;
        }
        Commands::Embed { action } => match action {
            EmbedAction::Pending {
                limit,
                batch_size,
                dry_run,
            } => {
                embed_cmd::run_embed_pending(&cfg, limit, batch_size, dry_run).await?;
            }
        },
        Commands::Summary { action } => match action {
            SummaryCommand::Generate { product_id, fields } => {
                let action = SummaryAction::Generate(fields.content());
                summary_cmd::run_summary(&cfg, &product_id, action).await?;
            }
            SummaryCommand::Get { product_id } => {
                summary_cmd::run_summary(&cfg, &product_id, SummaryAction::Get).await?;
            }
            SummaryCommand::Update { product_id, fields } => {
                let action = SummaryAction::Update(fields.content());
                summary_cmd::run_summary(&cfg, &product_id, action).await?;
            }
            SummaryCommand::Delete { product_id } => {
                summary_cmd::run_summary(&cfg, &product_id, SummaryAction::Delete).await?;
            }
            SummaryCommand::List => {
                summary_cmd::run_summary_list(&cfg).await?;
            }
        },
        Commands::Tools { action } => match action {
            ToolsAction::List => {
                let registry = ToolRegistry::with_builtins(&cfg);
                for info in registry.infos() {
                    let mode = if info.read_only { "read-only" } else { "writes" };
                    println!("{} ({})", info.name, mode);
                    println!("    {}", info.description);
                    println!(
                        "    params: {}",
                        serde_json::to_string(&info.parameters["properties"])?
                    );
                }
            }
        },
        Commands::Serve { service } => match service {
            ServeService::Mcp => {
                server::run_server(&cfg).await?;
            }
        },
    }

    Ok(())
}

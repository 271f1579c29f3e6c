//! # Catalog Harness
//!
//! **Product search and marketing-summary tools for AI agents.**
//!
//! Catalog Harness keeps a product catalog in SQLite (FTS5 for keyword
//! relevance, f32 BLOBs for embeddings), manages one marketing summary per
//! product, and exposes both to agents as tools over a JSON HTTP API and
//! MCP Streamable HTTP.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐      ┌──────────────┐
//! │ catalog load │      │  Agent host  │
//! │ embed pending│      │ (HTTP / MCP) │
//! └──────┬───────┘      └──────┬───────┘
//!        │                     ▼
//!        │              ┌──────────────┐
//!        │              │ ToolRegistry │
//!        │              └──────┬───────┘
//!        ▼                     ▼
//! ┌────────────────────────────────────┐
//! │ catalog_harness_core::{search,     │
//! │                        summary}    │
//! └─────────────────┬──────────────────┘
//!                   ▼
//!            ┌─────────────┐
//!            │ SqliteStore │
//!            └─────────────┘
//! ```
//!
//! The ranking, fusion and summary-derivation logic lives in
//! `catalog-harness-core` and works against the `Store` trait; this crate
//! supplies the SQLite backend, configuration, the embedding client, the
//! tool surface and the `catalog` CLI.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`db`] | SQLite connection pool with WAL mode |
//! | [`migrate`] | Idempotent schema creation |
//! | [`sqlite_store`] | `Store` implementation over SQLite + FTS5 |
//! | [`embedding`] | OpenAI embeddings client with retry |
//! | [`tools`] | `Tool` trait, parameter validation, the nine catalog tools |
//! | [`server`] | Axum HTTP server, error contract, per-call timeout |
//! | [`mcp`] | MCP bridge over the tool registry |
//! | [`load`] | `catalog load`: bulk product import |
//! | [`embed_cmd`] | `catalog embed pending` |
//! | [`search`] | `catalog search` |
//! | [`get`] | `catalog get` |
//! | [`summary_cmd`] | `catalog summary …` |

pub mod config;
pub mod db;
pub mod embed_cmd;
pub mod embedding;
pub mod get;
pub mod load;
pub mod mcp;
pub mod migrate;
pub mod search;
pub mod server;
pub mod sqlite_store;
pub mod summary_cmd;
pub mod tools;

pub use catalog_harness_core::store;
pub use catalog_harness_core::{CatalogError, Product, ProductSummary, SummaryContent};
pub use tools::{Tool, ToolContext, ToolRegistry};

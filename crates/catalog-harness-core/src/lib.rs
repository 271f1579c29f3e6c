//! # Catalog Harness Core
//!
//! Storage-agnostic logic for Catalog Harness: product and summary models,
//! the [`store::Store`] trait, keyword/vector/hybrid product search, and the
//! summary lifecycle with its derived-field rules.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem I/O.

pub mod embedding;
pub mod error;
pub mod fusion;
pub mod models;
pub mod search;
pub mod store;
pub mod summary;

pub use error::{CatalogError, RecordKind};
pub use models::{Product, ProductSummary, SummaryContent};

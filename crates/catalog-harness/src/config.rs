//! TOML configuration.
//!
//! ```toml
//! [db]
//! path = "./data/catalog.sqlite"
//!
//! [containers]
//! products = "products"
//! summaries = "product_summaries"
//!
//! [retrieval]
//! default_limit = 10
//!
//! [embedding]
//! provider = "openai"
//! model = "text-embedding-3-small"
//! dims = 1536
//!
//! [server]
//! bind = "127.0.0.1:7341"
//! ```
//!
//! Only `[db]` and `[server]` are required; every other section has
//! defaults. See [`load_config`] for validation rules.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub containers: ContainersConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

/// Table names for the two record kinds.
#[derive(Debug, Deserialize, Clone)]
pub struct ContainersConfig {
    #[serde(default = "default_products")]
    pub products: String,
    #[serde(default = "default_summaries")]
    pub summaries: String,
}

impl Default for ContainersConfig {
    fn default() -> Self {
        Self {
            products: default_products(),
            summaries: default_summaries(),
        }
    }
}

fn default_products() -> String {
    "products".to_string()
}
fn default_summaries() -> String {
    "product_summaries".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Result limit when a caller does not pass `maxResults`.
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    /// Candidates fetched per ranking before hybrid fusion.
    #[serde(default = "default_candidate_k")]
    pub candidate_k: usize,
    #[serde(default = "default_rrf_k")]
    pub rrf_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            candidate_k: default_candidate_k(),
            rrf_k: default_rrf_k(),
        }
    }
}

fn default_limit() -> usize {
    10
}
fn default_candidate_k() -> usize {
    50
}
fn default_rrf_k() -> usize {
    catalog_harness_core::fusion::RRF_K
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: default_dims(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_dims() -> usize {
    1536
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    /// Upper bound on a single tool invocation.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// True for names usable unquoted as SQLite identifiers.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Check the cross-field rules [`load_config`] enforces.
pub fn validate(config: &Config) -> Result<()> {
    for (key, name) in [
        ("containers.products", &config.containers.products),
        ("containers.summaries", &config.containers.summaries),
    ] {
        if !is_identifier(name) {
            bail!(
                "{} must be a plain identifier (letters, digits, underscore), got '{}'",
                key,
                name
            );
        }
    }
    if config.containers.products == config.containers.summaries {
        bail!("containers.products and containers.summaries must differ");
    }

    if config.db.max_connections == 0 {
        bail!("db.max_connections must be >= 1");
    }

    if config.retrieval.default_limit < 1 {
        bail!("retrieval.default_limit must be >= 1");
    }
    if config.retrieval.candidate_k < 1 {
        bail!("retrieval.candidate_k must be >= 1");
    }

    if config.embedding.dims == 0 {
        bail!("embedding.dims must be > 0");
    }
    match config.embedding.provider.as_str() {
        "disabled" => {}
        "openai" => {
            if config.embedding.model.is_none() {
                bail!("embedding.model must be specified when provider is 'openai'");
            }
        }
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    if config.server.request_timeout_secs == 0 {
        bail!("server.request_timeout_secs must be > 0");
    }

    Ok(())
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &str) -> Config {
        let text = format!(
            "[db]\npath = \"/tmp/c.sqlite\"\n\n[server]\nbind = \"127.0.0.1:0\"\n{}",
            extra
        );
        toml::from_str(&text).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cfg = parse("");
        validate(&cfg).unwrap();
        assert_eq!(cfg.containers.products, "products");
        assert_eq!(cfg.containers.summaries, "product_summaries");
        assert_eq!(cfg.retrieval.default_limit, 10);
        assert_eq!(cfg.retrieval.rrf_k, 60);
        assert_eq!(cfg.embedding.dims, 1536);
        assert!(!cfg.embedding.is_enabled());
        assert_eq!(cfg.server.request_timeout_secs, 30);
    }

    #[test]
    fn test_rejects_bad_container_name() {
        let cfg = parse("[containers]\nproducts = \"drop table\"\n");
        let err = validate(&cfg).unwrap_err();
        assert!(err.to_string().contains("containers.products"));
    }

    #[test]
    fn test_rejects_same_container_names() {
        let cfg = parse("[containers]\nproducts = \"items\"\nsummaries = \"items\"\n");
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn test_openai_requires_model() {
        let cfg = parse("[embedding]\nprovider = \"openai\"\n");
        assert!(validate(&cfg).unwrap_err().to_string().contains("model"));

        let cfg = parse("[embedding]\nprovider = \"openai\"\nmodel = \"text-embedding-3-small\"\n");
        validate(&cfg).unwrap();
    }

    #[test]
    fn test_unknown_provider() {
        let cfg = parse("[embedding]\nprovider = \"magic\"\n");
        assert!(validate(&cfg).unwrap_err().to_string().contains("Unknown"));
    }

    #[test]
    fn test_identifier_rules() {
        assert!(is_identifier("product_summaries"));
        assert!(is_identifier("_p2"));
        assert!(!is_identifier("2p"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("a-b"));
    }
}

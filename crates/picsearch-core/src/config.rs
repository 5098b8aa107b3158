//! Configuration loaded from the process environment (and an optional .env file)

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::{
    DEFAULT_COLLECTION_NAME, DEFAULT_DB_NAME, DEFAULT_DIM, DEFAULT_IMAGES_DIR, DEFAULT_MAX_BYTES,
    DEFAULT_MAX_PIXELS, DEFAULT_MODEL, DEFAULT_NUM_CANDIDATES, DEFAULT_SEARCH_LIMIT,
    DEFAULT_VECTOR_INDEX, DEFAULT_VOYAGE_BASE_URL, PicsearchError, Result,
};

pub const ENV_VOYAGE_API_KEY: &str = "VOYAGE_API_KEY";
pub const ENV_MONGO_URI: &str = "MONGO_URI";
pub const ENV_DB_NAME: &str = "DB_NAME";
pub const ENV_COLLECTION_NAME: &str = "COLLECTION_NAME";
pub const ENV_IMAGES_DIR: &str = "IMAGES_DIR";
pub const ENV_VECTOR_INDEX: &str = "VECTOR_INDEX";
pub const ENV_EMBEDDING_DIM: &str = "EMBEDDING_DIM";
pub const ENV_VOYAGE_MODEL: &str = "VOYAGE_MODEL";
pub const ENV_VOYAGE_BASE_URL: &str = "VOYAGE_BASE_URL";
pub const ENV_NUM_CANDIDATES: &str = "NUM_CANDIDATES";
pub const ENV_SEARCH_LIMIT: &str = "SEARCH_LIMIT";
pub const ENV_MAX_IMAGE_PIXELS: &str = "MAX_IMAGE_PIXELS";
pub const ENV_MAX_IMAGE_BYTES: &str = "MAX_IMAGE_BYTES";

/// Runtime configuration, built once at startup and passed to every client.
#[derive(Clone)]
pub struct Config {
    /// Voyage AI API key
    pub voyage_api_key: String,
    /// MongoDB connection string
    pub mongo_uri: String,
    /// Database name
    pub db_name: String,
    /// Collection holding image records
    pub collection_name: String,
    /// Directory scanned by `ingest`
    pub images_dir: PathBuf,
    /// Name of the vector index on the embedding field
    pub vector_index: String,
    /// Expected embedding dimension
    pub dimension: usize,
    /// Embedding model name
    pub model: String,
    /// Embedding API base URL
    pub voyage_base_url: String,
    /// `$vectorSearch` candidate pool
    pub num_candidates: usize,
    /// Default number of search results
    pub search_limit: usize,
    /// Pixel count above which images are downscaled
    pub max_pixels: u64,
    /// Maximum encoded image payload in bytes
    pub max_bytes: u64,
}

impl Config {
    /// Populate the process environment from a .env file.
    ///
    /// With no explicit path a missing `.env` is ignored; an explicit path
    /// must exist and parse.
    pub fn load_env_file(path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| {
                    PicsearchError::Config(format!("cannot load {}: {}", path.display(), e))
                })?;
            }
            None => {
                if let Err(e) = dotenvy::dotenv() {
                    if !e.not_found() {
                        return Err(PicsearchError::Config(e.to_string()));
                    }
                }
            }
        }
        Ok(())
    }

    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(PicsearchError::MissingSetting(name));
        let or_default = |name: &str, default: &str| get(name).unwrap_or_else(|| default.to_string());

        let voyage_api_key = required(ENV_VOYAGE_API_KEY)?;
        let mongo_uri = required(ENV_MONGO_URI)?;

        let dimension: usize = parse_or(get(ENV_EMBEDDING_DIM), ENV_EMBEDDING_DIM, DEFAULT_DIM)?;
        if dimension == 0 {
            return Err(PicsearchError::InvalidSetting {
                name: ENV_EMBEDDING_DIM,
                value: "0".to_string(),
            });
        }

        Ok(Self {
            voyage_api_key,
            mongo_uri,
            db_name: or_default(ENV_DB_NAME, DEFAULT_DB_NAME),
            collection_name: or_default(ENV_COLLECTION_NAME, DEFAULT_COLLECTION_NAME),
            images_dir: PathBuf::from(or_default(ENV_IMAGES_DIR, DEFAULT_IMAGES_DIR)),
            vector_index: or_default(ENV_VECTOR_INDEX, DEFAULT_VECTOR_INDEX),
            dimension,
            model: or_default(ENV_VOYAGE_MODEL, DEFAULT_MODEL),
            voyage_base_url: or_default(ENV_VOYAGE_BASE_URL, DEFAULT_VOYAGE_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            num_candidates: parse_or(
                get(ENV_NUM_CANDIDATES),
                ENV_NUM_CANDIDATES,
                DEFAULT_NUM_CANDIDATES,
            )?,
            search_limit: parse_or(get(ENV_SEARCH_LIMIT), ENV_SEARCH_LIMIT, DEFAULT_SEARCH_LIMIT)?,
            max_pixels: parse_or(get(ENV_MAX_IMAGE_PIXELS), ENV_MAX_IMAGE_PIXELS, DEFAULT_MAX_PIXELS)?,
            max_bytes: parse_or(get(ENV_MAX_IMAGE_BYTES), ENV_MAX_IMAGE_BYTES, DEFAULT_MAX_BYTES)?,
        })
    }

    /// API key with all but the last four characters masked.
    ///
    /// Keys of eight characters or fewer are masked entirely.
    pub fn redacted_api_key(&self) -> String {
        if self.voyage_api_key.chars().count() <= 8 {
            return "****".to_string();
        }
        let visible: String = self
            .voyage_api_key
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("****{}", visible)
    }

    /// Connection string with any `user:password@` section masked.
    pub fn redacted_mongo_uri(&self) -> String {
        redact_uri(&self.mongo_uri)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("voyage_api_key", &self.redacted_api_key())
            .field("mongo_uri", &self.redacted_mongo_uri())
            .field("db_name", &self.db_name)
            .field("collection_name", &self.collection_name)
            .field("images_dir", &self.images_dir)
            .field("vector_index", &self.vector_index)
            .field("dimension", &self.dimension)
            .field("model", &self.model)
            .field("voyage_base_url", &self.voyage_base_url)
            .field("num_candidates", &self.num_candidates)
            .field("search_limit", &self.search_limit)
            .field("max_pixels", &self.max_pixels)
            .field("max_bytes", &self.max_bytes)
            .finish()
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, name: &'static str, default: T) -> Result<T> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| PicsearchError::InvalidSetting { name, value }),
        None => Ok(default),
    }
}

fn redact_uri(uri: &str) -> String {
    let Some(scheme_end) = uri.find("://") else {
        return uri.to_string();
    };
    let rest = &uri[scheme_end + 3..];
    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{}://****{}", &uri[..scheme_end], &rest[at..]),
        None => uri.to_string(),
    }
}

//! picsearch-core: Multimodal picture search library
//!
//! This library embeds local images with the Voyage AI multimodal embedding
//! API, stores the vectors in a MongoDB collection, and answers free-text
//! queries through the collection's `$vectorSearch` pipeline.

pub mod config;
pub mod consts;
pub mod discover;
pub mod embed;
pub mod image_prep;
pub mod ingest;
pub mod search;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use consts::*;
pub use embed::{Embedder, VoyageEmbedder};
pub use ingest::{IngestReport, Ingester};
pub use search::Searcher;
pub use storage::{ImageMetadata, ImageRecord, MongoStore, SearchResult, VectorStore};

#[derive(Debug, thiserror::Error)]
pub enum PicsearchError {
    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    InvalidSetting { name: &'static str, value: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Images directory not found: {0}")]
    ImagesDirNotFound(std::path::PathBuf),

    #[error("Search query is empty")]
    EmptyQuery,

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Embedding API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Search returned {returned} hits but none had the expected shape: {reason}")]
    MalformedHits { returned: usize, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PicsearchError>;

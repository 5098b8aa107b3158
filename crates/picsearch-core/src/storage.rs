//! MongoDB storage wrapper: path-keyed upserts and `$vectorSearch` queries

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{Document, doc, from_document};
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};

use crate::{Config, EMBEDDING_FIELD, PicsearchError, Result};

/// Metadata stored alongside each embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// File name without directory
    pub file_name: String,
    /// When the record was written
    pub ingested_at: DateTime<Utc>,
    /// File size on disk
    pub size_bytes: u64,
    /// Blake3 hash of the file content
    pub content_hash: String,
}

/// One stored document per image, keyed by `path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Absolute image path
    pub path: String,
    /// Embedding vector
    pub embedding: Vec<f32>,
    pub metadata: ImageMetadata,
}

/// A search result.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchResult {
    /// Path of the matched image
    pub path: String,
    /// Score (similarity)
    pub score: f64,
    #[serde(default)]
    pub metadata: Option<ImageMetadata>,
}

/// Vector storage backend.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert the record, replacing any existing record with the same path.
    async fn upsert(&self, record: &ImageRecord) -> Result<()>;

    /// Return up to `top_k` records nearest to `query`, best first.
    async fn vector_search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchResult>>;

    /// Number of stored records.
    async fn count(&self) -> Result<u64>;
}

/// Order results by descending score and keep at most `top_k`.
pub fn rank(mut results: Vec<SearchResult>, top_k: usize) -> Vec<SearchResult> {
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(top_k);
    results
}

/// Storage wrapper around a MongoDB Atlas collection.
pub struct MongoStore {
    collection: Collection<ImageRecord>,
    index_name: String,
    num_candidates: usize,
}

impl MongoStore {
    /// Connect to the configured cluster and verify it answers a ping.
    pub async fn connect(config: &Config) -> Result<Self> {
        let client = Client::with_uri_str(&config.mongo_uri).await?;
        let database = client.database(&config.db_name);
        database.run_command(doc! { "ping": 1 }).await?;

        tracing::debug!(
            "Connected to {}.{}",
            config.db_name,
            config.collection_name
        );

        Ok(Self {
            collection: database.collection(&config.collection_name),
            index_name: config.vector_index.clone(),
            num_candidates: config.num_candidates,
        })
    }

    fn pipeline(&self, query: &[f32], top_k: usize) -> Vec<Document> {
        search_pipeline(&self.index_name, query, self.num_candidates.max(top_k), top_k)
    }
}

#[async_trait]
impl VectorStore for MongoStore {
    async fn upsert(&self, record: &ImageRecord) -> Result<()> {
        let result = self
            .collection
            .replace_one(doc! { "path": record.path.as_str() }, record)
            .upsert(true)
            .await?;

        tracing::debug!(
            "Upserted {} (matched: {}, inserted: {})",
            record.path,
            result.matched_count,
            result.upserted_id.is_some()
        );

        Ok(())
    }

    async fn vector_search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let mut cursor = self.collection.aggregate(self.pipeline(query, top_k)).await?;

        let mut hits = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            hits.push(document);
        }

        decode_hits(hits, top_k)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }
}

/// Decode raw search hits, skipping malformed ones.
///
/// Fails when the server returned hits but none of them has the record shape.
fn decode_hits(hits: Vec<Document>, top_k: usize) -> Result<Vec<SearchResult>> {
    let returned = hits.len();
    let mut results = Vec::with_capacity(returned);
    let mut last_error = None;

    for document in hits {
        match from_document::<SearchResult>(document) {
            Ok(result) => results.push(result),
            Err(e) => {
                tracing::warn!("Skipping malformed search hit: {}", e);
                last_error = Some(e.to_string());
            }
        }
    }

    if results.is_empty() {
        if let Some(reason) = last_error {
            return Err(PicsearchError::MalformedHits { returned, reason });
        }
    } else if results.len() < returned {
        tracing::warn!(
            "Skipped {} of {} search hits",
            returned - results.len(),
            returned
        );
    }

    Ok(rank(results, top_k))
}

/// Build the `$vectorSearch` aggregation pipeline.
fn search_pipeline(
    index_name: &str,
    query: &[f32],
    num_candidates: usize,
    top_k: usize,
) -> Vec<Document> {
    vec![
        doc! {
            "$vectorSearch": {
                "index": index_name,
                "path": EMBEDDING_FIELD,
                "queryVector": query.to_vec(),
                "numCandidates": num_candidates as i64,
                "limit": top_k as i64,
            }
        },
        doc! {
            "$project": {
                "_id": 0,
                "path": 1,
                "metadata": 1,
                "score": { "$meta": "vectorSearchScore" },
            }
        },
    ]
}

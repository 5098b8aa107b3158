//! Search functionality

use crate::storage::{SearchResult, VectorStore};
use crate::{Embedder, PicsearchError, Result};

/// Searcher for querying the collection.
pub struct Searcher<'a, E: Embedder, S: VectorStore> {
    embedder: &'a E,
    store: &'a S,
}

impl<'a, E: Embedder, S: VectorStore> Searcher<'a, E, S> {
    pub fn new(embedder: &'a E, store: &'a S) -> Self {
        Self { embedder, store }
    }

    /// Search for images matching the query, best match first.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PicsearchError::EmptyQuery);
        }

        // Embed the query
        let query_embedding = self.embedder.embed_text(query).await?;

        // Search storage
        self.store.vector_search(&query_embedding, limit).await
    }
}

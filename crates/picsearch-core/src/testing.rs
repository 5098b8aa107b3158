//! In-memory stand-ins for the embedding API and the database

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::storage::{ImageRecord, SearchResult, VectorStore, rank};
use crate::{Embedder, PicsearchError, Result};

/// Deterministic embedder: an image embeds like the text of its file stem.
pub struct FakeEmbedder {
    dimension: usize,
    fail_on: HashSet<String>,
    image_calls: AtomicUsize,
    text_calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fail_on: HashSet::new(),
            image_calls: AtomicUsize::new(0),
            text_calls: AtomicUsize::new(0),
        }
    }

    /// Fail for an image file name or a query text.
    pub fn failing_on(mut self, name: &str) -> Self {
        self.fail_on.insert(name.to_string());
        self
    }

    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }

    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let hash = blake3::hash(text.as_bytes());
        let bytes = hash.as_bytes();
        (0..self.dimension)
            .map(|i| bytes[i % bytes.len()] as f32 / 255.0 - 0.5)
            .collect()
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed_image(&self, path: &Path) -> Result<Vec<f32>> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if self.fail_on.contains(&name) {
            return Err(PicsearchError::Embedding(format!("simulated failure for {}", name)));
        }
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(self.vector_for(&stem))
    }

    async fn embed_text(&self, query: &str) -> Result<Vec<f32>> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on.contains(query) {
            return Err(PicsearchError::Embedding(format!("simulated failure for {}", query)));
        }
        Ok(self.vector_for(query))
    }
}

/// Path-keyed store ranking by cosine similarity.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, ImageRecord>>,
    fail_on: HashSet<String>,
}

impl MemoryStore {
    /// Reject upserts for records with this file name.
    pub fn failing_on(mut self, file_name: &str) -> Self {
        self.fail_on.insert(file_name.to_string());
        self
    }

    pub fn records(&self) -> Vec<ImageRecord> {
        self.records.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn upsert(&self, record: &ImageRecord) -> Result<()> {
        if self.fail_on.contains(&record.metadata.file_name) {
            return Err(PicsearchError::Io(std::io::Error::other("simulated write failure")));
        }
        self.records
            .lock()
            .unwrap()
            .insert(record.path.clone(), record.clone());
        Ok(())
    }

    async fn vector_search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        let results = self
            .records
            .lock()
            .unwrap()
            .values()
            .map(|record| SearchResult {
                path: record.path.clone(),
                score: cosine(query, &record.embedding),
                metadata: Some(record.metadata.clone()),
            })
            .collect();
        Ok(rank(results, top_k))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.records.lock().unwrap().len() as u64)
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

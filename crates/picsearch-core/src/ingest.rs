//! Ingestion logic: walk the images directory, embed each picture, upsert its record

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::storage::{ImageMetadata, ImageRecord, VectorStore};
use crate::{Embedder, PicsearchError, Result, discover};

/// Progress events emitted during ingestion.
#[derive(Debug, Clone)]
pub enum ProgressEvent<'a> {
    /// Directory scanned; `count` images will be processed.
    Discovered { count: usize },
    /// Embedding a specific file.
    Embedding {
        current: usize,
        total: usize,
        path: &'a Path,
    },
}

/// Type alias for progress callback.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Where and how to look for images.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub images_dir: PathBuf,
    /// Descend into subdirectories
    pub recursive: bool,
}

/// A file that could not be ingested.
#[derive(Debug, Clone)]
pub struct IngestFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of an ingestion run.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Supported image files found
    pub discovered: usize,
    /// Files embedded and stored
    pub succeeded: Vec<PathBuf>,
    /// Files that failed, in processing order
    pub failed: Vec<IngestFailure>,
    /// Non-image files ignored
    pub skipped: usize,
}

impl IngestReport {
    /// True when no file failed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// The ingester orchestrates discovery, embedding, and storage.
pub struct Ingester<'a, E: Embedder, S: VectorStore> {
    embedder: &'a E,
    store: &'a S,
    options: IngestOptions,
    progress_callback: Option<ProgressCallback>,
}

impl<'a, E: Embedder, S: VectorStore> Ingester<'a, E, S> {
    pub fn new(embedder: &'a E, store: &'a S, options: IngestOptions) -> Self {
        Self {
            embedder,
            store,
            options,
            progress_callback: None,
        }
    }

    /// Set a callback to receive progress updates during ingestion.
    pub fn set_progress_callback(&mut self, callback: ProgressCallback) {
        self.progress_callback = Some(callback);
    }

    /// Emit a progress event if a callback is registered.
    fn emit_progress(&self, event: ProgressEvent) {
        if let Some(ref callback) = self.progress_callback {
            callback(event);
        }
    }

    /// Ingest every supported image, continuing past per-file failures.
    ///
    /// Fails only when the images directory itself cannot be read.
    pub async fn ingest(&self) -> Result<IngestReport> {
        let dir = self
            .options
            .images_dir
            .canonicalize()
            .map_err(|_| PicsearchError::ImagesDirNotFound(self.options.images_dir.clone()))?;

        let discovered = discover::find_images(&dir, self.options.recursive)?;
        let total = discovered.images.len();

        let mut report = IngestReport {
            discovered: total,
            skipped: discovered.skipped,
            ..Default::default()
        };

        self.emit_progress(ProgressEvent::Discovered { count: total });

        for (i, path) in discovered.images.into_iter().enumerate() {
            self.emit_progress(ProgressEvent::Embedding {
                current: i + 1,
                total,
                path: &path,
            });

            match self.ingest_file(&path).await {
                Ok(()) => {
                    tracing::info!("Indexed: {}", path.display());
                    report.succeeded.push(path);
                }
                Err(e) => {
                    tracing::warn!("Failed to ingest {}: {}", path.display(), e);
                    report.failed.push(IngestFailure {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// Embed and store a single file.
    async fn ingest_file(&self, path: &Path) -> Result<()> {
        let content = std::fs::read(path)?;
        let content_hash = blake3::hash(&content).to_hex().to_string();
        let size_bytes = content.len() as u64;
        drop(content);

        let embedding = self.embedder.embed_image(path).await?;

        let record = ImageRecord {
            path: path.to_string_lossy().to_string(),
            embedding,
            metadata: ImageMetadata {
                file_name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default(),
                ingested_at: Utc::now(),
                size_bytes,
                content_hash,
            },
        };

        self.store.upsert(&record).await
    }
}

/// Default database name
pub const DEFAULT_DB_NAME: &str = "picsearch";

/// Default collection holding one document per image
pub const DEFAULT_COLLECTION_NAME: &str = "pictures";

/// Default directory scanned by `ingest`
pub const DEFAULT_IMAGES_DIR: &str = "./my_pictures";

/// Default name of the Atlas vector index on the `embedding` field
pub const DEFAULT_VECTOR_INDEX: &str = "default";

/// Default multimodal embedding model
pub const DEFAULT_MODEL: &str = "voyage-multimodal-3.5";

/// Default embedding dimension for voyage-multimodal-3.5
pub const DEFAULT_DIM: usize = 1024;

/// Voyage AI REST endpoint root
pub const DEFAULT_VOYAGE_BASE_URL: &str = "https://api.voyageai.com/v1";

/// Candidate pool handed to `$vectorSearch`
pub const DEFAULT_NUM_CANDIDATES: usize = 100;

/// Default number of search results
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// Images above this pixel count are downscaled before upload (15MP)
pub const DEFAULT_MAX_PIXELS: u64 = 15_000_000;

/// Upper bound for an encoded image payload (20MB)
pub const DEFAULT_MAX_BYTES: u64 = 20_000_000;

/// Image extensions picked up by `ingest` (compared lowercase)
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Field holding the vector in stored documents
pub const EMBEDDING_FIELD: &str = "embedding";

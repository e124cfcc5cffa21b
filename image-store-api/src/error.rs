//! Error types for image store operations.

/// Result type for image store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Error types for image store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Repository not found
    #[error("repository not found: {0}")]
    RepoNotFound(String),

    /// Repository path is blocked by a regular file
    #[error("repository path is not a directory: {0}")]
    RepoIsNotDir(String),

    /// Repository layout marker names an unsupported version
    #[error("repository has unsupported layout version: {0}")]
    RepoBadVersion(String),

    /// Repository layout marker is unreadable
    #[error("bad image layout marker: {0}")]
    BadLayoutVersion(String),

    /// Manifest not found
    #[error("manifest not found: {0}")]
    ManifestNotFound(String),

    /// Manifest body could not be parsed or validated
    #[error("bad manifest: {0}")]
    BadManifest(String),

    /// Manifest reference contradicts the manifest content
    #[error("manifest conflict: {0}")]
    ManifestConflict(String),

    /// Unsupported manifest media type
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Blob not found
    #[error("blob not found: {0}")]
    BlobNotFound(String),

    /// Blob is still referenced by a manifest
    #[error("blob is referenced: {0}")]
    BlobReferenced(String),

    /// Declared digest does not match the content
    #[error("bad blob digest: {0}")]
    BadBlobDigest(String),

    /// Chunk offset does not continue the staged upload
    #[error("bad upload range: chunk starts at {offset}, session has {staged} bytes")]
    BadUploadRange {
        /// Offset the chunk claims to start at
        offset: u64,
        /// Bytes currently staged for the session
        staged: u64,
    },

    /// Upload session not found
    #[error("upload not found: {0}")]
    UploadNotFound(String),

    /// Hard-link deduplication failed
    #[error("dedupe failed: {0}")]
    DedupeFailed(#[source] std::io::Error),

    /// Backing filesystem cannot hard link
    #[error("filesystem does not support hard links")]
    DedupeNotSupported,

    /// Descriptor size disagrees with the stored blob
    #[error("invalid size: descriptor says {expected}, blob has {actual} bytes")]
    InvalidSize {
        /// Size declared by the descriptor
        expected: u64,
        /// Size of the blob on disk
        actual: u64,
    },

    /// Underlying storage I/O error
    #[error("storage I/O error: {0}")]
    StorageIo(#[from] std::io::Error),
}

impl StoreError {
    /// Whether this error means the named entity does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::RepoNotFound(_)
                | StoreError::ManifestNotFound(_)
                | StoreError::BlobNotFound(_)
                | StoreError::UploadNotFound(_)
        )
    }

    /// Get the error code for OCI error responses
    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::RepoNotFound(_) | StoreError::RepoIsNotDir(_) => "NAME_UNKNOWN",
            StoreError::RepoBadVersion(_) | StoreError::BadLayoutVersion(_) => "NAME_INVALID",
            StoreError::ManifestNotFound(_) => "MANIFEST_UNKNOWN",
            StoreError::BadManifest(_) | StoreError::ManifestConflict(_) => "MANIFEST_INVALID",
            StoreError::UnsupportedMediaType(_) => "MANIFEST_INVALID",
            StoreError::BlobNotFound(_) => "BLOB_UNKNOWN",
            StoreError::BlobReferenced(_) => "DENIED",
            StoreError::BadBlobDigest(_) => "DIGEST_INVALID",
            StoreError::BadUploadRange { .. } => "BLOB_UPLOAD_INVALID",
            StoreError::UploadNotFound(_) => "BLOB_UPLOAD_UNKNOWN",
            StoreError::InvalidSize { .. } => "SIZE_INVALID",
            StoreError::DedupeFailed(_)
            | StoreError::DedupeNotSupported
            | StoreError::StorageIo(_) => "UNKNOWN",
        }
    }
}

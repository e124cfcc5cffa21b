//! The image store contract.

use std::fmt;

use async_trait::async_trait;
use camino::Utf8Path;
use tokio::io;

use crate::digest::Digest;
use crate::error::StoreResult;

/// A reader stream supplying upload or manifest bytes.
pub type Reader<'r> = dyn io::AsyncBufRead + Unpin + Send + Sync + 'r;

/// An owned blob stream handed back to callers.
pub type BlobStream = Box<dyn io::AsyncBufRead + Unpin + Send + Sync>;

/// A manifest as returned by [`ImageStore::image_manifest`].
#[derive(Debug, Clone)]
pub struct ManifestPayload {
    /// The exact manifest bytes as they were stored.
    pub body: Vec<u8>,

    /// Content digest of `body`.
    pub digest: Digest,

    /// Media type recorded for the manifest.
    pub media_type: String,
}

/// A content-addressed store of repositories, blobs and manifests.
///
/// Implementations keep an OCI Image Layout per repository on disk (or an
/// equivalent in their backing medium). The trait is deliberately narrow so
/// that in-memory or object-store variants can substitute for the
/// filesystem implementation.
#[async_trait]
pub trait ImageStore: fmt::Debug + Send + Sync {
    /// Short name identifying the backend, used in logs.
    fn name(&self) -> &str;

    /// Create the on-disk structure for a repository if it is missing.
    async fn init_repo(&self, repo: &str) -> StoreResult<()>;

    /// Check that a repository has a complete, supported layout.
    async fn validate_repo(&self, repo: &str) -> StoreResult<bool>;

    /// List all valid repositories beneath the store root, lexicographically.
    async fn repositories(&self) -> StoreResult<Vec<String>>;

    /// List the tags recorded in a repository's index.
    async fn image_tags(&self, repo: &str) -> StoreResult<Vec<String>>;

    /// Fetch a manifest by tag or digest.
    async fn image_manifest(&self, repo: &str, reference: &str) -> StoreResult<ManifestPayload>;

    /// Store a manifest and bind it to `reference`, returning its digest.
    async fn put_image_manifest(
        &self,
        repo: &str,
        reference: &str,
        media_type: &str,
        body: &[u8],
    ) -> StoreResult<Digest>;

    /// Remove a manifest reference from the index. The blob is retained.
    async fn delete_image_manifest(&self, repo: &str, reference: &str) -> StoreResult<()>;

    /// Open a new upload session, returning its opaque id.
    async fn new_blob_upload(&self, repo: &str) -> StoreResult<String>;

    /// Number of bytes staged so far for an upload session.
    async fn blob_upload_offset(&self, repo: &str, session: &str) -> StoreResult<u64>;

    /// Append a chunk declared to span `from..=to`, returning the new
    /// staged size. The chunk must continue exactly where the session
    /// currently ends.
    async fn put_blob_chunk(
        &self,
        repo: &str,
        session: &str,
        from: u64,
        to: u64,
        body: &mut Reader<'_>,
    ) -> StoreResult<u64>;

    /// Append until EOF, returning the number of bytes appended.
    async fn put_blob_chunk_streamed(
        &self,
        repo: &str,
        session: &str,
        body: &mut Reader<'_>,
    ) -> StoreResult<u64>;

    /// Commit a staged upload into the blob store under `digest`.
    ///
    /// Any remaining `body` bytes are appended before the content is
    /// verified against `digest`.
    async fn finish_blob_upload(
        &self,
        repo: &str,
        session: &str,
        body: &mut Reader<'_>,
        digest: &Digest,
    ) -> StoreResult<()>;

    /// Discard an upload session and its staged bytes.
    async fn delete_blob_upload(&self, repo: &str, session: &str) -> StoreResult<()>;

    /// Check that a blob exists in the repository, returning its size.
    ///
    /// Stores configured for deduplication may satisfy the check by hard
    /// linking an identical blob from a sibling repository.
    async fn check_blob(&self, repo: &str, digest: &Digest) -> StoreResult<(bool, u64)>;

    /// Open a blob for reading, returning the stream and its size.
    async fn get_blob(
        &self,
        repo: &str,
        digest: &Digest,
        media_type: &str,
    ) -> StoreResult<(BlobStream, u64)>;

    /// Remove a blob from this repository only; hard-link copies in other
    /// repositories survive. Refuses while the blob is referenced.
    async fn delete_blob(&self, repo: &str, digest: &Digest) -> StoreResult<()>;

    /// Replace `dst` with a hard link to `src`. On failure `dst` is left
    /// unchanged.
    async fn dedupe_blob(&self, src: &Utf8Path, digest: &Digest, dst: &Utf8Path)
        -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_obj_safe!(ImageStore);
}

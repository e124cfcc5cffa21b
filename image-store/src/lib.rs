//! # Content-addressed image store
//!
//! Filesystem-backed storage engine for OCI images following the
//! [OCI Image Layout](https://github.com/opencontainers/image-spec/blob/main/image-layout.md):
//! content-addressed blobs, per-repository `index.json` commits, resumable
//! chunked uploads, and best-effort cross-repository deduplication through
//! hard links.
//!
//! ## Features
//!
//! - On-disk layout readable by external OCI tooling
//! - Resumable blob upload sessions with digest verification
//! - Atomic manifest updates with replace-by-tag semantics
//! - Hard-link deduplication of identical blobs across repositories
//! - Multi-store routing by repository name prefix
//!
//! ## Example
//!
//! ```no_run
//! use image_store::{FsImageStore, ImageStore, Store};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Store::new(FsImageStore::new("/var/lib/registry", false, true).await?);
//!
//! store.init_repo("library/alpine").await?;
//! let session = store.new_blob_upload("library/alpine").await?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

mod dedupe;
mod fs;
mod layout;
mod lock;
mod multi;
mod upload;

pub use fs::FsImageStore;
pub use layout::check_hard_link;
pub use layout::validate_hard_link;
pub use multi::MultiStore;

#[doc(inline)]
pub use image_store_api::{
    BlobStream, Digest, Digester, ImageStore, ManifestPayload, Reader, StoreError, StoreResult,
};

fn default_dedupe() -> bool {
    true
}

/// Configuration for one backing store directory.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SubStoreConfig {
    /// Root directory of the sub-store.
    pub root: Utf8PathBuf,

    /// Attempt hard-link deduplication on blob commit.
    #[serde(default = "default_dedupe")]
    pub dedupe: bool,

    /// Reserved; garbage collection is not performed by the engine.
    #[serde(default)]
    pub gc: bool,
}

/// Configuration for the storage engine: a default store and optional
/// sub-stores mounted under repository name prefixes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StoreConfig {
    /// Root directory of the default store.
    pub root: Utf8PathBuf,

    /// Attempt hard-link deduplication on blob commit.
    #[serde(default = "default_dedupe")]
    pub dedupe: bool,

    /// Reserved; garbage collection is not performed by the engine.
    #[serde(default)]
    pub gc: bool,

    /// Sub-stores by route prefix, e.g. `"/team-a"`.
    #[serde(default)]
    pub sub_stores: BTreeMap<String, SubStoreConfig>,
}

impl StoreConfig {
    /// Build the configured store, probing each root as needed.
    #[tracing::instrument]
    pub async fn build(self) -> StoreResult<Store> {
        let default = FsImageStore::new(&self.root, self.gc, self.dedupe).await?;
        if self.sub_stores.is_empty() {
            return Ok(Store::new(default));
        }

        let mut multi = MultiStore::new(default);
        for (prefix, sub) in self.sub_stores {
            let store = FsImageStore::new(&sub.root, sub.gc, sub.dedupe).await?;
            multi.mount(&prefix, store);
        }
        Ok(Store::new(multi))
    }
}

/// Cloneable handle over an image store implementation.
///
/// This is the façade handed to the HTTP and query collaborators; it
/// forwards every operation to the wrapped [`ImageStore`].
#[derive(Debug, Clone)]
pub struct Store {
    inner: Arc<dyn ImageStore>,
}

impl<S> From<S> for Store
where
    S: ImageStore + 'static,
{
    fn from(value: S) -> Self {
        Store::new(value)
    }
}

impl Store {
    pub fn new<S: ImageStore + 'static>(store: S) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    #[tracing::instrument(skip(self), fields(store = self.inner.name()))]
    pub async fn init_repo(&self, repo: &str) -> StoreResult<()> {
        self.inner.init_repo(repo).await
    }

    #[tracing::instrument(skip(self), fields(store = self.inner.name()))]
    pub async fn validate_repo(&self, repo: &str) -> StoreResult<bool> {
        self.inner.validate_repo(repo).await
    }

    #[tracing::instrument(skip(self), fields(store = self.inner.name()))]
    pub async fn repositories(&self) -> StoreResult<Vec<String>> {
        self.inner.repositories().await
    }

    #[tracing::instrument(skip(self), fields(store = self.inner.name()))]
    pub async fn image_tags(&self, repo: &str) -> StoreResult<Vec<String>> {
        self.inner.image_tags(repo).await
    }

    #[tracing::instrument(skip(self), fields(store = self.inner.name()))]
    pub async fn image_manifest(
        &self,
        repo: &str,
        reference: &str,
    ) -> StoreResult<ManifestPayload> {
        self.inner.image_manifest(repo, reference).await
    }

    #[tracing::instrument(skip(self, body), fields(store = self.inner.name()))]
    pub async fn put_image_manifest(
        &self,
        repo: &str,
        reference: &str,
        media_type: &str,
        body: &[u8],
    ) -> StoreResult<Digest> {
        self.inner
            .put_image_manifest(repo, reference, media_type, body)
            .await
    }

    #[tracing::instrument(skip(self), fields(store = self.inner.name()))]
    pub async fn delete_image_manifest(&self, repo: &str, reference: &str) -> StoreResult<()> {
        self.inner.delete_image_manifest(repo, reference).await
    }

    #[tracing::instrument(skip(self), fields(store = self.inner.name()))]
    pub async fn new_blob_upload(&self, repo: &str) -> StoreResult<String> {
        self.inner.new_blob_upload(repo).await
    }

    #[tracing::instrument(skip(self), fields(store = self.inner.name()))]
    pub async fn blob_upload_offset(&self, repo: &str, session: &str) -> StoreResult<u64> {
        self.inner.blob_upload_offset(repo, session).await
    }

    #[tracing::instrument(skip(self, body), fields(store = self.inner.name()))]
    pub async fn put_blob_chunk(
        &self,
        repo: &str,
        session: &str,
        from: u64,
        to: u64,
        body: &mut Reader<'_>,
    ) -> StoreResult<u64> {
        self.inner
            .put_blob_chunk(repo, session, from, to, body)
            .await
    }

    #[tracing::instrument(skip(self, body), fields(store = self.inner.name()))]
    pub async fn put_blob_chunk_streamed(
        &self,
        repo: &str,
        session: &str,
        body: &mut Reader<'_>,
    ) -> StoreResult<u64> {
        self.inner.put_blob_chunk_streamed(repo, session, body).await
    }

    #[tracing::instrument(skip(self, body), fields(store = self.inner.name()))]
    pub async fn finish_blob_upload(
        &self,
        repo: &str,
        session: &str,
        body: &mut Reader<'_>,
        digest: &Digest,
    ) -> StoreResult<()> {
        self.inner
            .finish_blob_upload(repo, session, body, digest)
            .await
    }

    #[tracing::instrument(skip(self), fields(store = self.inner.name()))]
    pub async fn delete_blob_upload(&self, repo: &str, session: &str) -> StoreResult<()> {
        self.inner.delete_blob_upload(repo, session).await
    }

    #[tracing::instrument(skip(self), fields(store = self.inner.name()))]
    pub async fn check_blob(&self, repo: &str, digest: &Digest) -> StoreResult<(bool, u64)> {
        self.inner.check_blob(repo, digest).await
    }

    #[tracing::instrument(skip(self), fields(store = self.inner.name()))]
    pub async fn get_blob(
        &self,
        repo: &str,
        digest: &Digest,
        media_type: &str,
    ) -> StoreResult<(BlobStream, u64)> {
        self.inner.get_blob(repo, digest, media_type).await
    }

    #[tracing::instrument(skip(self), fields(store = self.inner.name()))]
    pub async fn delete_blob(&self, repo: &str, digest: &Digest) -> StoreResult<()> {
        self.inner.delete_blob(repo, digest).await
    }

    #[tracing::instrument(skip(self), fields(store = self.inner.name()))]
    pub async fn dedupe_blob(
        &self,
        src: &Utf8Path,
        digest: &Digest,
        dst: &Utf8Path,
    ) -> StoreResult<()> {
        self.inner.dedupe_blob(src, digest, dst).await
    }
}

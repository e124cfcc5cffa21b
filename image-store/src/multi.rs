//! A store that routes repositories to sub-stores by name prefix.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use camino::Utf8Path;

use image_store_api::{
    BlobStream, Digest, ImageStore, ManifestPayload, Reader, StoreResult,
};

/// Routes operations to a default store or to sub-stores mounted under
/// repository name prefixes.
///
/// The longest matching prefix wins; the prefix is stripped before the
/// repository name reaches the sub-store, and put back when sub-store
/// listings are merged. Everything else goes to the default store.
#[derive(Debug)]
pub struct MultiStore {
    default: Arc<dyn ImageStore>,
    routes: BTreeMap<String, Arc<dyn ImageStore>>,
}

impl MultiStore {
    /// Create a router with only a default store.
    pub fn new<S>(default: S) -> Self
    where
        S: ImageStore + 'static,
    {
        Self {
            default: Arc::new(default),
            routes: BTreeMap::new(),
        }
    }

    /// Mount a sub-store under a route prefix such as `/team-a`.
    pub fn mount<S>(&mut self, prefix: &str, store: S)
    where
        S: ImageStore + 'static,
    {
        let prefix = prefix.trim_matches('/').to_string();
        assert!(!prefix.is_empty(), "sub-store prefix must not be empty");
        self.routes.insert(prefix, Arc::new(store));
    }

    /// Resolve a repository name to its backing store and the name the
    /// store sees.
    fn route<'s, 'r>(&'s self, repo: &'r str) -> (&'s Arc<dyn ImageStore>, &'r str) {
        let mut best: Option<(&String, &Arc<dyn ImageStore>, &str)> = None;
        for (prefix, store) in &self.routes {
            let Some(rest) = repo.strip_prefix(prefix.as_str()) else {
                continue;
            };
            let Some(rest) = rest.strip_prefix('/') else {
                continue;
            };
            if rest.is_empty() {
                continue;
            }
            if best.map_or(true, |(current, _, _)| prefix.len() > current.len()) {
                best = Some((prefix, store, rest));
            }
        }

        match best {
            Some((prefix, store, rest)) => {
                tracing::trace!(repo, prefix = %prefix, "routing to sub-store");
                (store, rest)
            }
            None => (&self.default, repo),
        }
    }
}

#[async_trait]
impl ImageStore for MultiStore {
    fn name(&self) -> &str {
        "multi"
    }

    async fn init_repo(&self, repo: &str) -> StoreResult<()> {
        let (store, repo) = self.route(repo);
        store.init_repo(repo).await
    }

    async fn validate_repo(&self, repo: &str) -> StoreResult<bool> {
        let (store, repo) = self.route(repo);
        store.validate_repo(repo).await
    }

    async fn repositories(&self) -> StoreResult<Vec<String>> {
        let mut repos = self.default.repositories().await?;
        for (prefix, store) in &self.routes {
            for repo in store.repositories().await? {
                repos.push(format!("{prefix}/{repo}"));
            }
        }
        repos.sort();
        Ok(repos)
    }

    async fn image_tags(&self, repo: &str) -> StoreResult<Vec<String>> {
        let (store, repo) = self.route(repo);
        store.image_tags(repo).await
    }

    async fn image_manifest(&self, repo: &str, reference: &str) -> StoreResult<ManifestPayload> {
        let (store, repo) = self.route(repo);
        store.image_manifest(repo, reference).await
    }

    async fn put_image_manifest(
        &self,
        repo: &str,
        reference: &str,
        media_type: &str,
        body: &[u8],
    ) -> StoreResult<Digest> {
        let (store, repo) = self.route(repo);
        store
            .put_image_manifest(repo, reference, media_type, body)
            .await
    }

    async fn delete_image_manifest(&self, repo: &str, reference: &str) -> StoreResult<()> {
        let (store, repo) = self.route(repo);
        store.delete_image_manifest(repo, reference).await
    }

    async fn new_blob_upload(&self, repo: &str) -> StoreResult<String> {
        let (store, repo) = self.route(repo);
        store.new_blob_upload(repo).await
    }

    async fn blob_upload_offset(&self, repo: &str, session: &str) -> StoreResult<u64> {
        let (store, repo) = self.route(repo);
        store.blob_upload_offset(repo, session).await
    }

    async fn put_blob_chunk(
        &self,
        repo: &str,
        session: &str,
        from: u64,
        to: u64,
        body: &mut Reader<'_>,
    ) -> StoreResult<u64> {
        let (store, repo) = self.route(repo);
        store.put_blob_chunk(repo, session, from, to, body).await
    }

    async fn put_blob_chunk_streamed(
        &self,
        repo: &str,
        session: &str,
        body: &mut Reader<'_>,
    ) -> StoreResult<u64> {
        let (store, repo) = self.route(repo);
        store.put_blob_chunk_streamed(repo, session, body).await
    }

    async fn finish_blob_upload(
        &self,
        repo: &str,
        session: &str,
        body: &mut Reader<'_>,
        digest: &Digest,
    ) -> StoreResult<()> {
        let (store, repo) = self.route(repo);
        store.finish_blob_upload(repo, session, body, digest).await
    }

    async fn delete_blob_upload(&self, repo: &str, session: &str) -> StoreResult<()> {
        let (store, repo) = self.route(repo);
        store.delete_blob_upload(repo, session).await
    }

    async fn check_blob(&self, repo: &str, digest: &Digest) -> StoreResult<(bool, u64)> {
        let (store, repo) = self.route(repo);
        store.check_blob(repo, digest).await
    }

    async fn get_blob(
        &self,
        repo: &str,
        digest: &Digest,
        media_type: &str,
    ) -> StoreResult<(BlobStream, u64)> {
        let (store, repo) = self.route(repo);
        store.get_blob(repo, digest, media_type).await
    }

    async fn delete_blob(&self, repo: &str, digest: &Digest) -> StoreResult<()> {
        let (store, repo) = self.route(repo);
        store.delete_blob(repo, digest).await
    }

    async fn dedupe_blob(
        &self,
        src: &Utf8Path,
        digest: &Digest,
        dst: &Utf8Path,
    ) -> StoreResult<()> {
        self.default.dedupe_blob(src, digest, dst).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::FsImageStore;
    use camino::Utf8Path;

    async fn fs_store(dir: &tempfile::TempDir) -> FsImageStore {
        let root = Utf8Path::from_path(dir.path()).unwrap();
        FsImageStore::new(root, false, false).await.unwrap()
    }

    #[tokio::test]
    async fn longest_prefix_wins() {
        let (a, b, c) = (
            tempfile::tempdir().unwrap(),
            tempfile::tempdir().unwrap(),
            tempfile::tempdir().unwrap(),
        );

        let mut multi = MultiStore::new(fs_store(&a).await);
        multi.mount("/team-a", fs_store(&b).await);
        multi.mount("/team-a/infra", fs_store(&c).await);

        let (_, repo) = multi.route("team-a/redis");
        assert_eq!(repo, "redis");

        let (_, repo) = multi.route("team-a/infra/redis");
        assert_eq!(repo, "redis");

        let (_, repo) = multi.route("team-b/redis");
        assert_eq!(repo, "team-b/redis");

        // a name equal to a bare prefix has no repository left over
        let (_, repo) = multi.route("team-a");
        assert_eq!(repo, "team-a");
    }

    #[tokio::test]
    async fn listings_are_reprefixed() {
        let (a, b) = (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap());

        let mut multi = MultiStore::new(fs_store(&a).await);
        multi.mount("/team-a", fs_store(&b).await);

        multi.init_repo("postgres").await.unwrap();
        multi.init_repo("team-a/redis").await.unwrap();

        let repos = multi.repositories().await.unwrap();
        assert_eq!(repos, vec!["postgres", "team-a/redis"]);

        // the sub-store itself only knows the stripped name
        let sub_root = Utf8Path::from_path(b.path()).unwrap();
        assert!(sub_root.join("redis/oci-layout").is_file());
    }
}

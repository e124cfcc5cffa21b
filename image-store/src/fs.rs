//! Filesystem-backed image store keeping an OCI Image Layout per
//! repository.

use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use oci_spec::image::{
    Descriptor, DescriptorBuilder, ImageIndex, ImageManifest, MediaType,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};

use image_store_api::{
    BlobStream, Digest, Digester, ImageStore, ManifestPayload, Reader, StoreError, StoreResult,
};

use crate::dedupe;
use crate::layout::{self, BLOBS_DIR, INDEX_FILE, LAYOUT_FILE, REF_NAME_ANNOTATION, UPLOADS_DIR};
use crate::lock::RepoLocks;
use crate::upload;

/// Image store rooted at a local directory.
///
/// Repositories are subdirectories in OCI Image Layout form; blobs are
/// immutable files under `blobs/sha256/`, and `index.json` rewrites are the
/// commit point for manifest visibility. With `dedupe` enabled, identical
/// blobs across repositories of the same store collapse onto one inode via
/// hard links.
#[derive(Debug)]
pub struct FsImageStore {
    root: Utf8PathBuf,
    dedupe: bool,
    gc: bool,
    locks: RepoLocks,
}

impl FsImageStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    ///
    /// When `dedupe` is requested the backing filesystem is probed for hard
    /// link support; if the probe fails the store degrades to plain storage
    /// with a warning. The `gc` flag is accepted and reserved.
    pub async fn new(root: impl AsRef<Utf8Path>, gc: bool, dedupe: bool) -> StoreResult<Self> {
        let root = root.as_ref().to_owned();
        tokio::fs::create_dir_all(&root).await?;

        let dedupe = if dedupe {
            match layout::validate_hard_link(&root).await {
                Ok(()) => true,
                Err(_) => {
                    tracing::warn!(
                        %root,
                        "filesystem does not support hard links, storing without dedupe"
                    );
                    false
                }
            }
        } else {
            false
        };

        Ok(Self {
            root,
            dedupe,
            gc,
            locks: RepoLocks::new(),
        })
    }

    /// The store root directory.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Whether hard-link deduplication is active.
    pub fn dedupe_enabled(&self) -> bool {
        self.dedupe
    }

    /// Whether garbage collection was requested (reserved).
    pub fn gc_enabled(&self) -> bool {
        self.gc
    }

    fn repo_root(&self, repo: &str) -> Utf8PathBuf {
        self.root.join(repo)
    }

    fn oci_digest(digest: &Digest) -> oci_spec::image::Digest {
        digest.to_string().parse().expect("canonical digest form")
    }

    /// Create the repository structure without taking the lock; callers
    /// must hold the write lock for `repo`.
    async fn init_repo_locked(&self, repo: &str) -> StoreResult<()> {
        let root = self.repo_root(repo);

        match tokio::fs::metadata(&root).await {
            Ok(metadata) if !metadata.is_dir() => {
                return Err(StoreError::RepoIsNotDir(repo.to_string()))
            }
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        tokio::fs::create_dir_all(layout::blobs_dir(&root)).await?;
        tokio::fs::create_dir_all(root.join(UPLOADS_DIR)).await?;

        let marker = root.join(LAYOUT_FILE);
        if tokio::fs::metadata(&marker).await.is_err() {
            tokio::fs::write(&marker, layout::layout_marker()?).await?;
        }

        if tokio::fs::metadata(root.join(INDEX_FILE)).await.is_err() {
            self.write_index(repo, &layout::index_with(Vec::new())?)
                .await?;
        }

        Ok(())
    }

    async fn validate_repo_at(&self, repo: &str, root: &Utf8Path) -> StoreResult<bool> {
        let mut entries = tokio::fs::read_dir(root)
            .await
            .map_err(|_| StoreError::RepoNotFound(repo.to_string()))?;

        let mut has_index = false;
        let mut has_marker = false;
        let mut blobs_is_dir = false;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let file_type = entry.file_type().await?;
            if name == INDEX_FILE {
                has_index = file_type.is_file();
            } else if name == LAYOUT_FILE {
                has_marker = file_type.is_file();
            } else if name == BLOBS_DIR {
                blobs_is_dir = file_type.is_dir();
            }
        }

        if !has_index || !has_marker || !blobs_is_dir {
            return Ok(false);
        }

        let marker = tokio::fs::read(root.join(LAYOUT_FILE)).await?;
        layout::validate_layout_marker(repo, &marker)?;

        let index = tokio::fs::read(root.join(INDEX_FILE)).await?;
        if serde_json::from_slice::<ImageIndex>(&index).is_err() {
            return Ok(false);
        }

        Ok(true)
    }

    async fn is_valid_repo(&self, repo: &str, root: &Utf8Path) -> bool {
        matches!(self.validate_repo_at(repo, root).await, Ok(true))
    }

    async fn read_index(&self, repo: &str) -> StoreResult<ImageIndex> {
        let bytes = tokio::fs::read(self.repo_root(repo).join(INDEX_FILE))
            .await
            .map_err(|err| {
                if err.kind() == ErrorKind::NotFound {
                    StoreError::ManifestNotFound(repo.to_string())
                } else {
                    StoreError::StorageIo(err)
                }
            })?;
        serde_json::from_slice(&bytes)
            .map_err(|_| StoreError::ManifestNotFound(repo.to_string()))
    }

    /// Rewrite `index.json` atomically: sibling temp file, fsync, rename.
    async fn write_index(&self, repo: &str, index: &ImageIndex) -> StoreResult<()> {
        let path = self.repo_root(repo).join(INDEX_FILE);
        let tmp = Utf8PathBuf::from(format!("{path}.tmp"));

        let bytes = serde_json::to_vec(index).map_err(|err| StoreError::StorageIo(err.into()))?;
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    fn descriptor_for<'i>(index: &'i ImageIndex, reference: &str) -> Option<&'i Descriptor> {
        if let Ok(digest) = reference.parse::<Digest>() {
            let digest = digest.to_string();
            index
                .manifests()
                .iter()
                .find(|desc| desc.digest().to_string() == digest)
        } else {
            index.manifests().iter().find(|desc| {
                desc.annotations()
                    .as_ref()
                    .and_then(|annotations| annotations.get(REF_NAME_ANNOTATION))
                    .is_some_and(|name| name == reference)
            })
        }
    }

    /// Write blob bytes via a temp file and rename into the content address.
    async fn commit_blob_bytes(
        &self,
        repo_root: &Utf8Path,
        digest: &Digest,
        body: &[u8],
    ) -> StoreResult<()> {
        tokio::fs::create_dir_all(layout::blobs_dir(repo_root)).await?;

        let dst = layout::blob_path(repo_root, digest);
        let tmp = Utf8PathBuf::from(format!("{dst}.tmp"));
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(body).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &dst).await?;
        Ok(())
    }

    async fn staged_digest(path: &Utf8Path) -> StoreResult<Digest> {
        let mut file = tokio::fs::File::open(path).await?;
        let mut digester = Digester::new();
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            digester.update(&buf[..n]);
        }
        Ok(digester.finalize())
    }

    /// Every digest a live index entry names: the manifest blobs themselves
    /// plus the config and layers of each listed manifest.
    async fn referenced_digests(&self, repo: &str) -> StoreResult<HashSet<String>> {
        let mut referenced = HashSet::new();
        let index = match self.read_index(repo).await {
            Ok(index) => index,
            Err(_) => return Ok(referenced),
        };

        let repo_root = self.repo_root(repo);
        for desc in index.manifests() {
            let digest = desc.digest().to_string();
            if let Ok(parsed) = digest.parse::<Digest>() {
                if let Ok(bytes) = tokio::fs::read(layout::blob_path(&repo_root, &parsed)).await {
                    if let Ok(manifest) = serde_json::from_slice::<ImageManifest>(&bytes) {
                        referenced.insert(manifest.config().digest().to_string());
                        for layer in manifest.layers() {
                            referenced.insert(layer.digest().to_string());
                        }
                    }
                }
            }
            referenced.insert(digest);
        }

        Ok(referenced)
    }
}

async fn dir_exists(path: &Utf8Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|metadata| metadata.is_dir())
        .unwrap_or(false)
}

fn blob_error(err: std::io::Error, digest: &Digest) -> StoreError {
    if err.kind() == ErrorKind::NotFound {
        StoreError::BlobNotFound(digest.to_string())
    } else {
        StoreError::StorageIo(err)
    }
}

fn is_supported_manifest_type(media_type: &str) -> bool {
    media_type == MediaType::ImageManifest.to_string()
}

#[async_trait]
impl ImageStore for FsImageStore {
    fn name(&self) -> &str {
        "filesystem"
    }

    async fn init_repo(&self, repo: &str) -> StoreResult<()> {
        let _guard = self.locks.write(repo).await;
        self.init_repo_locked(repo).await
    }

    async fn validate_repo(&self, repo: &str) -> StoreResult<bool> {
        let _guard = self.locks.read(repo).await;
        self.validate_repo_at(repo, &self.repo_root(repo)).await
    }

    async fn repositories(&self) -> StoreResult<Vec<String>> {
        let mut repos = Vec::new();
        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                if !entry.file_type().await?.is_dir() {
                    continue;
                }
                let name = entry.file_name();
                let Some(name) = name.to_str() else { continue };
                if name.starts_with('.') {
                    continue;
                }

                let path = dir.join(name);
                let relative = path
                    .strip_prefix(&self.root)
                    .expect("walked path stays under the store root");
                if self.is_valid_repo(relative.as_str(), &path).await {
                    repos.push(relative.to_string());
                } else {
                    pending.push(path);
                }
            }
        }

        repos.sort();
        Ok(repos)
    }

    async fn image_tags(&self, repo: &str) -> StoreResult<Vec<String>> {
        let _guard = self.locks.read(repo).await;
        if !dir_exists(&self.repo_root(repo)).await {
            return Err(StoreError::RepoNotFound(repo.to_string()));
        }

        let index = self.read_index(repo).await?;
        Ok(index
            .manifests()
            .iter()
            .filter_map(|desc| {
                desc.annotations()
                    .as_ref()
                    .and_then(|annotations| annotations.get(REF_NAME_ANNOTATION))
                    .cloned()
            })
            .collect())
    }

    async fn image_manifest(&self, repo: &str, reference: &str) -> StoreResult<ManifestPayload> {
        let _guard = self.locks.read(repo).await;
        let root = self.repo_root(repo);
        if !dir_exists(&root).await {
            return Err(StoreError::RepoNotFound(repo.to_string()));
        }

        let index = self.read_index(repo).await?;
        let desc = Self::descriptor_for(&index, reference)
            .ok_or_else(|| StoreError::ManifestNotFound(format!("{repo}:{reference}")))?;

        let digest: Digest = desc.digest().to_string().parse()?;
        let media_type = desc.media_type().to_string();
        let body = tokio::fs::read(layout::blob_path(&root, &digest))
            .await
            .map_err(|err| {
                if err.kind() == ErrorKind::NotFound {
                    StoreError::ManifestNotFound(format!("{repo}:{reference}"))
                } else {
                    StoreError::StorageIo(err)
                }
            })?;

        Ok(ManifestPayload {
            body,
            digest,
            media_type,
        })
    }

    async fn put_image_manifest(
        &self,
        repo: &str,
        reference: &str,
        media_type: &str,
        body: &[u8],
    ) -> StoreResult<Digest> {
        if !is_supported_manifest_type(media_type) {
            return Err(StoreError::UnsupportedMediaType(media_type.to_string()));
        }

        let manifest: ImageManifest =
            serde_json::from_slice(body).map_err(|err| StoreError::BadManifest(err.to_string()))?;
        if manifest.schema_version() != 2 {
            return Err(StoreError::BadManifest(format!(
                "unsupported schema version {}",
                manifest.schema_version()
            )));
        }

        let _guard = self.locks.write(repo).await;
        self.init_repo_locked(repo).await?;
        let root = self.repo_root(repo);

        // every referenced blob must already be present, at the declared size
        let mut references = vec![manifest.config().clone()];
        references.extend(manifest.layers().iter().cloned());
        for desc in &references {
            let digest: Digest = desc.digest().to_string().parse()?;
            let metadata = tokio::fs::metadata(layout::blob_path(&root, &digest))
                .await
                .map_err(|err| blob_error(err, &digest))?;
            if metadata.len() != desc.size() {
                return Err(StoreError::InvalidSize {
                    expected: desc.size(),
                    actual: metadata.len(),
                });
            }
        }

        let digest = Digest::from_bytes(body);
        let tag = match reference.parse::<Digest>() {
            Ok(ref_digest) => {
                if ref_digest != digest {
                    return Err(StoreError::ManifestConflict(format!(
                        "reference {ref_digest} does not match content digest {digest}"
                    )));
                }
                None
            }
            Err(_) => Some(reference.to_string()),
        };

        self.commit_blob_bytes(&root, &digest, body).await?;

        let index = self.read_index(repo).await?;
        let mut manifests = index.manifests().clone();
        let digest_string = digest.to_string();

        match &tag {
            Some(tag) => {
                // last write wins: drop every descriptor holding this tag
                manifests.retain(|desc| {
                    desc.annotations()
                        .as_ref()
                        .and_then(|annotations| annotations.get(REF_NAME_ANNOTATION))
                        != Some(tag)
                });
            }
            None => {
                let already_listed = manifests.iter().any(|desc| {
                    desc.digest().to_string() == digest_string
                        && desc
                            .annotations()
                            .as_ref()
                            .and_then(|annotations| annotations.get(REF_NAME_ANNOTATION))
                            .is_none()
                });
                if already_listed {
                    return Ok(digest);
                }
            }
        }

        let descriptor = match tag {
            Some(tag) => DescriptorBuilder::default()
                .media_type(MediaType::ImageManifest)
                .digest(Self::oci_digest(&digest))
                .size(body.len() as u64)
                .annotations(HashMap::from([(REF_NAME_ANNOTATION.to_string(), tag)]))
                .build(),
            None => DescriptorBuilder::default()
                .media_type(MediaType::ImageManifest)
                .digest(Self::oci_digest(&digest))
                .size(body.len() as u64)
                .build(),
        }
        .map_err(|err| StoreError::StorageIo(std::io::Error::new(ErrorKind::InvalidData, err)))?;
        manifests.push(descriptor);

        self.write_index(repo, &layout::index_with(manifests)?)
            .await?;
        tracing::debug!(%repo, %reference, %digest, "manifest committed");

        Ok(digest)
    }

    async fn delete_image_manifest(&self, repo: &str, reference: &str) -> StoreResult<()> {
        let _guard = self.locks.write(repo).await;
        if !dir_exists(&self.repo_root(repo)).await {
            return Err(StoreError::RepoNotFound(repo.to_string()));
        }

        let index = self.read_index(repo).await?;
        let mut manifests = index.manifests().clone();
        let before = manifests.len();

        if let Ok(digest) = reference.parse::<Digest>() {
            let digest = digest.to_string();
            manifests.retain(|desc| desc.digest().to_string() != digest);
        } else {
            manifests.retain(|desc| {
                desc.annotations()
                    .as_ref()
                    .and_then(|annotations| annotations.get(REF_NAME_ANNOTATION))
                    .map(String::as_str)
                    != Some(reference)
            });
        }

        if manifests.len() == before {
            return Err(StoreError::ManifestNotFound(format!("{repo}:{reference}")));
        }

        self.write_index(repo, &layout::index_with(manifests)?)
            .await
    }

    async fn new_blob_upload(&self, repo: &str) -> StoreResult<String> {
        let _guard = self.locks.write(repo).await;
        self.init_repo_locked(repo).await?;

        let session = upload::new_session_id();
        tokio::fs::File::create(upload::staging_path(&self.repo_root(repo), &session)).await?;
        tracing::trace!(%repo, session, "opened upload session");
        Ok(session)
    }

    async fn blob_upload_offset(&self, repo: &str, session: &str) -> StoreResult<u64> {
        upload::staged_size(&self.repo_root(repo), session).await
    }

    async fn put_blob_chunk(
        &self,
        repo: &str,
        session: &str,
        from: u64,
        to: u64,
        body: &mut Reader<'_>,
    ) -> StoreResult<u64> {
        let root = self.repo_root(repo);
        let staged = upload::staged_size(&root, session).await?;
        if from != staged {
            return Err(StoreError::BadUploadRange {
                offset: from,
                staged,
            });
        }

        tracing::trace!(%repo, session, from, to, "appending chunk");
        let appended = upload::append(&root, session, body).await?;
        Ok(staged + appended)
    }

    async fn put_blob_chunk_streamed(
        &self,
        repo: &str,
        session: &str,
        body: &mut Reader<'_>,
    ) -> StoreResult<u64> {
        upload::append(&self.repo_root(repo), session, body).await
    }

    async fn finish_blob_upload(
        &self,
        repo: &str,
        session: &str,
        body: &mut Reader<'_>,
        digest: &Digest,
    ) -> StoreResult<()> {
        let _guard = self.locks.write(repo).await;
        let root = self.repo_root(repo);
        let staging = upload::staging_path(&root, session);

        // trailing bytes from monolithic uploads land in the same staging file
        upload::append(&root, session, body).await?;

        let actual = Self::staged_digest(&staging).await?;
        if actual != *digest {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(StoreError::BadBlobDigest(digest.to_string()));
        }

        tokio::fs::create_dir_all(layout::blobs_dir(&root)).await?;
        let dst = layout::blob_path(&root, digest);

        if self.dedupe {
            let repos = self.repositories().await?;
            if let Some(canonical) =
                dedupe::find_canonical(&self.root, &repos, repo, digest, &staging).await?
            {
                match dedupe::relink(&canonical, &dst).await {
                    Ok(()) => {
                        let _ = tokio::fs::remove_file(&staging).await;
                        tracing::debug!(%repo, %digest, %canonical, "blob deduplicated on commit");
                        return Ok(());
                    }
                    Err(err) => {
                        tracing::warn!(%repo, %digest, error = %err, "dedupe failed, committing plain copy");
                    }
                }
            }
        }

        tokio::fs::rename(&staging, &dst).await?;
        tracing::trace!(%repo, %digest, "blob committed");
        Ok(())
    }

    async fn delete_blob_upload(&self, repo: &str, session: &str) -> StoreResult<()> {
        tokio::fs::remove_file(upload::staging_path(&self.repo_root(repo), session))
            .await
            .map_err(|err| {
                if err.kind() == ErrorKind::NotFound {
                    StoreError::UploadNotFound(session.to_string())
                } else {
                    StoreError::StorageIo(err)
                }
            })
    }

    async fn check_blob(&self, repo: &str, digest: &Digest) -> StoreResult<(bool, u64)> {
        let root = self.repo_root(repo);
        let path = layout::blob_path(&root, digest);

        if !self.dedupe {
            let _guard = self.locks.read(repo).await;
            let metadata = tokio::fs::metadata(&path)
                .await
                .map_err(|err| blob_error(err, digest))?;
            return Ok((true, metadata.len()));
        }

        let _guard = self.locks.write(repo).await;
        match tokio::fs::metadata(&path).await {
            Ok(metadata) => return Ok((true, metadata.len())),
            Err(err) if err.kind() != ErrorKind::NotFound => return Err(err.into()),
            Err(_) => {}
        }

        // absent here: adopt an identical blob from a sibling repository
        let repos = self.repositories().await?;
        let Some(canonical) =
            dedupe::find_canonical(&self.root, &repos, repo, digest, &path).await?
        else {
            return Err(StoreError::BlobNotFound(digest.to_string()));
        };

        self.init_repo_locked(repo).await?;
        dedupe::relink(&canonical, &path).await?;
        let metadata = tokio::fs::metadata(&path).await?;
        tracing::debug!(%repo, %digest, %canonical, "blob adopted via hard link");
        Ok((true, metadata.len()))
    }

    async fn get_blob(
        &self,
        repo: &str,
        digest: &Digest,
        media_type: &str,
    ) -> StoreResult<(BlobStream, u64)> {
        let _guard = self.locks.read(repo).await;
        let path = layout::blob_path(&self.repo_root(repo), digest);
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|err| blob_error(err, digest))?;
        let size = file.metadata().await?.len();

        tracing::trace!(%repo, %digest, media_type, size, "opened blob for reading");
        Ok((Box::new(BufReader::new(file)), size))
    }

    async fn delete_blob(&self, repo: &str, digest: &Digest) -> StoreResult<()> {
        let _guard = self.locks.write(repo).await;
        let path = layout::blob_path(&self.repo_root(repo), digest);
        if tokio::fs::metadata(&path).await.is_err() {
            return Err(StoreError::BlobNotFound(digest.to_string()));
        }

        let referenced = self.referenced_digests(repo).await?;
        if referenced.contains(&digest.to_string()) {
            return Err(StoreError::BlobReferenced(digest.to_string()));
        }

        tokio::fs::remove_file(&path).await?;
        Ok(())
    }

    async fn dedupe_blob(
        &self,
        src: &Utf8Path,
        digest: &Digest,
        dst: &Utf8Path,
    ) -> StoreResult<()> {
        if !self.dedupe {
            return Err(StoreError::DedupeNotSupported);
        }

        tracing::debug!(%src, %digest, %dst, "relinking blob");
        dedupe::relink(src, dst).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store(dedupe: bool) -> (tempfile::TempDir, FsImageStore) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap().to_owned();
        let store = FsImageStore::new(&root, false, dedupe).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn init_creates_layout() {
        let (_dir, store) = test_store(false).await;
        store.init_repo("library/alpine").await.unwrap();

        assert!(store.validate_repo("library/alpine").await.unwrap());
        let root = store.repo_root("library/alpine");
        assert!(root.join("blobs/sha256").is_dir());
        assert!(root.join("oci-layout").is_file());
        assert!(root.join("index.json").is_file());
    }

    #[tokio::test]
    async fn init_is_idempotent() {
        let (_dir, store) = test_store(false).await;
        store.init_repo("repo").await.unwrap();
        store.init_repo("repo").await.unwrap();
        assert!(store.validate_repo("repo").await.unwrap());
    }

    #[tokio::test]
    async fn nested_repositories_are_listed_in_order() {
        let (_dir, store) = test_store(false).await;
        store.init_repo("zeta").await.unwrap();
        store.init_repo("team/app").await.unwrap();
        store.init_repo("alpha").await.unwrap();

        let repos = store.repositories().await.unwrap();
        assert_eq!(repos, vec!["alpha", "team/app", "zeta"]);
    }

    #[tokio::test]
    async fn validate_missing_repo_is_not_found() {
        let (_dir, store) = test_store(false).await;
        let err = store.validate_repo("ghost").await.unwrap_err();
        assert!(matches!(err, StoreError::RepoNotFound(_)));
    }

    #[tokio::test]
    async fn unsupported_media_type_is_rejected() {
        let (_dir, store) = test_store(false).await;
        let err = store
            .put_image_manifest("repo", "latest", "application/json", b"{}")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedMediaType(_)));
    }

    #[tokio::test]
    async fn dedupe_blob_requires_dedupe_store() {
        let (_dir, store) = test_store(false).await;
        let digest = Digest::from_bytes(b"test-data3");
        let err = store
            .dedupe_blob(Utf8Path::new(""), &digest, Utf8Path::new(""))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DedupeNotSupported));
    }

    #[tokio::test]
    async fn dedupe_blob_with_bad_paths_fails() {
        let (_dir, store) = test_store(true).await;
        let digest = Digest::from_bytes(b"test-data3");
        let err = store
            .dedupe_blob(Utf8Path::new(""), &digest, Utf8Path::new(""))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DedupeFailed(_)));
    }
}

//! OCI Image Layout primitives: the on-disk path scheme, the layout
//! marker, and the hard-link capability probe.

use camino::{Utf8Path, Utf8PathBuf};
use oci_spec::image::{Descriptor, ImageIndex, ImageIndexBuilder, MediaType, OciLayoutBuilder};

use image_store_api::{Digest, StoreError, StoreResult};

/// File name of the OCI Image Layout marker.
pub(crate) const LAYOUT_FILE: &str = "oci-layout";

/// File name of the per-repository image index.
pub(crate) const INDEX_FILE: &str = "index.json";

/// The single layout version this store reads and writes.
pub(crate) const LAYOUT_VERSION: &str = "1.0.0";

/// Directory holding content-addressed objects inside a repository.
pub(crate) const BLOBS_DIR: &str = "blobs";

/// Directory holding staged upload sessions inside a repository.
pub(crate) const UPLOADS_DIR: &str = ".uploads";

/// Annotation key binding a descriptor to a tag.
pub(crate) const REF_NAME_ANNOTATION: &str = "org.opencontainers.image.ref.name";

/// Path of a blob relative to the store root: `<repo>/blobs/sha256/<hex>`.
pub(crate) fn blob_path(repo_root: &Utf8Path, digest: &Digest) -> Utf8PathBuf {
    blobs_dir(repo_root).join(digest.hex())
}

/// The `blobs/sha256` directory of a repository.
pub(crate) fn blobs_dir(repo_root: &Utf8Path) -> Utf8PathBuf {
    repo_root.join(BLOBS_DIR).join(Digest::ALGORITHM)
}

/// Serialized content of the layout marker file.
pub(crate) fn layout_marker() -> StoreResult<Vec<u8>> {
    let layout = OciLayoutBuilder::default()
        .image_layout_version(LAYOUT_VERSION.to_string())
        .build()
        .map_err(|err| {
            StoreError::StorageIo(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
        })?;
    serde_json::to_vec(&layout).map_err(|err| StoreError::StorageIo(err.into()))
}

/// An image index holding the given descriptors. `index_with(Vec::new())`
/// is the empty index `init_repo` writes.
pub(crate) fn index_with(manifests: Vec<Descriptor>) -> StoreResult<ImageIndex> {
    ImageIndexBuilder::default()
        .schema_version(2u32)
        .media_type(MediaType::ImageIndex)
        .manifests(manifests)
        .build()
        .map_err(|err| {
            StoreError::StorageIo(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
        })
}

/// Validate the layout marker bytes of a repository.
///
/// Unparseable content is [`StoreError::BadLayoutVersion`]; well-formed JSON
/// naming any version other than [`LAYOUT_VERSION`] (including none at all)
/// is [`StoreError::RepoBadVersion`].
pub(crate) fn validate_layout_marker(repo: &str, content: &[u8]) -> StoreResult<()> {
    let value: serde_json::Value = serde_json::from_slice(content)
        .map_err(|_| StoreError::BadLayoutVersion(repo.to_string()))?;

    let version = value
        .get("imageLayoutVersion")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    if version != LAYOUT_VERSION {
        return Err(StoreError::RepoBadVersion(repo.to_string()));
    }

    Ok(())
}

/// Try to hard-link `src` to `dst`, leaving the link in place on success.
pub async fn check_hard_link(src: &Utf8Path, dst: &Utf8Path) -> std::io::Result<()> {
    tokio::fs::hard_link(src, dst).await
}

/// Probe whether the filesystem under `dir` supports hard links.
///
/// Writes a probe file, links it, reads the link back and compares, then
/// removes both. Any failure is [`StoreError::DedupeNotSupported`].
pub async fn validate_hard_link(dir: &Utf8Path) -> StoreResult<()> {
    const PROBE_CONTENT: &[u8] = b"hard link probe";

    let probe = dir.join(".hardlink-probe");
    let link = dir.join(".hardlink-probe.link");

    // stale probes from an earlier crash
    let _ = tokio::fs::remove_file(&probe).await;
    let _ = tokio::fs::remove_file(&link).await;

    let outcome = async {
        tokio::fs::write(&probe, PROBE_CONTENT).await?;
        check_hard_link(&probe, &link).await?;
        let read_back = tokio::fs::read(&link).await?;
        if read_back != PROBE_CONTENT {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "linked content differs from probe",
            ));
        }
        Ok::<_, std::io::Error>(())
    }
    .await;

    let _ = tokio::fs::remove_file(&probe).await;
    let _ = tokio::fs::remove_file(&link).await;

    outcome.map_err(|err| {
        tracing::debug!(%dir, error = %err, "hard link probe failed");
        StoreError::DedupeNotSupported
    })
}

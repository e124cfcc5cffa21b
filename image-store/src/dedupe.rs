//! Best-effort cross-repository blob deduplication.
//!
//! No index is kept: candidates are resolved on demand by probing the
//! canonical `blobs/sha256/<hex>` path of every sibling repository. Two
//! files that already share an inode are left alone.

use std::os::unix::fs::MetadataExt;

use camino::{Utf8Path, Utf8PathBuf};

use image_store_api::{Digest, StoreError, StoreResult};

use crate::layout::blob_path;

/// Find the canonical copy of `digest` among `repos`, skipping `skip` and
/// any file already sharing an inode with `src`.
///
/// `repos` is expected in lexicographic order; the first hit wins.
pub(crate) async fn find_canonical(
    root: &Utf8Path,
    repos: &[String],
    skip: &str,
    digest: &Digest,
    src: &Utf8Path,
) -> StoreResult<Option<Utf8PathBuf>> {
    let src_inode = match tokio::fs::metadata(src).await {
        Ok(metadata) => Some(metadata.ino()),
        Err(_) => None,
    };

    for repo in repos {
        if repo == skip {
            continue;
        }

        let candidate = blob_path(&root.join(repo), digest);
        match tokio::fs::metadata(&candidate).await {
            Ok(metadata) if Some(metadata.ino()) != src_inode => {
                tracing::trace!(%digest, %candidate, "found canonical blob for dedupe");
                return Ok(Some(candidate));
            }
            Ok(_) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
    }

    Ok(None)
}

/// Replace `dst` with a hard link to `src`.
///
/// The link is created under a temporary name and renamed over `dst`, so a
/// crash leaves either the old file or the finished link, never a gap. On
/// failure `dst` is unchanged and the cause is [`StoreError::DedupeFailed`].
pub(crate) async fn relink(src: &Utf8Path, dst: &Utf8Path) -> StoreResult<()> {
    let tmp = Utf8PathBuf::from(format!("{dst}.dedupe"));
    let _ = tokio::fs::remove_file(&tmp).await;

    tokio::fs::hard_link(src, &tmp)
        .await
        .map_err(StoreError::DedupeFailed)?;

    if let Err(err) = tokio::fs::rename(&tmp, dst).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(StoreError::DedupeFailed(err));
    }

    Ok(())
}

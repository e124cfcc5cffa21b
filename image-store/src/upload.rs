//! Upload session staging.
//!
//! A session is nothing more than its staging file under
//! `.uploads/<session-id>`; there is no in-memory session table, so a store
//! restarted mid-upload can still resume or discard sessions.

use camino::{Utf8Path, Utf8PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use image_store_api::{Reader, StoreError, StoreResult};

use crate::layout::UPLOADS_DIR;

/// Mint a fresh, URL-safe session id.
pub(crate) fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Staging file path for a session inside a repository.
pub(crate) fn staging_path(repo_root: &Utf8Path, session: &str) -> Utf8PathBuf {
    repo_root.join(UPLOADS_DIR).join(session)
}

fn session_error(err: std::io::Error, session: &str) -> StoreError {
    if err.kind() == std::io::ErrorKind::NotFound {
        StoreError::UploadNotFound(session.to_string())
    } else {
        StoreError::StorageIo(err)
    }
}

/// Number of bytes staged so far for a session.
pub(crate) async fn staged_size(repo_root: &Utf8Path, session: &str) -> StoreResult<u64> {
    let metadata = tokio::fs::metadata(staging_path(repo_root, session))
        .await
        .map_err(|err| session_error(err, session))?;
    Ok(metadata.len())
}

/// Append the reader's remaining bytes to the staging file, returning the
/// number appended. The session must already exist.
pub(crate) async fn append(
    repo_root: &Utf8Path,
    session: &str,
    body: &mut Reader<'_>,
) -> StoreResult<u64> {
    let path = staging_path(repo_root, session);
    let mut file = OpenOptions::new()
        .append(true)
        .open(&path)
        .await
        .map_err(|err| session_error(err, session))?;

    let appended = tokio::io::copy(body, &mut file).await?;
    file.flush().await?;
    Ok(appended)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[test]
    fn session_ids_are_opaque_and_unique() {
        let a = new_session_id();
        let b = new_session_id();
        assert_ne!(a, b);
        assert!(a
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-'));
    }

    #[tokio::test]
    async fn append_to_missing_session_is_upload_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();

        let mut body = BufReader::new(&b"data"[..]);
        let err = append(root, "no-such-session", &mut body).await.unwrap_err();
        assert!(matches!(err, StoreError::UploadNotFound(_)));

        let err = staged_size(root, "no-such-session").await.unwrap_err();
        assert!(matches!(err, StoreError::UploadNotFound(_)));
    }

    #[tokio::test]
    async fn append_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        tokio::fs::create_dir_all(root.join(UPLOADS_DIR))
            .await
            .unwrap();

        let session = new_session_id();
        tokio::fs::File::create(staging_path(root, &session))
            .await
            .unwrap();

        let mut body = BufReader::new(&b"test-"[..]);
        assert_eq!(append(root, &session, &mut body).await.unwrap(), 5);
        let mut body = BufReader::new(&b"data3"[..]);
        assert_eq!(append(root, &session, &mut body).await.unwrap(), 5);

        assert_eq!(staged_size(root, &session).await.unwrap(), 10);
        let staged = tokio::fs::read(staging_path(root, &session)).await.unwrap();
        assert_eq!(staged, b"test-data3");
    }
}

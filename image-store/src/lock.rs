//! Per-repository locking.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// Hands out one reader-writer lock per repository name.
///
/// Writers serialize `index.json` rewrites and renames into `blobs/`;
/// readers only pin the repository for the span of a single stat or read.
/// Locks are created on first use and never discarded, which is fine for
/// the repository counts a store root realistically holds.
#[derive(Debug, Default)]
pub(crate) struct RepoLocks {
    locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl RepoLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    async fn entry(&self, repo: &str) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(repo.to_string()).or_default().clone()
    }

    pub(crate) async fn read(&self, repo: &str) -> OwnedRwLockReadGuard<()> {
        self.entry(repo).await.read_owned().await
    }

    pub(crate) async fn write(&self, repo: &str) -> OwnedRwLockWriteGuard<()> {
        self.entry(repo).await.write_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writer_excludes_other_writers() {
        let locks = RepoLocks::new();
        let guard = locks.write("repo").await;

        let lock = locks.entry("repo").await;
        assert!(lock.try_write().is_err());

        drop(guard);
        assert!(lock.try_write().is_ok());
    }

    #[tokio::test]
    async fn readers_share() {
        let locks = RepoLocks::new();
        let _first = locks.read("repo").await;
        let _second = locks.read("repo").await;
    }

    #[tokio::test]
    async fn repositories_lock_independently() {
        let locks = RepoLocks::new();
        let _writer_a = locks.write("repo-a").await;
        let _writer_b = locks.write("repo-b").await;
    }
}

//! Per-account file storage
//!
//! Every account owns a directory under the configured root, holding its
//! sync cache, stashed uploads, and generated exports. The interface is
//! deliberately byte-level: read-all, write-all, existence. Writes replace
//! the whole file atomically via a temp file in the same directory.

pub mod credentials;

use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Root handle for per-account files.
#[derive(Debug, Clone)]
pub struct AccountStore {
    root: PathBuf,
}

impl AccountStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Reject account keys that could escape the storage root.
    fn checked_account(account: &str) -> AppResult<&str> {
        let ok = !account.is_empty()
            && account
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
            && !account.starts_with('.');
        if ok {
            Ok(account)
        } else {
            Err(AppError::Validation {
                field: "account".to_string(),
                message: "account key contains unsupported characters".to_string(),
            })
        }
    }

    fn account_dir(&self, account: &str) -> AppResult<PathBuf> {
        Ok(self.root.join(Self::checked_account(account)?))
    }

    /// Path of the incremental sync cache file.
    pub fn cache_path(&self, account: &str) -> AppResult<PathBuf> {
        Ok(self.account_dir(account)?.join("cache").join("stocks.json"))
    }

    /// Path of the latest stashed upload of the given kind.
    pub fn upload_path(&self, account: &str, kind: &str) -> AppResult<PathBuf> {
        Ok(self
            .account_dir(account)?
            .join("uploads")
            .join(format!("{kind}.json")))
    }

    /// Path of a timestamped copy alongside the latest stash.
    pub fn upload_snapshot_path(
        &self,
        account: &str,
        kind: &str,
        stamp: &str,
    ) -> AppResult<PathBuf> {
        Ok(self
            .account_dir(account)?
            .join("uploads")
            .join(format!("{kind}_{stamp}.json")))
    }

    /// Path of a generated export file.
    pub fn export_path(&self, account: &str, filename: &str) -> AppResult<PathBuf> {
        Ok(self.account_dir(account)?.join("exports").join(filename))
    }

    /// Path of the account's credentials file.
    pub fn credentials_path(&self, account: &str) -> AppResult<PathBuf> {
        Ok(self.account_dir(account)?.join("credentials.json"))
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    /// Read a whole file; `None` when it does not exist.
    pub fn read(path: &Path) -> AppResult<Option<Vec<u8>>> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Replace a whole file atomically: write a temp sibling, then rename.
    pub fn write_atomic(path: &Path, bytes: &[u8]) -> AppResult<()> {
        let parent = path
            .parent()
            .ok_or_else(|| AppError::StorageError(format!("no parent dir for {}", path.display())))?;
        std::fs::create_dir_all(parent)?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp_path = PathBuf::from(tmp);

        std::fs::write(&tmp_path, bytes)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_traversal_in_account_keys() {
        let store = AccountStore::new("/tmp/accounts");
        assert!(store.cache_path("../evil").is_err());
        assert!(store.cache_path("a/b").is_err());
        assert!(store.cache_path("").is_err());
        assert!(store.cache_path(".hidden").is_err());
        assert!(store.cache_path("shop_1@example.com").is_ok());
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("file.json");
        assert_eq!(AccountStore::read(&path).unwrap(), None);

        AccountStore::write_atomic(&path, b"{\"ok\":true}").unwrap();
        assert_eq!(
            AccountStore::read(&path).unwrap().as_deref(),
            Some(b"{\"ok\":true}".as_ref())
        );
        assert!(AccountStore::exists(&path));
    }
}

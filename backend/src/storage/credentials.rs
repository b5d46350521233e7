//! Credential provider boundary
//!
//! The core only needs decrypted bearer tokens; how they are stored and
//! encrypted at rest is outside this repository. The file-backed provider
//! reads a plain JSON document per account.

use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::storage::AccountStore;

/// Supplies API credentials for an account.
pub trait CredentialProvider: Send + Sync {
    /// Bearer token for the marketplace statistics API.
    fn marketplace_token(&self, account: &str) -> AppResult<String>;

    /// Optional token for the secondary warehouse system.
    fn warehouse_token(&self, account: &str) -> AppResult<Option<String>>;
}

#[derive(Debug, Deserialize, Default)]
struct CredentialsFile {
    #[serde(default)]
    marketplace_token: Option<String>,
    #[serde(default)]
    warehouse_token: Option<String>,
}

/// File-backed credential provider reading `<account>/credentials.json`.
#[derive(Debug, Clone)]
pub struct FileCredentialProvider {
    store: AccountStore,
}

impl FileCredentialProvider {
    pub fn new(store: AccountStore) -> Self {
        Self { store }
    }

    fn load(&self, account: &str) -> AppResult<CredentialsFile> {
        let path = self.store.credentials_path(account)?;
        match AccountStore::read(&path)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|err| AppError::StorageError(format!("credentials file: {err}"))),
            None => Ok(CredentialsFile::default()),
        }
    }
}

impl CredentialProvider for FileCredentialProvider {
    fn marketplace_token(&self, account: &str) -> AppResult<String> {
        self.load(account)?
            .marketplace_token
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                AppError::CredentialMissing(format!("marketplace token is not set for {account}"))
            })
    }

    fn warehouse_token(&self, account: &str) -> AppResult<Option<String>> {
        Ok(self
            .load(account)?
            .warehouse_token
            .filter(|token| !token.trim().is_empty()))
    }
}

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CredentialError;

/// Injectable key-value store mapping an account to its cached access token.
///
/// Session setup consults an implementation of this trait instead of any
/// process-wide global; swap in [`MemoryTokenStore`] for tests or
/// [`FileTokenStore`] for the on-disk cache.
pub trait TokenStore {
    fn get(&self, account: &str) -> Result<Option<String>, CredentialError>;
    fn put(&mut self, account: &str, token: &str) -> Result<(), CredentialError>;
}

/// In-memory store; contents die with the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: BTreeMap<String, String>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, account: &str) -> Result<Option<String>, CredentialError> {
        Ok(self.tokens.get(account).cloned())
    }

    fn put(&mut self, account: &str, token: &str) -> Result<(), CredentialError> {
        self.tokens.insert(account.to_owned(), token.to_owned());
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    #[serde(default)]
    access_tokens: BTreeMap<String, String>,
}

/// JSON-file-backed store using the `{"access_tokens": {account: token}}`
/// layout of the historical on-disk cache.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<CacheFile, CredentialError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CacheFile::default());
            }
            Err(source) => {
                return Err(CredentialError::io("reading token cache", &self.path, source));
            }
        };

        serde_json::from_str(&text).map_err(|source| CredentialError::StoreParse {
            path: self.path.clone(),
            source,
        })
    }

    fn write_all(&self, cache: &CacheFile) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| CredentialError::io("creating cache directory", parent, source))?;
        }

        let text =
            serde_json::to_string_pretty(cache).map_err(|source| CredentialError::StoreSerialize {
                path: self.path.clone(),
                source,
            })?;
        fs::write(&self.path, text)
            .map_err(|source| CredentialError::io("writing token cache", &self.path, source))
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, account: &str) -> Result<Option<String>, CredentialError> {
        Ok(self.read_all()?.access_tokens.get(account).cloned())
    }

    fn put(&mut self, account: &str, token: &str) -> Result<(), CredentialError> {
        let mut cache = self.read_all()?;
        cache
            .access_tokens
            .insert(account.to_owned(), token.to_owned());
        self.write_all(&cache)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CredentialError;

    use super::{FileTokenStore, MemoryTokenStore, TokenStore};

    #[test]
    fn memory_store_round_trips_tokens_per_account() {
        let mut store = MemoryTokenStore::new();
        store.put("a@example.com", "tok-a").expect("put succeeds");
        store.put("b@example.com", "tok-b").expect("put succeeds");

        assert_eq!(
            store.get("a@example.com").expect("get succeeds").as_deref(),
            Some("tok-a")
        );
        assert_eq!(store.get("c@example.com").expect("get succeeds"), None);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        let path = dir.path().join("cache.json");

        let mut store = FileTokenStore::new(&path);
        store.put("a@example.com", "tok-a").expect("put succeeds");
        drop(store);

        let reopened = FileTokenStore::new(&path);
        assert_eq!(
            reopened
                .get("a@example.com")
                .expect("get succeeds")
                .as_deref(),
            Some("tok-a")
        );
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        let store = FileTokenStore::new(dir.path().join("absent.json"));
        assert_eq!(store.get("anyone").expect("get succeeds"), None);
    }

    #[test]
    fn corrupt_cache_file_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "not json").expect("write succeeds");

        let store = FileTokenStore::new(&path);
        let error = store.get("anyone").expect_err("corrupt file must surface");
        assert!(matches!(error, CredentialError::StoreParse { .. }));
    }
}

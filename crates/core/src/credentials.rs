//! Credential storage for the access/refresh token pair
//!
//! A store holds at most one [`CredentialPair`]. Saving replaces the whole
//! pair and clearing removes both tokens together, so a reader never sees an
//! access token from one session next to a refresh token from another.
//!
//! Every save and clear bumps the store's generation. A writer that read the
//! pair earlier (a token refresh racing a logout, say) uses
//! [`CredentialStore::replace_if_current`] so its write lands only if the
//! store is still in the state it read.
//!
//! Two implementations are provided:
//! - [`MemoryCredentialStore`] for tests and short-lived processes
//! - [`FileCredentialStore`], a JSON document rewritten by atomic rename

use crate::error::{Error, ErrorCode, Result, ResultExt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, RwLock};
use tracing::debug;

/// File name used under the platform data directory
const CREDENTIALS_FILE: &str = "credentials.json";

/// Access token plus the optional refresh token and expiry hint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    /// Short-lived bearer token
    pub access_token: String,
    /// Longer-lived token exchanged for a new access token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Expiry hint reported by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CredentialPair {
    /// Create a pair without an expiry hint
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: None,
        }
    }

    /// Builder-style method to set the expiry hint
    #[must_use]
    pub fn with_expiry(mut self, expires_at: Option<DateTime<Utc>>) -> Self {
        self.expires_at = expires_at;
        self
    }

    /// Whether the expiry hint says the access token is already stale
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}

/// Durable storage for one credential pair
pub trait CredentialStore: Send + Sync + std::fmt::Debug {
    /// Read the stored pair, if any
    fn load(&self) -> Result<Option<CredentialPair>>;

    /// Replace the stored pair
    fn save(&self, pair: &CredentialPair) -> Result<()>;

    /// Remove both tokens
    fn clear(&self) -> Result<()>;

    /// Read the stored pair together with the current generation
    fn load_versioned(&self) -> Result<(Option<CredentialPair>, u64)>;

    /// Store `pair` (or clear the store for `None`) only if no save or clear
    /// happened since `generation` was read
    ///
    /// Returns `false`, leaving the store untouched, when the generation has
    /// moved on.
    fn replace_if_current(&self, pair: Option<&CredentialPair>, generation: u64) -> Result<bool>;

    /// Current access token
    fn access_token(&self) -> Result<Option<String>> {
        Ok(self.load()?.map(|pair| pair.access_token))
    }

    /// Current refresh token
    fn refresh_token(&self) -> Result<Option<String>> {
        Ok(self.load()?.and_then(|pair| pair.refresh_token))
    }
}

fn poisoned() -> Error {
    Error::new(ErrorCode::CredentialsLocked, "Credential store lock poisoned")
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    state: RwLock<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    pair: Option<CredentialPair>,
    generation: u64,
}

impl MemoryState {
    fn replace(&mut self, pair: Option<CredentialPair>) {
        self.pair = pair;
        self.generation += 1;
    }
}

impl MemoryCredentialStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a pair
    pub fn with_pair(pair: CredentialPair) -> Self {
        Self {
            state: RwLock::new(MemoryState {
                pair: Some(pair),
                generation: 0,
            }),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<CredentialPair>> {
        Ok(self.state.read().map_err(|_| poisoned())?.pair.clone())
    }

    fn save(&self, pair: &CredentialPair) -> Result<()> {
        self.state.write().map_err(|_| poisoned())?.replace(Some(pair.clone()));
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.state.write().map_err(|_| poisoned())?.replace(None);
        Ok(())
    }

    fn load_versioned(&self) -> Result<(Option<CredentialPair>, u64)> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok((state.pair.clone(), state.generation))
    }

    fn replace_if_current(&self, pair: Option<&CredentialPair>, generation: u64) -> Result<bool> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        if state.generation != generation {
            return Ok(false);
        }
        state.replace(pair.cloned());
        Ok(true)
    }
}

/// JSON file store
///
/// The document carries the fixed keys `accessToken`, `refreshToken` and
/// `expiresAt`. Writes go to a temporary file in the same directory which is
/// then renamed over the target, so a crash leaves either the old pair or the
/// new one on disk.
///
/// The generation is tracked per handle; writers sharing a file should share
/// one store.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    generation: Mutex<u64>,
}

impl FileCredentialStore {
    /// Create a store backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            generation: Mutex::new(0),
        }
    }

    /// Create a store at the platform default location
    /// (`<data dir>/marina/credentials.json`)
    pub fn at_default_location() -> Result<Self> {
        Ok(Self::new(default_credentials_path()?))
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Platform default credentials path
pub fn default_credentials_path() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("marina").join(CREDENTIALS_FILE))
        .ok_or_else(Error::no_data_dir)
}

impl FileCredentialStore {
    fn lock(&self) -> Result<MutexGuard<'_, u64>> {
        self.generation.lock().map_err(|_| poisoned())
    }

    fn read_file(&self) -> Result<Option<CredentialPair>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::from(e).with_context("Reading stored credentials")),
        };

        if raw.trim().is_empty() {
            return Ok(None);
        }

        let pair: CredentialPair = serde_json::from_str(&raw)
            .map_err(|e| Error::credentials_corrupt(&self.path).with_source(e))?;

        if pair.access_token.is_empty() {
            return Ok(None);
        }
        Ok(Some(pair))
    }

    fn write_file(&self, pair: &CredentialPair) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(Error::from).context("Creating credentials directory")?;

        let body = serde_json::to_vec_pretty(pair)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&body)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| Error::from(e.error).with_context("Replacing credentials file"))?;

        debug!(path = %self.path.display(), "Credentials saved");
        Ok(())
    }

    fn remove_file(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Credentials cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::from(e).with_context("Removing credentials file")),
        }
    }

    fn replace_locked(&self, generation: &mut u64, pair: Option<&CredentialPair>) -> Result<()> {
        match pair {
            Some(pair) => self.write_file(pair)?,
            None => self.remove_file()?,
        }
        *generation += 1;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<CredentialPair>> {
        self.read_file()
    }

    fn save(&self, pair: &CredentialPair) -> Result<()> {
        let mut generation = self.lock()?;
        self.replace_locked(&mut *generation, Some(pair))
    }

    fn clear(&self) -> Result<()> {
        let mut generation = self.lock()?;
        self.replace_locked(&mut *generation, None)
    }

    fn load_versioned(&self) -> Result<(Option<CredentialPair>, u64)> {
        let generation = self.lock()?;
        Ok((self.read_file()?, *generation))
    }

    fn replace_if_current(&self, pair: Option<&CredentialPair>, expected: u64) -> Result<bool> {
        let mut generation = self.lock()?;
        if *generation != expected {
            return Ok(false);
        }
        self.replace_locked(&mut *generation, pair)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(access: &str, refresh: Option<&str>) -> CredentialPair {
        CredentialPair::new(access, refresh.map(str::to_string))
    }

    #[test]
    fn test_memory_store_replaces_whole_pair() {
        let store = MemoryCredentialStore::with_pair(pair("A1", Some("R1")));
        store.save(&pair("A2", None)).unwrap();

        assert_eq!(store.access_token().unwrap().as_deref(), Some("A2"));
        assert_eq!(store.refresh_token().unwrap(), None);
    }

    #[test]
    fn test_memory_store_clear() {
        let store = MemoryCredentialStore::with_pair(pair("A", Some("R")));
        store.clear().unwrap();

        assert!(store.load().unwrap().is_none());
        assert!(store.access_token().unwrap().is_none());
        assert!(store.refresh_token().unwrap().is_none());
    }

    #[test]
    fn test_file_store_round_trip_uses_fixed_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.json");
        let store = FileCredentialStore::new(&path);

        assert!(store.load().unwrap().is_none());

        store.save(&pair("A", Some("R"))).unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["accessToken"], "A");
        assert_eq!(raw["refreshToken"], "R");

        // A second handle on the same file sees the same pair
        let reopened = FileCredentialStore::new(&path);
        assert_eq!(reopened.load().unwrap(), Some(pair("A", Some("R"))));
    }

    #[test]
    fn test_file_store_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));

        store.save(&pair("A", Some("R"))).unwrap();
        store.clear().unwrap();
        store.clear().unwrap();

        assert!(store.load().unwrap().is_none());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_store_corrupt_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, "{not json").unwrap();

        let err = FileCredentialStore::new(&path).load().unwrap_err();
        assert_eq!(err.code, ErrorCode::CredentialsCorrupt);
    }

    #[test]
    fn test_memory_store_stale_write_is_refused() {
        let store = MemoryCredentialStore::with_pair(pair("A1", Some("R1")));
        let (_, generation) = store.load_versioned().unwrap();

        store.clear().unwrap();

        assert!(!store.replace_if_current(Some(&pair("A2", Some("R2"))), generation).unwrap());
        assert!(store.load().unwrap().is_none());

        let (_, generation) = store.load_versioned().unwrap();
        assert!(store.replace_if_current(Some(&pair("A3", None)), generation).unwrap());
        assert_eq!(store.access_token().unwrap().as_deref(), Some("A3"));
    }

    #[test]
    fn test_file_store_stale_write_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));
        store.save(&pair("A1", Some("R1"))).unwrap();

        let (stored, generation) = store.load_versioned().unwrap();
        assert_eq!(stored, Some(pair("A1", Some("R1"))));

        store.clear().unwrap();
        assert!(!store.replace_if_current(Some(&pair("A2", None)), generation).unwrap());
        assert!(!store.path().exists());

        let (_, generation) = store.load_versioned().unwrap();
        assert!(store.replace_if_current(None, generation).unwrap());
        assert!(!store.replace_if_current(None, generation).unwrap());
    }

    #[test]
    fn test_expiry_hint() {
        let past = Utc::now() - chrono::Duration::minutes(5);
        let future = Utc::now() + chrono::Duration::minutes(5);

        assert!(pair("A", None).with_expiry(Some(past)).is_expired());
        assert!(!pair("A", None).with_expiry(Some(future)).is_expired());
        assert!(!pair("A", None).is_expired());
    }
}

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

/// Store file name in the storage directory
const STORE_FILE: &str = "credentials.json";

/// Keys understood by the credential store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKey {
    AccessToken,
    RefreshToken,
    PreferredLanguage,
}

impl CredentialKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKey::AccessToken => "access_token",
            CredentialKey::RefreshToken => "refresh_token",
            CredentialKey::PreferredLanguage => "preferred_language",
        }
    }
}

struct Inner {
    path: Option<PathBuf>,
    entries: RwLock<HashMap<String, String>>,
}

/// Durable key-value storage for tokens and user preferences.
///
/// A plain string map, no validation or encryption. Values persist
/// across process restarts when the backing file is usable; if it cannot
/// be read or written the store logs a warning and keeps working in
/// memory only, so `get` may return `None` after a `set` from an earlier
/// run. None of the operations fail.
///
/// Clone is cheap - clones share one map via Arc, so the request
/// pipeline and the session controller observe the same state.
#[derive(Clone)]
pub struct CredentialStore {
    inner: Arc<Inner>,
}

impl CredentialStore {
    /// Open the store backed by `credentials.json` under `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let path = dir.into().join(STORE_FILE);
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(error = %e, "Credential store file is corrupt, starting empty");
                    HashMap::new()
                }
            },
            // Missing file is the normal cold-start case
            Err(_) => HashMap::new(),
        };

        Self {
            inner: Arc::new(Inner {
                path: Some(path),
                entries: RwLock::new(entries),
            }),
        }
    }

    /// Open a store with no backing file. Used by tests and as the
    /// degraded mode when no storage directory can be resolved.
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(Inner {
                path: None,
                entries: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn get(&self, key: CredentialKey) -> Option<String> {
        self.read_entries().get(key.as_str()).cloned()
    }

    pub fn set(&self, key: CredentialKey, value: &str) {
        let mut entries = self.write_entries();
        entries.insert(key.as_str().to_string(), value.to_string());
        self.persist(&entries);
    }

    pub fn remove(&self, key: CredentialKey) {
        let mut entries = self.write_entries();
        entries.remove(key.as_str());
        self.persist(&entries);
    }

    /// Remove both tokens in one write. Keeping them paired preserves
    /// the rule that a signed-in user never outlives its access token.
    pub fn clear_tokens(&self) {
        let mut entries = self.write_entries();
        entries.remove(CredentialKey::AccessToken.as_str());
        entries.remove(CredentialKey::RefreshToken.as_str());
        self.persist(&entries);
        debug!("Cleared stored tokens");
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.inner
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.inner
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Best-effort write-through; failure degrades to session-only
    /// persistence.
    fn persist(&self, entries: &HashMap<String, String>) {
        let Some(ref path) = self.inner.path else {
            return;
        };

        let contents = match serde_json::to_string_pretty(entries) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(error = %e, "Failed to encode credential store");
                return;
            }
        };

        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(error = %e, "Failed to create storage directory, continuing in memory");
                return;
            }
        }

        if let Err(e) = std::fs::write(path, contents) {
            warn!(error = %e, "Failed to persist credential store, continuing in memory");
        }
    }
}

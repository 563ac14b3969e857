//! Session state that outlives a single screen: the access token and the
//! order draft.
//!
//! # Lifecycle
//!
//! - [`TokenStore::open`] reads a previously saved token at startup;
//!   [`TokenStore::from_config`] picks the storage from `TABLECRM_TOKEN_FILE`.
//! - [`TokenStore::login`] saves a new token; blank tokens are rejected.
//! - [`TokenStore::logout`] forgets the token in memory and in storage.
//!
//! The [`DraftStore`] is created empty, shared between the composer and the
//! submission coordinator, and reset after a successful sale or a logout.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::config::PosConfig;
use crate::draft::OrderDraft;
use crate::error::StorageError;

/// Where the access token is persisted between runs.
pub trait TokenStorage: Send + Sync {
    /// Read the saved token, `None` when nothing is saved.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the storage cannot be read.
    fn load(&self) -> Result<Option<SecretString>, StorageError>;

    /// Save `token`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the storage cannot be written.
    fn save(&self, token: &SecretString) -> Result<(), StorageError>;

    /// Remove the saved token. Succeeds when nothing was saved.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the storage cannot be written.
    fn clear(&self) -> Result<(), StorageError>;
}

/// Token storage that lives only as long as the process.
#[derive(Default)]
pub struct MemoryTokenStorage {
    token: Mutex<Option<SecretString>>,
}

impl MemoryTokenStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for MemoryTokenStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTokenStorage")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> Result<Option<SecretString>, StorageError> {
        Ok(self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, token: &SecretString) -> Result<(), StorageError> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Token storage backed by a plain file holding the token text.
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> Result<Option<SecretString>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| SecretString::from(token.to_string())))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, token: &SecretString) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, token.expose_secret())?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// The current access token plus where it is persisted.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn TokenStorage>,
    current: Arc<Mutex<Option<SecretString>>>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl TokenStore {
    /// Open the store, loading any previously saved token.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the storage cannot be read.
    pub fn open(storage: Arc<dyn TokenStorage>) -> Result<Self, StorageError> {
        let current = storage.load()?;
        debug!(restored = current.is_some(), "Token store opened");
        Ok(Self {
            storage,
            current: Arc::new(Mutex::new(current)),
        })
    }

    /// Open the store configured by `config`: a [`FileTokenStorage`] at
    /// `token_file` when set, otherwise process-local memory.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the token file exists but cannot be read.
    pub fn from_config(config: &PosConfig) -> Result<Self, StorageError> {
        let storage: Arc<dyn TokenStorage> = match &config.token_file {
            Some(path) => Arc::new(FileTokenStorage::new(path.clone())),
            None => Arc::new(MemoryTokenStorage::new()),
        };
        Self::open(storage)
    }

    /// Accept a token entered by the user and persist it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::EmptyToken` for blank input, or an I/O error
    /// if the token cannot be saved.
    pub fn login(&self, token: &str) -> Result<SecretString, StorageError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(StorageError::EmptyToken);
        }

        let secret = SecretString::from(token.to_string());
        self.storage.save(&secret)?;
        *self.lock() = Some(secret.clone());
        info!("Logged in");
        Ok(secret)
    }

    /// Forget the token in memory and in storage.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the saved token cannot be removed. The
    /// in-memory token is forgotten either way.
    pub fn logout(&self) -> Result<(), StorageError> {
        *self.lock() = None;
        info!("Logged out");
        self.storage.clear()
    }

    /// The current token, if logged in.
    #[must_use]
    pub fn token(&self) -> Option<SecretString> {
        self.lock().clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<SecretString>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Shared handle to the order draft.
///
/// The lock is only taken inside [`DraftStore::read`] and
/// [`DraftStore::update`], so it can never be held across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct DraftStore {
    inner: Arc<Mutex<OrderDraft>>,
}

impl DraftStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with read access to the draft.
    pub fn read<R>(&self, f: impl FnOnce(&OrderDraft) -> R) -> R {
        f(&self.inner.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Run `f` with write access to the draft.
    pub fn update<R>(&self, f: impl FnOnce(&mut OrderDraft) -> R) -> R {
        f(&mut self.inner.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// A copy of the current draft.
    #[must_use]
    pub fn snapshot(&self) -> OrderDraft {
        self.read(Clone::clone)
    }

    pub fn reset(&self) {
        self.update(OrderDraft::reset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_token_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("tablecrm-pos-{}", uuid::Uuid::new_v4()))
            .join("token")
    }

    #[test]
    fn test_login_rejects_blank_token() {
        let store = TokenStore::open(Arc::new(MemoryTokenStorage::new())).expect("open");
        assert!(matches!(store.login("   "), Err(StorageError::EmptyToken)));
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_login_and_logout_with_memory_storage() {
        let storage = Arc::new(MemoryTokenStorage::new());
        let store = TokenStore::open(storage.clone()).expect("open");

        let token = store.login("  abc123  ").expect("login");
        assert_eq!(token.expose_secret(), "abc123");
        assert!(store.is_authenticated());
        assert!(storage.load().expect("load").is_some());

        store.logout().expect("logout");
        assert!(store.token().is_none());
        assert!(storage.load().expect("load").is_none());
    }

    #[test]
    fn test_file_storage_round_trip_across_restarts() {
        let path = temp_token_path();
        let storage = Arc::new(FileTokenStorage::new(&path));

        let store = TokenStore::open(storage.clone()).expect("open");
        assert!(!store.is_authenticated());
        store.login("file-token").expect("login");

        // A new store over the same file restores the token.
        let reopened = TokenStore::open(storage.clone()).expect("reopen");
        assert_eq!(
            reopened.token().map(|t| t.expose_secret().to_string()),
            Some("file-token".to_string())
        );

        reopened.logout().expect("logout");
        assert!(!path.exists());
        // Clearing twice is fine.
        storage.clear().expect("clear");

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_from_config_uses_token_file() {
        let path = temp_token_path();
        let mut config = PosConfig::new(
            url::Url::parse(crate::config::DEFAULT_API_URL).expect("valid url"),
        );
        config.token_file = Some(path.clone());

        let store = TokenStore::from_config(&config).expect("open");
        assert!(!store.is_authenticated());
        store.login("configured").expect("login");
        assert!(path.exists());

        let reopened = TokenStore::from_config(&config).expect("reopen");
        assert_eq!(
            reopened.token().map(|t| t.expose_secret().to_string()),
            Some("configured".to_string())
        );

        reopened.logout().expect("logout");
        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_from_config_without_file_is_memory_only() {
        let config = PosConfig::new(
            url::Url::parse(crate::config::DEFAULT_API_URL).expect("valid url"),
        );
        let store = TokenStore::from_config(&config).expect("open");
        store.login("ephemeral").expect("login");

        assert!(!TokenStore::from_config(&config).expect("reopen").is_authenticated());
    }

    #[test]
    fn test_token_store_debug_hides_token() {
        let store = TokenStore::open(Arc::new(MemoryTokenStorage::new())).expect("open");
        store.login("secret-value").expect("login");
        assert!(!format!("{store:?}").contains("secret-value"));
    }

    #[test]
    fn test_draft_store_shares_state() {
        let store = DraftStore::new();
        let other = store.clone();

        store.update(|draft| {
            draft.cart.add(&tablecrm_pos_core::Product::new(
                tablecrm_pos_core::ProductId::new(1),
                "Tea",
                None,
            ));
        });
        assert!(other.read(OrderDraft::has_items));

        other.reset();
        assert_eq!(store.snapshot(), OrderDraft::new());
    }
}

//! Client-side authentication session slice.
//!
//! Three fields and three setters, reduced the way a UI store would. The
//! token is mirrored into a `TokenStore` (the browser's local storage in a
//! web client, a JSON file or memory here) so a restarted client picks it up.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::HashMap,
    io::{self, ErrorKind},
    path::PathBuf,
    sync::Mutex,
};
use tracing::warn;

/// Storage key the token lives under.
pub const TOKEN_KEY: &str = "token";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub loading: bool,
    pub login_data: Option<Value>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthAction {
    SetLoginData(Option<Value>),
    SetToken(Option<String>),
    SetLoading(bool),
}

impl AuthState {
    /// Initial state: loading, no login payload, token read from `store`.
    ///
    /// A stored value that is not a JSON string is ignored.
    pub fn initial(store: &dyn TokenStore) -> Self {
        let token = match store.get(TOKEN_KEY) {
            Ok(Some(raw)) => serde_json::from_str::<String>(&raw).ok(),
            Ok(None) => None,
            Err(err) => {
                warn!("could not read stored token: {}", err);
                None
            }
        };
        Self {
            loading: true,
            login_data: None,
            token,
        }
    }

    /// Apply one action in place.
    pub fn reduce(&mut self, action: AuthAction) {
        match action {
            AuthAction::SetLoginData(data) => self.login_data = data,
            AuthAction::SetToken(token) => self.token = token,
            AuthAction::SetLoading(loading) => self.loading = loading,
        }
    }
}

/// Key/value persistence with local-storage semantics (strings only).
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> io::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&self, key: &str) -> io::Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| io::Error::other("token store lock poisoned"))
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// A JSON object on disk, rewritten on every change.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> io::Result<HashMap<String, String>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|err| io::Error::new(ErrorKind::InvalidData, err)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(err) => Err(err),
        }
    }

    fn save(&self, entries: &HashMap<String, String>) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let bytes = serde_json::to_vec_pretty(entries)
            .map_err(|err| io::Error::new(ErrorKind::InvalidData, err))?;
        std::fs::write(&self.path, bytes)
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

/// The slice plus its token mirror.
pub struct AuthSession<S: TokenStore> {
    state: AuthState,
    store: S,
}

impl<S: TokenStore> AuthSession<S> {
    pub fn new(store: S) -> Self {
        Self {
            state: AuthState::initial(&store),
            store,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// Reduce `action`; a token change is written through to the store first.
    pub fn dispatch(&mut self, action: AuthAction) -> io::Result<()> {
        if let AuthAction::SetToken(token) = &action {
            match token {
                Some(token) => {
                    let encoded = serde_json::to_string(token)
                        .map_err(|err| io::Error::new(ErrorKind::InvalidData, err))?;
                    self.store.set(TOKEN_KEY, &encoded)?;
                }
                None => self.store.remove(TOKEN_KEY)?,
            }
        }
        self.state.reduce(action);
        Ok(())
    }
}

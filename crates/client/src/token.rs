//! Token passing between an authenticate step and later calls
//!
//! A [`TokenStore`] is a cheap cloneable handle. Clones share one map, so a
//! store handed to two flows that run at the same time is shared state:
//! writes under the same key overwrite each other and a reader sees
//! whichever write landed last. Create one store per logical flow unless
//! sharing is what you want.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A bearer or session token
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthToken(<{} chars>)", self.0.len())
    }
}

impl From<String> for AuthToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for AuthToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

/// Key -> token map. Last write wins per key; nothing expires.
#[derive(Clone, Default)]
pub struct TokenStore {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a token, returning whatever it replaced
    pub fn store_token(&self, key: impl Into<String>, token: impl Into<String>) -> Option<String> {
        self.inner.write().insert(key.into(), token.into())
    }

    pub fn get_token(&self, key: &str) -> Option<String> {
        self.inner.read().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.read().contains_key(key)
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.inner.write().remove(key)
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Whether two handles point at the same map
    pub fn shares_with(&self, other: &TokenStore) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self.inner.read().keys().cloned().collect();
        keys.sort();
        f.debug_struct("TokenStore").field("keys", &keys).finish()
    }
}

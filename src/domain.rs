use crate::errors::StorageError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;

/// Keys under which the session mirrors its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StorageKey {
    Memes,
    Users,
    CurrentUser,
    /// Names submitted since the last rollover.
    SubmittedMemes,
    /// Meme ids liked from this client, independent of the active user.
    UserLikes,
}

impl StorageKey {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageKey::Memes => "memes",
            StorageKey::Users => "users",
            StorageKey::CurrentUser => "currentUser",
            StorageKey::SubmittedMemes => "submittedMemes",
            StorageKey::UserLikes => "userLikes",
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable string-keyed store of JSON values.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static { // Send+Sync+'static required for Arc<dyn>
    /// Returns Ok(None) if nothing was ever stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Replaces whatever is stored under `key`.
    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;
}

/// Reads and decodes a typed value.
pub async fn load<T>(store: &dyn KeyValueStore, key: StorageKey) -> Result<Option<T>, StorageError>
where
    T: DeserializeOwned,
{
    match store.get(key.as_str()).await? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|source| StorageError::Serialization { key: key.to_string(), source }),
        None => Ok(None),
    }
}

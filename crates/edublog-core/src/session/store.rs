//! Persistent credential store
//!
//! Holds at most one session as two key/value entries: `auth_token` (raw
//! string) and `user_data` (JSON-serialized [`UserRecord`]).

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::user::UserRecord;
use crate::{Error, Result};

/// Key of the bearer token entry
pub const TOKEN_KEY: &str = "auth_token";
/// Key of the serialized user entry
pub const USER_KEY: &str = "user_data";

/// A session read back from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredentials {
    pub token: String,
    pub user: UserRecord,
}

/// Durable storage for the current session.
///
/// Only the session manager talks to a store.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Write both entries
    async fn save(&self, token: &str, user: &UserRecord) -> Result<()>;

    /// Read both entries; `None` unless both are present
    async fn load(&self) -> Result<Option<StoredCredentials>>;

    /// Erase both entries (erasing nothing is not an error)
    async fn clear(&self) -> Result<()>;
}

fn decode(token: Option<String>, user_json: Option<String>) -> Result<Option<StoredCredentials>> {
    match (token, user_json) {
        (Some(token), Some(user_json)) => {
            let user = serde_json::from_str(&user_json)
                .map_err(|e| Error::Storage(format!("Corrupt {} entry: {}", USER_KEY, e)))?;
            Ok(Some(StoredCredentials { token, user }))
        }
        _ => Ok(None),
    }
}

/// SQLite-based credential store
pub struct SqliteCredentialStore {
    conn: Mutex<Connection>,
}

impl SqliteCredentialStore {
    /// Open (or create) the store at the given database path
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_tables()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_tables()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Storage("credential store lock poisoned".to_string()))
    }

    fn init_tables(&self) -> Result<()> {
        self.lock()?.execute(
            "CREATE TABLE IF NOT EXISTS credentials (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    fn read(conn: &Connection, key: &str) -> Result<Option<String>> {
        let value = conn
            .query_row(
                "SELECT value FROM credentials WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn save(&self, token: &str, user: &UserRecord) -> Result<()> {
        let user_json = serde_json::to_string(user)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO credentials (key, value) VALUES (?1, ?2)",
            params![TOKEN_KEY, token],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO credentials (key, value) VALUES (?1, ?2)",
            params![USER_KEY, user_json],
        )?;
        tx.commit()?;
        debug!("Persisted session for user {}", user.id);
        Ok(())
    }

    async fn load(&self) -> Result<Option<StoredCredentials>> {
        let conn = self.lock()?;
        let token = Self::read(&conn, TOKEN_KEY)?;
        let user_json = Self::read(&conn, USER_KEY)?;
        decode(token, user_json)
    }

    async fn clear(&self) -> Result<()> {
        let affected = self.lock()?.execute(
            "DELETE FROM credentials WHERE key IN (?1, ?2)",
            params![TOKEN_KEY, USER_KEY],
        )?;
        debug!("Cleared {} credential entries", affected);
        Ok(())
    }
}

/// In-process store with failure injection (tests and headless tools)
#[derive(Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
    fail_clears: AtomicBool,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `save` fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `clear` fail
    pub fn set_fail_clears(&self, fail: bool) {
        self.fail_clears.store(fail, Ordering::SeqCst);
    }

    /// Raw entry lookup
    pub fn get(&self, key: &str) -> Option<String> {
        self.snapshot().get(key).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Inspection reads through a poisoned lock so `get` and `is_empty` agree
    fn snapshot(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| Error::Storage("credential store lock poisoned".to_string()))
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn save(&self, token: &str, user: &UserRecord) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Storage("injected write failure".to_string()));
        }
        let user_json = serde_json::to_string(user)?;
        let mut entries = self.lock()?;
        entries.insert(TOKEN_KEY.to_string(), token.to_string());
        entries.insert(USER_KEY.to_string(), user_json);
        Ok(())
    }

    async fn load(&self) -> Result<Option<StoredCredentials>> {
        let entries = self.lock()?;
        decode(entries.get(TOKEN_KEY).cloned(), entries.get(USER_KEY).cloned())
    }

    async fn clear(&self) -> Result<()> {
        if self.fail_clears.load(Ordering::SeqCst) {
            return Err(Error::Storage("injected clear failure".to_string()));
        }
        let mut entries = self.lock()?;
        entries.remove(TOKEN_KEY);
        entries.remove(USER_KEY);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::RoleProfile;

    fn admin() -> UserRecord {
        UserRecord {
            id: "9".to_string(),
            email: "a@x.com".to_string(),
            name: "Root".to_string(),
            profile: RoleProfile::Admin,
            school: Some("HQ".to_string()),
            age: None,
            profile_image: Some("images/root.png".to_string()),
            is_active: true,
            last_login: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_sqlite_save_load_clear() {
        let store = SqliteCredentialStore::in_memory().unwrap();
        assert!(store.load().await.unwrap().is_none());

        store.save("abc", &admin()).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.token, "abc");
        assert_eq!(loaded.user, admin());

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());

        // clearing twice is fine
        tokio_test::assert_ok!(store.clear().await);
    }

    #[tokio::test]
    async fn test_sqlite_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("edublog.db");

        {
            let store = SqliteCredentialStore::open(&path).unwrap();
            store.save("abc", &admin()).await.unwrap();
        }

        let reopened = SqliteCredentialStore::open(&path).unwrap();
        let loaded = reopened.load().await.unwrap().unwrap();
        assert_eq!(loaded.token, "abc");
    }

    #[tokio::test]
    async fn test_sqlite_corrupt_user_entry() {
        let store = SqliteCredentialStore::in_memory().unwrap();
        {
            let conn = store.lock().unwrap();
            conn.execute(
                "INSERT INTO credentials (key, value) VALUES (?1, ?2), (?3, ?4)",
                params![TOKEN_KEY, "abc", USER_KEY, "{not json"],
            )
            .unwrap();
        }
        assert!(matches!(store.load().await, Err(Error::Storage(_))));
    }

    #[tokio::test]
    async fn test_memory_failure_injection() {
        let store = MemoryCredentialStore::new();
        store.set_fail_writes(true);
        assert!(store.save("abc", &admin()).await.is_err());
        assert!(store.is_empty());

        store.set_fail_writes(false);
        store.save("abc", &admin()).await.unwrap();
        assert_eq!(store.get(TOKEN_KEY).as_deref(), Some("abc"));

        store.set_fail_clears(true);
        tokio_test::assert_err!(store.clear().await);
        assert!(store.load().await.unwrap().is_some());

        store.set_fail_clears(false);
        store.clear().await.unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_memory_inspection_agrees_after_poisoned_lock() {
        let store = std::sync::Arc::new(MemoryCredentialStore::new());
        store
            .entries
            .lock()
            .unwrap()
            .insert(TOKEN_KEY.to_string(), "abc".to_string());

        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.entries.lock().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(store.entries.is_poisoned());

        assert_eq!(store.get(TOKEN_KEY).as_deref(), Some("abc"));
        assert!(!store.is_empty());
    }
}

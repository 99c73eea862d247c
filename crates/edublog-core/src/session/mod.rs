//! Session management module
//!
//! Owns the authentication lifecycle and the persisted credentials.

mod manager;
mod store;
mod types;

pub use manager::SessionManager;
pub use store::{
    CredentialStore, MemoryCredentialStore, SqliteCredentialStore, StoredCredentials, TOKEN_KEY,
    USER_KEY,
};
pub use types::{Session, SessionStatus};

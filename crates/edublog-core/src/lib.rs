//! edublog-core: session and access-control core for the edublog client
//!
//! Owns the authentication lifecycle (initialize / login / logout), the
//! persisted credential store, and the route gate that decides which
//! screens are reachable in which session state.

pub mod auth;
pub mod config;
pub mod envelope;
pub mod error;
pub mod route;
pub mod session;
pub mod user;

pub use auth::{AuthService, LoginGrant, LoginRequest, RawResponse};
pub use config::{ApiConfig, Config, SessionConfig};
pub use envelope::Envelope;
pub use error::{Error, Result};
pub use route::{Decision, Navigator, RedirectReason, Route, RouteGroup, RouteKind, RouteTable};
pub use session::{
    CredentialStore, MemoryCredentialStore, Session, SessionManager, SessionStatus,
    SqliteCredentialStore, StoredCredentials,
};
pub use user::{Role, RoleProfile, UserRecord};

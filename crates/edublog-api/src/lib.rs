//! edublog-api: HTTP client for the edublog backend
//!
//! - [`HttpAuthService`]: the login transport used by the session manager
//! - [`BlogClient`]: users, posts, comments and image upload
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use edublog_api::{BlogClient, HttpAuthService};
//! use edublog_core::{Config, MemoryCredentialStore, SessionManager};
//!
//! let config = Config::load()?;
//! let auth = Arc::new(HttpAuthService::new(&config.api)?);
//! let session = Arc::new(SessionManager::new(
//!     Arc::new(MemoryCredentialStore::new()),
//!     auth,
//!     config.session.clone(),
//! ));
//! session.initialize().await;
//! session.login("prof@school.com", "secret").await?;
//!
//! let client = BlogClient::new(&config.api, session.clone())?;
//! let page = client.list_posts(1, 10, None).await?;
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod models;

pub use auth::HttpAuthService;
pub use client::BlogClient;
pub use error::{ApiError, Result};
pub use models::{
    Author, Comment, CreateUserOutcome, ImageFile, LikeStatus, NewPost, NewUser, Page,
    Pagination, Post, UserUpdate,
};

//! Session management
//!
//! The manager is the single writer of both the in-memory session and the
//! credential store. Readers get snapshots or a `watch` receiver.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::auth::{AuthService, LoginGrant, LoginRequest, classify_login_response};
use crate::config::SessionConfig;
use crate::session::{CredentialStore, Session, SessionStatus};
use crate::user::UserRecord;
use crate::{Error, Result};

/// Session manager that handles the authentication lifecycle
pub struct SessionManager {
    state: watch::Sender<Session>,
    store: Arc<dyn CredentialStore>,
    auth: Arc<dyn AuthService>,
    config: SessionConfig,
    /// Bumped by every initialize/login/logout; results of older
    /// operations are dropped
    generation: AtomicU64,
    /// Serializes store writes with the in-memory update that follows them
    commit: Mutex<()>,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        auth: Arc<dyn AuthService>,
        config: SessionConfig,
    ) -> Self {
        let (state, _) = watch::channel(Session::default());
        Self {
            state,
            store,
            auth,
            config,
            generation: AtomicU64::new(0),
            commit: Mutex::new(()),
        }
    }

    /// Snapshot of the current session
    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Receiver notified on every session transition
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Bearer token, only while fully authenticated
    pub fn token(&self) -> Option<String> {
        let session = self.state.borrow();
        session.bearer_token().ok().map(str::to_string)
    }

    /// Authenticated user, only while fully authenticated
    pub fn user(&self) -> Option<UserRecord> {
        self.state.borrow().authenticated_user().cloned()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Apply `update` only if `generation` is still the latest operation.
    ///
    /// The generation check runs under the watch lock, so a newer operation
    /// either sees this update or prevents it.
    fn apply(&self, generation: u64, update: impl FnOnce(&mut Session)) -> bool {
        self.state.send_if_modified(|session| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            update(session);
            debug_assert!(session.is_consistent(), "torn session: {:?}", session.status);
            true
        })
    }

    /// Startup protocol: discard any persisted session.
    ///
    /// Every launch re-authenticates. Store failures are logged and
    /// swallowed; the session always ends `Unauthenticated`.
    pub async fn initialize(&self) {
        let generation = self.begin();
        info!("Initializing session, discarding persisted credentials");

        self.apply(generation, |session| {
            session.status = SessionStatus::Initializing;
            session.token = None;
            session.user = None;
        });

        {
            let _commit = self.commit.lock().await;
            if let Err(e) = self.store.clear().await {
                warn!("Failed to clear persisted session at startup: {}", e);
            }
        }

        // again, in case a reader caught a value between the first clear and the store erase
        self.apply(generation, |session| {
            session.token = None;
            session.user = None;
        });

        let delay = self.config.settle_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.apply(generation, |session| {
            session.status = SessionStatus::Unauthenticated;
            session.token = None;
            session.user = None;
        }) {
            debug!("Session initialized");
        } else {
            debug!("Initialization overtaken by a newer session operation");
        }
    }

    /// Login protocol.
    ///
    /// Fails with `Network`, `Protocol`, `Credential` or `Storage`; on any
    /// failure the session is left `Unauthenticated`. Nothing is retried.
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let generation = self.begin();
        let request = LoginRequest::new(email.trim(), password);
        info!("Attempting login for {}", request.email);

        self.apply(generation, |session| {
            session.status = SessionStatus::Authenticating;
            session.token = None;
            session.user = None;
        });

        let result = match self.exchange(&request).await {
            Ok(grant) => self.commit_grant(generation, grant).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => Ok(()),
            Err(Error::Superseded) => {
                info!("Login for {} superseded by a newer session operation", request.email);
                Err(Error::Superseded)
            }
            Err(e) => {
                warn!("Login for {} failed: {}", request.email, e);
                let _commit = self.commit.lock().await;
                // a previous principal may still be persisted
                if self.generation() == generation {
                    if let Err(clear_err) = self.store.clear().await {
                        warn!("Failed to erase persisted session after failed login: {}", clear_err);
                    }
                }
                self.apply(generation, |session| {
                    session.status = SessionStatus::Unauthenticated;
                    session.token = None;
                    session.user = None;
                });
                Err(e)
            }
        }
    }

    async fn exchange(&self, request: &LoginRequest) -> Result<LoginGrant> {
        let response = self.auth.login(request).await?;
        debug!("Login response status: {}", response.status);
        classify_login_response(&response)
    }

    /// Persist first, then publish; both under the commit lock.
    async fn commit_grant(&self, generation: u64, grant: LoginGrant) -> Result<()> {
        let _commit = self.commit.lock().await;

        if self.generation() != generation {
            return Err(Error::Superseded);
        }

        self.store.save(&grant.token, &grant.user).await?;

        let user_id = grant.user.id.clone();
        let role = grant.user.role();
        let applied = self.apply(generation, move |session| {
            session.token = Some(grant.token);
            session.user = Some(grant.user);
            session.status = SessionStatus::Authenticated;
        });

        if !applied {
            // nothing newer has committed yet (we hold the lock), so the
            // store holds only what we just wrote
            if let Err(e) = self.store.clear().await {
                warn!("Failed to erase superseded login: {}", e);
            }
            return Err(Error::Superseded);
        }

        info!("Login succeeded for user {} ({})", user_id, role);
        Ok(())
    }

    /// Logout protocol.
    ///
    /// Erases the store, then clears the in-memory session. Never fails;
    /// the session reads `Unauthenticated` when this returns.
    pub async fn logout(&self) {
        let generation = self.begin();
        info!("Logging out");

        let _commit = self.commit.lock().await;
        if let Err(e) = self.store.clear().await {
            warn!("Failed to erase persisted session on logout: {}", e);
        }

        self.apply(generation, |session| {
            session.status = SessionStatus::Unauthenticated;
            session.token = None;
            session.user = None;
        });
    }
}

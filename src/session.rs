//! Per-visitor session state: who is signed in and their profile row.
//!
//! A [`SessionHolder`] is built for one bearer of a token. It resolves the
//! identity once on [`SessionHolder::initialize`], keeps it current as auth
//! events arrive, and publishes every change on a `watch` channel.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::{
    db::{userdb::UserExt, Gateway},
    guard::GuardInput,
    models::usermodel::User,
    service::{
        auth_service::{AuthEvent, AuthService, Identity, Session},
        error::ServiceError,
    },
};

/// Route a signed-out visitor is sent to.
pub const LANDING_ROUTE: &str = "/";

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Initializing,
    Anonymous,
    Authenticated {
        identity: Identity,
        /// `None` when the row could not be loaded.
        profile: Option<User>,
    },
    SignedOut,
}

impl SessionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Initializing)
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Authenticated { identity, .. } => Some(identity),
            _ => None,
        }
    }

    pub fn profile(&self) -> Option<&User> {
        match self {
            SessionState::Authenticated { profile, .. } => profile.as_ref(),
            _ => None,
        }
    }

    pub fn guard_input<'a>(&self, path: &'a str) -> GuardInput<'a> {
        GuardInput {
            loading: self.is_loading(),
            authenticated: self.identity().is_some(),
            role: self.profile().map(|p| p.role),
            path,
        }
    }
}

#[derive(Debug)]
pub struct SessionHolder {
    auth: Arc<AuthService>,
    db_client: Arc<dyn Gateway>,
    state: watch::Sender<SessionState>,
}

impl SessionHolder {
    pub fn new(auth: Arc<AuthService>, db_client: Arc<dyn Gateway>) -> Self {
        let (state, _) = watch::channel(SessionState::Initializing);
        Self {
            auth,
            db_client,
            state,
        }
    }

    fn set(&self, next: SessionState) {
        self.state.send_replace(next);
    }

    /// Loads the user row, logging and returning `None` on failure.
    async fn load_profile(&self, identity: &Identity) -> Option<User> {
        match self.db_client.get_user(Some(identity.user_id), None).await {
            Ok(Some(user)) => Some(user),
            Ok(None) => {
                warn!("No user row for identity {}", identity.user_id);
                None
            }
            Err(e) => {
                warn!("Failed to load profile for {}: {}", identity.user_id, e);
                None
            }
        }
    }

    /// Resolves the session behind `token`. Always leaves the loading state,
    /// whatever happens along the way.
    pub async fn initialize(&self, token: Option<&str>) -> SessionState {
        self.set(SessionState::Initializing);

        let identity = match token {
            Some(token) => match self.auth.get_session(token).await {
                Ok(identity) => identity,
                Err(e) => {
                    warn!("Session lookup failed: {}", e);
                    None
                }
            },
            None => None,
        };

        let next = match identity {
            Some(identity) => {
                let profile = self.load_profile(&identity).await;
                SessionState::Authenticated { identity, profile }
            }
            None => SessionState::Anonymous,
        };

        self.set(next.clone());
        next
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ServiceError> {
        let (session, user) = self.auth.sign_in(email, password).await?;
        self.set(SessionState::Authenticated {
            identity: session.identity.clone(),
            profile: Some(user),
        });
        Ok(session)
    }

    /// Applies an auth event if it concerns this session.
    pub async fn handle_auth_event(&self, event: &AuthEvent) {
        let current = match self.current_user() {
            Some(identity) if identity.user_id == event.user_id() => identity,
            _ => return,
        };

        match event {
            AuthEvent::SignedIn(_) => {
                debug!("Sign-in elsewhere for {}, reloading profile", current.user_id);
                self.refresh_profile().await;
            }
            AuthEvent::TokenRefreshed { previous, identity } if *previous == current.token_id => {
                let profile = self.load_profile(identity).await;
                self.set(SessionState::Authenticated {
                    identity: identity.clone(),
                    profile,
                });
            }
            AuthEvent::SignedOut { token_id, .. } if *token_id == current.token_id => {
                info!("Session for {} ended", current.user_id);
                self.set(SessionState::SignedOut);
            }
            _ => {}
        }
    }

    /// Opens a receiver on the auth broadcast. Take it before `initialize`
    /// so nothing published while the session resolves is lost.
    pub fn auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.auth.subscribe()
    }

    /// Feeds auth events from `events` into this holder until it is dropped
    /// or the auth service goes away. Events buffered in the receiver are
    /// applied first.
    pub fn watch_auth_events(
        self: &Arc<Self>,
        mut events: broadcast::Receiver<AuthEvent>,
    ) -> tokio::task::JoinHandle<()> {
        let holder = Arc::downgrade(self);

        tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Session watcher skipped {} auth events", skipped);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };

                match holder.upgrade() {
                    Some(holder) => holder.handle_auth_event(&event).await,
                    None => break,
                }
            }
        })
    }

    /// Re-reads the profile row for the current identity.
    pub async fn refresh_profile(&self) -> Option<User> {
        let identity = self.current_user()?;
        let profile = self.load_profile(&identity).await;

        // sign-out may have landed while we were loading
        if self.current_user().map(|i| i.token_id) == Some(identity.token_id) {
            self.set(SessionState::Authenticated {
                identity,
                profile: profile.clone(),
            });
        }
        profile
    }

    /// Revokes the session and returns the route to navigate to.
    pub async fn sign_out(&self) -> Result<&'static str, ServiceError> {
        if let Some(identity) = self.current_user() {
            self.auth.end_session(&identity).await?;
        }
        self.set(SessionState::SignedOut);
        Ok(LANDING_ROUTE)
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn current_user(&self) -> Option<Identity> {
        self.state.borrow().identity().cloned()
    }

    pub fn current_profile(&self) -> Option<User> {
        self.state.borrow().profile().cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }
}

// service/auth_service.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    db::{sessiondb::SessionExt, userdb::UserExt, Gateway},
    error::ErrorMessage,
    models::usermodel::{NewUser, User, UserRole},
    service::error::{is_unique_violation, ServiceError},
    utils::{password, token},
};

/// Who a valid token belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub token_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub identity: Identity,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(Identity),
    TokenRefreshed { previous: Uuid, identity: Identity },
    SignedOut { user_id: Uuid, token_id: Uuid },
}

impl AuthEvent {
    pub fn user_id(&self) -> Uuid {
        match self {
            AuthEvent::SignedIn(identity) => identity.user_id,
            AuthEvent::TokenRefreshed { identity, .. } => identity.user_id,
            AuthEvent::SignedOut { user_id, .. } => *user_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthService {
    db_client: Arc<dyn Gateway>,
    jwt_secret: String,
    jwt_maxage: i64,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthService {
    pub fn new(db_client: Arc<dyn Gateway>, jwt_secret: impl Into<String>, jwt_maxage: i64) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            db_client,
            jwt_secret: jwt_secret.into(),
            jwt_maxage,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: AuthEvent) {
        // nobody listening is fine
        let _ = self.events.send(event);
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        role: UserRole,
    ) -> Result<User, ServiceError> {
        let email = email.trim().to_lowercase();
        let password_hash = password::hash(password)?;

        let result = self
            .db_client
            .save_user(NewUser {
                email,
                full_name: full_name.trim().to_string(),
                password_hash,
                role,
            })
            .await;

        match result {
            Ok(user) => {
                info!("New {} account created: {}", user.role.to_str(), user.id);
                Ok(user)
            }
            Err(e) if is_unique_violation(&e) => Err(ServiceError::EmailExists),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(Session, User), ServiceError> {
        let email = email.trim().to_lowercase();
        let user = self
            .db_client
            .get_user(None, Some(&email))
            .await?
            .ok_or_else(|| ServiceError::Authentication(ErrorMessage::WrongCredentials.to_string()))?;

        let password_matched = password::compare(password, &user.password)
            .map_err(|_| ServiceError::Authentication(ErrorMessage::WrongCredentials.to_string()))?;

        if !password_matched {
            return Err(ServiceError::Authentication(ErrorMessage::WrongCredentials.to_string()));
        }

        let session = self.issue(&user.id, &user.email)?;
        info!("User {} signed in", user.id);
        self.emit(AuthEvent::SignedIn(session.identity.clone()));

        Ok((session, user))
    }

    fn issue(&self, user_id: &Uuid, email: &str) -> Result<Session, ServiceError> {
        let (token, claims) = token::create_token(
            &user_id.to_string(),
            email,
            self.jwt_secret.as_bytes(),
            self.jwt_maxage,
        )
        .map_err(|e| ServiceError::Other(e.to_string()))?;

        let token_id = claims
            .token_id()
            .ok_or_else(|| ServiceError::Other("token issued without id".to_string()))?;

        let identity = Identity {
            user_id: *user_id,
            email: claims.email.clone(),
            token_id,
            expires_at: claims.expires_at(),
        };

        Ok(Session {
            token,
            expires_at: identity.expires_at,
            identity,
        })
    }

    /// Resolves a token to its identity. Invalid, expired and revoked tokens
    /// all resolve to `None`.
    pub async fn get_session(&self, token: &str) -> Result<Option<Identity>, ServiceError> {
        let claims = match token::decode_token(token, self.jwt_secret.as_bytes()) {
            Ok(claims) => claims,
            Err(_) => return Ok(None),
        };

        let (user_id, token_id) = match (claims.user_id(), claims.token_id()) {
            (Some(user_id), Some(token_id)) => (user_id, token_id),
            _ => return Ok(None),
        };

        if self.db_client.is_token_revoked(token_id).await? {
            return Ok(None);
        }

        Ok(Some(Identity {
            user_id,
            expires_at: claims.expires_at(),
            email: claims.email,
            token_id,
        }))
    }

    /// Swaps a live token for a fresh one and revokes the old one.
    pub async fn refresh(&self, token: &str) -> Result<Session, ServiceError> {
        let identity = self
            .get_session(token)
            .await?
            .ok_or_else(|| ServiceError::Authentication(ErrorMessage::InvalidToken.to_string()))?;

        let session = self.issue(&identity.user_id, &identity.email)?;
        self.db_client
            .revoke_token(identity.token_id, identity.expires_at)
            .await?;

        info!("Token refreshed for user {}", identity.user_id);
        self.emit(AuthEvent::TokenRefreshed {
            previous: identity.token_id,
            identity: session.identity.clone(),
        });

        Ok(session)
    }

    /// Signing out with a token that is already dead is a no-op.
    pub async fn sign_out(&self, token: &str) -> Result<(), ServiceError> {
        match self.get_session(token).await? {
            Some(identity) => self.end_session(&identity).await,
            None => {
                warn!("Sign-out with an invalid or revoked token");
                Ok(())
            }
        }
    }

    pub async fn end_session(&self, identity: &Identity) -> Result<(), ServiceError> {
        self.db_client
            .revoke_token(identity.token_id, identity.expires_at)
            .await?;

        info!("User {} signed out", identity.user_id);
        self.emit(AuthEvent::SignedOut {
            user_id: identity.user_id,
            token_id: identity.token_id,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryGateway;

    fn service() -> AuthService {
        AuthService::new(Arc::new(MemoryGateway::new()), "test-secret", 60)
    }

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let auth = service();
        let user = auth
            .sign_up("Alice@Example.com ", "password123", "Alice", UserRole::Employee)
            .await
            .unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert_ne!(user.password, "password123");

        let (session, signed_in) = auth.sign_in("alice@example.com", "password123").await.unwrap();
        assert_eq!(signed_in.id, user.id);

        let identity = auth.get_session(&session.token).await.unwrap().unwrap();
        assert_eq!(identity.user_id, user.id);
        assert_eq!(identity, session.identity);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let auth = service();
        auth.sign_up("bob@example.com", "password123", "Bob", UserRole::Client)
            .await
            .unwrap();
        let err = auth
            .sign_up("BOB@example.com", "password456", "Bob 2", UserRole::Client)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::EmailExists));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let auth = service();
        auth.sign_up("carol@example.com", "password123", "Carol", UserRole::Client)
            .await
            .unwrap();

        let wrong_password = auth.sign_in("carol@example.com", "nope-nope").await.unwrap_err();
        let unknown = auth.sign_in("nobody@example.com", "password123").await.unwrap_err();
        assert_eq!(wrong_password.to_string(), unknown.to_string());
        assert!(matches!(wrong_password, ServiceError::Authentication(_)));
    }

    #[tokio::test]
    async fn sign_out_revokes_and_notifies() {
        let auth = service();
        auth.sign_up("dan@example.com", "password123", "Dan", UserRole::Employee)
            .await
            .unwrap();
        let mut events = auth.subscribe();
        let (session, user) = auth.sign_in("dan@example.com", "password123").await.unwrap();

        auth.sign_out(&session.token).await.unwrap();
        assert!(auth.get_session(&session.token).await.unwrap().is_none());
        // second sign-out is harmless
        auth.sign_out(&session.token).await.unwrap();

        assert!(matches!(events.recv().await.unwrap(), AuthEvent::SignedIn(_)));
        assert_eq!(
            events.recv().await.unwrap(),
            AuthEvent::SignedOut {
                user_id: user.id,
                token_id: session.identity.token_id
            }
        );
    }

    #[tokio::test]
    async fn refresh_replaces_token() {
        let auth = service();
        auth.sign_up("erin@example.com", "password123", "Erin", UserRole::Client)
            .await
            .unwrap();
        let (session, _) = auth.sign_in("erin@example.com", "password123").await.unwrap();
        let mut events = auth.subscribe();

        let refreshed = auth.refresh(&session.token).await.unwrap();
        assert_ne!(refreshed.identity.token_id, session.identity.token_id);
        assert!(auth.get_session(&session.token).await.unwrap().is_none());
        assert!(auth.get_session(&refreshed.token).await.unwrap().is_some());

        match events.recv().await.unwrap() {
            AuthEvent::TokenRefreshed { previous, identity } => {
                assert_eq!(previous, session.identity.token_id);
                assert_eq!(identity, refreshed.identity);
            }
            other => panic!("unexpected event {:?}", other),
        }

        assert!(auth.refresh(&session.token).await.is_err());
    }

    #[tokio::test]
    async fn garbage_token_has_no_session() {
        let auth = service();
        assert!(auth.get_session("not-a-jwt").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_revocations_are_purged() {
        let db = Arc::new(MemoryGateway::new());
        let auth = AuthService::new(db.clone(), "test-secret", 60);
        let stale = Uuid::new_v4();
        db.revoke_token(stale, Utc::now() - chrono::Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(db.revoked_count(), 1);

        auth.sign_up("fay@example.com", "password123", "Fay", UserRole::Client)
            .await
            .unwrap();
        let (session, _) = auth.sign_in("fay@example.com", "password123").await.unwrap();
        auth.sign_out(&session.token).await.unwrap();

        assert_eq!(db.revoked_count(), 1);
        assert!(!db.is_token_revoked(stale).await.unwrap());
        assert!(db.is_token_revoked(session.identity.token_id).await.unwrap());
    }
}

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::dto::{LoginPayload, RegisterPayload};
use crate::auth::jwt::{JwtKeys, TokenKind};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo::{CreateUserError, NewUser, User, UserStore};
use crate::auth::validate::check_password_policy;
use crate::error::ApiError;

/// Issued at login: a short-lived access token and a long-lived refresh token.
#[derive(Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// The authentication workflow. Owns no I/O itself; the store and keys are
/// injected so tests can run against an in-memory store.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, keys: JwtKeys) -> Self {
        Self { store, keys }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    /// Create a new user. Fails fast: nothing is persisted unless every
    /// check passes. No tokens are issued; registration is not a login.
    pub async fn register(&self, payload: RegisterPayload) -> Result<User, ApiError> {
        // Both lookups are independent reads, so they run concurrently.
        let (by_email, by_username) = tokio::join!(
            self.store.find_by_email(&payload.email),
            self.store.find_by_username(&payload.username),
        );
        let email_taken = by_email?.is_some();
        let username_taken = by_username?.is_some();
        if email_taken || username_taken {
            warn!(email_taken, username_taken, "registration collided");
            return Err(ApiError::DuplicateUser {
                email_taken,
                username_taken,
            });
        }

        if payload.password != payload.confirm_password {
            return Err(ApiError::PasswordMismatch);
        }

        check_password_policy(&payload.password)?;

        let password_hash = hash_password(&payload.password)?;
        let user = self
            .store
            .create(NewUser {
                email: payload.email,
                username: payload.username,
                name: payload.name,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                // A concurrent registration can win the race between our
                // uniqueness reads and this insert; the constraint violation
                // is translated, not retried.
                CreateUserError::Duplicate { email, username } => {
                    warn!(email, username, "registration lost uniqueness race");
                    ApiError::DuplicateUser {
                        email_taken: email,
                        username_taken: username,
                    }
                }
                CreateUserError::Other(e) => ApiError::Internal(e),
            })?;

        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Exchange credentials for a token pair. Unknown email and wrong
    /// password produce the same client-visible message.
    pub async fn login(&self, payload: LoginPayload) -> Result<TokenPair, ApiError> {
        let user = match self.store.find_by_email(&payload.email).await? {
            Some(user) => user,
            None => {
                warn!("login with unknown email");
                return Err(ApiError::InvalidCredentials { known_email: false });
            }
        };

        if !verify_password(&payload.password, &user.password_hash)? {
            warn!(user_id = %user.id, "login with wrong password");
            return Err(ApiError::InvalidCredentials { known_email: true });
        }

        let access_token = self.keys.sign_access(user.id)?;
        let refresh_token = self.keys.sign_refresh(user.id)?;
        info!(user_id = %user.id, "user logged in");
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Exchange a valid refresh token for a new access token. The refresh
    /// token itself is not rotated.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, ApiError> {
        let claims = self
            .keys
            .verify(refresh_token, TokenKind::Refresh)
            .map_err(|_| ApiError::InvalidToken)?;

        let user = self
            .store
            .find_by_id(claims.sub)
            .await?
            .ok_or(ApiError::UserNotFound)?;

        let access_token = self.keys.sign_access(user.id)?;
        info!(user_id = %user.id, "access token refreshed");
        Ok(access_token)
    }

    /// Resolve the subject of an already-verified token. The user may have
    /// disappeared since the token was minted.
    pub async fn current_user(&self, user_id: Uuid) -> Result<User, ApiError> {
        self.store
            .find_by_id(user_id)
            .await?
            .ok_or(ApiError::UserNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::mem::MemStore;
    use crate::config::JwtConfig;

    fn make_service() -> AuthService {
        let keys = JwtKeys::from_config(&JwtConfig {
            access_secret: "access-test-secret".into(),
            refresh_secret: "refresh-test-secret".into(),
            issuer: "test-issuer".into(),
            access_ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        });
        AuthService::new(Arc::new(MemStore::default()), keys)
    }

    fn register_payload(email: &str, username: &str, password: &str) -> RegisterPayload {
        RegisterPayload {
            email: email.into(),
            username: username.into(),
            password: password.into(),
            confirm_password: password.into(),
            name: "A".into(),
        }
    }

    fn login_payload(email: &str, password: &str) -> LoginPayload {
        LoginPayload {
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn register_then_login_roundtrip() {
        let service = make_service();
        let user = service
            .register(register_payload("a@x.com", "a", "Abcdef12"))
            .await
            .expect("register");
        assert_eq!(user.email, "a@x.com");
        assert_ne!(user.password_hash, "Abcdef12");

        let pair = service
            .login(login_payload("a@x.com", "Abcdef12"))
            .await
            .expect("login");
        assert!(!pair.access_token.is_empty());
        assert!(!pair.refresh_token.is_empty());
        assert_ne!(pair.access_token, pair.refresh_token);
    }

    #[tokio::test]
    async fn register_rejects_duplicates_per_field() {
        let service = make_service();
        service
            .register(register_payload("a@x.com", "a", "Abcdef12"))
            .await
            .expect("first register");

        // Same email, fresh username.
        let err = service
            .register(register_payload("a@x.com", "b", "Abcdef12"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::DuplicateUser {
                email_taken: true,
                username_taken: false
            }
        ));

        // Fresh email, same username.
        let err = service
            .register(register_payload("b@x.com", "a", "Abcdef12"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::DuplicateUser {
                email_taken: false,
                username_taken: true
            }
        ));

        // Both collide.
        let err = service
            .register(register_payload("a@x.com", "a", "Abcdef12"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::DuplicateUser {
                email_taken: true,
                username_taken: true
            }
        ));
    }

    #[tokio::test]
    async fn register_rejects_password_mismatch_before_policy() {
        let service = make_service();
        let mut payload = register_payload("a@x.com", "a", "Abcdef12");
        payload.confirm_password = "Abcdef13".into();
        let err = service.register(payload).await.unwrap_err();
        assert!(matches!(err, ApiError::PasswordMismatch));
        // Nothing was persisted.
        assert!(service
            .login(login_payload("a@x.com", "Abcdef12"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn register_enforces_password_policy() {
        let service = make_service();
        let err = service
            .register(register_payload("a@x.com", "a", "abcde"))
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, ApiError::InvalidPassword(_)));
        assert!(msg.contains("minimum length of 8"));
        assert!(msg.contains("1 uppercase letter"));
        assert!(msg.contains("1 digit"));
    }

    #[tokio::test]
    async fn login_failures_share_one_message() {
        let service = make_service();
        service
            .register(register_payload("a@x.com", "a", "Abcdef12"))
            .await
            .expect("register");

        let unknown = service
            .login(login_payload("nobody@x.com", "Abcdef12"))
            .await
            .unwrap_err();
        let wrong = service
            .login(login_payload("a@x.com", "WrongPass1"))
            .await
            .unwrap_err();
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn refresh_preserves_token_subject() {
        let service = make_service();
        let user = service
            .register(register_payload("a@x.com", "a", "Abcdef12"))
            .await
            .expect("register");
        let pair = service
            .login(login_payload("a@x.com", "Abcdef12"))
            .await
            .expect("login");

        let access = service
            .refresh(&pair.refresh_token)
            .await
            .expect("refresh");
        let claims = service
            .keys()
            .verify(&access, TokenKind::Access)
            .expect("verify refreshed access token");
        assert_eq!(claims.sub, user.id);
    }

    #[tokio::test]
    async fn refresh_rejects_access_tokens_and_garbage() {
        let service = make_service();
        service
            .register(register_payload("a@x.com", "a", "Abcdef12"))
            .await
            .expect("register");
        let pair = service
            .login(login_payload("a@x.com", "Abcdef12"))
            .await
            .expect("login");

        let err = service.refresh(&pair.access_token).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidToken));

        let err = service.refresh("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidToken));
    }

    #[tokio::test]
    async fn refresh_fails_when_subject_is_gone() {
        let service = make_service();
        // Token for a user id the store has never seen.
        let token = service
            .keys()
            .sign_refresh(Uuid::new_v4())
            .expect("sign refresh");
        let err = service.refresh(&token).await.unwrap_err();
        assert!(matches!(err, ApiError::UserNotFound));
    }

    #[tokio::test]
    async fn current_user_resolves_registered_user() {
        let service = make_service();
        let user = service
            .register(register_payload("a@x.com", "a", "Abcdef12"))
            .await
            .expect("register");
        let found = service.current_user(user.id).await.expect("current user");
        assert_eq!(found.id, user.id);
        assert_eq!(found.username, "a");

        let err = service.current_user(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ApiError::UserNotFound));
    }
}

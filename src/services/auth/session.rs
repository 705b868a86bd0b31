use log::{error, info, warn};

use crate::auth_stores::SharedUserStore;
use crate::error::{AppError, AppResult};
use crate::models::auth_requests::TokenPair;
use crate::services::auth::credentials::CredentialVerifier;
use crate::services::auth::jwt::JwtManager;

/// Login and refresh: the two ways a caller obtains a token pair.
///
/// Both either return a complete pair or an error; there is no server-side
/// session row, so nothing needs cleaning up on failure.
#[derive(Clone)]
pub struct SessionService {
    jwt: JwtManager,
    verifier: CredentialVerifier,
    store: SharedUserStore,
}

impl SessionService {
    pub fn new(jwt: JwtManager, store: SharedUserStore) -> Self {
        Self {
            jwt,
            verifier: CredentialVerifier::new(store.clone()),
            store,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> AppResult<TokenPair> {
        let user = self.verifier.verify(email, password).await?;

        let access_token = self.jwt.issue_access_token(user.user_id, &user.email, user.role)?;
        let refresh_token = self.jwt.issue_refresh_token(user.user_id)?;

        info!("User {} logged in (role: {})", user.user_id, user.role);
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Rotates both tokens. Email and role come from the store as of now,
    /// never from anything the caller presented.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair> {
        // A refresh token outside its window is simply unusable; the client
        // has to log in again either way
        let user_id = self.jwt.parse_refresh_token(refresh_token).map_err(|e| match e {
            AppError::TokenExpired(msg) => AppError::InvalidToken(msg),
            other => other,
        })?;

        let profile = match self.store.lookup_profile(user_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                warn!("Refresh token presented for user {} who no longer exists", user_id);
                return Err(AppError::Internal(format!("User {} not found during refresh", user_id)));
            }
            Err(e) => {
                error!("Profile lookup failed during refresh for user {}: {}", user_id, e);
                return Err(e.into());
            }
        };

        let access_token = self.jwt.issue_access_token(profile.id, &profile.email, profile.role)?;
        let refresh_token = self.jwt.issue_refresh_token(profile.id)?;

        info!("Rotated tokens for user {} (role: {})", profile.id, profile.role);
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth_stores::{InMemoryUserStore, NewUser, UserStore};
    use crate::config::AuthConfig;
    use crate::models::role::{Role, UserId};
    use crate::security::password::hash_password;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn jwt() -> JwtManager {
        JwtManager::new(&AuthConfig {
            jwt_secret: "session-test-secret-session-test-secret".to_string(),
            access_token_ttl_minutes: 15,
            refresh_token_ttl_days: 7,
        })
        .unwrap()
    }

    async fn setup(role: Role) -> (SessionService, Arc<InMemoryUserStore>, UserId) {
        let store = Arc::new(InMemoryUserStore::new());
        let profile = store
            .create_user(NewUser {
                email: "a@x.com".to_string(),
                username: "a".to_string(),
                password_hash: hash_password("s3cret").unwrap(),
                role,
            })
            .await
            .unwrap();
        (SessionService::new(jwt(), store.clone()), store, profile.id)
    }

    #[tokio::test]
    async fn admin_login_yields_admin_access_token() {
        let (sessions, _, id) = setup(Role::Admin).await;

        let pair = sessions.login("a@x.com", "s3cret").await.unwrap();
        let claims = jwt().parse_access_token(&pair.access_token).unwrap();

        assert_eq!(claims.user_id, id);
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(jwt().parse_refresh_token(&pair.refresh_token).unwrap(), id);
    }

    #[tokio::test]
    async fn wrong_password_yields_no_tokens() {
        let (sessions, _, _) = setup(Role::Admin).await;

        let err = sessions.login("a@x.com", "wrong").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials(_)));
    }

    #[tokio::test]
    async fn refresh_picks_up_role_changes_from_the_store() {
        let (sessions, store, id) = setup(Role::Admin).await;
        let pair = sessions.login("a@x.com", "s3cret").await.unwrap();

        store.set_role(id, Role::User);
        let rotated = sessions.refresh(&pair.refresh_token).await.unwrap();
        let claims = jwt().parse_access_token(&rotated.access_token).unwrap();

        assert_eq!(claims.role, Role::User);
        assert_eq!(jwt().parse_refresh_token(&rotated.refresh_token).unwrap(), id);
    }

    #[tokio::test]
    async fn refresh_with_access_token_is_invalid() {
        let (sessions, _, _) = setup(Role::User).await;
        let pair = sessions.login("a@x.com", "s3cret").await.unwrap();

        let err = sessions.refresh(&pair.access_token).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn expired_refresh_token_is_invalid() {
        let (sessions, _, id) = setup(Role::User).await;
        let stale = jwt()
            .issue_refresh_token_at(id, Utc::now() - Duration::days(30))
            .unwrap();

        let err = sessions.refresh(&stale).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn refresh_for_deleted_user_is_internal_error() {
        let (sessions, store, id) = setup(Role::User).await;
        let pair = sessions.login("a@x.com", "s3cret").await.unwrap();

        store.remove(id);
        let err = sessions.refresh(&pair.refresh_token).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn refresh_during_store_outage_is_internal_error() {
        let (sessions, store, _) = setup(Role::User).await;
        let pair = sessions.login("a@x.com", "s3cret").await.unwrap();

        store.set_unavailable(true);
        let err = sessions.refresh(&pair.refresh_token).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }
}

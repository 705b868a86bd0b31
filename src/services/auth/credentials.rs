use log::{debug, error, warn};

use crate::auth_stores::SharedUserStore;
use crate::error::{AppError, AppResult};
use crate::models::role::{Role, UserId};
use crate::security::password::{verify_password, DUMMY_PASSWORD_HASH};

/// Identity confirmed by a successful password check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedUser {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
}

/// Checks an email/password pair against the stored Argon2 hash.
#[derive(Clone)]
pub struct CredentialVerifier {
    store: SharedUserStore,
}

impl CredentialVerifier {
    pub fn new(store: SharedUserStore) -> Self {
        Self { store }
    }

    /// Returns the matching identity with its current role.
    ///
    /// Unknown email, unreachable store and wrong password all come back as
    /// the same `InvalidCredentials` so callers can't probe for accounts.
    pub async fn verify(&self, email: &str, password: &str) -> AppResult<VerifiedUser> {
        let record = match self.store.lookup_credential(email).await {
            Ok(record) => record,
            Err(e) => {
                error!("Credential lookup failed: {}", e);
                None
            }
        };

        let (candidate, stored_hash) = match record {
            Some(record) => {
                let hash = record.password_hash.clone();
                (Some(record), hash)
            }
            None => (None, DUMMY_PASSWORD_HASH.to_string()),
        };

        // Argon2 is deliberately slow; keep it off the async workers
        let password = password.to_string();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
            .await
            .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))?;

        match candidate {
            Some(record) if matches => {
                debug!("Credentials verified for user {}", record.user_id);
                Ok(VerifiedUser {
                    user_id: record.user_id,
                    email: record.email,
                    role: record.role,
                })
            }
            _ => {
                warn!("Rejected login attempt");
                Err(AppError::InvalidCredentials("Invalid email or password".to_string()))
            }
        }
    }
}

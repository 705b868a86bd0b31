use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use thiserror::Error;

use crate::models::role::{Role, UserId};

/// Failure reported by a user store. The auth core never retries these.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user store unavailable: {0}")]
    Unavailable(String),
    #[error("user row is corrupt: {0}")]
    Corrupt(String),
    #[error("duplicate user: {0}")]
    Duplicate(String),
}

/// Everything the credential verifier needs about one account.
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
}

/// Public view of a user row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

/// Read access to user rows for the auth core, plus account creation for
/// registration. All lookups are a single read with no caching.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn lookup_credential(&self, email: &str) -> Result<Option<CredentialRecord>, StoreError>;

    async fn lookup_role(&self, user_id: UserId) -> Result<Option<Role>, StoreError>;

    async fn lookup_profile(&self, user_id: UserId) -> Result<Option<UserProfile>, StoreError>;

    async fn create_user(&self, user: NewUser) -> Result<UserProfile, StoreError>;
}

pub type SharedUserStore = Arc<dyn UserStore>;

#[derive(Debug, Clone)]
struct StoredUser {
    profile: UserProfile,
    password_hash: String,
}

/// `DashMap`-backed store used by tests and local wiring.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: DashMap<i64, StoredUser>,
    // email -> id; claiming an entry here is what makes an email taken
    emails: DashMap<String, i64>,
    next_id: AtomicI64,
    unavailable: AtomicBool,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Changes the role of an existing user, as an administrator would.
    pub fn set_role(&self, user_id: UserId, role: Role) -> bool {
        match self.users.get_mut(&user_id.0) {
            Some(mut entry) => {
                entry.profile.role = role;
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, user_id: UserId) -> bool {
        match self.users.remove(&user_id.0) {
            Some((_, user)) => {
                self.emails.remove(&user.profile.email);
                true
            }
            None => false,
        }
    }

    /// Makes every subsequent call fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store marked unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn lookup_credential(&self, email: &str) -> Result<Option<CredentialRecord>, StoreError> {
        self.check_available()?;
        let Some(id) = self.emails.get(email).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        Ok(self
            .users
            .get(&id)
            .map(|entry| CredentialRecord {
                user_id: entry.profile.id,
                email: entry.profile.email.clone(),
                role: entry.profile.role,
                password_hash: entry.password_hash.clone(),
            }))
    }

    async fn lookup_role(&self, user_id: UserId) -> Result<Option<Role>, StoreError> {
        self.check_available()?;
        Ok(self.users.get(&user_id.0).map(|entry| entry.profile.role))
    }

    async fn lookup_profile(&self, user_id: UserId) -> Result<Option<UserProfile>, StoreError> {
        self.check_available()?;
        Ok(self.users.get(&user_id.0).map(|entry| entry.profile.clone()))
    }

    async fn create_user(&self, user: NewUser) -> Result<UserProfile, StoreError> {
        self.check_available()?;
        let slot = match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => {
                return Err(StoreError::Duplicate(format!("email {} is already registered", user.email)));
            }
            Entry::Vacant(slot) => slot,
        };

        let id = UserId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let profile = UserProfile {
            id,
            email: user.email,
            username: user.username,
            role: user.role,
        };
        self.users.insert(
            id.0,
            StoredUser {
                profile: profile.clone(),
                password_hash: user.password_hash,
            },
        );
        slot.insert(id.0);
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str, role: Role) -> NewUser {
        NewUser {
            email: email.to_string(),
            username: email.split('@').next().unwrap_or_default().to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            role,
        }
    }

    #[tokio::test]
    async fn created_users_are_visible_to_every_lookup() {
        let store = InMemoryUserStore::new();
        let profile = store.create_user(new_user("a@x.com", Role::Admin)).await.unwrap();

        let credential = store.lookup_credential("a@x.com").await.unwrap().unwrap();
        assert_eq!(credential.user_id, profile.id);
        assert_eq!(credential.role, Role::Admin);
        assert_eq!(store.lookup_role(profile.id).await.unwrap(), Some(Role::Admin));
        assert_eq!(store.lookup_profile(profile.id).await.unwrap(), Some(profile));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = InMemoryUserStore::new();
        store.create_user(new_user("a@x.com", Role::User)).await.unwrap();

        let err = store.create_user(new_user("a@x.com", Role::User)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registrations_claim_an_email_once() {
        let store = Arc::new(InMemoryUserStore::new());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.create_user(new_user("race@x.com", Role::User)).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(err) => assert!(matches!(err, StoreError::Duplicate(_))),
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.users.len(), 1);
    }

    #[tokio::test]
    async fn removed_user_frees_the_email() {
        let store = InMemoryUserStore::new();
        let profile = store.create_user(new_user("a@x.com", Role::User)).await.unwrap();

        assert!(store.remove(profile.id));
        assert!(store.lookup_credential("a@x.com").await.unwrap().is_none());
        assert!(store.create_user(new_user("a@x.com", Role::User)).await.is_ok());
    }

    #[tokio::test]
    async fn role_changes_are_seen_immediately() {
        let store = InMemoryUserStore::new();
        let profile = store.create_user(new_user("a@x.com", Role::Admin)).await.unwrap();

        assert!(store.set_role(profile.id, Role::User));
        assert_eq!(store.lookup_role(profile.id).await.unwrap(), Some(Role::User));
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = InMemoryUserStore::new();
        store.set_unavailable(true);

        assert!(matches!(
            store.lookup_role(UserId(1)).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.lookup_credential("a@x.com").await.is_err());
    }
}

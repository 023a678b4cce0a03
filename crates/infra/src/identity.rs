//! In-memory identity store.
//!
//! Implements both collaborator contracts the authentication gateway needs:
//! credential verification and identity creation. Uniqueness of username and
//! email is enforced inside `create` under the write lock, so two racing
//! registrations cannot both succeed.

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use storefront_auth::{
    CredentialError, CredentialVerifier, Identity, IdentityStore, IdentityStoreError, NewIdentity,
    Role,
};
use storefront_core::{DomainError, DomainResult, UserId};

use crate::password::{check_password, hash_password};

/// Stored user. The password hash never leaves this module.
#[derive(Debug, Clone)]
struct UserRecord {
    id: UserId,
    username: String,
    email: String,
    password_hash: String,
    first_name: Option<String>,
    last_name: Option<String>,
    roles: BTreeSet<Role>,
    enabled: bool,
    created_at: DateTime<Utc>,
}

impl UserRecord {
    fn identity(&self) -> Identity {
        Identity {
            user_id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            roles: self.roles.clone(),
        }
    }

    fn view(&self) -> UserView {
        UserView {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            roles: self.roles.iter().map(|r| r.as_str().to_string()).collect(),
            enabled: self.enabled,
            created_at: self.created_at,
        }
    }
}

/// Read model of a user, safe to return over the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub roles: Vec<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// Profile fields a user may change about themselves. `None` keeps the
/// current value. Username and roles are not editable here.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    inner: RwLock<HashMap<UserId, UserRecord>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `new` under an already computed hash. Uniqueness is checked
    /// under the write lock.
    fn insert_hashed(
        &self,
        new: NewIdentity,
        password_hash: String,
    ) -> Result<Identity, IdentityStoreError> {
        let mut users = self
            .inner
            .write()
            .map_err(|_| IdentityStoreError::Unavailable("lock poisoned".into()))?;

        if users.values().any(|u| u.username == new.username) {
            return Err(IdentityStoreError::UsernameTaken);
        }
        if users.values().any(|u| u.email == new.email) {
            return Err(IdentityStoreError::EmailTaken);
        }

        let record = UserRecord {
            id: UserId::new(),
            username: new.username,
            email: new.email,
            password_hash,
            first_name: new.first_name,
            last_name: new.last_name,
            roles: new.roles,
            enabled: true,
            created_at: Utc::now(),
        };
        let identity = record.identity();
        users.insert(record.id, record);
        Ok(identity)
    }

    /// Seed an identity with explicit roles (bootstrap administrator, tests).
    ///
    /// Hashes on the calling thread; meant for startup, not request paths.
    pub fn seed(
        &self,
        username: &str,
        email: &str,
        password: &str,
        roles: impl IntoIterator<Item = Role>,
    ) -> Result<Identity, IdentityStoreError> {
        let password_hash =
            hash_password(password).map_err(|e| IdentityStoreError::Unavailable(e.to_string()))?;
        self.insert_hashed(
            NewIdentity {
                username: username.to_string(),
                email: email.to_string(),
                password: password.to_string(),
                first_name: None,
                last_name: None,
                roles: roles.into_iter().collect(),
            },
            password_hash,
        )
    }

    pub fn get(&self, id: UserId) -> Option<UserView> {
        let users = self.inner.read().ok()?;
        users.get(&id).map(UserRecord::view)
    }

    pub fn username_of(&self, id: UserId) -> Option<String> {
        let users = self.inner.read().ok()?;
        users.get(&id).map(|u| u.username.clone())
    }

    pub fn find_by_username(&self, username: &str) -> Option<UserView> {
        let users = self.inner.read().ok()?;
        users
            .values()
            .find(|u| u.username == username)
            .map(UserRecord::view)
    }

    pub fn list(&self) -> Vec<UserView> {
        let Ok(users) = self.inner.read() else {
            return vec![];
        };
        let mut out: Vec<UserView> = users.values().map(UserRecord::view).collect();
        out.sort_by_key(|u| u.id);
        out
    }

    pub fn delete(&self, id: UserId) -> DomainResult<()> {
        let mut users = self.inner.write().map_err(|_| DomainError::Unavailable)?;
        users.remove(&id).map(|_| ()).ok_or(DomainError::NotFound)
    }

    pub fn add_role(&self, username: &str, role: Role) -> DomainResult<UserView> {
        self.update_by_username(username, |u| {
            u.roles.insert(role);
        })
    }

    pub fn remove_role(&self, username: &str, role: &Role) -> DomainResult<UserView> {
        self.update_by_username(username, |u| {
            u.roles.remove(role);
        })
    }

    pub fn update_profile(&self, id: UserId, update: ProfileUpdate) -> DomainResult<UserView> {
        let email = match update.email {
            Some(email) => {
                let email = email.trim().to_string();
                if !email.contains('@') {
                    return Err(DomainError::validation("email is not well-formed"));
                }
                Some(email)
            }
            None => None,
        };

        let mut users = self.inner.write().map_err(|_| DomainError::Unavailable)?;
        if let Some(email) = &email {
            if users.values().any(|u| u.id != id && &u.email == email) {
                return Err(DomainError::conflict("email already exists"));
            }
        }

        let record = users.get_mut(&id).ok_or(DomainError::NotFound)?;
        if let Some(email) = email {
            record.email = email;
        }
        if update.first_name.is_some() {
            record.first_name = update.first_name;
        }
        if update.last_name.is_some() {
            record.last_name = update.last_name;
        }
        Ok(record.view())
    }

    pub fn set_enabled(&self, username: &str, enabled: bool) -> DomainResult<UserView> {
        self.update_by_username(username, |u| u.enabled = enabled)
    }

    fn update_by_username(
        &self,
        username: &str,
        f: impl FnOnce(&mut UserRecord),
    ) -> DomainResult<UserView> {
        let mut users = self.inner.write().map_err(|_| DomainError::Unavailable)?;
        let record = users
            .values_mut()
            .find(|u| u.username == username)
            .ok_or(DomainError::NotFound)?;
        f(record);
        Ok(record.view())
    }
}

#[async_trait]
impl CredentialVerifier for InMemoryIdentityStore {
    async fn verify_credential(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Identity, CredentialError> {
        let record = {
            let users = self
                .inner
                .read()
                .map_err(|_| CredentialError::Unavailable("lock poisoned".into()))?;
            users.values().find(|u| u.username == username).cloned()
        };

        // Every outcome runs one argon2 verification, off the async workers.
        let stored = record.as_ref().map(|u| u.password_hash.clone());
        let password = password.to_string();
        let matches =
            tokio::task::spawn_blocking(move || check_password(&password, stored.as_deref()))
                .await
                .map_err(|e| CredentialError::Unavailable(format!("password check failed: {e}")))?;

        match record {
            Some(user) if user.enabled && matches => Ok(user.identity()),
            _ => Err(CredentialError::Invalid),
        }
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn exists_by_username(&self, username: &str) -> Result<bool, IdentityStoreError> {
        let users = self
            .inner
            .read()
            .map_err(|_| IdentityStoreError::Unavailable("lock poisoned".into()))?;
        Ok(users.values().any(|u| u.username == username))
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, IdentityStoreError> {
        let users = self
            .inner
            .read()
            .map_err(|_| IdentityStoreError::Unavailable("lock poisoned".into()))?;
        Ok(users.values().any(|u| u.email == email))
    }

    async fn create(&self, identity: NewIdentity) -> Result<Identity, IdentityStoreError> {
        let password = identity.password.clone();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| IdentityStoreError::Unavailable(format!("hashing task failed: {e}")))?
            .map_err(|e| IdentityStoreError::Unavailable(e.to_string()))?;
        self.insert_hashed(identity, password_hash)
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn new_identity(username: &str, email: &str) -> NewIdentity {
        NewIdentity {
            username: username.into(),
            email: email.into(),
            password: "pw".into(),
            first_name: Some("Al".into()),
            last_name: None,
            roles: BTreeSet::from([Role::USER]),
        }
    }

    #[tokio::test]
    async fn create_then_verify_credentials() {
        let store = InMemoryIdentityStore::new();
        let created = store.create(new_identity("alice", "alice@example.com")).await.unwrap();

        let verified = store.verify_credential("alice", "pw").await.unwrap();
        assert_eq!(verified, created);
        assert_eq!(
            store.verify_credential("alice", "wrong").await,
            Err(CredentialError::Invalid)
        );
        assert_eq!(
            store.verify_credential("nobody", "pw").await,
            Err(CredentialError::Invalid)
        );
    }

    #[tokio::test]
    async fn create_enforces_uniqueness() {
        let store = InMemoryIdentityStore::new();
        store.create(new_identity("alice", "alice@example.com")).await.unwrap();

        assert_eq!(
            store.create(new_identity("alice", "x@example.com")).await,
            Err(IdentityStoreError::UsernameTaken)
        );
        assert_eq!(
            store.create(new_identity("alicia", "alice@example.com")).await,
            Err(IdentityStoreError::EmailTaken)
        );
    }

    #[tokio::test]
    async fn disabled_user_cannot_log_in() {
        let store = InMemoryIdentityStore::new();
        store.create(new_identity("alice", "alice@example.com")).await.unwrap();
        store.set_enabled("alice", false).unwrap();

        assert_eq!(
            store.verify_credential("alice", "pw").await,
            Err(CredentialError::Invalid)
        );
    }

    #[test]
    fn role_management_is_reflected_in_views() {
        let store = InMemoryIdentityStore::new();
        let id = store
            .seed("root", "root@example.com", "pw", [Role::USER])
            .unwrap()
            .user_id;

        let view = store.add_role("root", Role::ADMIN).unwrap();
        assert_eq!(view.roles, vec!["ADMIN".to_string(), "USER".to_string()]);

        store.remove_role("root", &Role::USER).unwrap();
        assert_eq!(store.get(id).unwrap().roles, vec!["ADMIN".to_string()]);
        assert_eq!(store.add_role("ghost", Role::ADMIN), Err(DomainError::NotFound));
    }

    async fn time_rejections(store: &InMemoryIdentityStore, username: &str) -> Duration {
        let started = Instant::now();
        for _ in 0..3 {
            assert_eq!(
                store.verify_credential(username, "wrong").await,
                Err(CredentialError::Invalid)
            );
        }
        started.elapsed()
    }

    #[tokio::test]
    async fn unknown_users_cost_as_much_as_wrong_passwords() {
        let store = InMemoryIdentityStore::new();
        store.seed("alice", "alice@example.com", "pw", []).unwrap();
        store.seed("eve", "eve@example.com", "pw", []).unwrap();
        store.set_enabled("eve", false).unwrap();

        // Warm the decoy so its one-off hashing is not measured.
        let _ = store.verify_credential("nobody", "x").await;

        let known = time_rejections(&store, "alice").await;
        let unknown = time_rejections(&store, "nobody").await;
        let disabled = time_rejections(&store, "eve").await;

        assert!(known < unknown * 10, "known={known:?} unknown={unknown:?}");
        assert!(known < disabled * 10, "known={known:?} disabled={disabled:?}");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn password_checks_leave_the_runtime_responsive() {
        let store = InMemoryIdentityStore::new();
        store.seed("alice", "alice@example.com", "pw", []).unwrap();

        let started = Instant::now();
        let ticker = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1)).await;
            started.elapsed()
        });
        time_rejections(&store, "alice").await;
        let total = started.elapsed();
        let fired_after = ticker.await.unwrap();

        // On a single-threaded runtime the timer only fires mid-way if the
        // hashing runs on another thread.
        assert!(fired_after * 2 < total, "fired_after={fired_after:?} total={total:?}");
    }

    #[test]
    fn profile_update_keeps_emails_unique() {
        let store = InMemoryIdentityStore::new();
        let alice = store.seed("alice", "alice@example.com", "pw", []).unwrap().user_id;
        store.seed("bob", "bob@example.com", "pw", []).unwrap();

        let taken = ProfileUpdate {
            email: Some("bob@example.com".into()),
            ..ProfileUpdate::default()
        };
        assert!(matches!(
            store.update_profile(alice, taken),
            Err(DomainError::Conflict(_))
        ));

        let view = store
            .update_profile(
                alice,
                ProfileUpdate {
                    email: Some(" alice@new.example ".into()),
                    first_name: Some("Alice".into()),
                    last_name: None,
                },
            )
            .unwrap();
        assert_eq!(view.email, "alice@new.example");
        assert_eq!(view.first_name.as_deref(), Some("Alice"));
        assert_eq!(store.update_profile(UserId::new(), ProfileUpdate::default()), Err(DomainError::NotFound));
    }

    #[test]
    fn delete_removes_user() {
        let store = InMemoryIdentityStore::new();
        let id = store.seed("bob", "bob@example.com", "pw", []).unwrap().user_id;
        assert_eq!(store.username_of(id).as_deref(), Some("bob"));

        store.delete(id).unwrap();
        assert!(store.get(id).is_none());
        assert_eq!(store.delete(id), Err(DomainError::NotFound));
    }
}

//! Session store
//!
//! Holds the signed-in identity of one browser tab. The identity is written
//! through to tab-scoped storage on every change and read back once when the
//! store is restored. There is no credential check: sign-in always succeeds.

use chrono::{NaiveDate, Utc};
use std::sync::Arc;

use crate::error::AppResult;
use crate::models::{MembershipStatus, PlanTier, User, UserRole};
use crate::service::Latency;
use crate::storage::KeyValueStore;

pub const AUTH_STORAGE_KEY: &str = "Global Healer-online-auth";

const LOGIN_DELAY_MS: u64 = 1000;
const REGISTER_DELAY_MS: u64 = 1200;

#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    scope: String,
    latency: Latency,
    user: Option<User>,
}

impl SessionStore {
    /// Restore the tab's identity from storage. An unreadable record leaves the
    /// tab signed out.
    pub fn restore(storage: Arc<dyn KeyValueStore>, scope: &str, latency: Latency) -> Self {
        let user = match storage.get(scope, AUTH_STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    log::warn!("[Session] ignoring unreadable session record: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                log::warn!("[Session] could not read session record: {}", e);
                None
            }
        };

        Self {
            storage,
            scope: scope.to_string(),
            latency,
            user,
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn current_user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Sign in as the canned user for `role`. The password is never inspected.
    pub async fn login(&mut self, email: &str, _password: &str, role: UserRole) -> AppResult<User> {
        self.latency.pause(LOGIN_DELAY_MS).await;

        let user = match role {
            UserRole::Admin => User {
                id: "admin-001".to_string(),
                name: "Dr. Admin".to_string(),
                email: email.to_string(),
                role,
                membership_plan: None,
                membership_status: None,
                created_at: mock_created_at(),
            },
            UserRole::Patient => User {
                id: "patient-001".to_string(),
                name: "John Doe".to_string(),
                email: email.to_string(),
                role,
                membership_plan: Some(PlanTier::Individual),
                membership_status: Some(MembershipStatus::Active),
                created_at: mock_created_at(),
            },
        };

        self.set_user(Some(user.clone()))?;
        log::info!("User logged in: {} ({})", user.email, role);
        Ok(user)
    }

    /// Create a fresh, plan-less account and sign it in
    pub async fn register(
        &mut self,
        name: &str,
        email: &str,
        _password: &str,
        role: UserRole,
    ) -> AppResult<User> {
        self.latency.pause(REGISTER_DELAY_MS).await;

        let now = Utc::now();
        let user = User {
            id: format!("{}-{}", role.as_str(), now.timestamp_millis()),
            name: name.to_string(),
            email: email.to_string(),
            role,
            membership_plan: None,
            membership_status: Some(MembershipStatus::Inactive),
            created_at: now.date_naive(),
        };

        self.set_user(Some(user.clone()))?;
        log::info!("User registered: {} ({})", user.email, role);
        Ok(user)
    }

    pub fn logout(&mut self) -> AppResult<()> {
        self.set_user(None)?;
        log::info!("User logged out");
        Ok(())
    }

    fn set_user(&mut self, user: Option<User>) -> AppResult<()> {
        match &user {
            Some(u) => {
                let json = serde_json::to_string(u)?;
                self.storage.set(&self.scope, AUTH_STORAGE_KEY, &json)?;
            }
            None => self.storage.remove(&self.scope, AUTH_STORAGE_KEY)?,
        }
        self.user = user;
        Ok(())
    }
}

fn mock_created_at() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 15).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, SqliteStore};

    fn memory() -> Arc<dyn KeyValueStore> {
        Arc::new(MemoryStore::new())
    }

    #[tokio::test]
    async fn test_login_patient() {
        let mut session = SessionStore::restore(memory(), "tab", Latency::none());
        let user = session.login("jane@example.com", "secret", UserRole::Patient).await.unwrap();
        assert_eq!(user.id, "patient-001");
        assert_eq!(user.email, "jane@example.com");
        assert_eq!(user.membership_plan, Some(PlanTier::Individual));
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_login_admin_has_no_plan() {
        let mut session = SessionStore::restore(memory(), "tab", Latency::none());
        let user = session.login("admin@example.com", "x", UserRole::Admin).await.unwrap();
        assert_eq!(user.id, "admin-001");
        assert_eq!(user.name, "Dr. Admin");
        assert_eq!(user.membership_plan, None);
        assert_eq!(user.membership_status, None);
    }

    #[tokio::test]
    async fn test_login_does_not_check_credentials() {
        let mut session = SessionStore::restore(memory(), "tab", Latency::none());
        assert!(session.login("", "", UserRole::Patient).await.is_ok());
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_register_creates_inactive_user() {
        let mut session = SessionStore::restore(memory(), "tab", Latency::none());
        let user = session
            .register("Ada", "ada@example.com", "secret", UserRole::Patient)
            .await
            .unwrap();
        assert!(user.id.starts_with("patient-"));
        assert_eq!(user.membership_plan, None);
        assert_eq!(user.membership_status, Some(MembershipStatus::Inactive));
        assert_eq!(user.created_at, Utc::now().date_naive());
    }

    #[tokio::test]
    async fn test_restore_after_login() {
        let storage = memory();
        let mut session = SessionStore::restore(storage.clone(), "tab", Latency::none());
        let user = session.login("a@b.c", "pw", UserRole::Patient).await.unwrap();

        let restored = SessionStore::restore(storage.clone(), "tab", Latency::none());
        assert_eq!(restored.current_user(), Some(&user));

        let other_tab = SessionStore::restore(storage, "other", Latency::none());
        assert!(!other_tab.is_authenticated());
    }

    #[tokio::test]
    async fn test_logout_clears_persisted_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        {
            let storage: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open(&path).unwrap());
            let mut session = SessionStore::restore(storage.clone(), "tab", Latency::none());
            session.login("a@b.c", "pw", UserRole::Admin).await.unwrap();
            session.logout().unwrap();
            assert!(!session.is_authenticated());
            assert_eq!(storage.get("tab", AUTH_STORAGE_KEY).unwrap(), None);
        }
        let storage: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open(&path).unwrap());
        let session = SessionStore::restore(storage, "tab", Latency::none());
        assert!(session.current_user().is_none());
    }

    #[test]
    fn test_unreadable_record_is_ignored() {
        let storage = memory();
        storage.set("tab", AUTH_STORAGE_KEY, "{not json").unwrap();
        let session = SessionStore::restore(storage, "tab", Latency::none());
        assert!(!session.is_authenticated());
    }
}

use super::UserRepository;
use crate::domain::User;
use crate::errors::{ApiError, ApiResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// Process-local user table, seeded at startup
pub struct InMemoryUserRepo {
    users: RwLock<Vec<User>>,
}

impl InMemoryUserRepo {
    /// Table holding a single pre-hashed account.
    pub fn with_user(username: &str, password_hash: String) -> Self {
        let user = User {
            id: 1,
            username: username.to_string(),
            password_hash,
            created_at: Utc::now(),
            last_login: None,
        };
        Self {
            users: RwLock::new(vec![user]),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepo {
    async fn get_by_username(&self, username: &str) -> ApiResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn record_login(&self, id: i64, at: DateTime<Utc>) -> ApiResult<()> {
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| ApiError::not_found(format!("User {}", id)))?;
        user.last_login = Some(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_username_lookup_ignores_case() {
        let repo = InMemoryUserRepo::with_user("Admin", "h".into());

        let found = repo.get_by_username("admin").await.unwrap().unwrap();
        assert_eq!(found.username, "Admin");
        assert_eq!(found.id, 1);
        assert!(found.last_login.is_none());
        assert!(repo.get_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_login() {
        let repo = InMemoryUserRepo::with_user("admin", "h".into());
        let at = Utc::now();
        repo.record_login(1, at).await.unwrap();
        let user = repo.get_by_username("admin").await.unwrap().unwrap();
        assert_eq!(user.last_login, Some(at));
    }

    #[tokio::test]
    async fn test_record_login_for_unknown_id() {
        let repo = InMemoryUserRepo::with_user("admin", "h".into());
        assert!(matches!(
            repo.record_login(7, Utc::now()).await,
            Err(ApiError::NotFound(_))
        ));
    }
}

//! # User Repository
//!
//! Accounts that sign in to the API. Password hashing happens in the
//! server; this layer only stores the PHC string.

use chrono::Utc;
use keystone_core::validation::{validate_email, validate_username};
use keystone_core::{NewUser, Role, User, UserStats};
use sqlx::SqlitePool;
use tracing::info;

use super::fetch_live_from_pool;
use crate::error::{DbResult, DuplicateContext};

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Inserts a user with an already-hashed password.
    ///
    /// The role defaults to `employee` when the payload doesn't name one.
    pub async fn create(&self, new: NewUser, password_hash: &str) -> DbResult<User> {
        let role = new.role.unwrap_or(Role::Employee);
        self.insert(new, password_hash, Some(role)).await
    }

    /// Inserts a self-registered user.
    ///
    /// The role is decided inside the INSERT: `admin` when no live user
    /// exists yet, `employee` otherwise. SQLite serialises writers, so two
    /// concurrent registrations on an empty database yield one admin.
    pub async fn register(&self, new: NewUser, password_hash: &str) -> DbResult<User> {
        self.insert(new, password_hash, None).await
    }

    async fn insert(&self, new: NewUser, password_hash: &str, role: Option<Role>) -> DbResult<User> {
        let username = new.username.trim();
        validate_username(username)?;
        let email = new.email.trim().to_lowercase();
        validate_email(&email)?;

        let now = Utc::now();
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                username, email, password_hash, first_name, last_name, role,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                COALESCE(?6, CASE
                    WHEN EXISTS (SELECT 1 FROM users WHERE is_deleted = 0) THEN 'employee'
                    ELSE 'admin'
                END),
                ?7, ?7
            )
            RETURNING *
            "#,
        )
        .bind(username)
        .bind(&email)
        .bind(password_hash)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(role)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .duplicate_value(username)?;

        info!(username = %user.username, role = user.role.as_str(), "User created");
        Ok(user)
    }

    pub async fn get(&self, id: i64) -> DbResult<User> {
        fetch_live_from_pool(&self.pool, "users", "User", id).await
    }

    /// Looks up an active, live user for login.
    pub async fn find_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE username = ?1 AND is_deleted = 0 AND is_active = 1
            "#,
        )
        .bind(username.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Total, active, admin and inactive counts over live users.
    pub async fn stats(&self) -> DbResult<UserStats> {
        let stats = sqlx::query_as::<_, UserStats>(
            r#"
            SELECT
                COUNT(*) AS total_users,
                COALESCE(SUM(is_active = 1), 0) AS active_users,
                COALESCE(SUM(role = 'admin'), 0) AS admin_users,
                COALESCE(SUM(is_active = 0), 0) AS inactive_users
            FROM users
            WHERE is_deleted = 0
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    /// The `limit` most recently created live users, newest first.
    pub async fn recent(&self, limit: i64) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE is_deleted = 0
            ORDER BY created_at DESC, id DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    pub async fn touch_last_login(&self, id: i64) -> DbResult<()> {
        sqlx::query("UPDATE users SET last_login = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::{Database, DbConfig};

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password: "unused".to_string(),
            first_name: Some("Grace".to_string()),
            last_name: None,
            role: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let users = db.users();
        assert_eq!(users.stats().await.unwrap().total_users, 0);

        let user = users
            .create(new_user("grace", "Grace@Example.com"), "$argon2id$stub")
            .await
            .unwrap();
        assert_eq!(user.role, Role::Employee);
        assert_eq!(user.email, "grace@example.com");
        assert_eq!(user.full_name(), "Grace");

        let found = users.find_by_username("grace").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.password_hash, "$argon2id$stub");
        assert!(found.last_login.is_none());

        users.touch_last_login(user.id).await.unwrap();
        assert!(users.get(user.id).await.unwrap().last_login.is_some());
        assert!(users.find_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_register_makes_only_the_first_user_admin() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let users = db.users();
        let first = users
            .register(new_user("grace", "grace@example.com"), "h")
            .await
            .unwrap();
        let second = users
            .register(new_user("ada", "ada@example.com"), "h")
            .await
            .unwrap();
        assert_eq!(first.role, Role::Admin);
        assert_eq!(second.role, Role::Employee);
    }

    #[tokio::test]
    async fn test_concurrent_registrations_yield_one_admin() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let users = db.users();
        let mut handles = Vec::new();
        for n in 0..8 {
            let users = users.clone();
            handles.push(tokio::spawn(async move {
                users
                    .register(new_user(&format!("user{n}"), &format!("user{n}@example.com")), "h")
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stats = users.stats().await.unwrap();
        assert_eq!(stats.total_users, 8);
        assert_eq!(stats.admin_users, 1);
    }

    #[tokio::test]
    async fn test_stats_and_recent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let users = db.users();
        let empty = users.stats().await.unwrap();
        assert_eq!(empty.total_users, 0);
        assert_eq!(empty.active_users, 0);

        for n in 0..7 {
            users
                .register(new_user(&format!("user{n}"), &format!("user{n}@example.com")), "h")
                .await
                .unwrap();
        }
        sqlx::query("UPDATE users SET is_active = 0 WHERE username = 'user3'")
            .execute(db.pool())
            .await
            .unwrap();

        let stats = users.stats().await.unwrap();
        assert_eq!(stats.total_users, 7);
        assert_eq!(stats.active_users, 6);
        assert_eq!(stats.inactive_users, 1);
        assert_eq!(stats.admin_users, 1);

        let recent = users.recent(5).await.unwrap();
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].username, "user6");
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let users = db.users();
        users.create(new_user("grace", "a@example.com"), "h").await.unwrap();
        let err = users
            .create(new_user("grace", "b@example.com"), "h")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}

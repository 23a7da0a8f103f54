use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::user::{User, UserStatus};
use crate::domain::repository::UserRepository;
use crate::error::AuthError;

/// UserPostgresRepository は PostgreSQL ベースのユーザーリポジトリ。
/// users テーブルに対する CRUD を提供する。username には一意制約がある。
pub struct UserPostgresRepository {
    pool: PgPool,
}

impl UserPostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// UserRow は users テーブルの行を表す中間構造体。
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub status: String,
    pub subscription_tier: String,
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = AuthError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id.to_string(),
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            status: UserStatus::parse(&row.status)?,
            subscription_tier: row.subscription_tier,
            roles: row.roles,
            created_at: row.created_at,
            updated_at: row.updated_at,
            last_login_at: row.last_login_at,
        })
    }
}

fn parse_uuid(id: &str) -> Result<Uuid, AuthError> {
    Uuid::parse_str(id).map_err(|e| AuthError::InvalidInput(format!("invalid user id: {}", e)))
}

fn map_sqlx_error(err: sqlx::Error, username: &str) -> AuthError {
    if let sqlx::Error::Database(ref db_err) = err {
        // 23505 = unique_violation。exists チェックとの競合はここで捕捉される。
        if db_err.code().as_deref() == Some("23505") {
            return AuthError::UserAlreadyExists(username.to_string());
        }
    }
    AuthError::internal(err)
}

const USER_COLUMNS: &str = "id, username, email, password_hash, status, subscription_tier, roles, created_at, updated_at, last_login_at";

#[async_trait]
impl UserRepository for UserPostgresRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AuthError> {
        let uuid = parse_uuid(id)?;
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await
        .map_err(AuthError::internal)?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(AuthError::internal)?;

        row.map(User::try_from).transpose()
    }

    /// DELETED 行も対象に含める。論理削除されたユーザー名は再利用できない。
    async fn exists_by_username(&self, username: &str) -> Result<bool, AuthError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await
                .map_err(AuthError::internal)?;
        Ok(exists)
    }

    async fn insert(&self, user: &User) -> Result<(), AuthError> {
        let uuid = parse_uuid(&user.id)?;
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, status, subscription_tier, roles, created_at, updated_at, last_login_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(uuid)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.status.as_str())
        .bind(&user.subscription_tier)
        .bind(&user.roles)
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.last_login_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, &user.username))?;
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<(), AuthError> {
        let uuid = parse_uuid(&user.id)?;
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = $2, password_hash = $3, status = $4, subscription_tier = $5,
                roles = $6, updated_at = $7, last_login_at = $8
            WHERE id = $1
            "#,
        )
        .bind(uuid)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.status.as_str())
        .bind(&user.subscription_tier)
        .bind(&user.roles)
        .bind(user.updated_at)
        .bind(user.last_login_at)
        .execute(&self.pool)
        .await
        .map_err(AuthError::internal)?;

        if result.rows_affected() == 0 {
            return Err(AuthError::UserNotFound(user.id.clone()));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), AuthError> {
        let uuid = parse_uuid(id)?;
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(uuid)
            .execute(&self.pool)
            .await
            .map_err(AuthError::internal)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_row(status: &str) -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "$argon2id$v=19$m=65536,t=3,p=1$c2FsdA$aGFzaA".to_string(),
            status: status.to_string(),
            subscription_tier: "FREE".to_string(),
            roles: vec!["USER".to_string()],
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        }
    }

    #[test]
    fn test_row_to_user_conversion() {
        let row = make_row("ACTIVE");
        let user = User::try_from(row.clone()).unwrap();
        assert_eq!(user.id, row.id.to_string());
        assert_eq!(user.username, "alice");
        assert_eq!(user.status, UserStatus::Active);
        assert_eq!(user.roles, vec!["USER".to_string()]);
        assert!(user.last_login_at.is_none());
    }

    #[test]
    fn test_row_with_unknown_status_fails() {
        let row = make_row("BANNED");
        assert!(User::try_from(row).is_err());
    }

    #[test]
    fn test_row_deleted_status() {
        let row = make_row("DELETED");
        let user = User::try_from(row).unwrap();
        assert_eq!(user.status, UserStatus::Deleted);
        assert!(!user.is_active());
    }

    #[test]
    fn test_parse_uuid_rejects_garbage() {
        assert!(parse_uuid("not-a-uuid").is_err());
        assert!(parse_uuid(&Uuid::new_v4().to_string()).is_ok());
    }
}

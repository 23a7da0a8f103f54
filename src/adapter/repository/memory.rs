use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::entity::audit_log::AuditLog;
use crate::domain::entity::platform_account::PlatformAccount;
use crate::domain::entity::token::TokenBlacklistEntry;
use crate::domain::entity::user::User;
use crate::domain::repository::{
    AuditLogRepository, PlatformAccountRepository, TokenRepository, UserRepository,
};
use crate::error::AuthError;

/// InMemoryUserRepository は DB 未設定時 (dev / テスト) のフォールバック実装。
/// 単一プロセス内でのみ有効。
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AuthError> {
        let users = self.users.read().await;
        Ok(users.get(id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, AuthError> {
        let users = self.users.read().await;
        Ok(users.values().any(|u| u.username == username))
    }

    async fn insert(&self, user: &User) -> Result<(), AuthError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == user.username) {
            return Err(AuthError::UserAlreadyExists(user.username.clone()));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<(), AuthError> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(AuthError::UserNotFound(user.id.clone()));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), AuthError> {
        let mut users = self.users.write().await;
        users.remove(id);
        Ok(())
    }
}

/// InMemoryPlatformAccountRepository は DB 未設定時のフォールバック実装。
#[derive(Default)]
pub struct InMemoryPlatformAccountRepository {
    accounts: RwLock<HashMap<String, PlatformAccount>>,
}

impl InMemoryPlatformAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlatformAccountRepository for InMemoryPlatformAccountRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<PlatformAccount>, AuthError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(id).cloned())
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Vec<PlatformAccount>, AuthError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert(&self, account: &PlatformAccount) -> Result<(), AuthError> {
        let mut accounts = self.accounts.write().await;
        accounts.insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn update(&self, account: &PlatformAccount) -> Result<(), AuthError> {
        let mut accounts = self.accounts.write().await;
        if !accounts.contains_key(&account.id) {
            return Err(AuthError::PlatformAccountNotFound(account.id.clone()));
        }
        accounts.insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), AuthError> {
        let mut accounts = self.accounts.write().await;
        if accounts.remove(id).is_none() {
            return Err(AuthError::PlatformAccountNotFound(id.to_string()));
        }
        Ok(())
    }
}

/// InMemoryTokenRepository は DB 未設定時のフォールバック実装。
/// 期限切れ判定は照会時に行う。
#[derive(Default)]
pub struct InMemoryTokenRepository {
    entries: RwLock<HashMap<String, TokenBlacklistEntry>>,
}

impl InMemoryTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenRepository for InMemoryTokenRepository {
    async fn is_blacklisted(&self, token_id: &str) -> Result<bool, AuthError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(token_id)
            .map(|e| e.expires_at > Utc::now())
            .unwrap_or(false))
    }

    async fn add_to_blacklist(&self, entry: &TokenBlacklistEntry) -> Result<(), AuthError> {
        let mut entries = self.entries.write().await;
        entries.insert(entry.token_id.clone(), entry.clone());
        Ok(())
    }

    async fn remove_from_blacklist(&self, token_id: &str) -> Result<(), AuthError> {
        let mut entries = self.entries.write().await;
        entries.remove(token_id);
        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<u64, AuthError> {
        let mut entries = self.entries.write().await;
        let now = Utc::now();
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        Ok((before - entries.len()) as u64)
    }
}

/// InMemoryAuditLogRepository は DB 未設定時のフォールバック実装。
#[derive(Default)]
pub struct InMemoryAuditLogRepository {
    logs: RwLock<Vec<AuditLog>>,
}

impl InMemoryAuditLogRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryAuditLogRepository {
    async fn create(&self, log: &AuditLog) -> Result<(), AuthError> {
        self.logs.write().await.push(log.clone());
        Ok(())
    }

    async fn find_by_user_id(&self, user_id: &str, limit: i64) -> Result<Vec<AuditLog>, AuthError> {
        let logs = self.logs.read().await;
        let mut matched: Vec<AuditLog> = logs
            .iter()
            .filter(|l| l.user_id.as_deref() == Some(user_id))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matched.truncate(limit as usize);
        Ok(matched)
    }
}

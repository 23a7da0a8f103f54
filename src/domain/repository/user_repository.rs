use async_trait::async_trait;

use crate::domain::entity::user::User;
use crate::error::AuthError;

/// UserRepository はユーザー永続化のポート。
/// PostgreSQL 実装と、それをラップする Redis キャッシュ実装が同じ
/// インターフェースを満たす。サービス層はデコレータの深さを知らない。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AuthError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError>;
    /// ユーザー名の存在確認。作成ウィンドウ中の偽陰性を避けるため、
    /// キャッシュ実装でも必ず永続ストアに問い合わせる。DELETED 行も対象。
    async fn exists_by_username(&self, username: &str) -> Result<bool, AuthError>;
    async fn insert(&self, user: &User) -> Result<(), AuthError>;
    async fn update(&self, user: &User) -> Result<(), AuthError>;
    async fn delete(&self, id: &str) -> Result<(), AuthError>;
}

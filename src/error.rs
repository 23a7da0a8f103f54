use thiserror::Error;

/// AuthError は認証サービス全体で使うドメインエラー。
/// 各バリアントは §7 のエラー分類と 1:1 に対応し、adapter 層で
/// gRPC ステータスコードへ変換される。
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// ユーザー不存在とパスワード不一致を区別しない（存在漏洩防止）。
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("token blacklisted")]
    TokenBlacklisted,
    #[error("user not active: {0}")]
    UserNotActive(String),
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("user already exists: {0}")]
    UserAlreadyExists(String),
    #[error("platform account not found: {0}")]
    PlatformAccountNotFound(String),
    #[error("rate limit exceeded: {0}")]
    RateLimited(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// 内部エラーへの変換ヘルパー。インフラ層のエラーを包む。
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        AuthError::Internal(err.to_string())
    }
}

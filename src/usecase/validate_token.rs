use std::sync::Arc;

use crate::domain::repository::TokenRepository;
use crate::error::AuthError;
use crate::infrastructure::token_codec::JwtTokenCodec;

#[derive(Debug, Clone)]
pub struct ValidateTokenOutput {
    pub user_id: String,
    pub roles: Vec<String>,
}

/// ValidateTokenUseCase はアクセストークンを検証する。
/// 署名・期限は codec が、失効はブラックリストが判定する。ブラックリスト
/// 済みのトークンはパースに成功してもここで拒否される。
pub struct ValidateTokenUseCase {
    token_repo: Arc<dyn TokenRepository>,
    codec: Arc<JwtTokenCodec>,
}

impl ValidateTokenUseCase {
    pub fn new(token_repo: Arc<dyn TokenRepository>, codec: Arc<JwtTokenCodec>) -> Self {
        Self { token_repo, codec }
    }

    pub async fn execute(&self, token: &str) -> Result<ValidateTokenOutput, AuthError> {
        if token.is_empty() {
            return Err(AuthError::InvalidToken("empty token".to_string()));
        }

        let claims = self.codec.verify(token)?;

        // JTI を持たないトークンはトークン文字列そのものが識別子
        let token_id = claims.jti.as_deref().unwrap_or(token);
        if self.token_repo.is_blacklisted(token_id).await? {
            return Err(AuthError::TokenBlacklisted);
        }

        Ok(ValidateTokenOutput {
            user_id: claims.sub,
            roles: claims.roles,
        })
    }
}

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use crate::domain::entity::event::DomainEvent;
use crate::domain::entity::token::{TokenBlacklistEntry, TokenPair};
use crate::domain::repository::{TokenRepository, UserRepository};
use crate::error::AuthError;
use crate::infrastructure::kafka_producer::EventPublisher;
use crate::infrastructure::token_codec::JwtTokenCodec;
use crate::usecase::publish_event;

#[derive(Debug, Clone)]
pub struct RefreshTokenOutput {
    pub token_pair: TokenPair,
}

/// RefreshTokenUseCase はリフレッシュトークンを新しいトークンペアに交換する。
/// 交換は一度きり: 古いリフレッシュトークンは reason="refreshed" で
/// ブラックリストに登録されてから返るため、再利用は次回の照会で必ず
/// 失効として検出される。
pub struct RefreshTokenUseCase {
    user_repo: Arc<dyn UserRepository>,
    token_repo: Arc<dyn TokenRepository>,
    codec: Arc<JwtTokenCodec>,
    event_pub: Arc<dyn EventPublisher>,
}

const ROTATION_REASON: &str = "refreshed";

impl RefreshTokenUseCase {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        token_repo: Arc<dyn TokenRepository>,
        codec: Arc<JwtTokenCodec>,
        event_pub: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            user_repo,
            token_repo,
            codec,
            event_pub,
        }
    }

    pub async fn execute(&self, refresh_token: &str) -> Result<RefreshTokenOutput, AuthError> {
        if refresh_token.is_empty() {
            return Err(AuthError::InvalidToken("empty token".to_string()));
        }

        let claims = self.codec.verify(refresh_token)?;

        // 発行時に必ず JTI を採番しているため、欠落はデータ不整合
        let jti = claims
            .jti
            .clone()
            .ok_or_else(|| AuthError::Internal("refresh token missing jti".to_string()))?;

        if self.token_repo.is_blacklisted(&jti).await? {
            return Err(AuthError::TokenBlacklisted);
        }

        let user = self
            .user_repo
            .find_by_id(&claims.sub)
            .await?
            .ok_or_else(|| AuthError::UserNotFound(claims.sub.clone()))?;
        if !user.is_active() {
            return Err(AuthError::UserNotActive(user.id.clone()));
        }

        let token_pair = self.codec.issue_pair(&user.id, &user.roles)?;

        // ローテーション: 古いトークンの失効が永続化されてから新ペアを返す
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or_else(|| AuthError::InvalidToken("invalid exp claim".to_string()))?;
        let entry = TokenBlacklistEntry::new(&jti, &user.id, expires_at, ROTATION_REASON)?;
        self.token_repo.add_to_blacklist(&entry).await?;

        publish_event(
            self.event_pub.as_ref(),
            DomainEvent::token_blacklisted(&jti, &user.id, ROTATION_REASON),
        )
        .await;

        Ok(RefreshTokenOutput { token_pair })
    }
}

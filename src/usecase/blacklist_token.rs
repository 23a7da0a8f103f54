use std::sync::Arc;

use crate::domain::entity::event::DomainEvent;
use crate::domain::entity::token::TokenBlacklistEntry;
use crate::domain::repository::TokenRepository;
use crate::error::AuthError;
use crate::infrastructure::kafka_producer::EventPublisher;
use crate::infrastructure::token_codec::JwtTokenCodec;
use crate::usecase::publish_event;

#[derive(Debug, Clone)]
pub struct BlacklistTokenInput {
    pub token: String,
    pub user_id: String,
    pub reason: String,
}

/// BlacklistTokenUseCase はトークンを失効させる。
/// ログアウトやセキュリティ上の理由で呼ばれる。エントリの expires_at は
/// トークン自身の exp で、それを過ぎた行は回収対象になる。
pub struct BlacklistTokenUseCase {
    token_repo: Arc<dyn TokenRepository>,
    codec: Arc<JwtTokenCodec>,
    event_pub: Arc<dyn EventPublisher>,
}

impl BlacklistTokenUseCase {
    pub fn new(
        token_repo: Arc<dyn TokenRepository>,
        codec: Arc<JwtTokenCodec>,
        event_pub: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            token_repo,
            codec,
            event_pub,
        }
    }

    pub async fn execute(&self, input: &BlacklistTokenInput) -> Result<(), AuthError> {
        if input.token.is_empty() {
            return Err(AuthError::InvalidToken("empty token".to_string()));
        }

        let (token_id, expires_at, sub) =
            self.codec.extract_blacklist_identity(&input.token)?;

        // 呼び出し元が user_id を省略した場合はトークンの sub を使う
        let user_id = if input.user_id.is_empty() {
            sub
        } else {
            input.user_id.clone()
        };

        let entry = TokenBlacklistEntry::new(&token_id, &user_id, expires_at, &input.reason)?;
        self.token_repo.add_to_blacklist(&entry).await?;

        publish_event(
            self.event_pub.as_ref(),
            DomainEvent::token_blacklisted(&token_id, &user_id, &input.reason),
        )
        .await;

        Ok(())
    }
}

use std::sync::Arc;

use super::interceptor::RpcRequest;
use super::GrpcError;
use crate::domain::entity::platform_account::{PlatformAccount, PlatformType};
use crate::usecase::connect_platform::{ConnectPlatformInput, ConnectPlatformUseCase};
use crate::usecase::disconnect_platform::DisconnectPlatformUseCase;
use crate::usecase::refresh_platform_token::RefreshPlatformTokenUseCase;

// --- Request/Response 型 ---

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ConnectPlatformRequest {
    pub user_id: String,
    pub platform: String,
    pub auth_code: String,
}

impl RpcRequest for ConnectPlatformRequest {
    fn validate(&self) -> Result<(), String> {
        if self.user_id.is_empty() || self.platform.is_empty() || self.auth_code.is_empty() {
            return Err("user_id, platform, and auth_code are required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RefreshPlatformTokenRequest {
    pub platform_account_id: String,
}

impl RpcRequest for RefreshPlatformTokenRequest {
    fn validate(&self) -> Result<(), String> {
        if self.platform_account_id.is_empty() {
            return Err("platform_account_id is required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct DisconnectPlatformRequest {
    pub platform_account_id: String,
}

impl RpcRequest for DisconnectPlatformRequest {
    fn validate(&self) -> Result<(), String> {
        if self.platform_account_id.is_empty() {
            return Err("platform_account_id is required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DisconnectPlatformResponse {
    pub success: bool,
}

/// PbPlatformAccount はワイヤ上の連携アカウント表現。
#[derive(Debug, Clone, serde::Serialize)]
pub struct PbPlatformAccount {
    pub platform_account_id: String,
    pub user_id: String,
    pub platform: String,
    pub platform_user_id: String,
    pub platform_username: String,
    pub access_token: String,
    pub refresh_token: String,
    pub token_expires_at: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&PlatformAccount> for PbPlatformAccount {
    fn from(account: &PlatformAccount) -> Self {
        Self {
            platform_account_id: account.id.clone(),
            user_id: account.user_id.clone(),
            platform: account.platform.as_str().to_string(),
            platform_user_id: account.platform_user_id.clone(),
            platform_username: account.platform_username.clone(),
            access_token: account.access_token.clone(),
            refresh_token: account.refresh_token.clone(),
            token_expires_at: account.token_expires_at.to_rfc3339(),
            created_at: account.created_at.to_rfc3339(),
            updated_at: account.updated_at.to_rfc3339(),
        }
    }
}

// --- PlatformGrpcService ---

/// PlatformGrpcService はプラットフォーム連携 RPC のアダプタ。
pub struct PlatformGrpcService {
    connect_uc: Arc<ConnectPlatformUseCase>,
    refresh_uc: Arc<RefreshPlatformTokenUseCase>,
    disconnect_uc: Arc<DisconnectPlatformUseCase>,
}

impl PlatformGrpcService {
    pub fn new(
        connect_uc: Arc<ConnectPlatformUseCase>,
        refresh_uc: Arc<RefreshPlatformTokenUseCase>,
        disconnect_uc: Arc<DisconnectPlatformUseCase>,
    ) -> Self {
        Self {
            connect_uc,
            refresh_uc,
            disconnect_uc,
        }
    }

    pub async fn connect_platform(
        &self,
        req: ConnectPlatformRequest,
    ) -> Result<PbPlatformAccount, GrpcError> {
        let platform = PlatformType::parse(&req.platform)
            .map_err(|e| GrpcError::InvalidArgument(e.to_string()))?;
        let input = ConnectPlatformInput {
            user_id: req.user_id,
            platform,
            auth_code: req.auth_code,
        };
        let output = self.connect_uc.execute(&input).await?;
        Ok(PbPlatformAccount::from(&output.account))
    }

    pub async fn refresh_platform_token(
        &self,
        req: RefreshPlatformTokenRequest,
    ) -> Result<PbPlatformAccount, GrpcError> {
        let output = self.refresh_uc.execute(&req.platform_account_id).await?;
        Ok(PbPlatformAccount::from(&output.account))
    }

    pub async fn disconnect_platform(
        &self,
        req: DisconnectPlatformRequest,
    ) -> Result<DisconnectPlatformResponse, GrpcError> {
        self.disconnect_uc.execute(&req.platform_account_id).await?;
        Ok(DisconnectPlatformResponse { success: true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::user::User;
    use crate::domain::repository::platform_repository::MockPlatformAccountRepository;
    use crate::domain::repository::user_repository::MockUserRepository;
    use crate::infrastructure::kafka_producer::MockEventPublisher;
    use crate::infrastructure::oauth::StubOAuthClient;
    use chrono::Utc;

    fn make_user() -> User {
        User::new(
            "user-1",
            "alice",
            "alice@example.com",
            "$argon2id$v=19$m=65536,t=3,p=1$c2FsdA$aGFzaA",
        )
        .unwrap()
    }

    fn make_account() -> PlatformAccount {
        PlatformAccount::new(
            "pa-1",
            "user-1",
            PlatformType::Twitch,
            "twitch-123",
            "TwitchUser",
            "access",
            "refresh",
            Utc::now() + chrono::Duration::hours(1),
        )
        .unwrap()
    }

    fn make_service(
        user_repo: MockUserRepository,
        platform_repo: MockPlatformAccountRepository,
    ) -> PlatformGrpcService {
        let mut event_pub = MockEventPublisher::new();
        event_pub.expect_publish().returning(|_| Ok(()));
        let event_pub = Arc::new(event_pub);
        let user_repo = Arc::new(user_repo);
        let platform_repo = Arc::new(platform_repo);
        let oauth = Arc::new(StubOAuthClient);

        PlatformGrpcService::new(
            Arc::new(ConnectPlatformUseCase::new(
                user_repo.clone(),
                platform_repo.clone(),
                oauth.clone(),
                event_pub.clone(),
            )),
            Arc::new(RefreshPlatformTokenUseCase::new(
                user_repo.clone(),
                platform_repo.clone(),
                oauth,
                event_pub.clone(),
            )),
            Arc::new(DisconnectPlatformUseCase::new(
                user_repo,
                platform_repo,
                event_pub,
            )),
        )
    }

    #[test]
    fn test_request_validation() {
        assert!(ConnectPlatformRequest {
            user_id: "u".to_string(),
            platform: "TWITCH".to_string(),
            auth_code: "c".to_string(),
        }
        .validate()
        .is_ok());
        assert!(ConnectPlatformRequest {
            user_id: "u".to_string(),
            platform: String::new(),
            auth_code: "c".to_string(),
        }
        .validate()
        .is_err());
        assert!(RefreshPlatformTokenRequest {
            platform_account_id: String::new(),
        }
        .validate()
        .is_err());
    }

    #[tokio::test]
    async fn test_connect_platform_with_stub_oauth() {
        let user = make_user();
        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_find_by_id()
            .once()
            .returning(move |_| Ok(Some(user.clone())));

        let mut platform_repo = MockPlatformAccountRepository::new();
        platform_repo.expect_insert().once().returning(|_| Ok(()));

        let svc = make_service(user_repo, platform_repo);
        let pb = svc
            .connect_platform(ConnectPlatformRequest {
                user_id: "user-1".to_string(),
                platform: "TWITCH".to_string(),
                auth_code: "code".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(pb.platform, "TWITCH");
        assert!(pb.access_token.starts_with("mock_access_"));
    }

    #[tokio::test]
    async fn test_connect_unknown_platform_rejected() {
        let svc = make_service(
            MockUserRepository::new(),
            MockPlatformAccountRepository::new(),
        );
        let result = svc
            .connect_platform(ConnectPlatformRequest {
                user_id: "user-1".to_string(),
                platform: "NICONICO".to_string(),
                auth_code: "code".to_string(),
            })
            .await;
        assert!(matches!(result, Err(GrpcError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_refresh_missing_account_maps_to_not_found() {
        let mut platform_repo = MockPlatformAccountRepository::new();
        platform_repo
            .expect_find_by_id()
            .once()
            .returning(|_| Ok(None));

        let svc = make_service(MockUserRepository::new(), platform_repo);
        let result = svc
            .refresh_platform_token(RefreshPlatformTokenRequest {
                platform_account_id: "ghost".to_string(),
            })
            .await;
        assert!(matches!(result, Err(GrpcError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_disconnect_platform() {
        let account = make_account();
        let user = make_user();
        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_find_by_id()
            .once()
            .returning(move |_| Ok(Some(user.clone())));

        let mut platform_repo = MockPlatformAccountRepository::new();
        platform_repo
            .expect_find_by_id()
            .once()
            .returning(move |_| Ok(Some(account.clone())));
        platform_repo.expect_delete().once().returning(|_| Ok(()));

        let svc = make_service(user_repo, platform_repo);
        let resp = svc
            .disconnect_platform(DisconnectPlatformRequest {
                platform_account_id: "pa-1".to_string(),
            })
            .await
            .unwrap();
        assert!(resp.success);
    }
}

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use super::GrpcError;
use crate::domain::entity::audit_log::{AuditLog, CreateAuditLogRequest};
use crate::domain::repository::AuditLogRepository;
use crate::error::AuthError;
use crate::infrastructure::rate_limiter::RateLimiter;
use crate::usecase::validate_token::ValidateTokenUseCase;

/// フルメソッド名の定数。ハンドラが CallMetadata を組むときに使う。
pub mod methods {
    pub const AUTH_LOGIN: &str = "/auth.v1.AuthService/Login";
    pub const AUTH_VALIDATE_TOKEN: &str = "/auth.v1.AuthService/ValidateToken";
    pub const AUTH_REFRESH_TOKEN: &str = "/auth.v1.AuthService/RefreshToken";
    pub const AUTH_BLACKLIST_TOKEN: &str = "/auth.v1.AuthService/BlacklistToken";
    pub const USER_CREATE: &str = "/auth.v1.UserService/CreateUser";
    pub const USER_GET_BY_ID: &str = "/auth.v1.UserService/GetUserById";
    pub const USER_GET_BY_USERNAME: &str = "/auth.v1.UserService/GetUserByUsername";
    pub const USER_UPDATE: &str = "/auth.v1.UserService/UpdateUser";
    pub const USER_DELETE: &str = "/auth.v1.UserService/DeleteUser";
    pub const PLATFORM_CONNECT: &str = "/auth.v1.PlatformService/ConnectPlatform";
    pub const PLATFORM_REFRESH: &str = "/auth.v1.PlatformService/RefreshPlatformToken";
    pub const PLATFORM_DISCONNECT: &str = "/auth.v1.PlatformService/DisconnectPlatform";
}

/// 認証をスキップするメソッドのサフィックス。
const AUTH_EXEMPT_SUFFIXES: [&str; 2] = ["/Login", "/CreateUser"];

/// 監査ログに残さない読み取り系メソッドのサフィックス。
const AUDIT_EXEMPT_SUFFIXES: [&str; 3] = ["/GetUserById", "/GetUserByUsername", "/ValidateToken"];

/// CallMetadata は 1 回の unary 呼び出しのトランスポートメタデータ。
#[derive(Debug, Clone)]
pub struct CallMetadata {
    pub full_method: String,
    /// `authorization` メタデータの生の値 (`Bearer <token>`)。
    pub authorization: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl CallMetadata {
    pub fn new(full_method: &str, authorization: Option<String>) -> Self {
        Self {
            full_method: full_method.to_string(),
            authorization,
            ip_address: None,
            user_agent: None,
        }
    }
}

/// CallContext は認証インターセプタがハンドラに引き渡す呼び出し文脈。
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    pub user_id: Option<String>,
    pub roles: Vec<String>,
}

/// RpcRequest は検証インターセプタとレートリミッタが要求型ごとに参照する
/// インターフェース。
pub trait RpcRequest {
    /// 必須フィールドの存在確認。欠落はフィールド名のメッセージを返す。
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    /// 認証前サーフェス (Login / CreateUser) のレートリミットキー識別子。
    /// None なら認証済み user_id がキーになる。
    fn pre_auth_identity(&self) -> Option<&str> {
        None
    }
}

/// Authorization ヘッダから Bearer トークンを取り出す。
/// 形式不正・空トークンは None。
pub fn extract_bearer_token(authorization: &str) -> Option<&str> {
    let token = authorization.strip_prefix("Bearer ")?;
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

fn has_suffix(method: &str, suffixes: &[&str]) -> bool {
    suffixes.iter().any(|s| method.ends_with(s))
}

/// InterceptorChain はすべての unary RPC を固定順で包む:
/// ロギング → 認証 → レートリミット → 入力検証 → ハンドラ。
/// 監査ログの記録は直交する関心としてここに配線される (ミューテーション
/// 系メソッドのみ、失敗はログで握りつぶす)。
pub struct InterceptorChain {
    validate_token_uc: Arc<ValidateTokenUseCase>,
    rate_limiter: Arc<dyn RateLimiter>,
    audit_repo: Option<Arc<dyn AuditLogRepository>>,
}

impl InterceptorChain {
    pub fn new(
        validate_token_uc: Arc<ValidateTokenUseCase>,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Self {
            validate_token_uc,
            rate_limiter,
            audit_repo: None,
        }
    }

    pub fn with_audit(mut self, audit_repo: Arc<dyn AuditLogRepository>) -> Self {
        self.audit_repo = Some(audit_repo);
        self
    }

    /// チェーン全体を適用してハンドラを実行する。
    /// ロギングは常に走り、失敗しない。
    pub async fn call<Req, Resp, F, Fut>(
        &self,
        meta: &CallMetadata,
        req: Req,
        handler: F,
    ) -> Result<Resp, GrpcError>
    where
        Req: RpcRequest,
        F: FnOnce(Req, CallContext) -> Fut,
        Fut: Future<Output = Result<Resp, GrpcError>>,
    {
        let start = Instant::now();
        info!(method = %meta.full_method, "received request");

        let result = self.run(meta, req, handler).await;

        let code = match &result {
            Ok(_) => "OK",
            Err(e) => e.code_str(),
        };
        info!(
            method = %meta.full_method,
            code,
            duration_ms = start.elapsed().as_millis() as u64,
            "completed request"
        );
        result
    }

    async fn run<Req, Resp, F, Fut>(
        &self,
        meta: &CallMetadata,
        req: Req,
        handler: F,
    ) -> Result<Resp, GrpcError>
    where
        Req: RpcRequest,
        F: FnOnce(Req, CallContext) -> Fut,
        Fut: Future<Output = Result<Resp, GrpcError>>,
    {
        // --- 認証 ---
        let ctx = if has_suffix(&meta.full_method, &AUTH_EXEMPT_SUFFIXES) {
            CallContext::default()
        } else {
            self.authenticate(meta).await?
        };

        // --- レートリミット ---
        // 認証後に走るため、Login / CreateUser 以外は user_id でキーできる
        let identity = match req.pre_auth_identity() {
            Some(identity) => identity.to_string(),
            None => ctx.user_id.clone().ok_or_else(|| {
                GrpcError::Internal("failed to extract user id for rate limiting".to_string())
            })?,
        };
        let rate_key = format!("{}:{}", identity, meta.full_method);
        let allowed = self
            .rate_limiter
            .allow(&rate_key)
            .await
            .map_err(|e| GrpcError::Internal(format!("rate limit check failed: {}", e)))?;
        if !allowed {
            return Err(GrpcError::ResourceExhausted("too many requests".to_string()));
        }

        // --- 入力検証 ---
        req.validate().map_err(GrpcError::InvalidArgument)?;

        // --- ハンドラ ---
        let result = handler(req, ctx.clone()).await;

        if result.is_ok() {
            self.record_audit(meta, &ctx).await;
        }
        result
    }

    async fn authenticate(&self, meta: &CallMetadata) -> Result<CallContext, GrpcError> {
        let authorization = meta
            .authorization
            .as_deref()
            .ok_or_else(|| GrpcError::Unauthenticated("missing authorization header".to_string()))?;
        let token = extract_bearer_token(authorization).ok_or_else(|| {
            GrpcError::Unauthenticated("authorization header must be 'Bearer <token>'".to_string())
        })?;

        let output = self
            .validate_token_uc
            .execute(token)
            .await
            .map_err(|e| match e {
                AuthError::TokenBlacklisted => GrpcError::from(e),
                AuthError::InvalidToken(_) => GrpcError::from(e),
                other => GrpcError::Internal(format!("failed to validate token: {}", other)),
            })?;

        Ok(CallContext {
            user_id: Some(output.user_id),
            roles: output.roles,
        })
    }

    /// ミューテーション系メソッドの完了を監査ログへ記録する。
    /// 失敗は警告ログのみで呼び出しを失敗させない。
    async fn record_audit(&self, meta: &CallMetadata, ctx: &CallContext) {
        let Some(ref audit_repo) = self.audit_repo else {
            return;
        };
        if has_suffix(&meta.full_method, &AUDIT_EXEMPT_SUFFIXES) {
            return;
        }

        let log = AuditLog::new(CreateAuditLogRequest {
            user_id: ctx.user_id.clone(),
            action: meta.full_method.clone(),
            entity_type: "rpc".to_string(),
            entity_id: meta.full_method.clone(),
            old_values: None,
            new_values: None,
            ip_address: meta.ip_address.clone(),
            user_agent: meta.user_agent.clone(),
        });
        if let Err(e) = audit_repo.create(&log).await {
            warn!(method = %meta.full_method, error = %e, "failed to record audit log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::audit_log_repository::MockAuditLogRepository;
    use crate::domain::repository::token_repository::MockTokenRepository;
    use crate::infrastructure::rate_limiter::MockRateLimiter;
    use crate::infrastructure::token_codec::{
        JwtTokenCodec, DEFAULT_ACCESS_TTL, DEFAULT_REFRESH_TTL,
    };

    const TEST_PRIVATE_PEM: &str = include_str!("../../../tests/fixtures/test_rsa_private.pem");
    const TEST_PUBLIC_PEM: &str = include_str!("../../../tests/fixtures/test_rsa_public.pem");

    struct TestRequest {
        username: String,
    }

    impl RpcRequest for TestRequest {
        fn validate(&self) -> Result<(), String> {
            if self.username.is_empty() {
                return Err("username is required".to_string());
            }
            Ok(())
        }

        fn pre_auth_identity(&self) -> Option<&str> {
            Some(&self.username)
        }
    }

    struct AuthedRequest;

    impl RpcRequest for AuthedRequest {}

    fn make_codec() -> Arc<JwtTokenCodec> {
        Arc::new(
            JwtTokenCodec::from_pem(
                TEST_PRIVATE_PEM.as_bytes(),
                TEST_PUBLIC_PEM.as_bytes(),
                DEFAULT_ACCESS_TTL,
                DEFAULT_REFRESH_TTL,
            )
            .unwrap(),
        )
    }

    fn make_chain(
        token_repo: MockTokenRepository,
        rate_limiter: MockRateLimiter,
    ) -> (InterceptorChain, Arc<JwtTokenCodec>) {
        let codec = make_codec();
        let chain = InterceptorChain::new(
            Arc::new(ValidateTokenUseCase::new(
                Arc::new(token_repo),
                codec.clone(),
            )),
            Arc::new(rate_limiter),
        );
        (chain, codec)
    }

    fn allow_all_limiter() -> MockRateLimiter {
        let mut limiter = MockRateLimiter::new();
        limiter.expect_allow().returning(|_| Ok(true));
        limiter
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("Bearer"), None);
    }

    #[tokio::test]
    async fn test_login_skips_auth_and_keys_on_username() {
        let mut limiter = MockRateLimiter::new();
        limiter
            .expect_allow()
            .withf(|key| key == "bob:/auth.v1.AuthService/Login")
            .once()
            .returning(|_| Ok(true));

        let (chain, _) = make_chain(MockTokenRepository::new(), limiter);
        let meta = CallMetadata::new(methods::AUTH_LOGIN, None);
        let req = TestRequest {
            username: "bob".to_string(),
        };

        let result = chain
            .call(&meta, req, |_req, ctx| async move {
                assert!(ctx.user_id.is_none());
                Ok::<_, GrpcError>("ok")
            })
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_authenticated_call_attaches_context() {
        let codec = make_codec();
        let pair = codec
            .issue_pair("user-1", &["USER".to_string()])
            .unwrap();

        let mut token_repo = MockTokenRepository::new();
        token_repo
            .expect_is_blacklisted()
            .once()
            .returning(|_| Ok(false));

        let mut limiter = MockRateLimiter::new();
        limiter
            .expect_allow()
            .withf(|key| key == "user-1:/auth.v1.UserService/UpdateUser")
            .once()
            .returning(|_| Ok(true));

        let chain = InterceptorChain::new(
            Arc::new(ValidateTokenUseCase::new(Arc::new(token_repo), codec)),
            Arc::new(limiter),
        );
        let meta = CallMetadata::new(
            methods::USER_UPDATE,
            Some(format!("Bearer {}", pair.access_token)),
        );

        let result = chain
            .call(&meta, AuthedRequest, |_req, ctx| async move {
                assert_eq!(ctx.user_id.as_deref(), Some("user-1"));
                assert_eq!(ctx.roles, vec!["USER"]);
                Ok::<_, GrpcError>(())
            })
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_missing_authorization_rejected() {
        let (chain, _) = make_chain(MockTokenRepository::new(), allow_all_limiter());
        let meta = CallMetadata::new(methods::USER_UPDATE, None);

        let result = chain
            .call(&meta, AuthedRequest, |_req, _ctx| async move {
                Ok::<_, GrpcError>(())
            })
            .await;
        assert!(matches!(result, Err(GrpcError::Unauthenticated(_))));
    }

    #[tokio::test]
    async fn test_malformed_authorization_rejected() {
        let (chain, _) = make_chain(MockTokenRepository::new(), allow_all_limiter());
        let meta = CallMetadata::new(methods::USER_UPDATE, Some("Basic dXNlcg==".to_string()));

        let result = chain
            .call(&meta, AuthedRequest, |_req, _ctx| async move {
                Ok::<_, GrpcError>(())
            })
            .await;
        assert!(matches!(result, Err(GrpcError::Unauthenticated(_))));
    }

    #[tokio::test]
    async fn test_blacklisted_token_is_permission_denied() {
        let codec = make_codec();
        let pair = codec.issue_pair("user-1", &[]).unwrap();

        let mut token_repo = MockTokenRepository::new();
        token_repo
            .expect_is_blacklisted()
            .once()
            .returning(|_| Ok(true));

        let chain = InterceptorChain::new(
            Arc::new(ValidateTokenUseCase::new(Arc::new(token_repo), codec)),
            Arc::new(allow_all_limiter()),
        );
        let meta = CallMetadata::new(
            methods::USER_UPDATE,
            Some(format!("Bearer {}", pair.access_token)),
        );

        let result = chain
            .call(&meta, AuthedRequest, |_req, _ctx| async move {
                Ok::<_, GrpcError>(())
            })
            .await;
        assert!(matches!(result, Err(GrpcError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_rate_limit_exceeded() {
        let mut limiter = MockRateLimiter::new();
        limiter.expect_allow().once().returning(|_| Ok(false));

        let (chain, _) = make_chain(MockTokenRepository::new(), limiter);
        let meta = CallMetadata::new(methods::AUTH_LOGIN, None);
        let req = TestRequest {
            username: "bob".to_string(),
        };

        let result = chain
            .call(&meta, req, |_req, _ctx| async move {
                Ok::<_, GrpcError>(())
            })
            .await;
        assert!(matches!(result, Err(GrpcError::ResourceExhausted(_))));
    }

    #[tokio::test]
    async fn test_validation_runs_after_rate_limit() {
        // レートリミットは通るが必須フィールドが空
        let (chain, _) = make_chain(MockTokenRepository::new(), allow_all_limiter());
        let meta = CallMetadata::new(methods::AUTH_LOGIN, None);
        let req = TestRequest {
            username: String::new(),
        };

        // 空の username はレートリミットキーにも使われるが、検証で拒否される
        let result = chain
            .call(&meta, req, |_req, _ctx| async move {
                Ok::<_, GrpcError>(())
            })
            .await;
        assert!(matches!(result, Err(GrpcError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_audit_recorded_for_mutations() {
        let codec = make_codec();
        let pair = codec.issue_pair("user-1", &[]).unwrap();

        let mut token_repo = MockTokenRepository::new();
        token_repo
            .expect_is_blacklisted()
            .once()
            .returning(|_| Ok(false));

        let mut audit_repo = MockAuditLogRepository::new();
        audit_repo
            .expect_create()
            .withf(|log| {
                log.action == "/auth.v1.UserService/DeleteUser"
                    && log.user_id.as_deref() == Some("user-1")
            })
            .once()
            .returning(|_| Ok(()));

        let chain = InterceptorChain::new(
            Arc::new(ValidateTokenUseCase::new(Arc::new(token_repo), codec)),
            Arc::new(allow_all_limiter()),
        )
        .with_audit(Arc::new(audit_repo));

        let meta = CallMetadata::new(
            methods::USER_DELETE,
            Some(format!("Bearer {}", pair.access_token)),
        );
        chain
            .call(&meta, AuthedRequest, |_req, _ctx| async move {
                Ok::<_, GrpcError>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_audit_skipped_for_reads() {
        let codec = make_codec();
        let pair = codec.issue_pair("user-1", &[]).unwrap();

        let mut token_repo = MockTokenRepository::new();
        token_repo
            .expect_is_blacklisted()
            .once()
            .returning(|_| Ok(false));

        let mut audit_repo = MockAuditLogRepository::new();
        audit_repo.expect_create().never();

        let chain = InterceptorChain::new(
            Arc::new(ValidateTokenUseCase::new(Arc::new(token_repo), codec)),
            Arc::new(allow_all_limiter()),
        )
        .with_audit(Arc::new(audit_repo));

        let meta = CallMetadata::new(
            methods::USER_GET_BY_ID,
            Some(format!("Bearer {}", pair.access_token)),
        );
        chain
            .call(&meta, AuthedRequest, |_req, _ctx| async move {
                Ok::<_, GrpcError>(())
            })
            .await
            .unwrap();
    }
}

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use iv_auth_server::adapter::grpc::interceptor::InterceptorChain;
use iv_auth_server::adapter::grpc::{AuthGrpcService, PlatformGrpcService, UserGrpcService};
use iv_auth_server::adapter::handler::{self, AppState};
use iv_auth_server::adapter::repository::memory::{
    InMemoryAuditLogRepository, InMemoryPlatformAccountRepository, InMemoryTokenRepository,
    InMemoryUserRepository,
};
use iv_auth_server::adapter::repository::{
    AuditLogPostgresRepository, CachedPlatformAccountRepository, CachedTokenRepository,
    CachedUserRepository, PlatformAccountPostgresRepository, TokenBlacklistPostgresRepository,
    UserPostgresRepository,
};
use iv_auth_server::domain::repository::{
    AuditLogRepository, PlatformAccountRepository, TokenRepository, UserRepository,
};
use iv_auth_server::infrastructure::cache::{CacheStore, InMemoryCacheStore, RedisCacheStore};
use iv_auth_server::infrastructure::config::Config;
use iv_auth_server::infrastructure::kafka_producer::{
    EventPublisher, KafkaEventPublisher, NoopEventPublisher,
};
use iv_auth_server::infrastructure::oauth::{OAuthClient, StubOAuthClient};
use iv_auth_server::infrastructure::rate_limiter::FixedWindowRateLimiter;
use iv_auth_server::infrastructure::token_codec::JwtTokenCodec;
use iv_auth_server::infrastructure::{database, logging};
use iv_auth_server::usecase::{
    BlacklistTokenUseCase, ConnectPlatformUseCase, CreateUserUseCase, DeleteUserUseCase,
    DisconnectPlatformUseCase, GetUserUseCase, LoginUseCase, RefreshPlatformTokenUseCase,
    RefreshTokenUseCase, UpdateUserUseCase, ValidateTokenUseCase,
};

/// ブラックリスト回収の実行間隔。
const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

/// コマンドライン引数から環境プロファイル (dev|prod) を決める。
fn env_from_args() -> String {
    match std::env::args().nth(1) {
        None => {
            info!("no environment argument provided, defaulting to 'dev'");
            "dev".to_string()
        }
        Some(env) if env == "dev" || env == "prod" => env,
        Some(other) => {
            warn!(environment = %other, "unknown environment, defaulting to 'dev'");
            "dev".to_string()
        }
    }
}

/// SIGINT / SIGTERM を待つ。
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };
    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = env_from_args();
    let cfg = Config::load(&Config::path_for_env(&env))?;

    logging::init_logging(&cfg.logging);
    info!(environment = %cfg.environment, "starting auth server");

    // --- Token codec ---
    let codec = Arc::new(JwtTokenCodec::from_key_files(
        &cfg.jwt.private_key_path,
        &cfg.jwt.public_key_path,
        cfg.jwt.access_ttl()?,
        cfg.jwt.refresh_ttl()?,
    )?);

    // --- Cache store: Redis or InMemory fallback ---
    let (cache, cache_ttl): (Arc<dyn CacheStore>, Duration) = if let Some(ref redis_cfg) = cfg.redis
    {
        info!(addr = %redis_cfg.addr, "connecting to Redis");
        let store = RedisCacheStore::connect(&redis_cfg.connection_url())
            .await
            .map_err(|e| anyhow::anyhow!("failed to connect to Redis: {}", e))?;
        info!("Redis connection established");
        (
            Arc::new(store),
            Duration::from_secs(redis_cfg.cache_ttl_seconds),
        )
    } else {
        info!("Redis not configured, using InMemory cache store");
        (Arc::new(InMemoryCacheStore::new()), Duration::from_secs(300))
    };

    // --- Repositories: PostgreSQL or InMemory fallback, wrapped by the cache tier ---
    let (user_base, platform_base, token_base, audit_repo): (
        Arc<dyn UserRepository>,
        Arc<dyn PlatformAccountRepository>,
        Arc<dyn TokenRepository>,
        Arc<dyn AuditLogRepository>,
    ) = if let Some(ref db_cfg) = cfg.database {
        info!(host = %db_cfg.host, name = %db_cfg.name, "connecting to PostgreSQL");
        let pool = database::create_pool(db_cfg).await?;
        info!("PostgreSQL connection pool established");
        (
            Arc::new(UserPostgresRepository::new(pool.clone())),
            Arc::new(PlatformAccountPostgresRepository::new(pool.clone())),
            Arc::new(TokenBlacklistPostgresRepository::new(pool.clone())),
            Arc::new(AuditLogPostgresRepository::new(pool)),
        )
    } else {
        info!("database not configured, using InMemory repositories");
        (
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(InMemoryPlatformAccountRepository::new()),
            Arc::new(InMemoryTokenRepository::new()),
            Arc::new(InMemoryAuditLogRepository::new()),
        )
    };

    let user_repo: Arc<dyn UserRepository> = Arc::new(CachedUserRepository::new(
        user_base,
        cache.clone(),
        cache_ttl,
    ));
    let platform_repo: Arc<dyn PlatformAccountRepository> = Arc::new(
        CachedPlatformAccountRepository::new(platform_base, cache.clone(), cache_ttl),
    );
    let token_repo: Arc<dyn TokenRepository> =
        Arc::new(CachedTokenRepository::new(token_base, cache.clone()));

    // --- Event publisher: Kafka or Noop fallback ---
    let event_pub: Arc<dyn EventPublisher> = if let Some(ref kafka_cfg) = cfg.kafka {
        info!(broker = %kafka_cfg.broker, "connecting to Kafka");
        let publisher = KafkaEventPublisher::new(kafka_cfg)?;
        info!("Kafka producer initialized");
        Arc::new(publisher)
    } else {
        info!("Kafka not configured, using Noop event publisher");
        Arc::new(NoopEventPublisher)
    };

    // --- OAuth client ---
    // プラットフォーム別の具象クライアントはこのサービスの外にある。
    let oauth: Arc<dyn OAuthClient> = Arc::new(StubOAuthClient);

    // --- Use cases ---
    let login_uc = Arc::new(LoginUseCase::new(
        user_repo.clone(),
        codec.clone(),
        event_pub.clone(),
    ));
    let validate_uc = Arc::new(ValidateTokenUseCase::new(token_repo.clone(), codec.clone()));
    let refresh_uc = Arc::new(RefreshTokenUseCase::new(
        user_repo.clone(),
        token_repo.clone(),
        codec.clone(),
        event_pub.clone(),
    ));
    let blacklist_uc = Arc::new(BlacklistTokenUseCase::new(
        token_repo.clone(),
        codec.clone(),
        event_pub.clone(),
    ));
    let create_user_uc = Arc::new(CreateUserUseCase::new(user_repo.clone(), event_pub.clone()));
    let get_user_uc = Arc::new(GetUserUseCase::new(user_repo.clone()));
    let update_user_uc = Arc::new(UpdateUserUseCase::new(user_repo.clone(), event_pub.clone()));
    let delete_user_uc = Arc::new(DeleteUserUseCase::new(user_repo.clone(), event_pub.clone()));
    let connect_uc = Arc::new(ConnectPlatformUseCase::new(
        user_repo.clone(),
        platform_repo.clone(),
        oauth.clone(),
        event_pub.clone(),
    ));
    let refresh_platform_uc = Arc::new(RefreshPlatformTokenUseCase::new(
        user_repo.clone(),
        platform_repo.clone(),
        oauth,
        event_pub.clone(),
    ));
    let disconnect_uc = Arc::new(DisconnectPlatformUseCase::new(
        user_repo,
        platform_repo,
        event_pub.clone(),
    ));

    // --- gRPC adapter services + interceptor chain ---
    let auth_svc = Arc::new(AuthGrpcService::new(
        login_uc,
        validate_uc.clone(),
        refresh_uc,
        blacklist_uc,
    ));
    let user_svc = Arc::new(UserGrpcService::new(
        create_user_uc,
        get_user_uc,
        update_user_uc,
        delete_user_uc,
    ));
    let platform_svc = Arc::new(PlatformGrpcService::new(
        connect_uc,
        refresh_platform_uc,
        disconnect_uc,
    ));

    let rate_limiter = Arc::new(FixedWindowRateLimiter::new(
        cache,
        cfg.rate_limit.limit,
        Duration::from_secs(cfg.rate_limit.window_seconds),
    ));
    let chain = Arc::new(
        InterceptorChain::new(validate_uc, rate_limiter).with_audit(audit_repo),
    );

    // --- Background reaper for expired blacklist rows ---
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    {
        let token_repo = token_repo.clone();
        let mut shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            interval.tick().await; // 初回は即時発火するので読み捨てる
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match token_repo.cleanup_expired().await {
                            Ok(count) => {
                                if count > 0 {
                                    info!(count, "reaped expired blacklist entries");
                                }
                            }
                            Err(e) => error!(error = %e, "blacklist cleanup failed"),
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        });
    }

    // --- Server ---
    let state = AppState {
        auth_svc,
        user_svc,
        platform_svc,
        chain,
    };
    let app = handler::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.server.port));
    info!(%addr, "RPC server starting");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let mut graceful_rx = shutdown_rx.clone();
    let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = graceful_rx.changed().await;
    });

    let grace = Duration::from_secs(cfg.server.shutdown_grace_seconds);
    tokio::select! {
        result = serve => {
            if let Err(e) = result {
                error!(error = %e, "server error");
            }
        }
        _ = async {
            shutdown_signal().await;
            info!("shutdown signal received, draining in-flight requests");
            let _ = shutdown_tx.send(true);
            tokio::time::sleep(grace).await;
        } => {
            warn!(grace_secs = grace.as_secs(), "grace period expired, forcing shutdown");
        }
    }

    if let Err(e) = event_pub.close().await {
        warn!(error = %e, "failed to flush event publisher");
    }
    info!("auth server stopped");
    Ok(())
}

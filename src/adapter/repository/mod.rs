pub mod audit_log_postgres;
pub mod cached_platform_repository;
pub mod memory;
pub mod cached_token_repository;
pub mod cached_user_repository;
pub mod platform_account_postgres;
pub mod token_blacklist_postgres;
pub mod user_postgres;

pub use audit_log_postgres::AuditLogPostgresRepository;
pub use cached_platform_repository::CachedPlatformAccountRepository;
pub use cached_token_repository::CachedTokenRepository;
pub use cached_user_repository::CachedUserRepository;
pub use platform_account_postgres::PlatformAccountPostgresRepository;
pub use token_blacklist_postgres::TokenBlacklistPostgresRepository;
pub use user_postgres::UserPostgresRepository;

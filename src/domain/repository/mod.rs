pub mod audit_log_repository;
pub mod platform_repository;
pub mod token_repository;
pub mod user_repository;

pub use audit_log_repository::AuditLogRepository;
pub use platform_repository::PlatformAccountRepository;
pub use token_repository::TokenRepository;
pub use user_repository::UserRepository;

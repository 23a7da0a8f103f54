pub mod audit_log;
pub mod email;
pub mod event;
pub mod password;
pub mod platform_account;
pub mod token;
pub mod user;

pub use audit_log::{AuditLog, CreateAuditLogRequest};
pub use email::Email;
pub use event::DomainEvent;
pub use password::Password;
pub use platform_account::{PlatformAccount, PlatformType};
pub use token::{TokenBlacklistEntry, TokenPair};
pub use user::{User, UserStatus};

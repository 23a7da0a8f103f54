pub mod blacklist_token;
pub mod connect_platform;
pub mod create_user;
pub mod delete_user;
pub mod disconnect_platform;
pub mod get_user;
pub mod login;
pub mod refresh_platform_token;
pub mod refresh_token;
pub mod update_user;
pub mod validate_token;

pub use blacklist_token::BlacklistTokenUseCase;
pub use connect_platform::ConnectPlatformUseCase;
pub use create_user::CreateUserUseCase;
pub use delete_user::DeleteUserUseCase;
pub use disconnect_platform::DisconnectPlatformUseCase;
pub use get_user::GetUserUseCase;
pub use login::LoginUseCase;
pub use refresh_platform_token::RefreshPlatformTokenUseCase;
pub use refresh_token::RefreshTokenUseCase;
pub use update_user::UpdateUserUseCase;
pub use validate_token::ValidateTokenUseCase;

use crate::domain::entity::event::DomainEvent;
use crate::infrastructure::kafka_producer::EventPublisher;

/// イベントを発行し、失敗はログだけ残して握りつぶす。
/// ミューテーションが真実であり、イベントは advisory。発行失敗で
/// 先行する永続化をロールバックすることはない。
pub(crate) async fn publish_event(publisher: &dyn EventPublisher, event: DomainEvent) {
    if let Err(e) = publisher.publish(&event).await {
        tracing::warn!(
            topic_suffix = event.topic_suffix(),
            error = %e,
            "failed to publish domain event"
        );
    }
}

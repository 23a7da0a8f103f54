use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::platform_account::PlatformType;

/// DomainEvent はサービスが発行するドメインイベント。
/// 各バリアントは発生時刻 (UTC) を持ち、Kafka のトピックは
/// `<topic_prefix><topic_suffix()>` にルーティングされる。
/// 同一ユーザーのイベントはミューテーションの永続化後にサービスタスク上で
/// 発行されるため、コンシューマから見て因果順になる。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DomainEvent {
    LoginSucceeded {
        user_id: String,
        username: String,
        occurred_at: DateTime<Utc>,
    },
    LoginFailed {
        user_id: String,
        username: String,
        reason: String,
        occurred_at: DateTime<Utc>,
    },
    TokenBlacklisted {
        token_id: String,
        user_id: String,
        reason: String,
        occurred_at: DateTime<Utc>,
    },
    UserCreated {
        user_id: String,
        username: String,
        occurred_at: DateTime<Utc>,
    },
    UserUpdated {
        user_id: String,
        old_values: serde_json::Value,
        new_values: serde_json::Value,
        occurred_at: DateTime<Utc>,
    },
    UserDeleted {
        user_id: String,
        occurred_at: DateTime<Utc>,
    },
    PlatformConnected {
        user_id: String,
        platform_account_id: String,
        platform: PlatformType,
        occurred_at: DateTime<Utc>,
    },
    PlatformDisconnected {
        user_id: String,
        platform_account_id: String,
        platform: PlatformType,
        occurred_at: DateTime<Utc>,
    },
    PlatformTokenRefreshed {
        user_id: String,
        platform_account_id: String,
        platform: PlatformType,
        occurred_at: DateTime<Utc>,
    },
    PlatformConnectionFailed {
        user_id: String,
        platform: PlatformType,
        reason: String,
        occurred_at: DateTime<Utc>,
    },
    PlatformTokenRefreshFailed {
        user_id: String,
        platform_account_id: String,
        reason: String,
        occurred_at: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// トピック名のサフィックス (snake_case のイベント名)。
    pub fn topic_suffix(&self) -> &'static str {
        match self {
            DomainEvent::LoginSucceeded { .. } => "login_succeeded",
            DomainEvent::LoginFailed { .. } => "login_failed",
            DomainEvent::TokenBlacklisted { .. } => "token_blacklisted",
            DomainEvent::UserCreated { .. } => "user_created",
            DomainEvent::UserUpdated { .. } => "user_updated",
            DomainEvent::UserDeleted { .. } => "user_deleted",
            DomainEvent::PlatformConnected { .. } => "platform_connected",
            DomainEvent::PlatformDisconnected { .. } => "platform_disconnected",
            DomainEvent::PlatformTokenRefreshed { .. } => "platform_token_refreshed",
            DomainEvent::PlatformConnectionFailed { .. } => "platform_connection_failed",
            DomainEvent::PlatformTokenRefreshFailed { .. } => "platform_token_refresh_failed",
        }
    }

    /// パーティションキーに使うユーザー ID。
    /// ログイン失敗などユーザーが特定できない場合は空文字。
    pub fn user_id(&self) -> &str {
        match self {
            DomainEvent::LoginSucceeded { user_id, .. }
            | DomainEvent::LoginFailed { user_id, .. }
            | DomainEvent::TokenBlacklisted { user_id, .. }
            | DomainEvent::UserCreated { user_id, .. }
            | DomainEvent::UserUpdated { user_id, .. }
            | DomainEvent::UserDeleted { user_id, .. }
            | DomainEvent::PlatformConnected { user_id, .. }
            | DomainEvent::PlatformDisconnected { user_id, .. }
            | DomainEvent::PlatformTokenRefreshed { user_id, .. }
            | DomainEvent::PlatformConnectionFailed { user_id, .. }
            | DomainEvent::PlatformTokenRefreshFailed { user_id, .. } => user_id,
        }
    }

    /// イベント発生時刻。
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::LoginSucceeded { occurred_at, .. }
            | DomainEvent::LoginFailed { occurred_at, .. }
            | DomainEvent::TokenBlacklisted { occurred_at, .. }
            | DomainEvent::UserCreated { occurred_at, .. }
            | DomainEvent::UserUpdated { occurred_at, .. }
            | DomainEvent::UserDeleted { occurred_at, .. }
            | DomainEvent::PlatformConnected { occurred_at, .. }
            | DomainEvent::PlatformDisconnected { occurred_at, .. }
            | DomainEvent::PlatformTokenRefreshed { occurred_at, .. }
            | DomainEvent::PlatformConnectionFailed { occurred_at, .. }
            | DomainEvent::PlatformTokenRefreshFailed { occurred_at, .. } => *occurred_at,
        }
    }

    pub fn login_succeeded(user_id: &str, username: &str) -> Self {
        DomainEvent::LoginSucceeded {
            user_id: user_id.to_string(),
            username: username.to_string(),
            occurred_at: Utc::now(),
        }
    }

    pub fn login_failed(user_id: &str, username: &str, reason: &str) -> Self {
        DomainEvent::LoginFailed {
            user_id: user_id.to_string(),
            username: username.to_string(),
            reason: reason.to_string(),
            occurred_at: Utc::now(),
        }
    }

    pub fn token_blacklisted(token_id: &str, user_id: &str, reason: &str) -> Self {
        DomainEvent::TokenBlacklisted {
            token_id: token_id.to_string(),
            user_id: user_id.to_string(),
            reason: reason.to_string(),
            occurred_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_suffix_is_snake_case() {
        let event = DomainEvent::login_succeeded("user-1", "alice");
        assert_eq!(event.topic_suffix(), "login_succeeded");

        let event = DomainEvent::PlatformTokenRefreshFailed {
            user_id: "user-1".to_string(),
            platform_account_id: "pa-1".to_string(),
            reason: "expired".to_string(),
            occurred_at: Utc::now(),
        };
        assert_eq!(event.topic_suffix(), "platform_token_refresh_failed");
    }

    #[test]
    fn test_user_id_partition_key() {
        let event = DomainEvent::token_blacklisted("jti-1", "user-9", "logout");
        assert_eq!(event.user_id(), "user-9");

        let event = DomainEvent::login_failed("", "ghost", "user not found");
        assert_eq!(event.user_id(), "");
    }

    #[test]
    fn test_serialization_carries_type_tag() {
        let event = DomainEvent::login_failed("user-1", "alice", "invalid password");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "LoginFailed");
        assert_eq!(json["reason"], "invalid password");
        assert!(json["occurred_at"].is_string());
    }

    #[test]
    fn test_deserialization_roundtrip() {
        let event = DomainEvent::UserUpdated {
            user_id: "user-1".to_string(),
            old_values: serde_json::json!({"email": "old@example.com"}),
            new_values: serde_json::json!({"email": "new@example.com"}),
            occurred_at: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: DomainEvent = serde_json::from_str(&json).unwrap();
        match back {
            DomainEvent::UserUpdated { old_values, .. } => {
                assert_eq!(old_values["email"], "old@example.com");
            }
            other => unreachable!("unexpected event: {:?}", other),
        }
    }
}

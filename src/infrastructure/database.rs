use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::config::DatabaseConfig;

/// PostgreSQL 接続プールを生成する。
/// プールサイズは設定値 (既定 25 open / 5 idle / 5 分 lifetime)。
pub async fn create_pool(cfg: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(cfg.max_open_conns)
        .min_connections(cfg.min_idle_conns)
        .max_lifetime(Duration::from_secs(cfg.conn_max_lifetime_seconds))
        .connect(&cfg.connection_url())
        .await
        .map_err(|e| anyhow::anyhow!("failed to connect to PostgreSQL: {}", e))?;
    Ok(pool)
}

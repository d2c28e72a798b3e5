pub mod mapping;
pub mod sqlite;

pub use mapping::MappingHelpers;
pub use sqlite::{SqliteNotificationRepository, SqliteSubscriptionRepository};

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use notifier_core::config::models::DatabaseConfig;
use notifier_core::NotifierResult;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};

pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let connect_options = SqliteConnectOptions::from_str(&config.url)
            .with_context(|| format!("无效的数据库URL: {}", config.url))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .connect_with(connect_options)
            .await
            .context("连接数据库失败")?;

        info!("数据库连接池已创建: {}", config.url);
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> NotifierResult<()> {
        run_migrations(&self.pool).await
    }

    pub async fn health_check(&self) -> NotifierResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// 创建表和索引，可重复执行
pub async fn run_migrations(pool: &SqlitePool) -> NotifierResult<()> {
    debug!("Running SQLite database migrations");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notifications (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            severity TEXT NOT NULL,
            recipient_id TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            expires_at INTEGER,
            sender_type TEXT NOT NULL,
            sender_id TEXT NOT NULL,
            recognized INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS subscriptions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            subscription_name TEXT NOT NULL,
            recipient_id TEXT NOT NULL,
            properties TEXT NOT NULL DEFAULT '',
            frequency TEXT NOT NULL,
            fired_last INTEGER,
            fires_next INTEGER,
            disabled INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_notifications_recipient_created ON notifications(recipient_id, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_subscriptions_name ON subscriptions(subscription_name)",
        "CREATE INDEX IF NOT EXISTS idx_subscriptions_fires_next ON subscriptions(fires_next)",
        "CREATE INDEX IF NOT EXISTS idx_subscriptions_recipient ON subscriptions(recipient_id)",
    ];

    for index_sql in indexes {
        sqlx::query(index_sql).execute(pool).await?;
    }

    debug!("Successfully completed SQLite database migrations");
    Ok(())
}

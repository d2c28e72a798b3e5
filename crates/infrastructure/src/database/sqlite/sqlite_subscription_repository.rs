use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notifier_core::{
    NotifierError, NotifierResult, Subscription, SubscriptionFilter, SubscriptionRepository,
};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::{debug, instrument, warn};

use crate::database::mapping::MappingHelpers;

const SUBSCRIPTION_COLUMNS: &str = "id, subscription_name, recipient_id, properties, frequency, fired_last, fires_next, disabled, created_at";

pub struct SqliteSubscriptionRepository {
    pool: SqlitePool,
}

impl SqliteSubscriptionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionRepository for SqliteSubscriptionRepository {
    #[instrument(skip(self, subscription), fields(
        subscription_name = %subscription.subscription_name,
        recipient_id = %subscription.recipient_id,
    ))]
    async fn create(&self, subscription: &Subscription) -> NotifierResult<Subscription> {
        let properties = subscription.properties.to_json()?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO subscriptions (subscription_name, recipient_id, properties, frequency, fired_last, fires_next, disabled, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
        .bind(&subscription.subscription_name)
        .bind(&subscription.recipient_id)
        .bind(properties)
        .bind(subscription.frequency)
        .bind(MappingHelpers::opt_to_millis(subscription.fired_last))
        .bind(MappingHelpers::opt_to_millis(subscription.fires_next))
        .bind(subscription.disabled)
        .bind(MappingHelpers::to_millis(subscription.created_at))
        .fetch_one(&self.pool)
        .await?;

        let created = MappingHelpers::row_to_subscription(&row)?;
        debug!(
            "创建订阅成功: ID {}, 处理器: {}",
            created.id, created.subscription_name
        );
        Ok(created)
    }

    #[instrument(skip(self), fields(subscription_id = %id))]
    async fn get_by_id(&self, id: i64) -> NotifierResult<Option<Subscription>> {
        let row = sqlx::query(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(MappingHelpers::row_to_subscription)
            .transpose()
    }

    #[instrument(skip(self, filter))]
    async fn list(&self, filter: &SubscriptionFilter) -> NotifierResult<Vec<Subscription>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE 1 = 1"
        ));

        if let Some(recipient_id) = &filter.recipient_id {
            query
                .push(" AND recipient_id = ")
                .push_bind(recipient_id.clone());
        }
        if let Some(name) = &filter.subscription_name {
            query
                .push(" AND subscription_name = ")
                .push_bind(name.clone());
        }
        if let Some(disabled) = filter.disabled {
            query.push(" AND disabled = ").push_bind(disabled);
        }

        query.push(" ORDER BY id ASC");

        if filter.limit.is_some() || filter.offset.is_some() {
            query
                .push(" LIMIT ")
                .push_bind(filter.limit.unwrap_or(-1))
                .push(" OFFSET ")
                .push_bind(filter.offset.unwrap_or(0));
        }

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(MappingHelpers::row_to_subscription).collect()
    }

    #[instrument(skip(self, subscription), fields(subscription_id = %subscription.id))]
    async fn update(&self, subscription: &Subscription) -> NotifierResult<()> {
        let properties = subscription.properties.to_json()?;

        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET subscription_name = ?2, recipient_id = ?3, properties = ?4, frequency = ?5,
                fired_last = ?6, fires_next = ?7, disabled = ?8
            WHERE id = ?1
            "#,
        )
        .bind(subscription.id)
        .bind(&subscription.subscription_name)
        .bind(&subscription.recipient_id)
        .bind(properties)
        .bind(subscription.frequency)
        .bind(MappingHelpers::opt_to_millis(subscription.fired_last))
        .bind(MappingHelpers::opt_to_millis(subscription.fires_next))
        .bind(subscription.disabled)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(NotifierError::SubscriptionNotFound {
                id: subscription.id,
            });
        }
        Ok(())
    }

    #[instrument(skip(self), fields(subscription_id = %id))]
    async fn delete(&self, id: i64) -> NotifierResult<()> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        debug!("删除订阅 {}: 影响 {} 行", id, result.rows_affected());
        Ok(())
    }

    #[instrument(skip(self, handler_names), fields(handlers = handler_names.len()))]
    async fn find_due(
        &self,
        handler_names: &[String],
        now: DateTime<Utc>,
    ) -> NotifierResult<Vec<Subscription>> {
        if handler_names.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE subscription_name IN ("
        ));
        let mut names = query.separated(", ");
        for name in handler_names {
            names.push_bind(name.clone());
        }
        query
            .push(") AND (fires_next IS NULL OR fires_next <= ")
            .push_bind(MappingHelpers::to_millis(now))
            .push(") ORDER BY id ASC");

        let rows = query.build().fetch_all(&self.pool).await?;
        debug!("查询到 {} 个到期订阅", rows.len());

        // 单条记录损坏只影响该订阅本身
        let subscriptions = rows
            .iter()
            .filter_map(|row| match MappingHelpers::row_to_subscription(row) {
                Ok(subscription) => Some(subscription),
                Err(e) => {
                    let id: Option<i64> = row.try_get("id").ok();
                    warn!(
                        subscription_id = ?id,
                        error = %e,
                        "无法解析到期订阅记录，本次调度跳过该订阅"
                    );
                    None
                }
            })
            .collect();
        Ok(subscriptions)
    }

    #[instrument(skip(self, subscriptions), fields(count = subscriptions.len()))]
    async fn save_all(&self, subscriptions: &[Subscription]) -> NotifierResult<()> {
        if subscriptions.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for subscription in subscriptions {
            sqlx::query("UPDATE subscriptions SET fired_last = ?1, fires_next = ?2 WHERE id = ?3")
                .bind(MappingHelpers::opt_to_millis(subscription.fired_last))
                .bind(MappingHelpers::opt_to_millis(subscription.fires_next))
                .bind(subscription.id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        debug!("批量保存 {} 个订阅的调度字段", subscriptions.len());
        Ok(())
    }
}

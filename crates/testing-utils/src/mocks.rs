//! Mock implementations for the repository and handler traits
//!
//! This module provides in-memory mock implementations that can be used
//! for unit testing without requiring actual database connections or
//! a mail server.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notifier_core::{
    HandlerProperties, Notification, NotificationFilter, NotificationRepository, NotifierError,
    NotifierResult, Subscription, SubscriptionFilter, SubscriptionHandler,
    SubscriptionProperties, SubscriptionRepository,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock implementation of NotificationRepository for testing
#[derive(Debug, Clone)]
pub struct MockNotificationRepository {
    notifications: Arc<Mutex<HashMap<i64, Notification>>>,
    next_id: Arc<Mutex<i64>>,
    failing_recipients: Arc<Mutex<HashSet<String>>>,
    window_queries: Arc<AtomicUsize>,
}

impl MockNotificationRepository {
    pub fn new() -> Self {
        Self {
            notifications: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(Mutex::new(1)),
            failing_recipients: Arc::new(Mutex::new(HashSet::new())),
            window_queries: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_notifications(notifications: Vec<Notification>) -> Self {
        let repo = Self::new();
        for notification in notifications {
            repo.insert(notification);
        }
        repo
    }

    /// Insert a notification keeping its id; id 0 gets the next free id
    pub fn insert(&self, mut notification: Notification) -> Notification {
        let mut notifications = self.notifications.lock().unwrap();
        let mut next_id = self.next_id.lock().unwrap();

        if notification.id == 0 {
            notification.id = *next_id;
        }
        *next_id = (*next_id).max(notification.id + 1);

        notifications.insert(notification.id, notification.clone());
        notification
    }

    /// Make window queries for this recipient fail with a database error
    pub fn fail_for_recipient(&self, recipient_id: &str) {
        self.failing_recipients
            .lock()
            .unwrap()
            .insert(recipient_id.to_string());
    }

    pub fn window_query_count(&self) -> usize {
        self.window_queries.load(Ordering::SeqCst)
    }

    pub fn count(&self) -> usize {
        self.notifications.lock().unwrap().len()
    }

    pub fn get_all_notifications(&self) -> Vec<Notification> {
        let mut all: Vec<Notification> =
            self.notifications.lock().unwrap().values().cloned().collect();
        sort_notifications(&mut all);
        all
    }
}

impl Default for MockNotificationRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn sort_notifications(notifications: &mut [Notification]) {
    notifications.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
}

#[async_trait]
impl NotificationRepository for MockNotificationRepository {
    async fn create(&self, notification: &Notification) -> NotifierResult<Notification> {
        let mut new_notification = notification.clone();
        new_notification.id = 0;
        Ok(self.insert(new_notification))
    }

    async fn get_by_id(&self, id: i64) -> NotifierResult<Option<Notification>> {
        let notifications = self.notifications.lock().unwrap();
        Ok(notifications.get(&id).cloned())
    }

    async fn list(&self, filter: &NotificationFilter) -> NotifierResult<Vec<Notification>> {
        let mut filtered: Vec<Notification> = self
            .notifications
            .lock()
            .unwrap()
            .values()
            .filter(|n| filter.matches(n))
            .cloned()
            .collect();
        sort_notifications(&mut filtered);

        if let Some(offset) = filter.offset {
            filtered = filtered.into_iter().skip(offset as usize).collect();
        }
        if let Some(limit) = filter.limit {
            filtered.truncate(limit as usize);
        }

        Ok(filtered)
    }

    async fn find_by_recipient_created_between(
        &self,
        recipient_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> NotifierResult<Vec<Notification>> {
        self.window_queries.fetch_add(1, Ordering::SeqCst);

        if self.failing_recipients.lock().unwrap().contains(recipient_id) {
            return Err(NotifierError::DatabaseOperation(format!(
                "模拟查询失败: {recipient_id}"
            )));
        }

        let filter = NotificationFilter {
            recipient_id: Some(recipient_id.to_string()),
            created_from: Some(since),
            created_until: Some(until),
            ..Default::default()
        };
        self.list(&filter).await
    }

    async fn mark_recognized(&self, id: i64, recognized: bool) -> NotifierResult<()> {
        let mut notifications = self.notifications.lock().unwrap();
        match notifications.get_mut(&id) {
            Some(notification) => {
                notification.recognized = recognized;
                Ok(())
            }
            None => Err(NotifierError::NotificationNotFound { id }),
        }
    }

    async fn delete(&self, id: i64) -> NotifierResult<()> {
        self.notifications.lock().unwrap().remove(&id);
        Ok(())
    }
}

/// Mock implementation of SubscriptionRepository for testing
#[derive(Debug, Clone)]
pub struct MockSubscriptionRepository {
    subscriptions: Arc<Mutex<HashMap<i64, Subscription>>>,
    next_id: Arc<Mutex<i64>>,
    fail_find_due: Arc<AtomicBool>,
    fail_save_all: Arc<AtomicBool>,
    find_due_calls: Arc<AtomicUsize>,
    saved_batches: Arc<Mutex<Vec<Vec<i64>>>>,
}

impl MockSubscriptionRepository {
    pub fn new() -> Self {
        Self {
            subscriptions: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(Mutex::new(1)),
            fail_find_due: Arc::new(AtomicBool::new(false)),
            fail_save_all: Arc::new(AtomicBool::new(false)),
            find_due_calls: Arc::new(AtomicUsize::new(0)),
            saved_batches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_subscriptions(subscriptions: Vec<Subscription>) -> Self {
        let repo = Self::new();
        for subscription in subscriptions {
            repo.insert(subscription);
        }
        repo
    }

    /// Insert a subscription keeping its id; id 0 gets the next free id
    pub fn insert(&self, mut subscription: Subscription) -> Subscription {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let mut next_id = self.next_id.lock().unwrap();

        if subscription.id == 0 {
            subscription.id = *next_id;
        }
        *next_id = (*next_id).max(subscription.id + 1);

        subscriptions.insert(subscription.id, subscription.clone());
        subscription
    }

    pub fn set_fail_find_due(&self, fail: bool) {
        self.fail_find_due.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_save_all(&self, fail: bool) {
        self.fail_save_all.store(fail, Ordering::SeqCst);
    }

    pub fn find_due_calls(&self) -> usize {
        self.find_due_calls.load(Ordering::SeqCst)
    }

    /// Ids passed to each `save_all` call, in call order
    pub fn saved_batches(&self) -> Vec<Vec<i64>> {
        self.saved_batches.lock().unwrap().clone()
    }

    pub fn get(&self, id: i64) -> Option<Subscription> {
        self.subscriptions.lock().unwrap().get(&id).cloned()
    }

    pub fn count(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }
}

impl Default for MockSubscriptionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriptionRepository for MockSubscriptionRepository {
    async fn create(&self, subscription: &Subscription) -> NotifierResult<Subscription> {
        let mut new_subscription = subscription.clone();
        new_subscription.id = 0;
        Ok(self.insert(new_subscription))
    }

    async fn get_by_id(&self, id: i64) -> NotifierResult<Option<Subscription>> {
        Ok(self.get(id))
    }

    async fn list(&self, filter: &SubscriptionFilter) -> NotifierResult<Vec<Subscription>> {
        let mut filtered: Vec<Subscription> = self
            .subscriptions
            .lock()
            .unwrap()
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        filtered.sort_by_key(|s| s.id);

        if let Some(offset) = filter.offset {
            filtered = filtered.into_iter().skip(offset as usize).collect();
        }
        if let Some(limit) = filter.limit {
            filtered.truncate(limit as usize);
        }

        Ok(filtered)
    }

    async fn update(&self, subscription: &Subscription) -> NotifierResult<()> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        match subscriptions.get_mut(&subscription.id) {
            Some(existing) => {
                *existing = subscription.clone();
                Ok(())
            }
            None => Err(NotifierError::SubscriptionNotFound {
                id: subscription.id,
            }),
        }
    }

    async fn delete(&self, id: i64) -> NotifierResult<()> {
        self.subscriptions.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn find_due(
        &self,
        handler_names: &[String],
        now: DateTime<Utc>,
    ) -> NotifierResult<Vec<Subscription>> {
        self.find_due_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_find_due.load(Ordering::SeqCst) {
            return Err(NotifierError::DatabaseOperation(
                "模拟到期订阅查询失败".to_string(),
            ));
        }

        let mut due: Vec<Subscription> = self
            .subscriptions
            .lock()
            .unwrap()
            .values()
            .filter(|s| handler_names.contains(&s.subscription_name) && s.is_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|s| s.id);
        Ok(due)
    }

    async fn save_all(&self, subscriptions: &[Subscription]) -> NotifierResult<()> {
        if self.fail_save_all.load(Ordering::SeqCst) {
            return Err(NotifierError::DatabaseOperation(
                "模拟批量保存失败".to_string(),
            ));
        }

        let mut stored = self.subscriptions.lock().unwrap();
        for subscription in subscriptions {
            if let Some(existing) = stored.get_mut(&subscription.id) {
                existing.fired_last = subscription.fired_last;
                existing.fires_next = subscription.fires_next;
            }
        }
        self.saved_batches
            .lock()
            .unwrap()
            .push(subscriptions.iter().map(|s| s.id).collect());
        Ok(())
    }
}

/// How a [`MockSubscriptionHandler`] answers delivery calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockDeliveryOutcome {
    Success,
    /// Returns `Ok(false)`
    Failure,
    /// Returns a delivery error
    Error,
    /// Sleeps for the given duration and then succeeds
    Hang(Duration),
}

/// A delivery captured by [`MockSubscriptionHandler`]
#[derive(Debug, Clone)]
pub struct RecordedDelivery {
    pub notifications: Vec<Notification>,
    pub properties: SubscriptionProperties,
}

impl RecordedDelivery {
    pub fn recipient_id(&self) -> Option<&str> {
        self.notifications.first().map(|n| n.recipient_id.as_str())
    }

    pub fn notification_ids(&self) -> Vec<i64> {
        self.notifications.iter().map(|n| n.id).collect()
    }
}

/// Mock subscription handler recording every call
#[derive(Debug)]
pub struct MockSubscriptionHandler {
    name: String,
    required_keys: Vec<String>,
    configure_result: bool,
    configure_delay: Option<Duration>,
    outcome: Mutex<MockDeliveryOutcome>,
    failing_recipients: Mutex<HashSet<String>>,
    configure_calls: AtomicUsize,
    deliveries: Mutex<Vec<RecordedDelivery>>,
}

impl MockSubscriptionHandler {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            required_keys: Vec::new(),
            configure_result: true,
            configure_delay: None,
            outcome: Mutex::new(MockDeliveryOutcome::Success),
            failing_recipients: Mutex::new(HashSet::new()),
            configure_calls: AtomicUsize::new(0),
            deliveries: Mutex::new(Vec::new()),
        }
    }

    pub fn with_required_keys(mut self, keys: &[&str]) -> Self {
        self.required_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    /// `configure()` returns false, so the handler is never endorsed
    pub fn rejecting_configuration(mut self) -> Self {
        self.configure_result = false;
        self
    }

    pub fn with_configure_delay(mut self, delay: Duration) -> Self {
        self.configure_delay = Some(delay);
        self
    }

    pub fn with_outcome(self, outcome: MockDeliveryOutcome) -> Self {
        self.set_outcome(outcome);
        self
    }

    /// Deliveries whose notifications belong to this recipient return an error
    pub fn failing_for_recipient(self, recipient_id: &str) -> Self {
        self.failing_recipients
            .lock()
            .unwrap()
            .insert(recipient_id.to_string());
        self
    }

    pub fn set_outcome(&self, outcome: MockDeliveryOutcome) {
        *self.outcome.lock().unwrap() = outcome;
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Shares this mock as a trait object while the caller keeps the concrete handle
    pub fn as_handler(self: &Arc<Self>) -> Arc<dyn SubscriptionHandler> {
        Arc::clone(self) as Arc<dyn SubscriptionHandler>
    }

    pub fn configure_calls(&self) -> usize {
        self.configure_calls.load(Ordering::SeqCst)
    }

    pub fn deliveries(&self) -> Vec<RecordedDelivery> {
        self.deliveries.lock().unwrap().clone()
    }

    pub fn delivery_count(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }
}

#[async_trait]
impl SubscriptionHandler for MockSubscriptionHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> HandlerProperties {
        self.required_keys
            .iter()
            .fold(HandlerProperties::create(&self.name), |props, key| {
                props.add_property(key.as_str(), format!("mock property {key}"))
            })
    }

    fn check_subscription(&self, subscription: &Subscription) -> bool {
        self.required_keys
            .iter()
            .all(|key| subscription.properties.contains_key(key))
    }

    async fn configure(&self) -> bool {
        self.configure_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.configure_delay {
            tokio::time::sleep(delay).await;
        }
        self.configure_result
    }

    async fn handle_notifications(
        &self,
        notifications: &[Notification],
        properties: &SubscriptionProperties,
    ) -> NotifierResult<bool> {
        self.deliveries.lock().unwrap().push(RecordedDelivery {
            notifications: notifications.to_vec(),
            properties: properties.clone(),
        });

        let fails_for_recipient = {
            let failing = self.failing_recipients.lock().unwrap();
            notifications
                .iter()
                .any(|n| failing.contains(&n.recipient_id))
        };
        if fails_for_recipient {
            return Err(NotifierError::delivery("模拟投递失败"));
        }

        let outcome = *self.outcome.lock().unwrap();
        match outcome {
            MockDeliveryOutcome::Success => Ok(true),
            MockDeliveryOutcome::Failure => Ok(false),
            MockDeliveryOutcome::Error => Err(NotifierError::delivery("模拟投递错误")),
            MockDeliveryOutcome::Hang(duration) => {
                tokio::time::sleep(duration).await;
                Ok(true)
            }
        }
    }
}

//! Test data builders for creating test entities
//!
//! This module provides builder patterns for creating test data with
//! sensible defaults and easy customization.

use chrono::{DateTime, Utc};
use notifier_core::{
    Frequency, Notification, SenderType, Severity, Subscription, SubscriptionProperties,
};

/// Builder for creating test Notification entities
pub struct NotificationBuilder {
    notification: Notification,
}

impl NotificationBuilder {
    pub fn new() -> Self {
        Self {
            notification: Notification {
                id: 0,
                severity: Severity::Info,
                recipient_id: "test_recipient".to_string(),
                content: "test notification".to_string(),
                created_at: Utc::now(),
                expires_at: None,
                sender_type: SenderType::System,
                sender_id: "test_sender".to_string(),
                recognized: false,
            },
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.notification.id = id;
        self
    }

    pub fn with_recipient(mut self, recipient_id: &str) -> Self {
        self.notification.recipient_id = recipient_id.to_string();
        self
    }

    pub fn with_content(mut self, content: &str) -> Self {
        self.notification.content = content.to_string();
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.notification.severity = severity;
        self
    }

    pub fn with_sender(mut self, sender_type: SenderType, sender_id: &str) -> Self {
        self.notification.sender_type = sender_type;
        self.notification.sender_id = sender_id.to_string();
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.notification.created_at = created_at;
        self
    }

    pub fn expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.notification.expires_at = Some(expires_at);
        self
    }

    pub fn recognized(mut self) -> Self {
        self.notification.recognized = true;
        self
    }

    pub fn build(self) -> Notification {
        self.notification
    }
}

impl Default for NotificationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating test Subscription entities
pub struct SubscriptionBuilder {
    subscription: Subscription,
}

impl SubscriptionBuilder {
    /// A HOURLY "logfile" subscription created now, with schedule fields at creation time
    pub fn new() -> Self {
        Self {
            subscription: Subscription::new(
                "logfile",
                "test_recipient",
                SubscriptionProperties::new(),
                Frequency::Hourly,
            ),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.subscription.id = id;
        self
    }

    pub fn with_handler(mut self, subscription_name: &str) -> Self {
        self.subscription.subscription_name = subscription_name.to_string();
        self
    }

    pub fn with_recipient(mut self, recipient_id: &str) -> Self {
        self.subscription.recipient_id = recipient_id.to_string();
        self
    }

    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.subscription.properties.insert(key, value);
        self
    }

    pub fn with_properties(mut self, properties: SubscriptionProperties) -> Self {
        self.subscription.properties = properties;
        self
    }

    pub fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.subscription.frequency = frequency;
        self
    }

    /// Sets creation time and both schedule fields, as a freshly created subscription has
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.subscription.created_at = created_at;
        self.subscription.fired_last = Some(created_at);
        self.subscription.fires_next = Some(created_at);
        self
    }

    pub fn fired_last(mut self, fired_last: Option<DateTime<Utc>>) -> Self {
        self.subscription.fired_last = fired_last;
        self
    }

    pub fn fires_next(mut self, fires_next: Option<DateTime<Utc>>) -> Self {
        self.subscription.fires_next = fires_next;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.subscription.disabled = true;
        self
    }

    pub fn build(self) -> Subscription {
        self.subscription
    }
}

impl Default for SubscriptionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

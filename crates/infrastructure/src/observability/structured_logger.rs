//! Structured logging utilities
//!
//! Every helper emits a fixed `event` field so log pipelines can select
//! dispatch events without parsing messages.

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

/// Structured logging utilities
pub struct StructuredLogger;

impl StructuredLogger {
    /// Handler passed its one-time self-configuration
    pub fn log_handler_endorsed(handler: &str) {
        info!(
            event = "handler_endorsed",
            handler.name = handler,
            "Subscription handler endorsed"
        );
    }

    /// Handler failed self-configuration and stays disabled for the process lifetime
    pub fn log_handler_rejected(handler: &str) {
        warn!(
            event = "handler_rejected",
            handler.name = handler,
            "Subscription handler failed to configure and will not be used"
        );
    }

    pub fn log_no_handlers() {
        warn!(
            event = "no_handlers",
            "No subscription handlers available, subscription processing is disabled"
        );
    }

    pub fn log_subscription_dispatched(
        subscription_id: i64,
        handler: &str,
        recipient_id: &str,
        notification_count: usize,
        fires_next: Option<DateTime<Utc>>,
    ) {
        info!(
            event = "subscription_dispatched",
            subscription.id = subscription_id,
            handler.name = handler,
            recipient.id = recipient_id,
            notification.count = notification_count,
            subscription.fires_next = ?fires_next,
            "Notifications delivered"
        );
    }

    pub fn log_dispatch_failed(
        subscription_id: i64,
        handler: &str,
        recipient_id: &str,
        reason: &str,
    ) {
        error!(
            event = "dispatch_failed",
            subscription.id = subscription_id,
            handler.name = handler,
            recipient.id = recipient_id,
            failure.reason = reason,
            "Notification delivery failed, window will be retried"
        );
    }

    pub fn log_tick_completed(
        recipients: usize,
        dispatched: usize,
        failed: usize,
        skipped_empty: usize,
        skipped_other: usize,
        duration_ms: u64,
    ) {
        info!(
            event = "tick_completed",
            tick.recipients = recipients,
            tick.dispatched = dispatched,
            tick.failed = failed,
            tick.skipped_empty = skipped_empty,
            tick.skipped_other = skipped_other,
            tick.duration_ms = duration_ms,
            "Subscription tick completed"
        );
    }

    pub fn log_tick_overlapped() {
        warn!(
            event = "tick_overlapped",
            "Previous subscription tick still running, skipping this tick"
        );
    }

    /// Log system error
    pub fn log_system_error(component: &str, operation: &str, error: &dyn std::error::Error) {
        error!(
            event = "system_error",
            component = component,
            operation = operation,
            error = %error,
            "System error occurred"
        );
    }
}

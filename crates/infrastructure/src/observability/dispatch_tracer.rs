use chrono::{DateTime, Utc};

/// Span constructors for the dispatch path
pub struct DispatchTracer;

impl DispatchTracer {
    pub fn tick_span(tick_at: DateTime<Utc>) -> tracing::Span {
        tracing::info_span!("subscription_tick", tick.at = %tick_at)
    }

    pub fn recipient_span(recipient_id: &str, subscription_count: usize) -> tracing::Span {
        tracing::info_span!(
            "process_recipient",
            recipient.id = recipient_id,
            subscription.count = subscription_count
        )
    }

    pub fn dispatch_span(subscription_id: i64, handler: &str) -> tracing::Span {
        tracing::info_span!(
            "dispatch_subscription",
            subscription.id = subscription_id,
            handler.name = handler
        )
    }
}

//! 按投递频率推进订阅的调度时间

use chrono::{DateTime, Duration, Utc};
use notifier_core::{Frequency, Subscription};

/// 根据频率计算下一次允许投递的时间
///
/// LIVE 返回投递时间本身，即下一个调度周期就会再次到期。
pub fn next_fire_time(frequency: Frequency, dispatched_at: DateTime<Utc>) -> DateTime<Utc> {
    match frequency {
        Frequency::Live => dispatched_at,
        Frequency::Hourly => dispatched_at + Duration::hours(1),
        Frequency::Daily => dispatched_at + Duration::days(1),
    }
}

/// 投递成功后更新订阅的调度字段
pub fn apply(subscription: &mut Subscription, dispatched_at: DateTime<Utc>) {
    subscription.fired_last = Some(dispatched_at);
    subscription.fires_next = Some(next_fire_time(subscription.frequency, dispatched_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use notifier_testing_utils::SubscriptionBuilder;

    #[test]
    fn test_next_fire_time_per_frequency() {
        let at = Utc.with_ymd_and_hms(2024, 1, 31, 23, 30, 0).unwrap();

        assert_eq!(next_fire_time(Frequency::Live, at), at);
        assert_eq!(
            next_fire_time(Frequency::Hourly, at),
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 30, 0).unwrap()
        );
        assert_eq!(
            next_fire_time(Frequency::Daily, at),
            Utc.with_ymd_and_hms(2024, 2, 1, 23, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_apply_updates_only_schedule_fields() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let at = created + Duration::hours(3);
        let mut subscription = SubscriptionBuilder::new()
            .with_id(7)
            .with_frequency(Frequency::Daily)
            .with_property("filename", "a.log")
            .created_at(created)
            .build();
        let before = subscription.clone();

        apply(&mut subscription, at);

        assert_eq!(subscription.fired_last, Some(at));
        assert_eq!(subscription.fires_next, Some(at + Duration::days(1)));
        assert_eq!(subscription.properties, before.properties);
        assert_eq!(subscription.created_at, before.created_at);
        assert_eq!(subscription.recipient_id, before.recipient_id);
    }
}

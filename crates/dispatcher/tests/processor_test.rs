#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use notifier_core::*;
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

    use notifier_dispatcher::processor::*;
    use notifier_dispatcher::registry::HandlerRegistry;
    use notifier_infrastructure::MetricsCollector;
    use notifier_testing_utils::{
        MockDeliveryOutcome, MockNotificationRepository, MockSubscriptionHandler,
        MockSubscriptionRepository, NotificationBuilder, SubscriptionBuilder,
    };

    fn create_test_metrics() -> Arc<MetricsCollector> {
        Arc::new(MetricsCollector::new())
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    fn create_processor(
        handlers: Vec<Arc<dyn SubscriptionHandler>>,
        subscription_repo: &Arc<MockSubscriptionRepository>,
        notification_repo: &Arc<MockNotificationRepository>,
    ) -> SubscriptionProcessor {
        SubscriptionProcessor::new(
            Arc::new(HandlerRegistry::new(handlers)),
            subscription_repo.clone(),
            notification_repo.clone(),
            create_test_metrics(),
            StdDuration::from_secs(5),
        )
    }

    fn notification_at(id: i64, recipient: &str, created_at: DateTime<Utc>) -> Notification {
        NotificationBuilder::new()
            .with_id(id)
            .with_recipient(recipient)
            .with_content(&format!("notification {id}"))
            .created_at(created_at)
            .build()
    }

    #[tokio::test]
    async fn test_hourly_subscription_scenario() {
        let handler = MockSubscriptionHandler::new("logfile").into_arc();
        let subscription_repo = Arc::new(MockSubscriptionRepository::with_subscriptions(vec![
            SubscriptionBuilder::new()
                .with_id(1)
                .with_recipient("alice")
                .with_property("filename", "alice.log")
                .with_frequency(Frequency::Hourly)
                .created_at(t0())
                .build(),
        ]));
        let notification_repo = Arc::new(MockNotificationRepository::with_notifications(vec![
            notification_at(1, "alice", t0() + Duration::minutes(10)),
        ]));
        let processor =
            create_processor(vec![handler.as_handler()], &subscription_repo, &notification_repo);

        let tick = t0() + Duration::minutes(15);
        let summary = processor.tick_at(tick).await;

        assert_eq!(summary.recipients, 1);
        assert_eq!(summary.dispatched, 1);
        assert_eq!(summary.failed, 0);
        assert!(!summary.overlapped);

        let deliveries = handler.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].notification_ids(), vec![1]);
        assert_eq!(deliveries[0].properties.get("filename"), Some("alice.log"));

        let stored = subscription_repo.get(1).unwrap();
        assert_eq!(stored.fired_last, Some(tick));
        assert_eq!(stored.fires_next, Some(t0() + Duration::minutes(75)));
    }

    #[tokio::test]
    async fn test_future_fires_next_is_not_dispatched() {
        let handler = MockSubscriptionHandler::new("logfile").into_arc();
        let subscription = SubscriptionBuilder::new()
            .with_id(1)
            .with_recipient("alice")
            .created_at(t0())
            .fires_next(Some(t0() + Duration::hours(2)))
            .build();
        let subscription_repo = Arc::new(MockSubscriptionRepository::with_subscriptions(vec![
            subscription.clone(),
        ]));
        let notification_repo = Arc::new(MockNotificationRepository::with_notifications(vec![
            notification_at(1, "alice", t0() + Duration::minutes(5)),
        ]));
        let processor =
            create_processor(vec![handler.as_handler()], &subscription_repo, &notification_repo);

        let summary = processor.tick_at(t0() + Duration::hours(1)).await;

        assert_eq!(summary.dispatched, 0);
        assert_eq!(handler.delivery_count(), 0);
        assert_eq!(subscription_repo.get(1).unwrap(), subscription);
    }

    #[tokio::test]
    async fn test_reschedule_per_frequency() {
        let handler = MockSubscriptionHandler::new("logfile").into_arc();
        let subscription_repo = Arc::new(MockSubscriptionRepository::with_subscriptions(vec![
            SubscriptionBuilder::new()
                .with_id(1)
                .with_recipient("live")
                .with_frequency(Frequency::Live)
                .created_at(t0())
                .build(),
            SubscriptionBuilder::new()
                .with_id(2)
                .with_recipient("hourly")
                .with_frequency(Frequency::Hourly)
                .created_at(t0())
                .build(),
            SubscriptionBuilder::new()
                .with_id(3)
                .with_recipient("daily")
                .with_frequency(Frequency::Daily)
                .created_at(t0())
                .build(),
        ]));
        let notification_repo = Arc::new(MockNotificationRepository::with_notifications(vec![
            notification_at(1, "live", t0() + Duration::minutes(1)),
            notification_at(2, "hourly", t0() + Duration::minutes(1)),
            notification_at(3, "daily", t0() + Duration::minutes(1)),
        ]));
        let processor =
            create_processor(vec![handler.as_handler()], &subscription_repo, &notification_repo);

        let tick = t0() + Duration::minutes(2);
        let summary = processor.tick_at(tick).await;

        assert_eq!(summary.recipients, 3);
        assert_eq!(summary.dispatched, 3);
        assert_eq!(subscription_repo.get(1).unwrap().fires_next, Some(tick));
        assert_eq!(
            subscription_repo.get(2).unwrap().fires_next,
            Some(tick + Duration::hours(1))
        );
        assert_eq!(
            subscription_repo.get(3).unwrap().fires_next,
            Some(tick + Duration::days(1))
        );
    }

    #[tokio::test]
    async fn test_empty_window_leaves_schedule_unchanged() {
        let handler = MockSubscriptionHandler::new("logfile").into_arc();
        let subscription = SubscriptionBuilder::new()
            .with_id(1)
            .with_recipient("alice")
            .created_at(t0())
            .build();
        let subscription_repo = Arc::new(MockSubscriptionRepository::with_subscriptions(vec![
            subscription.clone(),
        ]));
        // 早于窗口起点的通知不属于当前窗口
        let notification_repo = Arc::new(MockNotificationRepository::with_notifications(vec![
            notification_at(1, "alice", t0() - Duration::minutes(5)),
            notification_at(2, "alice", t0() - Duration::milliseconds(1)),
        ]));
        let processor =
            create_processor(vec![handler.as_handler()], &subscription_repo, &notification_repo);

        let summary = processor.tick_at(t0() + Duration::minutes(30)).await;

        assert_eq!(summary.skipped_empty, 1);
        assert_eq!(summary.dispatched, 0);
        assert_eq!(handler.delivery_count(), 0);
        assert_eq!(subscription_repo.get(1).unwrap(), subscription);
    }

    #[tokio::test]
    async fn test_failure_is_isolated_per_recipient() {
        let handler = MockSubscriptionHandler::new("logfile")
            .failing_for_recipient("bob")
            .into_arc();
        let subscription_repo = Arc::new(MockSubscriptionRepository::with_subscriptions(vec![
            SubscriptionBuilder::new()
                .with_id(1)
                .with_recipient("bob")
                .created_at(t0())
                .build(),
            SubscriptionBuilder::new()
                .with_id(2)
                .with_recipient("carol")
                .created_at(t0())
                .build(),
        ]));
        let notification_repo = Arc::new(MockNotificationRepository::with_notifications(vec![
            notification_at(1, "bob", t0() + Duration::minutes(1)),
            notification_at(2, "carol", t0() + Duration::minutes(1)),
        ]));
        let processor =
            create_processor(vec![handler.as_handler()], &subscription_repo, &notification_repo);

        let tick = t0() + Duration::minutes(5);
        let summary = processor.tick_at(tick).await;

        assert_eq!(summary.recipients, 2);
        assert_eq!(summary.dispatched, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(subscription_repo.get(1).unwrap().fired_last, Some(t0()));
        assert_eq!(subscription_repo.get(2).unwrap().fired_last, Some(tick));
    }

    #[tokio::test]
    async fn test_rejected_delivery_is_retried_with_same_window() {
        let handler = MockSubscriptionHandler::new("logfile")
            .with_outcome(MockDeliveryOutcome::Failure)
            .into_arc();
        let subscription_repo = Arc::new(MockSubscriptionRepository::with_subscriptions(vec![
            SubscriptionBuilder::new()
                .with_id(1)
                .with_recipient("alice")
                .created_at(t0())
                .build(),
        ]));
        let notification_repo = Arc::new(MockNotificationRepository::with_notifications(vec![
            notification_at(1, "alice", t0() + Duration::minutes(1)),
            notification_at(2, "alice", t0() + Duration::minutes(2)),
        ]));
        let processor =
            create_processor(vec![handler.as_handler()], &subscription_repo, &notification_repo);

        let first = processor.tick_at(t0() + Duration::minutes(5)).await;
        assert_eq!(first.failed, 1);
        assert_eq!(subscription_repo.get(1).unwrap().fired_last, Some(t0()));
        assert_eq!(subscription_repo.get(1).unwrap().fires_next, Some(t0()));

        handler.set_outcome(MockDeliveryOutcome::Success);
        let retry_tick = t0() + Duration::minutes(10);
        let second = processor.tick_at(retry_tick).await;

        assert_eq!(second.dispatched, 1);
        let deliveries = handler.deliveries();
        assert_eq!(deliveries.len(), 2);
        assert_eq!(deliveries[0].notification_ids(), vec![1, 2]);
        assert_eq!(deliveries[1].notification_ids(), vec![1, 2]);
        assert_eq!(subscription_repo.get(1).unwrap().fired_last, Some(retry_tick));
    }

    #[tokio::test]
    async fn test_handler_error_leaves_schedule_unchanged() {
        let handler = MockSubscriptionHandler::new("logfile")
            .with_outcome(MockDeliveryOutcome::Error)
            .into_arc();
        let subscription = SubscriptionBuilder::new()
            .with_id(1)
            .with_recipient("alice")
            .created_at(t0())
            .build();
        let subscription_repo = Arc::new(MockSubscriptionRepository::with_subscriptions(vec![
            subscription.clone(),
        ]));
        let notification_repo = Arc::new(MockNotificationRepository::with_notifications(vec![
            notification_at(1, "alice", t0() + Duration::minutes(1)),
        ]));
        let processor =
            create_processor(vec![handler.as_handler()], &subscription_repo, &notification_repo);

        let summary = processor.tick_at(t0() + Duration::minutes(5)).await;

        assert_eq!(summary.failed, 1);
        assert_eq!(handler.delivery_count(), 1);
        assert_eq!(subscription_repo.get(1).unwrap(), subscription);
    }

    #[tokio::test]
    async fn test_slow_delivery_times_out() {
        let handler = MockSubscriptionHandler::new("logfile")
            .with_outcome(MockDeliveryOutcome::Hang(StdDuration::from_secs(2)))
            .into_arc();
        let subscription_repo = Arc::new(MockSubscriptionRepository::with_subscriptions(vec![
            SubscriptionBuilder::new()
                .with_id(1)
                .with_recipient("alice")
                .created_at(t0())
                .build(),
        ]));
        let notification_repo = Arc::new(MockNotificationRepository::with_notifications(vec![
            notification_at(1, "alice", t0() + Duration::minutes(1)),
        ]));
        let processor = SubscriptionProcessor::new(
            Arc::new(HandlerRegistry::new(vec![handler.as_handler()])),
            subscription_repo.clone(),
            notification_repo.clone(),
            create_test_metrics(),
            StdDuration::from_millis(50),
        );

        let summary = processor.tick_at(t0() + Duration::minutes(5)).await;

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.dispatched, 0);
        assert_eq!(subscription_repo.get(1).unwrap().fired_last, Some(t0()));
    }

    #[tokio::test]
    async fn test_disabled_subscription_is_never_dispatched() {
        let handler = MockSubscriptionHandler::new("logfile").into_arc();
        let subscription_repo = Arc::new(MockSubscriptionRepository::with_subscriptions(vec![
            SubscriptionBuilder::new()
                .with_id(1)
                .with_recipient("alice")
                .created_at(t0())
                .disabled()
                .build(),
        ]));
        let notification_repo = Arc::new(MockNotificationRepository::with_notifications(vec![
            notification_at(1, "alice", t0() + Duration::minutes(1)),
        ]));
        let processor =
            create_processor(vec![handler.as_handler()], &subscription_repo, &notification_repo);

        let summary = processor.tick_at(t0() + Duration::minutes(5)).await;

        assert_eq!(summary.recipients, 0);
        assert_eq!(handler.delivery_count(), 0);
        assert!(subscription_repo.saved_batches().is_empty());
    }

    #[tokio::test]
    async fn test_non_endorsed_handler_is_never_dispatched() {
        let email = MockSubscriptionHandler::new("email")
            .rejecting_configuration()
            .into_arc();
        let logfile = MockSubscriptionHandler::new("logfile").into_arc();
        let subscription_repo = Arc::new(MockSubscriptionRepository::with_subscriptions(vec![
            SubscriptionBuilder::new()
                .with_id(1)
                .with_handler("email")
                .with_recipient("alice")
                .created_at(t0())
                .build(),
            SubscriptionBuilder::new()
                .with_id(2)
                .with_handler("sms")
                .with_recipient("alice")
                .created_at(t0())
                .build(),
            SubscriptionBuilder::new()
                .with_id(3)
                .with_handler("logfile")
                .with_recipient("alice")
                .created_at(t0())
                .build(),
        ]));
        let notification_repo = Arc::new(MockNotificationRepository::with_notifications(vec![
            notification_at(1, "alice", t0() + Duration::minutes(1)),
        ]));
        let processor = create_processor(
            vec![email.as_handler(), logfile.as_handler()],
            &subscription_repo,
            &notification_repo,
        );

        let tick = t0() + Duration::minutes(5);
        let summary = processor.tick_at(tick).await;

        assert_eq!(summary.dispatched, 1);
        assert_eq!(email.delivery_count(), 0);
        assert_eq!(logfile.delivery_count(), 1);
        assert_eq!(subscription_repo.get(1).unwrap().fired_last, Some(t0()));
        assert_eq!(subscription_repo.get(2).unwrap().fired_last, Some(t0()));
        assert_eq!(subscription_repo.get(3).unwrap().fired_last, Some(tick));
        assert_eq!(subscription_repo.saved_batches(), vec![vec![3]]);
    }

    #[tokio::test]
    async fn test_subscriptions_of_one_recipient_are_dispatched_independently() {
        let email = MockSubscriptionHandler::new("email").into_arc();
        let logfile = MockSubscriptionHandler::new("logfile")
            .with_outcome(MockDeliveryOutcome::Failure)
            .into_arc();
        let subscription_repo = Arc::new(MockSubscriptionRepository::with_subscriptions(vec![
            SubscriptionBuilder::new()
                .with_id(1)
                .with_handler("email")
                .with_recipient("alice")
                .created_at(t0())
                .build(),
            SubscriptionBuilder::new()
                .with_id(2)
                .with_handler("logfile")
                .with_recipient("bob")
                .created_at(t0())
                .build(),
            SubscriptionBuilder::new()
                .with_id(3)
                .with_handler("logfile")
                .with_recipient("alice")
                .created_at(t0())
                .build(),
        ]));
        let notification_repo = Arc::new(MockNotificationRepository::with_notifications(vec![
            notification_at(1, "alice", t0() + Duration::minutes(1)),
            notification_at(2, "bob", t0() + Duration::minutes(1)),
        ]));
        let processor = create_processor(
            vec![email.as_handler(), logfile.as_handler()],
            &subscription_repo,
            &notification_repo,
        );

        let tick = t0() + Duration::minutes(5);
        let summary = processor.tick_at(tick).await;

        assert_eq!(summary.recipients, 2);
        assert_eq!(summary.dispatched, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(subscription_repo.get(1).unwrap().fired_last, Some(tick));
        assert_eq!(subscription_repo.get(3).unwrap().fired_last, Some(t0()));
        // 每个接收者处理完后保存一次
        assert_eq!(subscription_repo.saved_batches(), vec![vec![1, 3], vec![2]]);
    }

    #[tokio::test]
    async fn test_notification_lookup_error_is_isolated() {
        let handler = MockSubscriptionHandler::new("logfile").into_arc();
        let subscription_repo = Arc::new(MockSubscriptionRepository::with_subscriptions(vec![
            SubscriptionBuilder::new()
                .with_id(1)
                .with_recipient("bob")
                .created_at(t0())
                .build(),
            SubscriptionBuilder::new()
                .with_id(2)
                .with_recipient("carol")
                .created_at(t0())
                .build(),
        ]));
        let notification_repo = Arc::new(MockNotificationRepository::with_notifications(vec![
            notification_at(1, "bob", t0() + Duration::minutes(1)),
            notification_at(2, "carol", t0() + Duration::minutes(1)),
        ]));
        notification_repo.fail_for_recipient("bob");
        let processor =
            create_processor(vec![handler.as_handler()], &subscription_repo, &notification_repo);

        let summary = processor.tick_at(t0() + Duration::minutes(5)).await;

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.dispatched, 1);
        assert_eq!(handler.deliveries()[0].recipient_id(), Some("carol"));
    }

    #[tokio::test]
    async fn test_find_due_error_ends_tick_quietly() {
        let handler = MockSubscriptionHandler::new("logfile").into_arc();
        let subscription_repo = Arc::new(MockSubscriptionRepository::new());
        subscription_repo.set_fail_find_due(true);
        let notification_repo = Arc::new(MockNotificationRepository::new());
        let processor =
            create_processor(vec![handler.as_handler()], &subscription_repo, &notification_repo);

        let summary = processor.tick_at(t0()).await;

        assert_eq!(summary, TickSummary::default());
        assert_eq!(subscription_repo.find_due_calls(), 1);
    }

    #[tokio::test]
    async fn test_save_failure_does_not_stop_tick() {
        let handler = MockSubscriptionHandler::new("logfile").into_arc();
        let subscription_repo = Arc::new(MockSubscriptionRepository::with_subscriptions(vec![
            SubscriptionBuilder::new()
                .with_id(1)
                .with_recipient("bob")
                .created_at(t0())
                .build(),
            SubscriptionBuilder::new()
                .with_id(2)
                .with_recipient("carol")
                .created_at(t0())
                .build(),
        ]));
        subscription_repo.set_fail_save_all(true);
        let notification_repo = Arc::new(MockNotificationRepository::with_notifications(vec![
            notification_at(1, "bob", t0() + Duration::minutes(1)),
            notification_at(2, "carol", t0() + Duration::minutes(1)),
        ]));
        let processor =
            create_processor(vec![handler.as_handler()], &subscription_repo, &notification_repo);

        let summary = processor.tick_at(t0() + Duration::minutes(5)).await;

        assert_eq!(summary.recipients, 2);
        assert_eq!(summary.dispatched, 2);
        assert_eq!(handler.delivery_count(), 2);
        assert_eq!(subscription_repo.get(1).unwrap().fired_last, Some(t0()));
    }

    #[tokio::test]
    async fn test_consecutive_windows_do_not_overlap() {
        let handler = MockSubscriptionHandler::new("logfile").into_arc();
        let subscription_repo = Arc::new(MockSubscriptionRepository::with_subscriptions(vec![
            SubscriptionBuilder::new()
                .with_id(1)
                .with_recipient("alice")
                .with_frequency(Frequency::Live)
                .created_at(t0())
                .build(),
        ]));
        let first_tick = t0() + Duration::minutes(1);
        let notification_repo = Arc::new(MockNotificationRepository::with_notifications(vec![
            notification_at(1, "alice", t0() + Duration::seconds(30)),
            notification_at(2, "alice", first_tick),
        ]));
        let processor =
            create_processor(vec![handler.as_handler()], &subscription_repo, &notification_repo);

        processor.tick_at(first_tick).await;
        notification_repo.insert(notification_at(3, "alice", first_tick + Duration::seconds(1)));
        processor.tick_at(first_tick + Duration::minutes(1)).await;
        let third = processor.tick_at(first_tick + Duration::minutes(2)).await;

        let deliveries = handler.deliveries();
        assert_eq!(deliveries.len(), 2);
        assert_eq!(deliveries[0].notification_ids(), vec![1]);
        assert_eq!(deliveries[1].notification_ids(), vec![2, 3]);
        assert_eq!(third.skipped_empty, 1);
    }

    #[tokio::test]
    async fn test_notification_created_at_tick_time_is_delivered_next_tick() {
        let handler = MockSubscriptionHandler::new("logfile").into_arc();
        let subscription_repo = Arc::new(MockSubscriptionRepository::with_subscriptions(vec![
            SubscriptionBuilder::new()
                .with_id(1)
                .with_recipient("alice")
                .with_frequency(Frequency::Hourly)
                .created_at(t0())
                .build(),
        ]));
        // 与订阅同一时刻创建的通知属于第一个窗口
        let notification_repo = Arc::new(MockNotificationRepository::with_notifications(vec![
            notification_at(1, "alice", t0()),
        ]));
        let processor =
            create_processor(vec![handler.as_handler()], &subscription_repo, &notification_repo);

        let tick = t0() + Duration::minutes(5);
        assert_eq!(processor.tick_at(tick).await.dispatched, 1);

        // 窗口查询结束后才写入、创建时间与调度时刻相同的通知
        notification_repo.insert(notification_at(2, "alice", tick));

        let next = processor.tick_at(tick + Duration::hours(1)).await;

        assert_eq!(next.dispatched, 1);
        let deliveries = handler.deliveries();
        assert_eq!(deliveries.len(), 2);
        assert_eq!(deliveries[0].notification_ids(), vec![1]);
        assert_eq!(deliveries[1].notification_ids(), vec![2]);
    }

    #[tokio::test]
    async fn test_overlapping_tick_is_skipped() {
        let handler = MockSubscriptionHandler::new("logfile")
            .with_outcome(MockDeliveryOutcome::Hang(StdDuration::from_millis(100)))
            .into_arc();
        let subscription_repo = Arc::new(MockSubscriptionRepository::with_subscriptions(vec![
            SubscriptionBuilder::new()
                .with_id(1)
                .with_recipient("alice")
                .created_at(t0())
                .build(),
        ]));
        let notification_repo = Arc::new(MockNotificationRepository::with_notifications(vec![
            notification_at(1, "alice", t0() + Duration::minutes(1)),
        ]));
        let processor =
            create_processor(vec![handler.as_handler()], &subscription_repo, &notification_repo);

        let tick = t0() + Duration::minutes(5);
        let (first, second) = tokio::join!(processor.tick_at(tick), processor.tick_at(tick));

        assert!(!first.overlapped);
        assert_eq!(first.dispatched, 1);
        assert!(second.overlapped);
        assert_eq!(second.dispatched, 0);
        assert_eq!(handler.delivery_count(), 1);
    }

    #[tokio::test]
    async fn test_no_endorsed_handlers_skips_query() {
        let rejected = MockSubscriptionHandler::new("email")
            .rejecting_configuration()
            .into_arc();
        let subscription_repo = Arc::new(MockSubscriptionRepository::new());
        let notification_repo = Arc::new(MockNotificationRepository::new());
        let processor =
            create_processor(vec![rejected.as_handler()], &subscription_repo, &notification_repo);

        processor.tick_at(t0()).await;
        processor.tick_at(t0() + Duration::minutes(1)).await;

        assert_eq!(subscription_repo.find_due_calls(), 0);
        assert_eq!(rejected.configure_calls(), 1);

        let absent = SubscriptionProcessor::new(
            Arc::new(HandlerRegistry::absent()),
            subscription_repo.clone(),
            notification_repo,
            create_test_metrics(),
            StdDuration::from_secs(5),
        );
        assert_eq!(absent.tick_at(t0()).await, TickSummary::default());
        assert_eq!(subscription_repo.find_due_calls(), 0);
    }

    #[tokio::test]
    async fn test_endorsement_happens_on_first_tick() {
        let handler = MockSubscriptionHandler::new("logfile").into_arc();
        let subscription_repo = Arc::new(MockSubscriptionRepository::new());
        let notification_repo = Arc::new(MockNotificationRepository::new());
        let processor =
            create_processor(vec![handler.as_handler()], &subscription_repo, &notification_repo);

        assert_eq!(handler.configure_calls(), 0);
        processor.tick_at(t0()).await;
        processor.tick_at(t0() + Duration::minutes(1)).await;
        assert_eq!(handler.configure_calls(), 1);
        assert_eq!(subscription_repo.find_due_calls(), 2);
    }

    #[tokio::test]
    async fn test_dispatch_rechecks_fires_next() {
        let handler = MockSubscriptionHandler::new("logfile").into_arc();
        let subscription_repo = Arc::new(MockSubscriptionRepository::new());
        let notification_repo = Arc::new(MockNotificationRepository::with_notifications(vec![
            notification_at(1, "alice", t0() + Duration::minutes(1)),
        ]));
        let processor =
            create_processor(vec![handler.as_handler()], &subscription_repo, &notification_repo);
        let endorsed = processor.registry().endorse().await;

        let mut subscription = SubscriptionBuilder::new()
            .with_recipient("alice")
            .created_at(t0())
            .fires_next(Some(t0() + Duration::hours(1)))
            .build();
        let outcome = processor
            .dispatch(endorsed, &mut subscription, t0() + Duration::minutes(5))
            .await;

        assert_eq!(outcome, DispatchOutcome::SkippedNotDue);
        assert_eq!(notification_repo.window_query_count(), 0);
        assert_eq!(handler.delivery_count(), 0);
    }
}

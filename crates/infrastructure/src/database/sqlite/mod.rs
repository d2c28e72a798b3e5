pub mod sqlite_notification_repository;
pub mod sqlite_subscription_repository;

pub use sqlite_notification_repository::SqliteNotificationRepository;
pub use sqlite_subscription_repository::SqliteSubscriptionRepository;

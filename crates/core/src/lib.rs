pub mod config;
pub mod errors;
pub mod models;
pub mod traits;

pub use config::AppConfig;
pub use errors::*;
pub use models::{
    Frequency, HandlerDescriptor, HandlerProperties, NewSubscription, Notification,
    NotificationFilter, SenderType, Severity, Subscription, SubscriptionFilter, SubscriptionPatch,
    SubscriptionProperties,
};
pub use traits::{NotificationRepository, SubscriptionHandler, SubscriptionRepository};

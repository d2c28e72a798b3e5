pub mod handler;
pub mod notification;
pub mod subscription;

pub use handler::{HandlerDescriptor, HandlerProperties};
pub use notification::{Notification, NotificationFilter, SenderType, Severity};
pub use subscription::{
    Frequency, NewSubscription, Subscription, SubscriptionFilter, SubscriptionPatch,
    SubscriptionProperties,
};

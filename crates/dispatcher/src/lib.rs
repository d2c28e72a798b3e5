//! 订阅调度引擎
//!
//! 周期性地找出到期的订阅，按接收者分组，收集每个订阅时间窗口内的通知，
//! 交给匹配的处理器投递，并在投递成功后推进订阅的调度时间。
//!
//! - [`registry`]: 处理器注册与一次性认可
//! - [`selector`]: 到期订阅查询与按接收者分组
//! - [`accumulator`]: 时间窗口内的通知收集
//! - [`reschedule`]: 按频率计算下一次投递时间
//! - [`processor`]: 单次调度周期
//! - [`runner`]: 固定间隔的调度循环
//! - [`controller`]: 订阅与通知的管理操作

pub mod accumulator;
pub mod controller;
pub mod processor;
pub mod registry;
pub mod reschedule;
pub mod runner;
pub mod selector;

pub use accumulator::NotificationAccumulator;
pub use controller::{NotificationController, SubscriptionController};
pub use processor::{DispatchOutcome, FailureReason, SubscriptionProcessor, TickSummary};
pub use registry::{EndorsedHandlers, HandlerRegistry};
pub use runner::run_dispatch_loop;
pub use selector::{DueSubscriptionSelector, RecipientBatch};

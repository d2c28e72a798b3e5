//! 通知服务配置
//!
//! 配置按以下顺序加载，后者覆盖前者：
//!
//! 1. 内置默认值
//! 2. TOML配置文件（显式路径，或依次查找 `config/notifier.toml`、`notifier.toml`、
//!    `/etc/notifier/config.toml`）
//! 3. 前缀为 `NOTIFIER_` 的环境变量，层级之间用 `__` 分隔，
//!    例如 `NOTIFIER_DISPATCHER__SCHEDULE_INTERVAL_SECONDS=30`

pub mod models;

pub use models::*;

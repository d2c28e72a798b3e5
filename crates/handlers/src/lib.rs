//! 订阅投递处理器
//!
//! - `email`: 通过SMTP发送汇总邮件
//! - `logfile`: 追加写入本地文件

pub mod email;
pub mod factory;
pub mod log_file;

pub use email::{EmailHandler, MailSender, SmtpMailSender};
pub use factory::HandlerFactory;
pub use log_file::LogFileHandler;

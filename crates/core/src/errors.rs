use thiserror::Error;

/// 通知服务错误类型定义
#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("数据库操作错误: {0}")]
    DatabaseOperation(String),

    #[error("通知未找到: {id}")]
    NotificationNotFound { id: i64 },

    #[error("订阅未找到: {id}")]
    SubscriptionNotFound { id: i64 },

    #[error("无效的订阅处理器: {name}")]
    UnknownHandler { name: String },

    #[error("订阅属性缺失或无效: {0}")]
    InvalidSubscriptionProperties(String),

    #[error("无效的枚举值: {kind} = {value}")]
    InvalidEnumValue { kind: &'static str, value: String },

    #[error("数据验证失败: {0}")]
    Validation(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("通知投递失败: {0}")]
    Delivery(String),

    #[error("通知投递超时: {seconds}秒")]
    DeliveryTimeout { seconds: u64 },

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for NotifierError {
    fn from(err: serde_json::Error) -> Self {
        NotifierError::Serialization(err.to_string())
    }
}

impl NotifierError {
    pub fn validation(message: impl Into<String>) -> Self {
        NotifierError::Validation(message.into())
    }

    pub fn delivery(message: impl Into<String>) -> Self {
        NotifierError::Delivery(message.into())
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        NotifierError::Configuration(message.into())
    }
}

/// 统一的Result类型
pub type NotifierResult<T> = std::result::Result<T, NotifierError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            NotifierError::delivery("smtp down").to_string(),
            "通知投递失败: smtp down"
        );
        assert_eq!(
            NotifierError::DeliveryTimeout { seconds: 30 }.to_string(),
            "通知投递超时: 30秒"
        );
        assert_eq!(
            NotifierError::UnknownHandler {
                name: "sms".to_string()
            }
            .to_string(),
            "无效的订阅处理器: sms"
        );
    }

    #[test]
    fn test_json_error_conversion() {
        let err: NotifierError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, NotifierError::Serialization(_)));
    }
}

use serde::{Deserialize, Serialize};

/// 订阅分发配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    pub enabled: bool,
    /// 两次调度之间的间隔，也是LIVE订阅的最小延迟
    pub schedule_interval_seconds: u64,
    /// 单次投递的超时时间，超时按投递失败处理
    pub delivery_timeout_seconds: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            schedule_interval_seconds: 60,
            delivery_timeout_seconds: 30,
        }
    }
}

impl DispatcherConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.schedule_interval_seconds == 0 {
            return Err(anyhow::anyhow!("调度间隔必须大于0"));
        }

        if self.delivery_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("投递超时时间必须大于0"));
        }

        Ok(())
    }
}

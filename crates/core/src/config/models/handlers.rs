use serde::{Deserialize, Serialize};

/// 投递处理器配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandlersConfig {
    #[serde(default)]
    pub email: EmailHandlerConfig,
    #[serde(default)]
    pub logfile: LogFileHandlerConfig,
}

impl HandlersConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.email.validate()?;
        self.logfile.validate()?;
        Ok(())
    }
}

/// 邮件处理器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailHandlerConfig {
    pub enabled: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub from_address: String,
    pub subject: String,
    /// 使用STARTTLS升级连接，关闭时使用明文连接
    pub starttls: bool,
    /// 第一次调度时测试SMTP连接，失败则不启用邮件处理器
    pub verify_connection: bool,
}

impl Default for EmailHandlerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: "localhost".to_string(),
            smtp_port: 25,
            username: None,
            password: None,
            from_address: "notifier@localhost".to_string(),
            subject: "New Notifications from KITDM Instance".to_string(),
            starttls: false,
            verify_connection: true,
        }
    }
}

impl EmailHandlerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if self.smtp_host.is_empty() {
            return Err(anyhow::anyhow!("SMTP主机不能为空"));
        }

        if self.smtp_port == 0 {
            return Err(anyhow::anyhow!("SMTP端口必须大于0"));
        }

        if !self.from_address.contains('@') {
            return Err(anyhow::anyhow!("发件人地址格式无效: {}", self.from_address));
        }

        if self.username.is_some() != self.password.is_some() {
            return Err(anyhow::anyhow!("SMTP用户名和密码必须同时配置"));
        }

        Ok(())
    }
}

/// 日志文件处理器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogFileHandlerConfig {
    pub enabled: bool,
    /// 相对路径的 `filename` 属性基于此目录解析；设置后不允许写到目录之外
    #[serde(default)]
    pub base_directory: Option<String>,
}

impl Default for LogFileHandlerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_directory: None,
        }
    }
}

impl LogFileHandlerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(dir) = &self.base_directory {
            if dir.trim().is_empty() {
                return Err(anyhow::anyhow!("日志文件目录不能为空字符串"));
            }
        }
        Ok(())
    }
}

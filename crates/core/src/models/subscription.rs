use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::{NotifierError, NotifierResult};

/// 订阅
///
/// 接收者对某个投递处理器的常驻订阅。调度引擎只会修改其中的
/// `fired_last` 和 `fires_next` 两个调度字段。
///
/// # 字段说明
///
/// - `subscription_name`: 处理器名称，例如 "email"、"logfile"
/// - `recipient_id`: 接收者标识，与通知的接收者对应
/// - `properties`: 处理器所需的属性，由对应处理器解释
/// - `frequency`: 投递频率（LIVE/HOURLY/DAILY）
/// - `fired_last`: 最近一次成功投递的时间，`None` 表示从未投递
/// - `fires_next`: 下次允许投递的时间，`None` 表示立即可投递
/// - `disabled`: 禁用标记
/// - `created_at`: 创建时间
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: i64,
    pub subscription_name: String,
    pub recipient_id: String,
    #[serde(default)]
    pub properties: SubscriptionProperties,
    pub frequency: Frequency,
    pub fired_last: Option<DateTime<Utc>>,
    pub fires_next: Option<DateTime<Utc>>,
    #[serde(default)]
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// 创建新订阅
    ///
    /// `fired_last` 和 `fires_next` 都初始化为创建时间，
    /// 这样第一次调度不会把历史通知全部投递出去。
    pub fn new(
        subscription_name: impl Into<String>,
        recipient_id: impl Into<String>,
        properties: SubscriptionProperties,
        frequency: Frequency,
    ) -> Self {
        Self::created_at(
            subscription_name,
            recipient_id,
            properties,
            frequency,
            Utc::now(),
        )
    }

    /// 以指定的创建时间构造订阅
    pub fn created_at(
        subscription_name: impl Into<String>,
        recipient_id: impl Into<String>,
        properties: SubscriptionProperties,
        frequency: Frequency,
        created_at: DateTime<Utc>,
    ) -> Self {
        let created_at = created_at.trunc_subsecs(3);
        Self {
            id: 0, // 将由存储层生成
            subscription_name: subscription_name.into(),
            recipient_id: recipient_id.into(),
            properties,
            frequency,
            fired_last: Some(created_at),
            fires_next: Some(created_at),
            disabled: false,
            created_at,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// `fires_next` 为空或不晚于 `now` 即为到期
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.fires_next {
            Some(fires_next) => fires_next <= now,
            None => true,
        }
    }

    /// 通知时间窗口的下界；从未投递过时退回到创建时间
    pub fn window_start(&self) -> DateTime<Utc> {
        self.fired_last.unwrap_or(self.created_at)
    }
}

/// 投递频率
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Frequency {
    #[serde(rename = "LIVE")]
    Live,
    #[serde(rename = "HOURLY")]
    #[default]
    Hourly,
    #[serde(rename = "DAILY")]
    Daily,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Live => "LIVE",
            Frequency::Hourly => "HOURLY",
            Frequency::Daily => "DAILY",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = NotifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LIVE" => Ok(Frequency::Live),
            "HOURLY" => Ok(Frequency::Hourly),
            "DAILY" => Ok(Frequency::Daily),
            _ => Err(NotifierError::InvalidEnumValue {
                kind: "frequency",
                value: s.to_string(),
            }),
        }
    }
}

impl sqlx::Type<sqlx::Sqlite> for Frequency {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <str as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for Frequency {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(s.parse::<Frequency>()?)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for Frequency {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Sqlite>>::encode(self.as_str(), buf)
    }
}

/// 订阅属性
///
/// 字符串键值映射，由订阅持有、由匹配的处理器解释。
/// 只在存储边界通过 [`to_json`](Self::to_json) / [`from_json`](Self::from_json)
/// 与JSON对象字符串互相转换。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct SubscriptionProperties(BTreeMap<String, String>);

impl SubscriptionProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// 检查是否包含所有给定的键，返回缺失的第一个键
    pub fn require(&self, keys: &[&str]) -> NotifierResult<()> {
        match keys.iter().find(|key| !self.contains_key(key)) {
            Some(missing) => Err(NotifierError::InvalidSubscriptionProperties(format!(
                "缺少属性: {missing}"
            ))),
            None => Ok(()),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> NotifierResult<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    /// 空字符串视为空映射
    pub fn from_json(raw: &str) -> NotifierResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let map: BTreeMap<String, String> = serde_json::from_str(raw).map_err(|e| {
            NotifierError::InvalidSubscriptionProperties(format!("解析订阅属性失败: {e}"))
        })?;
        Ok(Self(map))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SubscriptionProperties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// 订阅过滤器
#[derive(Debug, Clone, Default)]
pub struct SubscriptionFilter {
    pub recipient_id: Option<String>,
    pub subscription_name: Option<String>,
    pub disabled: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl SubscriptionFilter {
    pub fn matches(&self, subscription: &Subscription) -> bool {
        if let Some(recipient_id) = &self.recipient_id {
            if &subscription.recipient_id != recipient_id {
                return false;
            }
        }
        if let Some(name) = &self.subscription_name {
            if &subscription.subscription_name != name {
                return false;
            }
        }
        if let Some(disabled) = self.disabled {
            if subscription.disabled != disabled {
                return false;
            }
        }
        true
    }
}

/// 创建订阅的请求
///
/// 未指定的频率默认为 HOURLY，未指定的禁用标记默认为 false。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubscription {
    pub subscription_name: String,
    pub recipient_id: String,
    #[serde(default)]
    pub properties: SubscriptionProperties,
    pub frequency: Option<Frequency>,
    pub disabled: Option<bool>,
}

impl NewSubscription {
    pub fn new(subscription_name: impl Into<String>, recipient_id: impl Into<String>) -> Self {
        Self {
            subscription_name: subscription_name.into(),
            recipient_id: recipient_id.into(),
            ..Default::default()
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key, value);
        self
    }

    pub fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = Some(frequency);
        self
    }

    /// 以 `now` 作为创建时间生成订阅
    pub fn into_subscription(self, now: DateTime<Utc>) -> Subscription {
        let mut subscription = Subscription::created_at(
            self.subscription_name,
            self.recipient_id,
            self.properties,
            self.frequency.unwrap_or_default(),
            now,
        );
        subscription.disabled = self.disabled.unwrap_or(false);
        subscription
    }
}

/// 订阅的部分更新，`None` 字段保持原值
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPatch {
    pub subscription_name: Option<String>,
    pub recipient_id: Option<String>,
    pub properties: Option<SubscriptionProperties>,
    pub frequency: Option<Frequency>,
    pub disabled: Option<bool>,
}

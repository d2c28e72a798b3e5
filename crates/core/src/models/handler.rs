use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 处理器属性声明
///
/// 描述某个投递处理器需要订阅提供哪些属性，键为属性名，值为面向用户的说明。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HandlerProperties {
    pub handler_name: String,
    pub properties: BTreeMap<String, String>,
}

impl HandlerProperties {
    pub fn create(handler_name: impl Into<String>) -> Self {
        Self {
            handler_name: handler_name.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn add_property(mut self, key: impl Into<String>, description: impl Into<String>) -> Self {
        self.properties.insert(key.into(), description.into());
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn description(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// 处理器描述，供订阅管理接口展示
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HandlerDescriptor {
    pub name: String,
    pub properties: HandlerProperties,
}

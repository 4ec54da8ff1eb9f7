//! 字段服务配置
//!
//! 每个规则上下文（实体键）暴露一组可用字段，由管理端元数据系统提供。
//! 引擎通过 `FieldServiceResolver` 按规则标识符取得配置，编码器和解析
//! 器用它校验字段引用的合法性。

use crate::error::{Result, RuleError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 单个可用字段
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub label: String,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
        }
    }
}

/// 一个规则上下文的字段服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldServiceConfig {
    /// 表达式文本中字段引用的命名空间前缀
    pub entity_key: String,
    pub fields: Vec<FieldDefinition>,
}

impl FieldServiceConfig {
    pub fn new(entity_key: impl Into<String>) -> Self {
        Self {
            entity_key: entity_key.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, label: impl Into<String>) -> Self {
        self.fields.push(FieldDefinition::new(name, label));
        self
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }
}

/// 字段服务解析能力：按规则标识符实例化配置
#[cfg_attr(test, mockall::automock)]
pub trait FieldServiceResolver {
    fn create_instance(&self, identifier: &str) -> Result<FieldServiceConfig>;
}

/// 静态注册的字段服务解析器
///
/// 宿主在启动时注册所有规则标识符对应的配置；测试也用它。
#[derive(Debug, Clone, Default)]
pub struct StaticFieldServiceResolver {
    services: HashMap<String, FieldServiceConfig>,
}

impl StaticFieldServiceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        mut self,
        identifier: impl Into<String>,
        config: FieldServiceConfig,
    ) -> Self {
        self.services.insert(identifier.into(), config);
        self
    }
}

impl FieldServiceResolver for StaticFieldServiceResolver {
    fn create_instance(&self, identifier: &str) -> Result<FieldServiceConfig> {
        self.services
            .get(identifier)
            .cloned()
            .ok_or_else(|| RuleError::UnknownFieldService(identifier.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_resolver() {
        let resolver = StaticFieldServiceResolver::new().register(
            "ORDER",
            FieldServiceConfig::new("order")
                .with_field("amount", "订单金额")
                .with_field("category", "订单类目"),
        );

        let config = resolver.create_instance("ORDER").unwrap();
        assert_eq!(config.entity_key, "order");
        assert!(config.has_field("amount"));
        assert!(!config.has_field("nonexistent"));
    }

    #[test]
    fn test_unknown_identifier() {
        let resolver = StaticFieldServiceResolver::new();
        let result = resolver.create_instance("MISSING");
        assert!(matches!(result, Err(RuleError::UnknownFieldService(id)) if id == "MISSING"));
    }
}

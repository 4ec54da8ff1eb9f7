//! 快照序列化
//!
//! 传输信封与内部条目之间的薄结构映射。入方向把前端提交的 JSON 文本
//! 解析成 `DataWrapper`；出方向把实体属性包（表达式 + 数量/id 辅助
//! 字段）组装成供 UI 回显的快照。

use crate::error::{Result, RuleError};
use crate::field_service::FieldServiceConfig;
use crate::models::{DataWrapper, RuleEntry};
use crate::parser::ExpressionParser;
use serde_json::{Map, Value};

/// 属性包中三个辅助字段的键名
///
/// 表达式字段必有；数量与 id 字段只有数量规则才携带。
#[derive(Debug, Clone, Copy)]
pub struct FieldAliases<'a> {
    pub match_rule: &'a str,
    pub quantity: Option<&'a str>,
    pub id: Option<&'a str>,
}

impl FieldAliases<'_> {
    /// 简单规则: 只有表达式字段
    pub fn match_rule_only() -> Self {
        Self {
            match_rule: "matchRule",
            quantity: None,
            id: None,
        }
    }
}

impl Default for FieldAliases<'static> {
    fn default() -> Self {
        Self {
            match_rule: "matchRule",
            quantity: Some("quantity"),
            id: Some("id"),
        }
    }
}

/// 快照序列化器
#[derive(Debug, Clone, Default)]
pub struct SnapshotSerializer;

impl SnapshotSerializer {
    /// 解析前端提交的快照 JSON
    ///
    /// `None`、空文本和字面 `"[]"` 都表示"未配置规则"，返回 `Ok(None)`；
    /// 其余内容必须是合法的信封 JSON。
    pub fn parse(json: Option<&str>) -> Result<Option<DataWrapper>> {
        let Some(json) = json else {
            return Ok(None);
        };
        let json = json.trim();
        if json.is_empty() || json == "[]" {
            return Ok(None);
        }

        let wrapper: DataWrapper = serde_json::from_str(json)?;
        Ok(Some(wrapper))
    }

    /// 序列化快照为 JSON 文本
    pub fn to_json(wrapper: &DataWrapper) -> Result<String> {
        Ok(serde_json::to_string(wrapper)?)
    }

    /// 从实体属性包组装回显快照
    ///
    /// 每个属性包按 `aliases` 取出表达式文本和数量/id 辅助字段；
    /// 表达式为空的属性包不产生条目。
    pub fn from_entities(
        bags: &[Map<String, Value>],
        aliases: &FieldAliases<'_>,
        parser: &ExpressionParser,
        service: &FieldServiceConfig,
    ) -> Result<DataWrapper> {
        let mut data = Vec::with_capacity(bags.len());

        for bag in bags {
            let text = bag
                .get(aliases.match_rule)
                .and_then(Value::as_str)
                .unwrap_or("");
            let Some(rule) = parser.parse(text, service)? else {
                continue;
            };

            let quantity = aliases
                .quantity
                .and_then(|key| bag.get(key))
                .and_then(as_i64);
            let id = aliases.id.and_then(|key| bag.get(key)).and_then(as_i64);

            data.push(RuleEntry { id, quantity, rule });
        }

        Ok(DataWrapper::new(data))
    }
}

/// 属性包里的数字可能是数字也可能是字符串
fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

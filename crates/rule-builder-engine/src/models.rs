//! 规则构建器传输模型
//!
//! UI 规则构建器与后端之间交换的快照结构：`DataWrapper` 是传输信封，
//! 按展示顺序携带若干 `RuleEntry`；每个条目持有一棵条件树，数量规则
//! 条目额外携带 `quantity` 与持久化 `id`。

use crate::operators::{LogicalOperator, Operator};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 快照条目：一条规则及其数量规则附加字段
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEntry {
    /// 持久化实体 id，仅已落库的数量规则条目携带。
    /// 前端可能以字符串形式回传数字 id，两种形式都接受。
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "id_from_number_or_string"
    )]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    pub rule: RuleNode,
}

impl RuleEntry {
    pub fn new(rule: RuleNode) -> Self {
        Self {
            id: None,
            quantity: None,
            rule,
        }
    }

    pub fn with_quantity(rule: RuleNode, quantity: i64, id: Option<i64>) -> Self {
        Self {
            id,
            quantity: Some(quantity),
            rule,
        }
    }
}

/// 规则节点（条件或逻辑组）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleNode {
    Condition(Condition),
    Group(LogicalGroup),
}

/// 条件节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}

/// 逻辑组节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalGroup {
    pub operator: LogicalOperator,
    pub children: Vec<RuleNode>,
}

impl LogicalGroup {
    pub fn new(operator: LogicalOperator, children: Vec<RuleNode>) -> Self {
        Self { operator, children }
    }

    pub fn and(children: Vec<RuleNode>) -> Self {
        Self::new(LogicalOperator::And, children)
    }

    pub fn or(children: Vec<RuleNode>) -> Self {
        Self::new(LogicalOperator::Or, children)
    }
}

/// 快照信封
///
/// `data` 为空等价于"未配置规则"，协调器对其不做任何变更。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataWrapper {
    pub data: Vec<RuleEntry>,
}

impl DataWrapper {
    pub fn new(data: Vec<RuleEntry>) -> Self {
        Self { data }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}

fn id_from_number_or_string<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("id 不是整数: {}", n))),
        Some(Value::String(s)) => s
            .parse::<i64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("id 不是整数: {:?}", s))),
        Some(other) => Err(de::Error::custom(format!("id 类型不合法: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wrapper_serialization() {
        let wrapper = DataWrapper::new(vec![RuleEntry::with_quantity(
            RuleNode::Group(LogicalGroup::and(vec![
                RuleNode::Condition(Condition::new("sku", Operator::Eq, "TICKET-001")),
                RuleNode::Condition(Condition::new("price", Operator::Gte, 500)),
            ])),
            2,
            Some(7),
        )]);

        let json = serde_json::to_string(&wrapper).unwrap();
        let parsed: DataWrapper = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.data[0].id, Some(7));
        assert_eq!(parsed.data[0].quantity, Some(2));
    }

    #[test]
    fn test_wrapper_deserialization() {
        let json = r#"
        {
            "data": [
                {
                    "id": 3,
                    "quantity": 1,
                    "rule": {
                        "type": "group",
                        "operator": "AND",
                        "children": [
                            {
                                "type": "condition",
                                "field": "category",
                                "operator": "in",
                                "value": ["park_visit", "dining"]
                            }
                        ]
                    }
                },
                {
                    "rule": {
                        "type": "condition",
                        "field": "amount",
                        "operator": "gte",
                        "value": 500
                    }
                }
            ]
        }
        "#;

        let wrapper: DataWrapper = serde_json::from_str(json).unwrap();
        assert_eq!(wrapper.len(), 2);
        assert_eq!(wrapper.data[0].id, Some(3));
        assert_eq!(wrapper.data[1].id, None);
        assert_eq!(wrapper.data[1].quantity, None);

        match &wrapper.data[1].rule {
            RuleNode::Condition(cond) => {
                assert_eq!(cond.field, "amount");
                assert_eq!(cond.operator, Operator::Gte);
                assert_eq!(cond.value, json!(500));
            }
            _ => panic!("应解析为条件节点"),
        }
    }

    #[test]
    fn test_id_from_string() {
        let json = r#"{"id": "42", "rule": {"type": "condition", "field": "a", "operator": "eq", "value": 1}}"#;
        let entry: RuleEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.id, Some(42));
    }

    #[test]
    fn test_id_rejects_garbage() {
        let json = r#"{"id": "abc", "rule": {"type": "condition", "field": "a", "operator": "eq", "value": 1}}"#;
        assert!(serde_json::from_str::<RuleEntry>(json).is_err());

        let json = r#"{"id": [1], "rule": {"type": "condition", "field": "a", "operator": "eq", "value": 1}}"#;
        assert!(serde_json::from_str::<RuleEntry>(json).is_err());
    }

    #[test]
    fn test_absent_id_is_not_serialized() {
        let entry = RuleEntry::new(RuleNode::Condition(Condition::new(
            "a",
            Operator::Eq,
            1,
        )));
        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("\"id\""));
        assert!(!json.contains("\"quantity\""));
    }
}

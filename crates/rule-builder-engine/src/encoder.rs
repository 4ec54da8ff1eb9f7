//! 正向编码器：规则树 → 匹配表达式文本
//!
//! 条件写作 `实体键.字段 操作符 操作数`，符号操作符紧贴操作数，关键字
//! 操作符前后留单个空格；同级子句用逻辑连接符串联，嵌套组加括号。
//! 输出是确定性的，协调器依赖这一点做"无变化不写入"判断。

use crate::error::{Result, RuleError};
use crate::field_service::FieldServiceConfig;
use crate::models::{Condition, LogicalGroup, RuleEntry, RuleNode};
use crate::operators::Operator;
use serde_json::Value;

/// 规则树编码器
#[derive(Debug, Clone, Default)]
pub struct ExpressionEncoder;

impl ExpressionEncoder {
    pub fn new() -> Self {
        Self
    }

    /// 编码一个快照条目携带的规则树
    ///
    /// `entity_key` 选择字段引用的命名空间；条目的 `id`/`quantity`
    /// 不参与编码，它们不属于表达式语法。
    pub fn encode(
        &self,
        entity_key: &str,
        entry: &RuleEntry,
        service: &FieldServiceConfig,
    ) -> Result<String> {
        self.encode_node(entity_key, &entry.rule, service)
    }

    /// 编码一棵规则树，顶层组不加括号
    pub fn encode_node(
        &self,
        entity_key: &str,
        node: &RuleNode,
        service: &FieldServiceConfig,
    ) -> Result<String> {
        match node {
            RuleNode::Condition(cond) => self.write_condition(entity_key, cond, service),
            RuleNode::Group(group) => self.write_group(entity_key, group, service),
        }
    }

    fn write_group(
        &self,
        entity_key: &str,
        group: &LogicalGroup,
        service: &FieldServiceConfig,
    ) -> Result<String> {
        if group.children.is_empty() {
            return Err(RuleError::Translation("逻辑组不能为空".to_string()));
        }

        let mut parts = Vec::with_capacity(group.children.len());
        for child in &group.children {
            let text = self.encode_node(entity_key, child, service)?;
            match child {
                // 嵌套组加括号，保住优先级
                RuleNode::Group(_) => parts.push(format!("({})", text)),
                RuleNode::Condition(_) => parts.push(text),
            }
        }

        Ok(parts.join(&format!(" {} ", group.operator.expression_token())))
    }

    fn write_condition(
        &self,
        entity_key: &str,
        cond: &Condition,
        service: &FieldServiceConfig,
    ) -> Result<String> {
        if cond.field.is_empty() {
            return Err(RuleError::Translation("条件字段不能为空".to_string()));
        }
        if !service.has_field(&cond.field) {
            return Err(RuleError::Translation(format!(
                "字段 '{}' 不在 '{}' 上下文的可用字段中",
                cond.field, service.entity_key
            )));
        }

        self.validate_operand(cond)?;

        let mut literal = String::new();
        Self::write_literal(&cond.value, &mut literal)?;

        let text = if cond.operator.is_keyword() {
            format!(
                "{}.{} {} {}",
                entity_key,
                cond.field,
                cond.operator.expression_token(),
                literal
            )
        } else {
            format!(
                "{}.{}{}{}",
                entity_key,
                cond.field,
                cond.operator.expression_token(),
                literal
            )
        };
        Ok(text)
    }

    /// 校验操作符和操作数形态的兼容性
    fn validate_operand(&self, cond: &Condition) -> Result<()> {
        match cond.operator {
            Operator::Between => {
                let ok = matches!(&cond.value, Value::Array(arr) if arr.len() == 2);
                if !ok {
                    return Err(RuleError::Translation(format!(
                        "字段 '{}' 的 between 操作符需要 [min, max] 数组",
                        cond.field
                    )));
                }
            }
            Operator::In | Operator::NotIn => {
                if !cond.value.is_array() {
                    return Err(RuleError::Translation(format!(
                        "字段 '{}' 的 {} 操作符需要数组操作数",
                        cond.field, cond.operator
                    )));
                }
            }
            Operator::Matches => {
                let pattern = cond.value.as_str().ok_or_else(|| {
                    RuleError::Translation(format!(
                        "字段 '{}' 的 matches 操作符需要字符串操作数",
                        cond.field
                    ))
                })?;
                // 预校验正则，坏模式在这里拦下而不是落库后才发现
                regex::Regex::new(pattern).map_err(|e| {
                    RuleError::Translation(format!(
                        "字段 '{}' 的正则表达式无效: {}",
                        cond.field, e
                    ))
                })?;
            }
            _ => {}
        }

        Ok(())
    }

    fn write_literal(value: &Value, out: &mut String) -> Result<()> {
        match value {
            Value::String(s) => {
                out.push('"');
                for c in s.chars() {
                    match c {
                        '"' => out.push_str("\\\""),
                        '\\' => out.push_str("\\\\"),
                        '\n' => out.push_str("\\n"),
                        '\t' => out.push_str("\\t"),
                        _ => out.push(c),
                    }
                }
                out.push('"');
            }
            Value::Number(n) => out.push_str(&n.to_string()),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    Self::write_literal(item, out)?;
                }
                out.push(']');
            }
            Value::Null | Value::Object(_) => {
                return Err(RuleError::Translation(format!(
                    "操作数类型无法写入表达式: {}",
                    value
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::Operator;
    use serde_json::json;

    fn order_service() -> FieldServiceConfig {
        FieldServiceConfig::new("order")
            .with_field("amount", "订单金额")
            .with_field("category", "订单类目")
            .with_field("sku", "商品编号")
    }

    fn encode(node: RuleNode) -> Result<String> {
        ExpressionEncoder::new().encode_node("order", &node, &order_service())
    }

    #[test]
    fn test_encode_symbol_condition() {
        let text = encode(RuleNode::Condition(Condition::new(
            "amount",
            Operator::Gte,
            500,
        )))
        .unwrap();
        assert_eq!(text, "order.amount>=500");
    }

    #[test]
    fn test_encode_keyword_condition() {
        let text = encode(RuleNode::Condition(Condition::new(
            "category",
            Operator::In,
            json!(["park_visit", "dining"]),
        )))
        .unwrap();
        assert_eq!(text, r#"order.category in ["park_visit", "dining"]"#);
    }

    #[test]
    fn test_encode_string_escaping() {
        let text = encode(RuleNode::Condition(Condition::new(
            "sku",
            Operator::Eq,
            "A\"B\\C",
        )))
        .unwrap();
        assert_eq!(text, r#"order.sku=="A\"B\\C""#);
    }

    #[test]
    fn test_encode_nested_group() {
        let node = RuleNode::Group(LogicalGroup::and(vec![
            RuleNode::Condition(Condition::new("sku", Operator::Eq, "TICKET-001")),
            RuleNode::Group(LogicalGroup::or(vec![
                RuleNode::Condition(Condition::new("amount", Operator::Gt, 1000)),
                RuleNode::Condition(Condition::new("category", Operator::Eq, "dining")),
            ])),
        ]));

        let text = encode(node).unwrap();
        assert_eq!(
            text,
            r#"order.sku=="TICKET-001" && (order.amount>1000 || order.category=="dining")"#
        );
    }

    #[test]
    fn test_encode_unknown_field() {
        let result = encode(RuleNode::Condition(Condition::new(
            "nonexistent",
            Operator::Eq,
            1,
        )));
        assert!(matches!(result, Err(RuleError::Translation(_))));
    }

    #[test]
    fn test_encode_empty_group() {
        let result = encode(RuleNode::Group(LogicalGroup::and(vec![])));
        assert!(matches!(result, Err(RuleError::Translation(_))));
    }

    #[test]
    fn test_encode_between_requires_pair() {
        let bad = encode(RuleNode::Condition(Condition::new(
            "amount",
            Operator::Between,
            json!([100]),
        )));
        assert!(bad.is_err());

        let good = encode(RuleNode::Condition(Condition::new(
            "amount",
            Operator::Between,
            json!([100, 500]),
        )))
        .unwrap();
        assert_eq!(good, "order.amount between [100, 500]");
    }

    #[test]
    fn test_encode_invalid_regex() {
        let result = encode(RuleNode::Condition(Condition::new(
            "sku",
            Operator::Matches,
            "[invalid",
        )));
        assert!(matches!(result, Err(RuleError::Translation(_))));
    }

    #[test]
    fn test_encode_rejects_object_operand() {
        let result = encode(RuleNode::Condition(Condition::new(
            "sku",
            Operator::Eq,
            json!({"a": 1}),
        )));
        assert!(matches!(result, Err(RuleError::Translation(_))));
    }
}

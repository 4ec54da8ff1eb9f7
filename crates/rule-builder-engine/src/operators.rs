//! 规则操作符定义
//!
//! 条件操作符同时约定了匹配表达式文本中的书写形式，编码器和解析器共用。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 条件操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    // 通用比较
    Eq,
    Neq,

    // 数值比较
    Gt,
    Gte,
    Lt,
    Lte,
    Between,

    // 包含检查
    In,
    NotIn,
    Contains,

    // 字符串操作
    StartsWith,
    EndsWith,
    Matches,
}

impl Operator {
    /// 表达式文本中的操作符写法
    pub fn expression_token(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Neq => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Between => "between",
            Self::In => "in",
            Self::NotIn => "notIn",
            Self::Contains => "contains",
            Self::StartsWith => "startsWith",
            Self::EndsWith => "endsWith",
            Self::Matches => "matches",
        }
    }

    /// 从表达式文本中的关键字操作符还原
    ///
    /// 符号操作符（`==`、`>=` 等）由词法分析单独识别，不走这里。
    pub fn from_keyword(token: &str) -> Option<Self> {
        match token {
            "between" => Some(Self::Between),
            "in" => Some(Self::In),
            "notIn" => Some(Self::NotIn),
            "contains" => Some(Self::Contains),
            "startsWith" => Some(Self::StartsWith),
            "endsWith" => Some(Self::EndsWith),
            "matches" => Some(Self::Matches),
            _ => None,
        }
    }

    /// 关键字操作符书写时前后留空格，符号操作符紧贴操作数
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Self::Between
                | Self::In
                | Self::NotIn
                | Self::Contains
                | Self::StartsWith
                | Self::EndsWith
                | Self::Matches
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Between => "between",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::Matches => "matches",
        };
        write!(f, "{}", s)
    }
}

/// 逻辑操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    /// 表达式文本中的连接符写法
    pub fn expression_token(&self) -> &'static str {
        match self {
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_token_roundtrip() {
        for op in [
            Operator::Between,
            Operator::In,
            Operator::NotIn,
            Operator::Contains,
            Operator::StartsWith,
            Operator::EndsWith,
            Operator::Matches,
        ] {
            assert_eq!(Operator::from_keyword(op.expression_token()), Some(op));
            assert!(op.is_keyword());
        }
    }

    #[test]
    fn test_symbol_operators_are_not_keywords() {
        for op in [
            Operator::Eq,
            Operator::Neq,
            Operator::Gt,
            Operator::Gte,
            Operator::Lt,
            Operator::Lte,
        ] {
            assert!(!op.is_keyword());
            assert_eq!(Operator::from_keyword(op.expression_token()), None);
        }
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&Operator::NotIn).unwrap(), "\"not_in\"");
        assert_eq!(serde_json::to_string(&Operator::Gte).unwrap(), "\"gte\"");
        assert_eq!(
            serde_json::to_string(&LogicalOperator::And).unwrap(),
            "\"AND\""
        );

        let op: Operator = serde_json::from_str("\"starts_with\"").unwrap();
        assert_eq!(op, Operator::StartsWith);
    }
}

//! 反向解析器：匹配表达式文本 → 规则树
//!
//! 手写词法分析加递归下降：`||` 优先级最低，`&&` 次之，括号分组。
//! 解析只还原字段、操作符和操作数；`id` 与 `quantity` 不属于表达式
//! 语法，调用方需要时另行携带。

use crate::error::{Result, RuleError};
use crate::field_service::FieldServiceConfig;
use crate::models::{Condition, LogicalGroup, RuleNode};
use crate::operators::Operator;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    Dot,
    Comma,
    LBracket,
    RBracket,
    LParen,
    RParen,
    AndAnd,
    OrOr,
    EqEq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(s) => format!("标识符 '{}'", s),
            Token::Str(s) => format!("字符串 {:?}", s),
            Token::Int(n) => format!("整数 {}", n),
            Token::Float(f) => format!("数字 {}", f),
            Token::Dot => "'.'".to_string(),
            Token::Comma => "','".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::AndAnd => "'&&'".to_string(),
            Token::OrOr => "'||'".to_string(),
            Token::EqEq => "'=='".to_string(),
            Token::Neq => "'!='".to_string(),
            Token::Gt => "'>'".to_string(),
            Token::Gte => "'>='".to_string(),
            Token::Lt => "'<'".to_string(),
            Token::Lte => "'<='".to_string(),
        }
    }
}

fn lex(src: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0usize;

    while pos < chars.len() {
        let c = chars[pos];

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        // 字符串字面量
        if c == '"' {
            pos += 1;
            let mut s = String::new();
            loop {
                if pos >= chars.len() {
                    return Err(RuleError::Translation("字符串字面量未闭合".to_string()));
                }
                match chars[pos] {
                    '"' => {
                        pos += 1;
                        break;
                    }
                    '\\' => {
                        pos += 1;
                        let esc = chars.get(pos).copied().ok_or_else(|| {
                            RuleError::Translation("字符串转义未闭合".to_string())
                        })?;
                        match esc {
                            '"' => s.push('"'),
                            '\\' => s.push('\\'),
                            'n' => s.push('\n'),
                            't' => s.push('\t'),
                            other => {
                                return Err(RuleError::Translation(format!(
                                    "不支持的转义字符: \\{}",
                                    other
                                )));
                            }
                        }
                        pos += 1;
                    }
                    other => {
                        s.push(other);
                        pos += 1;
                    }
                }
            }
            tokens.push(Token::Str(s));
            continue;
        }

        // 数字字面量（含负号与科学计数法）
        if c.is_ascii_digit() || (c == '-' && chars.get(pos + 1).is_some_and(|n| n.is_ascii_digit()))
        {
            let start = pos;
            pos += 1;
            while pos < chars.len()
                && (chars[pos].is_ascii_digit()
                    || chars[pos] == '.'
                    || chars[pos] == 'e'
                    || chars[pos] == 'E'
                    || ((chars[pos] == '+' || chars[pos] == '-')
                        && matches!(chars[pos - 1], 'e' | 'E')))
            {
                pos += 1;
            }
            let text: String = chars[start..pos].iter().collect();
            if let Ok(n) = text.parse::<i64>() {
                tokens.push(Token::Int(n));
            } else {
                let f = text.parse::<f64>().map_err(|_| {
                    RuleError::Translation(format!("无法解析数字: '{}'", text))
                })?;
                tokens.push(Token::Float(f));
            }
            continue;
        }

        // 标识符
        if c.is_ascii_alphabetic() || c == '_' {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            tokens.push(Token::Ident(chars[start..pos].iter().collect()));
            continue;
        }

        // 符号
        let next = chars.get(pos + 1).copied();
        match (c, next) {
            ('&', Some('&')) => {
                tokens.push(Token::AndAnd);
                pos += 2;
            }
            ('|', Some('|')) => {
                tokens.push(Token::OrOr);
                pos += 2;
            }
            ('=', Some('=')) => {
                tokens.push(Token::EqEq);
                pos += 2;
            }
            ('!', Some('=')) => {
                tokens.push(Token::Neq);
                pos += 2;
            }
            ('>', Some('=')) => {
                tokens.push(Token::Gte);
                pos += 2;
            }
            ('<', Some('=')) => {
                tokens.push(Token::Lte);
                pos += 2;
            }
            ('>', _) => {
                tokens.push(Token::Gt);
                pos += 1;
            }
            ('<', _) => {
                tokens.push(Token::Lt);
                pos += 1;
            }
            ('.', _) => {
                tokens.push(Token::Dot);
                pos += 1;
            }
            (',', _) => {
                tokens.push(Token::Comma);
                pos += 1;
            }
            ('[', _) => {
                tokens.push(Token::LBracket);
                pos += 1;
            }
            (']', _) => {
                tokens.push(Token::RBracket);
                pos += 1;
            }
            ('(', _) => {
                tokens.push(Token::LParen);
                pos += 1;
            }
            (')', _) => {
                tokens.push(Token::RParen);
                pos += 1;
            }
            _ => {
                return Err(RuleError::Translation(format!(
                    "无法识别的字符: '{}'",
                    c
                )));
            }
        }
    }

    Ok(tokens)
}

struct Cursor {
    tokens: Vec<Token>,
    pos: usize,
}

impl Cursor {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| RuleError::Translation("表达式意外结束".to_string()))?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, expected: &Token) -> Result<()> {
        let token = self.next()?;
        if &token != expected {
            return Err(RuleError::Translation(format!(
                "期望 {}, 实际是 {}",
                expected.describe(),
                token.describe()
            )));
        }
        Ok(())
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }
}

/// 匹配表达式解析器
#[derive(Debug, Clone, Default)]
pub struct ExpressionParser;

impl ExpressionParser {
    pub fn new() -> Self {
        Self
    }

    /// 解析表达式文本
    ///
    /// 空文本（或全空白）等价于"未配置规则"，返回 `None` 而不是错误。
    pub fn parse(&self, text: &str, service: &FieldServiceConfig) -> Result<Option<RuleNode>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let mut cursor = Cursor {
            tokens: lex(text)?,
            pos: 0,
        };
        let node = self.parse_or(&mut cursor, service)?;

        if let Some(extra) = cursor.peek() {
            return Err(RuleError::Translation(format!(
                "表达式末尾有多余内容: {}",
                extra.describe()
            )));
        }

        Ok(Some(node))
    }

    fn parse_or(&self, cursor: &mut Cursor, service: &FieldServiceConfig) -> Result<RuleNode> {
        let first = self.parse_and(cursor, service)?;
        if cursor.peek() != Some(&Token::OrOr) {
            return Ok(first);
        }

        let mut children = vec![first];
        while cursor.eat(&Token::OrOr) {
            children.push(self.parse_and(cursor, service)?);
        }
        Ok(RuleNode::Group(LogicalGroup::or(children)))
    }

    fn parse_and(&self, cursor: &mut Cursor, service: &FieldServiceConfig) -> Result<RuleNode> {
        let first = self.parse_term(cursor, service)?;
        if cursor.peek() != Some(&Token::AndAnd) {
            return Ok(first);
        }

        let mut children = vec![first];
        while cursor.eat(&Token::AndAnd) {
            children.push(self.parse_term(cursor, service)?);
        }
        Ok(RuleNode::Group(LogicalGroup::and(children)))
    }

    fn parse_term(&self, cursor: &mut Cursor, service: &FieldServiceConfig) -> Result<RuleNode> {
        if cursor.eat(&Token::LParen) {
            let node = self.parse_or(cursor, service)?;
            cursor.expect(&Token::RParen)?;
            return Ok(node);
        }
        self.parse_condition(cursor, service)
    }

    fn parse_condition(
        &self,
        cursor: &mut Cursor,
        service: &FieldServiceConfig,
    ) -> Result<RuleNode> {
        // 字段引用: 实体键.字段[.子字段...]
        let namespace = match cursor.next()? {
            Token::Ident(s) => s,
            other => {
                return Err(RuleError::Translation(format!(
                    "期望字段引用, 实际是 {}",
                    other.describe()
                )));
            }
        };
        if namespace != service.entity_key {
            return Err(RuleError::Translation(format!(
                "未知的实体命名空间 '{}', 当前上下文是 '{}'",
                namespace, service.entity_key
            )));
        }

        let mut segments = Vec::new();
        while cursor.eat(&Token::Dot) {
            match cursor.next()? {
                Token::Ident(s) => segments.push(s),
                other => {
                    return Err(RuleError::Translation(format!(
                        "字段引用中期望标识符, 实际是 {}",
                        other.describe()
                    )));
                }
            }
        }
        if segments.is_empty() {
            return Err(RuleError::Translation(format!(
                "实体键 '{}' 后缺少字段名",
                namespace
            )));
        }
        let field = segments.join(".");
        if !service.has_field(&field) {
            return Err(RuleError::Translation(format!(
                "字段 '{}' 不在 '{}' 上下文的可用字段中",
                field, service.entity_key
            )));
        }

        // 操作符
        let operator = match cursor.next()? {
            Token::EqEq => Operator::Eq,
            Token::Neq => Operator::Neq,
            Token::Gt => Operator::Gt,
            Token::Gte => Operator::Gte,
            Token::Lt => Operator::Lt,
            Token::Lte => Operator::Lte,
            Token::Ident(word) => Operator::from_keyword(&word).ok_or_else(|| {
                RuleError::Translation(format!("未知的操作符: '{}'", word))
            })?,
            other => {
                return Err(RuleError::Translation(format!(
                    "期望操作符, 实际是 {}",
                    other.describe()
                )));
            }
        };

        let value = self.parse_literal(cursor)?;

        if operator == Operator::Matches {
            let pattern = value.as_str().ok_or_else(|| {
                RuleError::Translation("matches 操作符需要字符串操作数".to_string())
            })?;
            regex::Regex::new(pattern).map_err(|e| {
                RuleError::Translation(format!("正则表达式无效: {}", e))
            })?;
        }

        Ok(RuleNode::Condition(Condition {
            field,
            operator,
            value,
        }))
    }

    fn parse_literal(&self, cursor: &mut Cursor) -> Result<Value> {
        match cursor.next()? {
            Token::Str(s) => Ok(Value::String(s)),
            Token::Int(n) => Ok(Value::from(n)),
            Token::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .ok_or_else(|| RuleError::Translation(format!("数字无法表示: {}", f))),
            Token::Ident(word) if word == "true" => Ok(Value::Bool(true)),
            Token::Ident(word) if word == "false" => Ok(Value::Bool(false)),
            Token::LBracket => {
                let mut items = Vec::new();
                if cursor.eat(&Token::RBracket) {
                    return Ok(Value::Array(items));
                }
                loop {
                    items.push(self.parse_literal(cursor)?);
                    if cursor.eat(&Token::Comma) {
                        continue;
                    }
                    cursor.expect(&Token::RBracket)?;
                    break;
                }
                Ok(Value::Array(items))
            }
            other => Err(RuleError::Translation(format!(
                "期望操作数, 实际是 {}",
                other.describe()
            ))),
        }
    }
}

//! 规则构建器翻译引擎
//!
//! 在 UI 规则构建器的结构化快照与文本匹配表达式之间双向翻译，并按
//! 全量快照协调持久化的数量规则集合，支持：
//! - 规则树 → 匹配表达式的确定性编码
//! - 匹配表达式 → 规则树的解析回显
//! - 快照信封的序列化与属性包组装
//! - 数量规则集合的按 id 匹配、缺失即删除的协调
//! - 按字段类型与存储形态分发的写入/读取/属性合并

pub mod accessor;
pub mod dispatcher;
pub mod encoder;
pub mod entity;
pub mod error;
pub mod field_service;
pub mod models;
pub mod operators;
pub mod parser;
pub mod reconciler;
pub mod snapshot;

pub use accessor::{FieldAccessor, RuleEntityFactory, StorageType};
pub use dispatcher::{
    FieldSpec, Property, RuleFieldDispatcher, RuleFieldType, RULE_JSON_SUFFIX,
    filter_rule_properties,
};
pub use encoder::ExpressionEncoder;
pub use entity::{QuantityRuleEntity, SimpleRuleEntity};
pub use error::{Result, RuleError};
pub use field_service::{
    FieldDefinition, FieldServiceConfig, FieldServiceResolver, StaticFieldServiceResolver,
};
pub use models::{Condition, DataWrapper, LogicalGroup, RuleEntry, RuleNode};
pub use operators::{LogicalOperator, Operator};
pub use parser::ExpressionParser;
pub use reconciler::QuantityRuleReconciler;
pub use snapshot::{FieldAliases, SnapshotSerializer};

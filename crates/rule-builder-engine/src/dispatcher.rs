//! 规则字段分发
//!
//! 按字段的声明类型（简单规则 / 数量规则）和运行时存储形态选择编解
//! 码与协调路径。写入方向把快照 JSON 落到目标对象上；读取方向产出
//! 规范属性加 `<字段名>Json` 合成属性，最后由过滤步骤把合成属性折
//! 回规范名。

use crate::accessor::{FieldAccessor, RuleEntityFactory, StorageType};
use crate::encoder::ExpressionEncoder;
use crate::entity::{QuantityRuleEntity, SimpleRuleEntity};
use crate::error::{Result, RuleError};
use crate::field_service::{FieldServiceConfig, FieldServiceResolver};
use crate::parser::ExpressionParser;
use crate::reconciler::QuantityRuleReconciler;
use crate::snapshot::{FieldAliases, SnapshotSerializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// 合成属性的名字后缀
pub const RULE_JSON_SUFFIX: &str = "Json";

/// 规则字段类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleFieldType {
    Simple,
    WithQuantity,
}

/// 规则字段的静态描述，由管理端元数据系统提供
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: RuleFieldType,
    /// 选择字段服务配置的规则标识符
    pub rule_identifier: String,
}

impl FieldSpec {
    pub fn simple(name: impl Into<String>, rule_identifier: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: RuleFieldType::Simple,
            rule_identifier: rule_identifier.into(),
        }
    }

    pub fn with_quantity(name: impl Into<String>, rule_identifier: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: RuleFieldType::WithQuantity,
            rule_identifier: rule_identifier.into(),
        }
    }
}

/// 出方向属性
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_value: Option<String>,
}

impl Property {
    pub fn new(name: impl Into<String>, value: Option<String>) -> Self {
        Self {
            name: name.into(),
            value,
            display_value: None,
        }
    }
}

/// 规则字段分发器
pub struct RuleFieldDispatcher<R: FieldServiceResolver> {
    resolver: R,
    encoder: ExpressionEncoder,
    parser: ExpressionParser,
    reconciler: QuantityRuleReconciler,
}

impl<R: FieldServiceResolver> RuleFieldDispatcher<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            encoder: ExpressionEncoder::new(),
            parser: ExpressionParser::new(),
            reconciler: QuantityRuleReconciler::new(),
        }
    }

    /// 写入方向：把前端提交的快照 JSON 落到目标对象的规则字段上
    #[instrument(skip(self, raw, accessor, factory), fields(field = %spec.name))]
    pub fn populate<A, F>(
        &self,
        spec: &FieldSpec,
        raw: Option<&str>,
        accessor: &mut A,
        factory: &F,
    ) -> Result<()>
    where
        A: FieldAccessor,
        F: RuleEntityFactory<Simple = A::Simple, Quantity = A::Quantity>,
    {
        let service = self.resolver.create_instance(&spec.rule_identifier)?;

        match spec.field_type {
            RuleFieldType::WithQuantity => {
                let storage = accessor.storage_type(&spec.name)?;
                let StorageType::QuantityRuleCollection(element_type) = storage else {
                    return Err(RuleError::UnsupportedField {
                        field: spec.name.clone(),
                        reason: "数量规则目前仅支持集合字段，不支持单值字段".to_string(),
                    });
                };

                let wrapper = SnapshotSerializer::parse(raw)?;
                let rules = accessor.quantity_rules_mut(&spec.name)?;
                self.reconciler.reconcile(
                    &service.entity_key,
                    &service,
                    wrapper.as_ref(),
                    rules,
                    || factory.create_quantity(&element_type),
                )?;
            }
            RuleFieldType::Simple => {
                let expression = self.simple_rule_expression(raw, &service)?;
                match accessor.storage_type(&spec.name)? {
                    StorageType::Text => {
                        accessor.set_text(&spec.name, expression)?;
                    }
                    StorageType::SimpleRule(type_name) => {
                        if let Some(rule) = accessor.simple_rule_mut(&spec.name)? {
                            // 已有实体原地更新，绝不替换
                            rule.set_match_rule(expression);
                        } else if expression.is_some() {
                            // 惰性创建: 只有确实有表达式时才实例化
                            let mut rule = factory.create_simple(&type_name)?;
                            rule.set_match_rule(expression);
                            accessor.attach_simple_rule(&spec.name, rule)?;
                            debug!(field = %spec.name, "已创建简单规则实体");
                        }
                    }
                    StorageType::QuantityRuleCollection(_) => {
                        return Err(RuleError::UnsupportedField {
                            field: spec.name.clone(),
                            reason: "简单规则字段不能落在数量规则集合上".to_string(),
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// 读取方向：产出规范属性与 `<字段名>Json` 合成属性
    #[instrument(skip(self, accessor, display_hint), fields(field = %spec.name))]
    pub fn extract<A>(
        &self,
        spec: &FieldSpec,
        accessor: &A,
        display_hint: Option<&str>,
    ) -> Result<Vec<Property>>
    where
        A: FieldAccessor,
    {
        let service = self.resolver.create_instance(&spec.rule_identifier)?;
        let mut props = Vec::new();

        match spec.field_type {
            RuleFieldType::Simple => {
                let match_rule = match accessor.storage_type(&spec.name)? {
                    StorageType::Text => accessor.get_text(&spec.name)?,
                    StorageType::SimpleRule(_) => accessor
                        .simple_rule(&spec.name)?
                        .and_then(|rule| rule.match_rule().map(str::to_owned)),
                    StorageType::QuantityRuleCollection(_) => {
                        return Err(RuleError::UnsupportedField {
                            field: spec.name.clone(),
                            reason: "简单规则字段不能落在数量规则集合上".to_string(),
                        });
                    }
                };

                props.push(Property {
                    name: spec.name.clone(),
                    value: match_rule.clone(),
                    display_value: display_hint.map(str::to_owned),
                });

                let json = self.simple_rule_to_json(match_rule.as_deref(), &service)?;
                props.push(Property::new(
                    format!("{}{}", spec.name, RULE_JSON_SUFFIX),
                    Some(json),
                ));
            }
            RuleFieldType::WithQuantity => {
                match accessor.storage_type(&spec.name)? {
                    StorageType::QuantityRuleCollection(_) => {
                        let rules = accessor.quantity_rules(&spec.name)?;
                        let json = self.quantity_rules_to_json(rules, &service)?;
                        props.push(Property::new(
                            format!("{}{}", spec.name, RULE_JSON_SUFFIX),
                            Some(json),
                        ));
                    }
                    _ => {
                        return Err(RuleError::UnsupportedField {
                            field: spec.name.clone(),
                            reason: "数量规则目前仅支持集合字段，不支持单值字段".to_string(),
                        });
                    }
                }
            }
        }

        Ok(props)
    }

    /// 简单规则快照最多携带一个条目；其余形态一律当作"未配置"
    fn simple_rule_expression(
        &self,
        raw: Option<&str>,
        service: &FieldServiceConfig,
    ) -> Result<Option<String>> {
        let Some(wrapper) = SnapshotSerializer::parse(raw)? else {
            return Ok(None);
        };
        if wrapper.len() != 1 {
            return Ok(None);
        }
        self.encoder
            .encode(&service.entity_key, &wrapper.data[0], service)
            .map(Some)
    }

    fn simple_rule_to_json(
        &self,
        match_rule: Option<&str>,
        service: &FieldServiceConfig,
    ) -> Result<String> {
        let mut bag = Map::new();
        bag.insert(
            "matchRule".to_string(),
            Value::String(match_rule.unwrap_or_default().to_string()),
        );

        let wrapper = SnapshotSerializer::from_entities(
            &[bag],
            &FieldAliases::match_rule_only(),
            &self.parser,
            service,
        )?;
        SnapshotSerializer::to_json(&wrapper)
    }

    fn quantity_rules_to_json<Q>(
        &self,
        rules: &[Q],
        service: &FieldServiceConfig,
    ) -> Result<String>
    where
        Q: QuantityRuleEntity,
    {
        let bags: Vec<Map<String, Value>> = rules
            .iter()
            .map(|rule| {
                let mut bag = Map::new();
                bag.insert(
                    "matchRule".to_string(),
                    Value::String(rule.match_rule().to_string()),
                );
                bag.insert("quantity".to_string(), Value::from(rule.quantity()));
                if let Some(id) = rule.id() {
                    bag.insert("id".to_string(), Value::from(id));
                }
                bag
            })
            .collect();

        let wrapper = SnapshotSerializer::from_entities(
            &bags,
            &FieldAliases::default(),
            &self.parser,
            service,
        )?;
        SnapshotSerializer::to_json(&wrapper)
    }
}

/// 过滤步骤：把 `<字段名>Json` 合成属性折回规范属性名
///
/// 对每个后缀匹配且基础名是已知规则字段的合成属性：找到（或创建）
/// 规范属性，把值挪过去，丢掉合成属性。对出方向属性集的纯结构处理。
pub fn filter_rule_properties(props: &mut Vec<Property>, metadata: &HashMap<String, FieldSpec>) {
    let mut folded: Vec<(String, Option<String>)> = Vec::new();

    let mut index = 0usize;
    while index < props.len() {
        let base = props[index]
            .name
            .strip_suffix(RULE_JSON_SUFFIX)
            .filter(|base| metadata.contains_key(*base))
            .map(str::to_owned);

        match base {
            Some(base) => {
                let prop = props.remove(index);
                folded.push((base, prop.value));
            }
            None => index += 1,
        }
    }

    for (base, value) in folded {
        if let Some(existing) = props.iter_mut().find(|p| p.name == base) {
            existing.value = value;
        } else {
            props.push(Property::new(base, value));
        }
    }
}

//! 数量规则集合协调
//!
//! 前端每次提交的是当前可见规则的完整快照而不是增量，因此"不在快照
//! 中"就意味着用户删除了该条目：带 id 的条目按 id 匹配原地更新，缺
//! 失的 id 是致命的过期引用错误，无 id 的条目新建，最后按身份移除未
//! 被匹配的持久化实体。

use crate::encoder::ExpressionEncoder;
use crate::entity::QuantityRuleEntity;
use crate::error::{Result, RuleError};
use crate::field_service::FieldServiceConfig;
use crate::models::DataWrapper;
use std::any::type_name;
use std::collections::HashSet;
use tracing::{debug, instrument, warn};

/// 数量规则协调器
#[derive(Debug, Clone, Default)]
pub struct QuantityRuleReconciler {
    encoder: ExpressionEncoder,
}

impl QuantityRuleReconciler {
    pub fn new() -> Self {
        Self {
            encoder: ExpressionEncoder::new(),
        }
    }

    /// 用快照协调持久化集合
    ///
    /// 快照缺失或为空时不做任何变更（"没有提交快照"不等于"删除全
    /// 部"）。`quantity` 与表达式只有在值确实变化时才写入，重复提交
    /// 同一快照不会产生第二次写。匹配集合在移除阶段之前计算完整。
    #[instrument(skip_all, fields(entity_key = %entity_key))]
    pub fn reconcile<Q, F>(
        &self,
        entity_key: &str,
        service: &FieldServiceConfig,
        wrapper: Option<&DataWrapper>,
        rules: &mut Vec<Q>,
        mut new_instance: F,
    ) -> Result<()>
    where
        Q: QuantityRuleEntity,
        F: FnMut() -> Result<Q>,
    {
        let Some(wrapper) = wrapper else {
            return Ok(());
        };
        if wrapper.is_empty() {
            return Ok(());
        }

        let existing_count = rules.len();
        let mut matched: HashSet<usize> = HashSet::new();
        let mut created = 0usize;

        for entry in &wrapper.data {
            let quantity = entry.quantity.ok_or_else(|| {
                RuleError::Translation("数量规则条目缺少 quantity 字段".to_string())
            })?;

            match entry.id {
                Some(id) => {
                    // 提交是全量的，未修改的条目也会原样回传
                    let Some(pos) = rules.iter().position(|rule| rule.id() == Some(id)) else {
                        warn!(id, "快照引用了不存在的规则 id");
                        return Err(RuleError::StaleReference {
                            id,
                            target: type_name::<Q>().to_string(),
                        });
                    };

                    let expression = self.encoder.encode(entity_key, entry, service)?;
                    let rule = &mut rules[pos];
                    if rule.quantity() != quantity {
                        rule.set_quantity(quantity);
                    }
                    if rule.match_rule() != expression {
                        rule.set_match_rule(expression);
                    }
                    matched.insert(pos);
                }
                None => {
                    let expression = self.encoder.encode(entity_key, entry, service)?;
                    let mut rule = new_instance()?;
                    rule.set_quantity(quantity);
                    rule.set_match_rule(expression);
                    rules.push(rule);
                    matched.insert(rules.len() - 1);
                    created += 1;
                }
            }
        }

        // 全量快照: 未被匹配的持久化条目视为已删除
        let mut index = 0usize;
        rules.retain(|_| {
            let keep = matched.contains(&index);
            index += 1;
            keep
        });

        debug!(
            matched = matched.len() - created,
            created,
            removed = existing_count + created - rules.len(),
            "数量规则集合已协调"
        );
        Ok(())
    }
}

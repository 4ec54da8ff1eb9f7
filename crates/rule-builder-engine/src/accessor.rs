//! 目标对象字段访问能力
//!
//! 宿主系统按自己的对象模型实现这两个接口；引擎只消费它们，不关心
//! 背后是 ORM 实体、反射还是内存结构。映射字段（`容器---键` 之类的
//! 寻址）也由实现方在 `name` 解析时处理。

use crate::entity::{QuantityRuleEntity, SimpleRuleEntity};
use crate::error::Result;

/// 目标字段的运行时存储形态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageType {
    /// 纯文本字段，表达式直接存为字符串
    Text,
    /// 简单规则实体字段，携带用于实例化的类型名
    SimpleRule(String),
    /// 数量规则集合字段，携带集合元素类型名
    QuantityRuleCollection(String),
}

/// 字段访问能力
///
/// 取不到指定名字的字段返回 `FieldNotAvailable`；存储形态无法确定
/// （比如集合元素类型解析不出来）返回 `UnsupportedField`。
pub trait FieldAccessor {
    type Simple: SimpleRuleEntity;
    type Quantity: QuantityRuleEntity;

    fn storage_type(&self, name: &str) -> Result<StorageType>;

    fn get_text(&self, name: &str) -> Result<Option<String>>;
    fn set_text(&mut self, name: &str, value: Option<String>) -> Result<()>;

    fn simple_rule(&self, name: &str) -> Result<Option<&Self::Simple>>;
    fn simple_rule_mut(&mut self, name: &str) -> Result<Option<&mut Self::Simple>>;
    fn attach_simple_rule(&mut self, name: &str, rule: Self::Simple) -> Result<()>;

    fn quantity_rules(&self, name: &str) -> Result<&[Self::Quantity]>;
    fn quantity_rules_mut(&mut self, name: &str) -> Result<&mut Vec<Self::Quantity>>;
}

/// 规则实体工厂
///
/// 新实体的具体类型在运行期由字段的存储形态决定，所以实例化交给
/// 宿主；引擎拿到实例后再填表达式和数量。
pub trait RuleEntityFactory {
    type Simple: SimpleRuleEntity;
    type Quantity: QuantityRuleEntity;

    fn create_simple(&self, type_name: &str) -> Result<Self::Simple>;
    fn create_quantity(&self, element_type: &str) -> Result<Self::Quantity>;
}

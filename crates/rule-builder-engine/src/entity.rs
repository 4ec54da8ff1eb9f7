//! 持久化规则实体的能力接口
//!
//! 实体本身由宿主系统的 ORM 拥有，这里只约定引擎需要的读写能力。
//! 引擎对已存在的实体原地修改，只有在缺失时才通过工厂创建新实例，
//! 事务边界与持久化时机都留给宿主。

/// 简单匹配规则实体：单个表达式文本字段
pub trait SimpleRuleEntity {
    fn match_rule(&self) -> Option<&str>;
    fn set_match_rule(&mut self, rule: Option<String>);
}

/// 数量规则实体：表达式 + 数量阈值 + 持久化 id
///
/// `id` 为 `None` 表示尚未落库；落库后的 id 稳定且不复用。
pub trait QuantityRuleEntity {
    fn id(&self) -> Option<i64>;
    fn quantity(&self) -> i64;
    fn set_quantity(&mut self, quantity: i64);
    fn match_rule(&self) -> &str;
    fn set_match_rule(&mut self, rule: String);
}

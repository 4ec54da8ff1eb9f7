//! 表达式编解码性能基准测试
//!
//! 针对规则树编码与表达式解析的往返路径做细粒度测试。

use criterion::{Criterion, criterion_group, criterion_main};
use rule_builder::{
    Condition, ExpressionEncoder, ExpressionParser, FieldServiceConfig, LogicalGroup, Operator,
    RuleEntry, RuleNode,
};
use serde_json::json;
use std::hint::black_box;

fn order_service() -> FieldServiceConfig {
    FieldServiceConfig::new("order")
        .with_field("amount", "订单金额")
        .with_field("category", "订单类目")
        .with_field("sku", "商品编号")
}

fn nested_rule() -> RuleNode {
    RuleNode::Group(LogicalGroup::and(vec![
        RuleNode::Condition(Condition::new("sku", Operator::Eq, "TICKET-001")),
        RuleNode::Group(LogicalGroup::or(vec![
            RuleNode::Condition(Condition::new("amount", Operator::Between, json!([100, 500]))),
            RuleNode::Condition(Condition::new(
                "category",
                Operator::In,
                json!(["park_visit", "dining", "hotel_booking"]),
            )),
        ])),
    ]))
}

fn bench_encode(c: &mut Criterion) {
    let encoder = ExpressionEncoder::new();
    let service = order_service();
    let entry = RuleEntry::new(nested_rule());

    c.bench_function("encode_nested_rule", |b| {
        b.iter(|| {
            encoder
                .encode(black_box("order"), black_box(&entry), black_box(&service))
                .unwrap()
        })
    });
}

fn bench_parse(c: &mut Criterion) {
    let encoder = ExpressionEncoder::new();
    let parser = ExpressionParser::new();
    let service = order_service();
    let text = encoder
        .encode("order", &RuleEntry::new(nested_rule()), &service)
        .unwrap();

    c.bench_function("parse_nested_rule", |b| {
        b.iter(|| parser.parse(black_box(&text), black_box(&service)).unwrap())
    });
}

fn bench_roundtrip(c: &mut Criterion) {
    let encoder = ExpressionEncoder::new();
    let parser = ExpressionParser::new();
    let service = order_service();
    let entry = RuleEntry::new(nested_rule());

    c.bench_function("encode_parse_roundtrip", |b| {
        b.iter(|| {
            let text = encoder.encode("order", &entry, &service).unwrap();
            parser.parse(black_box(&text), &service).unwrap()
        })
    });
}

criterion_group!(benches, bench_encode, bench_parse, bench_roundtrip);
criterion_main!(benches);

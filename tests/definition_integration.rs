//! Integration tests for declarative pipeline definitions
//!
//! Definitions are built as data, resolved against a callback registry and
//! executed, checking that they behave exactly like the equivalent builder
//! chains.

use foldline::{
    Accumulator, CallbackRegistry, Pipeline, PipelineDefinition, PipelineError, StageDefinition,
    StageKind,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use stillwater::Validation;

fn numeric_registry() -> CallbackRegistry<i32, i64> {
    CallbackRegistry::new()
        .with_predicate("is_odd", |x: &i32, _, _| x % 2 != 0)
        .with_transform("double", |x: &i32, _, _| x * 2)
        .with_combine("sum", |acc: i64, x: &i32, _, _| acc + i64::from(*x))
}

fn order_registry() -> CallbackRegistry<Value, Value> {
    CallbackRegistry::new()
        .with_predicate("in_stock", |line: &Value, _, _| {
            line["qty"].as_i64().unwrap_or(0) > 0
        })
        .with_transform("line_total", |line: &Value, _, _| {
            let qty = line["qty"].as_i64().unwrap_or(0);
            let unit = line["unit"].as_i64().unwrap_or(0);
            json!({ "sku": line["sku"].clone(), "total": qty * unit })
        })
        .with_combine("summarize", |mut acc: Value, line: &Value, _, _| {
            let lines = acc["lines"].as_i64().unwrap_or(0) + 1;
            let revenue =
                acc["revenue"].as_i64().unwrap_or(0) + line["total"].as_i64().unwrap_or(0);
            acc["lines"] = json!(lines);
            acc["revenue"] = json!(revenue);
            acc
        })
}

fn stage(kind: StageKind, callback: &str) -> StageDefinition {
    StageDefinition::new(kind).with_callback(callback)
}

#[test]
fn test_definition_matches_builder_chain() {
    let definition = PipelineDefinition::new(vec![
        stage(StageKind::Filter, "is_odd"),
        stage(StageKind::Map, "double"),
        stage(StageKind::Reduce, "sum")
            .with_name("total")
            .with_seed(json!(0)),
    ]);
    let from_definition = numeric_registry().compile(&definition).unwrap();

    let from_builder = Pipeline::new()
        .filter(|x: &i32, _, _| x % 2 != 0)
        .map(|x, _, _| x * 2)
        .reduce(|acc: i64, x, _, _| acc + i64::from(*x), 0)
        .compose()
        .unwrap();

    for source in [vec![1, 2, 3, 4, 5], vec![6, 7, 8, 9, 0], vec![]] {
        assert_eq!(
            from_definition.execute(source.as_slice()).unwrap(),
            from_builder.execute(source.as_slice()).unwrap()
        );
    }

    let first = [1, 2, 3, 4, 5];
    let second = [6, 7, 8, 9, 0];
    assert_eq!(from_definition.execute(&first[..]).unwrap(), Accumulator::Value(18));
    assert_eq!(from_definition.execute(&second[..]).unwrap(), Accumulator::Value(32));
}

#[test]
fn test_definition_over_dynamic_values() {
    let definition: PipelineDefinition = serde_json::from_value(json!({
        "stages": [
            { "kind": "filter", "callback": "in_stock" },
            { "kind": "map", "callback": "line_total" },
            { "kind": "reduce", "callback": "summarize", "seed": { "lines": 0, "revenue": 0 } }
        ]
    }))
    .unwrap();

    let orders = vec![
        json!({ "sku": "a", "qty": 2, "unit": 5 }),
        json!({ "sku": "b", "qty": 0, "unit": 9 }),
        json!({ "sku": "c", "qty": 1, "unit": 7 }),
    ];

    let compiled = order_registry().compile(&definition).unwrap();

    let summary = compiled.execute(orders.as_slice()).unwrap();
    assert_eq!(
        summary,
        Accumulator::Value(json!({ "lines": 2, "revenue": 17 }))
    );

    // Object seed is copied per run, so a second run starts from zero again
    let summary = compiled.execute(&orders[..1]).unwrap();
    assert_eq!(
        summary,
        Accumulator::Value(json!({ "lines": 1, "revenue": 10 }))
    );
}

#[test]
fn test_collect_definition_reshapes_elements() {
    let definition = PipelineDefinition::new(vec![
        stage(StageKind::Filter, "in_stock"),
        stage(StageKind::Map, "line_total"),
    ]);

    let orders = vec![
        json!({ "sku": "a", "qty": 3, "unit": 2 }),
        json!({ "sku": "b", "qty": 0, "unit": 4 }),
    ];

    let result = order_registry()
        .compile(&definition)
        .unwrap()
        .execute(orders.as_slice())
        .unwrap();

    assert_eq!(
        result,
        Accumulator::Sequence(vec![json!({ "sku": "a", "total": 6 })])
    );
}

#[test]
fn test_validate_reports_every_problem() {
    let definition = PipelineDefinition::new(vec![
        stage(StageKind::Reduce, "sum").with_seed(json!(0)),
        StageDefinition::new(StageKind::Filter),
        stage(StageKind::Map, "triple"),
        stage(StageKind::Reduce, "sum")
            .with_name("total")
            .with_seed(json!("zero")),
    ]);

    match numeric_registry().validate(&definition) {
        Validation::Failure(errors) => {
            let messages: Vec<String> = errors.into_iter().map(|e| e.to_string()).collect();
            assert_eq!(
                messages,
                vec![
                    "reduce stage 'sum' must be the last stage of the pipeline".to_string(),
                    "filter stage is missing its callback".to_string(),
                    "no map callback registered under 'triple'".to_string(),
                    format!(
                        "invalid seed for reduce stage 'total': {}",
                        serde_json::from_value::<i64>(json!("zero")).unwrap_err()
                    ),
                ]
            );
        }
        Validation::Success(_) => panic!("Expected validation failure"),
    }
}

#[test]
fn test_build_returns_first_problem() {
    let definition: PipelineDefinition = serde_json::from_value(json!({
        "stages": [
            { "kind": "map", "callback": "double" },
            { "kind": "reduce", "callback": "sum" }
        ]
    }))
    .unwrap();

    let err = numeric_registry().build(&definition).unwrap_err();
    assert!(matches!(err, PipelineError::MissingSeed { .. }));
    assert!(!numeric_registry().contains(StageKind::Map, "sum"));
}

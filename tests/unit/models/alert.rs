//! Wire-format tests for alert definitions

use alertrix::models::alert::{
    Alert, CompareWith, Condition, ConditionSource, FireMode, LogicOp, Operator,
};
use alertrix::models::candle::Timeframe;

#[test]
fn operators_serialize_to_their_symbols() {
    assert_eq!(serde_json::to_string(&Operator::GreaterThan).unwrap(), "\">\"");
    assert_eq!(serde_json::to_string(&Operator::LessThan).unwrap(), "\"<\"");
    assert_eq!(serde_json::to_string(&Operator::GreaterEqual).unwrap(), "\">=\"");
    assert_eq!(serde_json::to_string(&Operator::LessEqual).unwrap(), "\"<=\"");
    assert_eq!(serde_json::to_string(&Operator::Equals).unwrap(), "\"equals\"");
    assert_eq!(
        serde_json::to_string(&Operator::CrossesAbove).unwrap(),
        "\"crosses_above\""
    );
    assert_eq!(
        serde_json::to_string(&Operator::CrossesBelow).unwrap(),
        "\"crosses_below\""
    );
}

#[test]
fn only_cross_operators_are_edges() {
    assert!(Operator::CrossesAbove.is_edge());
    assert!(Operator::CrossesBelow.is_edge());
    assert!(!Operator::GreaterThan.is_edge());
    assert!(!Operator::Equals.is_edge());
}

#[test]
fn timeframes_use_compact_labels() {
    assert_eq!(serde_json::to_string(&Timeframe::M1).unwrap(), "\"1m\"");
    assert_eq!(serde_json::to_string(&Timeframe::H1).unwrap(), "\"1h\"");
    assert_eq!(serde_json::to_string(&Timeframe::D1).unwrap(), "\"1d\"");
    assert_eq!(
        serde_json::from_str::<Timeframe>("\"4h\"").unwrap(),
        Timeframe::H4
    );
    assert_eq!(Timeframe::H4.seconds(), 4 * 3600);
}

#[test]
fn condition_parses_from_tagged_json() {
    let raw = r#"{
        "id": "c1",
        "source": {
            "type": "indicator",
            "name": "rsi",
            "params": { "period": 14 },
            "component": "rsi"
        },
        "operator": "crosses_below",
        "compare_with": { "type": "value", "value": 30.0 },
        "timeframe": "4h",
        "validity_seconds": 7200
    }"#;

    let condition: Condition = serde_json::from_str(raw).unwrap();
    assert_eq!(condition.id, "c1");
    assert_eq!(condition.operator, Operator::CrossesBelow);
    assert_eq!(condition.timeframe, Some(Timeframe::H4));
    assert_eq!(condition.validity_seconds, Some(7200));
    match &condition.source {
        ConditionSource::Indicator { name, params, component } => {
            assert_eq!(name, "rsi");
            assert_eq!(component, "rsi");
            assert_eq!(params.get("period"), Some(&serde_json::json!(14)));
        }
        other => panic!("unexpected source: {:?}", other),
    }
    match &condition.compare_with {
        CompareWith::Value { value } => assert_eq!(*value, 30.0),
        other => panic!("unexpected compare_with: {:?}", other),
    }
}

#[test]
fn optional_condition_fields_may_be_omitted() {
    let raw = r#"{
        "id": "c1",
        "source": { "type": "price" },
        "operator": ">",
        "compare_with": { "type": "indicator", "name": "ema", "params": {}, "component": "ema" }
    }"#;

    let condition: Condition = serde_json::from_str(raw).unwrap();
    assert_eq!(condition.timeframe, None);
    assert_eq!(condition.validity_seconds, None);

    // And they stay off the wire on the way back out
    let round = serde_json::to_value(&condition).unwrap();
    assert!(round.get("timeframe").is_none());
    assert!(round.get("validity_seconds").is_none());
}

#[test]
fn alert_parses_with_logic_and_fire_mode() {
    let raw = r#"{
        "alert_id": 42,
        "user_id": 7,
        "symbol": "BTCUSDT",
        "base_timeframe": "1h",
        "conditions": [{
            "id": "c1",
            "source": { "type": "price" },
            "operator": "<",
            "compare_with": { "type": "value", "value": 60000.0 }
        }],
        "logic": "AND",
        "fire_mode": "per_bar",
        "status": "active"
    }"#;

    let alert: Alert = serde_json::from_str(raw).unwrap();
    assert_eq!(alert.alert_id, 42);
    assert_eq!(alert.logic, LogicOp::And);
    assert_eq!(alert.fire_mode, FireMode::PerBar);
    assert!(alert.is_active());

    assert_eq!(serde_json::to_string(&LogicOp::Or).unwrap(), "\"OR\"");
    assert_eq!(serde_json::to_string(&FireMode::PerTick).unwrap(), "\"per_tick\"");
}

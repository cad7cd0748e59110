//! End-to-end tests for the alert runtime: event fan-out, firing
//! dispatch, and per-alert isolation over in-memory collaborators.


use alertrix::models::alert::{AlertStatus, FireMode, LogicOp, Operator};
use alertrix::models::candle::{MarketEvent, Timeframe};
use test_utils::{alert, bar_time, candle, rsi_condition, TestRuntime};

#[tokio::test]
async fn fire_is_notified_persisted_and_deduplicated() {
    let app = TestRuntime::new();
    app.runtime
        .register_alert(alert(
            1,
            vec![rsi_condition("c1", Operator::LessThan, 30.0)],
            LogicOp::And,
            FireMode::PerBar,
        ))
        .await;

    app.advance_bar(1, 25.0);
    let event = MarketEvent::bar_close("BTCUSDT", Timeframe::H1, bar_time(1));

    let results = app.runtime.on_event(&event).await;
    assert_eq!(results.len(), 1);
    assert!(results[0].would_fire);

    // Accepted notification, committed watermark, logged firing
    assert_eq!(app.notifier.accepted().len(), 1);
    assert_eq!(app.store.last_fired(1), Some(bar_time(1)));
    let log = app.store.firing_log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].alert_id, 1);
    assert_eq!(log[0].symbol, "BTCUSDT");

    // Replaying the same bar does not fire again
    let results = app.runtime.on_event(&event).await;
    assert!(!results[0].would_fire);
    assert_eq!(app.notifier.accepted().len(), 1);
}

#[tokio::test]
async fn rejected_notification_is_retried_on_the_next_event() {
    let app = TestRuntime::new();
    app.runtime
        .register_alert(alert(
            1,
            vec![rsi_condition("c1", Operator::LessThan, 30.0)],
            LogicOp::And,
            FireMode::PerBar,
        ))
        .await;

    app.advance_bar(1, 25.0);
    let event = MarketEvent::bar_close("BTCUSDT", Timeframe::H1, bar_time(1));

    app.notifier.set_rejecting(true);
    app.runtime.on_event(&event).await;

    // Not committed: the watermark and the log are untouched
    assert_eq!(app.notifier.accepted().len(), 0);
    assert_eq!(app.store.last_fired(1), None);
    assert!(app.store.firing_log().is_empty());

    // Downstream recovers; the same bar fires on the next delivery
    app.notifier.set_rejecting(false);
    let results = app.runtime.on_event(&event).await;
    assert!(results[0].would_fire);
    assert_eq!(app.notifier.accepted().len(), 1);
    assert_eq!(app.store.last_fired(1), Some(bar_time(1)));
}

#[tokio::test]
async fn two_alerts_share_one_indicator_computation() {
    let app = TestRuntime::new();
    app.runtime
        .register_alert(alert(
            1,
            vec![rsi_condition("c1", Operator::LessThan, 30.0)],
            LogicOp::And,
            FireMode::PerBar,
        ))
        .await;
    app.runtime
        .register_alert(alert(
            2,
            vec![rsi_condition("c1", Operator::GreaterThan, 70.0)],
            LogicOp::And,
            FireMode::PerBar,
        ))
        .await;

    app.advance_bar(1, 25.0);
    let event = MarketEvent::bar_close("BTCUSDT", Timeframe::H1, bar_time(1));
    let results = app.runtime.on_event(&event).await;

    assert_eq!(results.len(), 2);
    assert_eq!(app.indicators.calls(), 1, "concurrent evaluation must share the cache");
}

#[tokio::test]
async fn invalid_alert_is_quarantined_without_affecting_others() {
    let app = TestRuntime::new();
    app.runtime
        .register_alert(alert(1, Vec::new(), LogicOp::And, FireMode::PerBar))
        .await;
    app.runtime
        .register_alert(alert(
            2,
            vec![rsi_condition("c1", Operator::LessThan, 30.0)],
            LogicOp::And,
            FireMode::PerBar,
        ))
        .await;

    app.advance_bar(1, 25.0);
    let event = MarketEvent::bar_close("BTCUSDT", Timeframe::H1, bar_time(1));

    let results = app.runtime.on_event(&event).await;
    assert_eq!(results.len(), 1, "only the valid alert completes");
    assert_eq!(results[0].alert_id, 2);
    assert!(results[0].would_fire);

    // Quarantined: the invalid alert is skipped on subsequent events
    app.advance_bar(2, 25.0);
    let event = MarketEvent::bar_close("BTCUSDT", Timeframe::H1, bar_time(2));
    let results = app.runtime.on_event(&event).await;
    assert_eq!(results.len(), 1);

    // Replacing the definition lifts the quarantine
    app.runtime
        .register_alert(alert(
            1,
            vec![rsi_condition("c1", Operator::LessThan, 30.0)],
            LogicOp::And,
            FireMode::PerBar,
        ))
        .await;
    app.advance_bar(3, 25.0);
    let event = MarketEvent::bar_close("BTCUSDT", Timeframe::H1, bar_time(3));
    let results = app.runtime.on_event(&event).await;
    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn events_only_reach_matching_alerts() {
    let app = TestRuntime::new();
    app.runtime
        .register_alert(alert(
            1,
            vec![rsi_condition("c1", Operator::LessThan, 30.0)],
            LogicOp::And,
            FireMode::PerBar,
        ))
        .await;
    let mut paused = alert(
        2,
        vec![rsi_condition("c1", Operator::LessThan, 30.0)],
        LogicOp::And,
        FireMode::PerBar,
    );
    paused.status = AlertStatus::Paused;
    app.runtime.register_alert(paused).await;

    app.advance_bar(1, 25.0);

    let other_symbol = MarketEvent::bar_close("ETHUSDT", Timeframe::H1, bar_time(1));
    assert!(app.runtime.on_event(&other_symbol).await.is_empty());

    let other_timeframe = MarketEvent::bar_close("BTCUSDT", Timeframe::H4, bar_time(1));
    assert!(app.runtime.on_event(&other_timeframe).await.is_empty());

    let matching = MarketEvent::bar_close("BTCUSDT", Timeframe::H1, bar_time(1));
    let results = app.runtime.on_event(&matching).await;
    assert_eq!(results.len(), 1, "paused alerts are not evaluated");
    assert_eq!(results[0].alert_id, 1);
}

#[tokio::test]
async fn removing_an_alert_evicts_its_firing_state() {
    let app = TestRuntime::new();
    let definition = alert(
        1,
        vec![rsi_condition("c1", Operator::LessThan, 30.0)],
        LogicOp::And,
        FireMode::PerBar,
    );
    app.runtime.register_alert(definition.clone()).await;

    app.advance_bar(1, 25.0);
    let event = MarketEvent::bar_close("BTCUSDT", Timeframe::H1, bar_time(1));
    app.runtime.on_event(&event).await;
    assert_eq!(app.notifier.accepted().len(), 1);

    app.runtime.remove_alert(1).await;

    // A fresh registration starts with no last-fired memory, so the
    // same bar fires again
    app.runtime.register_alert(definition).await;
    let results = app.runtime.on_event(&event).await;
    assert!(results[0].would_fire);
    assert_eq!(app.notifier.accepted().len(), 2);
}

#[tokio::test]
async fn load_alerts_populates_the_registry_from_the_store() {
    let app = TestRuntime::new();
    app.store.insert_alert(alert(
        1,
        vec![rsi_condition("c1", Operator::LessThan, 30.0)],
        LogicOp::And,
        FireMode::PerBar,
    ));
    app.store.insert_alert(alert(
        2,
        vec![rsi_condition("c1", Operator::GreaterThan, 70.0)],
        LogicOp::And,
        FireMode::PerBar,
    ));

    let count = app.runtime.load_alerts().await.unwrap();
    assert_eq!(count, 2);

    app.advance_bar(1, 75.0);
    let event = MarketEvent::bar_close("BTCUSDT", Timeframe::H1, bar_time(1));
    let results = app.runtime.on_event(&event).await;
    assert_eq!(results.len(), 2);
    let fired: Vec<u64> = results.iter().filter(|r| r.would_fire).map(|r| r.alert_id).collect();
    assert_eq!(fired, vec![2]);
}

#[tokio::test]
async fn ticks_invalidate_forming_bar_caches() {
    let app = TestRuntime::new();
    app.runtime
        .register_alert(alert(
            1,
            vec![rsi_condition("c1", Operator::LessThan, 30.0)],
            LogicOp::And,
            FireMode::PerTick,
        ))
        .await;

    app.market_data
        .push_closed("BTCUSDT", Timeframe::H1, candle(1, 100.0));
    app.market_data
        .set_forming("BTCUSDT", Timeframe::H1, candle(2, 99.0));
    app.indicators.set("rsi", bar_time(2), "rsi", 28.0);

    let first = MarketEvent::tick(
        "BTCUSDT",
        Timeframe::H1,
        bar_time(2),
        bar_time(2) + chrono::Duration::seconds(5),
    );
    let results = app.runtime.on_event(&first).await;
    assert!(results[0].would_fire);
    assert_eq!(app.indicators.calls(), 1);

    // A later tick on the same forming bar must recompute, not serve
    // the stale forming-bar value
    let second = MarketEvent::tick(
        "BTCUSDT",
        Timeframe::H1,
        bar_time(2),
        bar_time(2) + chrono::Duration::seconds(10),
    );
    let results = app.runtime.on_event(&second).await;
    assert!(results[0].would_fire);
    assert_eq!(app.indicators.calls(), 2);
}

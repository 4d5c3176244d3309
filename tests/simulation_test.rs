mod common;

use common::*;
use kitchen_sim::config::SimulationConfig;
use kitchen_sim::console::Console;
use kitchen_sim::lifecycle::Restaurant;
use kitchen_sim::model::{OrderedDish, VisitorOrder};
use kitchen_sim::output::{JsonReportSink, ReportSink, RunReport};
use std::time::Duration;

fn visitor(name: &str, dishes: &[(u32, kitchen_sim::model::MenuDishId)]) -> VisitorOrder {
    VisitorOrder {
        visitor_name: name.into(),
        started: None,
        ended: None,
        total: 0.0,
        dishes: dishes
            .iter()
            .map(|&(id, menu_dish)| OrderedDish { id, menu_dish })
            .collect(),
    }
}

fn config() -> SimulationConfig {
    SimulationConfig {
        min_new_visitor_delay: 10,
        max_new_visitor_delay: 20,
        min_order_time_recognition_delay: 100,
        max_order_time_recognition_delay: 200,
        visitor_waiting_time: 20_000,
        ..quick_config()
    }
}

async fn run(config: SimulationConfig, visitors: Vec<VisitorOrder>) -> RunReport {
    let mut data = bakery();
    // enough flour for everybody
    data.products[0].quantity = 50.0;
    data.visitor_orders = visitors;
    let restaurant = Restaurant::start(config, data, Console::silent());
    tokio::time::timeout(Duration::from_secs(30), restaurant.run())
        .await
        .expect("simulation finishes")
        .expect("simulation succeeds")
}

#[tokio::test]
async fn test_every_visitor_is_served_or_turned_away() {
    let report = run(
        config(),
        vec![
            visitor("Ann", &[(1, BREAD)]),
            visitor("Bob", &[(2, BREAD), (3, SOUFFLE)]),
            visitor("Cid", &[(4, SOUFFLE)]),
        ],
    )
    .await;

    assert_eq!(report.visitors.len(), 3);
    let by_name = |name: &str| {
        report
            .visitors
            .iter()
            .find(|r| r.order.visitor_name == name)
            .unwrap_or_else(|| panic!("no report for {name}"))
    };
    assert_eq!(by_name("Ann").order.total, 120.0);
    assert_eq!(by_name("Ann").order.dishes.len(), 1);
    assert_eq!(by_name("Bob").order.total, 120.0, "the souffle was not on the menu");
    assert_eq!(by_name("Cid").order.total, 0.0);
    assert!(by_name("Cid").order.dishes.is_empty());
    assert!(report.visitors.iter().all(|r| r.order.ended.is_some()));

    assert_eq!(report.processes.len(), 2);
    assert!(report.processes.iter().all(|p| !p.active && p.operations.len() == 3));
    assert_eq!(report.operations.len(), 6);
    assert!(report
        .operations
        .iter()
        .all(|op| !op.active && op.cook.is_some() && op.ended.is_some()));
}

#[tokio::test]
async fn test_cancelled_orders_are_not_paid_for() {
    let config = SimulationConfig {
        order_cancellation_probability: 100,
        min_order_cancellation_delay: 10,
        max_order_cancellation_delay: 10,
        ..config()
    };
    let report = run(config, vec![visitor("Dee", &[(1, BREAD)])]).await;

    assert_eq!(report.visitors.len(), 1);
    assert_eq!(report.visitors[0].order.total, 0.0);
    let dishes = &report.visitors[0].order.dishes;
    assert_eq!(dishes.len(), 1, "the confirmed dishes stay on the report");
    assert_eq!(dishes[0].menu_dish, BREAD);
    assert!(report.processes.iter().all(|p| !p.active));
    assert!(report.operations.iter().all(|op| !op.active));
    assert!(report.operations.len() < 3, "cancelled before the bread was done");
}

#[tokio::test]
async fn test_reports_are_written_as_json() {
    let report = run(config(), vec![visitor("Eve", &[(1, BREAD)])]).await;
    let dir = tempfile::tempdir().expect("temp dir");
    JsonReportSink::new(dir.path()).write(&report).expect("write");

    for (file, key, count) in [
        ("operation_log.json", "operation_log", 3),
        ("process_log.json", "process_log", 1),
        ("visitor_order_log.json", "visitor_order_log", 1),
    ] {
        let text = std::fs::read_to_string(dir.path().join(file)).expect("read");
        let value: serde_json::Value = serde_json::from_str(&text).expect("json");
        let records = value[key].as_array().expect("array");
        assert_eq!(records.len(), count, "{file}");
    }
}

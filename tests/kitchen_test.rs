mod common;

use agent_fabric::{ActorAddress, ActorClient, Pattern, Performative, Probe, ServiceDescription};
use common::*;
use kitchen_sim::dish_actor::DishAgent;
use kitchen_sim::model::{
    CardId, CookId, EquipmentClass, EquipmentId, ExclusionReason, OrderId, OrderedDish, Outcome,
    ProductNeed,
};
use kitchen_sim::protocol::{
    capability, conversation, message, DishStatusReport, Grant, KitchenPayload,
};
use kitchen_sim::supervisor_actor::SupervisorAgent;
use std::time::Duration;

type KitchenProbe = Probe<KitchenPayload>;

// --- Helpers ---

async fn flour_level(probe: &mut KitchenProbe, warehouse: &ActorAddress) -> f64 {
    probe.send(
        message(Performative::Request, conversation::WAREHOUSE, KitchenPayload::StockQuery)
            .to(warehouse.clone()),
    );
    match expect(probe, "stock-levels").await.payload() {
        KitchenPayload::StockLevels(levels) => levels.get(&FLOUR).copied().unwrap_or(0.0),
        other => panic!("unexpected {other:?}"),
    }
}

async fn remaining(probe: &mut KitchenProbe, resource: &ActorAddress, conversation: &str) -> f64 {
    probe.send(
        message(Performative::Request, conversation, KitchenPayload::RemainingTimeQuery)
            .to(resource.clone()),
    );
    match expect(probe, "remaining-time").await.payload() {
        KitchenPayload::RemainingTime { seconds, .. } => *seconds,
        other => panic!("unexpected {other:?}"),
    }
}

fn reserve(seconds: f64, resource: &ActorAddress) -> kitchen_sim::protocol::KitchenMessage {
    message(
        Performative::Propose,
        conversation::COOK_RESERVING,
        KitchenPayload::Reserve { seconds },
    )
    .to(resource.clone())
}

fn release(conversation: &str, resource: &ActorAddress) -> kitchen_sim::protocol::KitchenMessage {
    message(Performative::Cancel, conversation, KitchenPayload::Release).to(resource.clone())
}

async fn actualize(probe: &mut KitchenProbe, menu: &ActorAddress) -> KitchenPayload {
    probe.send(
        message(
            Performative::Request,
            conversation::MENU_ACTUALIZATION,
            KitchenPayload::ActualizeMenu,
        )
        .to(menu.clone()),
    );
    expect(probe, "active-menu").await.payload().clone()
}

/// Registers `probe` as order 1 and spawns a bread dish for it.
async fn bread_for(kitchen: &TestKitchen, probe: &KitchenProbe) -> ActorAddress {
    register_order(kitchen, probe).await;
    let dish = spawn_dish(kitchen, 1, BREAD_CARD);
    kitchen.registered(capability::DISH, 1).await;
    dish
}

async fn register_order(kitchen: &TestKitchen, probe: &KitchenProbe) {
    kitchen
        .fabric
        .directory()
        .register(
            probe.address().clone(),
            ServiceDescription::new(capability::ORDER).with(capability::ATTR_ID, 1),
        )
        .await
        .expect("register order");
}

/// Dish `id` of order 1, cooked from `card`.
fn spawn_dish(kitchen: &TestKitchen, id: u32, card: CardId) -> ActorAddress {
    kitchen.fabric.spawn(DishAgent::new(
        kitchen.kitchen.clone(),
        OrderId(1),
        OrderedDish {
            id,
            menu_dish: BREAD,
        },
        card,
    ))
}

async fn dish_status(asker: &mut KitchenProbe, dish: &ActorAddress) -> DishStatusReport {
    asker.send(
        message(
            Performative::Request,
            conversation::KITCHEN_MANAGEMENT,
            KitchenPayload::DishStatusQuery,
        )
        .to(dish.clone()),
    );
    match expect(asker, "dish-status").await.payload() {
        KitchenPayload::DishStatus(status) => status.clone(),
        other => panic!("unexpected {other:?}"),
    }
}

fn start_cooking(dish: &ActorAddress) -> kitchen_sim::protocol::KitchenMessage {
    message(
        Performative::Request,
        conversation::KITCHEN_MANAGEMENT,
        KitchenPayload::StartCooking,
    )
    .to(dish.clone())
}

async fn dish_outcome(probe: &mut KitchenProbe) -> Outcome {
    match expect(probe, "dish-finished").await.payload() {
        KitchenPayload::DishFinished { outcome, .. } => outcome.clone(),
        other => panic!("unexpected {other:?}"),
    }
}

// --- Warehouse ---

#[tokio::test]
async fn test_warehouse_reserve_then_release_restores_stock() {
    let kitchen = TestKitchen::new(quick_config(), bakery());
    kitchen.open().await;
    let warehouse = kitchen.one(capability::WAREHOUSE).await;
    let mut probe = kitchen.fabric.probe("dish");
    let owner = probe.address().clone();
    let ask = |quantity: f64| {
        message(
            Performative::Request,
            conversation::WAREHOUSE,
            KitchenPayload::ReserveProducts {
                owner: owner.clone(),
                needs: vec![ProductNeed {
                    class: FLOUR,
                    quantity,
                }],
            },
        )
        .to(warehouse.clone())
    };

    probe.send(ask(3.0));
    let reply = expect(&mut probe, "products-reserved").await;
    assert_eq!(reply.performative(), Performative::Confirm);
    assert_eq!(flour_level(&mut probe, &warehouse).await, 2.0);

    // more than is left: refused, nothing taken
    probe.send(ask(2.5));
    let refused = expect(&mut probe, "products-unavailable").await;
    assert_eq!(refused.performative(), Performative::Disconfirm);
    assert_eq!(flour_level(&mut probe, &warehouse).await, 2.0);

    for _ in 0..2 {
        probe.send(
            message(
                Performative::Cancel,
                conversation::WAREHOUSE,
                KitchenPayload::ReleaseProducts {
                    owner: owner.clone(),
                },
            )
            .to(warehouse.clone()),
        );
    }
    assert_eq!(flour_level(&mut probe, &warehouse).await, 5.0, "released once, not twice");

    kitchen.fabric.shutdown().await;
}

// --- Resources ---

#[tokio::test]
async fn test_resource_is_held_by_one_proposer_at_a_time() {
    let kitchen = TestKitchen::new(quick_config(), bakery());
    kitchen.open().await;
    let cook = kitchen.one(capability::COOK).await;
    let mut first = kitchen.fabric.probe("first");
    let mut second = kitchen.fabric.probe("second");

    first.send(reserve(5.0, &cook));
    let granted = expect(&mut first, "granted").await;
    assert_eq!(granted.performative(), Performative::AcceptProposal);
    assert_eq!(granted.payload(), &KitchenPayload::Granted(Grant::Cook(CookId(1))));

    second.send(reserve(5.0, &cook));
    let refused = expect(&mut second, "refused").await;
    assert_eq!(refused.performative(), Performative::RejectProposal);

    let left = remaining(&mut second, &cook, conversation::COOK_RESERVING).await;
    assert!(left > 4.0 && left <= 5.0, "remaining {left}");

    // only the holder can give it back
    second.send(release(conversation::COOK_RESERVING, &cook));
    assert!(remaining(&mut second, &cook, conversation::COOK_RESERVING).await > 0.0);

    first.send(release(conversation::COOK_RESERVING, &cook));
    assert_eq!(remaining(&mut second, &cook, conversation::COOK_RESERVING).await, 0.0);
    second.send(reserve(5.0, &cook));
    expect(&mut second, "granted").await;

    kitchen.fabric.shutdown().await;
}

#[tokio::test]
async fn test_reservation_runs_out_and_renews() {
    let kitchen = TestKitchen::new(quick_config(), bakery());
    kitchen.open().await;
    let oven = kitchen.one(capability::EQUIPMENT).await;
    let mut probe = kitchen.fabric.probe("operation");
    let propose = |seconds: f64| {
        message(
            Performative::Propose,
            conversation::EQUIPMENT_RESERVING,
            KitchenPayload::Reserve { seconds },
        )
        .to(oven.clone())
    };

    probe.send(propose(0.05));
    assert_eq!(
        expect(&mut probe, "granted").await.payload(),
        &KitchenPayload::Granted(Grant::Equipment(EquipmentId(7)))
    );
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(remaining(&mut probe, &oven, conversation::EQUIPMENT_RESERVING).await, 0.0);

    let renew = message(
        Performative::Propose,
        conversation::EQUIPMENT_RESERVING,
        KitchenPayload::Renew { seconds: 10.0 },
    )
    .to(oven.clone());
    probe.send(propose(0.05));
    expect(&mut probe, "granted").await;
    probe.send(renew.clone());
    let renewed = expect(&mut probe, "granted").await;
    assert_eq!(renewed.performative(), Performative::AcceptProposal);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(remaining(&mut probe, &oven, conversation::EQUIPMENT_RESERVING).await > 9.0);

    // someone else cannot extend the holder's reservation
    let mut other = kitchen.fabric.probe("other");
    other.send(renew);
    let refused = expect(&mut other, "refused").await;
    assert_eq!(refused.performative(), Performative::RejectProposal);

    kitchen.fabric.shutdown().await;
}

#[tokio::test]
async fn test_lapsed_unit_is_negotiated_again() {
    const TOAST_CARD: CardId = CardId(40);
    let mut data = bakery();
    data.dish_cards.push(card(40, "Toast", vec![operation(0.1, Some(OVEN), 0.0)]));
    let kitchen = TestKitchen::new(quick_config(), data);
    kitchen.open().await;
    let cook = kitchen.one(capability::COOK).await;
    let oven = kitchen.one(capability::EQUIPMENT).await;

    // the cook is busy for a second, far longer than the toast's turn in the oven
    let mut busy_cook = kitchen.fabric.probe("busy-cook");
    busy_cook.send(reserve(1.0, &cook));
    expect(&mut busy_cook, "granted").await;

    let mut order = kitchen.fabric.probe("order");
    register_order(&kitchen, &order).await;
    let dish = spawn_dish(&kitchen, 1, TOAST_CARD);
    order.send(start_cooking(&dish));

    // the toast's oven reservation has run out by now
    tokio::time::sleep(Duration::from_millis(400)).await;
    let mut rival = kitchen.fabric.probe("rival");
    rival.send(
        message(
            Performative::Propose,
            conversation::EQUIPMENT_RESERVING,
            KitchenPayload::Reserve { seconds: 5.0 },
        )
        .to(oven.clone()),
    );
    expect(&mut rival, "granted").await;

    // the cook frees up at one second; the toast must not go into an oven it lost
    assert!(order
        .receive(&Pattern::kind("dish-finished"), Duration::from_millis(1500))
        .await
        .is_none());
    assert!(remaining(&mut rival, &oven, conversation::EQUIPMENT_RESERVING).await > 3.0);
    let operations = kitchen.kitchen.reports.operations.list().await.expect("operations");
    assert!(operations.iter().all(|op| op.started.is_none()), "{operations:?}");

    rival.send(release(conversation::EQUIPMENT_RESERVING, &oven));
    assert_eq!(dish_outcome(&mut order).await, Outcome::Served);
    let operations = kitchen.kitchen.reports.operations.list().await.expect("operations");
    assert_eq!(operations.len(), 1);
    assert_eq!(operations[0].equipment, Some(EquipmentId(7)));
    assert_eq!(operations[0].cook, Some(CookId(1)));

    kitchen.fabric.shutdown().await;
}

// --- Menu ---

#[tokio::test]
async fn test_menu_excludes_what_cannot_be_cooked() {
    let kitchen = TestKitchen::new(quick_config(), bakery());
    kitchen.open().await;
    let menu = kitchen.one(capability::MENU).await;
    let mut probe = kitchen.fabric.probe("supervisor");

    let first = actualize(&mut probe, &menu).await;
    let KitchenPayload::ActiveMenu { dishes, excluded } = &first else {
        panic!("unexpected {first:?}");
    };
    assert_eq!(dishes, &vec![BREAD]);
    assert!(excluded.contains(&(SOUFFLE, ExclusionReason::MissingEquipment(EquipmentClass(9)))));
    assert!(excluded.contains(&(CAKE, ExclusionReason::InsufficientProducts(FLOUR))));
    assert!(excluded.contains(&(OLD_PIE, ExclusionReason::Inactive)));

    // nothing changed in between: same answer
    assert_eq!(actualize(&mut probe, &menu).await, first);

    kitchen.fabric.shutdown().await;
}

#[tokio::test]
async fn test_menu_drops_dishes_that_would_take_too_long() {
    let config = kitchen_sim::config::SimulationConfig {
        dish_cooking_time_threshold: 0.5,
        ..quick_config()
    };
    let kitchen = TestKitchen::new(config, bakery());
    kitchen.open().await;
    let menu = kitchen.one(capability::MENU).await;
    let mut probe = kitchen.fabric.probe("supervisor");

    let KitchenPayload::ActiveMenu { dishes, excluded } = actualize(&mut probe, &menu).await else {
        panic!("no menu");
    };
    assert!(dishes.is_empty());
    assert!(excluded
        .iter()
        .any(|(dish, reason)| *dish == BREAD && matches!(reason, ExclusionReason::TooSlow { .. })));

    kitchen.fabric.shutdown().await;
}

// --- Supervisor ---

#[tokio::test]
async fn test_orders_are_accepted_for_available_dishes_only() {
    let kitchen = TestKitchen::new(quick_config(), bakery());
    kitchen.open().await;
    kitchen.fabric.spawn(SupervisorAgent::new(kitchen.kitchen.clone()));
    let supervisor = kitchen.one(capability::SUPERVISOR).await;
    let mut visitor = kitchen.fabric.probe("visitor");
    let place = |dishes: Vec<OrderedDish>| {
        message(
            Performative::Request,
            conversation::ORDER_CREATION,
            KitchenPayload::PlaceOrder {
                visitor: "Bob".into(),
                dishes,
            },
        )
        .to(supervisor.clone())
    };
    let bread = OrderedDish {
        id: 1,
        menu_dish: BREAD,
    };
    let souffle = OrderedDish {
        id: 2,
        menu_dish: SOUFFLE,
    };

    visitor.send(place(vec![bread, souffle]));
    let accepted = expect(&mut visitor, "order-accepted").await;
    assert_eq!(accepted.performative(), Performative::Confirm);
    let KitchenPayload::OrderAccepted { dishes, total, .. } = accepted.payload() else {
        panic!("unexpected {:?}", accepted.payload());
    };
    assert_eq!(dishes, &vec![bread]);
    assert_eq!(*total, 120.0);
    assert_eq!(kitchen.registered(capability::ORDER, 1).await.len(), 1);

    visitor.send(place(vec![OrderedDish {
        id: 3,
        menu_dish: SOUFFLE,
    }]));
    let rejected = expect(&mut visitor, "order-rejected").await;
    assert_eq!(rejected.performative(), Performative::Disconfirm);

    kitchen.fabric.shutdown().await;
}

#[tokio::test]
async fn test_one_cook_starts_one_of_two_waiting_dishes() {
    let config = kitchen_sim::config::SimulationConfig {
        kitchen_actualized_status_threshold: 300,
        ..quick_config()
    };
    let kitchen = TestKitchen::new(config, bakery());
    kitchen.open().await;
    let mut order = kitchen.fabric.probe("order");
    register_order(&kitchen, &order).await;
    let dishes = [spawn_dish(&kitchen, 1, BREAD_CARD), spawn_dish(&kitchen, 2, BREAD_CARD)];
    kitchen.registered(capability::DISH, 2).await;

    kitchen.fabric.spawn(SupervisorAgent::new(kitchen.kitchen.clone()));

    // the first cycle runs one window after the supervisor opens
    let mut cooking = None;
    for _ in 0..100 {
        for (index, dish) in dishes.iter().enumerate() {
            if dish_status(&mut order, dish).await == DishStatusReport::Cooking {
                cooking = Some(index);
            }
        }
        if cooking.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let cooking = cooking.expect("a dish started cooking");
    // the passed-over dish hears from the supervisor in the same cycle
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(
        dish_status(&mut order, &dishes[1 - cooking]).await,
        DishStatusReport::Waiting {
            card: BREAD_CARD,
            priority: 2
        },
        "passed over once"
    );

    kitchen.fabric.shutdown().await;
}

#[tokio::test]
async fn test_supervisor_waits_for_a_late_menu() {
    let config = kitchen_sim::config::SimulationConfig {
        registration_attempts: 200,
        ..quick_config()
    };
    let kitchen = TestKitchen::new(config, bakery());
    kitchen.fabric.spawn(SupervisorAgent::new(kitchen.kitchen.clone()));
    let supervisor = kitchen.one(capability::SUPERVISOR).await;
    let mut visitor = kitchen.fabric.probe("visitor");
    visitor.send(
        message(
            Performative::Request,
            conversation::ORDER_CREATION,
            KitchenPayload::PlaceOrder {
                visitor: "Bob".into(),
                dishes: vec![OrderedDish {
                    id: 1,
                    menu_dish: BREAD,
                }],
            },
        )
        .to(supervisor),
    );

    // held until the menu exists
    kitchen.open().await;
    expect(&mut visitor, "order-accepted").await;
    assert!(kitchen.fabric.halt_reason().is_none());

    kitchen.fabric.shutdown().await;
}

#[tokio::test]
async fn test_missing_menu_halts_the_kitchen() {
    let config = kitchen_sim::config::SimulationConfig {
        registration_attempts: 3,
        ..quick_config()
    };
    let kitchen = TestKitchen::new(config, bakery());
    kitchen.fabric.spawn(SupervisorAgent::new(kitchen.kitchen.clone()));

    let reason = tokio::time::timeout(WAIT, kitchen.fabric.halted())
        .await
        .expect("halted");
    assert!(reason.contains("No 'menu' registered after 3 lookups"), "{reason}");
    assert_eq!(kitchen.fabric.halt_reason(), Some(reason));

    kitchen.fabric.shutdown().await;
}

// --- Dish chain ---

#[tokio::test]
async fn test_dish_is_cooked_and_its_products_consumed() {
    let kitchen = TestKitchen::new(quick_config(), bakery());
    kitchen.open().await;
    let warehouse = kitchen.one(capability::WAREHOUSE).await;
    let mut order = kitchen.fabric.probe("order");
    let dish = bread_for(&kitchen, &order).await;

    order.send(
        message(
            Performative::Request,
            conversation::KITCHEN_MANAGEMENT,
            KitchenPayload::DishStatusQuery,
        )
        .to(dish.clone()),
    );
    assert_eq!(
        expect(&mut order, "dish-status").await.payload(),
        &KitchenPayload::DishStatus(DishStatusReport::Waiting {
            card: BREAD_CARD,
            priority: 1
        })
    );

    order.send(start_cooking(&dish));
    tokio::time::sleep(Duration::from_millis(100)).await;
    order.send(
        message(Performative::Request, conversation::ORDER_TIME, KitchenPayload::TimeQuery)
            .to(dish.clone()),
    );
    match expect(&mut order, "seconds").await.payload() {
        KitchenPayload::Seconds(left) => assert!(*left > 0.0 && *left < 2.0, "left {left}"),
        other => panic!("unexpected {other:?}"),
    }

    assert_eq!(dish_outcome(&mut order).await, Outcome::Served);
    assert_eq!(flour_level(&mut order, &warehouse).await, 2.0, "three units went into the bread");

    let operations = kitchen.kitchen.reports.operations.list().await.expect("operations");
    assert_eq!(operations.len(), 3);
    assert!(operations.iter().all(|op| !op.active && op.ended.is_some()));
    assert!(operations.iter().all(|op| op.cook == Some(CookId(1))));
    let in_oven = operations.iter().filter(|op| op.equipment == Some(EquipmentId(7)));
    assert_eq!(in_oven.count(), 1);
    let processes = kitchen.kitchen.reports.processes.list().await.expect("processes");
    assert_eq!(processes.len(), 1);
    assert_eq!(processes[0].operations.len(), 3);
    assert!(!processes[0].active);

    kitchen.fabric.shutdown().await;
}

#[tokio::test]
async fn test_cancel_during_an_operation_releases_everything() {
    let kitchen = TestKitchen::new(quick_config(), bakery());
    kitchen.open().await;
    let warehouse = kitchen.one(capability::WAREHOUSE).await;
    let cook = kitchen.one(capability::COOK).await;
    let oven = kitchen.one(capability::EQUIPMENT).await;
    let mut order = kitchen.fabric.probe("order");
    let dish = bread_for(&kitchen, &order).await;

    order.send(start_cooking(&dish));
    // second step (the oven) is under way
    tokio::time::sleep(Duration::from_millis(450)).await;
    order.send(
        message(Performative::Cancel, conversation::ORDER_COOKING, KitchenPayload::Cancel)
            .to(dish.clone()),
    );

    assert_eq!(dish_outcome(&mut order).await, Outcome::Cancelled);
    assert_eq!(flour_level(&mut order, &warehouse).await, 5.0);
    assert_eq!(remaining(&mut order, &cook, conversation::COOK_RESERVING).await, 0.0);
    assert_eq!(remaining(&mut order, &oven, conversation::EQUIPMENT_RESERVING).await, 0.0);

    let operations = kitchen.kitchen.reports.operations.list().await.expect("operations");
    assert_eq!(operations.len(), 2, "the third step never started");
    assert!(operations.iter().all(|op| !op.active));
    let processes = kitchen.kitchen.reports.processes.list().await.expect("processes");
    assert!(processes.iter().all(|p| !p.active && p.ended.is_some()));

    // the dish has left the directory
    assert!(kitchen
        .fabric
        .directory()
        .lookup(ServiceDescription::new(capability::DISH))
        .await
        .expect("lookup")
        .is_empty());

    kitchen.fabric.shutdown().await;
}

#[tokio::test]
async fn test_cancel_before_start_spawns_nothing() {
    let kitchen = TestKitchen::new(quick_config(), bakery());
    kitchen.open().await;
    let mut order = kitchen.fabric.probe("order");
    let dish = bread_for(&kitchen, &order).await;

    order.send(
        message(
            Performative::Request,
            conversation::KITCHEN_MANAGEMENT,
            KitchenPayload::IncreasePriority(2),
        )
        .to(dish.clone()),
    );
    order.send(
        message(
            Performative::Request,
            conversation::KITCHEN_MANAGEMENT,
            KitchenPayload::DishStatusQuery,
        )
        .to(dish.clone()),
    );
    assert_eq!(
        expect(&mut order, "dish-status").await.payload(),
        &KitchenPayload::DishStatus(DishStatusReport::Waiting {
            card: BREAD_CARD,
            priority: 3
        })
    );

    order.send(
        message(Performative::Cancel, conversation::ORDER_COOKING, KitchenPayload::Cancel)
            .to(dish.clone()),
    );
    assert_eq!(dish_outcome(&mut order).await, Outcome::Cancelled);
    assert!(kitchen
        .kitchen
        .reports
        .processes
        .list()
        .await
        .expect("processes")
        .is_empty());

    kitchen.fabric.shutdown().await;
}

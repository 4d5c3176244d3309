//! A tiny kitchen for agent-level tests: one cook, one oven, one flour lot, and a menu of
//! four dishes of which only bread can be cooked.

#![allow(dead_code)]

use agent_fabric::{
    ActorAddress, DirectoryActor, Fabric, FabricSettings, Pattern, Probe, ServiceDescription,
};
use kitchen_sim::clients::ReportClients;
use kitchen_sim::config::SimulationConfig;
use kitchen_sim::console::Console;
use kitchen_sim::data::KitchenData;
use kitchen_sim::kitchen::Kitchen;
use kitchen_sim::menu_actor::MenuAgent;
use kitchen_sim::model::*;
use kitchen_sim::protocol::{capability, KitchenMessage, KitchenPayload};
use kitchen_sim::report_actor;
use kitchen_sim::resource_actor;
use kitchen_sim::warehouse_actor::WarehouseAgent;
use std::sync::Arc;
use std::time::Duration;

pub const WAIT: Duration = Duration::from_secs(3);

pub const FLOUR: ProductClass = ProductClass(2);
pub const OVEN: EquipmentClass = EquipmentClass(3);
pub const KNEAD: OperationKind = OperationKind(1);

pub const BREAD: MenuDishId = MenuDishId(1);
pub const SOUFFLE: MenuDishId = MenuDishId(2);
pub const CAKE: MenuDishId = MenuDishId(3);
pub const OLD_PIE: MenuDishId = MenuDishId(4);

pub const BREAD_CARD: CardId = CardId(10);

pub fn operation(duration: f64, equipment: Option<EquipmentClass>, flour: f64) -> Operation {
    Operation {
        kind: KNEAD,
        equipment_class: equipment,
        duration,
        async_point: 0,
        products: if flour > 0.0 {
            vec![ProductNeed {
                class: FLOUR,
                quantity: flour,
            }]
        } else {
            Vec::new()
        },
    }
}

pub fn card(id: u32, name: &str, operations: Vec<Operation>) -> DishCard {
    DishCard {
        id: CardId(id),
        name: name.into(),
        description: String::new(),
        time: operations.iter().map(|op| op.duration).sum(),
        operations,
    }
}

fn menu_dish(id: MenuDishId, card: u32, price: f64, active: bool) -> MenuDish {
    MenuDish {
        id,
        card: CardId(card),
        price,
        active,
    }
}

/// Bread is three 0.3s steps, each taking one unit of flour; the oven is used in the middle.
pub fn bakery() -> KitchenData {
    KitchenData {
        menu: vec![
            menu_dish(BREAD, 10, 120.0, true),
            menu_dish(SOUFFLE, 20, 300.0, true),
            menu_dish(CAKE, 30, 250.0, true),
            menu_dish(OLD_PIE, 10, 90.0, false),
        ],
        cooks: vec![Cook {
            id: CookId(1),
            name: "Ann".into(),
            active: true,
        }],
        operation_types: vec![OperationType {
            id: KNEAD,
            name: "knead".into(),
        }],
        equipment_types: vec![EquipmentType {
            id: OVEN,
            name: "oven".into(),
        }],
        equipment: vec![Equipment {
            id: EquipmentId(7),
            class: OVEN,
            name: "Oven #1".into(),
            active: true,
        }],
        product_types: vec![ProductType {
            id: FLOUR,
            name: "flour".into(),
            is_food: true,
        }],
        products: vec![Product {
            id: ProductId(1),
            class: FLOUR,
            name: "Flour".into(),
            company: "Mill".into(),
            unit: "kg".into(),
            quantity: 5.0,
            cost: 30.0,
            delivered: None,
            valid_until: None,
        }],
        dish_cards: vec![
            card(
                10,
                "Bread",
                vec![
                    operation(0.3, None, 1.0),
                    operation(0.3, Some(OVEN), 1.0),
                    operation(0.3, None, 1.0),
                ],
            ),
            // needs a steamer nobody has
            card(20, "Souffle", vec![operation(0.2, Some(EquipmentClass(9)), 0.0)]),
            card(30, "Cake", vec![operation(0.2, None, 50.0)]),
        ],
        visitor_orders: Vec::new(),
    }
}

pub fn quick_config() -> SimulationConfig {
    SimulationConfig {
        kitchen_actualized_status_threshold: 50,
        order_cancellation_probability: 0,
        negotiation_backoff: 10,
        registration_attempts: 20,
        registration_retry_delay: 10,
        ..SimulationConfig::default()
    }
}

/// A fabric with a running directory and report ledgers.
pub struct TestKitchen {
    pub fabric: Fabric<KitchenPayload>,
    pub kitchen: Kitchen,
}

impl TestKitchen {
    pub fn new(config: SimulationConfig, data: KitchenData) -> Self {
        let (directory, client) = DirectoryActor::new(64);
        tokio::spawn(directory.run());
        let (operation_log, operations) = report_actor::new_operation_log();
        let (process_log, processes) = report_actor::new_process_log();
        let (visitor_log, visitors) = report_actor::new_visitor_log();
        tokio::spawn(operation_log.run(()));
        tokio::spawn(process_log.run(()));
        tokio::spawn(visitor_log.run(()));

        let fabric = Fabric::new(
            client,
            FabricSettings {
                registration_attempts: config.registration_attempts,
                retry_delay: Duration::from_millis(config.registration_retry_delay),
            },
        );
        let kitchen = Kitchen {
            config: Arc::new(config),
            data: Arc::new(data),
            reports: ReportClients {
                operations,
                processes,
                visitors,
            },
            console: Console::silent(),
        };
        Self { fabric, kitchen }
    }

    /// Spawns every resource and the warehouse, then the menu once they are registered.
    pub async fn open(&self) {
        let factor = self.kitchen.config.factor();
        for cook in &self.kitchen.data.cooks {
            self.fabric.spawn(resource_actor::cook(cook, factor));
        }
        for unit in &self.kitchen.data.equipment {
            self.fabric.spawn(resource_actor::equipment(unit, factor));
        }
        self.fabric.spawn(WarehouseAgent::new(&self.kitchen.data.products));
        self.registered(capability::COOK, self.kitchen.data.cooks.len()).await;
        self.registered(capability::EQUIPMENT, self.kitchen.data.equipment.len()).await;
        self.registered(capability::WAREHOUSE, 1).await;

        self.fabric.spawn(MenuAgent::new(self.kitchen.clone()));
        self.registered(capability::MENU, 1).await;
    }

    /// Waits until `count` agents offer `capability`.
    pub async fn registered(&self, capability: &str, count: usize) -> Vec<ActorAddress> {
        for _ in 0..200 {
            let found = self
                .fabric
                .directory()
                .lookup(ServiceDescription::new(capability))
                .await
                .expect("directory");
            if found.len() >= count {
                return found;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("{capability} never registered");
    }

    pub async fn one(&self, capability: &str) -> ActorAddress {
        self.registered(capability, 1).await.remove(0)
    }
}

/// Next message of `kind`, failing the test after [`WAIT`].
pub async fn expect(probe: &mut Probe<KitchenPayload>, kind: &'static str) -> Arc<KitchenMessage> {
    probe
        .receive(&Pattern::kind(kind), WAIT)
        .await
        .unwrap_or_else(|| panic!("no {kind} within {WAIT:?}"))
}

//! # Kitchen Protocol
//!
//! Every message exchanged by the kitchen agents carries a [`KitchenPayload`]. The
//! conversation tag says which exchange a message belongs to; the payload kind says what
//! it carries. Agents select on both, plus the correlation id when several exchanges of
//! the same kind can be in flight.
//!
//! | Conversation | Between | Performatives |
//! |---|---|---|
//! | `cook-reserving`, `equipment-reserving` | operation / menu -> resource | REQUEST, INFORM, PROPOSE, ACCEPT, REJECT, CANCEL |
//! | `warehouse` | menu / operation / dish -> warehouse | REQUEST, INFORM, CONFIRM, DISCONFIRM, CANCEL |
//! | `menu-actualization` | supervisor -> menu | REQUEST, INFORM |
//! | `time-calculation` | supervisor / order / process -> menu | REQUEST, INFORM |
//! | `order-creation` | visitor -> supervisor | REQUEST, CONFIRM, DISCONFIRM |
//! | `kitchen-management` | supervisor -> dish | REQUEST, INFORM |
//! | `dish-cooking` | dish <-> process <-> operation | REQUEST, INFORM, CANCEL |
//! | `order-cooking` | dish -> order -> visitor | INFORM, CANCEL |
//! | `order-time` | visitor -> order -> dish -> process -> operation | REQUEST, INFORM |
//! | `dismiss` | simulation -> order -> dish | REQUEST |
//! | `simulation` | visitor -> simulation -> driver | INFORM |

use crate::model::{
    CardId, CookId, EquipmentClass, EquipmentId, ExclusionReason, MenuDishId, OrderId,
    OrderedDish, Outcome, ProductClass, ProductNeed,
};
use agent_fabric::{ActorAddress, Message, Payload, Performative};
use std::collections::BTreeMap;

pub mod conversation {
    pub const COOK_RESERVING: &str = "cook-reserving";
    pub const EQUIPMENT_RESERVING: &str = "equipment-reserving";
    pub const WAREHOUSE: &str = "warehouse";
    pub const MENU_ACTUALIZATION: &str = "menu-actualization";
    pub const TIME_CALCULATION: &str = "time-calculation";
    pub const ORDER_CREATION: &str = "order-creation";
    pub const KITCHEN_MANAGEMENT: &str = "kitchen-management";
    pub const DISH_COOKING: &str = "dish-cooking";
    pub const ORDER_COOKING: &str = "order-cooking";
    pub const ORDER_TIME: &str = "order-time";
    pub const DISMISS: &str = "dismiss";
    pub const SIMULATION: &str = "simulation";
}

/// Directory capabilities and their attribute keys.
pub mod capability {
    pub const COOK: &str = "cook";
    pub const EQUIPMENT: &str = "equipment";
    pub const WAREHOUSE: &str = "warehouse";
    pub const MENU: &str = "menu";
    pub const SUPERVISOR: &str = "supervisor";
    pub const DISH: &str = "dish";
    pub const ORDER: &str = "order";
    pub const SIMULATION: &str = "simulation";

    pub const ATTR_ID: &str = "id";
    pub const ATTR_CLASS: &str = "class";
    pub const ATTR_ORDER: &str = "order";
}

/// The resource a successful proposal reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    Cook(CookId),
    Equipment(EquipmentId),
}

/// A dish's answer to the supervisor's status query.
#[derive(Debug, Clone, PartialEq)]
pub enum DishStatusReport {
    /// Holding a cook right now.
    Cooking,
    /// Cooked or cancelled.
    Done,
    Waiting { card: CardId, priority: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum KitchenPayload {
    // --- resources ---
    /// How long until you are free?
    RemainingTimeQuery,
    /// Scaled seconds until free; equipment also names its class.
    RemainingTime {
        seconds: f64,
        equipment_class: Option<EquipmentClass>,
    },
    /// Reserve for this many unscaled seconds.
    Reserve { seconds: f64 },
    Granted(Grant),
    Refused,
    /// The holder restarts its countdown at this many unscaled seconds. Granted again unless
    /// the reservation ran out and someone else holds it now.
    Renew { seconds: f64 },
    /// The holder gives the reservation back.
    Release,

    // --- warehouse ---
    StockQuery,
    StockLevels(BTreeMap<ProductClass, f64>),
    ReserveProducts {
        owner: ActorAddress,
        needs: Vec<ProductNeed>,
    },
    ProductsReserved,
    ProductsUnavailable { class: ProductClass },
    ReleaseProducts { owner: ActorAddress },
    ConsumeProducts { owner: ActorAddress },

    // --- menu ---
    ActualizeMenu,
    ActiveMenu {
        dishes: Vec<MenuDishId>,
        excluded: Vec<(MenuDishId, ExclusionReason)>,
    },
    /// Completion time of a card's operations, skipping the first `skip`.
    EstimateOperations { card: CardId, skip: usize },
    /// Completion time of several dishes sharing the kitchen.
    EstimateDishes { cards: Vec<CardId> },
    /// Effective wait time of each dish, in the order given.
    EstimateWaiting { dishes: Vec<(CardId, u32)> },
    Seconds(f64),
    WaitingTimes(Vec<f64>),

    // --- orders ---
    PlaceOrder {
        visitor: String,
        dishes: Vec<OrderedDish>,
    },
    OrderAccepted {
        order: OrderId,
        address: ActorAddress,
        dishes: Vec<OrderedDish>,
        total: f64,
    },
    OrderRejected,

    // --- scheduling ---
    DishStatusQuery,
    DishStatus(DishStatusReport),
    StartCooking,
    IncreasePriority(u32),

    // --- cooking ---
    /// Cooking result travelling up the chain.
    Finished(Outcome),
    DishFinished {
        dish: OrderedDish,
        outcome: Outcome,
    },
    OrderFinished {
        served: Vec<OrderedDish>,
        cancelled: bool,
    },
    /// Stop whatever you are doing for this dish or order.
    Cancel,
    /// How long until done, in scaled seconds?
    TimeQuery,
    Dismiss,

    // --- simulation ---
    VisitorLeft {
        visitor: String,
        order: Option<ActorAddress>,
    },
    SimulationFinished { visitors: usize },
}

impl Payload for KitchenPayload {
    fn kind(&self) -> &'static str {
        use KitchenPayload::*;
        match self {
            RemainingTimeQuery => "remaining-time-query",
            RemainingTime { .. } => "remaining-time",
            Reserve { .. } => "reserve",
            Granted(_) => "granted",
            Refused => "refused",
            Renew { .. } => "renew",
            Release => "release",
            StockQuery => "stock-query",
            StockLevels(_) => "stock-levels",
            ReserveProducts { .. } => "reserve-products",
            ProductsReserved => "products-reserved",
            ProductsUnavailable { .. } => "products-unavailable",
            ReleaseProducts { .. } => "release-products",
            ConsumeProducts { .. } => "consume-products",
            ActualizeMenu => "actualize-menu",
            ActiveMenu { .. } => "active-menu",
            EstimateOperations { .. } => "estimate-operations",
            EstimateDishes { .. } => "estimate-dishes",
            EstimateWaiting { .. } => "estimate-waiting",
            Seconds(_) => "seconds",
            WaitingTimes(_) => "waiting-times",
            PlaceOrder { .. } => "place-order",
            OrderAccepted { .. } => "order-accepted",
            OrderRejected => "order-rejected",
            DishStatusQuery => "dish-status-query",
            DishStatus(_) => "dish-status",
            StartCooking => "start-cooking",
            IncreasePriority(_) => "increase-priority",
            Finished(_) => "finished",
            DishFinished { .. } => "dish-finished",
            OrderFinished { .. } => "order-finished",
            Cancel => "cancel",
            TimeQuery => "time-query",
            Dismiss => "dismiss",
            VisitorLeft { .. } => "visitor-left",
            SimulationFinished { .. } => "simulation-finished",
        }
    }
}

/// Message type used throughout the kitchen.
pub type KitchenMessage = Message<KitchenPayload>;

/// Starts a message in `conversation`; receivers are added by the caller.
pub fn message(
    performative: Performative,
    conversation: &str,
    payload: KitchenPayload,
) -> KitchenMessage {
    Message::new(performative, conversation, payload)
}

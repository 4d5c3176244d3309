use crate::model::catalog::MenuDishId;
use crate::model::timestamp;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Sequence number the Supervisor hands to each accepted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u32);

impl From<u32> for OrderId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "order_{}", self.0)
    }
}

/// One line of a visitor's order: a unique line id and the menu dish it asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderedDish {
    #[serde(rename = "ord_dish_id")]
    pub id: u32,
    #[serde(rename = "menu_dish")]
    pub menu_dish: MenuDishId,
}

impl Display for OrderedDish {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ord_dish_{}", self.id)
    }
}

/// A visitor's order as scheduled in the input, and as reported at the end.
///
/// On input only the name and the dishes matter; the timestamps and the total are
/// filled in by the visitor while the simulation runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitorOrder {
    #[serde(rename = "vis_name")]
    pub visitor_name: String,
    #[serde(rename = "vis_ord_started", default, with = "timestamp::optional")]
    pub started: Option<NaiveDateTime>,
    #[serde(rename = "vis_ord_ended", default, with = "timestamp::optional")]
    pub ended: Option<NaiveDateTime>,
    #[serde(rename = "vis_ord_total", default)]
    pub total: f64,
    #[serde(rename = "vis_ord_dishes")]
    pub dishes: Vec<OrderedDish>,
}

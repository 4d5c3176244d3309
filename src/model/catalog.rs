//! Kitchen catalog: dish cards, the menu, staff, equipment and stock lots.
//!
//! Everything here is loaded once before the simulation starts and shared read-only
//! (behind an `Arc`) by every agent that needs it.

use crate::model::timestamp;
use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;

macro_rules! catalog_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl From<u32> for $name {
            fn from(id: u32) -> Self {
                Self(id)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, "_{}"), self.0)
            }
        }
    };
}

catalog_id!(CookId, "cook");
catalog_id!(EquipmentId, "equipment");
catalog_id!(
    /// Equipment type; operations name the class they need, not a unit.
    EquipmentClass,
    "equip_type"
);
catalog_id!(ProductId, "product");
catalog_id!(ProductClass, "prod_type");
catalog_id!(OperationKind, "oper_type");
catalog_id!(CardId, "card");
catalog_id!(MenuDishId, "menu_dish");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cook {
    #[serde(rename = "cook_id")]
    pub id: CookId,
    #[serde(rename = "cook_name")]
    pub name: String,
    #[serde(rename = "cook_active")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    #[serde(rename = "equip_id")]
    pub id: EquipmentId,
    #[serde(rename = "equip_type")]
    pub class: EquipmentClass,
    #[serde(rename = "equip_name")]
    pub name: String,
    #[serde(rename = "equip_active")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentType {
    #[serde(rename = "equip_type_id")]
    pub id: EquipmentClass,
    #[serde(rename = "equip_type_name")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductType {
    #[serde(rename = "prod_type_id")]
    pub id: ProductClass,
    #[serde(rename = "prod_type_name")]
    pub name: String,
    #[serde(rename = "prod_is_food", default)]
    pub is_food: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationType {
    #[serde(rename = "oper_type_id")]
    pub id: OperationKind,
    #[serde(rename = "oper_type_name")]
    pub name: String,
}

/// One delivered lot of a product class, as stored in the warehouse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "prod_item_id")]
    pub id: ProductId,
    #[serde(rename = "prod_item_type")]
    pub class: ProductClass,
    #[serde(rename = "prod_item_name", default)]
    pub name: String,
    #[serde(rename = "prod_item_company", default)]
    pub company: String,
    #[serde(rename = "prod_item_unit", default)]
    pub unit: String,
    #[serde(rename = "prod_item_quantity")]
    pub quantity: f64,
    #[serde(rename = "prod_item_cost", default)]
    pub cost: f64,
    #[serde(rename = "prod_item_delivered", default, with = "timestamp::optional")]
    pub delivered: Option<NaiveDateTime>,
    #[serde(rename = "prod_item_valid_until", default, with = "timestamp::optional")]
    pub valid_until: Option<NaiveDateTime>,
}

/// Quantity of one product class consumed by an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductNeed {
    #[serde(rename = "prod_type")]
    pub class: ProductClass,
    #[serde(rename = "prod_quantity")]
    pub quantity: f64,
}

/// One step of a dish card. `duration` is in unscaled seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "oper_type")]
    pub kind: OperationKind,
    #[serde(
        rename = "equip_type",
        default,
        deserialize_with = "equipment_class_or_none"
    )]
    pub equipment_class: Option<EquipmentClass>,
    #[serde(rename = "oper_time")]
    pub duration: f64,
    #[serde(rename = "oper_async_point", default)]
    pub async_point: i32,
    #[serde(rename = "oper_products", default)]
    pub products: Vec<ProductNeed>,
}

/// `-1` (or a missing field) means the operation needs no equipment.
fn equipment_class_or_none<'de, D>(deserializer: D) -> Result<Option<EquipmentClass>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?;
    Ok(raw
        .and_then(|class| u32::try_from(class).ok())
        .map(EquipmentClass))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DishCard {
    #[serde(rename = "card_id")]
    pub id: CardId,
    #[serde(rename = "dish_name")]
    pub name: String,
    #[serde(rename = "card_descr", default)]
    pub description: String,
    #[serde(rename = "card_time", default)]
    pub time: f64,
    pub operations: Vec<Operation>,
}

impl DishCard {
    /// Total quantity per product class needed to cook the whole card.
    pub fn product_needs(&self) -> Vec<ProductNeed> {
        let mut needs: Vec<ProductNeed> = Vec::new();
        for need in self.operations.iter().flat_map(|op| op.products.iter()) {
            match needs.iter_mut().find(|n| n.class == need.class) {
                Some(existing) => existing.quantity += need.quantity,
                None => needs.push(need.clone()),
            }
        }
        needs
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuDish {
    #[serde(rename = "menu_dish_id")]
    pub id: MenuDishId,
    #[serde(rename = "menu_dish_card")]
    pub card: CardId,
    #[serde(rename = "menu_dish_price", default)]
    pub price: f64,
    #[serde(rename = "menu_dish_active", default = "active_by_default")]
    pub active: bool,
}

fn active_by_default() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_without_equipment() {
        let json = r#"{"oper_type": 4, "equip_type": -1, "oper_time": 0.5,
            "oper_async_point": 0, "oper_products": [{"prod_type": 2, "prod_quantity": 0.3}]}"#;
        let op: Operation = serde_json::from_str(json).expect("operation");
        assert_eq!(op.equipment_class, None);
        assert_eq!(op.products[0].class, ProductClass(2));

        let with_oven: Operation =
            serde_json::from_str(r#"{"oper_type": 1, "equip_type": 7, "oper_time": 2}"#)
                .expect("operation");
        assert_eq!(with_oven.equipment_class, Some(EquipmentClass(7)));
        assert!(with_oven.products.is_empty());
    }

    #[test]
    fn test_product_needs_are_summed_per_class() {
        let card = DishCard {
            id: CardId(1),
            name: "Omelette".into(),
            description: String::new(),
            time: 0.0,
            operations: vec![
                Operation {
                    kind: OperationKind(1),
                    equipment_class: None,
                    duration: 1.0,
                    async_point: 0,
                    products: vec![ProductNeed { class: ProductClass(3), quantity: 2.0 }],
                },
                Operation {
                    kind: OperationKind(2),
                    equipment_class: Some(EquipmentClass(1)),
                    duration: 1.0,
                    async_point: 0,
                    products: vec![
                        ProductNeed { class: ProductClass(3), quantity: 1.0 },
                        ProductNeed { class: ProductClass(5), quantity: 0.5 },
                    ],
                },
            ],
        };
        let needs = card.product_needs();
        assert_eq!(needs.len(), 2);
        assert_eq!(needs[0].quantity, 3.0);
        assert_eq!(needs[1].class, ProductClass(5));
    }
}

//! # Input Bundle
//!
//! [`KitchenData`] is everything the simulation reads before it starts. Each input is a JSON
//! file named after its contents and holding one array under the same key, for example
//! `cookers.json`:
//!
//! ```json
//! { "cookers": [ { "cook_id": 1, "cook_name": "Ann", "cook_active": true } ] }
//! ```

use crate::model::{
    CardId, Cook, DishCard, Equipment, EquipmentType, MenuDish, MenuDishId, OperationType,
    Product, ProductType, VisitorOrder,
};
use serde::de::DeserializeOwned;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DataError {
    #[error("Cannot read {file}: {message}")]
    Io { file: String, message: String },

    #[error("Cannot decode {file}: {message}")]
    Decode { file: String, message: String },

    #[error("{file} has no '{key}' array")]
    MissingKey { file: String, key: String },
}

/// The catalog, the stock and the visitor schedule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KitchenData {
    pub menu: Vec<MenuDish>,
    pub cooks: Vec<Cook>,
    pub operation_types: Vec<OperationType>,
    pub equipment_types: Vec<EquipmentType>,
    pub equipment: Vec<Equipment>,
    pub product_types: Vec<ProductType>,
    pub products: Vec<Product>,
    pub dish_cards: Vec<DishCard>,
    pub visitor_orders: Vec<VisitorOrder>,
}

impl KitchenData {
    /// Loads every input file from `dir`. `operation_types.json` is only read when
    /// `with_operation_types` is set.
    pub fn load(dir: &Path, with_operation_types: bool) -> Result<Self, DataError> {
        let data = Self {
            menu: read_list(dir, "menu_dishes")?,
            cooks: read_list(dir, "cookers")?,
            operation_types: if with_operation_types {
                read_list(dir, "operation_types")?
            } else {
                Vec::new()
            },
            equipment_types: read_list(dir, "equipment_type")?,
            equipment: read_list(dir, "equipment")?,
            product_types: read_list(dir, "product_types")?,
            products: read_list(dir, "products")?,
            dish_cards: read_list(dir, "dish_cards")?,
            visitor_orders: read_list(dir, "visitors_orders")?,
        };
        info!(
            menu = data.menu.len(),
            cooks = data.cooks.len(),
            equipment = data.equipment.len(),
            lots = data.products.len(),
            visitors = data.visitor_orders.len(),
            "Input loaded"
        );
        Ok(data)
    }

    pub fn card(&self, id: CardId) -> Option<&DishCard> {
        self.dish_cards.iter().find(|card| card.id == id)
    }

    pub fn menu_dish(&self, id: MenuDishId) -> Option<&MenuDish> {
        self.menu.iter().find(|dish| dish.id == id)
    }

    /// The card cooked for a menu dish.
    pub fn card_for(&self, id: MenuDishId) -> Option<&DishCard> {
        self.menu_dish(id).and_then(|dish| self.card(dish.card))
    }

    /// Name shown to people; falls back to the menu id.
    pub fn dish_name(&self, id: MenuDishId) -> String {
        self.card_for(id)
            .map(|card| card.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    pub fn price(&self, id: MenuDishId) -> f64 {
        self.menu_dish(id).map(|dish| dish.price).unwrap_or(0.0)
    }
}

fn read_list<T: DeserializeOwned>(dir: &Path, key: &str) -> Result<Vec<T>, DataError> {
    let file = format!("{key}.json");
    let path = dir.join(&file);
    debug!(%file, "Reading");

    let text = std::fs::read_to_string(&path).map_err(|e| DataError::Io {
        file: file.clone(),
        message: e.to_string(),
    })?;
    let mut root: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&text).map_err(|e| DataError::Decode {
            file: file.clone(),
            message: e.to_string(),
        })?;
    let list = root.remove(key).ok_or_else(|| DataError::MissingKey {
        file: file.clone(),
        key: key.to_string(),
    })?;
    serde_json::from_value(list).map_err(|e| DataError::Decode {
        file,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).expect("write input");
    }

    fn minimal_bundle(dir: &Path) {
        write(
            dir,
            "menu_dishes.json",
            r#"{"menu_dishes": [{"menu_dish_id": 1, "menu_dish_card": 10, "menu_dish_price": 120.5, "menu_dish_active": true}]}"#,
        );
        write(
            dir,
            "cookers.json",
            r#"{"cookers": [{"cook_id": 1, "cook_name": "Ann", "cook_active": true}]}"#,
        );
        write(
            dir,
            "equipment_type.json",
            r#"{"equipment_type": [{"equip_type_id": 3, "equip_type_name": "oven"}]}"#,
        );
        write(
            dir,
            "equipment.json",
            r#"{"equipment": [{"equip_id": 7, "equip_type": 3, "equip_name": "Oven #1", "equip_active": true}]}"#,
        );
        write(
            dir,
            "product_types.json",
            r#"{"product_types": [{"prod_type_id": 2, "prod_type_name": "flour", "prod_is_food": true}]}"#,
        );
        write(
            dir,
            "products.json",
            r#"{"products": [{"prod_item_id": 1, "prod_item_type": 2, "prod_item_name": "Flour",
                "prod_item_company": "Mill", "prod_item_unit": "kg", "prod_item_quantity": 5,
                "prod_item_cost": 30, "prod_item_delivered": "2023-01-01T08:00:00",
                "prod_item_valid_until": "2023-06-01T08:00:00"}]}"#,
        );
        write(
            dir,
            "dish_cards.json",
            r#"{"dish_cards": [{"card_id": 10, "dish_name": "Bread", "card_descr": "", "card_time": 5,
                "operations": [{"oper_type": 1, "equip_type": 3, "oper_time": 5, "oper_async_point": 0,
                "oper_products": [{"prod_type": 2, "prod_quantity": 1}]}]}]}"#,
        );
        write(
            dir,
            "visitors_orders.json",
            r#"{"visitors_orders": [{"vis_name": "Bob", "vis_ord_started": "", "vis_ord_ended": "",
                "vis_ord_total": 0, "vis_ord_dishes": [{"ord_dish_id": 1, "menu_dish": 1}]}]}"#,
        );
    }

    #[test]
    fn test_load_bundle() {
        let dir = tempfile::tempdir().expect("temp dir");
        minimal_bundle(dir.path());

        let data = KitchenData::load(dir.path(), false).expect("load");
        assert_eq!(data.cooks.len(), 1);
        assert!(data.operation_types.is_empty());
        assert_eq!(data.dish_name(MenuDishId(1)), "Bread");
        assert_eq!(data.price(MenuDishId(1)), 120.5);
        assert_eq!(data.products[0].quantity, 5.0);
        assert_eq!(data.visitor_orders[0].dishes[0].menu_dish, MenuDishId(1));
    }

    #[test]
    fn test_operation_types_required_when_checked() {
        let dir = tempfile::tempdir().expect("temp dir");
        minimal_bundle(dir.path());

        let error = KitchenData::load(dir.path(), true).expect_err("missing file");
        assert!(matches!(error, DataError::Io { ref file, .. } if file == "operation_types.json"));
    }

    #[test]
    fn test_wrong_key_and_bad_json() {
        let dir = tempfile::tempdir().expect("temp dir");
        minimal_bundle(dir.path());
        write(dir.path(), "cookers.json", r#"{"cooks": []}"#);
        assert!(matches!(
            KitchenData::load(dir.path(), false),
            Err(DataError::MissingKey { .. })
        ));

        write(dir.path(), "cookers.json", r#"{"cookers": [{"cook_id": "one"}]}"#);
        assert!(matches!(
            KitchenData::load(dir.path(), false),
            Err(DataError::Decode { .. })
        ));
    }
}

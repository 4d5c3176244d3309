//! Which menu dishes the kitchen can cook right now.
//!
//! A dish stays on the menu only if every check passes, in this order: the menu entry is
//! active, its card exists, every operation kind is known (when enabled), the warehouse
//! holds enough of every product for the whole card, every equipment class it needs has a
//! unit, and it is projected to finish within the threshold. The first failing check is
//! the recorded reason.

use crate::data::KitchenData;
use crate::model::{DishCard, ExclusionReason, MenuDish, MenuDishId, ProductClass};
use crate::time_model::KitchenSnapshot;
use std::collections::BTreeMap;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rules {
    pub check_operation_kinds: bool,
    pub factor: f64,
    /// Scaled seconds.
    pub threshold: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Actualization {
    pub active: Vec<MenuDishId>,
    pub excluded: Vec<(MenuDishId, ExclusionReason)>,
}

pub fn actualize(
    data: &KitchenData,
    snapshot: &KitchenSnapshot,
    stock: &BTreeMap<ProductClass, f64>,
    rules: &Rules,
) -> Actualization {
    let mut result = Actualization::default();
    for dish in &data.menu {
        match check(data, dish, snapshot, stock, rules) {
            Ok(()) => result.active.push(dish.id),
            Err(reason) => result.excluded.push((dish.id, reason)),
        }
    }
    result
}

fn check(
    data: &KitchenData,
    dish: &MenuDish,
    snapshot: &KitchenSnapshot,
    stock: &BTreeMap<ProductClass, f64>,
    rules: &Rules,
) -> Result<(), ExclusionReason> {
    if !dish.active {
        return Err(ExclusionReason::Inactive);
    }
    let card = data
        .card(dish.card)
        .ok_or(ExclusionReason::UnknownCard(dish.card))?;

    if rules.check_operation_kinds {
        check_kinds(data, card)?;
    }

    for need in card.product_needs() {
        let free = stock.get(&need.class).copied().unwrap_or(0.0);
        if free + EPSILON < need.quantity {
            return Err(ExclusionReason::InsufficientProducts(need.class));
        }
    }

    if let Some(class) = card
        .operations
        .iter()
        .filter_map(|op| op.equipment_class)
        .find(|&class| !snapshot.has_equipment(class))
    {
        return Err(ExclusionReason::MissingEquipment(class));
    }

    let seconds = snapshot.completion_time(&card.operations, rules.factor);
    if seconds > rules.threshold {
        return Err(ExclusionReason::TooSlow {
            seconds,
            threshold: rules.threshold,
        });
    }
    Ok(())
}

fn check_kinds(data: &KitchenData, card: &DishCard) -> Result<(), ExclusionReason> {
    match card
        .operations
        .iter()
        .find(|op| !data.operation_types.iter().any(|known| known.id == op.kind))
    {
        Some(op) => Err(ExclusionReason::MissingOperationKind(op.kind)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        CardId, EquipmentClass, Operation, OperationKind, OperationType, ProductNeed,
    };

    const OVEN: EquipmentClass = EquipmentClass(1);
    const FLOUR: ProductClass = ProductClass(1);

    fn op(kind: u32, class: Option<EquipmentClass>, duration: f64, flour: f64) -> Operation {
        Operation {
            kind: OperationKind(kind),
            equipment_class: class,
            duration,
            async_point: 0,
            products: if flour > 0.0 {
                vec![ProductNeed { class: FLOUR, quantity: flour }]
            } else {
                Vec::new()
            },
        }
    }

    fn card(id: u32, operations: Vec<Operation>) -> DishCard {
        DishCard {
            id: CardId(id),
            name: format!("dish {id}"),
            description: String::new(),
            time: 0.0,
            operations,
        }
    }

    fn menu_dish(id: u32, card: u32, active: bool) -> MenuDish {
        MenuDish {
            id: MenuDishId(id),
            card: CardId(card),
            price: 10.0,
            active,
        }
    }

    fn kitchen() -> KitchenData {
        KitchenData {
            menu: vec![
                menu_dish(1, 10, true),  // bread: mix, then bake
                menu_dish(2, 20, true),  // salad: chop only
                menu_dish(3, 10, false), // inactive bread
                menu_dish(4, 99, true),  // no such card
            ],
            operation_types: vec![
                OperationType { id: OperationKind(1), name: "mix".into() },
                OperationType { id: OperationKind(2), name: "bake".into() },
                OperationType { id: OperationKind(3), name: "chop".into() },
            ],
            dish_cards: vec![
                card(10, vec![op(1, None, 0.5, 1.0), op(2, Some(OVEN), 1.0, 1.0)]),
                card(20, vec![op(3, None, 0.5, 0.0)]),
            ],
            ..KitchenData::default()
        }
    }

    fn rules() -> Rules {
        Rules {
            check_operation_kinds: true,
            factor: 1.0,
            threshold: 3.0,
        }
    }

    fn free_kitchen(ovens: usize) -> KitchenSnapshot {
        KitchenSnapshot::from_remaining_times(
            std::iter::once((None, 0.0)).chain((0..ovens).map(|_| (Some(OVEN), 0.0))),
        )
    }

    fn stock(flour: f64) -> BTreeMap<ProductClass, f64> {
        BTreeMap::from([(FLOUR, flour)])
    }

    #[test]
    fn test_everything_available() {
        let result = actualize(&kitchen(), &free_kitchen(1), &stock(5.0), &rules());
        assert_eq!(result.active, vec![MenuDishId(1), MenuDishId(2)]);
        assert_eq!(
            result.excluded,
            vec![
                (MenuDishId(3), ExclusionReason::Inactive),
                (MenuDishId(4), ExclusionReason::UnknownCard(CardId(99))),
            ]
        );
    }

    #[test]
    fn test_dish_without_equipment_is_excluded() {
        let result = actualize(&kitchen(), &free_kitchen(0), &stock(5.0), &rules());
        assert_eq!(result.active, vec![MenuDishId(2)]);
        assert!(result
            .excluded
            .contains(&(MenuDishId(1), ExclusionReason::MissingEquipment(OVEN))));
    }

    #[test]
    fn test_needs_are_summed_over_the_card() {
        // bread needs 1 + 1 flour
        let result = actualize(&kitchen(), &free_kitchen(1), &stock(1.5), &rules());
        assert!(result
            .excluded
            .contains(&(MenuDishId(1), ExclusionReason::InsufficientProducts(FLOUR))));
        assert_eq!(result.active, vec![MenuDishId(2)]);
    }

    #[test]
    fn test_unknown_operation_kind_only_when_checked() {
        let mut data = kitchen();
        data.operation_types.retain(|kind| kind.id != OperationKind(3));

        let checked = actualize(&data, &free_kitchen(1), &stock(5.0), &rules());
        assert!(checked.excluded.contains(&(
            MenuDishId(2),
            ExclusionReason::MissingOperationKind(OperationKind(3))
        )));

        let unchecked = Rules {
            check_operation_kinds: false,
            ..rules()
        };
        let result = actualize(&data, &free_kitchen(1), &stock(5.0), &unchecked);
        assert!(result.active.contains(&MenuDishId(2)));
    }

    #[test]
    fn test_slow_dish_is_excluded() {
        // oven busy for 2.5s: bread would take 3.5s
        let busy = KitchenSnapshot::from_remaining_times([(None, 0.0), (Some(OVEN), 2.5)]);
        let result = actualize(&kitchen(), &busy, &stock(5.0), &rules());

        assert_eq!(result.active, vec![MenuDishId(2)]);
        assert!(result.excluded.iter().any(|(id, reason)| *id == MenuDishId(1)
            && matches!(reason, ExclusionReason::TooSlow { seconds, .. } if *seconds == 3.5)));
    }

    #[test]
    fn test_repeated_check_gives_same_menu() {
        let data = kitchen();
        let snapshot = free_kitchen(1);
        let first = actualize(&data, &snapshot, &stock(1.5), &rules());
        let second = actualize(&data, &snapshot, &stock(1.5), &rules());
        assert_eq!(first, second);
    }
}

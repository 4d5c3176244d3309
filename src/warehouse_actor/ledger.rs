//! Stock bookkeeping behind the warehouse agent.
//!
//! Stock is kept as the lots it was delivered in, in load order. Reserving moves quantity
//! out of lots into holds, one hold per lot touched, so that a release puts every unit
//! back into the lot it came from. Holds end either released (back to the lots) or
//! consumed (gone for good). For every product class:
//!
//! `free + held + consumed == initial`

use crate::model::{Product, ProductClass, ProductId, ProductNeed};
use std::collections::BTreeMap;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
struct Lot {
    product: ProductId,
    class: ProductClass,
    quantity: f64,
}

#[derive(Debug, Clone)]
struct Hold<O> {
    owner: O,
    lot: usize,
    quantity: f64,
}

#[derive(Debug, Clone)]
pub struct StockLedger<O> {
    lots: Vec<Lot>,
    holds: Vec<Hold<O>>,
    initial: BTreeMap<ProductClass, f64>,
    consumed: BTreeMap<ProductClass, f64>,
}

impl<O: Clone + PartialEq> StockLedger<O> {
    pub fn new(products: &[Product]) -> Self {
        let mut initial = BTreeMap::new();
        let lots = products
            .iter()
            .map(|product| {
                let quantity = product.quantity.max(0.0);
                *initial.entry(product.class).or_insert(0.0) += quantity;
                Lot {
                    product: product.id,
                    class: product.class,
                    quantity,
                }
            })
            .collect();
        Self {
            lots,
            holds: Vec::new(),
            initial,
            consumed: BTreeMap::new(),
        }
    }

    pub fn available(&self, class: ProductClass) -> f64 {
        self.lots
            .iter()
            .filter(|lot| lot.class == class)
            .map(|lot| lot.quantity)
            .sum()
    }

    /// Free quantity of every class ever loaded.
    pub fn levels(&self) -> BTreeMap<ProductClass, f64> {
        self.initial
            .keys()
            .map(|&class| (class, self.available(class)))
            .collect()
    }

    pub fn held(&self, class: ProductClass) -> f64 {
        self.holds
            .iter()
            .filter(|hold| self.lots[hold.lot].class == class)
            .map(|hold| hold.quantity)
            .sum()
    }

    pub fn consumed(&self, class: ProductClass) -> f64 {
        self.consumed.get(&class).copied().unwrap_or(0.0)
    }

    pub fn initial(&self, class: ProductClass) -> f64 {
        self.initial.get(&class).copied().unwrap_or(0.0)
    }

    /// First class that cannot be covered, if any. Pure query.
    pub fn check(&self, needs: &[ProductNeed]) -> Result<(), ProductClass> {
        for (class, quantity) in totals(needs) {
            if self.available(class) + EPSILON < quantity {
                return Err(class);
            }
        }
        Ok(())
    }

    /// Reserves every need for `owner`, or nothing at all. Returns the number of lots touched.
    pub fn reserve(&mut self, owner: &O, needs: &[ProductNeed]) -> Result<usize, ProductClass> {
        self.check(needs)?;

        let mut touched = 0;
        for (class, mut remaining) in totals(needs) {
            for (index, lot) in self.lots.iter_mut().enumerate() {
                if remaining <= EPSILON {
                    break;
                }
                if lot.class != class || lot.quantity <= EPSILON {
                    continue;
                }
                let taken = lot.quantity.min(remaining);
                lot.quantity -= taken;
                remaining -= taken;
                self.holds.push(Hold {
                    owner: owner.clone(),
                    lot: index,
                    quantity: taken,
                });
                touched += 1;
            }
        }
        Ok(touched)
    }

    /// Puts everything `owner` holds back into its lots. Releasing twice is a no-op.
    pub fn release(&mut self, owner: &O) -> f64 {
        let mut returned = 0.0;
        let lots = &mut self.lots;
        self.holds.retain(|hold| {
            if &hold.owner != owner {
                return true;
            }
            let lot = &mut lots[hold.lot];
            lot.quantity = (lot.quantity + hold.quantity).max(0.0);
            returned += hold.quantity;
            false
        });
        returned
    }

    /// Drops everything `owner` holds: the products went into a dish.
    pub fn consume(&mut self, owner: &O) -> f64 {
        let mut eaten = 0.0;
        let lots = &self.lots;
        let consumed = &mut self.consumed;
        self.holds.retain(|hold| {
            if &hold.owner != owner {
                return true;
            }
            *consumed.entry(lots[hold.lot].class).or_insert(0.0) += hold.quantity;
            eaten += hold.quantity;
            false
        });
        eaten
    }

    /// Lots `owner` currently draws from, in reservation order.
    pub fn lots_held_by(&self, owner: &O) -> Vec<ProductId> {
        self.holds
            .iter()
            .filter(|hold| &hold.owner == owner)
            .map(|hold| self.lots[hold.lot].product)
            .collect()
    }
}

/// Sums needs per class, keeping first-seen order.
fn totals(needs: &[ProductNeed]) -> Vec<(ProductClass, f64)> {
    let mut totals: Vec<(ProductClass, f64)> = Vec::new();
    for need in needs {
        match totals.iter_mut().find(|(class, _)| *class == need.class) {
            Some((_, quantity)) => *quantity += need.quantity,
            None => totals.push((need.class, need.quantity)),
        }
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLOUR: ProductClass = ProductClass(1);
    const MILK: ProductClass = ProductClass(2);

    fn lot(id: u32, class: ProductClass, quantity: f64) -> Product {
        Product {
            id: ProductId(id),
            class,
            name: String::new(),
            company: String::new(),
            unit: "kg".into(),
            quantity,
            cost: 0.0,
            delivered: None,
            valid_until: None,
        }
    }

    fn need(class: ProductClass, quantity: f64) -> ProductNeed {
        ProductNeed { class, quantity }
    }

    fn conserved(ledger: &StockLedger<&str>, class: ProductClass) -> bool {
        let total = ledger.available(class) + ledger.held(class) + ledger.consumed(class);
        (total - ledger.initial(class)).abs() < EPSILON
    }

    #[test]
    fn test_reserve_then_release_restores_stock() {
        let mut ledger = StockLedger::new(&[lot(1, FLOUR, 5.0)]);

        assert_eq!(ledger.reserve(&"dish-1", &[need(FLOUR, 3.0)]), Ok(1));
        assert_eq!(ledger.available(FLOUR), 2.0);
        assert!(conserved(&ledger, FLOUR));

        assert_eq!(ledger.release(&"dish-1"), 3.0);
        assert_eq!(ledger.available(FLOUR), 5.0);
        assert_eq!(ledger.release(&"dish-1"), 0.0, "second release is a no-op");
        assert_eq!(ledger.available(FLOUR), 5.0);
    }

    #[test]
    fn test_lots_are_depleted_in_load_order() {
        let mut ledger = StockLedger::new(&[lot(1, FLOUR, 2.0), lot(2, MILK, 4.0), lot(3, FLOUR, 4.0)]);

        assert_eq!(ledger.reserve(&"a", &[need(FLOUR, 3.0)]), Ok(2));
        assert_eq!(ledger.lots_held_by(&"a"), vec![ProductId(1), ProductId(3)]);

        ledger.release(&"a");
        assert_eq!(ledger.reserve(&"b", &[need(FLOUR, 1.0)]), Ok(1));
        assert_eq!(ledger.lots_held_by(&"b"), vec![ProductId(1)], "returned units go back to lot 1");
    }

    #[test]
    fn test_failed_reservation_changes_nothing() {
        let mut ledger = StockLedger::new(&[lot(1, FLOUR, 5.0), lot(2, MILK, 1.0)]);

        let result = ledger.reserve(&"greedy", &[need(FLOUR, 2.0), need(MILK, 2.0)]);
        assert_eq!(result, Err(MILK));
        assert_eq!(ledger.available(FLOUR), 5.0);
        assert_eq!(ledger.held(FLOUR), 0.0);

        assert_eq!(ledger.check(&[need(FLOUR, 3.0), need(FLOUR, 3.0)]), Err(FLOUR), "needs are summed");
        assert_eq!(ledger.check(&[need(ProductClass(9), 0.1)]), Err(ProductClass(9)));
    }

    #[test]
    fn test_consumption_keeps_the_books_balanced() {
        let mut ledger = StockLedger::new(&[lot(1, FLOUR, 5.0), lot(2, MILK, 3.0)]);
        ledger.reserve(&"soup", &[need(FLOUR, 1.5), need(MILK, 1.0)]).expect("soup");
        ledger.reserve(&"cake", &[need(FLOUR, 2.0)]).expect("cake");

        assert_eq!(ledger.consume(&"soup"), 2.5);
        assert_eq!(ledger.release(&"soup"), 0.0, "consumed holds cannot be released");
        assert!(conserved(&ledger, FLOUR));
        assert!(conserved(&ledger, MILK));
        assert_eq!(ledger.available(FLOUR), 1.5);
        assert_eq!(ledger.consumed(MILK), 1.0);

        let levels = ledger.levels();
        assert_eq!(levels.get(&MILK), Some(&2.0));
    }
}

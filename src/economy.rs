use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::world::{ItemKind, TownId};

/// Supply pressure constant: the price halves once local supply reaches
/// this many units.
const PRICE_FALLOFF: u64 = 20;

/// Per-town supply tracking with scarcity-derived prices.
///
/// Quantities are non-negative by construction; prices are monotonic in
/// scarcity and never fall below one coin. The producer-never-buys-back
/// rule lives with the delivery caller, not here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EconomyLedger {
    supplies: HashMap<TownId, HashMap<ItemKind, u64>>,
}

impl EconomyLedger {
    /// Start tracking a town with zero supply for every item.
    pub fn register_town(&mut self, town: TownId) {
        let entry = self.supplies.entry(town).or_default();
        for item in ItemKind::ALL {
            entry.entry(item).or_insert(0);
        }
    }

    pub fn is_registered(&self, town: TownId) -> bool {
        self.supplies.contains_key(&town)
    }

    pub fn add_supply(&mut self, town: TownId, item: ItemKind, quantity: u64) {
        if quantity == 0 {
            return;
        }
        let Some(entry) = self.supplies.get_mut(&town) else {
            warn!(town = town.raw(), ?item, "supply added to unregistered town; registering");
            self.register_town(town);
            return self.add_supply(town, item, quantity);
        };
        *entry.entry(item).or_insert(0) += quantity;
    }

    pub fn supply(&self, town: TownId, item: ItemKind) -> u64 {
        self.supplies
            .get(&town)
            .and_then(|items| items.get(&item))
            .copied()
            .unwrap_or(0)
    }

    /// Current buy price at a town: the item's base price scaled down as
    /// local supply grows, floored at one coin. Unregistered towns fall
    /// back to the base price.
    pub fn buy_price(&self, town: TownId, item: ItemKind) -> u64 {
        let base = item.base_price();
        match self.supplies.get(&town) {
            Some(items) => {
                let supply = items.get(&item).copied().unwrap_or(0);
                (base * PRICE_FALLOFF / (PRICE_FALLOFF + supply)).max(1)
            }
            None => {
                warn!(town = town.raw(), ?item, "price queried for unregistered town");
                base
            }
        }
    }

    /// Items with positive supply at a town, sorted for deterministic
    /// output.
    pub fn available_items(&self, town: TownId) -> Vec<ItemKind> {
        let mut items: Vec<ItemKind> = self
            .supplies
            .get(&town)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(_, &quantity)| quantity > 0)
                    .map(|(&item, _)| item)
                    .collect()
            })
            .unwrap_or_default();
        items.sort();
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn town() -> TownId {
        TownId::from_raw(0)
    }

    #[test]
    fn price_decreases_with_supply_and_never_hits_zero() {
        let mut ledger = EconomyLedger::default();
        let id = town();
        ledger.register_town(id);
        let mut last = ledger.buy_price(id, ItemKind::Wood);
        assert_eq!(last, ItemKind::Wood.base_price());
        for _ in 0..50 {
            ledger.add_supply(id, ItemKind::Wood, 25);
            let price = ledger.buy_price(id, ItemKind::Wood);
            assert!(price <= last, "price must not rise with supply");
            assert!(price >= 1, "price must never fall below one coin");
            last = price;
        }
        assert_eq!(last, 1);
    }

    #[test]
    fn available_items_lists_only_positive_supply() {
        let mut ledger = EconomyLedger::default();
        let id = town();
        ledger.register_town(id);
        assert!(ledger.available_items(id).is_empty());
        ledger.add_supply(id, ItemKind::Ore, 3);
        ledger.add_supply(id, ItemKind::Grain, 1);
        assert_eq!(
            ledger.available_items(id),
            vec![ItemKind::Grain, ItemKind::Ore]
        );
    }

    #[test]
    fn unregistered_town_price_falls_back_to_base() {
        let ledger = EconomyLedger::default();
        assert_eq!(
            ledger.buy_price(town(), ItemKind::Stone),
            ItemKind::Stone.base_price()
        );
    }

    #[test]
    fn unregistered_supply_add_registers_and_keeps_quantity() {
        let mut ledger = EconomyLedger::default();
        let id = town();
        ledger.add_supply(id, ItemKind::Fish, 4);
        assert!(ledger.is_registered(id));
        assert_eq!(ledger.supply(id, ItemKind::Fish), 4);
    }
}

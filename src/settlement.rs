use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agent::{Agent, Role};
use crate::world::{Tier, TownId, World};

/// A village binds to the nearest city within this many grid units; any
/// village farther from every city stays independent and untaxed.
pub const OWNERSHIP_RADIUS: f32 = 100.0;

/// Fixed bootstrap roles. Every settlement gets the minimum functional
/// crew; counts are constants, not rolls.
pub const VILLAGE_ROLES: [Role; 4] = [
    Role::Elder,
    Role::Transporter,
    Role::Peasant,
    Role::Peasant,
];

pub const CITY_ROLES: [Role; 10] = [
    Role::Mayor,
    Role::Guard,
    Role::Guard,
    Role::Guard,
    Role::Guard,
    Role::Transporter,
    Role::Transporter,
    Role::Transporter,
    Role::TaxCollector,
    Role::TaxCollector,
];

pub fn initial_roles(tier: Tier) -> &'static [Role] {
    match tier {
        Tier::Village => &VILLAGE_ROLES,
        Tier::City => &CITY_ROLES,
    }
}

/// Per-town treasury and ownership links. The gold ledger can never go
/// negative: deposits saturate and spends clamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    town: TownId,
    gold: u64,
    income_total: u64,
    owned_villages: Vec<TownId>,
    parent_city: Option<TownId>,
    /// Rotation cursor over owned villages for tax routes.
    pub(crate) next_tax_target: usize,
}

impl Settlement {
    pub fn new(town: TownId) -> Self {
        Self {
            town,
            gold: 0,
            income_total: 0,
            owned_villages: Vec::new(),
            parent_city: None,
            next_tax_target: 0,
        }
    }

    pub fn town(&self) -> TownId {
        self.town
    }

    pub fn gold(&self) -> u64 {
        self.gold
    }

    pub fn income_total(&self) -> u64 {
        self.income_total
    }

    /// Trade revenue: counts toward the income statistic as well as the
    /// treasury.
    pub fn add_income(&mut self, amount: u64) {
        self.gold = self.gold.saturating_add(amount);
        self.income_total = self.income_total.saturating_add(amount);
    }

    /// Plain treasury deposit (courier drop-offs, taxes).
    pub fn add_gold(&mut self, amount: u64) {
        self.gold = self.gold.saturating_add(amount);
    }

    /// Withdraw up to `amount`; returns what was actually taken.
    pub fn spend(&mut self, amount: u64) -> u64 {
        let taken = amount.min(self.gold);
        self.gold -= taken;
        taken
    }

    pub fn add_owned_village(&mut self, village: TownId) {
        if !self.owned_villages.contains(&village) {
            self.owned_villages.push(village);
        }
    }

    pub fn set_parent_city(&mut self, city: TownId) {
        self.parent_city = Some(city);
    }

    pub fn parent_city(&self) -> Option<TownId> {
        self.parent_city
    }

    pub fn owned_villages(&self) -> &[TownId] {
        &self.owned_villages
    }
}

/// Bootstrap every town's settlement and its fixed-role population.
/// Idempotent per town: already-populated towns are skipped.
pub fn populate_all_towns(world: &mut World) {
    for id in world.town_ids() {
        if world.settlement(id).is_some() {
            continue;
        }
        let (tier, position) = {
            let town = &world.towns[&id];
            (town.tier, town.position)
        };
        for &role in initial_roles(tier) {
            world.spawn_agent(Agent::new(role, Some(id), position));
        }
        world.settlements.insert(id, Settlement::new(id));
        info!(
            town = id.raw(),
            ?tier,
            agents = initial_roles(tier).len(),
            "settlement populated"
        );
    }
}

/// Bind each village to its nearest city within [`OWNERSHIP_RADIUS`].
/// Runs once post-spawn; villages out of range keep no parent and are
/// never taxed.
pub fn assign_village_ownership(world: &mut World) {
    let town_ids = world.town_ids();
    for id in town_ids {
        let (tier, position) = {
            let town = &world.towns[&id];
            (town.tier, town.position)
        };
        if tier != Tier::Village {
            continue;
        }
        let Some(city) = world.nearest_city(position) else {
            continue;
        };
        if world.towns[&city].position.distance(position) > OWNERSHIP_RADIUS {
            continue;
        }
        if let Some(settlement) = world.settlement_mut(id) {
            settlement.set_parent_city(city);
        }
        if let Some(settlement) = world.settlement_mut(city) {
            settlement.add_owned_village(id);
        }
    }
}

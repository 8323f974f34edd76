use tracing::{debug, warn};

use crate::agent::{Job, ARRIVE_EPSILON};
use crate::world::{AgentId, ItemKind, SimEvent, Tier, TownId, World};

/// Settle a completed goods delivery at a town.
///
/// A town never buys its own produce: matching deliveries are stored in
/// full with no currency movement. Everything else splits 50/50 into a
/// stored half (warehouse if one was purchased, market supply otherwise)
/// and a sold half credited at the pre-delivery buy price. Revenue from a
/// sale at a foreign city rides home as agent gold with a return delivery
/// job; local sales credit the destination's income on the spot.
pub fn settle_delivery(
    world: &mut World,
    agent_id: AgentId,
    town_id: TownId,
    item: ItemKind,
    quantity: u64,
) {
    if quantity == 0 {
        return;
    }
    let Some(town) = world.towns.get(&town_id) else {
        warn!(town = town_id.raw(), "delivery to unknown town dropped");
        return;
    };
    let produces_item = town.produces == Some(item);
    let tier = town.tier;

    if produces_item {
        store(world, town_id, item, quantity);
        world.push_event(SimEvent::DeliverySettled {
            town: town_id,
            item,
            stored: quantity,
            sold: 0,
            revenue: 0,
            carried_home: false,
        });
        return;
    }

    let sold = quantity / 2;
    let stored = quantity - sold;
    let price = world.ledger.buy_price(town_id, item);
    let revenue = price * sold;

    store(world, town_id, item, stored);
    world.ledger.add_supply(town_id, item, sold);

    let home = world.agents.get(&agent_id).and_then(|agent| agent.home);
    let foreign_city_sale = tier == Tier::City && home != Some(town_id);

    if foreign_city_sale {
        if let Some(agent) = world.agents.get_mut(&agent_id) {
            agent.gold = agent.gold.saturating_add(revenue);
        }
        if let Some(home_id) = home {
            let home_position = world.towns.get(&home_id).map(|town| town.position);
            if let (Some(position), Some(agent)) =
                (home_position, world.agents.get_mut(&agent_id))
            {
                agent.assign_job(Job::deliver(home_id, position));
            }
        }
    } else if let Some(settlement) = world.settlements.get_mut(&town_id) {
        settlement.add_income(revenue);
    } else {
        warn!(town = town_id.raw(), "sale at unpopulated town; revenue dropped");
    }

    debug!(
        town = town_id.raw(),
        ?item,
        stored,
        sold,
        revenue,
        foreign_city_sale,
        "delivery settled"
    );
    world.push_event(SimEvent::DeliverySettled {
        town: town_id,
        item,
        stored,
        sold,
        revenue,
        carried_home: foreign_city_sale,
    });
}

/// Stored halves land in the warehouse when the town bought one, in the
/// market ledger otherwise.
fn store(world: &mut World, town_id: TownId, item: ItemKind, quantity: u64) {
    if quantity == 0 {
        return;
    }
    let warehouse = world
        .towns
        .get_mut(&town_id)
        .and_then(|town| town.warehouse.as_mut());
    match warehouse {
        Some(warehouse) => warehouse.store(item, quantity),
        None => world.ledger.add_supply(town_id, item, quantity),
    }
}

/// Drop carried gold into the home treasury once the courier is standing
/// in their home town.
pub fn deposit_carried_gold(world: &mut World, agent_id: AgentId) {
    let Some(agent) = world.agents.get(&agent_id) else {
        return;
    };
    if agent.gold == 0 {
        return;
    }
    let Some(home_id) = agent.home else {
        return;
    };
    let Some(home) = world.towns.get(&home_id) else {
        return;
    };
    if agent.position.distance(home.position) >= ARRIVE_EPSILON {
        return;
    }
    let amount = agent.gold;
    if let Some(settlement) = world.settlements.get_mut(&home_id) {
        settlement.add_gold(amount);
    } else {
        warn!(town = home_id.raw(), "deposit at unpopulated home town; gold kept");
        return;
    }
    if let Some(agent) = world.agents.get_mut(&agent_id) {
        agent.gold = 0;
    }
    world.push_event(SimEvent::GoldDeposited {
        town: home_id,
        agent: agent_id,
        amount,
    });
}

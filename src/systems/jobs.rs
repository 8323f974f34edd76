use anyhow::Result;
use rand::Rng;

use crate::agent::{Job, Role};
use crate::engine::{System, SystemContext};
use crate::rng::SystemRng;
use crate::terrain::TerrainGrid;
use crate::world::{ItemKind, Tier, TownId, Vec2, World};

/// Seconds between reassignment sweeps; idle agents are not polled every
/// tick.
const REASSIGN_INTERVAL_SECONDS: f32 = 5.0;
/// Flat per-sweep chance an idle worker picks up a new job. No minimum
/// idle duration beyond the sweep interval.
const REASSIGN_CHANCE: f32 = 0.3;
/// Gather sites land within this range of the agent's town.
const SITE_RANGE: f32 = 15.0;
const SITE_ATTEMPTS: u32 = 12;

/// Periodic job dispatch: gather work for idle villagers and transporters,
/// tax routes for idle collectors in cities that own villages.
pub struct JobSystem {
    accumulator: f32,
}

impl JobSystem {
    pub fn new() -> Self {
        Self { accumulator: 0.0 }
    }
}

impl Default for JobSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for JobSystem {
    fn name(&self) -> &str {
        "jobs"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        if world.clock.is_paused() {
            return Ok(());
        }
        self.accumulator += ctx.dt_seconds;
        if self.accumulator < REASSIGN_INTERVAL_SECONDS {
            return Ok(());
        }
        self.accumulator -= REASSIGN_INTERVAL_SECONDS;

        for town_id in world.town_ids() {
            if !world.town_in_view(town_id) {
                continue;
            }
            reassign_workers(world, town_id, rng);
            assign_tax_routes(world, town_id);
        }
        Ok(())
    }
}

/// Give each idle, empty-handed worker a 30% shot at a fresh gather job
/// delivering to the nearest city.
fn reassign_workers(world: &mut World, town_id: TownId, rng: &mut SystemRng<'_>) {
    let town_position = match world.towns.get(&town_id) {
        Some(town) => town.position,
        None => return,
    };
    let destination = world.nearest_city(town_position).unwrap_or(town_id);
    let destination_position = match world.towns.get(&destination) {
        Some(town) => town.position,
        None => return,
    };

    let candidates: Vec<_> = world.agents_of(town_id).to_vec();
    for agent_id in candidates {
        let eligible = world
            .agents
            .get(&agent_id)
            .map(|agent| {
                agent.role.is_worker()
                    && agent.is_idle()
                    && agent.carried.is_none()
                    && agent.gold == 0
            })
            .unwrap_or(false);
        if !eligible || !rng.chance(REASSIGN_CHANCE) {
            continue;
        }
        let item = *rng.pick(&ItemKind::ALL).expect("item list is non-empty");
        let site = find_gather_site(&world.terrain, rng, town_position, item);
        if let Some(agent) = world.agents.get_mut(&agent_id) {
            agent.assign_job(Job::gather(item, site, destination, destination_position));
        }
    }
}

/// Send every idle tax collector of a city to the next owned village in
/// rotation. Villages beyond the ownership radius never appear here.
fn assign_tax_routes(world: &mut World, city_id: TownId) {
    if world.towns.get(&city_id).map(|town| town.tier) != Some(Tier::City) {
        return;
    }
    let owned: Vec<TownId> = world
        .settlements
        .get(&city_id)
        .map(|settlement| settlement.owned_villages().to_vec())
        .unwrap_or_default();
    if owned.is_empty() {
        return;
    }

    let collectors: Vec<_> = world
        .agents_of(city_id)
        .iter()
        .copied()
        .filter(|id| {
            world
                .agents
                .get(id)
                .map(|agent| agent.role == Role::TaxCollector && agent.is_idle() && agent.gold == 0)
                .unwrap_or(false)
        })
        .collect();

    for collector_id in collectors {
        let cursor = world
            .settlements
            .get_mut(&city_id)
            .map(|settlement| {
                let cursor = settlement.next_tax_target;
                settlement.next_tax_target = settlement.next_tax_target.wrapping_add(1);
                cursor
            })
            .unwrap_or(0);
        let village_id = owned[cursor % owned.len()];
        let Some(village_position) = world.towns.get(&village_id).map(|town| town.position) else {
            continue;
        };
        if let Some(agent) = world.agents.get_mut(&collector_id) {
            agent.assign_job(Job::collect_tax(village_id, village_position));
        }
    }
}

/// World-gen pass: roughly half of every village's peasants start out
/// with a gather job feeding their own village.
pub fn assign_villager_jobs(world: &mut World, rng: &mut SystemRng<'_>) {
    for town_id in world.town_ids() {
        let (tier, position) = match world.towns.get(&town_id) {
            Some(town) => (town.tier, town.position),
            None => continue,
        };
        if tier != Tier::Village {
            continue;
        }
        let peasants: Vec<_> = world
            .agents_of(town_id)
            .iter()
            .copied()
            .filter(|id| {
                world
                    .agents
                    .get(id)
                    .map(|agent| agent.role == Role::Peasant)
                    .unwrap_or(false)
            })
            .collect();
        for peasant_id in peasants {
            if !rng.chance(0.5) {
                continue;
            }
            let item = *rng.pick(&ItemKind::ALL).expect("item list is non-empty");
            let site = find_gather_site(&world.terrain, rng, position, item);
            if let Some(agent) = world.agents.get_mut(&peasant_id) {
                agent.assign_job(Job::gather(item, site, town_id, position));
            }
        }
    }
}

/// Sample nearby cells until one matches the item's biome; the last
/// candidate stands in when nothing fits.
fn find_gather_site(
    terrain: &TerrainGrid,
    rng: &mut SystemRng<'_>,
    origin: Vec2,
    item: ItemKind,
) -> Vec2 {
    let width = terrain.width() as f32;
    let height = terrain.height() as f32;
    let mut candidate = origin;
    for _ in 0..SITE_ATTEMPTS {
        candidate = Vec2::new(
            (origin.x + rng.gen_range(-SITE_RANGE..SITE_RANGE)).clamp(0.0, width - 1.0),
            (origin.y + rng.gen_range(-SITE_RANGE..SITE_RANGE)).clamp(0.0, height - 1.0),
        );
        let cell = terrain.cell(candidate.x.round() as i64, candidate.y.round() as i64);
        if item.found_in(cell.biome) {
            return candidate;
        }
    }
    candidate
}

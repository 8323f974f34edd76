use std::collections::HashSet;

use anyhow::Result;
use rand::Rng;
use tracing::warn;

use crate::agent::{Job, JobKind, JobPhase, GATHER_MINUTES};
use crate::engine::{System, SystemContext};
use crate::rng::SystemRng;
use crate::systems::delivery;
use crate::world::{AgentId, ItemKind, SimEvent, TownId, Vec2, World};

/// Units gathered per job, rolled on completion.
const YIELD_MIN: u64 = 4;
const YIELD_MAX: u64 = 8;
/// Share of a village treasury taken per tax visit.
const TAX_DIVISOR: u64 = 10;
/// How far a roamer drifts per wander leg.
const WANDER_RANGE: f32 = 20.0;

enum AgentAction {
    SettleDelivery {
        town: TownId,
        item: ItemKind,
        quantity: u64,
    },
    CollectTax {
        village: TownId,
    },
    TryDeposit,
}

/// Drives every live agent's job/travel state machine. Agents homed in
/// towns outside the viewer's radius are frozen; roamers always update.
pub struct AgentSystem;

impl AgentSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AgentSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for AgentSystem {
    fn name(&self) -> &str {
        "agents"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let sim_dt = world.clock.scaled(ctx.dt_seconds);
        if sim_dt <= 0.0 {
            return Ok(());
        }

        let mut party_members: HashSet<AgentId> = HashSet::new();
        for party in world.parties.values() {
            party_members.extend(party.members.iter().copied());
        }

        let mut live: Vec<AgentId> = Vec::new();
        for town_id in world.town_ids() {
            if world.town_in_view(town_id) {
                live.extend_from_slice(world.agents_of(town_id));
            }
        }
        live.extend(
            world
                .roamers
                .iter()
                .filter(|id| !party_members.contains(*id))
                .copied(),
        );
        live.sort();

        for agent_id in live {
            for action in advance_agent(world, agent_id, sim_dt, rng) {
                match action {
                    AgentAction::SettleDelivery {
                        town,
                        item,
                        quantity,
                    } => delivery::settle_delivery(world, agent_id, town, item, quantity),
                    AgentAction::CollectTax { village } => {
                        collect_tax(world, agent_id, village);
                    }
                    AgentAction::TryDeposit => delivery::deposit_carried_gold(world, agent_id),
                }
            }
        }
        Ok(())
    }
}

/// One agent's tick: move, work, and report world-level effects back to
/// the caller. Missing data never panics; a malformed agent just skips
/// its turn.
fn advance_agent(
    world: &mut World,
    agent_id: AgentId,
    sim_dt: f32,
    rng: &mut SystemRng<'_>,
) -> Vec<AgentAction> {
    let mut actions = Vec::new();
    let (job, home, gold) = match world.agents.get(&agent_id) {
        Some(agent) => (agent.job.clone(), agent.home, agent.gold),
        None => return actions,
    };

    match job {
        None => {
            if home.is_none() {
                wander(world, agent_id, sim_dt, rng);
            } else if gold > 0 {
                actions.push(AgentAction::TryDeposit);
            }
        }
        Some(mut job) => {
            let roads = &world.roads;
            let Some(agent) = world.agents.get_mut(&agent_id) else {
                return actions;
            };
            match job.phase {
                JobPhase::ToSite => {
                    let target = job.site.unwrap_or(job.destination_position);
                    if agent.advance_toward(target, sim_dt, roads) {
                        match job.kind {
                            JobKind::Gather(_) => {
                                job.phase = JobPhase::Gathering {
                                    remaining_minutes: GATHER_MINUTES,
                                };
                                agent.job = Some(job);
                            }
                            JobKind::CollectTax => {
                                agent.clear_job();
                                actions.push(AgentAction::CollectTax {
                                    village: job.destination,
                                });
                            }
                            JobKind::DeliverGoods => {
                                // Delivery jobs never carry a site; normalize.
                                job.phase = JobPhase::ToDestination;
                                agent.job = Some(job);
                            }
                        }
                    } else {
                        agent.job = Some(job);
                    }
                }
                JobPhase::Gathering { remaining_minutes } => {
                    let remaining = remaining_minutes - sim_dt / 60.0;
                    if remaining <= 0.0 {
                        if let JobKind::Gather(item) = job.kind {
                            let quantity = rng.gen_range(YIELD_MIN..=YIELD_MAX);
                            agent.carried = Some((item, quantity));
                        }
                        job.phase = JobPhase::ToDestination;
                    } else {
                        job.phase = JobPhase::Gathering {
                            remaining_minutes: remaining,
                        };
                    }
                    agent.job = Some(job);
                }
                JobPhase::ToDestination => {
                    if agent.advance_toward(job.destination_position, sim_dt, roads) {
                        agent.clear_job();
                        if let Some((item, quantity)) = agent.carried.take() {
                            actions.push(AgentAction::SettleDelivery {
                                town: job.destination,
                                item,
                                quantity,
                            });
                        }
                        if agent.gold > 0 {
                            actions.push(AgentAction::TryDeposit);
                        }
                    } else {
                        agent.job = Some(job);
                    }
                }
            }
        }
    }
    actions
}

/// Solo roamers drift between random land targets.
fn wander(world: &mut World, agent_id: AgentId, sim_dt: f32, rng: &mut SystemRng<'_>) {
    let target = match world.agents.get(&agent_id).and_then(|a| a.wander_target) {
        Some(target) => target,
        None => {
            let target = pick_wander_target(world, agent_id, rng);
            if let Some(agent) = world.agents.get_mut(&agent_id) {
                agent.wander_target = Some(target);
            }
            target
        }
    };
    let roads = &world.roads;
    if let Some(agent) = world.agents.get_mut(&agent_id) {
        if agent.advance_toward(target, sim_dt, roads) {
            agent.wander_target = None;
        }
    }
}

/// A tax visit takes a fixed share of the village treasury and sends the
/// collector home with the coin. An empty treasury still costs the trip.
fn collect_tax(world: &mut World, collector_id: AgentId, village_id: TownId) {
    let amount = match world.settlements.get_mut(&village_id) {
        Some(settlement) => {
            let share = settlement.gold() / TAX_DIVISOR;
            settlement.spend(share)
        }
        None => {
            warn!(village = village_id.raw(), "tax route to unpopulated village");
            0
        }
    };
    let home = world.agents.get(&collector_id).and_then(|agent| agent.home);
    if let Some(agent) = world.agents.get_mut(&collector_id) {
        agent.gold = agent.gold.saturating_add(amount);
    }
    if let Some(home_id) = home {
        if let Some(position) = world.towns.get(&home_id).map(|town| town.position) {
            if let Some(agent) = world.agents.get_mut(&collector_id) {
                agent.assign_job(Job::deliver(home_id, position));
            }
        }
        world.push_event(SimEvent::TaxCollected {
            city: home_id,
            village: village_id,
            collector: collector_id,
            amount,
        });
    }
}

/// Random land point near the roamer; falls back to the last candidate if
/// the terrain refuses to cooperate.
fn pick_wander_target(world: &World, agent_id: AgentId, rng: &mut SystemRng<'_>) -> Vec2 {
    let origin = world
        .agents
        .get(&agent_id)
        .map(|agent| agent.position)
        .unwrap_or_default();
    let width = world.terrain.width() as f32;
    let height = world.terrain.height() as f32;
    let mut candidate = origin;
    for _ in 0..8 {
        candidate = Vec2::new(
            (origin.x + rng.gen_range(-WANDER_RANGE..WANDER_RANGE)).clamp(0.0, width - 1.0),
            (origin.y + rng.gen_range(-WANDER_RANGE..WANDER_RANGE)).clamp(0.0, height - 1.0),
        );
        let cell = world
            .terrain
            .cell(candidate.x.round() as i64, candidate.y.round() as i64);
        if !cell.biome.is_water() {
            return candidate;
        }
    }
    candidate
}

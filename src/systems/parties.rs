use anyhow::Result;
use rand::Rng;

use crate::agent::ARRIVE_EPSILON;
use crate::engine::{System, SystemContext};
use crate::party::{
    Party, PartyTask, GATHER_SECONDS, IDLE_SECONDS, PARTY_SPEED, TRADE_SECONDS,
};
use crate::rng::SystemRng;
use crate::world::{ItemKind, SimEvent, World};

/// Drives the four-state party machine and keeps members in formation
/// around the shared center. Parties always update regardless of the
/// viewer.
pub struct PartySystem;

impl PartySystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PartySystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for PartySystem {
    fn name(&self) -> &str {
        "parties"
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
        let dt = ctx.dt_seconds;
        let sim_dt = world.clock.scaled(dt);
        let towns = world.town_ids();

        for party_id in world.party_ids() {
            let Some(mut party) = world.parties.remove(&party_id) else {
                continue;
            };
            match party.task {
                PartyTask::Idle => {
                    party.task_timer += dt;
                    if party.task_timer > IDLE_SECONDS {
                        party.roll_task(rng, &towns);
                    }
                }
                PartyTask::Traveling => match party.destination {
                    Some(destination) => {
                        let target = world
                            .towns
                            .get(&destination)
                            .map(|town| town.position)
                            .unwrap_or(party.position);
                        party.position =
                            party.position.step_toward(target, PARTY_SPEED * sim_dt);
                        if party.position.distance(target) < ARRIVE_EPSILON {
                            party.task = PartyTask::Trading;
                            party.task_timer = 0.0;
                            world.push_event(SimEvent::PartyArrived {
                                party: party_id,
                                town: destination,
                            });
                        }
                    }
                    // No destination is a valid terminal state, not an
                    // error; wait for the next roll.
                    None => {
                        party.task = PartyTask::Idle;
                        party.task_timer = 0.0;
                    }
                },
                PartyTask::Gathering => {
                    party.task_timer += dt;
                    if party.task_timer > GATHER_SECONDS {
                        let item = *rng
                            .pick(&ItemKind::ALL)
                            .expect("item list is non-empty");
                        let quantity = rng.gen_range(1..=3u64);
                        party.add_loot(item, quantity);
                        party.task = PartyTask::Idle;
                        party.task_timer = 0.0;
                    }
                }
                PartyTask::Trading => {
                    party.task_timer += dt;
                    if party.task_timer > TRADE_SECONDS {
                        resolve_trade(world, &mut party);
                        // Reroll goes through the shared task roll, so a
                        // party can never trade twice back to back.
                        party.roll_task(rng, &towns);
                    }
                }
            }

            position_members(world, &party);
            world.parties.insert(party_id, party);
        }
        Ok(())
    }
}

/// Goods the destination town itself produces are kept rather than sold
/// back to their producer; everything else leaves the shared inventory as
/// sold. Market side effects of party sales are a future extension point.
fn resolve_trade(world: &World, party: &mut Party) {
    let produces = party
        .destination
        .and_then(|town_id| world.towns.get(&town_id))
        .and_then(|town| town.produces);
    party
        .inventory
        .retain(|item, _| Some(*item) == produces);
}

/// Spread members evenly on a small circle around the shared center.
fn position_members(world: &mut World, party: &Party) {
    let count = party.members.len();
    for (index, member_id) in party.members.iter().enumerate() {
        if let Some(agent) = world.agents.get_mut(member_id) {
            let offset = Party::formation_offset(index, count);
            agent.position =
                crate::world::Vec2::new(party.position.x + offset.x, party.position.y + offset.y);
        }
    }
}

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::rng::SystemRng;
use crate::world::{AgentId, ItemKind, TownId, Vec2};

/// Seconds a party lingers before rolling its next task.
pub const IDLE_SECONDS: f32 = 5.0;
/// Seconds spent foraging before the shared inventory grows.
pub const GATHER_SECONDS: f32 = 3.0;
/// Seconds spent haggling on arrival before moving on.
pub const TRADE_SECONDS: f32 = 2.0;
/// Shared travel speed in grid units per simulated second.
pub const PARTY_SPEED: f32 = 0.02;
/// Radius of the circular marching formation around the shared center.
pub const FORMATION_RADIUS: f32 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyTask {
    Idle,
    Traveling,
    Gathering,
    Trading,
}

/// A small band of roamers sharing one position and one task state.
/// Non-empty by construction; the bookkeeping pass removes any party
/// whose membership drops to zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Party {
    pub members: Vec<AgentId>,
    pub position: Vec2,
    pub destination: Option<TownId>,
    pub inventory: HashMap<ItemKind, u64>,
    pub task: PartyTask,
    pub task_timer: f32,
}

impl Party {
    pub fn new(members: Vec<AgentId>, position: Vec2) -> Self {
        debug_assert!(!members.is_empty(), "parties form around at least one roamer");
        Self {
            members,
            position,
            destination: None,
            inventory: HashMap::new(),
            task: PartyTask::Idle,
            task_timer: 0.0,
        }
    }

    /// Task roll shared by Idle and post-Trading transitions: 40% travel,
    /// 30% gather, 30% stay idle. Traveling needs a destination; with no
    /// towns in the world the party stays idle.
    pub fn roll_task(&mut self, rng: &mut SystemRng<'_>, towns: &[TownId]) {
        use rand::Rng;
        self.task_timer = 0.0;
        let roll: f32 = rng.gen();
        if roll < 0.4 {
            if let Some(&town) = rng.pick(towns) {
                self.destination = Some(town);
                self.task = PartyTask::Traveling;
                return;
            }
            self.task = PartyTask::Idle;
        } else if roll < 0.7 {
            self.task = PartyTask::Gathering;
        } else {
            self.task = PartyTask::Idle;
        }
    }

    /// Formation slot for the member at `index`, spread evenly on a circle
    /// around the shared center.
    pub fn formation_offset(index: usize, member_count: usize) -> Vec2 {
        let angle = std::f32::consts::TAU * index as f32 / member_count.max(1) as f32;
        Vec2::new(
            angle.cos() * FORMATION_RADIUS,
            angle.sin() * FORMATION_RADIUS,
        )
    }

    pub fn add_loot(&mut self, item: ItemKind, quantity: u64) {
        *self.inventory.entry(item).or_insert(0) += quantity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::RngManager;

    #[test]
    fn roll_task_covers_all_outcomes() {
        let mut manager = RngManager::new(11);
        let towns = [TownId::from_raw(0)];
        let mut seen_travel = false;
        let mut seen_gather = false;
        let mut seen_idle = false;
        for _ in 0..200 {
            let mut party = Party::new(vec![AgentId::from_raw(0)], Vec2::default());
            party.roll_task(&mut manager.stream("parties"), &towns);
            match party.task {
                PartyTask::Traveling => {
                    assert!(party.destination.is_some());
                    seen_travel = true;
                }
                PartyTask::Gathering => seen_gather = true,
                PartyTask::Idle => seen_idle = true,
                PartyTask::Trading => panic!("a fresh roll never lands on trading"),
            }
        }
        assert!(seen_travel && seen_gather && seen_idle);
    }

    #[test]
    fn roll_task_without_towns_never_travels() {
        let mut manager = RngManager::new(5);
        for _ in 0..100 {
            let mut party = Party::new(vec![AgentId::from_raw(0)], Vec2::default());
            party.roll_task(&mut manager.stream("parties"), &[]);
            assert_ne!(party.task, PartyTask::Traveling);
        }
    }

    #[test]
    fn formation_offsets_sit_on_the_ring() {
        for count in 1..=4 {
            for index in 0..count {
                let offset = Party::formation_offset(index, count);
                let radius = (offset.x * offset.x + offset.y * offset.y).sqrt();
                assert!((radius - FORMATION_RADIUS).abs() < 1e-5);
            }
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::roads::RoadNetwork;
use crate::world::{ItemKind, TownId, Vec2};

/// Arrival tolerance shared by every position check: gather sites,
/// delivery destinations, and home-town gold deposits.
pub const ARRIVE_EPSILON: f32 = 0.5;

/// Simulated minutes an agent spends working a gather site.
pub const GATHER_MINUTES: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Elder,
    Mayor,
    Guard,
    Transporter,
    TaxCollector,
    Peasant,
    Wanderer,
    Merchant,
}

impl Role {
    /// Base walking speed in grid units per simulated second.
    pub fn base_speed(self) -> f32 {
        match self {
            Self::Elder | Self::Mayor => 0.015,
            Self::Guard => 0.028,
            Self::Transporter => 0.035,
            Self::TaxCollector => 0.030,
            Self::Peasant => 0.025,
            Self::Wanderer => 0.020,
            Self::Merchant => 0.030,
        }
    }

    /// Roles eligible for gather-and-deliver work.
    pub fn is_worker(self) -> bool {
        matches!(self, Self::Peasant | Self::Transporter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobKind {
    Gather(ItemKind),
    DeliverGoods,
    CollectTax,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum JobPhase {
    ToSite,
    Gathering { remaining_minutes: f32 },
    ToDestination,
}

/// One unit of work. An agent holds at most one; completion or
/// cancellation clears it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub kind: JobKind,
    pub site: Option<Vec2>,
    pub destination: TownId,
    pub destination_position: Vec2,
    pub phase: JobPhase,
}

impl Job {
    pub fn gather(item: ItemKind, site: Vec2, destination: TownId, destination_position: Vec2) -> Self {
        Self {
            kind: JobKind::Gather(item),
            site: Some(site),
            destination,
            destination_position,
            phase: JobPhase::ToSite,
        }
    }

    pub fn deliver(destination: TownId, destination_position: Vec2) -> Self {
        Self {
            kind: JobKind::DeliverGoods,
            site: None,
            destination,
            destination_position,
            phase: JobPhase::ToDestination,
        }
    }

    pub fn collect_tax(village: TownId, village_position: Vec2) -> Self {
        Self {
            kind: JobKind::CollectTax,
            site: Some(village_position),
            destination: village,
            destination_position: village_position,
            phase: JobPhase::ToSite,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub role: Role,
    /// Home town for lookups only; roamers have none.
    pub home: Option<TownId>,
    pub position: Vec2,
    pub job: Option<Job>,
    pub carried: Option<(ItemKind, u64)>,
    /// Revenue carried back from a foreign sale; cleared on deposit.
    pub gold: u64,
    /// Wander target for agents without a job.
    pub wander_target: Option<Vec2>,
}

impl Agent {
    pub fn new(role: Role, home: Option<TownId>, position: Vec2) -> Self {
        Self {
            role,
            home,
            position,
            job: None,
            carried: None,
            gold: 0,
            wander_target: None,
        }
    }

    pub fn assign_job(&mut self, job: Job) {
        self.job = Some(job);
    }

    pub fn clear_job(&mut self) {
        self.job = None;
    }

    pub fn is_idle(&self) -> bool {
        self.job.is_none()
    }

    /// Whether a player or another agent may interact: only idle agents
    /// standing still can be engaged.
    pub fn can_interact(&self) -> bool {
        self.job.is_none() && self.wander_target.is_none()
    }

    /// Advance toward `target` for `sim_dt` simulated seconds, scaled by
    /// road quality at the current position. Returns true on arrival.
    pub fn advance_toward(&mut self, target: Vec2, sim_dt: f32, roads: &RoadNetwork) -> bool {
        let speed = self.role.base_speed() * roads.speed_multiplier(self.position);
        self.position = self.position.step_toward(target, speed * sim_dt);
        self.position.distance(target) < ARRIVE_EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_toward_reaches_target_without_overshoot() {
        let roads = RoadNetwork::default();
        let mut agent = Agent::new(Role::Transporter, None, Vec2::new(0.0, 0.0));
        let target = Vec2::new(1.0, 0.0);
        assert!(agent.advance_toward(target, 120.0, &roads));
        assert_eq!(agent.position, target);
    }

    #[test]
    fn roads_speed_up_travel() {
        let mut roads = RoadNetwork::default();
        roads.add_segment(Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0), 1.0);
        let mut on_road = Agent::new(Role::Peasant, None, Vec2::new(0.0, 0.0));
        let mut off_road = Agent::new(Role::Peasant, None, Vec2::new(0.0, 10.0));
        on_road.advance_toward(Vec2::new(100.0, 0.0), 60.0, &roads);
        off_road.advance_toward(Vec2::new(100.0, 10.0), 60.0, &roads);
        assert!(on_road.position.x > off_road.position.x);
    }

    #[test]
    fn job_lifecycle_clears() {
        let mut agent = Agent::new(Role::Peasant, None, Vec2::default());
        assert!(agent.is_idle());
        agent.assign_job(Job::deliver(TownId::from_raw(0), Vec2::new(5.0, 5.0)));
        assert!(!agent.is_idle());
        agent.clear_job();
        assert!(agent.can_interact());
    }
}

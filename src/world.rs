use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, Role};
use crate::clock::GameClock;
use crate::economy::EconomyLedger;
use crate::party::{Party, PartyTask};
use crate::roads::RoadNetwork;
use crate::settlement::Settlement;
use crate::terrain::TerrainGrid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TownId(u64);

impl TownId {
    pub fn raw(self) -> u64 {
        self.0
    }

    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(u64);

impl AgentId {
    pub fn raw(self) -> u64 {
        self.0
    }

    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartyId(u64);

impl PartyId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// World position in grid units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Move up to `step` units toward `target`, never overshooting.
    pub fn step_toward(self, target: Self, step: f32) -> Self {
        let distance = self.distance(target);
        if distance <= step || distance == 0.0 {
            return target;
        }
        let t = step / distance;
        Self {
            x: self.x + (target.x - self.x) * t,
            y: self.y + (target.y - self.y) * t,
        }
    }
}

/// Tradable good. Each gather job targets one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Grain,
    Wood,
    Stone,
    Ore,
    Fish,
}

impl ItemKind {
    pub const ALL: [Self; 5] = [Self::Grain, Self::Wood, Self::Stone, Self::Ore, Self::Fish];

    /// Baseline value in coins when a town holds no local supply.
    pub fn base_price(self) -> u64 {
        match self {
            Self::Grain => 8,
            Self::Fish => 9,
            Self::Wood => 10,
            Self::Stone => 12,
            Self::Ore => 16,
        }
    }

    /// Whether a gather site for this good fits the given biome.
    pub fn found_in(self, biome: crate::terrain::Biome) -> bool {
        use crate::terrain::Biome;
        match self {
            Self::Grain => matches!(biome, Biome::Grass | Biome::Swamp),
            Self::Wood => biome == Biome::Forest,
            Self::Stone => biome == Biome::RockyHills,
            Self::Ore => biome.is_mountainous(),
            Self::Fish => biome.is_water(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Village,
    City,
}

/// Purchased storage; absorbs the stored half of deliveries instead of the
/// market ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Warehouse {
    storage: HashMap<ItemKind, u64>,
}

impl Warehouse {
    pub fn store(&mut self, item: ItemKind, quantity: u64) {
        *self.storage.entry(item).or_insert(0) += quantity;
    }

    pub fn stored(&self, item: ItemKind) -> u64 {
        self.storage.get(&item).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Town {
    pub name: String,
    pub position: Vec2,
    pub size: u32,
    pub tier: Tier,
    /// The one good this town produces; it is never sold back to itself.
    pub produces: Option<ItemKind>,
    pub warehouse: Option<Warehouse>,
}

/// Viewer focus used to gate per-tick updates to nearby towns.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Viewer {
    pub position: Vec2,
    pub radius: f32,
}

/// Margin added to the view radius before a town is considered frozen.
pub const VIEW_MARGIN: f32 = 5.0;

/// Events appended by the core and drained by the embedding layer each
/// frame; the core never calls back into a UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    DeliverySettled {
        town: TownId,
        item: ItemKind,
        stored: u64,
        sold: u64,
        revenue: u64,
        carried_home: bool,
    },
    GoldDeposited {
        town: TownId,
        agent: AgentId,
        amount: u64,
    },
    TaxCollected {
        city: TownId,
        village: TownId,
        collector: AgentId,
        amount: u64,
    },
    PartyArrived {
        party: PartyId,
        town: TownId,
    },
}

pub struct World {
    next_agent: u64,
    next_party: u64,
    tick: u64,
    pub(crate) terrain: TerrainGrid,
    pub(crate) towns: HashMap<TownId, Town>,
    pub(crate) settlements: HashMap<TownId, Settlement>,
    pub(crate) ledger: EconomyLedger,
    pub(crate) agents: HashMap<AgentId, Agent>,
    pub(crate) town_agents: HashMap<TownId, Vec<AgentId>>,
    pub(crate) roamers: Vec<AgentId>,
    pub(crate) parties: HashMap<PartyId, Party>,
    pub(crate) roads: RoadNetwork,
    pub(crate) clock: GameClock,
    pub(crate) viewer: Option<Viewer>,
    pub(crate) events: Vec<SimEvent>,
}

impl World {
    pub fn new(terrain: TerrainGrid, clock: GameClock) -> Self {
        Self {
            next_agent: 0,
            next_party: 0,
            tick: 0,
            terrain,
            towns: HashMap::new(),
            settlements: HashMap::new(),
            ledger: EconomyLedger::default(),
            agents: HashMap::new(),
            town_agents: HashMap::new(),
            roamers: Vec::new(),
            parties: HashMap::new(),
            roads: RoadNetwork::default(),
            clock,
            viewer: None,
            events: Vec::new(),
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn advance_time(&mut self, dt_seconds: f32) {
        self.tick += 1;
        self.clock.advance(dt_seconds);
    }

    pub fn terrain(&self) -> &TerrainGrid {
        &self.terrain
    }

    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut GameClock {
        &mut self.clock
    }

    pub fn roads(&self) -> &RoadNetwork {
        &self.roads
    }

    pub fn set_roads(&mut self, roads: RoadNetwork) {
        self.roads = roads;
    }

    pub fn set_viewer(&mut self, position: Vec2, radius: f32) {
        self.viewer = Some(Viewer { position, radius });
    }

    pub fn clear_viewer(&mut self) {
        self.viewer = None;
    }

    /// Whether agents homed in this town are simulated this tick. Without
    /// a viewer every town is live.
    pub fn town_in_view(&self, id: TownId) -> bool {
        match (self.viewer, self.towns.get(&id)) {
            (Some(viewer), Some(town)) => {
                town.position.distance(viewer.position) <= viewer.radius + VIEW_MARGIN
            }
            (None, Some(_)) => true,
            (_, None) => false,
        }
    }

    pub fn add_town(&mut self, town: Town) -> TownId {
        let id = TownId(self.towns.len() as u64);
        self.ledger.register_town(id);
        self.towns.insert(id, town);
        self.town_agents.insert(id, Vec::new());
        id
    }

    pub fn town(&self, id: TownId) -> Option<&Town> {
        self.towns.get(&id)
    }

    pub fn town_mut(&mut self, id: TownId) -> Option<&mut Town> {
        self.towns.get_mut(&id)
    }

    pub fn town_ids(&self) -> Vec<TownId> {
        let mut ids: Vec<_> = self.towns.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn settlement(&self, id: TownId) -> Option<&Settlement> {
        self.settlements.get(&id)
    }

    pub fn settlement_mut(&mut self, id: TownId) -> Option<&mut Settlement> {
        self.settlements.get_mut(&id)
    }

    pub fn ledger(&self) -> &EconomyLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut EconomyLedger {
        &mut self.ledger
    }

    pub fn spawn_agent(&mut self, agent: Agent) -> AgentId {
        let id = AgentId(self.next_agent);
        self.next_agent += 1;
        if let Some(home) = agent.home {
            self.town_agents.entry(home).or_default().push(id);
        } else {
            self.roamers.push(id);
        }
        self.agents.insert(id, agent);
        id
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(&id)
    }

    pub fn agent_ids(&self) -> Vec<AgentId> {
        let mut ids: Vec<_> = self.agents.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn agents_of(&self, town: TownId) -> &[AgentId] {
        self.town_agents
            .get(&town)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn roamer_ids(&self) -> &[AgentId] {
        &self.roamers
    }

    pub fn spawn_party(&mut self, party: Party) -> PartyId {
        let id = PartyId(self.next_party);
        self.next_party += 1;
        self.parties.insert(id, party);
        id
    }

    pub fn party(&self, id: PartyId) -> Option<&Party> {
        self.parties.get(&id)
    }

    pub fn party_ids(&self) -> Vec<PartyId> {
        let mut ids: Vec<_> = self.parties.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn total_population(&self) -> usize {
        self.agents.len()
    }

    /// Nearest city to a position, if any city exists.
    pub fn nearest_city(&self, position: Vec2) -> Option<TownId> {
        let mut best: Option<(TownId, f32)> = None;
        for id in self.town_ids() {
            let town = &self.towns[&id];
            if town.tier != Tier::City {
                continue;
            }
            let distance = town.position.distance(position);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((id, distance));
            }
        }
        best.map(|(id, _)| id)
    }

    pub fn push_event(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    /// Hand the accumulated events to the embedding layer.
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self, scenario: &str) -> WorldSnapshot {
        let mut towns = Vec::with_capacity(self.towns.len());
        for id in self.town_ids() {
            let town = &self.towns[&id];
            let settlement = self.settlements.get(&id);
            let mut supplies: Vec<SupplySnapshot> = ItemKind::ALL
                .iter()
                .map(|&item| SupplySnapshot {
                    item,
                    quantity: self.ledger.supply(id, item),
                    buy_price: self.ledger.buy_price(id, item),
                })
                .collect();
            supplies.sort_by_key(|s| s.item);
            towns.push(TownSnapshot {
                id: id.raw(),
                name: town.name.clone(),
                tier: town.tier,
                x: town.position.x,
                y: town.position.y,
                produces: town.produces,
                population: self.agents_of(id).len(),
                gold: settlement.map(Settlement::gold).unwrap_or(0),
                income_total: settlement.map(Settlement::income_total).unwrap_or(0),
                parent_city: settlement
                    .and_then(Settlement::parent_city)
                    .map(TownId::raw),
                supplies,
            });
        }

        let mut agents = Vec::with_capacity(self.agents.len());
        for id in self.agent_ids() {
            let agent = &self.agents[&id];
            agents.push(AgentSnapshot {
                id: id.raw(),
                role: agent.role,
                x: agent.position.x,
                y: agent.position.y,
                home: agent.home.map(TownId::raw),
                gold: agent.gold,
                has_job: agent.job.is_some(),
            });
        }

        let mut parties = Vec::with_capacity(self.parties.len());
        for id in self.party_ids() {
            let party = &self.parties[&id];
            parties.push(PartySnapshot {
                id: id.raw(),
                members: party.members.len(),
                task: party.task,
                x: party.position.x,
                y: party.position.y,
                destination: party.destination.map(TownId::raw),
            });
        }

        WorldSnapshot {
            scenario: scenario.to_string(),
            tick: self.tick,
            sim_minutes: self.clock.current_minutes(),
            paused: self.clock.is_paused(),
            total_population: self.total_population(),
            towns,
            agents,
            parties,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplySnapshot {
    pub item: ItemKind,
    pub quantity: u64,
    pub buy_price: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TownSnapshot {
    pub id: u64,
    pub name: String,
    pub tier: Tier,
    pub x: f32,
    pub y: f32,
    pub produces: Option<ItemKind>,
    pub population: usize,
    pub gold: u64,
    pub income_total: u64,
    pub parent_city: Option<u64>,
    pub supplies: Vec<SupplySnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: u64,
    pub role: Role,
    pub x: f32,
    pub y: f32,
    pub home: Option<u64>,
    pub gold: u64,
    pub has_job: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartySnapshot {
    pub id: u64,
    pub members: usize,
    pub task: PartyTask,
    pub x: f32,
    pub y: f32,
    pub destination: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub scenario: String,
    pub tick: u64,
    pub sim_minutes: f64,
    pub paused: bool,
    pub total_population: usize,
    pub towns: Vec<TownSnapshot>,
    pub agents: Vec<AgentSnapshot>,
    pub parties: Vec<PartySnapshot>,
}

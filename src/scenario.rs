use std::fs;
use std::path::{Path, PathBuf};

use rand::Rng;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::agent::{Agent, Role};
use crate::clock::GameClock;
use crate::party::Party;
use crate::rng::RngManager;
use crate::settlement;
use crate::systems::assign_villager_jobs;
use crate::terrain;
use crate::world::{ItemKind, Tier, Town, Vec2, Warehouse, World};

fn default_tick_seconds() -> f32 {
    1.0
}

fn default_time_scale() -> f32 {
    60.0
}

fn default_snapshot_interval_ticks() -> u64 {
    50
}

fn default_town_size() -> u32 {
    10
}

fn default_road_quality() -> f32 {
    0.6
}

fn default_roamer_count() -> u32 {
    9
}

fn default_min_parties() -> u32 {
    2
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("scenario parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("scenario validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub seed: u64,
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: f32,
    #[serde(default = "default_time_scale")]
    pub time_scale: f32,
    #[serde(default)]
    pub ticks: Option<u64>,
    #[serde(default = "default_snapshot_interval_ticks")]
    pub snapshot_interval_ticks: u64,
    pub map: MapConfig,
    pub towns: Vec<TownConfig>,
    #[serde(default)]
    pub roamers: RoamerConfig,
    #[serde(default = "default_road_quality")]
    pub road_quality: f32,
    #[serde(default)]
    pub viewer: Option<ViewerConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapConfig {
    pub width: usize,
    pub height: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TownConfig {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub tier: Tier,
    #[serde(default)]
    pub produces: Option<String>,
    #[serde(default = "default_town_size")]
    pub size: u32,
    #[serde(default)]
    pub warehouse: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoamerConfig {
    #[serde(default = "default_roamer_count")]
    pub count: u32,
    #[serde(default = "default_min_parties")]
    pub min_parties: u32,
}

impl Default for RoamerConfig {
    fn default() -> Self {
        Self {
            count: default_roamer_count(),
            min_parties: default_min_parties(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewerConfig {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario, ScenarioError> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)?;
        let scenario: Scenario = serde_yaml::from_str(&data)?;
        scenario.validate()?;
        Ok(scenario)
    }
}

/// Map a configured produce tag onto an item. Unknown tags fall back to
/// grain with a warning rather than failing the load.
fn parse_item(tag: &str) -> ItemKind {
    match tag {
        "grain" => ItemKind::Grain,
        "wood" => ItemKind::Wood,
        "stone" => ItemKind::Stone,
        "ore" => ItemKind::Ore,
        "fish" => ItemKind::Fish,
        other => {
            warn!(tag = other, "unknown produce tag; defaulting to grain");
            ItemKind::Grain
        }
    }
}

impl Scenario {
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.name.is_empty() {
            return Err(ScenarioError::Validation(
                "scenario must define a name".into(),
            ));
        }
        if self.map.width < 8 || self.map.height < 8 {
            return Err(ScenarioError::Validation(
                "map must be at least 8x8 cells".into(),
            ));
        }
        if self.towns.is_empty() {
            return Err(ScenarioError::Validation(
                "scenario must define at least one town".into(),
            ));
        }
        for town in &self.towns {
            if town.x < 0.0
                || town.y < 0.0
                || town.x >= self.map.width as f32
                || town.y >= self.map.height as f32
            {
                return Err(ScenarioError::Validation(format!(
                    "town '{}' lies outside the map",
                    town.name
                )));
            }
        }
        Ok(())
    }

    pub fn ticks(&self, override_ticks: Option<u64>) -> u64 {
        override_ticks.or(self.ticks).unwrap_or(120)
    }

    /// Construct the full world: terrain, towns, roads, settlements,
    /// ownership, starting jobs, and the roamer pool with its parties.
    /// Deterministic for a fixed scenario.
    pub fn build_world(&self) -> World {
        let grid = terrain::generate(self.map.width, self.map.height, self.seed);
        let mut world = World::new(grid, GameClock::new(self.time_scale));

        for config in &self.towns {
            world.add_town(Town {
                name: config.name.clone(),
                position: Vec2::new(config.x, config.y),
                size: config.size,
                tier: config.tier,
                produces: config.produces.as_deref().map(parse_item),
                warehouse: config.warehouse.then(Warehouse::default),
            });
        }

        build_roads(&mut world, self.road_quality);
        settlement::populate_all_towns(&mut world);
        settlement::assign_village_ownership(&mut world);

        let mut rng_manager = RngManager::new(self.seed);
        {
            let mut rng = rng_manager.stream("worldgen");
            assign_villager_jobs(&mut world, &mut rng);
            spawn_roamers(&mut world, &mut rng, &self.roamers);
        }

        if let Some(viewer) = &self.viewer {
            world.set_viewer(Vec2::new(viewer.x, viewer.y), viewer.radius);
        }

        info!(
            scenario = %self.name,
            towns = world.town_ids().len(),
            agents = world.total_population(),
            "world built"
        );
        world
    }
}

/// Link each village to its nearest city and chain the cities together.
fn build_roads(world: &mut World, quality: f32) {
    let mut roads = crate::roads::RoadNetwork::default();
    let town_ids = world.town_ids();
    let mut city_positions = Vec::new();
    for &id in &town_ids {
        let town = world.town(id).expect("town just inserted");
        if town.tier == Tier::City {
            city_positions.push(town.position);
        }
    }
    for &id in &town_ids {
        let (tier, position) = {
            let town = world.town(id).expect("town just inserted");
            (town.tier, town.position)
        };
        if tier != Tier::Village {
            continue;
        }
        if let Some(city) = world.nearest_city(position) {
            let city_position = world.town(city).expect("city exists").position;
            roads.add_segment(position, city_position, quality);
        }
    }
    for pair in city_positions.windows(2) {
        roads.add_segment(pair[0], pair[1], quality);
    }
    world.set_roads(roads);
}

/// Seed the roamer pool and fold part of it into parties of 2-4. The
/// configured minimum party count is honored while enough solo agents
/// remain; everyone left keeps roaming alone.
fn spawn_roamers(world: &mut World, rng: &mut crate::rng::SystemRng<'_>, config: &RoamerConfig) {
    let width = world.terrain().width() as f32;
    let height = world.terrain().height() as f32;
    let mut spawned = Vec::new();
    for _ in 0..config.count {
        let mut position = Vec2::new(width / 2.0, height / 2.0);
        for _ in 0..16 {
            let candidate = Vec2::new(
                rng.gen_range(0.0..width),
                rng.gen_range(0.0..height),
            );
            let cell = world
                .terrain()
                .cell(candidate.x.round() as i64, candidate.y.round() as i64);
            if !cell.biome.is_water() {
                position = candidate;
                break;
            }
        }
        let role = if rng.chance(0.5) {
            Role::Wanderer
        } else {
            Role::Merchant
        };
        spawned.push(world.spawn_agent(Agent::new(role, None, position)));
    }

    let mut pool = spawned;
    let mut formed = 0;
    while formed < config.min_parties && pool.len() >= 2 {
        let size = (rng.gen_range(2..=4usize)).min(pool.len());
        let members: Vec<_> = pool.drain(..size).collect();
        let anchor = world
            .agent(members[0])
            .map(|agent| agent.position)
            .unwrap_or_default();
        world.spawn_party(Party::new(members, anchor));
        formed += 1;
    }
}

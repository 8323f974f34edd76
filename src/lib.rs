pub mod agent;
pub mod clock;
pub mod economy;
pub mod engine;
pub mod party;
pub mod rng;
pub mod roads;
pub mod scenario;
pub mod settlement;
pub mod snapshot;
pub mod systems;
pub mod terrain;
pub mod web;
pub mod world;

pub use engine::{Engine, EngineBuilder, EngineSettings};
pub use scenario::{Scenario, ScenarioLoader};
pub use world::World;

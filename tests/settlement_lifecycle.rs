use std::collections::HashMap;

use fiefdom::{
    agent::Role,
    engine::{EngineBuilder, EngineSettings},
    scenario::{Scenario, ScenarioLoader},
    systems::{AgentSystem, BookkeepingSystem, JobSystem, PartySystem},
    world::{Tier, World},
};

fn scenario_loader() -> ScenarioLoader {
    ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
}

fn fixture() -> Scenario {
    scenario_loader()
        .load("scenarios/greenvale.yaml")
        .expect("fixture scenario parses")
}

fn build_engine(scenario: &Scenario) -> fiefdom::Engine {
    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
        seed: scenario.seed,
        tick_seconds: scenario.tick_seconds,
        snapshot_interval_ticks: 0,
        snapshot_dir: std::path::PathBuf::from("snapshots_test"),
    };
    EngineBuilder::new(settings)
        .with_system(AgentSystem::new())
        .with_system(PartySystem::new())
        .with_system(JobSystem::new())
        .with_system(BookkeepingSystem::new())
        .build()
}

fn role_counts(world: &World, town: fiefdom::world::TownId) -> HashMap<Role, usize> {
    let mut counts = HashMap::new();
    for &agent_id in world.agents_of(town) {
        let role = world.agent(agent_id).expect("agent exists").role;
        *counts.entry(role).or_insert(0) += 1;
    }
    counts
}

#[test]
fn villages_and_cities_bootstrap_fixed_role_sets() {
    let world = fixture().build_world();
    for id in world.town_ids() {
        let town = world.town(id).expect("town exists");
        let counts = role_counts(&world, id);
        match town.tier {
            Tier::Village => {
                assert_eq!(world.agents_of(id).len(), 4, "{} head count", town.name);
                assert_eq!(counts.get(&Role::Elder), Some(&1));
                assert_eq!(counts.get(&Role::Transporter), Some(&1));
                assert_eq!(counts.get(&Role::Peasant), Some(&2));
            }
            Tier::City => {
                assert_eq!(world.agents_of(id).len(), 10, "{} head count", town.name);
                assert_eq!(counts.get(&Role::Mayor), Some(&1));
                assert_eq!(counts.get(&Role::Guard), Some(&4));
                assert_eq!(counts.get(&Role::Transporter), Some(&3));
                assert_eq!(counts.get(&Role::TaxCollector), Some(&2));
            }
        }
    }
}

#[test]
fn villages_bind_to_the_nearby_city() {
    let world = fixture().build_world();
    let city = world
        .town_ids()
        .into_iter()
        .find(|id| world.town(*id).unwrap().tier == Tier::City)
        .expect("fixture has a city");
    let mut owned = 0;
    for id in world.town_ids() {
        if world.town(id).unwrap().tier != Tier::Village {
            continue;
        }
        let settlement = world.settlement(id).expect("village settlement");
        assert_eq!(settlement.parent_city(), Some(city));
        owned += 1;
    }
    assert_eq!(
        world
            .settlement(city)
            .expect("city settlement")
            .owned_villages()
            .len(),
        owned
    );
}

#[test]
fn far_flung_village_stays_independent() {
    let yaml = r#"
name: outlands
seed: 9
map:
  width: 256
  height: 256
towns:
  - name: Farhold
    x: 10
    y: 10
    tier: city
  - name: Lastwatch
    x: 220
    y: 220
    tier: village
roamers:
  count: 0
  min_parties: 0
"#;
    let scenario: Scenario = serde_yaml::from_str(yaml).expect("inline scenario parses");
    let world = scenario.build_world();
    for id in world.town_ids() {
        let settlement = world.settlement(id).expect("settlement exists");
        if world.town(id).unwrap().tier == Tier::Village {
            assert_eq!(settlement.parent_city(), None);
        } else {
            assert!(settlement.owned_villages().is_empty());
        }
    }
}

#[test]
fn engine_runs_are_deterministic() {
    let scenario = fixture();
    let mut world_a = scenario.build_world();
    let mut world_b = scenario.build_world();
    build_engine(&scenario)
        .run(&mut world_a, 40)
        .expect("run succeeds");
    build_engine(&scenario)
        .run(&mut world_b, 40)
        .expect("run succeeds");
    let snap_a = serde_json::to_string(&world_a.snapshot("greenvale")).unwrap();
    let snap_b = serde_json::to_string(&world_b.snapshot("greenvale")).unwrap();
    assert_eq!(snap_a, snap_b);
}

#[test]
fn paused_clock_freezes_agents_and_minutes() {
    let scenario = fixture();
    let mut world = scenario.build_world();
    world.clock_mut().pause();
    let before: Vec<_> = world
        .agent_ids()
        .into_iter()
        .map(|id| world.agent(id).unwrap().position)
        .collect();
    build_engine(&scenario)
        .run(&mut world, 10)
        .expect("run succeeds");
    let after: Vec<_> = world
        .agent_ids()
        .into_iter()
        .map(|id| world.agent(id).unwrap().position)
        .collect();
    assert_eq!(before, after);
    assert_eq!(world.clock().current_minutes(), 0.0);
    assert_eq!(world.tick(), 10, "the engine itself keeps ticking");
}

#[test]
fn towns_outside_the_view_radius_are_frozen() {
    let scenario = fixture();
    let mut world = scenario.build_world();
    world.set_viewer(fiefdom::world::Vec2::new(0.0, 0.0), 1.0);
    let town_agents: Vec<_> = world
        .town_ids()
        .into_iter()
        .flat_map(|id| world.agents_of(id).to_vec())
        .collect();
    let before: Vec<_> = town_agents
        .iter()
        .map(|id| world.agent(*id).unwrap().position)
        .collect();
    build_engine(&scenario)
        .run(&mut world, 20)
        .expect("run succeeds");
    let after: Vec<_> = town_agents
        .iter()
        .map(|id| world.agent(*id).unwrap().position)
        .collect();
    assert_eq!(before, after, "distant towns must not simulate");
}

#[test]
fn scenario_validation_rejects_bad_input() {
    let missing_towns = r#"
name: empty
seed: 1
map:
  width: 32
  height: 32
towns: []
"#;
    let scenario: Scenario = serde_yaml::from_str(missing_towns).unwrap();
    assert!(scenario.validate().is_err());

    let out_of_bounds = r#"
name: lost
seed: 1
map:
  width: 32
  height: 32
towns:
  - name: Nowhere
    x: 64
    y: 4
    tier: village
"#;
    let scenario: Scenario = serde_yaml::from_str(out_of_bounds).unwrap();
    assert!(scenario.validate().is_err());
}

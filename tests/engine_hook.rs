use fiefdom::{
    engine::{EngineBuilder, EngineSettings},
    scenario::ScenarioLoader,
    systems::{AgentSystem, BookkeepingSystem, JobSystem, PartySystem},
};
use tempfile::tempdir;

#[test]
fn engine_runs_hook_each_tick_and_writes_snapshots() {
    let loader = ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"));
    let scenario = loader
        .load("scenarios/greenvale.yaml")
        .expect("scenario should load");
    let mut world = scenario.build_world();
    let temp = tempdir().expect("tempdir");
    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
        seed: scenario.seed,
        tick_seconds: scenario.tick_seconds,
        snapshot_interval_ticks: 3,
        snapshot_dir: temp.path().to_path_buf(),
    };
    let mut engine = EngineBuilder::new(settings)
        .with_system(AgentSystem::new())
        .with_system(PartySystem::new())
        .with_system(JobSystem::new())
        .with_system(BookkeepingSystem::new())
        .build();

    let mut ticks = Vec::new();
    engine
        .run_with_hook(&mut world, 6, |snapshot| ticks.push(snapshot.tick))
        .expect("run succeeds");

    assert_eq!(ticks, vec![1, 2, 3, 4, 5, 6]);
    let written: Vec<_> = std::fs::read_dir(temp.path().join(&scenario.name))
        .expect("snapshot dir exists")
        .collect();
    assert_eq!(written.len(), 2, "ticks 3 and 6 hit the interval");
}

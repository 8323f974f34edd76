use fiefdom::{
    agent::{Job, JobKind},
    engine::{EngineBuilder, EngineSettings},
    scenario::{Scenario, ScenarioLoader},
    systems::delivery,
    systems::{AgentSystem, BookkeepingSystem},
    world::{ItemKind, SimEvent, Tier, TownId, World},
};

fn fixture() -> Scenario {
    ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
        .load("scenarios/greenvale.yaml")
        .expect("fixture scenario parses")
}

fn town_named(world: &World, name: &str) -> TownId {
    world
        .town_ids()
        .into_iter()
        .find(|id| world.town(*id).map(|t| t.name.as_str()) == Some(name))
        .expect("fixture town exists")
}

#[test]
fn producer_village_stores_its_own_good_without_sale() {
    let mut world = fixture().build_world();
    let greenvale = town_named(&world, "Greenvale");
    let aldermoor = town_named(&world, "Aldermoor");
    let courier = world.agents_of(aldermoor)[0];

    let supply_before = world.ledger().supply(greenvale, ItemKind::Grain);
    let income_before = world.settlement(greenvale).unwrap().income_total();

    delivery::settle_delivery(&mut world, courier, greenvale, ItemKind::Grain, 10);

    assert_eq!(
        world.ledger().supply(greenvale, ItemKind::Grain),
        supply_before + 10,
        "the full quantity is stored"
    );
    assert_eq!(
        world.settlement(greenvale).unwrap().income_total(),
        income_before,
        "no currency moves for a town's own produce"
    );
    assert_eq!(world.agent(courier).unwrap().gold, 0);
}

#[test]
fn foreign_city_sale_rides_home_as_gold_with_a_return_job() {
    let mut world = fixture().build_world();
    let greenvale = town_named(&world, "Greenvale");
    let aldermoor = town_named(&world, "Aldermoor");
    assert_eq!(world.town(aldermoor).unwrap().tier, Tier::City);
    let hauler = world.agents_of(greenvale)[1];
    world.agent_mut(hauler).unwrap().clear_job();

    let price = world.ledger().buy_price(aldermoor, ItemKind::Wood);
    delivery::settle_delivery(&mut world, hauler, aldermoor, ItemKind::Wood, 10);

    let agent = world.agent(hauler).unwrap();
    assert_eq!(agent.gold, price * 5, "the sold half is carried as coin");
    assert_eq!(
        world.ledger().supply(aldermoor, ItemKind::Wood),
        10,
        "sold half plus unwarehoused stored half both hit the market"
    );
    let job = agent.job.as_ref().expect("return delivery assigned");
    assert_eq!(job.kind, JobKind::DeliverGoods);
    assert_eq!(job.destination, greenvale);
    assert_eq!(
        world.settlement(aldermoor).unwrap().income_total(),
        0,
        "the city pays the courier, not itself"
    );
}

#[test]
fn carried_gold_deposits_only_at_home() {
    let mut world = fixture().build_world();
    let greenvale = town_named(&world, "Greenvale");
    let aldermoor = town_named(&world, "Aldermoor");
    let hauler = world.agents_of(greenvale)[1];
    world.agent_mut(hauler).unwrap().clear_job();

    let city_position = world.town(aldermoor).unwrap().position;
    world.agent_mut(hauler).unwrap().position = city_position;
    delivery::settle_delivery(&mut world, hauler, aldermoor, ItemKind::Wood, 10);
    let carried = world.agent(hauler).unwrap().gold;
    assert!(carried > 0);

    // Still standing in the city: nothing deposits.
    delivery::deposit_carried_gold(&mut world, hauler);
    assert_eq!(world.agent(hauler).unwrap().gold, carried);

    let home_position = world.town(greenvale).unwrap().position;
    world.agent_mut(hauler).unwrap().position = home_position;
    let gold_before = world.settlement(greenvale).unwrap().gold();
    delivery::deposit_carried_gold(&mut world, hauler);
    assert_eq!(world.agent(hauler).unwrap().gold, 0);
    assert_eq!(
        world.settlement(greenvale).unwrap().gold(),
        gold_before + carried
    );
    assert!(world
        .drain_events()
        .iter()
        .any(|event| matches!(event, SimEvent::GoldDeposited { agent, .. } if *agent == hauler)));
}

#[test]
fn local_and_village_sales_credit_income_immediately() {
    let mut world = fixture().build_world();
    let aldermoor = town_named(&world, "Aldermoor");
    let thornwick = town_named(&world, "Thornwick");
    let citizen = world.agents_of(aldermoor)[2];

    let price = world.ledger().buy_price(aldermoor, ItemKind::Fish);
    delivery::settle_delivery(&mut world, citizen, aldermoor, ItemKind::Fish, 10);
    assert_eq!(
        world.settlement(aldermoor).unwrap().income_total(),
        price * 5,
        "a sale in the courier's own city settles locally"
    );
    assert_eq!(world.agent(citizen).unwrap().gold, 0);

    // A village destination settles locally even for a foreign courier.
    let price = world.ledger().buy_price(thornwick, ItemKind::Fish);
    delivery::settle_delivery(&mut world, citizen, thornwick, ItemKind::Fish, 10);
    assert_eq!(
        world.settlement(thornwick).unwrap().income_total(),
        price * 5
    );
    assert_eq!(world.agent(citizen).unwrap().gold, 0);
}

#[test]
fn purchased_warehouse_absorbs_the_stored_half() {
    let mut world = fixture().build_world();
    let stonewade = town_named(&world, "Stonewade");
    let aldermoor = town_named(&world, "Aldermoor");
    let courier = world.agents_of(aldermoor)[0];

    delivery::settle_delivery(&mut world, courier, stonewade, ItemKind::Wood, 10);

    let warehouse = world
        .town(stonewade)
        .unwrap()
        .warehouse
        .as_ref()
        .expect("fixture grants Stonewade a warehouse");
    assert_eq!(warehouse.stored(ItemKind::Wood), 5);
    assert_eq!(
        world.ledger().supply(stonewade, ItemKind::Wood),
        5,
        "only the sold half reaches the market"
    );
}

#[test]
fn odd_quantities_round_the_sold_half_down() {
    let mut world = fixture().build_world();
    let greenvale = town_named(&world, "Greenvale");
    let aldermoor = town_named(&world, "Aldermoor");
    let hauler = world.agents_of(greenvale)[1];
    world.agent_mut(hauler).unwrap().clear_job();

    let price = world.ledger().buy_price(aldermoor, ItemKind::Ore);
    delivery::settle_delivery(&mut world, hauler, aldermoor, ItemKind::Ore, 7);
    assert_eq!(world.agent(hauler).unwrap().gold, price * 3);
    assert_eq!(world.ledger().supply(aldermoor, ItemKind::Ore), 7);
}

#[test]
fn tax_collectors_ferry_village_coin_to_the_city() {
    let scenario = fixture();
    let mut world = scenario.build_world();
    let greenvale = town_named(&world, "Greenvale");
    let aldermoor = town_named(&world, "Aldermoor");

    // Quiet everyone else so the only coin in motion is the tax run.
    for id in world.agent_ids() {
        world.agent_mut(id).unwrap().clear_job();
    }
    world.settlement_mut(greenvale).unwrap().add_gold(100);
    let collector = world
        .agents_of(aldermoor)
        .iter()
        .copied()
        .find(|id| world.agent(*id).unwrap().role == fiefdom::agent::Role::TaxCollector)
        .expect("cities bootstrap tax collectors");
    let village_position = world.town(greenvale).unwrap().position;
    world
        .agent_mut(collector)
        .unwrap()
        .assign_job(Job::collect_tax(greenvale, village_position));

    // Agent system only: no reassignment sweeps, no second collector.
    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
        seed: scenario.seed,
        tick_seconds: scenario.tick_seconds,
        snapshot_interval_ticks: 0,
        snapshot_dir: std::path::PathBuf::from("snapshots_test"),
    };
    let mut engine = EngineBuilder::new(settings)
        .with_system(AgentSystem::new())
        .with_system(BookkeepingSystem::new())
        .build();
    engine.run(&mut world, 100).expect("run succeeds");

    let events = world.drain_events();
    let collected = events.iter().find_map(|event| match event {
        SimEvent::TaxCollected {
            city,
            village,
            amount,
            ..
        } if *village == greenvale && *city == aldermoor => Some(*amount),
        _ => None,
    });
    assert_eq!(collected, Some(10), "one tenth of the treasury is taken");
    assert_eq!(world.settlement(greenvale).unwrap().gold(), 90);
    assert_eq!(
        world.settlement(aldermoor).unwrap().gold(),
        10,
        "the collector delivered the coin home"
    );
    assert!(events
        .iter()
        .any(|event| matches!(event, SimEvent::GoldDeposited { town, amount, .. }
            if *town == aldermoor && *amount == 10)));
}

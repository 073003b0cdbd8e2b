use std::path::PathBuf;

use hexciv::{
    components::{TechKind, UnitKind},
    scenario::{RunOverrides, ScenarioLoader},
};

fn scenario_loader() -> ScenarioLoader {
    ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
}

fn scenario_path() -> PathBuf {
    PathBuf::from("scenarios/duel.yaml")
}

#[test]
fn scenario_loader_reads_fixture() {
    let scenario = scenario_loader().load(scenario_path()).expect("scenario parses");
    assert_eq!(scenario.name, "duel");
    assert_eq!(scenario.players.len(), 2);
    assert_eq!(scenario.players[0].research, Some(TechKind::Pottery));
    assert_eq!((scenario.map.width, scenario.map.height), (40, 26));
    assert_eq!(scenario.report.every_turns, 10);
    assert!(scenario.validate().is_ok());
}

#[test]
fn missing_scenario_names_the_file() {
    let err = scenario_loader()
        .load("scenarios/nowhere.yaml")
        .unwrap_err();
    assert!(format!("{err:#}").contains("nowhere.yaml"));
}

#[test]
fn seeded_scenarios_build_identical_games() {
    let loader = scenario_loader();
    let scenario = loader.load(scenario_path()).unwrap();
    let catalogs = loader.load_catalogs(&scenario).unwrap();
    let (a, seed_a) = scenario.build_game(catalogs.clone(), None).unwrap();
    let (b, seed_b) = scenario.build_game(catalogs, None).unwrap();
    assert_eq!(seed_a, seed_b);
    let capitals = |g: &hexciv::GameState| -> Vec<_> { g.cities().map(|(_, c)| c.position).collect() };
    assert_eq!(capitals(&a), capitals(&b));
    assert_ne!(
        a.city(a.cities_of(0)[0]).unwrap().position,
        a.city(a.cities_of(1)[0]).unwrap().position
    );
}

#[test]
fn catalog_override_file_is_applied() {
    let loader = scenario_loader();
    let scenario = loader.load("scenarios/sprint.yaml").unwrap();
    let catalogs = loader.load_catalogs(&scenario).unwrap();
    assert_eq!(catalogs.techs.len(), 2);
    assert_eq!(catalogs.techs.info(TechKind::Pottery).science_cost, 5);

    let (game, _) = scenario.build_game(catalogs, None).unwrap();
    let warrior = game.units_of(0)[0];
    let unit = game.unit(warrior).unwrap();
    assert_eq!(unit.kind, UnitKind::Warrior);
    assert_eq!(unit.max_movement, 3);
    assert_eq!(unit.combat_strength, 25);
}

#[test]
fn engine_run_writes_turn_reports() {
    let loader = scenario_loader();
    let scenario = loader.load(scenario_path()).unwrap();
    let catalogs = loader.load_catalogs(&scenario).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let overrides = RunOverrides {
        seed: None,
        report_every_turns: Some(2),
        report_dir: Some(dir.path().to_path_buf()),
    };
    let mut engine = scenario.build_engine(catalogs, &overrides).unwrap();
    let ended = engine.run(4).unwrap();
    assert_eq!(ended, 8);
    assert_eq!(engine.game().turn(), 5);

    let reports = dir.path().join("duel");
    assert!(reports.join("turn_000003.json").exists());
    assert!(reports.join("turn_000005.json").exists());
    assert!(!reports.join("turn_000004.json").exists());

    let text = std::fs::read_to_string(reports.join("turn_000005.json")).unwrap();
    let report: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(report["scenario"], "duel");
    assert_eq!(report["players"].as_array().unwrap().len(), 2);
    assert!(report["players"][0]["resources"]["gold"].as_i64().unwrap() > 0);
}

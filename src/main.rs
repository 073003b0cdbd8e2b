use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

use hexciv::scenario::{RunOverrides, ScenarioLoader};

#[derive(Debug, Parser)]
#[command(author, version, about = "Headless hex strategy runner")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/duel.yaml")]
    scenario: PathBuf,

    /// Override round count (uses scenario default when omitted)
    #[arg(long)]
    turns: Option<u32>,

    /// Override the map seed; 0 picks a random one
    #[arg(long)]
    seed: Option<u64>,

    /// Override report interval in rounds
    #[arg(long)]
    report_every: Option<u32>,

    /// Directory for turn reports
    #[arg(long)]
    report_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let loader = ScenarioLoader::new(".");
    let scenario = loader.load(&cli.scenario)?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&scenario.logging.level));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let catalogs = loader.load_catalogs(&scenario)?;
    let overrides = RunOverrides {
        seed: cli.seed,
        report_every_turns: cli.report_every,
        report_dir: cli.report_dir,
    };
    let mut engine = scenario.build_engine(catalogs, &overrides)?;
    let rounds = scenario.turns(cli.turns);
    let ended = engine.run(rounds)?;

    let game = engine.game();
    info!(
        scenario = %scenario.name,
        seed = engine.seed(),
        turns_ended = ended,
        turn = game.turn(),
        "run finished"
    );
    match game.outcome() {
        Some(outcome) => println!(
            "Scenario '{}' (seed {}) ended on turn {}: {} won by {:?}",
            scenario.name,
            engine.seed(),
            game.turn(),
            game.player(outcome.winner)
                .map(|p| p.name.as_str())
                .unwrap_or("unknown"),
            outcome.kind
        ),
        None => println!(
            "Scenario '{}' (seed {}) ran {} rounds with no winner",
            scenario.name,
            engine.seed(),
            rounds
        ),
    }
    for (index, player) in game.players().iter().enumerate() {
        println!(
            "  {}: {} cities, {} units, {} techs, gold {}",
            player.name,
            game.cities_of(index).len(),
            game.units_of(index).len(),
            game.unlocked_techs(index).len(),
            player.resources.gold
        );
    }
    Ok(())
}

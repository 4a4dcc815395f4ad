use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use engine::{LandmarkSource, ScriptedSource};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use kinetic_game::app::{App, ArcadeView, CoachView, Command, Feature};
use kinetic_game::demo;
use kinetic_game::exercise::Exercise;
use kinetic_game::frame_budget::{BudgetThreshold, FrameBudget};
use kinetic_game::high_score::{HighScoreStore, JsonFileBackend};
use kinetic_game::runner::Runner;
use kinetic_game::session::SessionState;
use kinetic_game::settings::{Settings, SettingsStore};

#[derive(Debug, Parser)]
#[command(name = "kinetic")]
#[command(about = "Posture coach and fruit-catcher arcade driven by landmark frames")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the exercise catalogue.
    Exercises,
    /// Run one timed exercise session.
    Coach {
        #[arg(long, default_value = "wall_angels")]
        exercise: Exercise,
        /// Stop early after this many seconds.
        #[arg(long)]
        seconds: Option<u32>,
        /// JSON list of timestamped deliveries to replay instead of the synthetic pose.
        #[arg(long)]
        script: Option<PathBuf>,
        #[arg(long, default_value_t = false)]
        calibrate: bool,
    },
    /// Play fruit catcher until game over or the time limit.
    Arcade {
        #[arg(long, default_value_t = 60)]
        seconds: u32,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        script: Option<PathBuf>,
        /// Keep high scores in memory only.
        #[arg(long, default_value_t = false)]
        no_persist: bool,
    },
}

#[derive(Debug, Serialize)]
struct CoachReport<'a> {
    coach: CoachView,
    budget: &'a FrameBudget,
    dropped_frames: u64,
}

#[derive(Debug, Serialize)]
struct ArcadeReport<'a> {
    arcade: ArcadeView,
    budget: &'a FrameBudget,
    dropped_frames: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = SettingsStore::from_env().load();

    match cli.command {
        Commands::Exercises => cmd_exercises(),
        Commands::Coach {
            exercise,
            seconds,
            script,
            calibrate,
        } => cmd_coach(settings, exercise, seconds, script.as_deref(), calibrate),
        Commands::Arcade {
            seconds,
            seed,
            script,
            no_persist,
        } => cmd_arcade(settings, seconds, seed, script.as_deref(), no_persist),
    }
}

fn load_script(path: &Path) -> Result<ScriptedSource> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    ScriptedSource::from_json(&text).with_context(|| format!("parsing {}", path.display()))
}

fn new_runner(settings: Settings, high_scores: HighScoreStore) -> Runner {
    Runner::new(App::new(settings, high_scores), FrameBudget::new(BudgetThreshold::from_env()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("serializing report")?);
    Ok(())
}

fn cmd_exercises() -> Result<()> {
    for exercise in Exercise::ALL {
        println!("{} ({}, {}s)", exercise.name(), exercise.id(), exercise.duration_secs());
        for step in exercise.instructions() {
            println!("  - {step}");
        }
    }
    Ok(())
}

fn cmd_coach(
    settings: Settings,
    exercise: Exercise,
    seconds: Option<u32>,
    script: Option<&Path>,
    calibrate: bool,
) -> Result<()> {
    let duration = exercise.duration_secs();
    let limit = seconds.unwrap_or(duration).min(duration);
    let source: Box<dyn LandmarkSource> = match script {
        Some(path) => Box::new(load_script(path)?),
        None => Box::new(demo::coach_source(exercise, duration)),
    };

    let mut runner = new_runner(settings, HighScoreStore::in_memory());
    runner.attach(Feature::Coach, source);

    if calibrate {
        runner.run_until(Duration::from_millis(100), |_| false);
        if let Err(err) = runner.apply(Command::CalibrateCatCow) {
            warn!(%err, "calibration skipped");
        }
    }

    runner
        .apply(Command::StartSession(exercise))
        .context("starting session")?;
    let deadline = runner.now() + Duration::from_secs(u64::from(limit));
    runner.run_until(deadline, |app| app.session().state == SessionState::Complete);
    if runner.app().session().is_running() {
        runner.apply(Command::StopSession).context("stopping session")?;
    }

    let view = runner.app().coach_view();
    info!(reps = view.rep_count, perfect = view.perfect_rep_count, "coach run finished");
    print_json(&CoachReport {
        coach: view,
        budget: runner.budget(),
        dropped_frames: runner.app().dropped_frames(),
    })
}

fn cmd_arcade(
    mut settings: Settings,
    seconds: u32,
    seed: Option<u64>,
    script: Option<&Path>,
    no_persist: bool,
) -> Result<()> {
    if let Some(seed) = seed {
        settings.arcade.seed = seed;
    }
    let high_scores = if no_persist {
        HighScoreStore::in_memory()
    } else {
        let backend = match (&settings.storage.high_score_path, std::env::var_os("KINETIC_HIGH_SCORE_PATH")) {
            (Some(path), None) => JsonFileBackend::at(path.clone()),
            _ => JsonFileBackend::from_env(),
        };
        HighScoreStore::open(Box::new(backend))
    };
    let source: Box<dyn LandmarkSource> = match script {
        Some(path) => Box::new(load_script(path)?),
        None => Box::new(demo::arcade_source(seconds)),
    };
    let autostart = settings.arcade.autostart;

    let mut runner = new_runner(settings, high_scores);
    runner.attach(Feature::Arcade, source);
    if !autostart {
        runner.apply(Command::StartGame).context("starting game")?;
    }
    runner.run_until(Duration::from_secs(u64::from(seconds)), |app| app.game().is_over());

    let view = runner.app().arcade_view();
    info!(score = view.score, high_score = view.high_score, "arcade run finished");
    print_json(&ArcadeReport {
        arcade: view,
        budget: runner.budget(),
        dropped_frames: runner.app().dropped_frames(),
    })
}

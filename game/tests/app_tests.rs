use std::time::Duration;

use engine::{Delivery, ScriptedDelivery, ScriptedSource, SourceError};
use kinetic_game::app::{App, AppError, Command, Feature, RENDER_TASK};
use kinetic_game::demo::{self, exercise_pose, hand_at};
use kinetic_game::exercise::Exercise;
use kinetic_game::frame_budget::FrameBudget;
use kinetic_game::fruit::{GAME_ID, GamePhase, POOL_SIZE};
use kinetic_game::high_score::HighScoreStore;
use kinetic_game::runner::Runner;
use kinetic_game::session::SessionState;
use kinetic_game::settings::Settings;

fn runner(settings: Settings) -> Runner {
    Runner::new(App::new(settings, HighScoreStore::in_memory()), FrameBudget::default())
}

#[test]
fn arcade_autostarts_on_first_hands_and_plays_to_game_over() {
    let mut runner = runner(Settings::default());
    runner.attach(Feature::Arcade, Box::new(demo::arcade_source(600)));
    assert_eq!(runner.app().arcade_view().phase, GamePhase::Ready);

    runner.run_until(Duration::from_secs(600), |app| app.game().is_over());

    let view = runner.app().arcade_view();
    assert!(view.game_over);
    assert!(view.missed >= 5);
    assert_eq!(view.high_score, runner.app().high_scores().get(GAME_ID));
    assert!(view.high_score >= view.score);
    assert_eq!(runner.scheduler().pending(), 0, "render loop stops once the game is over");
    assert!(runner.budget().task(RENDER_TASK).is_some_and(|t| t.runs > 0));
}

#[test]
fn disabled_autostart_waits_for_start_game() {
    let mut settings = Settings::default();
    settings.arcade.autostart = false;
    let mut runner = runner(settings);
    runner.attach(Feature::Arcade, Box::new(demo::arcade_source(2)));

    runner.run_until(Duration::from_secs(1), |_| false);
    assert_eq!(runner.app().arcade_view().phase, GamePhase::Ready);

    runner.apply(Command::StartGame).expect("start game");
    runner.run_until(Duration::from_secs(2), |_| false);
    let view = runner.app().arcade_view();
    assert_eq!(view.phase, GamePhase::Playing);
    assert_eq!(view.fruits.len(), POOL_SIZE);
    assert!(runner.budget().task(RENDER_TASK).is_some_and(|t| t.runs >= 59));
}

#[test]
fn denied_hand_camera_leaves_the_coach_working() {
    let mut runner = runner(Settings::default());
    runner.attach(Feature::Coach, Box::new(demo::coach_source(Exercise::WallAngels, 30)));
    runner.attach(Feature::Arcade, Box::new(ScriptedSource::failing(SourceError::PermissionDenied)));

    assert_eq!(
        runner.apply(Command::StartGame),
        Err(AppError::SourceUnavailable(Feature::Arcade))
    );
    let arcade = runner.app().arcade_view();
    assert!(arcade.source.is_unavailable());
    assert_eq!(arcade.phase, GamePhase::Ready);

    runner.apply(Command::StartSession(Exercise::WallAngels)).expect("coach still works");
    runner.run_until(Duration::from_secs(31), |app| app.session().state == SessionState::Complete);
    let coach = runner.app().coach_view();
    assert_eq!(coach.state, SessionState::Complete);
    assert!(coach.rep_count >= 9, "reps: {}", coach.rep_count);
    assert!(coach.perfect_rep_count <= coach.rep_count);
    assert_eq!(coach.feedback_message, "Exercise complete!");
}

#[test]
fn calibration_uses_the_latest_pose_frame() {
    let mut runner = runner(Settings::default());
    let script = vec![ScriptedDelivery {
        at_ms: 0,
        delivery: Delivery::pose(exercise_pose(Exercise::CatCow, 0.0)),
    }];
    runner.attach(Feature::Coach, Box::new(ScriptedSource::new(script)));

    assert_eq!(runner.apply(Command::CalibrateCatCow), Err(AppError::NoPoseFrame));
    assert_eq!(runner.app().coach_view().cat_cow_baseline, None);
    runner.run_until(Duration::from_millis(50), |_| false);
    runner.apply(Command::CalibrateCatCow).expect("frame available");

    let baseline = runner.app().coach_view().cat_cow_baseline.expect("baseline recorded");
    assert!((baseline - 0.35).abs() < 1e-5, "baseline {baseline}");
}

#[test]
fn stale_hand_frames_are_dropped_between_render_ticks() {
    let mut runner = runner(Settings::default());
    let script = (0..10)
        .map(|i| ScriptedDelivery {
            at_ms: i,
            delivery: Delivery::hands(vec![hand_at(0.5, 0.9)]),
        })
        .collect();
    runner.attach(Feature::Arcade, Box::new(ScriptedSource::new(script)));
    runner.run_until(Duration::from_millis(20), |_| false);
    assert_eq!(runner.app().dropped_frames(), 9);
}

#[test]
fn reset_returns_to_ready_and_restart_is_fresh() {
    let mut runner = runner(Settings::default());
    runner.attach(Feature::Arcade, Box::new(demo::arcade_source(5)));
    runner.run_until(Duration::from_secs(3), |_| false);
    assert_eq!(runner.app().arcade_view().phase, GamePhase::Playing);

    runner.apply(Command::ResetGame).expect("reset");
    let view = runner.app().arcade_view();
    assert_eq!(view.phase, GamePhase::Ready);
    assert!(view.fruits.is_empty());
    assert_eq!(runner.scheduler().pending(), 0);

    runner.apply(Command::StartGame).expect("restart");
    let view = runner.app().arcade_view();
    assert_eq!(view.phase, GamePhase::Playing);
    assert_eq!((view.score, view.missed), (0, 0));
}

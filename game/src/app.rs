//! Ties the coach and the arcade to landmark sources and the scheduler.
//!
//! Both features share nothing but the loop: the coach consumes pose
//! frames and a 1 Hz timer, the arcade consumes hand frames and the render
//! tick. A failed source disables only the feature that needs it.

use engine::scheduler::{DISPLAY_REFRESH, ONE_SECOND};
use engine::{Delivery, Fired, FrameSlot, LandmarkFrame, LandmarkSource, Scheduler, TaskControl, TaskId};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::exercise::Exercise;
use crate::feedback::FeedbackTier;
use crate::fruit::{Fruit, FruitGame, GAME_ID, GamePhase, GameState};
use crate::high_score::HighScoreStore;
use crate::session::{CoachEngine, ExerciseSession, SessionError, SessionState, TickOutcome};
use crate::settings::Settings;

pub const RENDER_TASK: &str = "render";
pub const TIMER_TASK: &str = "session_timer";
pub const DELIVERY_TASK: &str = "deliveries";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Coach,
    Arcade,
}

impl Feature {
    fn unavailable_message(self) -> &'static str {
        match self {
            Feature::Coach => "Could not access webcam. Please ensure permissions are granted.",
            Feature::Arcade => "Camera access denied. Please allow camera to play the game.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    Disconnected,
    Connected,
    Unavailable { message: String },
}

impl SourceStatus {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, SourceStatus::Unavailable { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    StartSession(Exercise),
    StopSession,
    CalibrateCatCow,
    StartGame,
    ResetGame,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("{0:?} is disabled: its landmark source is unavailable")]
    SourceUnavailable(Feature),

    #[error("no pose frame received yet")]
    NoPoseFrame,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoachView {
    pub exercise: &'static str,
    pub exercise_name: &'static str,
    pub state: SessionState,
    pub score: Option<f32>,
    pub feedback: Option<FeedbackTier>,
    pub feedback_message: &'static str,
    pub rep_count: u32,
    pub perfect_rep_count: u32,
    pub time_remaining_secs: u32,
    pub average_score: f64,
    /// Calibrated Cat-Cow spine length, if any.
    pub cat_cow_baseline: Option<f32>,
    pub source: SourceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArcadeView {
    pub phase: GamePhase,
    pub score: u32,
    pub missed: u32,
    pub high_score: u32,
    pub fall_speed: f32,
    pub difficulty: u32,
    pub game_over: bool,
    /// Set once the game is over.
    pub final_score: Option<u32>,
    pub fruits: Vec<Fruit>,
    pub source: SourceStatus,
}

pub struct App {
    settings: Settings,
    coach: CoachEngine,
    session: ExerciseSession,
    fruit: FruitGame,
    game: GameState,
    high_scores: HighScoreStore,
    pose_slot: FrameSlot<LandmarkFrame>,
    hands_slot: FrameSlot<Vec<LandmarkFrame>>,
    last_pose: Option<LandmarkFrame>,
    hands: Vec<LandmarkFrame>,
    pose_status: SourceStatus,
    hand_status: SourceStatus,
    timer_task: Option<TaskId>,
    render_task: Option<TaskId>,
}

impl App {
    pub fn new(settings: Settings, high_scores: HighScoreStore) -> Self {
        Self {
            coach: CoachEngine::new(settings.coach),
            session: ExerciseSession::new(),
            fruit: FruitGame::new(settings.arcade.playfield, settings.arcade.seed),
            game: GameState::default(),
            high_scores,
            pose_slot: FrameSlot::new(),
            hands_slot: FrameSlot::new(),
            last_pose: None,
            hands: Vec::new(),
            pose_status: SourceStatus::Disconnected,
            hand_status: SourceStatus::Disconnected,
            timer_task: None,
            render_task: None,
            settings,
        }
    }

    pub fn session(&self) -> &ExerciseSession {
        &self.session
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn high_scores(&self) -> &HighScoreStore {
        &self.high_scores
    }

    pub fn dropped_frames(&self) -> u64 {
        self.pose_slot.dropped() + self.hands_slot.dropped()
    }

    fn status_mut(&mut self, feature: Feature) -> &mut SourceStatus {
        match feature {
            Feature::Coach => &mut self.pose_status,
            Feature::Arcade => &mut self.hand_status,
        }
    }

    /// Subscribes to `source` on behalf of `feature`.
    ///
    /// On failure the feature is disabled with a user-visible message and
    /// the other feature keeps working.
    pub fn connect(&mut self, feature: Feature, source: &mut dyn LandmarkSource) {
        let pose_slot = self.pose_slot.clone();
        let hands_slot = self.hands_slot.clone();
        let handler = Box::new(move |delivery: Delivery| match delivery {
            Delivery::Pose { frame: Some(frame) } => pose_slot.publish(frame),
            Delivery::Pose { frame: None } => {}
            Delivery::Hands { hands } => hands_slot.publish(hands),
        });

        let status = match source.subscribe(handler) {
            Ok(()) => {
                info!(?feature, "landmark source connected");
                SourceStatus::Connected
            }
            Err(err) => {
                warn!(?feature, %err, "landmark source unavailable, feature disabled");
                SourceStatus::Unavailable {
                    message: feature.unavailable_message().to_string(),
                }
            }
        };
        *self.status_mut(feature) = status;
    }

    pub fn apply(&mut self, sched: &mut Scheduler, command: Command) -> Result<(), AppError> {
        match command {
            Command::StartSession(exercise) => {
                if self.pose_status.is_unavailable() {
                    return Err(AppError::SourceUnavailable(Feature::Coach));
                }
                self.coach.start(&mut self.session, exercise)?;
                if let Some(old) = self.timer_task.take() {
                    sched.cancel(old);
                }
                self.timer_task = Some(sched.schedule_repeating(TIMER_TASK, ONE_SECOND));
            }
            Command::StopSession => {
                self.coach.stop(&mut self.session);
                if let Some(timer) = self.timer_task.take() {
                    sched.cancel(timer);
                }
            }
            Command::CalibrateCatCow => {
                let frame = self.last_pose.as_ref().ok_or(AppError::NoPoseFrame)?;
                self.coach
                    .calibrate_cat_cow(frame)
                    .ok_or(AppError::NoPoseFrame)?;
            }
            Command::StartGame => {
                if self.hand_status.is_unavailable() {
                    return Err(AppError::SourceUnavailable(Feature::Arcade));
                }
                self.fruit.start(&mut self.game);
                self.ensure_render_loop(sched);
            }
            Command::ResetGame => {
                self.fruit.reset(&mut self.game);
                if let Some(render) = self.render_task.take() {
                    sched.cancel(render);
                }
            }
        }
        Ok(())
    }

    fn ensure_render_loop(&mut self, sched: &mut Scheduler) {
        if self.render_task.is_some_and(|id| sched.is_scheduled(id)) {
            return;
        }
        self.render_task = Some(sched.schedule_repeating(RENDER_TASK, DISPLAY_REFRESH));
    }

    /// Consumes whatever the sources published since the last call. Only
    /// the newest pose frame and the newest hand set are seen.
    pub fn process_deliveries(&mut self, sched: &mut Scheduler) {
        if let Some(frame) = self.pose_slot.take() {
            if let Some(report) = self.coach.process_frame(&mut self.session, &frame) {
                debug!(score = report.score, tier = ?report.tier, "pose frame scored");
            }
            self.last_pose = Some(frame);
        }

        if let Some(mut hands) = self.hands_slot.take() {
            hands.truncate(Delivery::MAX_HANDS);
            self.hands = hands;
            if self.settings.arcade.autostart && self.game.phase == GamePhase::Ready {
                self.fruit.start(&mut self.game);
                self.ensure_render_loop(sched);
            }
        }
    }

    /// Scheduler callback. Each stream stops rescheduling itself once its
    /// feature has nothing left to do.
    pub fn on_task(&mut self, fired: Fired) -> TaskControl {
        if Some(fired.task) == self.render_task {
            return self.render_tick();
        }
        if Some(fired.task) == self.timer_task {
            return self.timer_tick();
        }
        TaskControl::Stop
    }

    fn render_tick(&mut self) -> TaskControl {
        self.fruit.update(&mut self.game, &self.hands, &mut self.high_scores);
        if self.game.is_playing() {
            TaskControl::Reschedule
        } else {
            self.render_task = None;
            TaskControl::Stop
        }
    }

    fn timer_tick(&mut self) -> TaskControl {
        match self.coach.tick(&mut self.session) {
            TickOutcome::Counting { .. } => TaskControl::Reschedule,
            TickOutcome::Completed | TickOutcome::Ignored => {
                self.timer_task = None;
                TaskControl::Stop
            }
        }
    }

    pub fn coach_view(&self) -> CoachView {
        let session = &self.session;
        CoachView {
            exercise: session.exercise.id(),
            exercise_name: session.exercise.name(),
            state: session.state,
            score: session.last_score,
            feedback: session.feedback(),
            feedback_message: session.feedback_message(),
            rep_count: session.rep_count,
            perfect_rep_count: session.perfect_rep_count,
            time_remaining_secs: session.time_remaining_secs(),
            average_score: session.average_score(),
            cat_cow_baseline: self.coach.cat_cow_baseline(),
            source: self.pose_status.clone(),
        }
    }

    pub fn arcade_view(&self) -> ArcadeView {
        ArcadeView {
            phase: self.game.phase,
            score: self.game.score,
            missed: self.game.missed,
            high_score: self.high_scores.get(GAME_ID),
            fall_speed: self.game.fall_speed,
            difficulty: self.game.difficulty_level(),
            game_over: self.game.is_over(),
            final_score: self.game.is_over().then_some(self.game.score),
            fruits: self.game.objects.clone(),
            source: self.hand_status.clone(),
        }
    }
}

//! Guided-exercise session: countdown, scoring and repetition counting.

use engine::LandmarkFrame;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::exercise::Exercise;
use crate::feedback::{COMPLETE_MESSAGE, FeedbackTier};
use crate::reps::{CompletedRep, RepDetector, motion_signal};
use crate::round_timer::RoundTimer;
use crate::scoring::{CatCowScorer, ExerciseScorer, Scorer};
use crate::settings::CoachSettings;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    Complete,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("a {0} session is already running")]
    AlreadyRunning(Exercise),
}

/// All per-session counters. Owned by the caller and handed to
/// [`CoachEngine`] for every transition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSession {
    pub exercise: Exercise,
    pub state: SessionState,
    pub timer: RoundTimer,
    pub rep_count: u32,
    pub perfect_rep_count: u32,
    pub score_sum: f64,
    pub score_samples: u32,
    pub last_score: Option<f32>,
}

impl ExerciseSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn time_remaining_secs(&self) -> u32 {
        self.timer.remaining_secs()
    }

    pub fn average_score(&self) -> f64 {
        self.score_sum / self.score_samples.max(1) as f64
    }

    pub fn feedback(&self) -> Option<FeedbackTier> {
        self.last_score.map(FeedbackTier::classify)
    }

    pub fn feedback_message(&self) -> &'static str {
        if self.state == SessionState::Complete {
            return COMPLETE_MESSAGE;
        }
        self.feedback().map(FeedbackTier::message).unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No session is running; the tick should not have been scheduled.
    Ignored,
    Counting { remaining_secs: u32 },
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub score: f32,
    pub tier: FeedbackTier,
    pub rep: Option<CompletedRep>,
}

/// Drives an [`ExerciseSession`] from timer ticks and pose frames.
#[derive(Debug, Clone)]
pub struct CoachEngine {
    settings: CoachSettings,
    scorer: Scorer,
    detector: RepDetector,
    cat_cow_baseline: Option<f32>,
}

impl CoachEngine {
    pub fn new(settings: CoachSettings) -> Self {
        let exercise = Exercise::default();
        Self {
            scorer: Scorer::for_exercise(exercise),
            detector: RepDetector::new(settings.thresholds(exercise)),
            settings,
            cat_cow_baseline: None,
        }
    }

    pub fn cat_cow_baseline(&self) -> Option<f32> {
        self.cat_cow_baseline
    }

    fn scorer_for(&self, exercise: Exercise) -> Scorer {
        match (exercise, self.cat_cow_baseline) {
            (Exercise::CatCow, Some(baseline)) => Scorer::CatCow(CatCowScorer::with_baseline(baseline)),
            _ => Scorer::for_exercise(exercise),
        }
    }

    /// Begins a fresh session. Only valid from Idle or Complete.
    pub fn start(&mut self, session: &mut ExerciseSession, exercise: Exercise) -> Result<(), SessionError> {
        if session.is_running() {
            return Err(SessionError::AlreadyRunning(session.exercise));
        }
        *session = ExerciseSession {
            exercise,
            state: SessionState::Running,
            timer: RoundTimer::new(exercise.duration_secs()),
            ..ExerciseSession::default()
        };
        self.scorer = self.scorer_for(exercise);
        self.detector = RepDetector::new(self.settings.thresholds(exercise));
        info!(exercise = exercise.id(), duration_secs = exercise.duration_secs(), "session started");
        Ok(())
    }

    /// Ends a running session early. Counters are kept for the summary.
    pub fn stop(&mut self, session: &mut ExerciseSession) -> bool {
        if !session.is_running() {
            return false;
        }
        session.state = SessionState::Complete;
        info!(
            exercise = session.exercise.id(),
            reps = session.rep_count,
            remaining_secs = session.time_remaining_secs(),
            "session stopped"
        );
        true
    }

    pub fn tick(&mut self, session: &mut ExerciseSession) -> TickOutcome {
        if !session.is_running() {
            return TickOutcome::Ignored;
        }
        if !session.timer.tick() {
            return TickOutcome::Counting {
                remaining_secs: session.time_remaining_secs(),
            };
        }
        session.state = SessionState::Complete;
        info!(
            exercise = session.exercise.id(),
            reps = session.rep_count,
            perfect_reps = session.perfect_rep_count,
            average_score = session.average_score(),
            "session complete"
        );
        TickOutcome::Completed
    }

    /// Scores one pose frame and feeds the repetition detector.
    ///
    /// Frames arriving while no session runs are ignored.
    pub fn process_frame(&mut self, session: &mut ExerciseSession, frame: &LandmarkFrame) -> Option<FrameReport> {
        if !session.is_running() {
            return None;
        }
        let score = self.scorer.score(frame);
        session.last_score = Some(score);
        session.score_sum += f64::from(score);
        session.score_samples += 1;

        let rep = motion_signal(session.exercise, frame).and_then(|signal| self.detector.observe(signal, score));
        if let Some(rep) = rep {
            session.rep_count += 1;
            if rep.perfect {
                session.perfect_rep_count += 1;
            }
            debug!(
                reps = session.rep_count,
                perfect = rep.perfect,
                quality = rep.quality,
                "repetition completed"
            );
        }

        Some(FrameReport {
            score,
            tier: FeedbackTier::classify(score),
            rep,
        })
    }

    /// Captures a neutral Cat-Cow spine length from `frame`.
    pub fn calibrate_cat_cow(&mut self, frame: &LandmarkFrame) -> Option<f32> {
        let mut scorer = CatCowScorer::default();
        let baseline = scorer.calibrate(frame)?;
        self.cat_cow_baseline = Some(baseline);
        if self.scorer.exercise() == Exercise::CatCow {
            self.scorer = Scorer::CatCow(scorer);
        }
        info!(baseline, "cat-cow baseline calibrated");
        Some(baseline)
    }
}

impl Default for CoachEngine {
    fn default() -> Self {
        Self::new(CoachSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_resets_counters_and_sets_duration() {
        let mut engine = CoachEngine::default();
        let mut session = ExerciseSession {
            state: SessionState::Complete,
            rep_count: 4,
            perfect_rep_count: 2,
            score_sum: 30.0,
            score_samples: 5,
            ..ExerciseSession::default()
        };
        engine.start(&mut session, Exercise::CatCow).expect("start from complete");
        assert_eq!(session.state, SessionState::Running);
        assert_eq!(session.rep_count, 0);
        assert_eq!(session.perfect_rep_count, 0);
        assert_eq!(session.score_samples, 0);
        assert_eq!(session.time_remaining_secs(), 45);
    }

    #[test]
    fn start_while_running_is_rejected() {
        let mut engine = CoachEngine::default();
        let mut session = ExerciseSession::new();
        engine.start(&mut session, Exercise::WallAngels).expect("first start");
        assert_eq!(
            engine.start(&mut session, Exercise::SpinalTwist),
            Err(SessionError::AlreadyRunning(Exercise::WallAngels))
        );
        assert_eq!(session.exercise, Exercise::WallAngels);
    }

    #[test]
    fn stop_completes_only_running_sessions() {
        let mut engine = CoachEngine::default();
        let mut session = ExerciseSession::new();
        assert!(!engine.stop(&mut session));
        engine.start(&mut session, Exercise::WallAngels).expect("start");
        assert!(engine.stop(&mut session));
        assert_eq!(session.state, SessionState::Complete);
        assert_eq!(session.feedback_message(), COMPLETE_MESSAGE);
        assert_eq!(engine.tick(&mut session), TickOutcome::Ignored);
    }

    #[test]
    fn average_of_empty_session_is_zero() {
        assert_eq!(ExerciseSession::new().average_score(), 0.0);
    }
}

//! Per-frame posture quality scoring.
//!
//! Each exercise is a strategy over the same contract: one pose frame in,
//! one score in `[0, 10]` out. Frames shorter than a strategy needs score 0.

use engine::landmark::{
    LEFT_ELBOW, LEFT_HIP, LEFT_SHOULDER, RIGHT_ELBOW, RIGHT_HIP, RIGHT_SHOULDER,
};
use engine::{Landmark, LandmarkFrame, Point2};

use crate::exercise::Exercise;

pub const MAX_SCORE: f32 = 10.0;

/// Spine-length deviation at which the Cat-Cow movement sub-score saturates.
pub const CAT_COW_FULL_DEVIATION: f32 = 0.15;

const DEGENERATE_LENGTH: f32 = 1e-4;

pub trait ExerciseScorer {
    fn required_landmarks(&self) -> usize;

    fn score(&self, frame: &LandmarkFrame) -> f32;
}

/// `10 - min(|Δy| * 100, 10)`, never below zero.
pub fn shoulder_alignment(left: Landmark, right: Landmark) -> f32 {
    let diff = (left.y - right.y).abs();
    (MAX_SCORE - (diff * 100.0).min(MAX_SCORE)).max(0.0)
}

fn finish(score: f32) -> f32 {
    if score.is_finite() {
        score.clamp(0.0, MAX_SCORE)
    } else {
        0.0
    }
}

fn mean(parts: &[f32]) -> f32 {
    if parts.is_empty() {
        return 0.0;
    }
    parts.iter().sum::<f32>() / parts.len() as f32
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Torso {
    pub left_shoulder: Landmark,
    pub right_shoulder: Landmark,
    pub shoulder_center: Point2,
    pub hip_center: Point2,
    pub hip_width: f32,
}

impl Torso {
    pub fn from_frame(frame: &LandmarkFrame) -> Option<Self> {
        let left_shoulder = frame.get(LEFT_SHOULDER)?;
        let right_shoulder = frame.get(RIGHT_SHOULDER)?;
        let left_hip = frame.get(LEFT_HIP)?;
        let right_hip = frame.get(RIGHT_HIP)?;
        Some(Self {
            left_shoulder,
            right_shoulder,
            shoulder_center: left_shoulder.midpoint(right_shoulder),
            hip_center: left_hip.midpoint(right_hip),
            hip_width: (left_hip.x - right_hip.x).abs(),
        })
    }

    pub fn spine_length(&self) -> f32 {
        self.shoulder_center.distance(self.hip_center)
    }

    /// Angle of the hip-to-shoulder vector, in degrees.
    pub fn rotation_degrees(&self) -> f32 {
        let dy = self.shoulder_center.y - self.hip_center.y;
        let dx = self.shoulder_center.x - self.hip_center.x;
        dy.atan2(dx).to_degrees()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WallAngelsScorer;

impl ExerciseScorer for WallAngelsScorer {
    fn required_landmarks(&self) -> usize {
        Exercise::WallAngels.required_landmarks()
    }

    fn score(&self, frame: &LandmarkFrame) -> f32 {
        if frame.len() < self.required_landmarks() {
            return 0.0;
        }
        let (Some(ls), Some(rs), Some(le), Some(re)) = (
            frame.get(LEFT_SHOULDER),
            frame.get(RIGHT_SHOULDER),
            frame.get(LEFT_ELBOW),
            frame.get(RIGHT_ELBOW),
        ) else {
            return 0.0;
        };

        let alignment = shoulder_alignment(ls, rs);
        let left_offset = (le.x - ls.x).abs();
        let right_offset = (re.x - rs.x).abs();
        let symmetry = (MAX_SCORE - (left_offset - right_offset).abs() * 20.0).max(0.0);
        finish(mean(&[alignment, symmetry]))
    }
}

/// Scores Cat-Cow from spine-length change against a neutral baseline.
///
/// Without calibration the baseline is the frame's own vertical
/// shoulder-to-hip distance.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CatCowScorer {
    baseline: Option<f32>,
}

impl CatCowScorer {
    pub fn with_baseline(baseline: f32) -> Self {
        let mut scorer = Self::default();
        scorer.set_baseline(baseline);
        scorer
    }

    pub fn baseline(&self) -> Option<f32> {
        self.baseline
    }

    pub fn set_baseline(&mut self, baseline: f32) {
        self.baseline = (baseline.is_finite() && baseline >= DEGENERATE_LENGTH).then_some(baseline);
    }

    /// Captures the frame's spine length as the neutral baseline.
    pub fn calibrate(&mut self, frame: &LandmarkFrame) -> Option<f32> {
        if frame.len() < self.required_landmarks() {
            return None;
        }
        let length = Torso::from_frame(frame)?.spine_length();
        self.set_baseline(length);
        self.baseline
    }

    fn movement(&self, torso: &Torso) -> f32 {
        let baseline = self
            .baseline
            .unwrap_or_else(|| (torso.shoulder_center.y - torso.hip_center.y).abs());
        if baseline.is_nan() || baseline < DEGENERATE_LENGTH {
            return 0.0;
        }
        let deviation = (torso.spine_length() - baseline).abs() / baseline;
        (deviation / CAT_COW_FULL_DEVIATION).min(1.0) * MAX_SCORE
    }
}

impl ExerciseScorer for CatCowScorer {
    fn required_landmarks(&self) -> usize {
        Exercise::CatCow.required_landmarks()
    }

    fn score(&self, frame: &LandmarkFrame) -> f32 {
        if frame.len() < self.required_landmarks() {
            return 0.0;
        }
        let Some(torso) = Torso::from_frame(frame) else {
            return 0.0;
        };
        let alignment = shoulder_alignment(torso.left_shoulder, torso.right_shoulder);
        finish(mean(&[alignment, self.movement(&torso)]))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpinalTwistScorer;

impl ExerciseScorer for SpinalTwistScorer {
    fn required_landmarks(&self) -> usize {
        Exercise::SpinalTwist.required_landmarks()
    }

    fn score(&self, frame: &LandmarkFrame) -> f32 {
        if frame.len() < self.required_landmarks() {
            return 0.0;
        }
        let Some(torso) = Torso::from_frame(frame) else {
            return 0.0;
        };
        let alignment = shoulder_alignment(torso.left_shoulder, torso.right_shoulder);
        let rotation = (torso.rotation_degrees().abs() / 9.0).min(MAX_SCORE);
        finish(mean(&[alignment, rotation]))
    }
}

/// The scoring strategy selected by an [`Exercise`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scorer {
    WallAngels(WallAngelsScorer),
    CatCow(CatCowScorer),
    SpinalTwist(SpinalTwistScorer),
}

impl Scorer {
    pub fn for_exercise(exercise: Exercise) -> Self {
        match exercise {
            Exercise::WallAngels => Scorer::WallAngels(WallAngelsScorer),
            Exercise::CatCow => Scorer::CatCow(CatCowScorer::default()),
            Exercise::SpinalTwist => Scorer::SpinalTwist(SpinalTwistScorer),
        }
    }

    pub fn exercise(&self) -> Exercise {
        match self {
            Scorer::WallAngels(_) => Exercise::WallAngels,
            Scorer::CatCow(_) => Exercise::CatCow,
            Scorer::SpinalTwist(_) => Exercise::SpinalTwist,
        }
    }

    fn strategy(&self) -> &dyn ExerciseScorer {
        match self {
            Scorer::WallAngels(s) => s,
            Scorer::CatCow(s) => s,
            Scorer::SpinalTwist(s) => s,
        }
    }
}

impl ExerciseScorer for Scorer {
    fn required_landmarks(&self) -> usize {
        self.strategy().required_landmarks()
    }

    fn score(&self, frame: &LandmarkFrame) -> f32 {
        self.strategy().score(frame)
    }
}

/// Scores one frame with the uncalibrated strategy for `exercise`.
pub fn score(exercise: Exercise, frame: &LandmarkFrame) -> f32 {
    Scorer::for_exercise(exercise).score(frame)
}

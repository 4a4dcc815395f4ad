//! Repetition counting from sustained threshold crossings.
//!
//! Every exercise reduces a pose frame to one scalar motion signal. A
//! hysteresis detector walks that signal through Down -> Up -> Down; a
//! phase change only counts once the signal stays past its threshold for
//! `sustain_frames` consecutive frames, so single-frame jitter never
//! completes a rep.

use engine::landmark::{LEFT_SHOULDER, LEFT_WRIST, NOSE, RIGHT_SHOULDER, RIGHT_WRIST};
use engine::LandmarkFrame;
use serde::{Deserialize, Serialize};

use crate::exercise::Exercise;
use crate::feedback::PERFECT_SCORE;
use crate::scoring::Torso;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RepThresholds {
    pub up: f32,
    pub down: f32,
    pub sustain_frames: u32,
}

impl RepThresholds {
    pub const fn new(up: f32, down: f32, sustain_frames: u32) -> Self {
        Self {
            up,
            down,
            sustain_frames,
        }
    }

    pub fn for_exercise(exercise: Exercise) -> Self {
        match exercise {
            // wrists this far above the shoulders count as "overhead"
            Exercise::WallAngels => Self::new(0.25, 0.12, 3),
            // nose above vs. below the shoulder line
            Exercise::CatCow => Self::new(0.05, -0.03, 3),
            // shoulder-center offset in hip widths
            Exercise::SpinalTwist => Self::new(0.35, 0.15, 3),
        }
    }

    /// Repairs hand-edited values: `down < up`, finite, at least one frame of sustain.
    pub fn sanitized(self, fallback: RepThresholds) -> Self {
        if !self.up.is_finite() || !self.down.is_finite() || self.up == self.down {
            return fallback;
        }
        Self {
            up: self.up.max(self.down),
            down: self.up.min(self.down),
            sustain_frames: self.sustain_frames.max(1),
        }
    }
}

/// The scalar each exercise's repetitions oscillate on. `None` when the
/// frame lacks the landmarks it needs.
pub fn motion_signal(exercise: Exercise, frame: &LandmarkFrame) -> Option<f32> {
    let signal = match exercise {
        Exercise::WallAngels => {
            let shoulders = (frame.get(LEFT_SHOULDER)?.y + frame.get(RIGHT_SHOULDER)?.y) / 2.0;
            let wrists = (frame.get(LEFT_WRIST)?.y + frame.get(RIGHT_WRIST)?.y) / 2.0;
            shoulders - wrists
        }
        Exercise::CatCow => {
            let torso = Torso::from_frame(frame)?;
            torso.shoulder_center.y - frame.get(NOSE)?.y
        }
        Exercise::SpinalTwist => {
            let torso = Torso::from_frame(frame)?;
            if torso.hip_width < 1e-4 {
                return None;
            }
            (torso.shoulder_center.x - torso.hip_center.x).abs() / torso.hip_width
        }
    };
    signal.is_finite().then_some(signal)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionPhase {
    #[default]
    Down,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletedRep {
    /// Mean frame score over the repetition's cycle.
    pub quality: f32,
    pub perfect: bool,
}

#[derive(Debug, Clone)]
pub struct RepDetector {
    thresholds: RepThresholds,
    phase: MotionPhase,
    streak: u32,
    cycle_score_sum: f32,
    cycle_samples: u32,
}

impl RepDetector {
    pub fn new(thresholds: RepThresholds) -> Self {
        Self {
            thresholds,
            phase: MotionPhase::Down,
            streak: 0,
            cycle_score_sum: 0.0,
            cycle_samples: 0,
        }
    }

    pub fn phase(&self) -> MotionPhase {
        self.phase
    }

    pub fn observe(&mut self, signal: f32, frame_score: f32) -> Option<CompletedRep> {
        self.cycle_score_sum += frame_score;
        self.cycle_samples += 1;

        let beyond = match self.phase {
            MotionPhase::Down => signal > self.thresholds.up,
            MotionPhase::Up => signal < self.thresholds.down,
        };
        if !beyond {
            self.streak = 0;
            return None;
        }

        self.streak += 1;
        if self.streak < self.thresholds.sustain_frames {
            return None;
        }
        self.streak = 0;

        match self.phase {
            MotionPhase::Down => {
                self.phase = MotionPhase::Up;
                None
            }
            MotionPhase::Up => {
                self.phase = MotionPhase::Down;
                let quality = self.cycle_score_sum / self.cycle_samples.max(1) as f32;
                self.cycle_score_sum = 0.0;
                self.cycle_samples = 0;
                Some(CompletedRep {
                    quality,
                    perfect: quality >= PERFECT_SCORE,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> RepDetector {
        RepDetector::new(RepThresholds::new(0.5, 0.2, 2))
    }

    fn feed(det: &mut RepDetector, signals: &[f32], score: f32) -> Vec<CompletedRep> {
        signals.iter().filter_map(|&s| det.observe(s, score)).collect()
    }

    #[test]
    fn full_cycle_completes_one_rep() {
        let mut det = detector();
        let reps = feed(&mut det, &[0.0, 0.6, 0.7, 0.4, 0.1, 0.1], 9.5);
        assert_eq!(reps.len(), 1);
        assert!(reps[0].perfect);
        assert_eq!(det.phase(), MotionPhase::Down);
    }

    #[test]
    fn single_frame_spikes_are_ignored() {
        let mut det = detector();
        let reps = feed(&mut det, &[0.0, 0.9, 0.0, 0.9, 0.0, 0.9, 0.0], 10.0);
        assert!(reps.is_empty());
        assert_eq!(det.phase(), MotionPhase::Down);
    }

    #[test]
    fn hovering_between_thresholds_does_not_return_down() {
        let mut det = detector();
        let reps = feed(&mut det, &[0.6, 0.6, 0.3, 0.3, 0.3, 0.3], 8.0);
        assert!(reps.is_empty());
        assert_eq!(det.phase(), MotionPhase::Up);
    }

    #[test]
    fn rep_quality_is_cycle_mean() {
        let mut det = detector();
        let mut reps = Vec::new();
        for (signal, score) in [(0.6, 10.0), (0.6, 10.0), (0.1, 7.0), (0.1, 7.0)] {
            reps.extend(det.observe(signal, score));
        }
        assert_eq!(reps.len(), 1);
        assert!((reps[0].quality - 8.5).abs() < 1e-5);
        assert!(!reps[0].perfect);
    }

    #[test]
    fn sanitize_swaps_inverted_thresholds() {
        let fixed = RepThresholds::new(0.1, 0.3, 0).sanitized(RepThresholds::new(1.0, 0.0, 1));
        assert_eq!(fixed, RepThresholds::new(0.3, 0.1, 1));
        let fallback = RepThresholds::new(1.0, 0.0, 1);
        assert_eq!(RepThresholds::new(f32::NAN, 0.1, 3).sanitized(fallback), fallback);
    }
}

//! Synthetic landmark scripts for running without a camera.
//!
//! Coach scripts sweep the exercise's motion signal through full
//! repetitions; arcade scripts sweep one hand back and forth near the
//! bottom of the playfield.

use std::f32::consts::TAU;

use engine::landmark::{
    HAND_LANDMARK_COUNT, LEFT_ELBOW, LEFT_HIP, LEFT_SHOULDER, LEFT_WRIST, NOSE, POSE_LANDMARK_COUNT,
    RIGHT_ELBOW, RIGHT_HIP, RIGHT_SHOULDER, RIGHT_WRIST,
};
use engine::{Delivery, Landmark, LandmarkFrame, ScriptedDelivery, ScriptedSource};

use crate::exercise::Exercise;

/// Roughly what a webcam pose model delivers.
pub const POSE_FRAME_MS: u64 = 33;
pub const HAND_FRAME_MS: u64 = 33;
pub const REP_PERIOD_SECS: f32 = 3.0;
pub const HAND_SWEEP_SECS: f32 = 2.5;

const SHOULDER_Y: f32 = 0.40;
const HIP_Y: f32 = 0.75;
const HIP_HALF_WIDTH: f32 = 0.10;
const SHOULDER_HALF_WIDTH: f32 = 0.14;

/// 0 at rest, 1 at the peak of a repetition.
fn rep_phase(t_secs: f32) -> f32 {
    0.5 - 0.5 * (TAU * t_secs / REP_PERIOD_SECS).cos()
}

fn neutral_pose() -> LandmarkFrame {
    let mut frame = LandmarkFrame::new(vec![Landmark::new(0.5, 0.5).with_visibility(0.9); POSE_LANDMARK_COUNT]);
    frame.set(NOSE, Landmark::new(0.5, 0.28));
    frame.set(LEFT_SHOULDER, Landmark::new(0.5 + SHOULDER_HALF_WIDTH, SHOULDER_Y));
    frame.set(RIGHT_SHOULDER, Landmark::new(0.5 - SHOULDER_HALF_WIDTH, SHOULDER_Y));
    frame.set(LEFT_ELBOW, Landmark::new(0.5 + SHOULDER_HALF_WIDTH, 0.52));
    frame.set(RIGHT_ELBOW, Landmark::new(0.5 - SHOULDER_HALF_WIDTH, 0.52));
    frame.set(LEFT_WRIST, Landmark::new(0.5 + SHOULDER_HALF_WIDTH, 0.45));
    frame.set(RIGHT_WRIST, Landmark::new(0.5 - SHOULDER_HALF_WIDTH, 0.45));
    frame.set(LEFT_HIP, Landmark::new(0.5 + HIP_HALF_WIDTH, HIP_Y));
    frame.set(RIGHT_HIP, Landmark::new(0.5 - HIP_HALF_WIDTH, HIP_Y));
    frame
}

/// The pose at `t_secs` into a steady stream of `exercise` repetitions.
pub fn exercise_pose(exercise: Exercise, t_secs: f32) -> LandmarkFrame {
    let phase = rep_phase(t_secs);
    let mut frame = neutral_pose();
    match exercise {
        Exercise::WallAngels => {
            // wrists travel from just below the shoulders to well overhead
            let wrist_y = SHOULDER_Y + 0.05 - 0.40 * phase;
            frame.set(LEFT_WRIST, Landmark::new(0.5 + SHOULDER_HALF_WIDTH, wrist_y));
            frame.set(RIGHT_WRIST, Landmark::new(0.5 - SHOULDER_HALF_WIDTH, wrist_y));
        }
        Exercise::CatCow => {
            // head dips below the shoulder line, then lifts above it
            let nose_y = SHOULDER_Y + 0.06 - 0.16 * phase;
            frame.set(NOSE, Landmark::new(0.5, nose_y));
            let shoulder_y = SHOULDER_Y - 0.03 * phase;
            frame.set(LEFT_SHOULDER, Landmark::new(0.5 + SHOULDER_HALF_WIDTH, shoulder_y));
            frame.set(RIGHT_SHOULDER, Landmark::new(0.5 - SHOULDER_HALF_WIDTH, shoulder_y));
        }
        Exercise::SpinalTwist => {
            let offset = 2.0 * HIP_HALF_WIDTH * 0.5 * phase;
            frame.set(LEFT_SHOULDER, Landmark::new(0.5 + SHOULDER_HALF_WIDTH + offset, SHOULDER_Y));
            frame.set(RIGHT_SHOULDER, Landmark::new(0.5 - SHOULDER_HALF_WIDTH + offset, SHOULDER_Y));
        }
    }
    frame
}

pub fn coach_script(exercise: Exercise, seconds: u32) -> Vec<ScriptedDelivery> {
    let end_ms = u64::from(seconds) * 1000;
    (0..)
        .map(|i| i * POSE_FRAME_MS)
        .take_while(|&at_ms| at_ms <= end_ms)
        .map(|at_ms| ScriptedDelivery {
            at_ms,
            delivery: Delivery::pose(exercise_pose(exercise, at_ms as f32 / 1000.0)),
        })
        .collect()
}

pub fn coach_source(exercise: Exercise, seconds: u32) -> ScriptedSource {
    ScriptedSource::new(coach_script(exercise, seconds))
}

/// A hand whose every point sits at normalized (x, y).
pub fn hand_at(x: f32, y: f32) -> LandmarkFrame {
    LandmarkFrame::new(vec![Landmark::new(x, y); HAND_LANDMARK_COUNT])
}

pub fn arcade_script(seconds: u32) -> Vec<ScriptedDelivery> {
    let end_ms = u64::from(seconds) * 1000;
    (0..)
        .map(|i| i * HAND_FRAME_MS)
        .take_while(|&at_ms| at_ms <= end_ms)
        .map(|at_ms| {
            let t = at_ms as f32 / 1000.0;
            let x = 0.5 + 0.45 * (TAU * t / HAND_SWEEP_SECS).sin();
            ScriptedDelivery {
                at_ms,
                delivery: Delivery::hands(vec![hand_at(x, 0.85)]),
            }
        })
        .collect()
}

pub fn arcade_source(seconds: u32) -> ScriptedSource {
    ScriptedSource::new(arcade_script(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reps::{RepThresholds, motion_signal};

    #[test]
    fn every_exercise_sweeps_past_both_thresholds() {
        for exercise in Exercise::ALL {
            let thresholds = RepThresholds::for_exercise(exercise);
            let rest = motion_signal(exercise, &exercise_pose(exercise, 0.0)).expect("rest signal");
            let peak = motion_signal(exercise, &exercise_pose(exercise, REP_PERIOD_SECS / 2.0))
                .expect("peak signal");
            assert!(rest < thresholds.down, "{exercise}: rest {rest}");
            assert!(peak > thresholds.up, "{exercise}: peak {peak}");
        }
    }

    #[test]
    fn scripts_cover_the_requested_duration() {
        let script = coach_script(Exercise::WallAngels, 2);
        assert_eq!(script.first().map(|d| d.at_ms), Some(0));
        assert!(script.last().is_some_and(|d| d.at_ms <= 2000 && d.at_ms > 2000 - POSE_FRAME_MS));
        assert!(arcade_script(0).len() == 1);
    }
}

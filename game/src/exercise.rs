use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exercise {
    #[default]
    WallAngels,
    CatCow,
    SpinalTwist,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown exercise id: {0:?}")]
pub struct ExerciseParseError(pub String);

impl Exercise {
    pub const ALL: [Exercise; 3] = [Exercise::WallAngels, Exercise::CatCow, Exercise::SpinalTwist];

    pub fn id(self) -> &'static str {
        match self {
            Exercise::WallAngels => "wall_angels",
            Exercise::CatCow => "cat_cow",
            Exercise::SpinalTwist => "spinal_twist",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Exercise::WallAngels => "Wall Angels",
            Exercise::CatCow => "Cat-Cow Stretch",
            Exercise::SpinalTwist => "Spinal Twist",
        }
    }

    pub fn duration_secs(self) -> u32 {
        match self {
            Exercise::WallAngels => 30,
            Exercise::CatCow => 45,
            Exercise::SpinalTwist => 30,
        }
    }

    /// Shortest pose frame the scorer for this exercise can read.
    pub fn required_landmarks(self) -> usize {
        match self {
            Exercise::WallAngels => 15,
            Exercise::CatCow | Exercise::SpinalTwist => 25,
        }
    }

    pub fn instructions(self) -> &'static [&'static str] {
        match self {
            Exercise::WallAngels => &[
                "Stand with your back against the wall, head, shoulders, and hips touching.",
                "Bend your elbows to 90 degrees, forearms flat against the wall.",
                "Slowly slide your arms straight up overhead, keeping forearms and wrists touching the wall.",
                "Lower slowly back to the start. Keep shoulders relaxed throughout.",
            ],
            Exercise::CatCow => &[
                "Start on hands and knees in tabletop position, wrists under shoulders, knees under hips.",
                "For Cow (Inhale): Drop your belly towards the mat, lift your head and tailbone.",
                "For Cat (Exhale): Round your spine towards the ceiling, tuck your chin and pelvis.",
                "Move slowly and fluidly with your breath, transitioning between the two poses.",
            ],
            Exercise::SpinalTwist => &[
                "Sit tall with legs extended in front of you.",
                "Bend your right knee and place your right foot flat on the floor outside your left thigh.",
                "Place your right hand on the floor behind you, and hug your left elbow to your right knee.",
                "Gently twist your torso to the right, looking over your right shoulder. Hold, then repeat on the other side.",
            ],
        }
    }
}

impl fmt::Display for Exercise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Exercise {
    type Err = ExerciseParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Exercise::ALL
            .into_iter()
            .find(|e| e.id() == wanted)
            .ok_or_else(|| ExerciseParseError(s.to_string()))
    }
}

use serde::{Deserialize, Serialize};

pub const PERFECT_SCORE: f32 = 9.0;
pub const GOOD_SCORE: f32 = 7.0;

pub const COMPLETE_MESSAGE: &str = "Exercise complete!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackTier {
    Excellent,
    Good,
    AdjustForm,
}

impl FeedbackTier {
    pub fn classify(score: f32) -> Self {
        if score >= PERFECT_SCORE {
            FeedbackTier::Excellent
        } else if score >= GOOD_SCORE {
            FeedbackTier::Good
        } else {
            FeedbackTier::AdjustForm
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            FeedbackTier::Excellent => "Excellent form!",
            FeedbackTier::Good => "Good, but could be better",
            FeedbackTier::AdjustForm => "Adjust your form",
        }
    }
}

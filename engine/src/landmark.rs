use serde::{Deserialize, Serialize};

pub const POSE_LANDMARK_COUNT: usize = 33;
pub const HAND_LANDMARK_COUNT: usize = 21;

// Pose indices (33-point body model).
pub const NOSE: usize = 0;
pub const LEFT_SHOULDER: usize = 11;
pub const RIGHT_SHOULDER: usize = 12;
pub const LEFT_ELBOW: usize = 13;
pub const RIGHT_ELBOW: usize = 14;
pub const LEFT_WRIST: usize = 15;
pub const RIGHT_WRIST: usize = 16;
pub const LEFT_HIP: usize = 23;
pub const RIGHT_HIP: usize = 24;
pub const LEFT_KNEE: usize = 25;
pub const RIGHT_KNEE: usize = 26;
pub const LEFT_ANKLE: usize = 27;
pub const RIGHT_ANKLE: usize = 28;

/// One estimated keypoint. `x`/`y` are normalized to the frame size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f32>,
}

impl Landmark {
    pub const fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            z: None,
            visibility: None,
        }
    }

    pub fn with_depth(mut self, z: f32) -> Self {
        self.z = Some(z);
        self
    }

    pub fn with_visibility(mut self, visibility: f32) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn midpoint(self, other: Landmark) -> Point2 {
        Point2::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Projects into canvas space, flipped horizontally to match a mirrored camera view.
    pub fn to_canvas_mirrored(self, width: f32, height: f32) -> Point2 {
        Point2::new((1.0 - self.x) * width, self.y * height)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point2) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// The ordered keypoint set of one detection pass.
///
/// Index assignment follows the detector's anatomical layout and is never
/// reordered. Frames may be shorter than the full model; consumers check
/// [`LandmarkFrame::len`] before indexing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkFrame {
    points: Vec<Landmark>,
}

impl LandmarkFrame {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    /// Parses a flat `[x, y, z, x, y, z, ...]` buffer, the layout detectors usually hand across FFI.
    pub fn from_flat_xyz(data: &[f32]) -> Self {
        let points = data
            .chunks_exact(3)
            .map(|c| Landmark::new(c[0], c[1]).with_depth(c[2]))
            .collect();
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Landmark> {
        self.points.get(index).copied()
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    pub fn set(&mut self, index: usize, landmark: Landmark) {
        if let Some(slot) = self.points.get_mut(index) {
            *slot = landmark;
        }
    }
}

impl From<Vec<Landmark>> for LandmarkFrame {
    fn from(points: Vec<Landmark>) -> Self {
        Self::new(points)
    }
}

/// What one inference pass delivers.
///
/// Body-pose passes carry at most one frame; hand passes carry zero, one or two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Delivery {
    Pose { frame: Option<LandmarkFrame> },
    Hands { hands: Vec<LandmarkFrame> },
}

impl Delivery {
    pub const MAX_HANDS: usize = 2;

    pub fn pose(frame: LandmarkFrame) -> Self {
        Self::Pose { frame: Some(frame) }
    }

    pub fn hands(mut hands: Vec<LandmarkFrame>) -> Self {
        hands.truncate(Self::MAX_HANDS);
        Self::Hands { hands }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirrored_projection_flips_x_only() {
        let p = Landmark::new(0.25, 0.5).to_canvas_mirrored(800.0, 600.0);
        assert_eq!(p, Point2::new(600.0, 300.0));
    }

    #[test]
    fn flat_buffer_parses_triplets_and_ignores_tail() {
        let frame = LandmarkFrame::from_flat_xyz(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7]);
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.get(1), Some(Landmark::new(0.4, 0.5).with_depth(0.6)));
        assert_eq!(frame.get(2), None);
    }

    #[test]
    fn hands_delivery_keeps_at_most_two() {
        let hand = LandmarkFrame::new(vec![Landmark::default(); HAND_LANDMARK_COUNT]);
        let Delivery::Hands { hands } = Delivery::hands(vec![hand.clone(), hand.clone(), hand])
        else {
            panic!("expected hands delivery");
        };
        assert_eq!(hands.len(), 2);
    }

    #[test]
    fn frame_json_is_a_plain_array() {
        let frame = LandmarkFrame::new(vec![Landmark::new(0.5, 0.25).with_visibility(0.9)]);
        let json = serde_json::to_string(&frame).expect("serialize frame");
        assert_eq!(json, r#"[{"x":0.5,"y":0.25,"visibility":0.9}]"#);
    }
}

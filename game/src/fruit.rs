//! Hand-tracking fruit catcher: falling objects, catches, misses and speed-up.

use engine::{LandmarkFrame, Point2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::high_score::HighScoreStore;

pub const GAME_ID: &str = "fruit_catcher";

pub const POOL_SIZE: usize = 4;
pub const MISS_LIMIT: u32 = 5;
pub const HAND_POINT_RADIUS: f32 = 20.0;
pub const INITIAL_FALL_SPEED: f32 = 2.2;
pub const FALL_SPEED_STEP: f32 = 0.7;
pub const POINTS_PER_SPEED_STEP: u32 = 25;

pub const FRUIT_RADIUS: f32 = 28.0;
pub const SPAWN_Y: f32 = -20.0;
pub const SPAWN_EDGE_MARGIN: f32 = 20.0;
pub const MISS_MARGIN: f32 = 40.0;

pub const DEFAULT_PLAYFIELD_WIDTH: f32 = 800.0;
pub const DEFAULT_PLAYFIELD_HEIGHT: f32 = 600.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Playfield {
    pub width: f32,
    pub height: f32,
}

impl Default for Playfield {
    fn default() -> Self {
        Self {
            width: DEFAULT_PLAYFIELD_WIDTH,
            height: DEFAULT_PLAYFIELD_HEIGHT,
        }
    }
}

impl Playfield {
    pub fn miss_line(&self) -> f32 {
        self.height + MISS_MARGIN
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fruit {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub caught: bool,
}

impl Fruit {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            radius: FRUIT_RADIUS,
            caught: false,
        }
    }

    fn center(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Nothing started yet, or the game was reset.
    #[default]
    Ready,
    Playing,
    Over,
}

/// Everything the render side reads about one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub objects: Vec<Fruit>,
    pub score: u32,
    pub missed: u32,
    pub fall_speed: f32,
    pub phase: GamePhase,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            objects: Vec::new(),
            score: 0,
            missed: 0,
            fall_speed: INITIAL_FALL_SPEED,
            phase: GamePhase::Ready,
        }
    }
}

impl GameState {
    pub fn is_over(&self) -> bool {
        self.phase == GamePhase::Over
    }

    pub fn is_playing(&self) -> bool {
        self.phase == GamePhase::Playing
    }

    /// Fruits neither caught nor past the miss line.
    pub fn active_count(&self, playfield: &Playfield) -> usize {
        self.objects
            .iter()
            .filter(|f| !f.caught && f.y < playfield.miss_line())
            .count()
    }

    /// `1 +` the number of speed steps taken this game.
    pub fn difficulty_level(&self) -> u32 {
        1 + self.score / POINTS_PER_SPEED_STEP
    }
}

/// What one update pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub caught: u32,
    pub missed: u32,
    pub speed_ups: u32,
    pub new_high_score: bool,
    pub game_over: bool,
}

/// Physics and rules for the fruit catcher. Holds the playfield and the
/// spawn RNG; the game itself lives in a [`GameState`] passed in.
#[derive(Debug, Clone)]
pub struct FruitGame {
    playfield: Playfield,
    rng: StdRng,
}

impl FruitGame {
    pub fn new(playfield: Playfield, seed: u64) -> Self {
        Self {
            playfield,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn playfield(&self) -> Playfield {
        self.playfield
    }

    /// Starts a fresh game: zeroed counters, initial speed, full pool.
    pub fn start(&mut self, state: &mut GameState) {
        *state = GameState {
            phase: GamePhase::Playing,
            ..GameState::default()
        };
        self.refill(state);
        info!(pool = state.objects.len(), "game started");
    }

    /// Back to Ready: nothing falling and no loop running.
    pub fn reset(&mut self, state: &mut GameState) {
        *state = GameState::default();
        info!("game reset");
    }

    pub fn spawn(&mut self) -> Fruit {
        let span = (self.playfield.width - 2.0 * SPAWN_EDGE_MARGIN).max(0.0);
        let x = self.rng.r#gen::<f32>() * span + SPAWN_EDGE_MARGIN;
        Fruit::new(x, SPAWN_Y)
    }

    fn refill(&mut self, state: &mut GameState) {
        while state.active_count(&self.playfield) < POOL_SIZE {
            let fruit = self.spawn();
            state.objects.push(fruit);
        }
    }

    /// One render-frame pass: fall, catch, sweep misses, respawn.
    ///
    /// Does nothing unless the game is Playing, so a finished game stays frozen.
    pub fn update(&mut self, state: &mut GameState, hands: &[LandmarkFrame], high_scores: &mut HighScoreStore) -> UpdateOutcome {
        let mut outcome = UpdateOutcome::default();
        if !state.is_playing() {
            return outcome;
        }

        for fruit in state.objects.iter_mut() {
            fruit.y += state.fall_speed;
        }

        for idx in 0..state.objects.len() {
            if state.objects[idx].caught || !self.touches_hand(&state.objects[idx], hands) {
                continue;
            }
            state.objects[idx].caught = true;
            state.score += 1;
            outcome.caught += 1;
            if high_scores.set(GAME_ID, state.score) {
                outcome.new_high_score = true;
            }
            if state.score % POINTS_PER_SPEED_STEP == 0 {
                state.fall_speed += FALL_SPEED_STEP;
                outcome.speed_ups += 1;
                debug!(score = state.score, fall_speed = state.fall_speed, "fall speed increased");
            }
        }

        let miss_line = self.playfield.miss_line();
        state.objects.retain(|f| !f.caught);
        let uncaught = state.objects.len();
        state.objects.retain(|f| f.y < miss_line);
        let missed_now = (uncaught - state.objects.len()) as u32;

        if missed_now > 0 {
            state.missed += missed_now;
            outcome.missed = missed_now;
            debug!(missed = state.missed, "fruit missed");
            if state.missed >= MISS_LIMIT {
                state.phase = GamePhase::Over;
                outcome.game_over = true;
                info!(score = state.score, high_score = high_scores.get(GAME_ID), "game over");
            }
        }

        if !state.is_over() {
            self.refill(state);
        }
        outcome
    }

    fn touches_hand(&self, fruit: &Fruit, hands: &[LandmarkFrame]) -> bool {
        let reach = fruit.radius + HAND_POINT_RADIUS;
        hands.iter().flat_map(|hand| hand.points()).any(|pt| {
            let p = pt.to_canvas_mirrored(self.playfield.width, self.playfield.height);
            fruit.center().distance(p) < reach
        })
    }
}

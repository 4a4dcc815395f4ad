//! Posture coach and fruit-catcher arcade on top of `kinetic-engine`.

pub mod app;
pub mod demo;
pub mod exercise;
pub mod feedback;
pub mod frame_budget;
pub mod fruit;
pub mod high_score;
pub mod reps;
pub mod round_timer;
pub mod runner;
pub mod scoring;
pub mod session;
pub mod settings;

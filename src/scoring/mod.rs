pub mod config;
pub mod engine;

pub use config::ScoringConfig;
pub use engine::{ScoreResult, ScoringEngine};

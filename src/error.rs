use std::io;

use thiserror::Error;

/// Errors produced by environments, learners and their persistence helpers
#[derive(Debug, Error)]
pub enum Error {
    /// The action is not part of the acting agent's discrete action set
    #[error("action {action} is not in the action set of agent `{agent}`")]
    InvalidAction { agent: String, action: String },

    /// A move was requested after the episode already ended
    #[error("the game is already over, reset the environment first")]
    GameOver,

    #[error("board size {size} is too small, the minimum is {min}")]
    BoardTooSmall { size: usize, min: usize },

    /// More transitions were requested than the replay memory holds
    #[error("cannot sample {requested} transitions from a memory holding {available}")]
    InsufficientExperience { requested: usize, available: usize },

    #[error("no agent with id `{0}`")]
    UnknownAgent(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: String, found: String },

    #[error("experiment directory {0} already exists and overwriting is disabled")]
    ExperimentExists(String),

    #[error("failed to read or write a model record: {0}")]
    Record(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

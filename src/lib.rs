/// Actors with discrete action sets
pub mod agent;

/// Implemented RL algorithms
pub mod algo;

/// Experiment configuration and output directories
pub mod config;

/// Implementations of strategies for time-decaying hyperparameters
pub mod decay;

/// Data structures
pub mod ds;

/// Environment
pub mod env;

pub mod error;

/// Exploration policies
pub mod exploration;

/// Games to learn
pub mod gym;

/// Experience replay
pub mod memory;

mod util;

pub use error::{Error, Result};

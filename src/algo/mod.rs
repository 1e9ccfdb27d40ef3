/// Value function approximators for the batched trainer
pub mod approx;

/// Deep Q network and the batched replay trainer
pub mod dqn;

/// Per-episode training statistics
pub mod metrics;

/// Tabular Q-learning
pub mod q_table;

/// Dense action value tables and their persistence
pub mod value_table;

pub use approx::{QFunction, TabularQ};
pub use dqn::{DQNConfig, DQNTrainer, QNetConfig, QNetwork};
pub use metrics::{EpisodeEnd, EpisodeReport, Metrics};
pub use q_table::{Mode, QTableConfig, QTableLearner, UpdateMode};
pub use value_table::{QTables, TableInit, ValueTable};

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
};

use clap::ValueEnum;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    algo::{dqn::DQNConfig, q_table::QTableConfig},
    decay::Multiplicative,
    error::{Error, Result},
    exploration::{DecayPolicy, EpsilonGreedy},
    gym::snake::{Rewards, SnakeConfig, MIN_BOARD_SIZE},
};

/// Name of the config file written into every experiment directory
pub const CONFIG_FILE: &str = "config.json";

/// Games that can be trained on
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Game {
    /// Snake with the 11-bit state encoding
    Snake11,
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Tabular Q-learning, one table per agent
    #[default]
    Qtable,
    /// Deep Q network trained from a replay memory
    Dqn,
}

/// Everything needed to reproduce one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub game: Game,
    pub name: String,
    pub method: Method,
    /// Episodes for tabular learning
    pub episodes: usize,
    /// Environment steps for the DQN trainer
    pub steps: usize,
    pub lr: f64,
    pub initial_epsilon: f32,
    pub min_epsilon: f32,
    /// Multiplicative epsilon decay rate
    pub epsilon_decay: f32,
    pub gamma: f32,
    pub board_size: usize,
    pub rewards: Rewards,
    /// Hard ceiling on steps per episode
    pub step_limit: usize,
    /// Seed for the single random number generator, drawn from entropy when absent
    pub seed: Option<u64>,
    pub output_dir: PathBuf,
    pub overwrite: bool,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            game: Game::Snake11,
            name: "experiment".into(),
            method: Method::default(),
            episodes: 100,
            steps: 100_000,
            lr: 0.1,
            initial_epsilon: 1.0,
            min_epsilon: 0.01,
            epsilon_decay: 0.005,
            gamma: 0.95,
            board_size: 10,
            rewards: Rewards::default(),
            step_limit: 5000,
            seed: None,
            output_dir: PathBuf::from("experiments"),
            overwrite: false,
        }
    }
}

impl ExperimentConfig {
    /// Check every value a user can get wrong from the command line
    ///
    /// ### Errors
    /// [`Error::InvalidParameter`] or [`Error::BoardTooSmall`] naming the first bad value
    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, value: f64| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(Error::InvalidParameter(format!("{name} {value} must be in [0, 1]")))
            }
        };

        if self.name.is_empty() {
            return Err(Error::InvalidParameter("the experiment name is empty".into()));
        }
        if self.board_size < MIN_BOARD_SIZE {
            return Err(Error::BoardTooSmall {
                size: self.board_size,
                min: MIN_BOARD_SIZE,
            });
        }
        if self.step_limit == 0 {
            return Err(Error::InvalidParameter("the step limit must be at least 1".into()));
        }
        if self.method == Method::Qtable {
            unit("learning rate", self.lr)?;
        } else if !(self.lr > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "learning rate {} must be positive",
                self.lr
            )));
        }
        unit("gamma", self.gamma as f64)?;
        unit("initial epsilon", self.initial_epsilon as f64)?;
        unit("minimum epsilon", self.min_epsilon as f64)?;
        self.exploration(DecayPolicy::PerEpisode).map(|_| ())
    }

    /// The experiment's own directory under the output directory
    pub fn experiment_dir(&self) -> PathBuf {
        self.output_dir.join(&self.name)
    }

    pub fn snake_config(&self) -> SnakeConfig {
        SnakeConfig {
            board_size: self.board_size,
            rewards: self.rewards,
        }
    }

    fn exploration(&self, policy: DecayPolicy) -> Result<EpsilonGreedy<Multiplicative>> {
        let decay = Multiplicative::new(self.epsilon_decay, self.initial_epsilon, self.min_epsilon)?;
        Ok(EpsilonGreedy::new(decay, policy))
    }

    /// Tabular learner settings, decaying epsilon once per episode
    pub fn q_table_config(&self) -> Result<QTableConfig> {
        Ok(QTableConfig {
            exploration: self.exploration(DecayPolicy::PerEpisode)?,
            alpha: self.lr as f32,
            gamma: self.gamma,
            ..Default::default()
        })
    }

    /// DQN trainer settings, decaying epsilon once per step
    pub fn dqn_config(&self) -> Result<DQNConfig> {
        Ok(DQNConfig {
            exploration: self.exploration(DecayPolicy::PerStep)?,
            gamma: self.gamma,
            ..Default::default()
        })
    }

    /// Create a fresh experiment directory and record this config in it
    ///
    /// ### Errors
    /// [`Error::ExperimentExists`] if the directory exists and `overwrite` is not set
    pub fn prepare_experiment_dir(&self) -> Result<PathBuf> {
        let dir = self.experiment_dir();
        if dir.exists() {
            if !self.overwrite {
                return Err(Error::ExperimentExists(dir.display().to_string()));
            }
            warn!("Overwriting experiment directory {}", dir.display());
            fs::remove_dir_all(&dir)?;
        }

        fs::create_dir_all(&dir)?;
        self.save(dir.join(CONFIG_FILE))?;
        info!("Experiment directory {}", dir.display());
        Ok(dir)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

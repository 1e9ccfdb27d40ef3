//! The game of snake on a square board
//!
//! A single agent steers the snake with turns relative to its heading. Eating a fruit grows the
//! snake by one cell; running into a wall or into its own body ends the game.

mod agent;
mod encoding;
mod rules;

pub use agent::SnakeAgent;
pub use encoding::{EncodedState, Relative, NUM_BITS};
pub use rules::{GameState, Heading, Outcome, Pos, Rewards, Turn, MIN_BOARD_SIZE};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    agent::{Agent, Moved},
    env::{ActionOf, AgentId, Environment, Step},
    error::{Error, Result},
};

/// Name of the single snake agent, and the key of its value table
pub const AGENT_NAME: &str = "snake";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnakeConfig {
    pub board_size: usize,
    pub rewards: Rewards,
}

impl Default for SnakeConfig {
    fn default() -> Self {
        Self {
            board_size: 10,
            rewards: Rewards::default(),
        }
    }
}

/// Snake as an [`Environment`]
pub struct SnakeEnv {
    agents: [SnakeAgent; 1],
    state: GameState,
    config: SnakeConfig,
}

impl SnakeEnv {
    /// ### Errors
    /// [`Error::BoardTooSmall`] if the configured board is smaller than [`MIN_BOARD_SIZE`]
    pub fn new<R: Rng + ?Sized>(config: SnakeConfig, rng: &mut R) -> Result<Self> {
        let state = GameState::new(config.board_size, rng)?;
        Ok(Self {
            agents: [SnakeAgent::new(AGENT_NAME, config.rewards)],
            state,
            config,
        })
    }

    pub fn config(&self) -> &SnakeConfig {
        &self.config
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Replace the current game, e.g. to start from a hand-built position
    ///
    /// ### Errors
    /// [`Error::InvalidParameter`] if the board size differs from the configured one
    pub fn set_state(&mut self, state: GameState) -> Result<()> {
        if state.board_size() != self.config.board_size {
            return Err(Error::InvalidParameter(format!(
                "board size {} does not match the configured {}",
                state.board_size(),
                self.config.board_size
            )));
        }
        self.state = state;
        Ok(())
    }
}

impl Environment for SnakeEnv {
    type Agent = SnakeAgent;
    type Observation = GameState;
    type Encoded = EncodedState;

    fn agents(&self) -> &[Self::Agent] {
        &self.agents
    }

    fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Self::Observation {
        self.state = GameState::new(self.config.board_size, rng)
            .expect("board size was checked when the environment was built");
        self.state.clone()
    }

    fn step<R: Rng + ?Sized>(
        &mut self,
        agent: AgentId,
        action: ActionOf<Self>,
        rng: &mut R,
    ) -> Result<Step<Self::Observation>> {
        self.validate(agent, action)?;
        let Moved { reward, done } = self.agents[agent].make_move(action, &mut self.state, rng)?;
        Ok(Step {
            observation: self.state.clone(),
            reward,
            done,
        })
    }

    fn encode(&self) -> Self::Encoded {
        EncodedState::encode(&self.state)
    }

    fn is_active(&self) -> bool {
        !self.state.is_terminal()
    }

    fn score(&self) -> f64 {
        self.state.score() as f64
    }
}

use std::fmt::Debug;

use rand::Rng;

use crate::{
    agent::Agent,
    error::{Error, Result},
};

/// Index of an agent in its environment's play order
pub type AgentId = usize;

/// Shorthand for the action type of an environment's agents
pub type ActionOf<E> = <<E as Environment>::Agent as Agent>::Action;

/// The outcome of one agent's turn
#[derive(Debug, Clone, PartialEq)]
pub struct Step<O> {
    pub observation: O,
    pub reward: f32,
    /// Whether the environment reached a terminal state
    pub done: bool,
}

/// Represents a (possibly multi-agent) Markov decision process in which agents take turns
///
/// Implementors hold the full game state. All randomness comes from the `rng` handed in by the
/// caller so that training runs can be replayed from a seed.
pub trait Environment {
    /// The kind of agent acting in this environment
    type Agent: Agent;

    /// The raw state handed back after a reset or a step
    type Observation;

    /// A compact encoding of the current state for value estimation
    type Encoded: Copy + Debug;

    /// All agents, in play order
    fn agents(&self) -> &[Self::Agent];

    /// Reset the environment to an initial state
    ///
    /// **Returns** the initial observation
    fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Self::Observation;

    /// Let `agent` take `action`, advancing the environment by exactly one turn
    ///
    /// ### Errors
    /// - [`Error::UnknownAgent`] or [`Error::InvalidAction`] before any state is touched
    /// - [`Error::GameOver`] if the environment is already in a terminal state
    fn step<R: Rng + ?Sized>(
        &mut self,
        agent: AgentId,
        action: ActionOf<Self>,
        rng: &mut R,
    ) -> Result<Step<Self::Observation>>;

    /// Encode the current state. Pure: depends only on the present state, never on history.
    fn encode(&self) -> Self::Encoded;

    /// Determine if the state is active or terminal
    fn is_active(&self) -> bool;

    /// Game score used for metrics, zero unless the game defines one
    fn score(&self) -> f64 {
        0.0
    }

    fn num_agents(&self) -> usize {
        self.agents().len()
    }

    fn agent(&self, id: AgentId) -> Result<&Self::Agent> {
        self.agents()
            .get(id)
            .ok_or_else(|| Error::UnknownAgent(id.to_string()))
    }

    /// Check a move request without mutating anything
    fn validate(&self, id: AgentId, action: ActionOf<Self>) -> Result<()> {
        let agent = self.agent(id)?;
        if !agent.check_valid_action(action) {
            return Err(Error::InvalidAction {
                agent: agent.name().to_string(),
                action: format!("{action:?}"),
            });
        }
        if !self.is_active() {
            return Err(Error::GameOver);
        }
        Ok(())
    }
}

/// Encoded states that map onto a row of a dense value table
pub trait TabularState: Copy {
    /// Number of distinct rows
    const NUM_STATES: usize;

    /// Row index in `0..NUM_STATES`
    fn row(&self) -> usize;
}

/// Encoded states that can be fed to a function approximator as a flat feature vector
pub trait Features: Copy {
    /// Length of the feature vector
    const WIDTH: usize;

    /// Append exactly [`WIDTH`](Features::WIDTH) values to `out`
    fn write_features(&self, out: &mut Vec<f32>);
}

/// Round-robin play order over a fixed number of agents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOrder {
    len: usize,
    ix: usize,
}

impl TurnOrder {
    /// **Panics** if `len` is zero
    pub fn new(len: usize) -> Self {
        assert!(len > 0, "an environment needs at least one agent");
        Self { len, ix: 0 }
    }

    /// The agent whose turn it is
    pub fn current(&self) -> AgentId {
        self.ix
    }

    /// Pass the turn to the next agent, wrapping around
    pub fn advance(&mut self) -> AgentId {
        self.ix = (self.ix + 1) % self.len;
        self.ix
    }

    pub fn reset(&mut self) {
        self.ix = 0;
    }
}

/// Where an episode stands after a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    /// The environment reached a true terminal state (e.g. death)
    Terminated,
    /// The step ceiling was hit; the state itself is not terminal
    Truncated,
}

impl Status {
    /// Whether the episode is finished for either reason
    pub fn is_over(self) -> bool {
        self != Status::Running
    }

    /// Whether bootstrapping from the next state must be skipped
    pub fn is_terminal(self) -> bool {
        self == Status::Terminated
    }
}

/// One turn taken through a [`Session`]
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStep<O> {
    /// The agent that acted
    pub agent: AgentId,
    pub observation: O,
    pub reward: f32,
    pub status: Status,
}

/// Drives an [`Environment`] through episodes: owns the turn order and the per-episode step ceiling
pub struct Session<E: Environment> {
    env: E,
    turns: TurnOrder,
    steps: usize,
    step_limit: usize,
}

impl<E: Environment> Session<E> {
    /// ### Errors
    /// [`Error::InvalidParameter`] if `step_limit` is zero
    pub fn new(env: E, step_limit: usize) -> Result<Self> {
        if step_limit == 0 {
            return Err(Error::InvalidParameter(
                "the step limit must be at least 1".into(),
            ));
        }
        let turns = TurnOrder::new(env.num_agents());
        Ok(Self {
            env,
            turns,
            steps: 0,
            step_limit,
        })
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }

    pub fn into_inner(self) -> E {
        self.env
    }

    /// The agent whose turn it is
    pub fn current_agent(&self) -> AgentId {
        self.turns.current()
    }

    /// Steps taken since the last reset
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn step_limit(&self) -> usize {
        self.step_limit
    }

    /// Whether the current episode has ended, by a terminal state or by the step ceiling
    pub fn is_over(&self) -> bool {
        !self.env.is_active() || self.steps >= self.step_limit
    }

    /// Reset the environment, the turn order and the step counter
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) -> E::Observation {
        self.turns.reset();
        self.steps = 0;
        self.env.reset(rng)
    }

    pub fn encode(&self) -> E::Encoded {
        self.env.encode()
    }

    /// Let the current agent take `action`, then pass the turn on
    ///
    /// ### Errors
    /// Whatever the environment rejects; a rejected move does not consume the turn.
    /// Stepping past the step ceiling without a reset is reported as [`Error::GameOver`].
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        action: ActionOf<E>,
        rng: &mut R,
    ) -> Result<SessionStep<E::Observation>> {
        if self.steps >= self.step_limit {
            return Err(Error::GameOver);
        }

        let agent = self.turns.current();
        let Step {
            observation,
            reward,
            done,
        } = self.env.step(agent, action, rng)?;
        self.steps += 1;
        self.turns.advance();

        let status = if done {
            Status::Terminated
        } else if self.steps >= self.step_limit {
            Status::Truncated
        } else {
            Status::Running
        };

        Ok(SessionStep {
            agent,
            observation,
            reward,
            status,
        })
    }
}

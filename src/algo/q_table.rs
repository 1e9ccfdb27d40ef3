use log::{debug, info};
use rand::Rng;

use super::{
    metrics::{EpisodeEnd, EpisodeReport, Metrics},
    value_table::{QTables, TableInit, ValueTable},
};
use crate::{
    agent::Agent,
    assert_interval,
    decay::Multiplicative,
    env::{ActionOf, AgentId, Environment, Session, TabularState},
    error::{Error, Result},
    exploration::{Choice, DecayPolicy, EpsilonGreedy},
    memory::Exp,
};

/// When the value tables are updated during an episode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdateMode {
    /// Replay the episode's transitions in time order once it has finished
    #[default]
    Episodic,
    /// Update right after every transition
    Online,
}

/// How actions are picked while playing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Epsilon-greedy, learning from every transition
    Explore,
    /// Always exploit the current tables; nothing is learned
    Greedy,
}

/// Configuration for the [`QTableLearner`]
#[derive(Debug, Clone)]
pub struct QTableConfig {
    pub exploration: EpsilonGreedy<Multiplicative>,
    /// The learning rate
    pub alpha: f32,
    /// The discount factor
    pub gamma: f32,
    pub update_mode: UpdateMode,
    pub init: TableInit,
    /// Log a summary every this many episodes
    pub log_interval: usize,
}

impl Default for QTableConfig {
    fn default() -> Self {
        Self {
            exploration: EpsilonGreedy::new(
                Multiplicative::new(0.005, 1.0, 0.01).expect("valid decay parameters"),
                DecayPolicy::PerEpisode,
            ),
            alpha: 0.1,
            gamma: 0.95,
            update_mode: UpdateMode::default(),
            init: TableInit::default(),
            log_interval: 100,
        }
    }
}

/// Tabular Q-learning with one value table per agent
///
/// ### Generics
/// - `E` - The [`Environment`] to learn. Its encoded states must map onto table rows, and each
///   agent's action set maps onto table columns in declaration order.
pub struct QTableLearner<E: Environment>
where
    E::Encoded: TabularState,
{
    tables: QTables,
    /// Table key of each agent, by play order
    names: Vec<String>,
    exploration: EpsilonGreedy<Multiplicative>,
    alpha: f32,
    gamma: f32,
    update_mode: UpdateMode,
    log_interval: usize,
    episode: usize,
    _env: std::marker::PhantomData<fn() -> E>,
}

impl<E: Environment> QTableLearner<E>
where
    E::Encoded: TabularState,
{
    /// Create a fresh table for every agent of `env`
    ///
    /// **Panics** if `alpha` or `gamma` is not in the interval `[0,1]`
    ///
    /// ### Errors
    /// [`Error::InvalidParameter`] if the table initialisation is invalid
    pub fn new<R: Rng + ?Sized>(env: &E, config: QTableConfig, rng: &mut R) -> Result<Self> {
        let mut tables = QTables::new();
        for agent in env.agents() {
            let table = ValueTable::new(
                E::Encoded::NUM_STATES,
                agent.actions().len(),
                config.init,
                rng,
            )?;
            tables.insert(agent.name(), table);
        }
        Self::with_tables(env, tables, config)
    }

    /// Resume learning from previously saved tables
    ///
    /// **Panics** if `alpha` or `gamma` is not in the interval `[0,1]`
    ///
    /// ### Errors
    /// - [`Error::UnknownAgent`] if an agent of `env` has no table
    /// - [`Error::ShapeMismatch`] if a table does not fit the agent's states and actions
    pub fn with_tables(env: &E, tables: QTables, config: QTableConfig) -> Result<Self> {
        assert_interval!(config.alpha, 0.0, 1.0);
        assert_interval!(config.gamma, 0.0, 1.0);

        for agent in env.agents() {
            let table = tables.get(agent.name())?;
            let expected = (E::Encoded::NUM_STATES, agent.actions().len());
            if (table.rows(), table.cols()) != expected {
                return Err(Error::ShapeMismatch {
                    expected: format!("{expected:?}"),
                    found: format!("{:?}", (table.rows(), table.cols())),
                });
            }
        }

        Ok(Self {
            tables,
            names: env.agents().iter().map(|a| a.name().to_string()).collect(),
            exploration: config.exploration,
            alpha: config.alpha,
            gamma: config.gamma,
            update_mode: config.update_mode,
            log_interval: config.log_interval.max(1),
            episode: 0,
            _env: std::marker::PhantomData,
        })
    }

    pub fn tables(&self) -> &QTables {
        &self.tables
    }

    pub fn into_tables(self) -> QTables {
        self.tables
    }

    /// Table of the agent at `id` in play order
    pub fn table(&self, id: AgentId) -> Result<&ValueTable> {
        self.tables.get(self.name(id)?)
    }

    pub fn exploration(&self) -> &EpsilonGreedy<Multiplicative> {
        &self.exploration
    }

    pub fn epsilon(&self) -> f32 {
        self.exploration.epsilon()
    }

    /// Episodes learned from so far
    pub fn episodes(&self) -> usize {
        self.episode
    }

    fn name(&self, id: AgentId) -> Result<&str> {
        self.names
            .get(id)
            .map(String::as_str)
            .ok_or_else(|| Error::UnknownAgent(id.to_string()))
    }

    /// Choose an action for agent `id` in `state`
    ///
    /// Explores with probability epsilon in [`Mode::Explore`]; otherwise takes the first action
    /// with the highest value.
    pub fn select_action<R: Rng + ?Sized>(
        &self,
        env: &E,
        id: AgentId,
        state: E::Encoded,
        mode: Mode,
        rng: &mut R,
    ) -> Result<ActionOf<E>> {
        let agent = env.agent(id)?;
        let choice = match mode {
            Mode::Explore => self.exploration.choose(rng),
            Mode::Greedy => Choice::Exploit,
        };

        match choice {
            Choice::Explore => Ok(agent.random_action(rng)),
            Choice::Exploit => {
                let col = self.table(id)?.argmax(state.row());
                Ok(agent.actions()[col])
            }
        }
    }

    /// Apply the Bellman update for one transition of agent `id`
    ///
    /// Terminal transitions target the reward alone, without any bootstrap term.
    ///
    /// **Returns** the temporal difference error before the update
    pub fn observe(&mut self, id: AgentId, exp: &Exp<E::Encoded>) -> Result<f32> {
        let (alpha, gamma) = (self.alpha, self.gamma);
        let name = self.name(id)?.to_string();
        let table = self.tables.get_mut(&name)?;
        if exp.action >= table.cols() {
            return Err(Error::InvalidAction {
                agent: name,
                action: format!("column {}", exp.action),
            });
        }

        let (s, a) = (exp.state.row(), exp.action);
        let q = table.get(s, a);
        let target = if exp.done {
            exp.reward
        } else {
            exp.reward + gamma * table.max(exp.next_state.row())
        };
        let td_error = target - q;
        table.set(s, a, q + alpha * td_error);

        Ok(td_error)
    }

    /// Update from a finished episode's transitions, in time order
    pub fn update_from_episode(&mut self, episode: &[(AgentId, Exp<E::Encoded>)]) -> Result<()> {
        for (id, exp) in episode {
            self.observe(*id, exp)?;
        }
        Ok(())
    }

    /// Advance the exploration schedule by one tick
    ///
    /// **Returns** `true` the first time epsilon reaches its floor
    pub fn decay_epsilon(&mut self) -> bool {
        self.exploration.tick()
    }

    /// Play one episode from a fresh reset until death or the step ceiling
    ///
    /// In [`Mode::Explore`] the episode is learned from and counted; in [`Mode::Greedy`] the
    /// tables and the exploration schedule are left untouched.
    pub fn play_episode<R: Rng + ?Sized>(
        &mut self,
        session: &mut Session<E>,
        mode: Mode,
        rng: &mut R,
    ) -> Result<EpisodeReport> {
        session.reset(rng);
        let learning = mode == Mode::Explore;
        let mut transitions = Vec::new();
        let mut total_reward = 0.0;

        let outcome = loop {
            let id = session.current_agent();
            let state = session.encode();
            let action = self.select_action(session.env(), id, state, mode, rng)?;
            let agent = session.env().agent(id)?;
            let col = agent
                .action_index(action)
                .ok_or_else(|| Error::InvalidAction {
                    agent: agent.name().to_string(),
                    action: format!("{action:?}"),
                })?;

            let step = session.step(action, rng)?;
            total_reward += step.reward;

            if learning {
                let exp = Exp {
                    state,
                    action: col,
                    reward: step.reward,
                    next_state: session.encode(),
                    done: step.status.is_terminal(),
                };
                match self.update_mode {
                    UpdateMode::Online => {
                        self.observe(id, &exp)?;
                    }
                    UpdateMode::Episodic => transitions.push((id, exp)),
                }
                if self.exploration.policy() == DecayPolicy::PerStep {
                    self.decay_epsilon();
                }
            }

            if let Some(outcome) = EpisodeEnd::from_status(step.status) {
                break outcome;
            }
        };

        let report = EpisodeReport {
            episode: self.episode,
            score: session.env().score(),
            steps: session.steps(),
            reward: total_reward,
            outcome,
        };

        if learning {
            self.update_from_episode(&transitions)?;
            if self.exploration.policy() == DecayPolicy::PerEpisode {
                self.decay_epsilon();
            }
            self.episode += 1;
        }

        Ok(report)
    }

    /// Learn for `episodes` episodes
    pub fn train<R: Rng + ?Sized>(
        &mut self,
        session: &mut Session<E>,
        episodes: usize,
        rng: &mut R,
    ) -> Result<Metrics> {
        info!(
            "Training for {episodes} episodes (alpha {}, gamma {}, epsilon {:.3})",
            self.alpha,
            self.gamma,
            self.epsilon()
        );

        let mut metrics = Metrics::new();
        for i in 1..=episodes {
            let report = self.play_episode(session, Mode::Explore, rng)?;
            debug!(
                "Episode {}: score {}, {} steps, reward {}, {:?}",
                report.episode, report.score, report.steps, report.reward, report.outcome
            );
            metrics.record(report);

            if i % self.log_interval == 0 {
                info!(
                    "Episode {}: mean score {:.2} over the last {}, best {}, epsilon {:.4}",
                    report.episode,
                    metrics.mean_score(self.log_interval).unwrap_or(0.0),
                    self.log_interval,
                    metrics.best_score().unwrap_or(0.0),
                    self.epsilon()
                );
            }
        }

        info!(
            "Finished {} episodes, best score {}, {} truncated",
            metrics.games_played(),
            metrics.best_score().unwrap_or(0.0),
            metrics.truncations()
        );
        Ok(metrics)
    }
}

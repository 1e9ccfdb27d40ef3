use std::path::Path;

use burn::{
    module::AutodiffModule,
    optim::{AdamWConfig, GradientsParams, Optimizer},
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder},
    tensor::{activation::relu, backend::AutodiffBackend, ElementConversion},
};
use log::{debug, info};
use nn::{
    loss::{MseLoss, Reduction},
    Linear, LinearConfig,
};
use rand::Rng;

use super::{
    approx::{check_targets, QFunction},
    metrics::{EpisodeEnd, EpisodeReport, Metrics},
};
use crate::{
    agent::Agent,
    assert_interval,
    decay::Multiplicative,
    env::{Environment, Features, Session, Status},
    error::Error,
    exploration::{Choice, DecayPolicy, EpsilonGreedy},
    memory::{Exp, ReplayMemory},
    util,
};

/// A burn module used as a Deep Q network
///
/// ### Generics
/// - `B`: A burn backend
pub trait DQNModel<B: AutodiffBackend>: AutodiffModule<B> {
    /// Forward pass from `[batch, features]` to `[batch, actions]`
    fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2>;
}

/// A small fully connected network with two hidden layers
#[derive(Module, Debug)]
pub struct QNet<B: Backend> {
    fc1: Linear<B>,
    fc2: Linear<B>,
    fc3: Linear<B>,
}

#[derive(Config, Debug)]
pub struct QNetConfig {
    /// Width of the encoded state
    input: usize,
    /// Number of actions
    output: usize,
    #[config(default = 8)]
    hidden: usize,
}

impl QNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> QNet<B> {
        QNet {
            fc1: LinearConfig::new(self.input, self.hidden).init(device),
            fc2: LinearConfig::new(self.hidden, self.hidden).init(device),
            fc3: LinearConfig::new(self.hidden, self.output).init(device),
        }
    }
}

impl<B: AutodiffBackend> DQNModel<B> for QNet<B> {
    fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = relu(self.fc1.forward(input));
        let x = relu(self.fc2.forward(x));
        self.fc3.forward(x)
    }
}

type FileRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// A [`DQNModel`] together with its optimizer, usable as a [`QFunction`]
///
/// ### Generics
/// - `B`: A burn autodiff backend
/// - `M`: The network
/// - `O`: An [`Optimizer`] for `M`
pub struct QNetwork<B, M, O>
where
    B: AutodiffBackend,
{
    model: Option<M>,
    optimizer: O,
    loss: MseLoss<B>,
    lr: f64,
    num_actions: usize,
    device: B::Device,
}

impl<B, M, O> QNetwork<B, M, O>
where
    B: AutodiffBackend,
    M: DQNModel<B>,
    O: Optimizer<M, B>,
{
    pub fn new(model: M, optimizer: O, lr: f64, num_actions: usize, device: &B::Device) -> Self {
        Self {
            model: Some(model),
            optimizer,
            loss: MseLoss::new(),
            lr,
            num_actions,
            device: device.clone(),
        }
    }

    pub fn model(&self) -> &M {
        self.model.as_ref().expect("the model is only taken out during a fit")
    }

    /// Save the network parameters with burn's named MessagePack recorder
    pub fn save(&self, path: impl AsRef<Path>) -> crate::Result<()> {
        self.model()
            .clone()
            .save_file(path.as_ref().to_path_buf(), &FileRecorder::new())
            .map_err(|e| Error::Record(format!("{e:?}")))
    }

    /// Replace the network parameters with ones written by [`save`](QNetwork::save)
    pub fn load(&mut self, path: impl AsRef<Path>) -> crate::Result<()> {
        let model = self.model.take().expect("the model is only taken out during a fit");
        let loaded = model
            .clone()
            .load_file(path.as_ref().to_path_buf(), &FileRecorder::new(), &self.device);
        match loaded {
            Ok(loaded) => {
                self.model = Some(loaded);
                Ok(())
            }
            Err(e) => {
                self.model = Some(model);
                Err(Error::Record(format!("{e:?}")))
            }
        }
    }

    fn to_input<S: Features>(&self, states: &[S]) -> Tensor<B, 2> {
        let mut features = Vec::with_capacity(states.len() * S::WIDTH);
        for state in states {
            state.write_features(&mut features);
        }
        Tensor::<B, 1>::from_floats(features.as_slice(), &self.device).reshape([states.len(), S::WIDTH])
    }
}

/// A [`QNetwork`] training `model` with a default AdamW optimizer
pub fn adamw<B, M>(
    model: M,
    lr: f64,
    num_actions: usize,
    device: &B::Device,
) -> QNetwork<B, M, impl Optimizer<M, B>>
where
    B: AutodiffBackend,
    M: DQNModel<B>,
{
    QNetwork::new(model, AdamWConfig::new().init(), lr, num_actions, device)
}

impl<S, B, M, O> QFunction<S> for QNetwork<B, M, O>
where
    S: Features,
    B: AutodiffBackend,
    M: DQNModel<B>,
    O: Optimizer<M, B>,
{
    fn num_actions(&self) -> usize {
        self.num_actions
    }

    fn predict(&self, states: &[S]) -> crate::Result<Vec<Vec<f32>>> {
        if states.is_empty() {
            return Ok(Vec::new());
        }

        let output = self.model().forward(self.to_input(states)).detach();
        let [rows, cols] = output.dims();
        if rows != states.len() || cols != self.num_actions {
            return Err(Error::ShapeMismatch {
                expected: format!("[{}, {}]", states.len(), self.num_actions),
                found: format!("[{rows}, {cols}]"),
            });
        }

        let values = output.into_data().convert::<f32>().value;
        Ok(values.chunks(cols).map(<[f32]>::to_vec).collect())
    }

    fn fit(&mut self, states: &[S], targets: &[Vec<f32>]) -> crate::Result<f32> {
        check_targets(states.len(), targets, self.num_actions)?;
        if states.is_empty() {
            return Ok(0.0);
        }

        let input = self.to_input(states);
        let flat = targets.concat();
        let targets = Tensor::<B, 1>::from_floats(flat.as_slice(), &self.device)
            .reshape([states.len(), self.num_actions]);

        let model = self.model.take().expect("the model is only taken out during a fit");
        let q_values = model.forward(input);
        let loss = self.loss.forward(q_values, targets, Reduction::Mean);
        let loss_value = loss.clone().into_scalar().elem::<f32>();

        // Perform backpropagation on the trained network
        let grads = GradientsParams::from_grads(loss.backward(), &model);
        self.model = Some(self.optimizer.step(self.lr, model, grads));

        Ok(loss_value)
    }

    fn sync_from(&mut self, source: &Self) {
        self.model = Some(source.model().clone());
    }
}

/// Configuration for the [`DQNTrainer`]
#[derive(Debug, Clone)]
pub struct DQNConfig {
    /// The exploration policy, ticked once per step by default
    pub exploration: EpsilonGreedy<Multiplicative>,
    /// The discount factor
    pub gamma: f32,
    /// Capacity of the replay memory
    pub memory_capacity: usize,
    pub batch_size: usize,
    /// Copy the trained network into the prediction network every this many steps
    pub update_frequency: usize,
    /// Transitions to collect before the first learning step, never fewer than `batch_size`
    pub warmup: usize,
    /// Log a summary every this many episodes
    pub log_interval: usize,
}

impl Default for DQNConfig {
    fn default() -> Self {
        Self {
            exploration: EpsilonGreedy::new(
                Multiplicative::new(1e-3, 1.0, 0.05).expect("valid decay parameters"),
                DecayPolicy::PerStep,
            ),
            gamma: 0.99,
            memory_capacity: 50_000,
            batch_size: 32,
            update_frequency: 100,
            warmup: 32,
            log_interval: 100,
        }
    }
}

/// What a single [`DQNTrainer::train_step`] did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainStep {
    pub reward: f32,
    pub status: Status,
    /// Loss of the learning half-step, `None` while the memory is still filling up
    pub loss: Option<f32>,
    /// Whether the prediction network was synced on this step
    pub synced: bool,
}

/// Batched Q-learning over a replay memory, with a periodically synced prediction network
///
/// The `target` approximator is the one being trained and the one acting; the `prediction`
/// approximator supplies the bootstrap values and is overwritten with the target's parameters
/// every `update_frequency` steps.
///
/// ### Generics
/// - `E`: The [`Environment`] to learn
/// - `Q`: The [`QFunction`] approximating action values of `E`'s encoded states
pub struct DQNTrainer<E, Q>
where
    E: Environment,
{
    session: Session<E>,
    memory: ReplayMemory<E::Encoded>,
    target: Q,
    prediction: Q,
    exploration: EpsilonGreedy<Multiplicative>,
    gamma: f32,
    batch_size: usize,
    update_frequency: usize,
    warmup: usize,
    log_interval: usize,
    steps: usize,
    episode: usize,
    episode_reward: f32,
    metrics: Metrics,
}

impl<E, Q> DQNTrainer<E, Q>
where
    E: Environment,
    Q: QFunction<E::Encoded>,
{
    /// Build a trainer and reset the environment for the first episode
    ///
    /// The prediction approximator starts as a copy of the target.
    ///
    /// **Panics** if `gamma` is not in the interval `[0,1]`
    ///
    /// ### Errors
    /// [`Error::InvalidParameter`] if the memory capacity, batch size or update frequency is zero,
    /// or if an agent's action count differs from the approximator's
    pub fn new<R: Rng + ?Sized>(
        mut session: Session<E>,
        target: Q,
        mut prediction: Q,
        config: DQNConfig,
        rng: &mut R,
    ) -> crate::Result<Self> {
        assert_interval!(config.gamma, 0.0, 1.0);
        if config.memory_capacity == 0 || config.batch_size == 0 || config.update_frequency == 0 {
            return Err(Error::InvalidParameter(
                "memory capacity, batch size and update frequency must all be positive".into(),
            ));
        }
        if config.batch_size > config.memory_capacity {
            return Err(Error::InvalidParameter(format!(
                "batch size {} exceeds the memory capacity {}",
                config.batch_size, config.memory_capacity
            )));
        }
        for agent in session.env().agents() {
            if agent.actions().len() != target.num_actions() {
                return Err(Error::InvalidParameter(format!(
                    "agent `{}` has {} actions but the approximator predicts {}",
                    agent.name(),
                    agent.actions().len(),
                    target.num_actions()
                )));
            }
        }

        prediction.sync_from(&target);
        session.reset(rng);

        Ok(Self {
            session,
            memory: ReplayMemory::new(config.memory_capacity),
            target,
            prediction,
            exploration: config.exploration,
            gamma: config.gamma,
            batch_size: config.batch_size,
            update_frequency: config.update_frequency,
            warmup: config.warmup.clamp(config.batch_size, config.memory_capacity),
            log_interval: config.log_interval.max(1),
            steps: 0,
            episode: 0,
            episode_reward: 0.0,
            metrics: Metrics::new(),
        })
    }

    pub fn session(&self) -> &Session<E> {
        &self.session
    }

    pub fn memory(&self) -> &ReplayMemory<E::Encoded> {
        &self.memory
    }

    /// The approximator being trained
    pub fn target(&self) -> &Q {
        &self.target
    }

    /// The periodically synced copy used for bootstrapping
    pub fn prediction(&self) -> &Q {
        &self.prediction
    }

    pub fn into_target(self) -> Q {
        self.target
    }

    pub fn epsilon(&self) -> f32 {
        self.exploration.epsilon()
    }

    /// Environment steps taken so far
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Take one environment step, then learn from a sampled batch once enough experience is stored
    ///
    /// A finished episode, by death or by the step ceiling, is recorded and the environment reset.
    ///
    /// ### Errors
    /// [`Error::InvalidParameter`] if `batch_size` is zero or exceeds the memory capacity
    pub fn train_step<R: Rng + ?Sized>(
        &mut self,
        batch_size: usize,
        rng: &mut R,
    ) -> crate::Result<TrainStep> {
        if batch_size == 0 || batch_size > self.memory.capacity() {
            return Err(Error::InvalidParameter(format!(
                "batch size {batch_size} must be in [1, {}]",
                self.memory.capacity()
            )));
        }

        let id = self.session.current_agent();
        let state = self.session.encode();
        let agent = self.session.env().agent(id)?;

        let col = match self.exploration.choose(rng) {
            Choice::Explore => {
                let action = agent.random_action(rng);
                agent.action_index(action).unwrap_or(0)
            }
            Choice::Exploit => {
                let q_values = self.target.predict(&[state])?;
                q_values.first().and_then(|row| util::argmax(row)).unwrap_or(0)
            }
        };
        let action = *agent.actions().get(col).ok_or_else(|| Error::InvalidAction {
            agent: agent.name().to_string(),
            action: format!("column {col}"),
        })?;

        let step = self.session.step(action, rng)?;
        self.memory.push(Exp {
            state,
            action: col,
            reward: step.reward,
            next_state: self.session.encode(),
            done: step.status.is_terminal(),
        });
        self.steps += 1;
        self.episode_reward += step.reward;
        if self.exploration.policy() == DecayPolicy::PerStep {
            self.exploration.tick();
        }

        let loss = if self.memory.len() >= self.warmup.max(batch_size) {
            Some(self.learn(batch_size, rng)?)
        } else {
            None
        };

        let synced = self.steps % self.update_frequency == 0;
        if synced {
            self.prediction.sync_from(&self.target);
            debug!("Step {}: prediction network synced", self.steps);
        }

        if let Some(outcome) = EpisodeEnd::from_status(step.status) {
            self.finish_episode(outcome, rng);
        }

        Ok(TrainStep {
            reward: step.reward,
            status: step.status,
            loss,
            synced,
        })
    }

    /// One gradient step on a batch sampled without replacement
    fn learn<R: Rng + ?Sized>(&mut self, batch_size: usize, rng: &mut R) -> crate::Result<f32> {
        let batch = self.memory.sample_zipped(batch_size, rng)?;
        let current = self.target.predict(&batch.states)?;
        let next = self.prediction.predict(&batch.next_states)?;

        // Only the taken action's column moves; the rest keep their current value and zero loss
        let targets = current
            .into_iter()
            .zip(&next)
            .enumerate()
            .map(|(i, (mut row, next_row))| {
                let bootstrap = if batch.dones[i] {
                    0.0
                } else {
                    self.gamma * util::max(next_row).unwrap_or(0.0)
                };
                row[batch.actions[i]] = batch.rewards[i] + bootstrap;
                row
            })
            .collect::<Vec<_>>();

        self.target.fit(&batch.states, &targets)
    }

    fn finish_episode<R: Rng + ?Sized>(&mut self, outcome: EpisodeEnd, rng: &mut R) {
        let report = EpisodeReport {
            episode: self.episode,
            score: self.session.env().score(),
            steps: self.session.steps(),
            reward: self.episode_reward,
            outcome,
        };
        debug!(
            "Episode {}: score {}, {} steps, reward {}, {:?}",
            report.episode, report.score, report.steps, report.reward, report.outcome
        );
        self.metrics.record(report);

        self.episode += 1;
        self.episode_reward = 0.0;
        if self.exploration.policy() == DecayPolicy::PerEpisode {
            self.exploration.tick();
        }
        if self.episode % self.log_interval == 0 {
            info!(
                "Episode {} ({} steps): mean score {:.2} over the last {}, best {}, epsilon {:.4}",
                report.episode,
                self.steps,
                self.metrics.mean_score(self.log_interval).unwrap_or(0.0),
                self.log_interval,
                self.metrics.best_score().unwrap_or(0.0),
                self.epsilon()
            );
        }

        self.session.reset(rng);
    }

    /// Train for `steps` environment steps with the configured batch size
    pub fn run<R: Rng + ?Sized>(&mut self, steps: usize, rng: &mut R) -> crate::Result<&Metrics> {
        info!(
            "Training for {steps} steps (batch {}, gamma {}, sync every {} steps)",
            self.batch_size, self.gamma, self.update_frequency
        );
        for _ in 0..steps {
            self.train_step(self.batch_size, rng)?;
        }
        info!(
            "Finished {} steps over {} episodes, best score {}",
            self.steps,
            self.metrics.games_played(),
            self.metrics.best_score().unwrap_or(0.0)
        );
        Ok(&self.metrics)
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{
        algo::{approx::TabularQ, value_table::ValueTable},
        env::tests::{MockEnv, MockState},
        gym::snake::{EncodedState, SnakeConfig, SnakeEnv, NUM_BITS},
    };

    type B = Autodiff<NdArray>;

    fn tabular() -> TabularQ<MockState> {
        TabularQ::new(ValueTable::zeros(2, 2), 0.5).unwrap()
    }

    fn config(batch_size: usize, update_frequency: usize) -> DQNConfig {
        DQNConfig {
            exploration: EpsilonGreedy::new(
                Multiplicative::new(0.01, 1.0, 0.2).unwrap(),
                DecayPolicy::PerStep,
            ),
            gamma: 0.9,
            memory_capacity: 64,
            batch_size,
            update_frequency,
            warmup: batch_size,
            log_interval: 10,
        }
    }

    fn mock_trainer(rng: &mut StdRng, config: DQNConfig) -> DQNTrainer<MockEnv, TabularQ<MockState>> {
        let session = Session::new(MockEnv::new(1), 10).unwrap();
        DQNTrainer::new(session, tabular(), tabular(), config, rng).unwrap()
    }

    #[test]
    fn skips_learning_until_enough_experience() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut trainer = mock_trainer(&mut rng, config(4, 100));

        for i in 0..3 {
            let step = trainer.train_step(4, &mut rng).unwrap();
            assert!(step.loss.is_none(), "step {i}: memory holds fewer than a batch");
        }
        let step = trainer.train_step(4, &mut rng).unwrap();
        assert!(step.loss.is_some(), "learns once a full batch is stored");
        assert_eq!(trainer.memory().len(), 4);
    }

    #[test]
    fn episodes_reset_the_environment() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut trainer = mock_trainer(&mut rng, config(4, 100));

        // Every episode of the chain is exactly two steps
        for _ in 0..10 {
            trainer.train_step(4, &mut rng).unwrap();
        }
        assert_eq!(trainer.metrics().games_played(), 5);
        assert!(trainer
            .metrics()
            .episodes()
            .iter()
            .all(|r| r.steps == 2 && r.outcome == EpisodeEnd::Death));
        assert_eq!(trainer.session().steps(), 0, "fresh episode after a terminal step");
        assert!(trainer.epsilon() < 1.0, "epsilon decays per step");
    }

    #[test]
    fn prediction_syncs_on_schedule() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut trainer = mock_trainer(&mut rng, config(2, 5));

        for step in 1..=20 {
            let report = trainer.train_step(2, &mut rng).unwrap();
            assert_eq!(report.synced, step % 5 == 0, "step {step}");
            if report.synced {
                assert_eq!(
                    trainer.prediction().table(),
                    trainer.target().table(),
                    "prediction copies the target"
                );
            }
        }
    }

    #[test]
    fn learns_toy_mdp() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut trainer = mock_trainer(&mut rng, config(8, 10));
        trainer.run(3000, &mut rng).unwrap();

        let table = trainer.target().table();
        assert_eq!(table.argmax(0), 1, "optimal action in state 0");
        assert_eq!(table.argmax(1), 0, "optimal action in state 1");
        assert!((table.get(1, 0) - 2.0).abs() < 0.1, "terminal value is the reward");
        assert!((table.get(0, 1) - 2.8).abs() < 0.2, "bootstrapped from the prediction copy");
    }

    #[test]
    fn rejects_bad_configs() {
        let mut rng = StdRng::seed_from_u64(0);
        let session = || Session::new(MockEnv::new(1), 10).unwrap();

        let zero_batch = config(0, 10);
        assert!(DQNTrainer::new(session(), tabular(), tabular(), zero_batch, &mut rng).is_err());

        let oversized = DQNConfig {
            batch_size: 128,
            ..config(4, 10)
        };
        assert!(DQNTrainer::new(session(), tabular(), tabular(), oversized, &mut rng).is_err());

        let wide = TabularQ::<MockState>::new(ValueTable::zeros(2, 3), 0.5).unwrap();
        assert!(
            DQNTrainer::new(session(), wide.clone(), wide, config(4, 10), &mut rng).is_err(),
            "action count must match"
        );
    }

    #[test]
    fn rejects_batches_larger_than_memory() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut trainer = mock_trainer(&mut rng, config(4, 10));

        let err = trainer.train_step(65, &mut rng).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)), "got {err:?}");
        assert!(trainer.train_step(0, &mut rng).is_err(), "empty batch");
        assert_eq!(trainer.steps(), 0, "no step taken");
        assert!(trainer.memory().is_empty());
    }

    fn table_q(values: [f32; 4]) -> TabularQ<MockState> {
        TabularQ::new(ValueTable::from_values(2, 2, values.to_vec()).unwrap(), 1.0).unwrap()
    }

    #[test]
    fn bootstraps_from_the_prediction_copy() {
        let mut rng = StdRng::seed_from_u64(0);
        let session = Session::new(MockEnv::new(1), 10).unwrap();
        let target = table_q([3.0, -2.0, 1.0, 1.0]);
        let mut trainer = DQNTrainer::new(session, target, tabular(), config(1, 1000), &mut rng).unwrap();
        trainer.prediction = table_q([0.0, 0.0, 5.0, 7.0]);

        trainer
            .memory
            .push(Exp::from((MockState(0), 1, 1.0, MockState(1), false)));
        trainer.learn(1, &mut rng).unwrap();

        let row = trainer.target().table().row(0);
        assert_eq!(row[0], 3.0, "untaken column keeps its value");
        assert!((row[1] - 7.3).abs() < 1e-5, "1 + 0.9 * 7, got {}", row[1]);
        assert_eq!(trainer.target().table().row(1), [1.0, 1.0]);
        assert_eq!(trainer.prediction().table().row(1), [5.0, 7.0], "prediction is not trained");
    }

    #[test]
    fn truncated_steps_still_bootstrap() {
        let mut rng = StdRng::seed_from_u64(5);
        let session = Session::new(MockEnv::new(1), 1).unwrap();
        let target = table_q([0.0, 0.0, 10.0, 4.0]);
        let mut trainer = DQNTrainer::new(session, target, tabular(), config(1, 1000), &mut rng).unwrap();

        let step = trainer.train_step(1, &mut rng).unwrap();
        assert_eq!(step.status, Status::Truncated);
        assert!(step.loss.is_some());

        let exp = trainer.memory().iter().next().unwrap();
        assert!(!exp.done, "the ceiling is not a terminal transition");
        let row = trainer.target().table().row(0);
        let expected = exp.reward + 0.9 * 10.0;
        assert!(
            (row[exp.action] - expected).abs() < 1e-5,
            "expected {expected}, got {}",
            row[exp.action]
        );
        assert_eq!(row[1 - exp.action], 0.0);
        assert_eq!(trainer.metrics().episodes()[0].outcome, EpisodeEnd::Truncated);
    }

    fn network(device: &NdArrayDevice) -> QNetwork<B, QNet<B>, impl Optimizer<QNet<B>, B>> {
        let model = QNetConfig::new(NUM_BITS, 3).with_hidden(16).init::<B>(device);
        adamw(model, 1e-2, 3, device)
    }

    fn snake_states(rng: &mut StdRng, n: usize) -> Vec<EncodedState> {
        let mut env = SnakeEnv::new(SnakeConfig::default(), rng).unwrap();
        (0..n)
            .map(|_| {
                env.reset(rng);
                env.encode()
            })
            .collect()
    }

    #[test]
    fn network_predicts_one_row_per_state() {
        let device = NdArrayDevice::default();
        let mut rng = StdRng::seed_from_u64(0);
        let net = network(&device);
        let states = snake_states(&mut rng, 5);

        let q_values = net.predict(&states).unwrap();
        assert_eq!(q_values.len(), 5);
        assert!(q_values.iter().all(|row| row.len() == 3));
        assert!(net.predict(&[] as &[EncodedState]).unwrap().is_empty());
    }

    #[test]
    fn network_fit_reduces_loss() {
        let device = NdArrayDevice::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut net = network(&device);
        let states = snake_states(&mut rng, 8);
        let targets = vec![vec![1.0, -1.0, 0.5]; 8];

        let first = net.fit(&states, &targets).unwrap();
        let mut last = first;
        for _ in 0..100 {
            last = net.fit(&states, &targets).unwrap();
        }
        assert!(last < first, "loss {last} did not drop below {first}");
        assert!(net.fit(&states, &targets[..3]).is_err(), "target rows must match");
    }

    #[test]
    fn network_sync_and_persistence() {
        let device = NdArrayDevice::default();
        let mut rng = StdRng::seed_from_u64(2);
        let states = snake_states(&mut rng, 4);
        let mut trained = network(&device);
        trained.fit(&states, &vec![vec![3.0, 0.0, -3.0]; 4]).unwrap();

        let mut copy = network(&device);
        QFunction::<EncodedState>::sync_from(&mut copy, &trained);
        assert_eq!(copy.predict(&states).unwrap(), trained.predict(&states).unwrap());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model");
        trained.save(&path).unwrap();
        let mut loaded = network(&device);
        loaded.load(&path).unwrap();
        assert_eq!(loaded.predict(&states).unwrap(), trained.predict(&states).unwrap());

        assert!(loaded.load(dir.path().join("missing")).is_err(), "missing record");
        assert!(loaded.predict(&states).is_ok(), "a failed load keeps the old model");
    }

    #[test]
    fn network_trainer_runs_on_snake() {
        let device = NdArrayDevice::default();
        let mut rng = StdRng::seed_from_u64(3);
        let env = SnakeEnv::new(SnakeConfig::default(), &mut rng).unwrap();
        let session = Session::new(env, 100).unwrap();
        let mut trainer = DQNTrainer::new(
            session,
            network(&device),
            network(&device),
            DQNConfig {
                memory_capacity: 256,
                batch_size: 16,
                update_frequency: 20,
                warmup: 16,
                ..Default::default()
            },
            &mut rng,
        )
        .unwrap();

        trainer.run(150, &mut rng).unwrap();
        assert_eq!(trainer.steps(), 150);
        assert_eq!(trainer.memory().len(), 150);
        assert!(trainer.metrics().games_played() > 0, "random play dies quickly");
    }
}

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};
use clap::Parser;
use log::info;
use qlearn::{
    agent::Agent,
    algo::{
        dqn::{self, DQNTrainer, QNetConfig},
        Mode, QTableLearner,
    },
    config::{ExperimentConfig, Game, Method},
    env::{Environment, Session},
    gym::snake::{SnakeEnv, NUM_BITS},
};
use rand::{rngs::StdRng, SeedableRng};
use tracing_subscriber::EnvFilter;

type DQNBackend = Autodiff<NdArray>;

#[derive(Parser)]
#[command(name = "qlearn")]
#[command(version, about = "Train Q-learning agents to play games")]
struct Cli {
    /// The game to learn
    game: Game,

    /// Name of the experiment directory
    exp_name: String,

    #[arg(long, value_enum, default_value_t = Method::Qtable)]
    method: Method,

    /// Training episodes (qtable)
    #[arg(long, default_value_t = 100)]
    episodes: usize,

    /// Training steps (dqn)
    #[arg(long, default_value_t = 100_000)]
    steps: usize,

    /// Learning rate [default: 0.1 for qtable, 1e-3 for dqn]
    #[arg(long)]
    lr: Option<f64>,

    #[arg(long = "initial-e", default_value_t = 1.0)]
    initial_epsilon: f32,

    #[arg(long = "min-e", default_value_t = 0.01)]
    min_epsilon: f32,

    /// Multiplicative epsilon decay rate
    #[arg(long = "e-decay", default_value_t = 0.005)]
    epsilon_decay: f32,

    /// Discount factor [default: 0.95 for qtable, 0.99 for dqn]
    #[arg(long)]
    gamma: Option<f32>,

    #[arg(long, default_value_t = 10)]
    board_size: usize,

    /// Maximum steps per episode
    #[arg(long, default_value_t = 5000)]
    step_limit: usize,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value = "experiments")]
    output_dir: PathBuf,

    /// Replace an existing experiment directory
    #[arg(long)]
    overwrite: bool,
}

impl Cli {
    fn into_config(self) -> ExperimentConfig {
        let (lr, gamma) = match self.method {
            Method::Qtable => (0.1, 0.95),
            Method::Dqn => (1e-3, 0.99),
        };
        ExperimentConfig {
            game: self.game,
            name: self.exp_name,
            method: self.method,
            episodes: self.episodes,
            steps: self.steps,
            lr: self.lr.unwrap_or(lr),
            initial_epsilon: self.initial_epsilon,
            min_epsilon: self.min_epsilon,
            epsilon_decay: self.epsilon_decay,
            gamma: self.gamma.unwrap_or(gamma),
            board_size: self.board_size,
            step_limit: self.step_limit,
            seed: self.seed,
            output_dir: self.output_dir,
            overwrite: self.overwrite,
            ..Default::default()
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Cli::parse().into_config();
    config.validate().context("invalid arguments")?;
    let dir = config
        .prepare_experiment_dir()
        .context("failed to prepare the experiment directory")?;

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let env = match config.game {
        Game::Snake11 => SnakeEnv::new(config.snake_config(), &mut rng)?,
    };
    let session = Session::new(env, config.step_limit)?;

    match config.method {
        Method::Qtable => train_q_table(&config, session, &mut rng, &dir),
        Method::Dqn => train_dqn(&config, session, &mut rng, &dir),
    }
}

fn train_q_table(
    config: &ExperimentConfig,
    mut session: Session<SnakeEnv>,
    rng: &mut StdRng,
    dir: &std::path::Path,
) -> Result<()> {
    let mut learner = QTableLearner::new(session.env(), config.q_table_config()?, rng)?;
    let metrics = learner.train(&mut session, config.episodes, rng)?;

    metrics
        .write_csv(dir.join("scores.csv"))
        .context("failed to write scores")?;
    learner
        .tables()
        .save_json(dir.join("qtables.json"))
        .context("failed to save the value tables")?;
    for (name, table) in learner.tables().iter() {
        table
            .write_csv(dir.join(format!("{name}.csv")))
            .with_context(|| format!("failed to export the table of `{name}`"))?;
    }

    let greedy = learner.play_episode(&mut session, Mode::Greedy, rng)?;
    info!(
        "Greedy play: score {} in {} steps ({:?})",
        greedy.score, greedy.steps, greedy.outcome
    );
    info!("Final board:\n{}", session.env().state());
    Ok(())
}

fn train_dqn(
    config: &ExperimentConfig,
    session: Session<SnakeEnv>,
    rng: &mut StdRng,
    dir: &std::path::Path,
) -> Result<()> {
    let device = NdArrayDevice::default();
    let num_actions = session.env().agents()[0].actions().len();
    let network = || {
        let model = QNetConfig::new(NUM_BITS, num_actions).init::<DQNBackend>(&device);
        dqn::adamw(model, config.lr, num_actions, &device)
    };

    let mut trainer = DQNTrainer::new(session, network(), network(), config.dqn_config()?, rng)?;
    let metrics = trainer.run(config.steps, rng)?;

    metrics
        .write_csv(dir.join("scores.csv"))
        .context("failed to write scores")?;
    trainer
        .target()
        .save(dir.join("model"))
        .context("failed to save the network")?;
    Ok(())
}

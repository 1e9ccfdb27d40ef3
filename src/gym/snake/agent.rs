use rand::Rng;
use strum::VariantArray;

use super::rules::{GameState, Rewards, Turn};
use crate::{
    agent::{Agent, Moved},
    error::Result,
};

/// The player of a snake game
///
/// Steers the snake with turns relative to its heading and knows how each turn is rewarded.
#[derive(Debug, Clone, PartialEq)]
pub struct SnakeAgent {
    name: String,
    rewards: Rewards,
}

impl SnakeAgent {
    pub fn new(name: impl Into<String>, rewards: Rewards) -> Self {
        Self {
            name: name.into(),
            rewards,
        }
    }

    pub fn rewards(&self) -> &Rewards {
        &self.rewards
    }
}

impl Agent for SnakeAgent {
    type Action = Turn;
    type World = GameState;

    fn name(&self) -> &str {
        &self.name
    }

    fn actions(&self) -> &[Self::Action] {
        Turn::VARIANTS
    }

    fn make_move<R: Rng + ?Sized>(
        &self,
        action: Self::Action,
        world: &mut Self::World,
        rng: &mut R,
    ) -> Result<Moved> {
        let outcome = world.step(action, &self.rewards, rng)?;
        Ok(Moved {
            reward: outcome.reward,
            done: outcome.terminal,
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{error::Error, gym::snake::rules::Heading};

    #[test]
    fn action_set_in_column_order() {
        let agent = SnakeAgent::new("snake", Rewards::default());
        assert_eq!(agent.actions(), [Turn::Forward, Turn::Left, Turn::Right]);
        assert_eq!(agent.action_index(Turn::Right), Some(2));
        assert!(agent.check_valid_action(Turn::Left));

        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..20 {
            let action = agent.random_action(&mut rng);
            assert!(agent.check_valid_action(action), "random actions are legal");
        }
    }

    #[test]
    fn moves_use_the_agent_rewards() {
        let rewards = Rewards {
            fruit: 1.0,
            death: -1.0,
            step: 0.0,
        };
        let agent = SnakeAgent::new("snake", rewards);
        let mut rng = StdRng::seed_from_u64(8);
        let mut world =
            GameState::from_parts(10, [(0, 0), (0, 1), (0, 2)], Heading::Right, (0, 3)).unwrap();

        let moved = agent.make_move(Turn::Forward, &mut world, &mut rng).unwrap();
        assert_eq!(moved, Moved { reward: 1.0, done: false }, "ate the fruit");

        let moved = agent.make_move(Turn::Left, &mut world, &mut rng).unwrap();
        assert_eq!(moved, Moved { reward: -1.0, done: true }, "hit the top wall");

        let err = agent.make_move(Turn::Forward, &mut world, &mut rng).unwrap_err();
        assert!(matches!(err, Error::GameOver), "got {err:?}");
    }
}

use std::fmt::Debug;

use rand::{seq::SliceRandom, Rng};

use crate::error::Result;

/// The immediate result of an agent acting on its world
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moved {
    pub reward: f32,
    /// Whether the move ended the episode
    pub done: bool,
}

/// An actor with a finite, fixed set of discrete actions
///
/// The agent owns the rules of how its actions change the world it lives in, while an
/// [`Environment`](crate::env::Environment) owns the world itself and decides whose turn it is.
pub trait Agent {
    type Action: Copy + Eq + Debug;

    /// The part of the environment this agent's moves act on
    type World;

    /// Name used to key this agent's value estimates
    fn name(&self) -> &str;

    /// The declared action set, in column order for value tables
    ///
    /// The returned slice should never be empty.
    fn actions(&self) -> &[Self::Action];

    fn check_valid_action(&self, action: Self::Action) -> bool {
        self.actions().contains(&action)
    }

    /// Column of `action` in this agent's action set
    fn action_index(&self, action: Self::Action) -> Option<usize> {
        self.actions().iter().position(|&a| a == action)
    }

    fn random_action<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Action {
        *self
            .actions()
            .choose(rng)
            .expect("There is always at least one action available")
    }

    /// Apply an already validated action to the world
    fn make_move<R: Rng + ?Sized>(
        &self,
        action: Self::Action,
        world: &mut Self::World,
        rng: &mut R,
    ) -> Result<Moved>;
}

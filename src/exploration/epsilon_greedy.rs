use log::warn;
use rand::Rng;

use crate::decay::Decay;

use super::Choice;

/// When the exploration schedule advances
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecayPolicy {
    /// Decay once per completed episode
    #[default]
    PerEpisode,
    /// Decay once per environment step
    PerStep,
}

/// Epsilon greedy exploration policy with time-decaying epsilon threshold
///
/// The schedule only moves forward when [`tick`](EpsilonGreedy::tick) is called, so the owner
/// decides whether time is counted in episodes or in steps (see [`DecayPolicy`]).
#[derive(Debug, Clone)]
pub struct EpsilonGreedy<D: Decay> {
    epsilon: D,
    policy: DecayPolicy,
    t: u32,
    floored: bool,
}

impl<D: Decay> EpsilonGreedy<D> {
    /// Initialize epsilon greedy policy with a decay strategy
    pub fn new(decay: D, policy: DecayPolicy) -> Self {
        Self {
            epsilon: decay,
            policy,
            t: 0,
            floored: false,
        }
    }

    /// Current exploration probability
    pub fn epsilon(&self) -> f32 {
        self.epsilon.evaluate(self.t as f32)
    }

    pub fn policy(&self) -> DecayPolicy {
        self.policy
    }

    /// Number of decay ticks applied so far
    pub fn ticks(&self) -> u32 {
        self.t
    }

    /// Whether epsilon has reached the floor of its decay
    pub fn is_floored(&self) -> bool {
        self.floored
    }

    /// Invoke epsilon greedy policy at the current point of the schedule
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Choice {
        if rng.gen::<f32>() < self.epsilon() {
            Choice::Explore
        } else {
            Choice::Exploit
        }
    }

    /// Advance the schedule by one tick
    ///
    /// **Returns** `true` only on the tick where epsilon first reaches its floor
    pub fn tick(&mut self) -> bool {
        self.t = self.t.saturating_add(1);
        if self.floored || self.epsilon() > self.epsilon.floor() {
            return false;
        }

        self.floored = true;
        warn!(
            "Minimum epsilon {} reached after {} {}. If this is well before expected, consider lowering the decay rate.",
            self.epsilon.floor(),
            self.t,
            match self.policy {
                DecayPolicy::PerEpisode => "episodes",
                DecayPolicy::PerStep => "steps",
            }
        );
        true
    }
}

/// Represents a single experience or transition in the environment
///
/// Field order matches the `(state, action, reward, next_state, done)` tuple used across the
/// replay boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exp<S> {
    /// The encoded state of the environment before taking the action
    pub state: S,
    /// Column index of the action taken, within the acting agent's action set
    pub action: usize,
    /// The reward received after taking the action
    pub reward: f32,
    /// The encoded state of the environment after the action is taken
    pub next_state: S,
    /// Whether `next_state` is terminal, in which case it must not be bootstrapped from
    pub done: bool,
}

impl<S> From<(S, usize, f32, S, bool)> for Exp<S> {
    fn from((state, action, reward, next_state, done): (S, usize, f32, S, bool)) -> Self {
        Self {
            state,
            action,
            reward,
            next_state,
            done,
        }
    }
}

/// A zipped batch of [experiences](Exp)
#[derive(Clone, Debug, PartialEq)]
pub struct ExpBatch<S> {
    pub states: Vec<S>,
    pub actions: Vec<usize>,
    pub rewards: Vec<f32>,
    pub next_states: Vec<S>,
    pub dones: Vec<bool>,
}

impl<S: Clone> ExpBatch<S> {
    /// Construct an `ExpBatch` from an iterator of [experience](Exp) references and a specified batch size
    pub fn from_iter<'a>(iter: impl IntoIterator<Item = &'a Exp<S>>, batch_size: usize) -> Self
    where
        S: 'a,
    {
        let batch = Self {
            states: Vec::with_capacity(batch_size),
            actions: Vec::with_capacity(batch_size),
            rewards: Vec::with_capacity(batch_size),
            next_states: Vec::with_capacity(batch_size),
            dones: Vec::with_capacity(batch_size),
        };

        iter.into_iter().fold(batch, |mut b, e| {
            b.states.push(e.state.clone());
            b.actions.push(e.action);
            b.rewards.push(e.reward);
            b.next_states.push(e.next_state.clone());
            b.dones.push(e.done);
            b
        })
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BATCH_SIZE: usize = 2;

    fn create_mock_exp_array() -> [Exp<u16>; BATCH_SIZE] {
        let exp1 = Exp::from((0, 1, 1.0, 1, false));
        let exp2 = Exp {
            state: 1,
            action: 2,
            reward: -1.0,
            next_state: 1,
            done: true,
        };
        [exp1, exp2]
    }

    #[test]
    fn exp_batch_from_iter() {
        let experiences = create_mock_exp_array();
        let batch = ExpBatch::from_iter(&experiences, BATCH_SIZE);

        assert_eq!(batch.len(), 2, "Batch length correct");
        assert_eq!(batch.states, [0, 1], "States constructed correctly");
        assert_eq!(batch.actions, [1, 2], "Actions constructed correctly");
        assert_eq!(batch.rewards, [1.0, -1.0], "Rewards constructed correctly");
        assert_eq!(batch.next_states, [1, 1], "Next states constructed correctly");
        assert_eq!(batch.dones, [false, true], "Done flags constructed correctly");
    }
}

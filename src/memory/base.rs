use rand::{seq::SliceRandom, Rng};

use crate::{
    ds::RingBuffer,
    error::{Error, Result},
};

use super::{Exp, ExpBatch};

/// A fixed-size memory storage for reinforcement learning experiences
///
/// This structure uses a ring buffer to store experiences, which are tuples of (state, action, reward, next state, done).
/// It automatically overwrites the oldest experiences once it reaches its capacity.
///
/// ### Type Parameters:
/// - `S`: Encoded state
#[derive(Debug, Clone)]
pub struct ReplayMemory<S> {
    memory: RingBuffer<Exp<S>>,
}

impl<S: Clone> ReplayMemory<S> {
    /// **Panics** if `capacity` is zero
    pub fn new(capacity: usize) -> Self {
        Self {
            memory: RingBuffer::new(capacity),
        }
    }

    /// Add a new experience to the memory, evicting the oldest one when full
    pub fn push(&mut self, exp: Exp<S>) {
        self.memory.push(exp);
    }

    /// Number of stored experiences
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.memory.capacity()
    }

    pub fn is_full(&self) -> bool {
        self.memory.is_full()
    }

    /// Iterate over the stored experiences, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Exp<S>> {
        self.memory.iter()
    }

    /// Sample `batch_size` distinct experiences uniformly at random
    ///
    /// ### Errors
    /// [`Error::InsufficientExperience`] if fewer than `batch_size` experiences are stored
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Result<Vec<&Exp<S>>> {
        if batch_size > self.memory.len() {
            return Err(Error::InsufficientExperience {
                requested: batch_size,
                available: self.memory.len(),
            });
        }

        Ok(self
            .memory
            .view()
            .choose_multiple(rng, batch_size)
            .collect())
    }

    /// Sample a random batch of experiences from the memory and zip the vector of tuples into a tuple of vectors
    ///
    /// ### Errors
    /// [`Error::InsufficientExperience`] if fewer than `batch_size` experiences are stored
    pub fn sample_zipped<R: Rng + ?Sized>(
        &self,
        batch_size: usize,
        rng: &mut R,
    ) -> Result<ExpBatch<S>> {
        let experiences = self.sample(batch_size, rng)?;
        Ok(ExpBatch::from_iter(experiences, batch_size))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    const MEMORY_CAP: usize = 4;
    const BATCH_SIZE: usize = 2;

    fn mock_exp(i: u32) -> Exp<u32> {
        Exp {
            state: i,
            action: (i % 3) as usize,
            reward: 1.0,
            next_state: i + 1,
            done: false,
        }
    }

    #[test]
    fn replay_memory_functional() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut memory = ReplayMemory::new(MEMORY_CAP);

        assert!(memory.is_empty(), "initialized empty");
        assert!(
            matches!(
                memory.sample(BATCH_SIZE, &mut rng),
                Err(Error::InsufficientExperience {
                    requested: 2,
                    available: 0
                })
            ),
            "sample fails when too few experiences"
        );
        assert!(
            memory.sample_zipped(BATCH_SIZE, &mut rng).is_err(),
            "sample_zipped fails when too few experiences"
        );

        for i in 0..4 {
            memory.push(mock_exp(i));
        }

        assert!(
            memory.sample(BATCH_SIZE, &mut rng).is_ok_and(|b| b.len() == 2),
            "sample works"
        );
        assert!(
            memory
                .sample_zipped(BATCH_SIZE, &mut rng)
                .is_ok_and(|b| b.states.len() == 2),
            "sample_zipped works"
        );
    }

    #[test]
    fn replay_memory_evicts_oldest() {
        let k = 3;
        let mut memory = ReplayMemory::new(MEMORY_CAP);
        for i in 0..(MEMORY_CAP + k) as u32 {
            memory.push(mock_exp(i));
        }

        assert_eq!(memory.len(), MEMORY_CAP, "length capped at capacity");
        let states = memory.iter().map(|e| e.state).collect::<Vec<_>>();
        assert_eq!(states, [3, 4, 5, 6], "most recent experiences, oldest first");
    }

    #[test]
    fn sample_is_without_replacement() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut memory = ReplayMemory::new(16);
        for i in 0..16 {
            memory.push(mock_exp(i));
        }

        for _ in 0..50 {
            let batch = memory.sample(16, &mut rng).unwrap();
            let unique = batch.iter().map(|e| e.state).collect::<HashSet<_>>();
            assert_eq!(unique.len(), 16, "every experience drawn exactly once");
        }
    }

    #[test]
    fn sample_is_reproducible_from_seed() {
        let mut memory = ReplayMemory::new(32);
        for i in 0..32 {
            memory.push(mock_exp(i));
        }

        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            memory
                .sample_zipped(8, &mut rng)
                .map(|b| b.states)
                .unwrap()
        };
        assert_eq!(draw(5), draw(5), "same seed, same batch");
    }
}

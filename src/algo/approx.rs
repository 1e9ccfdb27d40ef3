use std::marker::PhantomData;

use super::value_table::ValueTable;
use crate::{
    assert_interval,
    env::TabularState,
    error::{Error, Result},
};

/// A trainable estimate of action values for a batch of encoded states
///
/// The batched trainer only talks to its value estimates through this trait, so a plain table
/// and a neural network are interchangeable.
pub trait QFunction<S> {
    /// Number of actions, i.e. the width of each prediction row
    fn num_actions(&self) -> usize;

    /// One row of action values per state
    fn predict(&self, states: &[S]) -> Result<Vec<Vec<f32>>>;

    /// Move the estimates for `states` towards `targets`, one gradient step
    ///
    /// **Returns** the training loss of the batch before the step
    fn fit(&mut self, states: &[S], targets: &[Vec<f32>]) -> Result<f32>;

    /// Overwrite these parameters with a copy of `source`'s
    fn sync_from(&mut self, source: &Self);
}

/// Check that a batch of targets is `[states.len(), num_actions]`
pub(crate) fn check_targets(num_states: usize, targets: &[Vec<f32>], num_actions: usize) -> Result<()> {
    let rows_ok = targets.len() == num_states;
    if !rows_ok || targets.iter().any(|t| t.len() != num_actions) {
        return Err(Error::ShapeMismatch {
            expected: format!("[{num_states}, {num_actions}] targets"),
            found: format!(
                "{} rows of widths {:?}",
                targets.len(),
                targets.iter().map(Vec::len).collect::<Vec<_>>()
            ),
        });
    }
    Ok(())
}

/// A [`ValueTable`] used as a [`QFunction`]
///
/// Each fit moves the selected rows a fraction `alpha` of the way towards their targets, which is
/// one step of gradient descent on the squared error.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularQ<S> {
    table: ValueTable,
    alpha: f32,
    _state: PhantomData<fn(S)>,
}

impl<S: TabularState> TabularQ<S> {
    /// **Panics** if `alpha` is not in the interval `[0,1]`
    ///
    /// ### Errors
    /// [`Error::ShapeMismatch`] if the table has a row count other than `S::NUM_STATES`
    pub fn new(table: ValueTable, alpha: f32) -> Result<Self> {
        assert_interval!(alpha, 0.0, 1.0);
        if table.rows() != S::NUM_STATES {
            return Err(Error::ShapeMismatch {
                expected: format!("{} rows", S::NUM_STATES),
                found: format!("{} rows", table.rows()),
            });
        }
        Ok(Self {
            table,
            alpha,
            _state: PhantomData,
        })
    }

    pub fn table(&self) -> &ValueTable {
        &self.table
    }

    pub fn into_table(self) -> ValueTable {
        self.table
    }
}

impl<S: TabularState> QFunction<S> for TabularQ<S> {
    fn num_actions(&self) -> usize {
        self.table.cols()
    }

    fn predict(&self, states: &[S]) -> Result<Vec<Vec<f32>>> {
        Ok(states
            .iter()
            .map(|s| self.table.row(s.row()).to_vec())
            .collect())
    }

    fn fit(&mut self, states: &[S], targets: &[Vec<f32>]) -> Result<f32> {
        check_targets(states.len(), targets, self.num_actions())?;
        if states.is_empty() {
            return Ok(0.0);
        }

        let mut loss = 0.0;
        for (state, target) in states.iter().zip(targets) {
            let row = self.table.row_mut(state.row());
            for (q, &t) in row.iter_mut().zip(target) {
                let error = t - *q;
                loss += error * error;
                *q += self.alpha * error;
            }
        }
        Ok(loss / (states.len() * self.table.cols()) as f32)
    }

    fn sync_from(&mut self, source: &Self) {
        self.table.clone_from(&source.table);
    }
}

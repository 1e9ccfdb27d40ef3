use std::{collections::VecDeque, fmt};

use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, FromRepr, VariantArray};

use crate::error::{Error, Result};

/// Smallest supported board side length
pub const MIN_BOARD_SIZE: usize = 5;

/// A `(row, col)` cell. Signed so that a head that left the board can still be represented.
pub type Pos = (i32, i32);

/// Absolute direction of travel, seen from above the board
#[derive(EnumIter, VariantArray, FromRepr, Display, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Heading {
    #[strum(serialize = "U")]
    Up = 0,
    #[strum(serialize = "D")]
    Down = 1,
    #[strum(serialize = "L")]
    Left = 2,
    #[strum(serialize = "R")]
    Right = 3,
}

impl Heading {
    /// Heading after making `turn`, relative to the snake's own point of view
    ///
    /// Moving down and turning left means the snake now travels right.
    pub fn turn(self, turn: Turn) -> Heading {
        use Heading::*;
        match (self, turn) {
            (h, Turn::Forward) => h,
            (Up, Turn::Left) | (Down, Turn::Right) => Left,
            (Up, Turn::Right) | (Down, Turn::Left) => Right,
            (Left, Turn::Left) | (Right, Turn::Right) => Down,
            (Left, Turn::Right) | (Right, Turn::Left) => Up,
        }
    }

    /// Unit `(row, col)` offset of one step in this heading
    pub fn offset(self) -> Pos {
        match self {
            Heading::Up => (-1, 0),
            Heading::Down => (1, 0),
            Heading::Left => (0, -1),
            Heading::Right => (0, 1),
        }
    }

    /// The cell one step from `pos` in this heading
    pub fn step_from(self, pos: Pos) -> Pos {
        let (dr, dc) = self.offset();
        (pos.0 + dr, pos.1 + dc)
    }
}

/// The snake's actions, relative to its current heading
#[derive(EnumIter, VariantArray, FromRepr, Display, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Turn {
    #[strum(serialize = "F")]
    Forward = 0,
    #[strum(serialize = "L")]
    Left = 1,
    #[strum(serialize = "R")]
    Right = 2,
}

/// Reward magnitudes for the three kinds of step
///
/// Only the signs and the neutrality of a plain step matter to the learners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rewards {
    pub fruit: f32,
    pub death: f32,
    pub step: f32,
}

impl Default for Rewards {
    fn default() -> Self {
        Self {
            fruit: 10.0,
            death: -10.0,
            step: 0.0,
        }
    }
}

/// What a single move did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outcome {
    pub reward: f32,
    pub terminal: bool,
    pub ate_fruit: bool,
}

/// The full state of one game of snake
///
/// The body is stored tail first, head last. The fruit never lies on the body, and the head
/// only overlaps the body on the move that ended the game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    body: VecDeque<Pos>,
    heading: Heading,
    fruit: Pos,
    board_size: usize,
    score: u32,
    terminal: bool,
}

impl GameState {
    /// Start a new game: a three cell snake in the top left corner heading right, and a fruit
    /// somewhere else on the board
    ///
    /// ### Errors
    /// [`Error::BoardTooSmall`] if `board_size` is below [`MIN_BOARD_SIZE`]
    pub fn new<R: Rng + ?Sized>(board_size: usize, rng: &mut R) -> Result<Self> {
        let body = VecDeque::from([(0, 0), (0, 1), (0, 2)]);
        let fruit = place_fruit(board_size, &body, rng).unwrap_or((0, 3));
        Self::from_parts(board_size, body, Heading::Right, fruit)
    }

    /// Build a state from explicit parts
    ///
    /// ### Errors
    /// - [`Error::BoardTooSmall`] if `board_size` is below [`MIN_BOARD_SIZE`]
    /// - [`Error::InvalidParameter`] if the body is empty, leaves the board, overlaps itself,
    ///   or covers the fruit
    pub fn from_parts(
        board_size: usize,
        body: impl Into<VecDeque<Pos>>,
        heading: Heading,
        fruit: Pos,
    ) -> Result<Self> {
        if board_size < MIN_BOARD_SIZE {
            return Err(Error::BoardTooSmall {
                size: board_size,
                min: MIN_BOARD_SIZE,
            });
        }

        let body = body.into();
        let in_bounds = |&p: &Pos| is_in_bounds(board_size, p);
        if body.is_empty() || !body.iter().all(in_bounds) || !in_bounds(&fruit) {
            return Err(Error::InvalidParameter(
                "snake and fruit must lie on the board".into(),
            ));
        }
        if body.iter().enumerate().any(|(i, p)| body.iter().skip(i + 1).any(|q| p == q)) {
            return Err(Error::InvalidParameter("snake body overlaps itself".into()));
        }
        if body.contains(&fruit) {
            return Err(Error::InvalidParameter("fruit lies on the snake".into()));
        }

        Ok(Self {
            body,
            heading,
            fruit,
            board_size,
            score: 0,
            terminal: false,
        })
    }

    /// Occupied cells, tail first and head last
    pub fn body(&self) -> &VecDeque<Pos> {
        &self.body
    }

    pub fn head(&self) -> Pos {
        *self.body.back().expect("body is not empty")
    }

    pub fn heading(&self) -> Heading {
        self.heading
    }

    pub fn fruit(&self) -> Pos {
        self.fruit
    }

    pub fn board_size(&self) -> usize {
        self.board_size
    }

    /// Fruits eaten this game
    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_in_bounds(&self, pos: Pos) -> bool {
        is_in_bounds(self.board_size, pos)
    }

    /// Whether moving the head onto `pos` would end the game
    pub fn is_danger(&self, pos: Pos) -> bool {
        !self.is_in_bounds(pos) || self.body.contains(&pos)
    }

    /// Compute the state after `turn` without touching `self`
    ///
    /// Collisions are checked before the fruit, so a move that both crashes and reaches the fruit
    /// is a death. Eating grows the snake by re-attaching the tail cell it just left.
    ///
    /// ### Errors
    /// [`Error::GameOver`] if this state is already terminal
    pub fn apply_move<R: Rng + ?Sized>(
        &self,
        turn: Turn,
        rewards: &Rewards,
        rng: &mut R,
    ) -> Result<(GameState, Outcome)> {
        if self.terminal {
            return Err(Error::GameOver);
        }

        let mut next = self.clone();
        next.heading = self.heading.turn(turn);
        let new_head = next.heading.step_from(self.head());
        let old_tail = next.body.pop_front().expect("body is not empty");

        // The vacated tail cell is free to move into
        let collided = next.body.contains(&new_head) || !next.is_in_bounds(new_head);
        next.body.push_back(new_head);

        let outcome = if collided {
            next.terminal = true;
            Outcome {
                reward: rewards.death,
                terminal: true,
                ate_fruit: false,
            }
        } else if new_head == self.fruit {
            next.body.push_front(old_tail);
            next.score += 1;
            match place_fruit(next.board_size, &next.body, rng) {
                Some(fruit) => next.fruit = fruit,
                // The snake fills the whole board; nothing is left to play for
                None => next.terminal = true,
            }
            Outcome {
                reward: rewards.fruit,
                terminal: next.terminal,
                ate_fruit: true,
            }
        } else {
            Outcome {
                reward: rewards.step,
                terminal: false,
                ate_fruit: false,
            }
        };

        Ok((next, outcome))
    }

    /// Apply `turn` in place
    ///
    /// ### Errors
    /// [`Error::GameOver`] if this state is already terminal; `self` is left unchanged
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        turn: Turn,
        rewards: &Rewards,
        rng: &mut R,
    ) -> Result<Outcome> {
        let (next, outcome) = self.apply_move(turn, rewards, rng)?;
        *self = next;
        Ok(outcome)
    }
}

fn is_in_bounds(board_size: usize, (r, c): Pos) -> bool {
    let size = board_size as i32;
    (0..size).contains(&r) && (0..size).contains(&c)
}

/// Pick a free cell uniformly at random, or `None` if the snake covers the board
fn place_fruit<R: Rng + ?Sized>(board_size: usize, body: &VecDeque<Pos>, rng: &mut R) -> Option<Pos> {
    let size = board_size as i32;
    let vacant = (0..size)
        .flat_map(|r| (0..size).map(move |c| (r, c)))
        .filter(|pos| !body.contains(pos))
        .collect::<Vec<_>>();
    vacant.choose(rng).copied()
}

impl fmt::Display for GameState {
    /// `#` border, `h` head, `s` body, `f` fruit, `-` empty
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = self.board_size as i32;
        let border = "#".repeat(self.board_size + 2);
        writeln!(f, "{border}")?;
        for r in 0..size {
            write!(f, "#")?;
            for c in 0..size {
                let cell = if (r, c) == self.head() {
                    'h'
                } else if self.body.contains(&(r, c)) {
                    's'
                } else if (r, c) == self.fruit {
                    'f'
                } else {
                    '-'
                };
                write!(f, "{cell}")?;
            }
            writeln!(f, "#")?;
        }
        write!(f, "{border}")
    }
}

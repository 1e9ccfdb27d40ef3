use std::{fmt, str::FromStr};

use strum::VariantArray;

use super::rules::{GameState, Heading, Turn};
use crate::{
    env::{Features, TabularState},
    error::{Error, Result},
};

/// Number of bits in an [`EncodedState`]
pub const NUM_BITS: usize = 11;

/// Where the fruit lies along one axis, relative to the head
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relative {
    /// Same row (or column) as the head: `00`
    Same,
    /// Above (or left of) the head: `10`
    Before,
    /// Below (or right of) the head: `01`
    After,
}

impl Relative {
    fn of(head: i32, fruit: i32) -> Self {
        match head.cmp(&fruit) {
            std::cmp::Ordering::Greater => Relative::Before,
            std::cmp::Ordering::Less => Relative::After,
            std::cmp::Ordering::Equal => Relative::Same,
        }
    }

    fn bits(self) -> u16 {
        match self {
            Relative::Same => 0b00,
            Relative::Before => 0b10,
            Relative::After => 0b01,
        }
    }

    fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            0b00 => Some(Relative::Same),
            0b10 => Some(Relative::Before),
            0b01 => Some(Relative::After),
            _ => None,
        }
    }
}

/// The snake's view of the board as an 11-bit vector
///
/// Bits left to right (bit 0 is the most significant when read as an integer):
///
/// | bits  | meaning                                                   |
/// |-------|-----------------------------------------------------------|
/// | 0..=2 | danger forward, left, right of the head                   |
/// | 3..=4 | fruit row: `00` same, `10` above, `01` below              |
/// | 5..=6 | fruit column: `00` same, `10` left, `01` right            |
/// | 7..=10| heading one-hot in the order up, down, left, right        |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodedState(u16);

impl EncodedState {
    /// Encode the current state of a game
    pub fn encode(state: &GameState) -> Self {
        let head = state.head();
        let heading = state.heading();

        let danger = Turn::VARIANTS
            .iter()
            .map(|&turn| state.is_danger(heading.turn(turn).step_from(head)))
            .fold(0u16, |acc, d| (acc << 1) | d as u16);

        let fruit = state.fruit();
        let rows = Relative::of(head.0, fruit.0).bits();
        let cols = Relative::of(head.1, fruit.1).bits();

        let heading_bits = 0b1000 >> heading as u16;

        Self((danger << 8) | (rows << 6) | (cols << 4) | heading_bits)
    }

    /// Value of bit `i`, counting from the left
    ///
    /// **Panics** if `i >= 11`
    pub fn bit(&self, i: usize) -> bool {
        assert!(i < NUM_BITS, "bit index {i} out of range");
        (self.0 >> (NUM_BITS - 1 - i)) & 1 == 1
    }

    pub fn bits(&self) -> [bool; NUM_BITS] {
        std::array::from_fn(|i| self.bit(i))
    }

    /// Whether moving forward, left or right would end the game
    pub fn danger(&self) -> [bool; 3] {
        [self.bit(0), self.bit(1), self.bit(2)]
    }

    pub fn fruit_row(&self) -> Relative {
        Relative::from_bits((self.0 >> 6) & 0b11).expect("never encoded as 11")
    }

    pub fn fruit_col(&self) -> Relative {
        Relative::from_bits((self.0 >> 4) & 0b11).expect("never encoded as 11")
    }

    pub fn heading(&self) -> Heading {
        let one_hot = self.0 & 0b1111;
        Heading::from_repr(3 - one_hot.trailing_zeros() as usize).expect("one-hot heading")
    }

    /// The encoding read as an unsigned integer, used as a table row
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<u16> for EncodedState {
    type Error = Error;

    /// Accept only integers a real game could produce
    fn try_from(value: u16) -> Result<Self> {
        let invalid = || Error::InvalidParameter(format!("{value:#b} is not a valid snake encoding"));
        if value >> NUM_BITS != 0
            || (value & 0b1111).count_ones() != 1
            || Relative::from_bits((value >> 6) & 0b11).is_none()
            || Relative::from_bits((value >> 4) & 0b11).is_none()
        {
            return Err(invalid());
        }
        Ok(Self(value))
    }
}

impl FromStr for EncodedState {
    type Err = Error;

    /// Parse an 11 character bit string such as `"00010000001"`
    fn from_str(s: &str) -> Result<Self> {
        if s.len() != NUM_BITS {
            return Err(Error::InvalidParameter(format!(
                "expected {NUM_BITS} bits, found {:?}",
                s
            )));
        }
        if !s.bytes().all(|b| b == b'0' || b == b'1') {
            return Err(Error::InvalidParameter(format!("{s:?} is not a bit string")));
        }
        let value = u16::from_str_radix(s, 2)
            .map_err(|e| Error::InvalidParameter(format!("{s:?} is not a bit string: {e}")))?;
        Self::try_from(value)
    }
}

impl fmt::Display for EncodedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:011b}", self.0)
    }
}

impl TabularState for EncodedState {
    const NUM_STATES: usize = 1 << NUM_BITS;

    fn row(&self) -> usize {
        self.index()
    }
}

impl Features for EncodedState {
    const WIDTH: usize = NUM_BITS;

    fn write_features(&self, out: &mut Vec<f32>) {
        out.extend(self.bits().map(|b| b as u8 as f32));
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
    use strum::IntoEnumIterator;

    use super::*;
    use crate::gym::snake::rules::Rewards;

    fn state(body: &[(i32, i32)], heading: Heading, fruit: (i32, i32)) -> GameState {
        GameState::from_parts(10, body.to_vec(), heading, fruit).unwrap()
    }

    #[test]
    fn start_position_encoding() {
        // Heading right along the top wall, fruit below and to the right
        let s = state(&[(0, 0), (0, 1), (0, 2)], Heading::Right, (5, 7));
        let encoded = EncodedState::encode(&s);
        assert_eq!(encoded.to_string(), "01001010001");
        assert_eq!(encoded.danger(), [false, true, false], "wall on the left");
        assert_eq!(encoded.fruit_row(), Relative::After);
        assert_eq!(encoded.fruit_col(), Relative::After);
        assert_eq!(encoded.heading(), Heading::Right);
        assert_eq!(encoded.index(), 0b01001010001);
    }

    #[test]
    fn body_counts_as_danger() {
        // Heading down with the tail curled round to the snake's left
        let s = state(&[(3, 4), (2, 4), (2, 3), (3, 3)], Heading::Down, (0, 0));
        let encoded = EncodedState::encode(&s);
        // Facing down from (3, 3): left is (3, 4) which is the tail
        assert_eq!(encoded.danger(), [false, true, false]);
        assert_eq!(encoded.fruit_row(), Relative::Before);
        assert_eq!(encoded.fruit_col(), Relative::Before);
        assert_eq!(encoded.heading(), Heading::Down);
    }

    #[test]
    fn same_row_and_column_fields() {
        let s = state(&[(4, 2), (4, 3)], Heading::Right, (4, 3 + 4));
        assert_eq!(EncodedState::encode(&s).fruit_row(), Relative::Same);
        let s = state(&[(2, 5), (3, 5)], Heading::Down, (8, 5));
        assert_eq!(EncodedState::encode(&s).fruit_col(), Relative::Same);
    }

    #[test]
    fn danger_is_relative_to_heading() {
        // Head in the bottom right corner
        let corner = |heading| {
            let body: &[(i32, i32)] = match heading {
                Heading::Down => &[(8, 9), (9, 9)],
                Heading::Right => &[(9, 8), (9, 9)],
                Heading::Up | Heading::Left => unreachable!(),
            };
            EncodedState::encode(&state(body, heading, (0, 0))).danger()
        };
        assert_eq!(corner(Heading::Down), [true, true, false], "forward wall, left wall");
        assert_eq!(corner(Heading::Right), [true, false, true], "forward wall, right wall");
    }

    #[test]
    fn encoding_invariants_over_random_play() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..20 {
            let mut game = GameState::new(8, &mut rng).unwrap();
            while !game.is_terminal() {
                let encoded = EncodedState::encode(&game);
                assert_eq!(encoded, EncodedState::encode(&game), "deterministic");

                let bits = encoded.bits();
                assert_eq!(bits[7..].iter().filter(|&&b| b).count(), 1, "one-hot heading");
                assert!(!(bits[3] && bits[4]), "row field never 11");
                assert!(!(bits[5] && bits[6]), "column field never 11");
                assert_eq!(encoded.heading(), game.heading());
                assert!(encoded.index() < EncodedState::NUM_STATES);
                assert_eq!(EncodedState::try_from(encoded.0).unwrap(), encoded);

                let turn = *Turn::VARIANTS.choose(&mut rng).unwrap();
                game.step(turn, &Rewards::default(), &mut rng).unwrap();
            }
        }
    }

    #[test]
    fn heading_one_hot_order() {
        for heading in Heading::iter() {
            let body: &[(i32, i32)] = match heading {
                Heading::Up => &[(6, 5), (5, 5)],
                Heading::Down => &[(4, 5), (5, 5)],
                Heading::Left => &[(5, 6), (5, 5)],
                Heading::Right => &[(5, 4), (5, 5)],
            };
            let encoded = EncodedState::encode(&state(body, heading, (0, 0)));
            let mut one_hot = [false; 4];
            one_hot[heading as usize] = true;
            assert_eq!(encoded.bits()[7..], one_hot, "{heading:?}");
        }
    }

    #[test]
    fn parse_and_features() {
        let encoded: EncodedState = "10010100100".parse().unwrap();
        assert_eq!(encoded.danger(), [true, false, false]);
        assert_eq!(encoded.heading(), Heading::Down);
        assert_eq!(encoded.to_string(), "10010100100");

        let mut features = Vec::new();
        encoded.write_features(&mut features);
        assert_eq!(
            features,
            [1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0]
        );

        assert!("11".parse::<EncodedState>().is_err(), "wrong length");
        assert!("00011000001".parse::<EncodedState>().is_err(), "row field 11");
        assert!("00000000011".parse::<EncodedState>().is_err(), "two headings");
        assert!("0000000000x".parse::<EncodedState>().is_err(), "not binary");
        assert!("+0000000001".parse::<EncodedState>().is_err(), "sign is not a bit");
    }
}

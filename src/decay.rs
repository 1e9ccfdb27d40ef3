use crate::error::{Error, Result};

/// An implementation of a time-decaying value
pub trait Decay {
    /// Calculate value at time `t`
    fn evaluate(&self, t: f32) -> f32;

    /// The value the decay settles at
    fn floor(&self) -> f32;
}

/// A constant value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constant {
    value: f32,
}

impl Constant {
    pub fn new(value: f32) -> Self {
        Self { value }
    }
}

impl Decay for Constant {
    fn evaluate(&self, _t: f32) -> f32 {
        self.value
    }

    fn floor(&self) -> f32 {
        self.value
    }
}

/// v(t) = max(v<sub>i</sub> * (1 - r)<sup>t</sup>, v<sub>f</sub>)
///
/// The closed form of repeatedly applying `v <- max(v * (1 - r), vf)` once per tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Multiplicative {
    rate: f32,
    vi: f32,
    vf: f32,
}

impl Multiplicative {
    /// ### Errors
    /// [`Error::InvalidParameter`] unless `0 <= rate <= 1` and `vi >= vf`
    pub fn new(rate: f32, vi: f32, vf: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(Error::InvalidParameter(format!(
                "decay rate {rate} must be in [0, 1]"
            )));
        }
        if vi < vf {
            return Err(Error::InvalidParameter(format!(
                "initial value {vi} must not be below the floor {vf}"
            )));
        }
        Ok(Self { rate, vi, vf })
    }
}

impl Decay for Multiplicative {
    fn evaluate(&self, t: f32) -> f32 {
        let &Self { rate, vi, vf } = self;
        (vi * (1.0 - rate).powf(t)).max(vf)
    }

    fn floor(&self) -> f32 {
        self.vf
    }
}

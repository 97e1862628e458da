//! # Log-Space Probability Scalar
//!
//! Probabilities are carried as base-2 logarithms so that products over
//! thousands of signal samples never underflow. Zero needs its own
//! representation because log(0) is undefined; it is a distinguished
//! sentinel that absorbs under multiplication and is the identity under
//! addition.

use std::cmp::Ordering;
use std::ops::{Add, AddAssign, Mul, MulAssign};

use crate::error::{PorepathError, Result};

/// A non-negative real number stored as its base-2 logarithm.
///
/// Multiplication adds exponents, addition uses log-sum-exp, and ordering
/// treats the zero sentinel as the minimum.
#[derive(Clone, Copy, Debug)]
pub struct LogProb {
    log2: f64,
    is_zero: bool,
}

impl LogProb {
    /// Wrap a linear-scale value.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for negative values.
    pub fn new(value: f64) -> Result<Self> {
        if value < 0.0 {
            return Err(PorepathError::invalid_input(format!(
                "probability must be non-negative, got {value}"
            )));
        }
        if value == 0.0 {
            return Ok(Self::zero());
        }
        Ok(Self {
            log2: value.log2(),
            is_zero: false,
        })
    }

    /// The absorbing zero element.
    pub fn zero() -> Self {
        Self {
            log2: 0.0,
            is_zero: true,
        }
    }

    /// The multiplicative identity.
    pub fn one() -> Self {
        Self {
            log2: 0.0,
            is_zero: false,
        }
    }

    /// Wrap an already-computed base-2 logarithm. The exponent must be finite.
    pub fn from_log2(log2: f64) -> Self {
        Self {
            log2,
            is_zero: false,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.is_zero
    }

    /// Convert back to linear scale.
    ///
    /// Very negative exponents underflow to 0.0, which is acceptable at the
    /// boundary where linear weights are needed.
    pub fn value(&self) -> f64 {
        if self.is_zero {
            0.0
        } else {
            self.log2.exp2()
        }
    }
}

impl Mul for LogProb {
    type Output = LogProb;

    fn mul(self, rhs: LogProb) -> LogProb {
        if self.is_zero || rhs.is_zero {
            return LogProb::zero();
        }
        LogProb::from_log2(self.log2 + rhs.log2)
    }
}

impl MulAssign for LogProb {
    fn mul_assign(&mut self, rhs: LogProb) {
        *self = *self * rhs;
    }
}

impl Add for LogProb {
    type Output = LogProb;

    fn add(self, rhs: LogProb) -> LogProb {
        if self.is_zero {
            return rhs;
        }
        if rhs.is_zero {
            return self;
        }
        let (max, min) = if self.log2 >= rhs.log2 {
            (self.log2, rhs.log2)
        } else {
            (rhs.log2, self.log2)
        };
        LogProb::from_log2(max + (1.0 + (min - max).exp2()).log2())
    }
}

impl AddAssign for LogProb {
    fn add_assign(&mut self, rhs: LogProb) {
        *self = *self + rhs;
    }
}

impl PartialEq for LogProb {
    fn eq(&self, other: &Self) -> bool {
        if self.is_zero || other.is_zero {
            return self.is_zero == other.is_zero;
        }
        self.log2 == other.log2
    }
}

impl PartialOrd for LogProb {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.is_zero, other.is_zero) {
            (true, true) => Some(Ordering::Equal),
            (true, false) => Some(Ordering::Less),
            (false, true) => Some(Ordering::Greater),
            (false, false) => self.log2.partial_cmp(&other.log2),
        }
    }
}

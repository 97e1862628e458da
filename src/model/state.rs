//! # Emission States
//!
//! A state either emits nothing (silent) or draws a real-valued signal
//! level from a Gaussian. Enum-based polymorphism: new emission kinds are
//! new variants implementing the same small surface (`is_silent`, `prob`,
//! equality, the document form in `io::model_doc`).

use crate::error::{PorepathError, Result};
use crate::model::logprob::LogProb;

/// One HMM state.
#[derive(Debug, Clone, PartialEq)]
pub enum State {
    /// Emits no observation; its emission probability is the multiplicative
    /// identity for any input.
    Silent,
    /// Emits a signal level drawn from N(mu, sigma^2).
    Gaussian { mu: f64, sigma: f64 },
}

impl State {
    /// Gaussian state with validated parameters.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` unless `sigma > 0`.
    pub fn gaussian(mu: f64, sigma: f64) -> Result<Self> {
        if sigma <= 0.0 {
            return Err(PorepathError::invalid_input(format!(
                "sigma must be positive, got {sigma}"
            )));
        }
        Ok(State::Gaussian { mu, sigma })
    }

    pub fn is_silent(&self) -> bool {
        matches!(self, State::Silent)
    }

    /// Emission probability of `emission` in this state.
    ///
    /// The Gaussian density is computed directly in log2 space, so far-tail
    /// emissions keep a usable exponent instead of underflowing.
    pub fn prob(&self, emission: f64) -> LogProb {
        match *self {
            State::Silent => LogProb::one(),
            State::Gaussian { mu, sigma } => {
                let z = (emission - mu) / sigma;
                let log2_density = -0.5 * z * z * std::f64::consts::LOG2_E
                    - (sigma * (2.0 * std::f64::consts::PI).sqrt()).log2();
                LogProb::from_log2(log2_density)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_state_emits_identity() {
        let state = State::Silent;
        assert!(state.is_silent());
        assert_eq!(state.prob(0.7), LogProb::one());
        assert_eq!(state.prob(-123.0), LogProb::one());
    }

    #[test]
    fn gaussian_density_matches_closed_form() {
        let state = State::gaussian(1.5, 0.4).unwrap();
        assert!(!state.is_silent());
        for x in [-1.0, 0.0, 1.5, 2.2] {
            let expected = (-0.5 * ((x - 1.5) / 0.4_f64).powi(2)).exp()
                / (0.4 * (2.0 * std::f64::consts::PI).sqrt());
            assert!((state.prob(x).value() - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn gaussian_far_tail_keeps_log_precision() {
        let state = State::gaussian(0.0, 1.0).unwrap();
        let p = state.prob(100.0);
        assert!(!p.is_zero());
        assert_eq!(p.value(), 0.0); // linear scale underflows, log scale survives
    }

    #[test]
    fn gaussian_requires_positive_sigma() {
        assert!(matches!(
            State::gaussian(0.0, 0.0),
            Err(PorepathError::InvalidInput { .. })
        ));
        assert!(matches!(
            State::gaussian(0.0, -1.0),
            Err(PorepathError::InvalidInput { .. })
        ));
    }

    #[test]
    fn equality_is_component_wise() {
        assert_eq!(State::Silent, State::Silent);
        assert_eq!(
            State::gaussian(1.0, 0.5).unwrap(),
            State::Gaussian { mu: 1.0, sigma: 0.5 }
        );
        assert_ne!(
            State::gaussian(1.0, 0.5).unwrap(),
            State::gaussian(1.0, 0.6).unwrap()
        );
        assert_ne!(State::Silent, State::gaussian(0.0, 1.0).unwrap());
    }
}

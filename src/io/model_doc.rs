//! # Model Document
//!
//! JSON form of a trained model: topology with linear-scale probabilities
//! plus the tagged state list. Loading converts probabilities back to
//! log-space and re-validates the topology, so a document is interchangeable
//! with a freshly built model.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info_span;

use crate::error::{PorepathError, Result};
use crate::model::hmm::{Hmm, Transition};
use crate::model::logprob::LogProb;
use crate::model::state::State;

/// Serialized model: states and transitions indexed by state id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HmmDocument {
    pub initial_state: usize,
    pub number_of_states: usize,
    pub states: Vec<StateDoc>,
    pub transitions: Vec<Vec<TransitionDoc>>,
}

/// Document form of one state. Unknown tags fail deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StateDoc {
    SilentState,
    GaussianState { mu: f64, sigma: f64 },
}

/// Document form of one transition; `prob` is linear-scale in [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionDoc {
    pub to_state: usize,
    pub prob: f64,
}

impl From<&State> for StateDoc {
    fn from(state: &State) -> Self {
        match *state {
            State::Silent => StateDoc::SilentState,
            State::Gaussian { mu, sigma } => StateDoc::GaussianState { mu, sigma },
        }
    }
}

impl StateDoc {
    fn into_state(self) -> Result<State> {
        match self {
            StateDoc::SilentState => Ok(State::Silent),
            StateDoc::GaussianState { mu, sigma } => State::gaussian(mu, sigma),
        }
    }
}

impl HmmDocument {
    /// Capture a model and its states.
    pub fn from_model(hmm: &Hmm, states: &[State]) -> Self {
        Self {
            initial_state: hmm.initial_state(),
            number_of_states: hmm.num_states(),
            states: states.iter().map(StateDoc::from).collect(),
            transitions: hmm
                .transitions()
                .iter()
                .map(|outgoing| {
                    outgoing
                        .iter()
                        .map(|t| TransitionDoc {
                            to_state: t.to_state,
                            prob: t.prob.value(),
                        })
                        .collect()
                })
                .collect(),
        }
    }

    /// Rebuild the model, converting probabilities to log-space and
    /// re-running topology validation.
    ///
    /// # Errors
    ///
    /// `Deserialization` on inconsistent lengths; `InvalidInput` or
    /// `InvalidTopology` when the content itself is bad.
    pub fn into_model(self) -> Result<(Hmm, Vec<State>)> {
        if self.states.len() != self.number_of_states {
            return Err(PorepathError::deserialization(format!(
                "document declares {} states but lists {}",
                self.number_of_states,
                self.states.len()
            )));
        }
        if self.transitions.len() != self.number_of_states {
            return Err(PorepathError::deserialization(format!(
                "document declares {} states but lists {} transition rows",
                self.number_of_states,
                self.transitions.len()
            )));
        }
        let states = self
            .states
            .into_iter()
            .map(StateDoc::into_state)
            .collect::<Result<Vec<State>>>()?;
        let transitions = self
            .transitions
            .into_iter()
            .map(|outgoing| {
                outgoing
                    .into_iter()
                    .map(|t| {
                        Ok(Transition {
                            to_state: t.to_state,
                            prob: LogProb::new(t.prob)?,
                        })
                    })
                    .collect::<Result<Vec<Transition>>>()
            })
            .collect::<Result<Vec<Vec<Transition>>>>()?;
        let hmm = Hmm::new(self.initial_state, transitions, &states)?;
        Ok((hmm, states))
    }
}

/// Load a model document from disk.
pub fn read_model<P: AsRef<Path>>(path: P) -> Result<(Hmm, Vec<State>)> {
    let path = path.as_ref();
    info_span!("model_read", path = ?path).in_scope(|| {
        let file = File::open(path)?;
        let document: HmmDocument = serde_json::from_reader(BufReader::new(file))?;
        document.into_model()
    })
}

/// Write a model document to disk.
pub fn write_model<P: AsRef<Path>>(path: P, hmm: &Hmm, states: &[State]) -> Result<()> {
    let path = path.as_ref();
    info_span!("model_write", path = ?path).in_scope(|| {
        let file = File::create(path)?;
        let document = HmmDocument::from_model(hmm, states);
        serde_json::to_writer_pretty(BufWriter::new(file), &document)?;
        Ok(())
    })
}

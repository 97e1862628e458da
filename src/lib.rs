//! # Porepath Library
//!
//! HMM inference for nanopore sequencing signal traces.
//! Decodes raw signal against a k-mer hidden Markov model with silent states,
//! via Viterbi decoding or posterior path sampling, and trains the model
//! (transition table plus Gaussian emissions) from basecaller-annotated reads.
//!
//! ## Modules
//! - `config`: CLI argument parsing and validation
//! - `data`: Domain primitives (k-mer codec, move neighborhoods)
//! - `error`: Error types and result aliases
//! - `io`: File boundaries (model documents, training reads)
//! - `model`: Statistical core (log-space arithmetic, states, HMM, builder)
//! - `pipelines`: High-level workflow orchestration

pub mod config;
pub mod data;
pub mod error;
pub mod io;
pub mod model;
pub mod pipelines;

// Re-export commonly used types
pub use config::{Config, Mode};
pub use error::{PorepathError, Result};
pub use io::reads::{JsonlReads, MoveKmer, ReadSource, VecReads};
pub use model::hmm::{Hmm, Transition};
pub use model::logprob::LogProb;
pub use model::move_model::{construct_emissions, construct_transitions, GaussianParamsKmer};
pub use model::state::State;
pub use pipelines::{DecodePipeline, TrainPipeline};

//! # Model Module
//!
//! The statistical core: log-space arithmetic, emission states, the
//! silent-state HMM with Viterbi decoding and posterior path sampling, and
//! the move-model builder that estimates a k-mer HMM from annotated reads.

pub mod hmm;
pub mod logprob;
pub mod move_model;
pub mod state;

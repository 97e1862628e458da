//! # Configuration Logic
//!
//! CLI argument parsing and validation using clap derive. The run mode is
//! inferred from which input flags are present.

use clap::Parser;
use std::path::PathBuf;

use crate::error::{PorepathError, Result};

/// Porepath: HMM decoding of nanopore signal traces
#[derive(Parser, Debug, Clone)]
#[command(name = "porepath")]
#[command(version = "0.1.0")]
#[command(about = "HMM decoding of nanopore signal traces", long_about = None)]
pub struct Config {
    // ============ Decode Parameters ============
    /// Trained model document (JSON)
    #[arg(long, value_name = "FILE")]
    pub model: Option<PathBuf>,

    /// Signal file: one trace per line, whitespace-separated levels
    #[arg(long, value_name = "FILE")]
    pub signal: Option<PathBuf>,

    /// Output file (required)
    #[arg(long, short, value_name = "FILE")]
    pub out: PathBuf,

    /// Posterior sample paths per trace; omit for Viterbi decoding
    #[arg(long, value_name = "N")]
    pub samples: Option<usize>,

    /// Base PRNG seed for posterior sampling
    #[arg(long, default_value = "42")]
    pub seed: u64,

    // ============ Training Parameters ============
    /// Training reads: one JSON array of {move, kmer} objects per line
    #[arg(long = "train-reads", value_name = "FILE")]
    pub train_reads: Option<PathBuf>,

    /// Per-kmer Gaussian parameters: JSON array of {kmer, mu, sigma}
    #[arg(long, value_name = "FILE")]
    pub emissions: Option<PathBuf>,

    /// K-mer length of the trained model
    #[arg(short, default_value = "4")]
    pub k: usize,

    /// Largest move accepted in a training read
    #[arg(long = "move-threshold", default_value = "3")]
    pub move_threshold: usize,

    /// Pseudocount added to every transition count
    #[arg(long = "pseudo-count", default_value = "1")]
    pub pseudo_count: u64,
}

/// Run mode, decided by which inputs were given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Decode signal traces against a trained model
    Decode,
    /// Build a model document from annotated training reads
    Train,
}

impl Config {
    pub fn mode(&self) -> Mode {
        if self.train_reads.is_some() {
            Mode::Train
        } else {
            Mode::Decode
        }
    }

    /// Check cross-flag consistency before running.
    pub fn validate(&self) -> Result<()> {
        match self.mode() {
            Mode::Decode => {
                if self.model.is_none() {
                    return Err(PorepathError::config("--model is required for decoding"));
                }
                if self.signal.is_none() {
                    return Err(PorepathError::config("--signal is required for decoding"));
                }
                if self.samples == Some(0) {
                    return Err(PorepathError::config("--samples must be at least 1"));
                }
            }
            Mode::Train => {
                if self.emissions.is_none() {
                    return Err(PorepathError::config("--emissions is required for training"));
                }
                if self.k == 0 || self.k > 12 {
                    return Err(PorepathError::config(format!(
                        "k must be in [1, 12], got {}",
                        self.k
                    )));
                }
                if self.move_threshold == 0 {
                    return Err(PorepathError::config("--move-threshold must be at least 1"));
                }
            }
        }
        Ok(())
    }
}

//! # Move-Model Builder
//!
//! Estimates a k-mer HMM from basecaller-annotated training reads. The
//! emission array maps every k-mer to a Gaussian over signal level; the
//! transition table counts observed k-mer to k-mer steps, restricted to the
//! neighborhoods reachable within the move threshold, with pseudocount
//! smoothing so unseen transitions keep positive probability.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::data::kmer::{kmer_state_id, kmers_within, num_kmers, state_id_kmer};
use crate::error::{PorepathError, Result};
use crate::io::reads::ReadSource;
use crate::model::hmm::Transition;
use crate::model::logprob::LogProb;
use crate::model::state::State;

/// State id of the silent initial state in every move model.
pub const INITIAL_STATE: usize = 0;

/// Signal-level Gaussian fitted for one k-mer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianParamsKmer {
    pub kmer: String,
    pub mu: f64,
    pub sigma: f64,
}

/// Emission state array for a k-mer model: index 0 is the silent initial
/// state, and each k-mer's Gaussian sits at its state id.
///
/// # Errors
///
/// `InvalidInput` unless `kmer_gaussians` covers every k-mer of length `k`
/// exactly once with valid parameters.
pub fn construct_emissions(
    k: usize,
    kmer_gaussians: &[GaussianParamsKmer],
) -> Result<Vec<State>> {
    let n_kmers = num_kmers(k) as usize;
    if kmer_gaussians.len() != n_kmers {
        return Err(PorepathError::invalid_input(format!(
            "expected Gaussian parameters for {} kmers, got {}",
            n_kmers,
            kmer_gaussians.len()
        )));
    }

    let mut states: Vec<Option<State>> = vec![None; n_kmers + 1];
    states[INITIAL_STATE] = Some(State::Silent);
    for gaussian in kmer_gaussians {
        if gaussian.kmer.len() != k {
            return Err(PorepathError::invalid_input(format!(
                "kmer {:?} does not have length {}",
                gaussian.kmer, k
            )));
        }
        let id = kmer_state_id(&gaussian.kmer)?;
        if states[id].is_some() {
            return Err(PorepathError::invalid_input(format!(
                "duplicate Gaussian parameters for kmer {:?}",
                gaussian.kmer
            )));
        }
        states[id] = Some(State::gaussian(gaussian.mu, gaussian.sigma)?);
    }

    states
        .into_iter()
        .map(|state| {
            state.ok_or_else(|| PorepathError::invalid_input("kmer without Gaussian parameters"))
        })
        .collect()
}

/// Transition table for a k-mer model of `4^k + 1` states.
///
/// Counts every adjacent (prev, curr) pair of each read, then converts
/// counts into probabilities over the move neighborhood of each k-mer, so
/// every emitting state carries one transition per neighborhood member.
/// A state with zero total count (possible only without smoothing) gets a
/// uniform row. Destinations inside a row are ordered by ascending state id
/// so the derived inverse-transition index (and with it, sampling) is
/// reproducible.
///
/// # Errors
///
/// `InvalidInput` when a read contains a move longer than `move_threshold`
/// or a malformed k-mer.
pub fn construct_transitions(
    move_threshold: usize,
    pseudo_count: u64,
    k: usize,
    reads: &mut dyn ReadSource,
) -> Result<Vec<Vec<Transition>>> {
    let n_states = num_kmers(k) as usize + 1;

    let mut counts: HashMap<(usize, usize), u64> = HashMap::new();
    while let Some(read) = reads.next_read()? {
        let Some(first) = read.first() else {
            continue;
        };
        // the entry into the first kmer has no source state and is not counted
        let mut prev = kmer_state_id(&first.kmer)?;
        for record in &read[1..] {
            if record.mv > move_threshold {
                return Err(PorepathError::invalid_input(format!(
                    "found move longer than {move_threshold}"
                )));
            }
            let next = kmer_state_id(&record.kmer)?;
            *counts.entry((prev, next)).or_insert(0) += 1;
            prev = next;
        }
    }

    let mut transitions: Vec<Vec<Transition>> = vec![Vec::new(); n_states];
    for id in 1..n_states {
        let kmer = state_id_kmer(id, k);
        let neighborhood = kmers_within(&kmer, move_threshold)?;

        let mut with_counts = Vec::with_capacity(neighborhood.len());
        let mut total = 0u64;
        for next_kmer in &neighborhood {
            let next_id = kmer_state_id(next_kmer)?;
            let count = pseudo_count + counts.get(&(id, next_id)).copied().unwrap_or(0);
            with_counts.push((next_id, count));
            total += count;
        }
        for (next_id, count) in with_counts {
            // total can only be zero with pseudo_count 0 and a fully
            // unobserved neighborhood; the row is then uniform
            let prob = if total == 0 {
                1.0 / neighborhood.len() as f64
            } else {
                count as f64 / total as f64
            };
            transitions[id].push(Transition {
                to_state: next_id,
                prob: LogProb::new(prob)?,
            });
        }
    }

    let uniform = LogProb::new(1.0 / (n_states - 1) as f64)?;
    for id in 1..n_states {
        transitions[INITIAL_STATE].push(Transition {
            to_state: id,
            prob: uniform,
        });
    }

    Ok(transitions)
}

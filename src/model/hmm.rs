//! # Silent-State Hidden Markov Model
//!
//! Topology, validation, and the two inference passes: Viterbi decoding and
//! forward-filtering backward-sampling from the posterior over state paths.
//!
//! States are finalized in ascending id within each row of the dynamic
//! program. That single ordering works because of the topology rule enforced
//! at construction: a transition into a silent state must come from a
//! lower-id state, so a silent cell only reads already-finalized cells of
//! its own row, while emitting cells read the previous row.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{PorepathError, Result};
use crate::model::logprob::LogProb;
use crate::model::state::State;

/// A weighted edge to another state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transition {
    pub to_state: usize,
    pub prob: LogProb,
}

/// One cell of the Viterbi matrix: best probability of reaching the state,
/// plus the predecessor on that best path.
#[derive(Clone, Copy, Debug)]
struct ViterbiCell {
    prob: LogProb,
    prev: Option<usize>,
}

impl ViterbiCell {
    fn unreachable() -> Self {
        Self {
            prob: LogProb::zero(),
            prev: None,
        }
    }
}

/// Forward mass per (row, state, incoming-edge position). Weights are kept
/// in linear scale because the backward pass draws categorical samples from
/// them directly.
type ForwardMatrix = Vec<Vec<Vec<f64>>>;

/// Hidden Markov model with silent states and one silent initial state.
///
/// The model owns its topology only; emission states are borrowed for each
/// inference call, mirroring how per-read models share one transition table.
#[derive(Clone, Debug)]
pub struct Hmm {
    initial_state: usize,
    num_states: usize,
    transitions: Vec<Vec<Transition>>,
    inv_transitions: Vec<Vec<Transition>>,
}

impl Hmm {
    /// Build and validate a model.
    ///
    /// Checked here:
    /// 1) the initial state is silent,
    /// 2) no transition targets the initial state,
    /// 3) a transition into a silent state comes from a lower-id state.
    ///
    /// # Errors
    ///
    /// `InvalidTopology` if any check fails, `InvalidInput` if the states
    /// array does not match the transition table.
    pub fn new(
        initial_state: usize,
        transitions: Vec<Vec<Transition>>,
        states: &[State],
    ) -> Result<Self> {
        let num_states = transitions.len();
        if states.len() != num_states {
            return Err(PorepathError::invalid_input(format!(
                "states length {} does not match transition table length {}",
                states.len(),
                num_states
            )));
        }
        if initial_state >= num_states {
            return Err(PorepathError::invalid_topology(format!(
                "initial state {initial_state} out of range for {num_states} states"
            )));
        }
        if !states[initial_state].is_silent() {
            return Err(PorepathError::invalid_topology(format!(
                "initial state {initial_state} is not silent"
            )));
        }
        for (src, outgoing) in transitions.iter().enumerate() {
            for transition in outgoing {
                let dst = transition.to_state;
                if dst >= num_states {
                    return Err(PorepathError::invalid_topology(format!(
                        "transition {src} -> {dst} leaves the state range"
                    )));
                }
                if dst == initial_state {
                    return Err(PorepathError::invalid_topology(format!(
                        "transition {src} -> {dst} targets the initial state"
                    )));
                }
                if states[dst].is_silent() && src >= dst {
                    return Err(PorepathError::invalid_topology(format!(
                        "transition {src} -> {dst} enters a silent state from a higher id"
                    )));
                }
            }
        }

        let mut inv_transitions = vec![Vec::new(); num_states];
        for (src, outgoing) in transitions.iter().enumerate() {
            for transition in outgoing {
                inv_transitions[transition.to_state].push(Transition {
                    to_state: src,
                    prob: transition.prob,
                });
            }
        }

        Ok(Self {
            initial_state,
            num_states,
            transitions,
            inv_transitions,
        })
    }

    pub fn initial_state(&self) -> usize {
        self.initial_state
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    /// Outgoing transitions per state id.
    pub fn transitions(&self) -> &[Vec<Transition>] {
        &self.transitions
    }

    /// Most probable state path explaining `emissions`, silent states
    /// included, starting at the initial state.
    ///
    /// # Errors
    ///
    /// `NoViablePath` when no state is reachable with positive probability
    /// after consuming every emission.
    pub fn viterbi(&self, emissions: &[f64], states: &[State]) -> Result<Vec<usize>> {
        self.check_states(states)?;
        let matrix = self.viterbi_matrix(emissions, states);
        let last_row = emissions.len();

        let mut best_state = None;
        let mut best_prob = LogProb::zero();
        for (s, cell) in matrix[last_row].iter().enumerate() {
            if cell.prob > best_prob {
                best_prob = cell.prob;
                best_state = Some(s);
            }
        }
        let Some(last_state) = best_state else {
            return Err(PorepathError::NoViablePath);
        };

        self.backtrack(last_state, last_row, states, |row, state| {
            matrix[row][state].prev.ok_or(PorepathError::NoViablePath)
        })
    }

    /// Draw `n_samples` independent paths from P(path | emissions) with a
    /// PRNG seeded from `seed`. Each returned path runs from the initial
    /// state forward and includes every visited state.
    ///
    /// # Errors
    ///
    /// `Underflow` when the linear-scale forward weights collapse to zero.
    pub fn posterior_sample(
        &self,
        n_samples: usize,
        seed: u64,
        emissions: &[f64],
        states: &[State],
    ) -> Result<Vec<Vec<usize>>> {
        self.check_states(states)?;
        let forward = self.forward_matrix(emissions, states)?;
        let last_row = emissions.len();

        let terminal_weights: Vec<f64> = forward[last_row]
            .iter()
            .map(|weights| weights.iter().sum())
            .collect();
        let terminal = WeightedIndex::new(&terminal_weights)
            .map_err(|_| PorepathError::Underflow { row: last_row })?;

        let mut rng = StdRng::seed_from_u64(seed);
        // One categorical distribution per visited cell, built on first use
        // and reused across samples.
        let mut edge_dists: Vec<Vec<Option<WeightedIndex<f64>>>> = (0..=last_row)
            .map(|_| (0..self.num_states).map(|_| None).collect())
            .collect();

        let mut samples = Vec::with_capacity(n_samples);
        for _ in 0..n_samples {
            let last_state = terminal.sample(&mut rng);
            let path = self.backtrack(last_state, last_row, states, |row, state| {
                let slot = &mut edge_dists[row][state];
                if slot.is_none() {
                    *slot = Some(
                        WeightedIndex::new(forward[row][state].iter().copied())
                            .map_err(|_| PorepathError::Underflow { row })?,
                    );
                }
                let Some(dist) = slot else {
                    return Err(PorepathError::Underflow { row });
                };
                Ok(self.inv_transitions[state][dist.sample(&mut rng)].to_state)
            })?;
            samples.push(path);
        }
        Ok(samples)
    }

    /// Viterbi matrix over rows 0..=N. Row index counts emissions consumed,
    /// not transitions taken: silent states are entered without advancing
    /// the row.
    fn viterbi_matrix(&self, emissions: &[f64], states: &[State]) -> Vec<Vec<ViterbiCell>> {
        let n = emissions.len();
        let mut matrix: Vec<Vec<ViterbiCell>> = Vec::with_capacity(n + 1);
        for i in 0..=n {
            let mut row = vec![ViterbiCell::unreachable(); self.num_states];
            if i == 0 {
                row[self.initial_state] = ViterbiCell {
                    prob: LogProb::one(),
                    prev: None,
                };
            }
            for s in 0..self.num_states {
                if i == 0 && s == self.initial_state {
                    continue;
                }
                let mut best = ViterbiCell::unreachable();
                if states[s].is_silent() {
                    // sources have lower ids, already final in this row
                    for t in &self.inv_transitions[s] {
                        let cand = row[t.to_state].prob * t.prob;
                        if cand > best.prob {
                            best = ViterbiCell {
                                prob: cand,
                                prev: Some(t.to_state),
                            };
                        }
                    }
                } else if i >= 1 {
                    for t in &self.inv_transitions[s] {
                        let cand = matrix[i - 1][t.to_state].prob * t.prob;
                        if cand > best.prob {
                            best = ViterbiCell {
                                prob: cand,
                                prev: Some(t.to_state),
                            };
                        }
                    }
                    if best.prev.is_some() {
                        best.prob = best.prob * states[s].prob(emissions[i - 1]);
                        if best.prob.is_zero() {
                            best = ViterbiCell::unreachable();
                        }
                    }
                }
                row[s] = best;
            }
            matrix.push(row);
        }
        matrix
    }

    /// Forward mass per incoming edge: cell (i, s, k) sums the probability
    /// of every path that emits the first i observations and ends by taking
    /// edge k of `inv_transitions[s]` into s. Keeping the edge dimension is
    /// what lets the backward pass sample a predecessor proportionally to
    /// forward mass without renormalizing.
    fn forward_matrix(&self, emissions: &[f64], states: &[State]) -> Result<ForwardMatrix> {
        let n = emissions.len();
        let mut matrix: ForwardMatrix = Vec::with_capacity(n + 1);
        for i in 0..=n {
            let mut row: Vec<Vec<f64>> = (0..self.num_states)
                .map(|s| vec![0.0; self.inv_transitions[s].len()])
                .collect();
            if i == 0 {
                // single virtual edge carrying the start mass; the initial
                // state has no real incoming edges
                row[self.initial_state] = vec![1.0];
            }
            for s in 0..self.num_states {
                if i == 0 && s == self.initial_state {
                    continue;
                }
                let weights: Vec<f64> = if states[s].is_silent() {
                    self.inv_transitions[s]
                        .iter()
                        .map(|t| t.prob.value() * row[t.to_state].iter().sum::<f64>())
                        .collect()
                } else if i >= 1 {
                    let emit = states[s].prob(emissions[i - 1]).value();
                    self.inv_transitions[s]
                        .iter()
                        .map(|t| {
                            emit * t.prob.value() * matrix[i - 1][t.to_state].iter().sum::<f64>()
                        })
                        .collect()
                } else {
                    continue;
                };
                row[s] = weights;
            }
            if i >= 1 && row.iter().all(|ws| ws.iter().all(|&w| w == 0.0)) {
                return Err(PorepathError::Underflow { row: i });
            }
            matrix.push(row);
        }
        Ok(matrix)
    }

    /// Walk predecessors from `last_state` back to the initial state at row
    /// 0 and return the forward-ordered path. Emitting states move up a
    /// row, silent states stay in theirs, so silent chains are walked until
    /// an emitting state (or the initial state) terminates them.
    fn backtrack<F>(
        &self,
        last_state: usize,
        emissions_len: usize,
        states: &[State],
        mut prev_of: F,
    ) -> Result<Vec<usize>>
    where
        F: FnMut(usize, usize) -> Result<usize>,
    {
        let mut path = vec![last_state];
        let mut row = emissions_len;
        let mut state = last_state;
        while !(row == 0 && state == self.initial_state) {
            let prev = prev_of(row, state)?;
            if !states[state].is_silent() {
                row -= 1;
            }
            state = prev;
            path.push(state);
        }
        path.reverse();
        Ok(path)
    }

    fn check_states(&self, states: &[State]) -> Result<()> {
        if states.len() != self.num_states {
            return Err(PorepathError::invalid_input(format!(
                "states length {} does not match model with {} states",
                states.len(),
                self.num_states
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(to_state: usize, prob: f64) -> Transition {
        Transition {
            to_state,
            prob: LogProb::new(prob).unwrap(),
        }
    }

    fn pdf(x: f64, mu: f64, sigma: f64) -> f64 {
        (-0.5 * ((x - mu) / sigma).powi(2)).exp() / (sigma * (2.0 * std::f64::consts::PI).sqrt())
    }

    /// 0 silent initial, 1 and 2 Gaussian, full emitting cross-connections.
    fn two_emitting_model() -> (Hmm, Vec<State>) {
        let states = vec![
            State::Silent,
            State::gaussian(0.0, 1.0).unwrap(),
            State::gaussian(1.0, 1.0).unwrap(),
        ];
        let transitions = vec![
            vec![t(1, 0.7), t(2, 0.3)],
            vec![t(1, 0.4), t(2, 0.6)],
            vec![t(1, 0.5), t(2, 0.5)],
        ];
        let hmm = Hmm::new(0, transitions, &states).unwrap();
        (hmm, states)
    }

    /// Single corridor through a silent state: 0 -> 1 (silent) -> 2 -> 3.
    fn corridor_model() -> (Hmm, Vec<State>) {
        let states = vec![
            State::Silent,
            State::Silent,
            State::gaussian(0.5, 0.1).unwrap(),
            State::gaussian(1.0, 0.2).unwrap(),
        ];
        let transitions = vec![vec![t(1, 1.0)], vec![t(2, 1.0)], vec![t(3, 1.0)], vec![]];
        let hmm = Hmm::new(0, transitions, &states).unwrap();
        (hmm, states)
    }

    #[test]
    fn rejects_emitting_initial_state() {
        let states = vec![State::gaussian(0.0, 1.0).unwrap(), State::Silent];
        let err = Hmm::new(0, vec![vec![t(1, 1.0)], vec![]], &states).unwrap_err();
        assert!(matches!(err, PorepathError::InvalidTopology { .. }));
    }

    #[test]
    fn rejects_transition_into_initial_state() {
        let states = vec![State::Silent, State::gaussian(0.0, 1.0).unwrap()];
        let err = Hmm::new(0, vec![vec![t(1, 1.0)], vec![t(0, 1.0)]], &states).unwrap_err();
        assert!(matches!(err, PorepathError::InvalidTopology { .. }));
    }

    #[test]
    fn rejects_silent_target_from_equal_or_higher_id() {
        let states = vec![
            State::Silent,
            State::Silent,
            State::gaussian(0.0, 1.0).unwrap(),
        ];
        // 2 -> 1 enters a silent state from above
        let err = Hmm::new(
            0,
            vec![vec![t(1, 1.0)], vec![t(2, 1.0)], vec![t(1, 1.0)]],
            &states,
        )
        .unwrap_err();
        assert!(matches!(err, PorepathError::InvalidTopology { .. }));

        // silent self-loop
        let states = vec![State::Silent, State::Silent];
        let err = Hmm::new(0, vec![vec![t(1, 1.0)], vec![t(1, 0.5)]], &states).unwrap_err();
        assert!(matches!(err, PorepathError::InvalidTopology { .. }));
    }

    #[test]
    fn rejects_mismatched_states_array() {
        let states = vec![State::Silent];
        let err = Hmm::new(0, vec![vec![], vec![]], &states).unwrap_err();
        assert!(matches!(err, PorepathError::InvalidInput { .. }));
    }

    #[test]
    fn inverse_transitions_mirror_forward_table() {
        let (hmm, _) = two_emitting_model();
        for (src, outgoing) in hmm.transitions.iter().enumerate() {
            for edge in outgoing {
                let mirrored = Transition {
                    to_state: src,
                    prob: edge.prob,
                };
                assert!(hmm.inv_transitions[edge.to_state].contains(&mirrored));
            }
        }
        let total_fwd: usize = hmm.transitions.iter().map(Vec::len).sum();
        let total_inv: usize = hmm.inv_transitions.iter().map(Vec::len).sum();
        assert_eq!(total_fwd, total_inv);
        // discovery order scans sources in ascending order
        let sources: Vec<usize> = hmm.inv_transitions[1].iter().map(|t| t.to_state).collect();
        assert_eq!(sources, vec![0, 1, 2]);
    }

    #[test]
    fn viterbi_walks_the_corridor() {
        let (hmm, states) = corridor_model();
        let path = hmm.viterbi(&[0.5, 1.0], &states).unwrap();
        assert_eq!(path, vec![0, 1, 2, 3]);
    }

    #[test]
    fn viterbi_matrix_probabilities_track_the_corridor() {
        let (hmm, states) = corridor_model();
        let matrix = hmm.viterbi_matrix(&[0.5, 1.0], &states);
        // row 0: the silent chain is reachable before any emission
        assert_eq!(matrix[0][0].prob, LogProb::one());
        assert_eq!(matrix[0][1].prob, LogProb::one());
        assert!(matrix[0][2].prob.is_zero());
        // row 1: only state 2 has consumed the first emission
        let expected = pdf(0.5, 0.5, 0.1);
        assert!((matrix[1][2].prob.value() - expected).abs() < 1e-12);
        assert!(matrix[1][3].prob.is_zero());
        // row 2: the corridor ends in state 3
        let expected = pdf(0.5, 0.5, 0.1) * pdf(1.0, 1.0, 0.2);
        assert!((matrix[2][3].prob.value() - expected).abs() < 1e-12);
    }

    #[test]
    fn viterbi_prefers_the_likelier_branch() {
        let (hmm, states) = two_emitting_model();
        // both observations sit at state 1's mean
        let path = hmm.viterbi(&[0.0, 0.0], &states).unwrap();
        assert_eq!(path, vec![0, 1, 1]);
        // at state 2's mean the strong 0 -> 1 prior still routes through 1
        let path = hmm.viterbi(&[1.0, 1.0], &states).unwrap();
        assert_eq!(path, vec![0, 1, 2]);
    }

    #[test]
    fn viterbi_breaks_ties_toward_the_smallest_predecessor() {
        // two identical middle states feeding one sink
        let states = vec![
            State::Silent,
            State::gaussian(0.0, 1.0).unwrap(),
            State::gaussian(0.0, 1.0).unwrap(),
            State::gaussian(0.0, 1.0).unwrap(),
        ];
        let transitions = vec![
            vec![t(1, 0.5), t(2, 0.5)],
            vec![t(3, 0.5)],
            vec![t(3, 0.5)],
            vec![],
        ];
        let hmm = Hmm::new(0, transitions, &states).unwrap();
        let path = hmm.viterbi(&[0.0, 0.0], &states).unwrap();
        assert_eq!(path, vec![0, 1, 3]);
    }

    #[test]
    fn viterbi_reports_unreachable_emissions() {
        // initial state with no outgoing transitions
        let states = vec![State::Silent, State::gaussian(0.0, 1.0).unwrap()];
        let hmm = Hmm::new(0, vec![vec![], vec![t(1, 1.0)]], &states).unwrap();
        let err = hmm.viterbi(&[0.0], &states).unwrap_err();
        assert!(matches!(err, PorepathError::NoViablePath));
    }

    #[test]
    fn viterbi_on_empty_emissions_stays_at_the_initial_state() {
        let (hmm, states) = two_emitting_model();
        let path = hmm.viterbi(&[], &states).unwrap();
        assert_eq!(path, vec![0]);
    }

    #[test]
    fn forward_matrix_matches_hand_computation() {
        let (hmm, states) = two_emitting_model();
        let obs = 0.2;
        let forward = hmm.forward_matrix(&[obs], &states).unwrap();

        // row 0: virtual start mass only
        assert_eq!(forward[0][hmm.initial_state()], vec![1.0]);
        assert_eq!(forward[0][1], vec![0.0; 3]);
        assert_eq!(forward[0][2], vec![0.0; 3]);

        // row 1: each incoming edge carries emit * edge * source mass
        let e1 = pdf(obs, 0.0, 1.0);
        let e2 = pdf(obs, 1.0, 1.0);
        let expect_1 = [e1 * 0.7 * 1.0, e1 * 0.4 * 0.0, e1 * 0.5 * 0.0];
        let expect_2 = [e2 * 0.3 * 1.0, e2 * 0.6 * 0.0, e2 * 0.5 * 0.0];
        for (got, want) in forward[1][1].iter().zip(expect_1) {
            assert!((got - want).abs() < 1e-12);
        }
        for (got, want) in forward[1][2].iter().zip(expect_2) {
            assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    fn forward_matrix_fills_silent_rows_in_place() {
        let (hmm, states) = corridor_model();
        let forward = hmm.forward_matrix(&[0.5], &states).unwrap();
        // silent state 1 picks up the start mass in row 0
        assert_eq!(forward[0][1], vec![1.0]);
        let expected = pdf(0.5, 0.5, 0.1);
        assert!((forward[1][2][0] - expected).abs() < 1e-12);
    }

    #[test]
    fn forward_reports_underflow_for_unreachable_emissions() {
        let states = vec![State::Silent, State::gaussian(0.0, 1.0).unwrap()];
        let hmm = Hmm::new(0, vec![vec![], vec![t(1, 1.0)]], &states).unwrap();
        let err = hmm.forward_matrix(&[0.0], &states).unwrap_err();
        assert!(matches!(err, PorepathError::Underflow { row: 1 }));
    }

    #[test]
    fn sampling_a_single_corridor_always_returns_the_same_path() {
        let (hmm, states) = corridor_model();
        let samples = hmm.posterior_sample(20, 7, &[0.5, 1.0], &states).unwrap();
        assert_eq!(samples.len(), 20);
        for path in samples {
            assert_eq!(path, vec![0, 1, 2, 3]);
        }
    }

    #[test]
    fn sampling_is_deterministic_per_seed() {
        let (hmm, states) = two_emitting_model();
        let emissions = [0.3, 0.8, -0.2];
        let a = hmm.posterior_sample(50, 1234, &emissions, &states).unwrap();
        let b = hmm.posterior_sample(50, 1234, &emissions, &states).unwrap();
        assert_eq!(a, b);
        let c = hmm.posterior_sample(50, 4321, &emissions, &states).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn sampled_paths_are_well_formed() {
        let (hmm, states) = two_emitting_model();
        let emissions = [0.3, 0.8];
        let samples = hmm.posterior_sample(100, 99, &emissions, &states).unwrap();
        for path in &samples {
            assert_eq!(path[0], hmm.initial_state());
            let emitted = path.iter().filter(|&&s| !states[s].is_silent()).count();
            assert_eq!(emitted, emissions.len());
        }
    }
}

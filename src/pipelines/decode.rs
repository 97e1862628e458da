//! # Decode Pipeline
//!
//! Load a trained model, read signal traces, and decode each trace either
//! to its Viterbi path or to a set of posterior sample paths. Traces are
//! independent, so they are decoded in parallel; a failed trace is reported
//! in its output record instead of aborting the batch.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, instrument};

use crate::config::Config;
use crate::error::{PorepathError, Result};
use crate::io::model_doc;

/// Output record for one trace, written as one JSON line.
#[derive(Debug, Serialize)]
struct TraceRecord {
    trace: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<Vec<usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    samples: Option<Vec<Vec<usize>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub struct DecodePipeline {
    config: Config,
}

impl DecodePipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    #[instrument(name = "decode", skip(self))]
    pub fn run(&self) -> Result<()> {
        let model_path = self
            .config
            .model
            .as_ref()
            .ok_or_else(|| PorepathError::config("--model is required for decoding"))?;
        let signal_path = self
            .config
            .signal
            .as_ref()
            .ok_or_else(|| PorepathError::config("--signal is required for decoding"))?;

        let (hmm, states) = model_doc::read_model(model_path)?;
        let traces = read_signal(signal_path)?;
        info!(
            traces = traces.len(),
            states = hmm.num_states(),
            samples = ?self.config.samples,
            "decoding"
        );

        let records: Vec<TraceRecord> = traces
            .par_iter()
            .enumerate()
            .map(|(trace, emissions)| match self.config.samples {
                None => match hmm.viterbi(emissions, &states) {
                    Ok(path) => TraceRecord {
                        trace,
                        path: Some(path),
                        samples: None,
                        error: None,
                    },
                    Err(err) => TraceRecord {
                        trace,
                        path: None,
                        samples: None,
                        error: Some(err.to_string()),
                    },
                },
                Some(n_samples) => {
                    let seed = self.config.seed.wrapping_add(trace as u64);
                    match hmm.posterior_sample(n_samples, seed, emissions, &states) {
                        Ok(samples) => TraceRecord {
                            trace,
                            path: None,
                            samples: Some(samples),
                            error: None,
                        },
                        Err(err) => TraceRecord {
                            trace,
                            path: None,
                            samples: None,
                            error: Some(err.to_string()),
                        },
                    }
                }
            })
            .collect();

        let failed = records.iter().filter(|r| r.error.is_some()).count();
        if failed > 0 {
            info!(failed, "some traces could not be decoded");
        }

        let mut writer = BufWriter::new(File::create(&self.config.out)?);
        for record in &records {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Parse a signal file: one trace per line, whitespace-separated levels.
fn read_signal(path: &Path) -> Result<Vec<Vec<f64>>> {
    let reader = BufReader::new(File::open(path)?);
    let mut traces = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let trace = line
            .split_whitespace()
            .map(|token| {
                token.parse::<f64>().map_err(|err| {
                    PorepathError::invalid_input(format!(
                        "signal line {}: {err}",
                        line_no + 1
                    ))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        traces.push(trace);
    }
    Ok(traces)
}

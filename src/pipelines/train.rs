//! # Train Pipeline
//!
//! Build a model document from annotated training reads plus a per-kmer
//! emission table, and write it to disk ready for decoding.

use std::fs::File;
use std::io::BufReader;

use tracing::{info, instrument};

use crate::config::Config;
use crate::error::{PorepathError, Result};
use crate::io::model_doc;
use crate::io::reads::JsonlReads;
use crate::model::hmm::Hmm;
use crate::model::move_model::{
    construct_emissions, construct_transitions, GaussianParamsKmer, INITIAL_STATE,
};

pub struct TrainPipeline {
    config: Config,
}

impl TrainPipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    #[instrument(name = "train", skip(self))]
    pub fn run(&self) -> Result<()> {
        let emissions_path = self
            .config
            .emissions
            .as_ref()
            .ok_or_else(|| PorepathError::config("--emissions is required for training"))?;
        let reads_path = self
            .config
            .train_reads
            .as_ref()
            .ok_or_else(|| PorepathError::config("--train-reads is required for training"))?;

        let gaussians: Vec<GaussianParamsKmer> =
            serde_json::from_reader(BufReader::new(File::open(emissions_path)?))?;
        let states = construct_emissions(self.config.k, &gaussians)?;

        let mut reads = JsonlReads::open(reads_path)?;
        let transitions = construct_transitions(
            self.config.move_threshold,
            self.config.pseudo_count,
            self.config.k,
            &mut reads,
        )?;

        let hmm = Hmm::new(INITIAL_STATE, transitions, &states)?;
        info!(
            k = self.config.k,
            states = hmm.num_states(),
            "trained move model"
        );

        model_doc::write_model(&self.config.out, &hmm, &states)
    }
}

//! # Data Module
//!
//! Domain primitives shared by the model and io layers: the DNA k-mer codec,
//! the dense state-id mapping, and move-distance neighborhoods.

pub mod kmer;

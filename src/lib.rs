pub mod annotation;
pub mod apollo;
pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod fasta;
pub mod gff;
pub mod output;
pub mod peptide;
pub mod reconcile;
pub mod store;

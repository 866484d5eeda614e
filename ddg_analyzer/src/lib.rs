//! Protein stability (ddG) variant analysis.
//!
//! Classifies query variants (e.g. COSMIC) against per-protein null
//! distributions estimated from a reference population (e.g. gnomAD), and
//! summarises amino-acid class transitions as count and row-percent matrices.

pub mod analysis;
pub mod config;
pub mod data_handling;
pub mod error;
pub mod helper_functions;
pub mod models;
pub mod pipeline;

pub use error::{PipelineError, Result};

use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Structural failures that abort a pipeline.
///
/// Row-level data quality problems (unparseable scores, unknown residue codes)
/// are not errors: those rows are dropped and counted by the component that
/// sees them.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Input dataset not found: {}", .path.display())]
    MissingInput { path: PathBuf },

    #[error("Required column '{column}' is missing and cannot be derived")]
    Schema { column: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to render {path}: {message}")]
    Render { path: String, message: String },

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn schema(column: impl Into<String>) -> Self {
        PipelineError::Schema {
            column: column.into(),
        }
    }

    /// Wraps a drawing backend failure for the image at `path`.
    pub fn render(path: &str, err: impl std::fmt::Display) -> Self {
        PipelineError::Render {
            path: path.to_string(),
            message: err.to_string(),
        }
    }
}

use std::path::PathBuf;
use thiserror::Error;

/// Stage-level failures. Every variant is fatal to the run: nothing is
/// retried, and the orchestrator reports the error and exits non-zero.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The named source does not resolve to a readable file.
    #[error("source `{name}` not found at {}", path.display())]
    SourceNotFound {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source exists but its tabular structure cannot be parsed
    /// (ragged rows, undecodable bytes, empty file).
    #[error("source `{name}` is malformed: {reason}")]
    MalformedSource { name: String, reason: String },

    /// A column the pipeline was told to use does not exist in the table.
    #[error("table `{table}` has no column `{column}`")]
    MissingColumn { table: String, column: String },

    /// The right-hand table of a many-to-one join has a duplicate key,
    /// so the join would fan rows out instead of looking them up.
    #[error("join on `{key}` would fan out: table `{table}` has duplicate key `{value}`")]
    JoinCardinalityViolation {
        table: String,
        key: String,
        value: String,
    },

    /// Writing the consolidated artifact failed. The previous artifact at
    /// that path may be truncated; this is a batch job with no recovery.
    #[error("failed to write `{}`: {reason}", path.display())]
    WriteFailure { path: PathBuf, reason: String },

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

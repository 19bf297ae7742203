// ⚠️ Pipeline Errors - Fatal conditions that end a run
// Row-level gaps are never errors: they are skipped and logged where they occur.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A required input file does not exist
    #[error("source file not found: {}", .0.display())]
    MissingSource(PathBuf),

    /// The workbook could not be opened or has no readable sheet
    #[error("cannot read workbook {}: {message}", .path.display())]
    Workbook { path: PathBuf, message: String },

    #[error("cannot read CSV {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Sheet has no header row
    #[error("sheet {} has no header row", .0.display())]
    EmptySheet(PathBuf),

    #[error("invalid config {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

use std::fs::File;
use std::path::Path;

use arrow::record_batch::RecordBatch;
use parquet::{
    arrow::ArrowWriter,
    basic::{BrotliLevel, Compression},
    file::properties::WriterProperties,
};
use tracing::info;

use crate::error::{PipelineError, Result};

/// Write the consolidated table, overwriting whatever is at `path`.
///
/// The extension picks the format: `.parquet` gets a compressed parquet
/// file, anything else a UTF-8 CSV with a header row. Any I/O error is a
/// `WriteFailure`; there is no partial-write recovery, so the previous
/// artifact may be truncated after a failure.
pub fn write_consolidated(batch: &RecordBatch, path: &Path) -> Result<()> {
    let is_parquet = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("parquet"));

    let file = File::create(path).map_err(|e| write_failure(path, e))?;

    if is_parquet {
        write_parquet(batch, file, path)?;
    } else {
        write_csv(batch, file, path)?;
    }

    info!(
        path = %path.display(),
        rows = batch.num_rows(),
        cols = batch.num_columns(),
        "consolidated table written"
    );
    Ok(())
}

fn write_csv(batch: &RecordBatch, file: File, path: &Path) -> Result<()> {
    let mut writer = arrow::csv::WriterBuilder::new()
        .with_header(true)
        .build(file);
    writer
        .write(batch)
        .map_err(|e| write_failure(path, e))
}

fn write_parquet(batch: &RecordBatch, file: File, path: &Path) -> Result<()> {
    let level = BrotliLevel::try_new(5).map_err(|e| write_failure(path, e))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::BROTLI(level))
        .build();

    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), Some(props)).map_err(|e| write_failure(path, e))?;
    writer.write(batch).map_err(|e| write_failure(path, e))?;
    writer.close().map_err(|e| write_failure(path, e))?;
    Ok(())
}

fn write_failure(path: &Path, e: impl std::fmt::Display) -> PipelineError {
    PipelineError::WriteFailure {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

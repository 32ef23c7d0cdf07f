pub mod convert;

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::{
    array::{ArrayRef, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use csv::ReaderBuilder;
use tracing::info;

use crate::config::{self, PipelineConfig};
use crate::error::{PipelineError, Result};

/// A source table exactly as the file claims it: header names plus every
/// row as strings. Typing happens afterwards in `convert`.
#[derive(Debug)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// The five input tables of one pipeline run.
#[derive(Debug)]
pub struct Sources {
    pub customers: RecordBatch,
    pub products: RecordBatch,
    pub categories: RecordBatch,
    pub sales_2025: RecordBatch,
    pub sales_2026: RecordBatch,
}

/// Read one delimited UTF-8 source into a typed `RecordBatch`.
///
/// Columns named in `date_columns` are parsed as `Date32`; the rest are
/// inferred (numeric, boolean, otherwise text). Row order and field names
/// are preserved. A single read attempt, no retries.
pub fn load_csv(dir: &Path, name: &str, date_columns: &[&str]) -> Result<RecordBatch> {
    let raw = read_raw(dir, name)?;
    let batch = raw_to_utf8_batch(&raw)?;
    convert::convert_column_types(&batch, name, date_columns)
}

/// Load all five sources from the configured data directory.
pub fn load_sources(config: &PipelineConfig) -> Result<Sources> {
    let dir = config.data_dir.as_path();

    let customers = load_csv(dir, config::CUSTOMERS_FILE, &["fecha_registro"])?;
    let products = load_csv(dir, config::PRODUCTS_FILE, &[])?;
    let categories = load_csv(dir, config::CATEGORIES_FILE, &[])?;
    let sales_2025 = load_csv(dir, config::SALES_2025_FILE, &["fecha_venta"])?;
    let sales_2026 = load_csv(dir, config::SALES_2026_FILE, &["fecha_venta"])?;

    for (name, batch) in [
        (config::CUSTOMERS_FILE, &customers),
        (config::PRODUCTS_FILE, &products),
        (config::CATEGORIES_FILE, &categories),
        (config::SALES_2025_FILE, &sales_2025),
        (config::SALES_2026_FILE, &sales_2026),
    ] {
        info!(
            source = name,
            rows = batch.num_rows(),
            cols = batch.num_columns(),
            "loaded source"
        );
    }

    Ok(Sources {
        customers,
        products,
        categories,
        sales_2025,
        sales_2026,
    })
}

fn read_raw(dir: &Path, name: &str) -> Result<RawTable> {
    let path = dir.join(name);
    let file = File::open(&path).map_err(|source| PipelineError::SourceNotFound {
        name: name.to_string(),
        path: path.clone(),
        source,
    })?;

    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(file);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| malformed(name, e))?
        .iter()
        .map(|s| s.to_string())
        .collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(PipelineError::MalformedSource {
            name: name.to_string(),
            reason: "no header row".into(),
        });
    }

    let mut rows = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| PipelineError::MalformedSource {
            name: name.to_string(),
            reason: format!("record {}: {}", idx, e),
        })?;
        rows.push(record.iter().map(|s| s.to_string()).collect());
    }

    Ok(RawTable { headers, rows })
}

fn malformed(name: &str, e: csv::Error) -> PipelineError {
    PipelineError::MalformedSource {
        name: name.to_string(),
        reason: e.to_string(),
    }
}

/// Build an all-Utf8 batch from a raw table. Empty cells become nulls
/// (the sources are pandas `to_csv` output, where NaN is written as "").
fn raw_to_utf8_batch(raw: &RawTable) -> Result<RecordBatch> {
    let fields: Vec<Field> = raw
        .headers
        .iter()
        .map(|h| Field::new(h, DataType::Utf8, true))
        .collect();

    let columns: Vec<ArrayRef> = (0..raw.headers.len())
        .map(|col| {
            let values: Vec<Option<&str>> = raw
                .rows
                .iter()
                .map(|row| match row.get(col).map(String::as_str) {
                    Some("") | None => None,
                    Some(v) => Some(v),
                })
                .collect();
            Arc::new(StringArray::from(values)) as ArrayRef
        })
        .collect();

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).map_err(Into::into)
}

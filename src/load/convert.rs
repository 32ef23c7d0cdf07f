use std::sync::Arc;

use arrow::{
    array::{Array, ArrayRef, BooleanBuilder, Date32Builder, Float64Builder, StringArray},
    datatypes::{DataType, Date32Type, Field, Schema},
    record_batch::RecordBatch,
};
use chrono::NaiveDate;

use crate::error::{PipelineError, Result};

/// Convert the all-Utf8 batch a source parses into one with semantic types.
///
/// Rules, per column:
/// - named in `date_columns` → Date32 (invalid values become null)
/// - every non-null value parses as f64 → Float64
/// - every non-null value is True/False (any case) → Boolean
/// - anything else stays Utf8
pub fn convert_column_types(
    batch: &RecordBatch,
    table: &str,
    date_columns: &[&str],
) -> Result<RecordBatch> {
    for wanted in date_columns {
        if batch.schema().column_with_name(wanted).is_none() {
            return Err(PipelineError::MissingColumn {
                table: table.to_string(),
                column: wanted.to_string(),
            });
        }
    }

    let mut fields = Vec::with_capacity(batch.num_columns());
    let mut columns = Vec::with_capacity(batch.num_columns());

    for (arr, field) in batch.columns().iter().zip(batch.schema().fields()) {
        let sarr = match arr.as_any().downcast_ref::<StringArray>() {
            Some(s) => s,
            None => {
                fields.push(field.as_ref().clone());
                columns.push(arr.clone());
                continue;
            }
        };

        if date_columns.contains(&field.name().as_str()) {
            columns.push(to_date32(sarr));
            fields.push(Field::new(field.name(), DataType::Date32, true));
        } else if is_numeric(sarr) {
            columns.push(to_float64(sarr));
            fields.push(Field::new(field.name(), DataType::Float64, true));
        } else if is_boolean(sarr) {
            columns.push(to_boolean(sarr));
            fields.push(Field::new(field.name(), DataType::Boolean, true));
        } else {
            columns.push(arr.clone());
            fields.push(Field::new(field.name(), DataType::Utf8, true));
        }
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).map_err(Into::into)
}

/// Parse `YYYY-MM-DD`, tolerating a trailing time component.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let date_part = s.get(0..10).unwrap_or(s);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

fn is_numeric(sarr: &StringArray) -> bool {
    let mut any = false;
    for v in sarr.iter().flatten() {
        if v.trim().parse::<f64>().is_err() {
            return false;
        }
        any = true;
    }
    any
}

fn is_boolean(sarr: &StringArray) -> bool {
    let mut any = false;
    for v in sarr.iter().flatten() {
        if !matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "false") {
            return false;
        }
        any = true;
    }
    any
}

fn to_date32(sarr: &StringArray) -> ArrayRef {
    let mut b = Date32Builder::with_capacity(sarr.len());
    for v in sarr.iter() {
        b.append_option(
            v.and_then(parse_date)
                .map(Date32Type::from_naive_date),
        );
    }
    Arc::new(b.finish())
}

fn to_float64(sarr: &StringArray) -> ArrayRef {
    let mut b = Float64Builder::with_capacity(sarr.len());
    for v in sarr.iter() {
        b.append_option(v.and_then(|s| s.trim().parse().ok()));
    }
    Arc::new(b.finish())
}

fn to_boolean(sarr: &StringArray) -> ArrayRef {
    let mut b = BooleanBuilder::with_capacity(sarr.len());
    for v in sarr.iter() {
        b.append_option(v.map(|s| s.trim().eq_ignore_ascii_case("true")));
    }
    Arc::new(b.finish())
}

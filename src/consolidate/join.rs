use std::collections::HashMap;
use std::sync::Arc;

use arrow::{
    array::{ArrayRef, StringArray, UInt32Array, UInt32Builder},
    compute::{cast, take},
    datatypes::{DataType, Schema},
    record_batch::RecordBatch,
};
use tracing::debug;

use super::columns::rename_columns;
use crate::error::{PipelineError, Result};

/// One declared join step: which table we are pulling in, on which key,
/// and which of its columns must be renamed before they land next to the
/// left table's columns.
pub struct JoinSpec<'a> {
    pub table: &'a str,
    pub key: &'a str,
    pub renames: &'a [(&'a str, &'a str)],
}

#[derive(Debug)]
pub struct JoinOutcome {
    pub batch: RecordBatch,
    /// Left rows whose key found no right row (null keys included).
    pub unmatched: usize,
}

/// Left join with explicit many-to-one validation.
///
/// The hash index over the right table is where cardinality is asserted: a
/// duplicate right key fails with `JoinCardinalityViolation` before any row
/// could fan out. Every left row survives; unmatched rows get nulls in all
/// right-side fields. The right key column is not duplicated into the output.
pub fn left_join(left: &RecordBatch, right: &RecordBatch, spec: &JoinSpec) -> Result<JoinOutcome> {
    let right = rename_columns(right, spec.renames)?;

    let left_keys = key_strings(left, spec.key, "ventas")?;
    let right_keys = key_strings(&right, spec.key, spec.table)?;

    // m:1 validation happens here, not in any library default.
    let mut index: HashMap<String, u32> = HashMap::with_capacity(right_keys.len());
    for (row, key) in right_keys.into_iter().enumerate() {
        let Some(key) = key else { continue };
        if index.insert(key.clone(), row as u32).is_some() {
            return Err(PipelineError::JoinCardinalityViolation {
                table: spec.table.to_string(),
                key: spec.key.to_string(),
                value: key,
            });
        }
    }

    let mut unmatched = 0usize;
    let mut indices = UInt32Builder::with_capacity(left_keys.len());
    for key in &left_keys {
        match key.as_deref().and_then(|k| index.get(k)) {
            Some(&row) => indices.append_value(row),
            None => {
                unmatched += 1;
                indices.append_null();
            }
        }
    }
    let indices: UInt32Array = indices.finish();

    let key_idx = right
        .schema()
        .column_with_name(spec.key)
        .map(|(i, _)| i)
        .expect("key column checked above");

    let mut fields: Vec<_> = left.schema().fields().iter().cloned().collect();
    let mut columns: Vec<ArrayRef> = left.columns().to_vec();
    for (i, field) in right.schema().fields().iter().enumerate() {
        if i == key_idx {
            continue;
        }
        // gathered columns always admit nulls, whatever the source declared
        fields.push(Arc::new(field.as_ref().clone().with_nullable(true)));
        columns.push(take(right.column(i), &indices, None)?);
    }

    debug!(table = spec.table, key = spec.key, unmatched, "left join done");

    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
    Ok(JoinOutcome { batch, unmatched })
}

/// Canonical comparable form for a key column: cast to Utf8 so numeric and
/// text keys hash the same way on both sides of a join.
pub(crate) fn key_strings(
    batch: &RecordBatch,
    key: &str,
    table: &str,
) -> Result<Vec<Option<String>>> {
    let (idx, _) = batch.schema().column_with_name(key).ok_or_else(|| {
        PipelineError::MissingColumn {
            table: table.to_string(),
            column: key.to_string(),
        }
    })?;
    let as_utf8 = cast(batch.column(idx), &DataType::Utf8)?;
    let sarr = as_utf8
        .as_any()
        .downcast_ref::<StringArray>()
        .expect("cast to Utf8 yields StringArray");
    Ok(sarr.iter().map(|v| v.map(str::to_string)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, Float64Array, StringArray};
    use arrow::datatypes::Field;

    fn batch(cols: Vec<(&str, ArrayRef)>) -> RecordBatch {
        let fields: Vec<Field> = cols
            .iter()
            .map(|(n, a)| Field::new(*n, a.data_type().clone(), true))
            .collect();
        let arrays = cols.into_iter().map(|(_, a)| a).collect();
        RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap()
    }

    fn f64_col(values: Vec<Option<f64>>) -> ArrayRef {
        Arc::new(Float64Array::from(values))
    }

    fn utf8_col(values: Vec<Option<&str>>) -> ArrayRef {
        Arc::new(StringArray::from(values))
    }

    fn sales() -> RecordBatch {
        batch(vec![
            ("venta_id", utf8_col(vec![Some("2025-001"), Some("2025-002"), Some("2025-003")])),
            ("cliente_id", f64_col(vec![Some(1.0), Some(99.0), None])),
        ])
    }

    #[test]
    fn unmatched_rows_survive_with_nulls() -> Result<()> {
        let customers = batch(vec![
            ("cliente_id", f64_col(vec![Some(1.0), Some(2.0)])),
            ("nombre", utf8_col(vec![Some("Juan"), Some("María")])),
        ]);
        let out = left_join(
            &sales(),
            &customers,
            &JoinSpec { table: "clientes", key: "cliente_id", renames: &[] },
        )?;

        assert_eq!(out.batch.num_rows(), 3);
        assert_eq!(out.unmatched, 2); // cliente 99 and the null key

        let nombre = out
            .batch
            .column_by_name("nombre")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(nombre.value(0), "Juan");
        assert!(nombre.is_null(1));
        assert!(nombre.is_null(2));
        Ok(())
    }

    #[test]
    fn duplicate_right_key_is_a_cardinality_violation() {
        let customers = batch(vec![
            ("cliente_id", f64_col(vec![Some(1.0), Some(1.0)])),
            ("nombre", utf8_col(vec![Some("Juan"), Some("Otro")])),
        ]);
        let err = left_join(
            &sales(),
            &customers,
            &JoinSpec { table: "clientes", key: "cliente_id", renames: &[] },
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::JoinCardinalityViolation { .. }));
    }

    #[test]
    fn right_row_order_does_not_matter() -> Result<()> {
        let spec = JoinSpec { table: "productos", key: "producto_id", renames: &[] };
        let left = batch(vec![(
            "producto_id",
            f64_col(vec![Some(2.0), Some(1.0), Some(2.0)]),
        )]);
        let forward = batch(vec![
            ("producto_id", f64_col(vec![Some(1.0), Some(2.0)])),
            ("nombre_producto", utf8_col(vec![Some("Notebook"), Some("Mouse")])),
        ]);
        let shuffled = batch(vec![
            ("producto_id", f64_col(vec![Some(2.0), Some(1.0)])),
            ("nombre_producto", utf8_col(vec![Some("Mouse"), Some("Notebook")])),
        ]);

        let a = left_join(&left, &forward, &spec)?;
        let b = left_join(&left, &shuffled, &spec)?;
        assert_eq!(a.batch, b.batch);
        Ok(())
    }

    #[test]
    fn renames_apply_before_join() -> Result<()> {
        let products = batch(vec![
            ("producto_id", f64_col(vec![Some(1.0)])),
            ("nombre_producto", utf8_col(vec![Some("Notebook")])),
        ]);
        let left = batch(vec![("producto_id", f64_col(vec![Some(1.0)]))]);
        let out = left_join(
            &left,
            &products,
            &JoinSpec {
                table: "productos",
                key: "producto_id",
                renames: &[("nombre_producto", "producto")],
            },
        )?;
        assert!(out.batch.column_by_name("producto").is_some());
        assert!(out.batch.column_by_name("nombre_producto").is_none());
        Ok(())
    }

    #[test]
    fn key_column_is_not_duplicated() -> Result<()> {
        let right = batch(vec![
            ("cliente_id", f64_col(vec![Some(1.0)])),
            ("nombre", utf8_col(vec![Some("Juan")])),
        ]);
        let out = left_join(
            &sales(),
            &right,
            &JoinSpec { table: "clientes", key: "cliente_id", renames: &[] },
        )?;
        let keys = out
            .batch
            .schema()
            .fields()
            .iter()
            .filter(|f| f.name() == "cliente_id")
            .count();
        assert_eq!(keys, 1);
        Ok(())
    }
}

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use arrow::{
    array::{ArrayRef, StringArray, UInt32Array},
    compute::take,
    record_batch::RecordBatch,
};
use once_cell::sync::Lazy;
use tracing::warn;

use super::columns::rename_columns;
use super::join::key_strings;
use crate::error::Result;

/// Customer fields that would collide with sale fields after the join.
/// Declared here so schema evolution stays auditable.
pub const CUSTOMER_RENAMES: &[(&str, &str)] = &[("activo", "cliente_activo")];

/// Fixed lookup for the gender column. Values outside this map pass
/// through unchanged; see `normalize_genero`.
static GENERO_CANONICO: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| HashMap::from([("M", "Masculino"), ("F", "Femenino")]));

pub struct CleanOutcome {
    pub batch: RecordBatch,
    pub duplicates_dropped: usize,
    pub unrecognized_genero: usize,
}

/// Prepare the customer table for joining: one row per `cliente_id`
/// (first occurrence wins), canonical gender values, and colliding field
/// names renamed out of the way.
pub fn clean_customers(customers: &RecordBatch) -> Result<CleanOutcome> {
    let (deduped, duplicates_dropped) = dedupe_by_key(customers, "cliente_id")?;
    let (normalized, unrecognized_genero) = normalize_genero(&deduped)?;
    let batch = rename_columns(&normalized, CUSTOMER_RENAMES)?;

    Ok(CleanOutcome {
        batch,
        duplicates_dropped,
        unrecognized_genero,
    })
}

/// Keep the first row per key, preserving original order. Null keys are
/// one key like any other: the first null row survives, later ones drop.
fn dedupe_by_key(batch: &RecordBatch, key: &str) -> Result<(RecordBatch, usize)> {
    let keys = key_strings(batch, key, "clientes")?;

    let mut seen: HashSet<Option<String>> = HashSet::with_capacity(keys.len());
    let mut keep: Vec<u32> = Vec::with_capacity(keys.len());
    for (row, k) in keys.into_iter().enumerate() {
        if seen.insert(k) {
            keep.push(row as u32);
        }
    }

    let dropped = batch.num_rows() - keep.len();
    if dropped == 0 {
        return Ok((batch.clone(), 0));
    }

    let indices = UInt32Array::from(keep);
    let columns: Vec<ArrayRef> = batch
        .columns()
        .iter()
        .map(|c| take(c, &indices, None))
        .collect::<std::result::Result<_, _>>()?;
    let deduped = RecordBatch::try_new(batch.schema(), columns)?;
    Ok((deduped, dropped))
}

/// Map gender encodings onto the two canonical values. Unrecognized
/// values pass through unchanged; that tolerance is inherited behavior,
/// so it is surfaced as a data-quality warning instead of silently kept.
fn normalize_genero(batch: &RecordBatch) -> Result<(RecordBatch, usize)> {
    let Some((idx, _)) = batch.schema().column_with_name("genero") else {
        return Ok((batch.clone(), 0));
    };
    let Some(sarr) = batch.column(idx).as_any().downcast_ref::<StringArray>() else {
        return Ok((batch.clone(), 0));
    };

    let mut unrecognized = 0usize;
    let values: Vec<Option<&str>> = sarr
        .iter()
        .map(|v| {
            v.map(|raw| match GENERO_CANONICO.get(raw) {
                Some(canonical) => *canonical,
                None => {
                    if raw != "Masculino" && raw != "Femenino" {
                        unrecognized += 1;
                    }
                    raw
                }
            })
        })
        .collect();

    if unrecognized > 0 {
        warn!(
            count = unrecognized,
            "genero values outside the known encodings passed through unchanged"
        );
    }

    let mut columns = batch.columns().to_vec();
    columns[idx] = Arc::new(StringArray::from(values)) as ArrayRef;
    let normalized = RecordBatch::try_new(batch.schema(), columns)?;
    Ok((normalized, unrecognized))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Float64Array;
    use arrow::datatypes::{DataType, Field, Schema};

    fn customers(ids: Vec<Option<f64>>, nombres: Vec<Option<&str>>, generos: Vec<Option<&str>>, activos: Vec<Option<&str>>) -> RecordBatch {
        let fields = vec![
            Field::new("cliente_id", DataType::Float64, true),
            Field::new("nombre", DataType::Utf8, true),
            Field::new("genero", DataType::Utf8, true),
            Field::new("activo", DataType::Utf8, true),
        ];
        RecordBatch::try_new(
            Arc::new(Schema::new(fields)),
            vec![
                Arc::new(Float64Array::from(ids)),
                Arc::new(StringArray::from(nombres)),
                Arc::new(StringArray::from(generos)),
                Arc::new(StringArray::from(activos)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn first_duplicate_wins() -> Result<()> {
        let input = customers(
            vec![Some(1.0), Some(1.0), Some(2.0)],
            vec![Some("Juan"), Some("Impostor"), Some("María")],
            vec![Some("M"), Some("M"), Some("F")],
            vec![Some("True"), Some("False"), Some("True")],
        );
        let out = clean_customers(&input)?;
        assert_eq!(out.batch.num_rows(), 2);
        assert_eq!(out.duplicates_dropped, 1);

        let nombre = out
            .batch
            .column_by_name("nombre")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(nombre.value(0), "Juan");
        assert_eq!(nombre.value(1), "María");
        Ok(())
    }

    #[test]
    fn genero_maps_short_codes_and_keeps_canonical() -> Result<()> {
        let input = customers(
            vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)],
            vec![Some("a"), Some("b"), Some("c"), Some("d")],
            vec![Some("M"), Some("F"), Some("Masculino"), Some("Femenino")],
            vec![None, None, None, None],
        );
        let out = clean_customers(&input)?;
        let genero = out
            .batch
            .column_by_name("genero")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        for v in genero.iter().flatten() {
            assert!(v == "Masculino" || v == "Femenino");
        }
        assert_eq!(out.unrecognized_genero, 0);
        Ok(())
    }

    #[test]
    fn unrecognized_genero_passes_through_but_is_counted() -> Result<()> {
        let input = customers(
            vec![Some(1.0), Some(2.0)],
            vec![Some("a"), Some("b")],
            vec![Some("X"), Some("M")],
            vec![None, None],
        );
        let out = clean_customers(&input)?;
        assert_eq!(out.unrecognized_genero, 1);
        let genero = out
            .batch
            .column_by_name("genero")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(genero.value(0), "X");
        assert_eq!(genero.value(1), "Masculino");
        Ok(())
    }

    #[test]
    fn activo_is_renamed_out_of_collision() -> Result<()> {
        let input = customers(
            vec![Some(1.0)],
            vec![Some("a")],
            vec![Some("M")],
            vec![Some("True")],
        );
        let out = clean_customers(&input)?;
        assert!(out.batch.column_by_name("cliente_activo").is_some());
        assert!(out.batch.column_by_name("activo").is_none());
        Ok(())
    }

    #[test]
    fn cleaning_is_idempotent() -> Result<()> {
        let input = customers(
            vec![Some(1.0), Some(1.0), Some(2.0)],
            vec![Some("Juan"), Some("Impostor"), Some("María")],
            vec![Some("M"), Some("F"), Some("Femenino")],
            vec![Some("True"), Some("False"), Some("True")],
        );
        let once = clean_customers(&input)?;
        let twice = clean_customers(&once.batch)?;
        assert_eq!(once.batch, twice.batch);
        assert_eq!(twice.duplicates_dropped, 0);
        Ok(())
    }
}

use std::sync::Arc;

use arrow::{
    datatypes::{Field, Schema},
    record_batch::RecordBatch,
};

use crate::error::Result;

/// Canonical output layout: identifiers, customer attributes, product and
/// category attributes, then the transaction itself.
pub const CANONICAL_COLUMNS: &[&str] = &[
    // Identifiers
    "venta_id",
    "fecha_venta",
    // Customer
    "cliente_id",
    "nombre",
    "apellido",
    "email",
    "genero",
    "fecha_registro",
    "region",
    "pais",
    "edad",
    "ingreso_mensual",
    "cliente_activo",
    // Product / category
    "producto_id",
    "producto",
    "categoria_id",
    "nombre_categoria",
    // Transaction
    "cantidad",
    "precio_unitario",
    "total_venta",
    "canal_venta",
];

/// Project onto the canonical column order. Canonical names missing from
/// the batch are skipped, so upstream schema drift reorders instead of
/// erroring; columns outside the canonical list are dropped.
pub fn reorder_columns(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    let indices: Vec<usize> = CANONICAL_COLUMNS
        .iter()
        .filter_map(|name| schema.column_with_name(name).map(|(i, _)| i))
        .collect();
    batch.project(&indices).map_err(Into::into)
}

/// Apply a declared rename table to a batch's schema. Names not present
/// are ignored, which makes repeated application a no-op.
pub fn rename_columns(batch: &RecordBatch, renames: &[(&str, &str)]) -> Result<RecordBatch> {
    if renames.is_empty() {
        return Ok(batch.clone());
    }
    let fields: Vec<Field> = batch
        .schema()
        .fields()
        .iter()
        .map(|f| {
            let name = renames
                .iter()
                .find(|(from, _)| from == f.name())
                .map(|(_, to)| to.to_string())
                .unwrap_or_else(|| f.name().clone());
            Field::new(&name, f.data_type().clone(), f.is_nullable())
        })
        .collect();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), batch.columns().to_vec())
        .map_err(Into::into)
}

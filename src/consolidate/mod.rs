pub mod clean;
pub mod columns;
pub mod join;

use arrow::{compute::concat_batches, record_batch::RecordBatch};
use serde::Serialize;
use tracing::{info, instrument};

use crate::error::{PipelineError, Result};
use crate::load::Sources;
use self::join::JoinSpec;

/// Columns of the product table renamed before its join, so the product
/// name cannot be confused with the category's `nombre_categoria`.
pub const PRODUCT_RENAMES: &[(&str, &str)] = &[("nombre_producto", "producto")];

/// Counts computed for observability. They never alter control flow:
/// unmatched foreign keys are tolerated, only surfaced.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Diagnostics {
    pub total_sales: usize,
    pub duplicate_customers_dropped: usize,
    pub unrecognized_genero: usize,
    pub unmatched_customers: usize,
    pub unmatched_products: usize,
    pub unmatched_categories: usize,
}

pub struct Consolidated {
    pub batch: RecordBatch,
    pub diagnostics: Diagnostics,
}

/// Run the whole consolidation: union the yearly sales, clean customers,
/// three validated left joins, canonical column order. Exactly one output
/// row per input sale row.
#[instrument(level = "info", skip(sources))]
pub fn consolidate(sources: &Sources) -> Result<Consolidated> {
    let mut diagnostics = Diagnostics::default();

    let sales = union_sales(&sources.sales_2025, &sources.sales_2026)?;
    diagnostics.total_sales = sales.num_rows();
    info!(
        rows_2025 = sources.sales_2025.num_rows(),
        rows_2026 = sources.sales_2026.num_rows(),
        total = sales.num_rows(),
        "sales concatenated"
    );

    let cleaned = clean::clean_customers(&sources.customers)?;
    diagnostics.duplicate_customers_dropped = cleaned.duplicates_dropped;
    diagnostics.unrecognized_genero = cleaned.unrecognized_genero;
    info!(
        dropped = cleaned.duplicates_dropped,
        remaining = cleaned.batch.num_rows(),
        "customers cleaned"
    );

    let with_customers = join::left_join(
        &sales,
        &cleaned.batch,
        &JoinSpec {
            table: "clientes",
            key: "cliente_id",
            renames: &[],
        },
    )?;
    diagnostics.unmatched_customers = with_customers.unmatched;

    let with_products = join::left_join(
        &with_customers.batch,
        &sources.products,
        &JoinSpec {
            table: "productos",
            key: "producto_id",
            renames: PRODUCT_RENAMES,
        },
    )?;
    diagnostics.unmatched_products = with_products.unmatched;

    let with_categories = join::left_join(
        &with_products.batch,
        &sources.categories,
        &JoinSpec {
            table: "categorias",
            key: "categoria_id",
            renames: &[],
        },
    )?;
    diagnostics.unmatched_categories = with_categories.unmatched;

    let batch = columns::reorder_columns(&with_categories.batch)?;
    info!(
        rows = batch.num_rows(),
        cols = batch.num_columns(),
        "consolidated table built"
    );

    Ok(Consolidated { batch, diagnostics })
}

/// Concatenate the two yearly batches, first year's rows first. When type
/// inference diverged between the files (an all-null column, say), the
/// second batch is cast column-by-column onto the first one's schema.
pub fn union_sales(first: &RecordBatch, second: &RecordBatch) -> Result<RecordBatch> {
    let schema = first.schema();
    let second = if second.schema() == schema {
        second.clone()
    } else {
        align_to_schema(second, first)?
    };
    concat_batches(&schema, &[first.clone(), second]).map_err(Into::into)
}

fn align_to_schema(batch: &RecordBatch, template: &RecordBatch) -> Result<RecordBatch> {
    let schema = template.schema();
    let mut columns = Vec::with_capacity(schema.fields().len());
    for field in schema.fields() {
        let col = batch.column_by_name(field.name()).ok_or_else(|| {
            PipelineError::MalformedSource {
                name: "ventas".into(),
                reason: format!("yearly sales tables disagree: missing column `{}`", field.name()),
            }
        })?;
        columns.push(arrow::compute::cast(col, field.data_type())?);
    }
    RecordBatch::try_new(schema, columns).map_err(Into::into)
}

/// Permute a batch's rows. Test support for order-independence checks.
#[cfg(test)]
fn permute(batch: &RecordBatch, order: &[u32]) -> RecordBatch {
    use arrow::array::UInt32Array;
    use arrow::compute::take;
    let indices = UInt32Array::from(order.to_vec());
    let columns = batch
        .columns()
        .iter()
        .map(|c| take(c, &indices, None).unwrap())
        .collect();
    RecordBatch::try_new(batch.schema(), columns).unwrap()
}

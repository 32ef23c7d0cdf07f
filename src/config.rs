use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Fixed source file names inside the data directory.
pub const CUSTOMERS_FILE: &str = "df_clientes.csv";
pub const PRODUCTS_FILE: &str = "df_productos.csv";
pub const CATEGORIES_FILE: &str = "df_categorias.csv";
pub const SALES_2025_FILE: &str = "df_ventas_2025.csv";
pub const SALES_2026_FILE: &str = "df_ventas_2026.csv";

/// Default output file name, written inside the data directory.
pub const CONSOLIDATED_FILE: &str = "df_consolidado.csv";

/// Where the pipeline reads its sources and writes its output.
///
/// Built once at orchestration time and passed into each stage; no stage
/// resolves paths on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory holding the five source tables.
    pub data_dir: PathBuf,
    /// Destination of the consolidated table. Extension selects the format
    /// (`.parquet` for parquet, anything else is written as CSV).
    pub output_path: PathBuf,
}

impl PipelineConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let output_path = data_dir.join(CONSOLIDATED_FILE);
        Self {
            data_dir,
            output_path,
        }
    }

    pub fn with_output(mut self, output_path: impl Into<PathBuf>) -> Self {
        self.output_path = output_path.into();
        self
    }

    /// Load a config from a JSON file, e.g.
    /// `{"data_dir": "data", "output_path": "data/df_consolidado.csv"}`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| PipelineError::SourceNotFound {
            name: "config".into(),
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|e| PipelineError::MalformedSource {
            name: "config".into(),
            reason: e.to_string(),
        })
    }

    pub fn source_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }
}

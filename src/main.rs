use anyhow::{bail, Result};
use consolidata::{
    config::PipelineConfig,
    consolidate::{self, Consolidated},
    error::PipelineError,
    load, persist,
};
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) configure ────────────────────────────────────────────────
    let config = parse_config()?;
    info!(
        data_dir = %config.data_dir.display(),
        output = %config.output_path.display(),
        "configured"
    );

    // ─── 3) run the pipeline ─────────────────────────────────────────
    match run(&config) {
        Ok(()) => {
            info!("all done");
            Ok(())
        }
        Err(e) => {
            error!("pipeline failed: {e}");
            Err(e.into())
        }
    }
}

/// `consolidata [DATA_DIR] [OUTPUT]` or `consolidata --config <file.json>`.
/// Defaults to `data/` with the output written alongside the sources.
fn parse_config() -> Result<PipelineConfig> {
    let mut args = std::env::args().skip(1);
    match args.next() {
        Some(flag) if flag == "--config" => {
            let Some(path) = args.next() else {
                bail!("--config requires a path to a JSON file");
            };
            Ok(PipelineConfig::from_file(Path::new(&path))?)
        }
        Some(data_dir) => {
            let config = PipelineConfig::new(data_dir);
            Ok(match args.next() {
                Some(output) => config.with_output(output),
                None => config,
            })
        }
        None => Ok(PipelineConfig::new("data")),
    }
}

fn run(config: &PipelineConfig) -> Result<(), PipelineError> {
    let sources = load::load_sources(config)?;

    let Consolidated { batch, diagnostics } = consolidate::consolidate(&sources)?;
    info!(
        total_sales = diagnostics.total_sales,
        duplicate_customers_dropped = diagnostics.duplicate_customers_dropped,
        unrecognized_genero = diagnostics.unrecognized_genero,
        unmatched_customers = diagnostics.unmatched_customers,
        unmatched_products = diagnostics.unmatched_products,
        unmatched_categories = diagnostics.unmatched_categories,
        "run diagnostics"
    );

    persist::write_consolidated(&batch, &config.output_path)
}

use crate::core::Pipeline;
use crate::utils::error::Result;
use std::time::Instant;

pub struct ExportEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> ExportEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<String> {
        let started = Instant::now();
        tracing::info!("Starting DSSAT export...");

        // Extract
        tracing::info!("Reading DSSAT output files...");
        let raw_reports = self.pipeline.extract().await?;
        tracing::info!("Read {} report source(s)", raw_reports.len());

        // Transform
        tracing::info!("Parsing reports...");
        let transformed = self.pipeline.transform(raw_reports).await?;
        tracing::info!(
            "Built {} table(s) with {} row(s)",
            transformed.tables.len(),
            transformed.row_count()
        );

        // Load
        tracing::info!("Writing export...");
        let output_path = self.pipeline.load(transformed).await?;
        tracing::info!("Export saved to: {} ({:?})", output_path, started.elapsed());

        Ok(output_path)
    }
}

use crate::domain::model::{RawReport, ReportRequest, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    /// Directory holding the DSSAT run outputs.
    fn input_dir(&self) -> &str;
    fn output_path(&self) -> &str;
    /// Base name of the export archive.
    fn export_name(&self) -> &str;
    fn reports(&self) -> Vec<ReportRequest>;
    fn output_formats(&self) -> Vec<String>;
    fn compress(&self) -> bool;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<RawReport>>;
    async fn transform(&self, data: Vec<RawReport>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}

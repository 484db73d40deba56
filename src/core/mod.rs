pub mod etl;
pub mod pipeline;

pub use crate::domain::model::{Cell, RawReport, ReportRequest, Table, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;

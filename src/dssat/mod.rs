//! Readers for DSSAT text formats.
//!
//! Everything here works on file contents already in memory, so the parsers
//! can be used without the export pipeline.

pub mod cn_ratio;
pub mod daily;
pub mod data_cde;
pub mod dates;
pub mod efficiency;
pub mod observed;
pub mod output;
pub mod report;
pub mod soil;
pub mod summary;
pub mod water_balance;

pub use daily::{cum_to_daily, extract_daily, DailyOptions, DailyRecord};
pub use output::{parse_output, OutputFile, OutputTable, RunBlock};
pub use report::ReportKind;

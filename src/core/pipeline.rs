use crate::core::{Cell, ConfigProvider, Pipeline, RawReport, ReportRequest, Storage, Table, TransformResult};
use crate::dssat::daily::{extract_daily, DailyOptions};
use crate::dssat::observed::{parse_observed, read_observed_csv, ObservedData};
use crate::dssat::output::parse_output;
use crate::dssat::summary::read_summary;
use crate::dssat::water_balance::{parse_water_balance, select_runs};
use crate::dssat::{cn_ratio, ReportKind};
use crate::utils::error::{DssatError, Result};
use std::collections::HashSet;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

/// Reads DSSAT reports from `source` and writes export tables to `sink`.
pub struct OutputPipeline<S: Storage, W: Storage, C: ConfigProvider> {
    source: S,
    sink: W,
    config: C,
}

impl<S: Storage, W: Storage, C: ConfigProvider> OutputPipeline<S, W, C> {
    pub fn new(source: S, sink: W, config: C) -> Self {
        Self {
            source,
            sink,
            config,
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, W: Storage, C: ConfigProvider> Pipeline for OutputPipeline<S, W, C> {
    async fn extract(&self) -> Result<Vec<RawReport>> {
        let mut reports = Vec::new();

        for request in self.config.reports() {
            let names = request.source_files();
            if names.is_empty() {
                return Err(DssatError::MissingConfigError {
                    field: format!("reports.{}.file", request.kind),
                });
            }

            let mut files = Vec::with_capacity(names.len());
            for name in names {
                tracing::debug!("Reading {} from {}", name, self.config.input_dir());
                let bytes = self.source.read_file(&name).await?;
                files.push((name, String::from_utf8_lossy(&bytes).into_owned()));
            }
            reports.push(RawReport { request, files });
        }

        Ok(reports)
    }

    async fn transform(&self, data: Vec<RawReport>) -> Result<TransformResult> {
        let mut tables = Vec::with_capacity(data.len());
        let mut used_names = HashSet::new();

        for raw in data {
            let mut table = build_table(&raw)?;
            // 同一種報表可以請求多次 (例如不同的 run 範圍)
            let mut suffix = 2;
            let base = table.name.clone();
            while !used_names.insert(table.name.clone()) {
                table.name = format!("{}_{}", base, suffix);
                suffix += 1;
            }
            tracing::debug!("Built table {} ({} rows)", table.name, table.rows.len());
            tables.push(table);
        }

        Ok(TransformResult { tables })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let formats = self.config.output_formats();
        let export_name = self.config.export_name();

        let mut files: Vec<(String, Vec<u8>)> = Vec::new();
        for table in &result.tables {
            for format in &formats {
                let data = match format.as_str() {
                    "csv" => table.to_delimited(b',')?,
                    "tsv" => table.to_delimited(b'\t')?,
                    "json" => table.to_json()?.into_bytes(),
                    other => {
                        return Err(DssatError::InvalidConfigValueError {
                            field: "load.output_formats".to_string(),
                            value: other.to_string(),
                            reason: "Unsupported format. Valid formats: csv, tsv, json".to_string(),
                        })
                    }
                };
                files.push((format!("{}.{}", table.name, format), data));
            }
        }

        if self.config.compress() {
            tracing::debug!("Creating ZIP file with {} files", files.len());

            let zip_data = {
                let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
                for (name, data) in &files {
                    zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
                    zip.write_all(data)?;
                }
                let cursor = zip.finish()?;
                cursor.into_inner()
            };

            let archive = format!("{}.zip", export_name);
            tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
            self.sink.write_file(&archive, &zip_data).await?;
            Ok(format!("{}/{}", self.config.output_path(), archive))
        } else {
            for (name, data) in &files {
                self.sink
                    .write_file(&format!("{}/{}", export_name, name), data)
                    .await?;
            }
            Ok(format!("{}/{}", self.config.output_path(), export_name))
        }
    }
}

fn build_table(raw: &RawReport) -> Result<Table> {
    let request = &raw.request;
    let (name, text) = raw.files.first().ok_or_else(|| DssatError::ProcessingError {
        message: format!("no source file read for {}", request.kind),
    })?;

    match request.kind {
        kind if kind.is_daily() => daily_table(request, name, text),
        ReportKind::Summary => summary_table(request, name, text),
        ReportKind::SoilWatBal => water_balance_table(request, name, text),
        ReportKind::CnRatio => {
            let (n_name, n_text) = raw.files.get(1).ok_or_else(|| DssatError::ProcessingError {
                message: "cn_ratio needs SOMLITC.OUT and SOMLITN.OUT".to_string(),
            })?;
            let carbon = parse_output(name, text)?;
            let nitrogen = parse_output(n_name, n_text)?;
            let mut table = Table::new(
                request.kind.table_name(),
                vec!["DATE".to_string(), "CN_RATIO".to_string()],
            );
            for point in cn_ratio::cn_ratio(&carbon, &nitrogen)? {
                table.push_row(vec![Cell::Date(point.date), Cell::Float(point.ratio)])?;
            }
            Ok(table)
        }
        ReportKind::Observed => observed_table(request, name, text),
        other => Err(DssatError::ProcessingError {
            message: format!("no table builder for {}", other),
        }),
    }
}

fn daily_table(request: &ReportRequest, name: &str, text: &str) -> Result<Table> {
    let file = parse_output(name, text)?;

    let params: Vec<String> = if request.params.is_empty() {
        file.tables()
            .next()
            .map(|t| {
                t.header
                    .iter()
                    .filter(|h| *h != "YEAR" && *h != "DOY")
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    } else {
        request.params.clone()
    };

    let crop_sequence = request.crop_sequence() && request.kind.supports_crop_sequence();
    if request.crop_sequence() && !crop_sequence {
        tracing::warn!("crop_sequence is ignored for {}", request.kind);
    }

    let records = extract_daily(
        &file,
        &params,
        request.kind.cumulative_params(),
        DailyOptions {
            daily: request.daily(),
            crop_sequence,
        },
    )?;

    let mut columns = vec!["TRNO".to_string()];
    if crop_sequence {
        columns.push("CROP".to_string());
    }
    columns.push("DATE".to_string());
    columns.extend(params.iter().cloned());

    let mut table = Table::new(request.kind.table_name(), columns);
    for record in records {
        let mut row = vec![Cell::Int(record.trno as i64)];
        if let Some(crop) = record.crop {
            row.push(Cell::Text(crop));
        }
        row.push(Cell::Date(record.date));
        row.extend(record.values.into_iter().map(|(_, v)| Cell::from(v)));
        table.push_row(row)?;
    }
    Ok(table)
}

fn summary_table(request: &ReportRequest, name: &str, text: &str) -> Result<Table> {
    let file = parse_output(name, text)?;
    let params: Vec<String> = if request.params.is_empty() {
        file.tables()
            .next()
            .map(|t| t.header.iter().filter(|h| *h != "TRNO").cloned().collect())
            .unwrap_or_default()
    } else {
        request.params.clone()
    };

    let mut columns = vec!["TRNO".to_string()];
    columns.extend(params.iter().cloned());
    let mut table = Table::new(request.kind.table_name(), columns);

    for row in read_summary(&file, &params)? {
        let mut cells = vec![Cell::Int(row.trno as i64)];
        cells.extend(row.values.iter().map(|(_, v)| cell_from_str(v)));
        table.push_row(cells)?;
    }
    Ok(table)
}

fn water_balance_table(request: &ReportRequest, name: &str, text: &str) -> Result<Table> {
    let balances = parse_water_balance(name, text)?;
    let columns = [
        "RUN",
        "TREATMENT",
        "PLANTING_DATE",
        "HARVEST_DATE",
        "SOIL_WATER_START",
        "SOIL_WATER_FINAL",
        "PRECIPITATION",
        "DRAINAGE",
        "TILEDRAIN_FLOW",
        "RUNOFF",
        "EVAPOTRANSPIRATION",
        "SOIL_WATER_LOST",
    ];
    let mut table = Table::new(
        request.kind.table_name(),
        columns.iter().map(|c| c.to_string()).collect(),
    );

    for wb in select_runs(&balances, request.run_start(), request.run_end) {
        table.push_row(vec![
            Cell::Int(wb.run as i64),
            Cell::Text(wb.treatment.clone()),
            Cell::Date(wb.planting_date),
            Cell::Date(wb.harvest_date),
            Cell::Float(wb.soil_water_start),
            Cell::Float(wb.soil_water_final),
            Cell::Float(wb.precipitation),
            Cell::Float(wb.drainage),
            Cell::Float(wb.tiledrain_flow),
            Cell::Float(wb.runoff),
            Cell::Float(wb.evapotranspiration),
            Cell::Float(wb.soil_water_lost),
        ])?;
    }
    Ok(table)
}

fn observed_table(request: &ReportRequest, name: &str, text: &str) -> Result<Table> {
    let params = (!request.params.is_empty()).then_some(request.params.as_slice());
    let data: ObservedData = if name.to_ascii_lowercase().ends_with(".csv") {
        read_observed_csv(name, text, params)?
    } else {
        parse_observed(name, text, params)?
    };

    let mut columns = vec!["TRNO".to_string(), "DATE".to_string()];
    columns.extend(data.columns.iter().cloned());
    let mut table = Table::new(request.kind.table_name(), columns);

    for ((trno, date), values) in &data.rows {
        let mut row = vec![Cell::Int(*trno as i64), Cell::Date(*date)];
        row.extend(
            data.columns
                .iter()
                .map(|c| Cell::from(values.get(c).copied())),
        );
        table.push_row(row)?;
    }
    Ok(table)
}

fn cell_from_str(value: &str) -> Cell {
    if let Ok(v) = value.parse::<i64>() {
        Cell::Int(v)
    } else if let Ok(v) = value.parse::<f64>() {
        Cell::Float(v)
    } else {
        Cell::Text(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn put(&self, path: &str, text: &str) {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), text.as_bytes().to_vec());
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                DssatError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        reports: Vec<ReportRequest>,
        formats: Vec<String>,
        compress: bool,
    }

    impl MockConfig {
        fn new(reports: Vec<ReportRequest>) -> Self {
            Self {
                reports,
                formats: vec!["csv".to_string()],
                compress: true,
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn input_dir(&self) -> &str {
            "run"
        }

        fn output_path(&self) -> &str {
            "test_output"
        }

        fn export_name(&self) -> &str {
            "UFGA8201"
        }

        fn reports(&self) -> Vec<ReportRequest> {
            self.reports.clone()
        }

        fn output_formats(&self) -> Vec<String> {
            self.formats.clone()
        }

        fn compress(&self) -> bool {
            self.compress
        }
    }

    const PLANT_GRO: &str = "\
*RUN   1        : Rainfed low N          MZCER047 UFGA8201   1
 MODEL          : MZCER047 - Maize

@YEAR DOY   DAS   LAID  SNW0C
 1982  57     0   0.00    0.0
 1982  58     1   0.10    1.5
 1982  59     2   0.25    4.0
";

    const SUMMARY: &str = "\
*SUMMARY : UFGA8201MZ

@   RUNNO   TRNO CR MODEL...... HWAM
        1      1 MZ MZCER047    5105
        2      2 MZ MZCER047    9010
";

    fn request(kind: ReportKind, params: &[&str]) -> ReportRequest {
        ReportRequest::new(kind, params.iter().map(|p| p.to_string()).collect())
    }

    #[tokio::test]
    async fn test_extract_reads_default_files() {
        let source = MockStorage::new();
        source.put("PlantGro.OUT", PLANT_GRO).await;
        let config = MockConfig::new(vec![request(ReportKind::PlantGro, &["LAID"])]);
        let pipeline = OutputPipeline::new(source, MockStorage::new(), config);

        let reports = pipeline.extract().await.unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].files[0].0, "PlantGro.OUT");
        assert!(reports[0].files[0].1.contains("Rainfed low N"));
    }

    #[tokio::test]
    async fn test_extract_missing_file_fails() {
        let config = MockConfig::new(vec![request(ReportKind::Et, &["ETAA"])]);
        let pipeline = OutputPipeline::new(MockStorage::new(), MockStorage::new(), config);

        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, DssatError::IoError(_)));
    }

    #[tokio::test]
    async fn test_extract_observed_requires_file() {
        let config = MockConfig::new(vec![request(ReportKind::Observed, &[])]);
        let pipeline = OutputPipeline::new(MockStorage::new(), MockStorage::new(), config);

        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, DssatError::MissingConfigError { .. }));
    }

    #[tokio::test]
    async fn test_transform_daily_table() {
        let source = MockStorage::new();
        source.put("PlantGro.OUT", PLANT_GRO).await;
        let mut req = request(ReportKind::PlantGro, &["LAID", "SNW0C"]);
        req.crop_sequence = Some(true);
        let config = MockConfig::new(vec![req]);
        let pipeline = OutputPipeline::new(source, MockStorage::new(), config);

        let raw = pipeline.extract().await.unwrap();
        let result = pipeline.transform(raw).await.unwrap();

        let table = &result.tables[0];
        assert_eq!(table.name, "PlantGro");
        assert_eq!(table.columns, vec!["TRNO", "CROP", "DATE", "LAID", "SNW0C"]);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[2][4], Cell::Float(2.5));
        assert_eq!(table.rows[0][1], Cell::Text("Maize".to_string()));
    }

    #[tokio::test]
    async fn test_transform_defaults_to_all_columns_and_dedups_names() {
        let source = MockStorage::new();
        source.put("Summary.OUT", SUMMARY).await;
        let config = MockConfig::new(vec![
            request(ReportKind::Summary, &[]),
            request(ReportKind::Summary, &["HWAM"]),
        ]);
        let pipeline = OutputPipeline::new(source, MockStorage::new(), config);

        let raw = pipeline.extract().await.unwrap();
        let result = pipeline.transform(raw).await.unwrap();

        assert_eq!(result.tables[0].columns, vec!["TRNO", "RUNNO", "CR", "MODEL", "HWAM"]);
        assert_eq!(result.tables[1].name, "Summary_2");
        assert_eq!(result.tables[1].rows[1], vec![Cell::Int(2), Cell::Int(9010)]);
    }

    #[tokio::test]
    async fn test_load_zip_contents() {
        let source = MockStorage::new();
        source.put("PlantGro.OUT", PLANT_GRO).await;
        let sink = MockStorage::new();
        let mut config = MockConfig::new(vec![request(ReportKind::PlantGro, &["LAID"])]);
        config.formats = vec!["csv".to_string(), "json".to_string()];
        let pipeline = OutputPipeline::new(source, sink.clone(), config);

        let raw = pipeline.extract().await.unwrap();
        let result = pipeline.transform(raw).await.unwrap();
        let output_path = pipeline.load(result).await.unwrap();

        assert_eq!(output_path, "test_output/UFGA8201.zip");

        let zip_bytes = sink.get_file("UFGA8201.zip").await.unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_bytes)).unwrap();
        let mut names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["PlantGro.csv", "PlantGro.json"]);

        let mut csv_file = archive.by_name("PlantGro.csv").unwrap();
        let mut content = String::new();
        std::io::Read::read_to_string(&mut csv_file, &mut content).unwrap();
        assert_eq!(
            content,
            "TRNO,DATE,LAID\n1,1982-02-26,0\n1,1982-02-27,0.1\n1,1982-02-28,0.25\n"
        );
    }

    #[tokio::test]
    async fn test_load_loose_files() {
        let sink = MockStorage::new();
        let mut config = MockConfig::new(vec![]);
        config.compress = false;
        config.formats = vec!["tsv".to_string()];
        let pipeline = OutputPipeline::new(MockStorage::new(), sink.clone(), config);

        let mut table = Table::new("CN_Ratio", vec!["DATE".to_string(), "CN_RATIO".to_string()]);
        table
            .push_row(vec![
                Cell::Date(chrono::NaiveDate::from_ymd_opt(1982, 2, 26).unwrap()),
                Cell::Float(10.5),
            ])
            .unwrap();

        let output_path = pipeline
            .load(TransformResult { tables: vec![table] })
            .await
            .unwrap();

        assert_eq!(output_path, "test_output/UFGA8201");
        let tsv = sink.get_file("UFGA8201/CN_Ratio.tsv").await.unwrap();
        assert_eq!(String::from_utf8(tsv).unwrap(), "DATE\tCN_RATIO\n1982-02-26\t10.5\n");
    }

    #[tokio::test]
    async fn test_load_rejects_unknown_format() {
        let mut config = MockConfig::new(vec![]);
        config.formats = vec!["xlsx".to_string()];
        let pipeline = OutputPipeline::new(MockStorage::new(), MockStorage::new(), config);

        let table = Table::new("ET", vec!["TRNO".to_string()]);
        let result = pipeline.load(TransformResult { tables: vec![table] }).await;
        assert!(result.is_err());
    }
}

use clap::Parser;
use dssat_etl::utils::error::{DssatError, ErrorSeverity};
use dssat_etl::utils::{logger, validation::Validate};
use dssat_etl::{CliConfig, ExportEngine, LocalStorage, OutputPipeline};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.log_json {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting dssat-etl CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!(
        "📂 Reading {} from {}",
        config
            .reports
            .iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        config.input_dir
    );

    let source = LocalStorage::new(config.input_dir.clone());
    let sink = LocalStorage::new(config.output_path.clone());
    let pipeline = OutputPipeline::new(source, sink, config);
    let engine = ExportEngine::new(pipeline);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Export completed successfully!");
            println!("✅ Export completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            report_failure(&e);
            let exit_code = exit_code(&e);
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn report_failure(e: &DssatError) {
    tracing::error!(
        "❌ Export failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());
}

// 根據錯誤嚴重程度決定退出碼
fn exit_code(e: &DssatError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

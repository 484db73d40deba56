use clap::Parser;
use dssat_etl::core::ConfigProvider;
use dssat_etl::utils::error::ErrorSeverity;
use dssat_etl::utils::{logger, validation::Validate};
use dssat_etl::{ExportEngine, LocalStorage, OutputPipeline, TomlConfig};

#[derive(Parser)]
#[command(name = "toml-export")]
#[command(about = "DSSAT export driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "dssat-export.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override the run directory from the config
    #[arg(long)]
    input_dir: Option<String>,

    /// Override compression setting from config
    #[arg(long)]
    compress: Option<bool>,

    /// Dry run - show what would be exported without reading any data
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    tracing::info!("🚀 Starting TOML-based DSSAT export");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 應用命令列覆蓋設定
    if let Some(dir) = args.input_dir.clone() {
        tracing::info!("🔧 Run directory overridden to: {}", dir);
        config.source.directory = dir;
    }
    if let Some(compress) = args.compress {
        tracing::info!("🔧 Compression overridden to: {}", compress);
        config.load.compress = Some(compress);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");

    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No files will be read or written");
        perform_dry_run(&config);
        return Ok(());
    }

    let source = LocalStorage::new(config.input_dir().to_string());
    let sink = LocalStorage::new(config.output_path().to_string());
    let pipeline = OutputPipeline::new(source, sink, config);
    let engine = ExportEngine::new(pipeline);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Export completed successfully!");
            println!("✅ Export completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Export failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Export: {}", config.export.name);
    if let Some(description) = &config.export.description {
        println!("  Description: {}", description);
    }
    println!("  Run directory: {}", config.input_dir());
    println!("  Output: {}", config.output_path());
    println!("  Formats: {}", config.load.output_formats.join(", "));
    println!("  Compress: {}", config.compress());
    println!("  Reports: {}", config.reports.len());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &TomlConfig) {
    let source = LocalStorage::new(config.input_dir().to_string());

    println!("🔍 Dry Run Analysis:");
    println!();

    for report in &config.reports {
        println!("📊 {} -> {}", report.kind, report.kind.table_name());
        for file in report.source_files() {
            let marker = if source.exists(&file) { "✅" } else { "❌ missing" };
            println!("  {} {}", file, marker);
        }
        if report.params.is_empty() {
            println!("  Params: (all columns)");
        } else {
            println!("  Params: {}", report.params.join(", "));
        }
        if report.kind.is_daily() {
            println!("  Daily differencing: {}", report.daily());
        }
        if report.kind.supports_crop_sequence() && report.crop_sequence() {
            println!("  Crop sequence: on");
        }
        if let Some(end) = report.run_end {
            println!("  Runs: {}..={}", report.run_start(), end);
        }
    }

    println!();
    println!("💾 Output Configuration:");
    println!("  Path: {}", config.output_path());
    if config.compress() {
        println!("  Archive: {}.zip", config.export_name());
    } else {
        println!("  Directory: {}", config.export_name());
    }

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");
}

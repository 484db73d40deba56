//! Inspect DSSAT inputs and outputs without running a full export.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use dssat_etl::dssat::daily::{extract_daily, DailyOptions};
use dssat_etl::dssat::data_cde::CodeBook;
use dssat_etl::dssat::dates;
use dssat_etl::dssat::efficiency::{nse, pair_series, r2, rmse};
use dssat_etl::dssat::observed::{parse_observed, read_observed_csv, ObservedData};
use dssat_etl::dssat::{parse_output, OutputFile};
use dssat_etl::dssat::soil::read_soil_profile;
use dssat_etl::utils::logger;
use dssat_etl::ReportKind;
use std::path::Path;
use std::process;

#[derive(Parser, Debug)]
#[command(name = "dssat-inspect")]
#[command(about = "Look up soils, codes and dates, or score a simulation against observations")]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print one profile from a *.SOL file
    Soil {
        file: String,
        soil_id: String,
        /// Print the profile block as written in the file
        #[arg(long)]
        raw: bool,
    },
    /// Look up variable codes in DATA.CDE
    Codes {
        file: String,
        codes: Vec<String>,
    },
    /// Convert between calendar dates and DSSAT YYDDD dates
    Date {
        /// YYYY-MM-DD, YYDDD or YYYYDDD
        value: String,
    },
    /// RMSE, NSE and R2 of a simulated variable against observed data
    Metrics {
        /// Simulated output, e.g. PlantGro.OUT
        output: String,
        /// Observed data (T-file or CSV)
        observed: String,
        #[arg(long)]
        param: String,
        #[arg(long, default_value = "plant_gro")]
        report: ReportKind,
        /// Compare cumulative variables as running totals
        #[arg(long)]
        cumulative: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    logger::init_cli_logger(cli.verbose);

    let result = match cli.command {
        Commands::Soil { file, soil_id, raw } => soil(&file, &soil_id, raw),
        Commands::Codes { file, codes } => lookup_codes(&file, &codes),
        Commands::Date { value } => convert_date(&value),
        Commands::Metrics {
            output,
            observed,
            param,
            report,
            cumulative,
        } => metrics(&output, &observed, &param, report, cumulative),
    };

    if let Err(e) = result {
        eprintln!("❌ {:#}", e);
        process::exit(1);
    }
}

fn read_text(path: &str) -> anyhow::Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

fn soil(path: &str, soil_id: &str, raw: bool) -> anyhow::Result<()> {
    let text = read_text(path)?;
    let profile = read_soil_profile(&file_name(path), &text, soil_id)?;

    if raw {
        print!("{}", profile.text);
        return Ok(());
    }

    println!("🌱 *{} {}", profile.id, profile.description);
    println!("  Site: {}", profile.site);
    for (column, value) in &profile.surface {
        println!("  {:>6} {}", column, value);
    }

    let columns = profile.layer_columns();
    println!();
    println!(
        "{}",
        columns
            .iter()
            .map(|c| format!("{:>7}", c))
            .collect::<String>()
    );
    for layer in &profile.layers {
        let line: String = columns
            .iter()
            .map(|c| match layer.get(c) {
                Some(value) => format!("{:>7}", value.to_string()),
                None => format!("{:>7}", ""),
            })
            .collect();
        println!("{}", line);
    }
    Ok(())
}

fn lookup_codes(path: &str, codes: &[String]) -> anyhow::Result<()> {
    let book = CodeBook::from_text(&read_text(path)?);
    if book.is_empty() {
        bail!("{} has no code entries", path);
    }

    if codes.is_empty() {
        for entry in book.entries() {
            println!("{:<7} {:<16} {}", entry.code, entry.label, entry.description);
        }
        return Ok(());
    }

    let mut missing = Vec::new();
    for code in codes {
        match book.get(code) {
            Some(entry) => println!("{:<7} {:<16} {}", entry.code, entry.label, entry.description),
            None => missing.push(code.as_str()),
        }
    }
    if !missing.is_empty() {
        bail!("unknown code(s): {}", missing.join(", "));
    }
    Ok(())
}

fn convert_date(value: &str) -> anyhow::Result<()> {
    if let Ok(date) = chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        println!("{}", dates::to_dssat_date(date));
        return Ok(());
    }
    let date = dates::from_dssat_date(value)?;
    println!("{}", date.format("%Y-%m-%d"));
    Ok(())
}

fn metrics(
    output: &str,
    observed: &str,
    param: &str,
    report: ReportKind,
    cumulative: bool,
) -> anyhow::Result<()> {
    if !report.is_daily() {
        bail!("{} is not a daily report", report);
    }

    let simulated = parse_output(&file_name(output), &read_text(output)?)?;

    let observed_name = file_name(observed);
    let observed_text = read_text(observed)?;
    let params = vec![param.to_string()];
    let observations = if observed_name.to_ascii_lowercase().ends_with(".csv") {
        read_observed_csv(&observed_name, &observed_text, Some(params.as_slice()))?
    } else {
        parse_observed(&observed_name, &observed_text, Some(params.as_slice()))?
    };

    let (obs, sim) = paired_values(&simulated, &observations, param, report, cumulative)?;
    tracing::debug!("{} matched pair(s) for {}", obs.len(), param);

    println!("📊 {} ({} pairs)", param, obs.len());
    println!("  RMSE: {:.4}", rmse(&obs, &sim)?);
    println!("  NSE:  {:.4}", nse(&obs, &sim)?);
    println!("  R2:   {:.4}", r2(&obs, &sim)?);
    Ok(())
}

/// Observed and simulated values of `param` on matching `(trno, date)`.
/// Cumulative variables are differenced unless `cumulative` is set.
fn paired_values(
    simulated: &OutputFile,
    observations: &ObservedData,
    param: &str,
    report: ReportKind,
    cumulative: bool,
) -> anyhow::Result<(Vec<f64>, Vec<f64>)> {
    let records = extract_daily(
        simulated,
        &[param.to_string()],
        report.cumulative_params(),
        DailyOptions {
            daily: !cumulative,
            crop_sequence: false,
        },
    )?;
    Ok(pair_series(observations, &records, param))
}

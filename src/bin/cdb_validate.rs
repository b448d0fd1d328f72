//! CLI validator for CircularDB files (cdb-validate)
//!
//! Scans the raw records of each database for out-of-order timestamps,
//! duplicate timestamps, and counter wraparounds.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use cdblib::{DataType, Database, OpenMode, ReadRequest};

#[derive(Parser)]
#[command(name = "cdb-validate")]
#[command(about = "Check CircularDB files for timestamp and counter defects", long_about = None)]
#[command(version)]
struct Cli {
    /// Database files to validate
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Render timestamps with this strftime-style format
    #[arg(
        short,
        long,
        default_value = "%Y-%m-%d %H:%M:%S"
    )]
    date_format: String,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let mut defects = false;
    for path in &cli.files {
        match validate(path, &cli.date_format) {
            Ok(clean) => defects |= !clean,
            Err(err) => {
                eprintln!("{}: {err}", path.display());
                defects = true;
            }
        }
    }

    if defects {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Scan one database. Returns true when no defects were found.
fn validate(path: &PathBuf, date_format: &str) -> cdblib::Result<bool> {
    println!("Working on: {}", path.display().to_string().bold());

    let mut db = Database::new(path, OpenMode::Read);
    db.read_header()?;

    if db.header().num_records == 0 {
        println!("No records for: {}", path.display());
        return Ok(true);
    }

    // Counter wraps only show up in the raw values.
    let request = ReadRequest {
        cooked: false,
        ..ReadRequest::default()
    };
    let (records, _) = db.read_records(&request)?;

    let is_counter = db.header().kind == DataType::Counter;

    let mut seen = BTreeSet::new();
    let mut duplicates = Vec::new();
    let mut bad_dates = Vec::new();
    let mut wraps = Vec::new();

    let mut prev_time: Option<i64> = None;
    let mut prev_value: Option<f64> = None;

    for record in &records {
        if !seen.insert(record.time) {
            duplicates.push(record.time);
        }

        if let Some(prev) = prev_time {
            if record.time < prev {
                bad_dates.push(record.time);
            }
        }

        if is_counter {
            if let Some(prev) = prev_value {
                if record.value < prev {
                    wraps.push((record.time, record.value, prev));
                }
            }
        }

        prev_time = Some(record.time);
        prev_value = Some(record.value);
    }

    report(&bad_dates, "out of order timestamps", date_format);
    report(&duplicates, "duplicate timestamps", date_format);

    if !wraps.is_empty() {
        println!(
            "{} DB has {} record(s) with counter wraps.",
            "Error:".red().bold(),
            wraps.len()
        );
        for (time, value, prev) in &wraps {
            println!("  [{}] {} : {value} < {prev}", time, format_time(*time, date_format));
        }
    }

    let clean = bad_dates.is_empty() && duplicates.is_empty() && wraps.is_empty();
    if clean {
        println!("{}", "OK".green());
    }
    println!();

    Ok(clean)
}

fn report(times: &[i64], what: &str, date_format: &str) {
    if times.is_empty() {
        return;
    }
    println!(
        "{} DB has {} record(s) with {what}.",
        "Error:".red().bold(),
        times.len()
    );
    for time in times {
        println!("  [{}] {}", time, format_time(*time, date_format));
    }
}

fn format_time(time: i64, date_format: &str) -> String {
    chrono::DateTime::from_timestamp(time, 0)
        .map(|dt| dt.format(date_format).to_string())
        .unwrap_or_else(|| "invalid".to_string())
}

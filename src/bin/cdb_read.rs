//! CLI reader for CircularDB files (cdb-read)

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use serde_json::json;

use cdblib::{CdbError, Database, OpenMode, Range, ReadRequest, Record};

#[derive(Parser)]
#[command(name = "cdb-read")]
#[command(about = "Print the header and records of CircularDB files", long_about = None)]
#[command(version)]
struct Cli {
    /// Database files to read
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Print records in addition to the header
    #[arg(short, long)]
    records: bool,

    /// Print raw stored values instead of cooked ones
    #[arg(long)]
    raw: bool,

    /// Window start (Unix seconds); 0 reads from the oldest record
    #[arg(short, long, default_value_t = 0)]
    start: i64,

    /// Window end (Unix seconds); 0 reads through the newest record
    #[arg(short, long, default_value_t = 0)]
    end: i64,

    /// Record count: positive takes the last N, negative the first N
    #[arg(short, long, default_value_t = 0)]
    count: i64,

    /// Average every STEP consecutive records into one
    #[arg(long, default_value_t = 0)]
    step: u32,

    /// Render timestamps with this strftime-style format
    #[arg(short, long)]
    date_format: Option<String>,

    /// Output format (json or text)
    #[arg(short, long, default_value = "text")]
    format: String,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let request = ReadRequest {
        start: cli.start,
        end: cli.end,
        count: cli.count,
        cooked: !cli.raw,
        step: cli.step,
    };

    let mut failed = false;
    for path in &cli.files {
        if let Err(err) = read_one(path, &cli, &request) {
            failed = true;
            match err {
                CdbError::BadToken => {
                    eprintln!("{}: not a CircularDB file (bad token)", path.display());
                }
                CdbError::BadVersion { found } => {
                    eprintln!(
                        "{}: incompatible CircularDB version [{found}]",
                        path.display()
                    );
                }
                other => eprintln!("{}: {other}", path.display()),
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn read_one(path: &PathBuf, cli: &Cli, request: &ReadRequest) -> cdblib::Result<()> {
    let mut db = Database::new(path, OpenMode::Read);
    db.read_header()?;

    let read = if cli.records {
        match db.read_records(request) {
            Ok(read) => Some(read),
            Err(CdbError::NoRecords) => None,
            Err(err) => return Err(err),
        }
    } else {
        None
    };

    if cli.format == "json" {
        print_json(&db, read.as_ref());
        return Ok(());
    }

    print_header(&db);

    if cli.records && read.is_none() {
        println!("No records for: {}", path.display());
    }

    if let Some((records, range)) = read {
        println!("{}", "============== Records ================".bold());
        for record in &records {
            print_record(record, cli.date_format.as_deref());
        }
        println!("{}", "============== Statistics =============".bold());
        println!("records: [{}]", range.num_recs);
        println!("mean:    [{:.8}]", range.mean);
        println!("median:  [{:.8}]", range.median);
        println!("sum:     [{:.8}]", range.sum);
        println!("min:     [{:.8}]", range.min);
        println!("max:     [{:.8}]", range.max);
        println!("stddev:  [{:.8}]", range.stddev);
    }

    Ok(())
}

fn print_header(db: &Database) {
    let header = db.header();
    println!("{}", "============== Header =================".bold());
    println!("name:         [{}]", header.name.cyan());
    println!("desc:         [{}]", header.desc);
    println!("units:        [{}]", header.units);
    println!("type:         [{}]", header.kind);
    println!("version:      [{}]", cdblib::VERSION);
    println!("max_records:  [{}]", header.max_records);
    println!("num_records:  [{}]", header.num_records);
    println!("start_record: [{}]", header.start_record);
    println!("interval:     [{}]", header.interval);
    if header.gating_enabled() {
        println!(
            "gating:       [{} .. {}]",
            header.min_value, header.max_value
        );
    }
}

fn print_record(record: &Record, date_format: Option<&str>) {
    match date_format {
        Some(format) if !format.is_empty() => {
            let formatted = chrono::DateTime::from_timestamp(record.time, 0)
                .map(|dt| dt.format(format).to_string())
                .unwrap_or_else(|| "invalid".to_string());
            println!("{} [{}] {:.8}", record.time, formatted, record.value);
        }
        _ => println!("{} {:.8}", record.time, record.value),
    }
}

fn print_json(db: &Database, read: Option<&(Vec<Record>, Range)>) {
    let header = db.header();
    let mut doc = json!({
        "path": db.path(),
        "header": header,
        "version": cdblib::VERSION,
    });
    if let Some((records, range)) = read {
        doc["records"] = json!(records);
        doc["statistics"] = json!(range);
    }
    println!("{doc}");
}

//! Cardiorisk: Heart-disease risk assessment.
//!
//! Command-line entry point. Reads one patient (JSON object) or many (JSON
//! array) from a file or stdin and prints an assessment for each. A record
//! that cannot be decoded is reported in its own slot; the rest still run.
//!
//! ```bash
//! cardiorisk [--json] <patients.json | ->
//! ```

use std::io::{IsTerminal, Read};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cardiorisk::adapters::sanitize::SanitizingMakeWriter;
use cardiorisk::application::assess_records;
use cardiorisk::config::AppConfig;
use cardiorisk::{load_artifacts, AssessmentResult, AssessmentService, CardioriskError, PatientInput};

const USAGE: &str = "Usage: cardiorisk [--json] <patients.json | ->";

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum Outcome<'a> {
    Assessment(&'a AssessmentResult),
    Error {
        message: &'static str,
        field: Option<&'static str>,
    },
}

impl<'a> Outcome<'a> {
    fn new(result: &'a cardiorisk::Result<AssessmentResult>) -> Self {
        match result {
            Ok(assessment) => Self::Assessment(assessment),
            Err(e) => Self::Error {
                message: e.user_message(),
                field: e.field(),
            },
        }
    }
}

struct Args {
    json: bool,
    input: String,
}

fn parse_args() -> Result<Args> {
    let mut json = false;
    let mut input = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--json" => json = true,
            "-h" | "--help" => bail!(USAGE),
            _ => {
                if input.replace(arg).is_some() {
                    bail!(USAGE);
                }
            }
        }
    }
    let input = input.context(USAGE)?;
    Ok(Args { json, input })
}

fn read_input(source: &str) -> Result<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(source).with_context(|| format!("Failed to read {source}"))
    }
}

/// Split the document into records, decoding each one on its own.
fn parse_patients(raw: &str) -> Result<Vec<cardiorisk::Result<PatientInput>>> {
    let document: Value = serde_json::from_str(raw).context("Input is not valid JSON")?;
    Ok(match document {
        Value::Array(records) => records.into_iter().map(PatientInput::from_value).collect(),
        record @ Value::Object(_) => vec![PatientInput::from_value(record)],
        _ => bail!("Input is not a patient object or array of patients"),
    })
}

fn print_text(results: &[cardiorisk::Result<AssessmentResult>]) {
    for (i, result) in results.iter().enumerate() {
        if i > 0 {
            println!("\n{}\n", "-".repeat(40));
        }
        match result {
            Ok(assessment) => println!("{}", assessment.render()),
            Err(e) => match e.field() {
                Some(field) => println!("{} (check: {field})", e.user_message()),
                None => println!("{}", e.user_message()),
            },
        }
    }
}

fn failure_detail(e: &CardioriskError) -> String {
    match e.field() {
        Some(field) => format!("field {field}"),
        None => "pipeline".to_string(),
    }
}

fn main() -> Result<ExitCode> {
    let args = parse_args()?;
    let config = AppConfig::from_env().context("Failed to read configuration")?;

    // Default behavior:
    // - interactive TTY: log to a file so the report stays readable
    // - non-interactive: log to stdout
    let interactive = std::io::stdout().is_terminal();
    let (writer, _guard) = if config.log_mode.use_file(interactive) {
        if let Some(parent) = config.log_file.parent() {
            // Best-effort: don't fail startup just because the directory is missing.
            let _ = std::fs::create_dir_all(parent);
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    tracing::info!("Starting Cardiorisk...");

    let artifacts = load_artifacts(&config.artifacts).context("Cannot start without model artifacts")?;
    let service = AssessmentService::from_artifacts(artifacts);

    let records = parse_patients(&read_input(&args.input)?)?;
    let results = assess_records(&service, records, config.workers);

    for (i, result) in results.iter().enumerate() {
        if let Err(e) = result {
            tracing::warn!("Patient #{} not assessed ({})", i + 1, failure_detail(e));
        }
    }

    if args.json {
        let outcomes: Vec<Outcome<'_>> = results.iter().map(Outcome::new).collect();
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    } else {
        print_text(&results);
    }

    let failed = results.iter().any(|r| r.is_err());
    tracing::info!("Cardiorisk finished.");
    Ok(if failed {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    })
}

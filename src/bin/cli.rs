use std::fs::{read, write};
use std::path::PathBuf;
use std::process::exit;
use std::str::FromStr;

use anyhow::{anyhow, Error, Result};
#[cfg(feature = "build-binary")]
use argh::FromArgs;

use fnv_esm_convert::{convert, verify};

/// How the conversion report is rendered once the plugin is written.
enum ReportFormat {
    Text,
    Json,
}

impl FromStr for ReportFormat {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" | "plain" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            _ => Err(anyhow!(
                "unknown report format {:?}, expected text or json",
                s
            )),
        }
    }
}

#[derive(FromArgs)]
/// Converts an Xbox 360 Fallout: New Vegas master file to the PC layout
struct Args {
    /// path to the Xbox 360 master file
    #[argh(positional)]
    input: PathBuf,
    /// path to write the converted PC plugin
    #[argh(option, short = 'o')]
    output: PathBuf,
    /// format of the conversion report (text or json)
    #[argh(option, short = 'f', default = "ReportFormat::Text")]
    format: ReportFormat,
    /// re-walk the output checking structural invariants
    #[argh(switch)]
    verify: bool,
    /// enable debug logging
    #[argh(switch, short = 'v')]
    verbose: bool,
}

fn main() {
    let args: Args = argh::from_env();
    stderrlog::new()
        .verbosity(if args.verbose { 3 } else { 1 })
        .init()
        .ok();

    let input = match read(&args.input) {
        Ok(contents) => contents,
        Err(error) => {
            eprintln!(
                "Failed to read master file {}: {}",
                &args.input.to_string_lossy(),
                error
            );
            exit(1);
        }
    };
    let conversion = match convert(&input) {
        Ok(conversion) => conversion,
        Err(error) => {
            eprintln!(
                "Failed to convert {}: {}",
                &args.input.to_string_lossy(),
                error
            );
            exit(1);
        }
    };
    if let Err(error) = write(&args.output, &conversion.output) {
        eprintln!(
            "Failed to write plugin {}: {}",
            &args.output.to_string_lossy(),
            error
        );
        exit(1);
    }

    match args.format {
        ReportFormat::Text => print!("{}", &conversion.stats),
        ReportFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&conversion.stats).unwrap()
        ),
    }

    if args.verify {
        let report = verify(&conversion.output);
        if !report.is_ok() {
            for error in &report.errors {
                eprintln!("verify: {}", error);
            }
            exit(1);
        }
        println!(
            "verified: {} groups, {} records",
            report.groups_checked, report.records_checked
        );
    }
}

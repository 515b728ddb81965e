//! Parsing Options.
//! `pn [-c config.toml] [-o report.json] [--dot DIR] [-f text|json] FILE...`

use clap::error::ErrorKind;
use clap::{Arg, ArgAction, Command};
use std::error::Error;
use std::path::PathBuf;

use crate::config::ReportFormat;

fn make_options_parser() -> clap::Command {
    Command::new("pn")
        .no_binary_name(true)
        .about("Boundedness analysis for place/transition nets")
        .version("v0.1.0")
        .arg(
            Arg::new("inputs")
                .value_name("FILE")
                .help("Net descriptions (.json or .ron)")
                .required(true)
                .num_args(1..)
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to the TOML configuration file")
                .default_value("pnbound.toml"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Write the JSON report to FILE instead of printing it"),
        )
        .arg(
            Arg::new("dot")
                .long("dot")
                .value_name("DIR")
                .help("Write one reachability graph per input to DIR"),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .help("Report format printed to stdout")
                .value_parser(["text", "json"]),
        )
}

#[derive(Debug)]
pub struct Options {
    pub inputs: Vec<PathBuf>,
    pub config: PathBuf,
    pub output: Option<PathBuf>,
    pub dot_dir: Option<PathBuf>,
    pub format: Option<ReportFormat>,
}

impl Options {
    pub fn parse_from_str(s: &str) -> Result<Self, Box<dyn Error>> {
        let flags = shellwords::split(s)?;
        Self::parse_from_args(&flags)
    }

    pub fn parse_from_args(flags: &[String]) -> Result<Self, Box<dyn Error>> {
        let app = make_options_parser();
        let matches = app.try_get_matches_from(flags.iter())?;

        let inputs = matches
            .get_many::<String>("inputs")
            .map(|values| values.map(PathBuf::from).collect())
            .unwrap_or_default();
        let config = matches
            .get_one::<String>("config")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("pnbound.toml"));
        let output = matches.get_one::<String>("output").map(PathBuf::from);
        let dot_dir = matches.get_one::<String>("dot").map(PathBuf::from);
        let format = match matches.get_one::<String>("format").map(String::as_str) {
            Some("text") => Some(ReportFormat::Text),
            Some("json") => Some(ReportFormat::Json),
            None => None,
            Some(_) => return Err("UnsupportedReportFormat")?,
        };

        Ok(Options {
            inputs,
            config,
            output,
            dot_dir,
            format,
        })
    }
}

/// clap 把 `--help` 和 `--version` 作为错误返回；它们的输出应正常打印。
pub fn informational_message(err: &(dyn Error + 'static)) -> Option<String> {
    let err = err.downcast_ref::<clap::Error>()?;
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => Some(err.to_string()),
        _ => None,
    }
}

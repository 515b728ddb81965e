use std::fs;

use anyhow::{Context, Result, anyhow};
use log::{debug, error};

use pnbound::batch::BatchSolver;
use pnbound::config::PnConfig;
use pnbound::options::{Options, informational_message};

fn main() {
    if std::env::var("PN_LOG").is_ok() {
        let e = env_logger::Env::new()
            .filter("PN_LOG")
            .write_style("PN_LOG_STYLE");
        env_logger::init_from_env(e);
    }

    if let Err(err) = run() {
        error!("{:#}", err);
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match Options::parse_from_args(&args) {
        Ok(options) => options,
        Err(err) => match informational_message(err.as_ref()) {
            Some(message) => {
                print!("{}", message);
                return Ok(());
            }
            None => return Err(anyhow!("{}", err)),
        },
    };
    debug!("PN options: {:?}", options);

    let config = PnConfig::load_from_file(&options.config)?;
    let format = options.format.unwrap_or(config.report_format);

    let mut batch = BatchSolver::new(options.inputs, config);
    if let Some(dir) = options.dot_dir {
        batch = batch.with_dot_dir(dir);
    }
    batch.solve();

    match options.output {
        Some(path) => {
            let json = batch.render(pnbound::config::ReportFormat::Json)?;
            fs::write(&path, json)
                .with_context(|| format!("Failed to write report: {:?}", path))?;
        }
        None => print!("{}", batch.render(format)?),
    }
    Ok(())
}

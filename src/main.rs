use std::{path::Path, process};

use anyhow::{Context, anyhow};
use log::{error, info};

use lae::{
    config::{Config, USAGE},
    engine::LinearAlgebraEngine,
    format,
    scheduling::RandFatigue,
};

fn main() {
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            let Some(output) = e.output() else {
                eprintln!("{e}\n{USAGE}");
                process::exit(1);
            };

            report(output, &e.to_string());
            return;
        }
    };

    if let Err(e) = run(&config) {
        report(config.output(), &format!("{e:#}"));
    }
}

fn run(config: &Config) -> anyhow::Result<()> {
    let mut root = format::read_file(config.input()).context("failed to read input")?;
    root.associative_nesting();

    let mut engine = match config.seed() {
        Some(seed) => LinearAlgebraEngine::with_fatigue(config.threads(), RandFatigue::seeded(seed)),
        None => LinearAlgebraEngine::new(config.threads()),
    }?;

    let rows = engine
        .run(root)?
        .into_matrix()
        .ok_or_else(|| anyhow!("the resolved root is not a matrix"))?;

    format::write_result(config.output(), &rows)?;
    info!(rows = rows.len(); "result written to {}", config.output().display());
    Ok(())
}

/// Writes `message` as the error document, exiting if even that fails.
fn report(output: &Path, message: &str) {
    error!("{message}");

    if let Err(e) = format::write_error(output, message) {
        eprintln!("failed to write error output: {e}");
        process::exit(1);
    }
}

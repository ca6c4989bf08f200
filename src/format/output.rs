use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use serde::Serialize;

use super::Result;

/// The outcome of a run as it's stored on disk.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum Outcome<'a> {
    Result(&'a [Vec<f64>]),
    Error(&'a str),
}

impl Outcome<'_> {
    fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}

/// Writes `{"result": rows}` to `path`, replacing its contents.
///
/// # Arguments
/// * `path` - The output document's path.
/// * `rows` - The resolved matrix, row-major.
pub fn write_result<P: AsRef<Path>>(path: P, rows: &[Vec<f64>]) -> Result<()> {
    Outcome::Result(rows).write_to(path)
}

/// Writes `{"error": message}` to `path`, replacing its contents.
///
/// # Arguments
/// * `path` - The output document's path.
/// * `message` - A human readable description of the failure.
pub fn write_error<P: AsRef<Path>>(path: P, message: &str) -> Result<()> {
    Outcome::Error(message).write_to(path)
}

//! CSV export for appliance time series.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::sim::{TIMESTAMP_FORMAT, TimeSeries};

/// Header of the table layout.
const HEADER: [&str; 2] = ["timestamp", "power"];

/// CSV layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CsvFormat {
    /// Headerless `timestamp,power` rows as read by player objects.
    #[default]
    Player,
    /// `timestamp,power` with a header row.
    Table,
}

impl FromStr for CsvFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "player" => Ok(Self::Player),
            "table" => Ok(Self::Table),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for CsvFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => f.write_str("player"),
            Self::Table => f.write_str("table"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unknown CSV format \"{0}\", expected \"player\" or \"table\"")]
    UnknownFormat(String),
    #[error("cannot write {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// File name used for an appliance's series.
pub fn file_name(appliance: &str) -> String {
    format!("{appliance}_consumption.csv")
}

/// Exports a series to `<dir>/<appliance>_consumption.csv`, creating `dir`
/// if needed.
///
/// # Arguments
///
/// * `series` - Series to write
/// * `appliance` - Appliance name used for the file name
/// * `dir` - Output directory
/// * `format` - CSV layout
///
/// # Errors
///
/// Returns an `ExportError` if the directory or file cannot be written.
pub fn export_csv(
    series: &TimeSeries,
    appliance: &str,
    dir: &Path,
    format: CsvFormat,
) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(file_name(appliance));
    let file = File::create(&path).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    write_csv(series, io::BufWriter::new(file), format)?;
    Ok(path)
}

/// Writes a series as CSV to any writer.
///
/// Power is written with one decimal place.
///
/// # Errors
///
/// Returns an `ExportError` if writing fails.
pub fn write_csv(
    series: &TimeSeries,
    writer: impl Write,
    format: CsvFormat,
) -> Result<(), ExportError> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    if format == CsvFormat::Table {
        wtr.write_record(HEADER)?;
    }

    for s in series {
        wtr.write_record(&[
            s.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            format!("{:.1}", s.power),
        ])?;
    }

    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

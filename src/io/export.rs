//! CSV export of the per-trial table and JSON export of the run report.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::error::SimError;
use crate::pipeline::TrialRow;
use crate::sim::report::RunReport;

/// Exports the per-trial completion table to a CSV file at the given path.
///
/// One row per candidate per trial in which the candidate completed at least
/// one clinical phase. Months of phases never completed are left empty.
///
/// # Errors
///
/// Returns a `SimError` if file creation or writing fails.
pub fn export_trials_csv(rows: &[TrialRow], path: &Path) -> Result<(), SimError> {
    let file = File::create(path)?;
    write_trials_csv(rows, io::BufWriter::new(file))
}

/// Writes the per-trial table as CSV to any writer.
///
/// The header is `trial,candidate,phase_i,phase_ii,phase_iii,approval`.
pub fn write_trials_csv(rows: &[TrialRow], writer: impl Write) -> Result<(), SimError> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the report as pretty-printed JSON to a file.
pub fn export_report_json(report: &RunReport, path: &Path) -> Result<(), SimError> {
    let file = File::create(path)?;
    write_report_json(report, io::BufWriter::new(file))
}

pub fn write_report_json(report: &RunReport, mut writer: impl Write) -> Result<(), SimError> {
    serde_json::to_writer_pretty(&mut writer, report)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

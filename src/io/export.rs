//! CSV export for the per-hour DR dispatch history.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::kpi::DispatchRecord;

/// Column header for the dispatch history export.
const HEADER: &str = "hour,event_start,reduction_needed_mwh,projected_load_mwh,\
                      hvac_mwh,ev_mwh,battery_mwh,flexibility_after_mwh";

/// Exports the dispatch history to a CSV file at the given path.
///
/// Writes a header row followed by one row per dispatched hour. Produces
/// deterministic output for identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_history_csv(records: &[DispatchRecord], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_history_csv(records, io::BufWriter::new(file))
}

/// Writes the dispatch history as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_history_csv(records: &[DispatchRecord], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for r in records {
        wtr.write_record(&[
            r.hour.to_string(),
            r.event_start.to_string(),
            format!("{:.4}", r.reduction_needed_mwh),
            format!("{:.4}", r.projected_load_mwh),
            format!("{:.4}", r.hvac_mwh),
            format!("{:.4}", r.ev_mwh),
            format!("{:.4}", r.battery_mwh),
            format!("{:.4}", r.flexibility_after_mwh),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hour: u32) -> DispatchRecord {
        DispatchRecord {
            hour,
            event_start: 17,
            reduction_needed_mwh: 3.0,
            projected_load_mwh: 44.7,
            hvac_mwh: 1.2,
            ev_mwh: 0.9,
            battery_mwh: 0.9,
            flexibility_after_mwh: 7.0,
        }
    }

    #[test]
    fn header_and_rows() {
        let mut buf = Vec::new();
        write_history_csv(&[record(17), record(18)], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("hour,event_start,reduction_needed_mwh"));
        assert_eq!(lines[1], "17,17,3.0000,44.7000,1.2000,0.9000,0.9000,7.0000");
    }

    #[test]
    fn empty_history_writes_header_only() {
        let mut buf = Vec::new();
        write_history_csv(&[], &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap().lines().count(), 1);
    }

    #[test]
    fn export_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        export_history_csv(&[record(17)], &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("17,17,3.0000"));
    }
}

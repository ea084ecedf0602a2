//! Raw series CSV.
//!
//! Columns: `timestamp,power,temperature` plus an optional `derivative`
//! column written by adaptive runs. Reading is header-driven, so column order
//! does not matter and extra columns are ignored.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use csv::StringRecord;
use log::debug;

use crate::domain::{RawSeries, Sample};
use crate::error::AppError;

const REQUIRED_COLUMNS: [&str; 3] = ["timestamp", "power", "temperature"];

/// Read a raw series CSV file.
pub fn read_series_csv(path: &Path) -> Result<RawSeries, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open series CSV '{}': {e}", path.display())))?;
    let series = read_series(file).map_err(|e| e.context(path.display()))?;
    debug!("read {} samples from {}", series.len(), path.display());
    Ok(series)
}

/// Parse a raw series from any CSV source.
///
/// Every row must carry finite values in the three required columns.
pub fn read_series<R: Read>(source: R) -> Result<RawSeries, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| AppError::io(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    for name in REQUIRED_COLUMNS {
        if !header_map.contains_key(name) {
            return Err(AppError::precondition(format!("Missing required column: `{name}`")));
        }
    }

    let mut series = RawSeries::new();
    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        let record = result.map_err(|e| AppError::io(format!("CSV parse error on line {line}: {e}")))?;
        let sample = Sample {
            timestamp: get_f64(&record, &header_map, "timestamp", line)?,
            power: get_f64(&record, &header_map, "power", line)?,
            temperature: get_f64(&record, &header_map, "temperature", line)?,
        };
        series.push(sample);
    }

    Ok(series)
}

/// Write a raw series CSV file, with an optional derivative column.
pub fn write_series_csv(path: &Path, series: &RawSeries, derivative: Option<&[f64]>) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create series CSV '{}': {e}", path.display())))?;
    write_series(BufWriter::new(file), series, derivative).map_err(|e| e.context(path.display()))
}

/// Write a raw series as CSV to any sink.
pub fn write_series<W: Write>(mut sink: W, series: &RawSeries, derivative: Option<&[f64]>) -> Result<(), AppError> {
    if let Some(d) = derivative
        && d.len() != series.len()
    {
        return Err(AppError::precondition(format!(
            "Derivative trace has {} values for {} samples.",
            d.len(),
            series.len()
        )));
    }

    let header = if derivative.is_some() {
        "timestamp,power,temperature,derivative"
    } else {
        "timestamp,power,temperature"
    };
    writeln!(sink, "{header}").map_err(|e| AppError::io(format!("Failed to write series CSV header: {e}")))?;

    for (i, s) in series.iter().enumerate() {
        let row = match derivative {
            Some(d) => writeln!(
                sink,
                "{:.6},{:.10e},{:.10e},{:.10e}",
                s.timestamp, s.power, s.temperature, d[i]
            ),
            None => writeln!(sink, "{:.6},{:.10e},{:.10e}", s.timestamp, s.power, s.temperature),
        };
        row.map_err(|e| AppError::io(format!("Failed to write series CSV row: {e}")))?;
    }

    sink.flush()
        .map_err(|e| AppError::io(format!("Failed to flush series CSV: {e}")))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase(), idx))
        .collect()
}

fn get_f64(record: &StringRecord, header_map: &HashMap<String, usize>, name: &str, line: usize) -> Result<f64, AppError> {
    let raw = header_map
        .get(name)
        .and_then(|idx| record.get(*idx))
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::precondition(format!("Line {line}: missing `{name}` value.")))?;
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(AppError::precondition(format!("Line {line}: invalid `{name}` value '{raw}'."))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn series() -> RawSeries {
        RawSeries::from_parts(vec![10.0, 10.5, 11.0], vec![0.0, 2.5, 2.5], vec![4.2, 4.25, 4.3]).unwrap()
    }

    #[test]
    fn written_csv_reads_back() {
        let mut buf = Vec::new();
        write_series(&mut buf, &series(), None).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with("timestamp,power,temperature\n"));
        assert_eq!(text.lines().count(), 4);

        let back = read_series(buf.as_slice()).unwrap();
        assert_eq!(back.len(), 3);
        assert_eq!(back.timestamps(), &[10.0, 10.5, 11.0]);
        assert_eq!(back.powers(), &[0.0, 2.5, 2.5]);
        assert_eq!(back.temperatures(), &[4.2, 4.25, 4.3]);
    }

    #[test]
    fn derivative_column_is_optional() {
        let mut buf = Vec::new();
        write_series(&mut buf, &series(), Some(&[0.0, 0.1, 0.1])).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with("timestamp,power,temperature,derivative\n"));
        assert_eq!(read_series(buf.as_slice()).unwrap().len(), 3);

        let err = write_series(Vec::new(), &series(), Some(&[0.0])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }

    #[test]
    fn columns_are_matched_by_name() {
        let csv = "\u{feff}Temperature, Power ,timestamp,note\n4.0,1.0,0.0,a\n4.5,1.0,0.1,b\n";
        let s = read_series(csv.as_bytes()).unwrap();
        assert_eq!(s.temperatures(), &[4.0, 4.5]);
        assert_eq!(s.powers(), &[1.0, 1.0]);
        assert_eq!(s.timestamps(), &[0.0, 0.1]);
    }

    #[test]
    fn missing_column_is_rejected() {
        let err = read_series("timestamp,power\n0,1\n".as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(err.message().contains("temperature"));
    }

    #[test]
    fn bad_value_reports_the_line() {
        let csv = "timestamp,power,temperature\n0,1,4\n0.1,x,4\n";
        let err = read_series(csv.as_bytes()).unwrap_err();
        assert!(err.message().contains("Line 3"), "{err}");

        let csv = "timestamp,power,temperature\n0,1,NaN\n";
        assert!(read_series(csv.as_bytes()).is_err());
    }
}

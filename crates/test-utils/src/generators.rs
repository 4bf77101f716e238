//! Generators for tide prediction files.

use std::io::Write;

use tempfile::NamedTempFile;

use crate::fixtures::TIDE_CSV_HEADER;

/// Build a tide CSV from `(datetime, value)` rows, e.g. `("2024/07/15 14:30", "1.23")`.
pub fn tide_csv(rows: &[(&str, &str)]) -> String {
    let mut csv = String::from(TIDE_CSV_HEADER);
    for (datetime, value) in rows {
        csv.push_str(datetime);
        csv.push(',');
        csv.push_str(value);
        csv.push('\n');
    }
    csv
}

/// Hourly rows for one date (`YYYY/MM/DD`) across the whole day.
///
/// Values follow a simple ramp so filtered output is easy to predict:
/// hour `h` has value `h / 10`.
pub fn hourly_tide_rows(date: &str) -> Vec<(String, String)> {
    (0..24)
        .map(|h| (format!("{} {:02}:00", date, h), format!("{:.2}", h as f64 / 10.0)))
        .collect()
}

/// Write a tide CSV to a temporary file that lives as long as the handle.
pub fn write_tide_csv(rows: &[(&str, &str)]) -> std::io::Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(tide_csv(rows).as_bytes())?;
    file.flush()?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tide_csv_has_seven_header_rows() {
        let csv = tide_csv(&[("2024/07/15 14:30", "1.23")]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[7], "2024/07/15 14:30,1.23");
    }

    #[test]
    fn test_hourly_rows() {
        let rows = hourly_tide_rows("2024/07/15");
        assert_eq!(rows.len(), 24);
        assert_eq!(rows[7], ("2024/07/15 07:00".to_string(), "0.70".to_string()));
    }

    #[test]
    fn test_write_tide_csv() {
        let file = write_tide_csv(&[("2024/07/15 07:00", "2.5")]).unwrap();
        let contents = std::fs::read_to_string(file.path()).unwrap();
        assert!(contents.ends_with("2024/07/15 07:00,2.5\n"));
    }
}

//! Column extraction from tabular grain measurements.
//!
//! Image-analysis tools (ImageJ and friends) export one row per grain section
//! with columns such as `Area`, `Perim.`, `Feret`. This module pulls a single
//! numeric column out of such a file and, when the column holds areas, turns
//! them into equivalent circular diameters.
//!
//! - `.csv` files are comma separated
//! - `.txt` files are tab separated (ImageJ "Save As > Results")

use std::f64::consts::PI;
use std::fs::File;
use std::path::Path;

use tracing::info;

use crate::error::{GrainError, Result};

/// Field delimiter implied by the file extension.
pub fn delimiter_for(path: &Path) -> Result<u8> {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("csv") => Ok(b','),
        Some("txt") => Ok(b'\t'),
        _ => Err(GrainError::invalid(format!(
            "'{}' is not a .txt or .csv file (or the extension is missing)",
            path.display()
        ))),
    }
}

/// Extract the numeric column `column` from a delimited text file.
pub fn extract_column(path: &Path, column: &str) -> Result<Vec<f64>> {
    let delimiter = delimiter_for(path)?;
    let file = File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader.headers()?.clone();
    let Some(idx) = headers.iter().position(|h| normalize_header_name(h) == column) else {
        let available: Vec<String> = headers.iter().map(normalize_header_name).collect();
        return Err(GrainError::invalid(format!(
            "column '{column}' not found in '{}' (available: {})",
            path.display(),
            available.join(", ")
        )));
    };

    let mut values = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        // +2: 1-based line numbers and the header line.
        let line = row + 2;
        let Some(cell) = record.get(idx) else {
            continue;
        };
        if cell.is_empty() {
            continue;
        }
        let value: f64 = cell.parse().map_err(|_| {
            GrainError::invalid(format!(
                "line {line}: '{cell}' in column '{column}' is not a number"
            ))
        })?;
        values.push(value);
    }

    if values.is_empty() {
        return Err(GrainError::degenerate(format!(
            "column '{column}' in '{}' has no values",
            path.display()
        )));
    }
    info!(path = %path.display(), column, n = values.len(), "column extracted");
    Ok(values)
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

/// Equivalent circular diameters `2·sqrt(A/π)` of sectional areas.
///
/// `boundary_correction` (grain-boundary width) is added to every diameter.
pub fn area_to_diameter(areas: &[f64], boundary_correction: Option<f64>) -> Result<Vec<f64>> {
    let correction = boundary_correction.unwrap_or(0.0);
    if !(correction.is_finite() && correction >= 0.0) {
        return Err(GrainError::invalid(format!(
            "boundary correction must be a non-negative scalar, got {correction}"
        )));
    }
    areas
        .iter()
        .map(|&a| {
            if !(a.is_finite() && a >= 0.0) {
                return Err(GrainError::invalid(format!(
                    "sectional areas must be finite and non-negative, got {a}"
                )));
            }
            Ok(2.0 * (a / PI).sqrt() + correction)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn reads_csv_column_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "grains.csv", "\u{feff}Area,Perim.\n12.5,10\n,3\n 7.0 ,9\n");
        assert_eq!(extract_column(&path, "Area").unwrap(), vec![12.5, 7.0]);
        assert_eq!(extract_column(&path, "Perim.").unwrap(), vec![10.0, 3.0, 9.0]);
    }

    #[test]
    fn reads_tab_separated_txt() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "results.txt", " \tArea\tFeret\n1\t4.0\t2.5\n2\t9.0\t3.5\n");
        assert_eq!(extract_column(&path, "Feret").unwrap(), vec![2.5, 3.5]);
    }

    #[test]
    fn reports_missing_column_and_bad_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "grains.csv", "Area\n1.0\nabc\n");
        let err = extract_column(&path, "Diameter").unwrap_err();
        assert!(matches!(err, GrainError::InvalidArgument(_)));
        let err = extract_column(&path, "Area").unwrap_err();
        assert!(err.to_string().contains("line 3"), "{err}");
    }

    #[test]
    fn unknown_extension_is_rejected() {
        assert!(matches!(
            delimiter_for(Path::new("grains.xlsx")),
            Err(GrainError::InvalidArgument(_))
        ));
        assert_eq!(delimiter_for(Path::new("GRAINS.CSV")).unwrap(), b',');
    }

    #[test]
    fn converts_areas_to_diameters() {
        let d = area_to_diameter(&[PI, 4.0 * PI], None).unwrap();
        assert_relative_eq!(d[0], 2.0);
        assert_relative_eq!(d[1], 4.0);
        let corrected = area_to_diameter(&[PI], Some(0.5)).unwrap();
        assert_relative_eq!(corrected[0], 2.5);
        assert!(area_to_diameter(&[-1.0], None).is_err());
        assert!(area_to_diameter(&[1.0], Some(-0.1)).is_err());
    }
}

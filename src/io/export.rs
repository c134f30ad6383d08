//! Export the Saltykov table (midpoints, 3D frequencies, cumulative volume).
//!
//! The export is meant to be easy to consume in spreadsheets or plotting scripts:
//! tab separated for `.txt`, comma separated for `.csv`.

use std::fs::File;
use std::path::Path;

use tracing::info;

use crate::domain::{Histogram, VolumeCurve};
use crate::error::{GrainError, Result};
use crate::io::ingest::delimiter_for;

/// Write one row per class: `mid_points` (3 dp), `freqs` (4 dp), `cum_vol` (2 dp).
pub fn write_saltykov_table(path: &Path, unfolded: &Histogram, volume: &VolumeCurve) -> Result<()> {
    let n = unfolded.bin_count();
    if volume.cumulative_volume_pct.len() != n {
        return Err(GrainError::invalid(format!(
            "volume curve has {} classes, histogram has {n}",
            volume.cumulative_volume_pct.len()
        )));
    }

    let delimiter = delimiter_for(path)?;
    let file = File::create(path)?;
    let mut writer = csv::WriterBuilder::new().delimiter(delimiter).from_writer(file);

    writer.write_record(["mid_points", "freqs", "cum_vol"])?;
    for i in 0..n {
        writer.write_record([
            format!("{:.3}", unfolded.midpoints[i]),
            format!("{:.4}", unfolded.frequencies[i]),
            format!("{:.2}", volume.cumulative_volume_pct[i]),
        ])?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = n, "Saltykov table written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> (Histogram, VolumeCurve) {
        let hist = Histogram {
            bin_width: 10.0,
            left_edges: vec![0.0, 10.0],
            midpoints: vec![5.0, 15.0],
            frequencies: vec![0.03456789, 0.06543211],
        };
        let volume = VolumeCurve {
            midpoints: hist.midpoints.clone(),
            volume_per_class: vec![1.0, 2.0],
            cumulative_volume_pct: vec![33.33333, 100.0],
        };
        (hist, volume)
    }

    #[test]
    fn writes_rounded_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saltykov.csv");
        let (hist, volume) = table();
        write_saltykov_table(&path, &hist, &volume).unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines[0], "mid_points,freqs,cum_vol");
        assert_eq!(lines[1], "5.000,0.0346,33.33");
        assert_eq!(lines[2], "15.000,0.0654,100.00");
    }

    #[test]
    fn txt_is_tab_separated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saltykov.txt");
        let (hist, volume) = table();
        write_saltykov_table(&path, &hist, &volume).unwrap();
        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.starts_with("mid_points\tfreqs\tcum_vol\n"));
    }

    #[test]
    fn other_extensions_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (hist, volume) = table();
        let err = write_saltykov_table(&dir.path().join("out.json"), &hist, &volume).unwrap_err();
        assert!(matches!(err, GrainError::InvalidArgument(_)));
    }
}

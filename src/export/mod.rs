//! Export of nowcast trajectories.
//!
//! Supports 16-bit PNG frames for inspection, RAW stacks for numeric
//! post-processing and a JSON manifest tying frames to timestamps.

mod png;
mod raw;

pub use png::{export_field_png, export_trajectory_png, PngExportOptions};
pub use raw::{expected_file_size, export_field_raw, export_trajectory_raw, RawFormat};

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::pipeline::NowcastOutput;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid value range: min ({0}) >= max ({1})")]
    InvalidRange(f64, f64),
}

/// Output file layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Raw,
}

#[derive(Serialize)]
struct Manifest<'a> {
    rows: usize,
    cols: usize,
    frames: usize,
    timestamps: &'a [DateTime<Utc>],
    trajectories: [&'static str; 3],
}

/// Writes the three trajectories plus `manifest.json` into `output_dir`.
pub fn export_output(output: &NowcastOutput, output_dir: &Path, format: ExportFormat) -> Result<(), ExportError> {
    std::fs::create_dir_all(output_dir)?;
    let named = [
        ("analysis", &output.analysis),
        ("background", &output.background),
        ("advected", &output.advected),
    ];

    match format {
        ExportFormat::Png => {
            let options = PngExportOptions::default();
            for (name, trajectory) in named {
                export_trajectory_png(trajectory, output_dir, name, &options)?;
            }
        }
        ExportFormat::Raw => {
            for (name, trajectory) in named {
                let path = output_dir.join(format!("{}.r32", name));
                export_trajectory_raw(trajectory, &path, RawFormat::R32Float, 0.0, 1.0)?;
            }
        }
    }

    let (rows, cols) = output.analysis.last().map(|f| f.dim()).unwrap_or((0, 0));
    let manifest = Manifest {
        rows,
        cols,
        frames: output.timestamps.len(),
        timestamps: &output.timestamps,
        trajectories: ["analysis", "background", "advected"],
    };
    let writer = BufWriter::new(File::create(output_dir.join("manifest.json"))?);
    serde_json::to_writer_pretty(writer, &manifest)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Trajectory;
    use chrono::Duration;
    use ndarray::Array2;
    use tempfile::tempdir;

    fn output() -> NowcastOutput {
        let t0 = DateTime::from_timestamp(1_397_590_200, 0).unwrap();
        let field = Array2::from_elem((5, 7), 0.6);
        NowcastOutput {
            analysis: Trajectory::new(field.clone()),
            background: Trajectory::new(field.clone()),
            advected: Trajectory::new(field),
            timestamps: vec![t0, t0 + Duration::minutes(5)],
        }
    }

    #[test]
    fn test_export_output_png_and_manifest() {
        let dir = tempdir().unwrap();
        export_output(&output(), dir.path(), ExportFormat::Png).unwrap();
        assert!(dir.path().join("analysis_000.png").exists());
        assert!(dir.path().join("advected_000.png").exists());

        let text = std::fs::read_to_string(dir.path().join("manifest.json")).unwrap();
        let manifest: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(manifest["rows"], 5);
        assert_eq!(manifest["cols"], 7);
        assert_eq!(manifest["timestamps"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_export_output_raw() {
        let dir = tempdir().unwrap();
        export_output(&output(), dir.path(), ExportFormat::Raw).unwrap();
        let size = std::fs::metadata(dir.path().join("background.r32")).unwrap().len();
        assert_eq!(size, expected_file_size(5, 7, 1, RawFormat::R32Float));
    }
}

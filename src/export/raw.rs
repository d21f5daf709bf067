//! RAW binary export of clear-sky index fields.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::ExportError;
use crate::grid::ScalarField;
use crate::pipeline::Trajectory;

/// RAW sample layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RawFormat {
    /// 16-bit unsigned, little-endian, scaled from a value range.
    #[default]
    R16LittleEndian,
    /// 16-bit unsigned, big-endian, scaled from a value range.
    R16BigEndian,
    /// 32-bit float, little-endian, unscaled.
    R32Float,
}

/// Writes one field, row-major. `min`/`max` are ignored for `R32Float`.
pub fn export_field_raw(
    field: &ScalarField,
    path: &Path,
    format: RawFormat,
    min: f64,
    max: f64,
) -> Result<(), ExportError> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_field(&mut writer, field, format, min, max)?;
    writer.flush()?;
    Ok(())
}

/// Writes all frames of a trajectory back to back into one file.
pub fn export_trajectory_raw(
    trajectory: &Trajectory,
    path: &Path,
    format: RawFormat,
    min: f64,
    max: f64,
) -> Result<(), ExportError> {
    let mut writer = BufWriter::new(File::create(path)?);
    for field in trajectory.frames() {
        write_field(&mut writer, field, format, min, max)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_field<W: Write>(
    writer: &mut W,
    field: &ScalarField,
    format: RawFormat,
    min: f64,
    max: f64,
) -> Result<(), ExportError> {
    if format != RawFormat::R32Float && !(min < max) {
        return Err(ExportError::InvalidRange(min, max));
    }
    let range = max - min;
    let scale = |v: f64| (((v - min) / range).clamp(0.0, 1.0) * 65535.0) as u16;

    match format {
        RawFormat::R16LittleEndian => {
            for &v in field.iter() {
                writer.write_all(&scale(v).to_le_bytes())?;
            }
        }
        RawFormat::R16BigEndian => {
            for &v in field.iter() {
                writer.write_all(&scale(v).to_be_bytes())?;
            }
        }
        RawFormat::R32Float => {
            for &v in field.iter() {
                writer.write_all(&(v as f32).to_le_bytes())?;
            }
        }
    }
    Ok(())
}

/// Bytes written for `frames` fields of `rows × cols`.
pub fn expected_file_size(rows: usize, cols: usize, frames: usize, format: RawFormat) -> u64 {
    let samples = (rows * cols * frames) as u64;
    match format {
        RawFormat::R16LittleEndian | RawFormat::R16BigEndian => samples * 2,
        RawFormat::R32Float => samples * 4,
    }
}

//! PNG export of clear-sky index fields.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageBuffer, ImageEncoder, Luma};

use super::ExportError;
use crate::grid::{field_range, ScalarField};
use crate::pipeline::Trajectory;

/// Options for PNG export.
#[derive(Debug, Clone)]
pub struct PngExportOptions {
    /// Value mapped to black.
    pub min_value: f64,
    /// Value mapped to white.
    pub max_value: f64,
    pub compression: CompressionType,
    pub filter: FilterType,
}

impl Default for PngExportOptions {
    fn default() -> Self {
        // Clear-sky index rarely leaves [0, 1.2].
        Self {
            min_value: 0.0,
            max_value: 1.2,
            compression: CompressionType::Default,
            filter: FilterType::Adaptive,
        }
    }
}

impl PngExportOptions {
    /// Options stretched to the value range of `field`.
    pub fn auto_range(field: &ScalarField) -> Self {
        let (min, max) = field_range(field);
        Self {
            min_value: min,
            max_value: max,
            ..Default::default()
        }
    }
}

/// Writes a field as a 16-bit grayscale PNG, row 0 at the top.
pub fn export_field_png(field: &ScalarField, path: &Path, options: &PngExportOptions) -> Result<(), ExportError> {
    let min = options.min_value;
    let max = options.max_value;
    if !(min < max) {
        return Err(ExportError::InvalidRange(min, max));
    }
    let (rows, cols) = field.dim();
    let range = max - min;

    let mut img: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::new(cols as u32, rows as u32);
    for ((r, c), &v) in field.indexed_iter() {
        let normalized = ((v - min) / range).clamp(0.0, 1.0);
        img.put_pixel(c as u32, r as u32, Luma([(normalized * 65535.0) as u16]));
    }

    let writer = BufWriter::new(File::create(path)?);
    let encoder = PngEncoder::new_with_quality(writer, options.compression, options.filter);
    let bytes: &[u8] = bytemuck::cast_slice(img.as_raw());
    encoder.write_image(bytes, cols as u32, rows as u32, image::ExtendedColorType::L16)?;
    Ok(())
}

/// Writes every frame of a trajectory as `{base_name}_{index:03}.png`.
pub fn export_trajectory_png(
    trajectory: &Trajectory,
    output_dir: &Path,
    base_name: &str,
    options: &PngExportOptions,
) -> Result<(), ExportError> {
    std::fs::create_dir_all(output_dir)?;
    for (i, field) in trajectory.frames().iter().enumerate() {
        let path = output_dir.join(format!("{}_{:03}.png", base_name, i));
        export_field_png(field, &path, options)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use tempfile::tempdir;

    fn gradient() -> ScalarField {
        Array2::from_shape_fn((12, 20), |(r, c)| (r + c) as f64 / 30.0)
    }

    #[test]
    fn test_export_field_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("field.png");
        export_field_png(&gradient(), &path, &PngExportOptions::default()).unwrap();

        let img = image::open(&path).unwrap();
        assert_eq!(img.width(), 20);
        assert_eq!(img.height(), 12);
    }

    #[test]
    fn test_export_trajectory_png() {
        let mut trajectory = Trajectory::new(gradient());
        trajectory.record(gradient());
        trajectory.record(gradient());
        let dir = tempdir().unwrap();
        export_trajectory_png(&trajectory, dir.path(), "analysis", &PngExportOptions::default()).unwrap();
        for i in 0..3 {
            assert!(dir.path().join(format!("analysis_{:03}.png", i)).exists());
        }
    }

    #[test]
    fn test_invalid_range() {
        let dir = tempdir().unwrap();
        let options = PngExportOptions {
            min_value: 1.0,
            max_value: 1.0,
            ..Default::default()
        };
        let result = export_field_png(&gradient(), &dir.path().join("x.png"), &options);
        assert!(matches!(result, Err(ExportError::InvalidRange(_, _))));
    }

    #[test]
    fn test_auto_range() {
        let options = PngExportOptions::auto_range(&gradient());
        assert_eq!(options.min_value, 0.0);
        assert!((options.max_value - 30.0 / 30.0).abs() < 1e-12);
    }
}

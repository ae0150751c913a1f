//! Vertical resampling for non-square pixels.
//!
//! Scanned documents routinely declare different X and Y resolutions; the
//! raster is stretched to square pixels so downstream consumers never see the
//! anisotropy.

use crate::raster::{Raster, BYTES_PER_PIXEL};

/// Resolutions within this fraction of square are treated as rounding noise.
const RATIO_TOLERANCE: f64 = 0.05;

/// A resolution tag value as a ratio; degenerate values fall back to 1.0.
pub(crate) fn resolution_value(rational: Option<(u32, u32)>) -> f64 {
    match rational {
        Some((numerator, denominator)) if numerator != 0 && denominator != 0 => {
            f64::from(numerator) / f64::from(denominator)
        }
        _ => 1.0,
    }
}

/// Stretches the raster vertically when the pixel aspect ratio is off square.
///
/// Returns the input unchanged when the ratio deviates 5% or less.
pub(crate) fn correct_aspect_ratio(raster: Raster, x_res: f64, y_res: f64) -> Raster {
    let ratio = x_res / y_res;
    if !ratio.is_finite() || (ratio - 1.0).abs() <= RATIO_TOLERANCE {
        return raster;
    }

    let width = raster.width() as usize;
    let height = raster.height() as usize;
    let new_height = (height as f64 * ratio).round() as usize;
    if new_height == 0 || new_height == height {
        return raster;
    }

    let src = raster.data();
    let row_bytes = width * BYTES_PER_PIXEL;
    let mut out = vec![0u8; row_bytes * new_height];

    for y in 0..new_height {
        let src_y = y as f64 / ratio;
        let y0 = (src_y.floor() as usize).min(height - 1);
        let y1 = (y0 + 1).min(height - 1);
        let frac = src_y - src_y.floor();

        let row0 = &src[y0 * row_bytes..(y0 + 1) * row_bytes];
        let row1 = &src[y1 * row_bytes..(y1 + 1) * row_bytes];
        let dst = &mut out[y * row_bytes..(y + 1) * row_bytes];
        for i in 0..row_bytes {
            let blended = f64::from(row0[i]) * (1.0 - frac) + f64::from(row1[i]) * frac;
            dst[i] = blended.round() as u8;
        }
    }

    Raster::from_bgra(width as u32, new_height as u32, out)
        .expect("resampled buffer matches its dimensions")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_rows(rows: &[u8], width: u32) -> Raster {
        let mut data = Vec::new();
        for &v in rows {
            for _ in 0..width {
                data.extend_from_slice(&[v, v, v, 0xFF]);
            }
        }
        Raster::from_bgra(width, rows.len() as u32, data).unwrap()
    }

    #[test]
    fn near_square_ratio_is_a_no_op() {
        let raster = gray_rows(&[0, 100, 200], 2);
        let out = correct_aspect_ratio(raster.clone(), 72.0, 71.0);
        assert_eq!(out, raster);
    }

    #[test]
    fn degenerate_resolutions_default_to_square() {
        assert_eq!(resolution_value(None), 1.0);
        assert_eq!(resolution_value(Some((72, 0))), 1.0);
        assert_eq!(resolution_value(Some((0, 1))), 1.0);
        assert_eq!(resolution_value(Some((150, 2))), 75.0);
    }

    #[test]
    fn doubling_interpolates_between_rows() {
        let raster = gray_rows(&[0, 100], 1);
        let out = correct_aspect_ratio(raster, 144.0, 72.0);
        assert_eq!(out.height(), 4);
        assert_eq!(out.pixel(0, 0).unwrap()[0], 0);
        assert_eq!(out.pixel(0, 1).unwrap()[0], 50);
        assert_eq!(out.pixel(0, 2).unwrap()[0], 100);
        // Last row clamps to the final source row instead of reading past it.
        assert_eq!(out.pixel(0, 3).unwrap()[0], 100);
    }

    #[test]
    fn shrinking_halves_the_height() {
        let raster = gray_rows(&[0, 50, 100, 150], 2);
        let out = correct_aspect_ratio(raster, 72.0, 144.0);
        assert_eq!(out.height(), 2);
        assert_eq!(out.width(), 2);
        assert_eq!(out.pixel(0, 0).unwrap()[0], 0);
        assert_eq!(out.pixel(0, 1).unwrap()[0], 100);
    }
}

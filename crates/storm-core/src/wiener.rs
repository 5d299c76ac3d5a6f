//! Wiener filter construction: average power spectrum across the stack,
//! estimate the noise floor from the high-frequency ring, and derive
//! the real-valued half-spectrum mask the FFT filter multiplies by.

use ndarray::Array2;

use crate::consts::{EPSILON, MIN_FRAME_DIMENSION, NOISE_RING_MARGIN};
use crate::error::{Result, StormError};
use crate::fft::FftFilter;
use crate::io::FrameSource;

/// Move the DC component from `(0, 0)` to the spectrum's centre (mirrors the
/// original's `moveDCToCenter`), operating on a full-width power array.
fn move_dc_to_center(src: &Array2<f64>) -> Array2<f64> {
    let (h, w) = src.dim();
    let mut dst = Array2::<f64>::zeros((h, w));
    let cy = h / 2;
    let cx = w / 2;
    for y in 0..h {
        for x in 0..w {
            dst[[(y + cy) % h, (x + cx) % w]] = src[[y, x]];
        }
    }
    dst
}

/// Inverse of [`move_dc_to_center`]: move the DC component back to `(0, 0)`.
fn move_dc_to_upper_left(src: &Array2<f32>) -> Array2<f32> {
    let (h, w) = src.dim();
    let mut dst = Array2::<f32>::zeros((h, w));
    let cy = h / 2;
    let cx = w / 2;
    for y in 0..h {
        for x in 0..w {
            dst[[y, x]] = src[[(y + cy) % h, (x + cx) % w]];
        }
    }
    dst
}

/// Reconstruct the full (W x H) power spectrum from the half-spectrum FFT
/// output via conjugate symmetry: `PS(W-u, H-v) == PS(u, v)`.
fn full_power_spectrum(half: &Array2<num_complex::Complex32>, width: usize, height: usize) -> Array2<f64> {
    let half_w = half.ncols();
    let mut full = Array2::<f64>::zeros((height, width));
    for y in 0..height {
        for x in 0..width {
            let mag_sq = if x < half_w {
                let c = half[[y, x]];
                (c.re as f64).powi(2) + (c.im as f64).powi(2)
            } else {
                let sx = (width - x) % width;
                let sy = (height - y) % height;
                let c = half[[sy, sx]];
                (c.re as f64).powi(2) + (c.im as f64).powi(2)
            };
            full[[y, x]] = mag_sq;
        }
    }
    full
}

/// Average the power spectrum of every frame in `source`, streaming frames
/// one at a time so the whole stack never needs to be resident (mirrors the
/// original's per-frame `readBlock` loop in its `MyImportInfo` overload).
pub fn average_power_spectrum(
    source: &mut dyn FrameSource,
    fft: &FftFilter,
) -> Result<Array2<f64>> {
    let (w, h, n) = source.shape();
    if n == 0 {
        return Err(StormError::EmptySequence);
    }
    let mut ps = Array2::<f64>::zeros((h as usize, w as usize));
    for i in 0..n {
        let frame = source.read_block(0, 0, i, w, h, 1)?.into_iter().next().unwrap();
        let half = fft.forward_complex(&frame.data);
        let full = full_power_spectrum(&half, w as usize, h as usize);
        ps += &full;
    }
    ps /= n as f64;
    Ok(move_dc_to_center(&ps))
}

/// Mean power in the outer ring `x<10 || x>=W-10 || y<10 || y>=H-10` of a
/// DC-centred power spectrum — the high-frequency noise-floor estimate.
/// Frames below [`MIN_FRAME_DIMENSION`] are rejected rather than silently
/// degenerating.
pub fn estimate_noise_power(ps_centered: &Array2<f64>) -> Result<f64> {
    let (h, w) = ps_centered.dim();
    if w < MIN_FRAME_DIMENSION || h < MIN_FRAME_DIMENSION {
        return Err(StormError::ShapeMismatch(format!(
            "frame {w}x{h} is too small for the {NOISE_RING_MARGIN}-pixel noise ring"
        )));
    }
    let m = NOISE_RING_MARGIN;
    let mut ring_sum = 0.0f64;
    for y in 0..h {
        for x in 0..w {
            let interior = y >= m && y < h - m && x >= m && x < w - m;
            if !interior {
                ring_sum += ps_centered[[y, x]];
            }
        }
    }
    let ring_pixels = (w * h) as f64 - ((w - 2 * m) * (h - 2 * m)) as f64;
    Ok(ring_sum / ring_pixels)
}

/// Build the Wiener mask `H(u,v) = max(0, PS(u,v) - noise) / PS(u,v)` and
/// move the DC component back to the upper-left, ready to multiply against
/// the FFT filter's half-spectrum output.
pub fn construct_wiener_filter(ps_centered: &Array2<f64>, noise: f64) -> Array2<f32> {
    let (h, w) = ps_centered.dim();
    let mut mask_full = Array2::<f32>::zeros((h, w));
    for y in 0..h {
        for x in 0..w {
            let ps = ps_centered[[y, x]];
            let numerator = ps - noise;
            mask_full[[y, x]] = if numerator > 0.0 && ps.abs() > EPSILON as f64 {
                (numerator / ps) as f32
            } else {
                0.0
            };
        }
    }
    move_dc_to_upper_left(&mask_full)
}

/// Resample a loaded single-channel filter image (already `f32`, upper-left
/// DC not assumed) to the target `(width, height)` using the same
/// un-prefiltered cubic spline as the ROI refiner.
pub fn resample_filter_image(image: &Array2<f32>, width: usize, height: usize) -> Array2<f32> {
    use crate::spline::SplineImageView;
    let (src_h, src_w) = image.dim();
    if (src_w, src_h) == (width, height) {
        return image.clone();
    }
    let flat: Vec<f32> = image.iter().cloned().collect();
    let view = SplineImageView::new(&flat, src_w, src_h);
    let mut out = Array2::<f32>::zeros((height, width));
    let sx = src_w as f64 / width as f64;
    let sy = src_h as f64 / height as f64;
    for y in 0..height {
        for x in 0..width {
            out[[y, x]] = view.value((x as f64 + 0.5) * sx - 0.5, (y as f64 + 0.5) * sy - 0.5) as f32;
        }
    }
    out
}

/// Extract the left half (`floor(W/2)+1` columns) of a full-width mask, the
/// shape the FFT filter's `apply_fourier_filter` expects.
pub fn half_spectrum_mask(full: &Array2<f32>) -> Array2<f32> {
    let (h, w) = full.dim();
    let half_w = w / 2 + 1;
    let mut out = Array2::<f32>::zeros((h, half_w));
    for y in 0..h {
        for x in 0..half_w {
            out[[y, x]] = full[[y, x]];
        }
    }
    out
}

/// Build the Wiener mask from a frame source's own statistics.
pub fn build_from_data(source: &mut dyn FrameSource, fft: &FftFilter) -> Result<Array2<f32>> {
    let ps = average_power_spectrum(source, fft)?;
    let noise = estimate_noise_power(&ps)?;
    let full = construct_wiener_filter(&ps, noise);
    Ok(half_spectrum_mask(&full))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dc_round_trips_through_center_moves() {
        let mut ps = Array2::<f64>::zeros((8, 8));
        ps[[0, 0]] = 42.0;
        let centered = move_dc_to_center(&ps);
        assert_eq!(centered[[4, 4]], 42.0);
    }

    #[test]
    fn mask_is_zero_when_noise_dominates() {
        let ps = Array2::<f64>::from_elem((40, 40), 1.0);
        let mask = construct_wiener_filter(&ps, 2.0);
        assert!(mask.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn mask_approaches_one_far_above_noise() {
        let mut ps = Array2::<f64>::from_elem((40, 40), 1.0);
        ps[[0, 0]] = 1_000_000.0;
        let mask = construct_wiener_filter(&ps, 1.0);
        assert!(mask[[0, 0]] > 0.99);
    }

    #[test]
    fn rejects_frames_smaller_than_noise_ring() {
        let ps = Array2::<f64>::zeros((10, 10));
        assert!(estimate_noise_power(&ps).is_err());
    }
}

//! ROI refinement: for each coarse candidate, extract a small region
//! around it, up-sample by the integer `factor` using the un-prefiltered
//! cubic B-spline kernel bank, and find sub-pixel maxima strictly
//! interior to the up-sampled ROI. Mirrors the original's inner loop over
//! `maxima_candidates_vect` in `wienerStormSingleFrame`.

use ndarray::Array2;

use crate::detect::Candidate;
use crate::localization::{FrameLocalizationSet, Localization};
use crate::resample::{apply_periodic, build_kernel_bank};

/// Clamp `[lo, lo+len)` to `[0, bound)`, returning the clamped bounds and how
/// much they moved relative to the unclamped window (the original's
/// `xxl_ul`/`xxl_lr` offset bookkeeping in up-sampled pixels).
fn clamp_window(lo: i64, len: i64, bound: i64) -> (i64, i64) {
    let clamped_lo = lo.max(0);
    let clamped_hi = (lo + len).min(bound);
    (clamped_lo, clamped_hi)
}

/// Extract the clipped ROI as a fresh contiguous buffer, row-major.
fn extract_roi(data: &Array2<f32>, x0: usize, y0: usize, w: usize, h: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(w * h);
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            out.push(data[[y, x]]);
        }
    }
    out
}

/// Separable up-sampling of a `(h, w)` row-major buffer by integer `factor`,
/// producing a `(factor*(h-1)+1, factor*(w-1)+1)` buffer: rows first, then
/// columns, each via the periodic kernel bank built for ratio `factor:1`.
fn upsample_separable(data: &[f32], w: usize, h: usize, factor: u32) -> (Vec<f32>, usize, usize) {
    let factor = factor as usize;
    let bank = build_kernel_bank(factor, 1);
    let out_w = (w - 1) * factor + 1;
    let out_h = (h - 1) * factor + 1;

    // Up-sample each row to out_w columns.
    let mut rows_expanded = vec![0f32; h * out_w];
    for y in 0..h {
        let row = &data[y * w..(y + 1) * w];
        let expanded = apply_periodic(row, &bank, factor, 1);
        rows_expanded[y * out_w..y * out_w + out_w].copy_from_slice(&expanded);
    }

    // Up-sample each column of the row-expanded buffer to out_h rows.
    let mut out = vec![0f32; out_w * out_h];
    for x in 0..out_w {
        let col: Vec<f32> = (0..h).map(|y| rows_expanded[y * out_w + x]).collect();
        let expanded = apply_periodic(&col, &bank, factor, 1);
        for (y, v) in expanded.into_iter().enumerate() {
            out[y * out_w + x] = v;
        }
    }

    (out, out_w, out_h)
}

/// Strict 8-neighbour local maxima above `threshold`, restricted to the
/// rectangle interior to a `border`-wide margin on every side — the
/// "exclude a one-factor-wide border" rule.
fn interior_maxima(
    data: &[f32],
    w: usize,
    h: usize,
    border: usize,
    threshold: f32,
) -> Vec<(usize, usize, f32)> {
    let mut out = Vec::new();
    if w <= 2 * border || h <= 2 * border {
        return out;
    }
    for y in border..h - border {
        for x in border..w - border {
            let centre = data[y * w + x];
            if centre <= threshold {
                continue;
            }
            let mut is_max = true;
            'nb: for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    if dy == 0 && dx == 0 {
                        continue;
                    }
                    let ny = (y as i32 + dy) as usize;
                    let nx = (x as i32 + dx) as usize;
                    if data[ny * w + nx] >= centre {
                        is_max = false;
                        break 'nb;
                    }
                }
            }
            if is_max {
                out.push((x, y, centre));
            }
        }
    }
    out
}

/// Refine every coarse `candidates` against `filtered` — the
/// background-subtracted, Wiener-filtered frame (the original's `filtered`
/// after `subtractBackground` overwrites it with `filtered - bg` in place) —
/// rejecting low-signal candidates and up-sampling the rest, then insert the
/// surviving sub-pixel maxima into `out`.
///
/// `background`/`baseline` come from the same [`crate::background::subtract_background`]
/// call that produced `filtered` (i.e. `background` is its `background` field
/// and `filtered` is its `corrected` field); `roi_len` is the nominal (odd)
/// ROI edge length before clamping to the frame border.
#[allow(clippy::too_many_arguments)]
pub fn refine_candidates(
    filtered: &Array2<f32>,
    background: &Array2<f32>,
    baseline: f32,
    candidates: &[Candidate],
    factor: u32,
    roi_len: u32,
    threshold: f32,
    out: &mut FrameLocalizationSet,
) {
    let (h, w) = filtered.dim();
    let half = (roi_len / 2) as i64;

    for c in candidates {
        let cx = c.x as i64;
        let cy = c.y as i64;

        // Early rejection: very low signal relative to the local background.
        if filtered[[c.y, c.x]] < background[[c.y, c.x]] - baseline {
            continue;
        }

        let (x_lo, x_hi) = clamp_window(cx - half, roi_len as i64, w as i64);
        let (y_lo, y_hi) = clamp_window(cy - half, roi_len as i64, h as i64);
        let roi_w = (x_hi - x_lo) as usize;
        let roi_h = (y_hi - y_lo) as usize;
        if roi_w < 2 || roi_h < 2 {
            continue;
        }

        let roi = extract_roi(filtered, x_lo as usize, y_lo as usize, roi_w, roi_h);
        let (upsampled, up_w, up_h) = upsample_separable(&roi, roi_w, roi_h, factor);

        // The up-sampled image's origin corresponds to the clipped
        // original-pixel coordinate `x_lo`/`y_lo`, not to `cx - half` and
        // not to `0`.
        let origin_x = (x_lo as u32) * factor;
        let origin_y = (y_lo as u32) * factor;

        for (i, j, value) in interior_maxima(&upsampled, up_w, up_h, factor as usize, threshold) {
            out.insert(Localization::new(
                origin_x + i as u32,
                origin_y + j as u32,
                value,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::subtract_background;
    use crate::detect::find_coarse_maxima;

    fn gaussian_frame(w: usize, h: usize, cx: f64, cy: f64, amp: f32, sigma: f64) -> Array2<f32> {
        Array2::from_shape_fn((h, w), |(y, x)| {
            let dx = x as f64 - cx;
            let dy = y as f64 - cy;
            (amp as f64 * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp()) as f32
        })
    }

    #[test]
    fn isolated_spot_refines_to_expected_upsampled_coordinate() {
        // Nudged off the exact half-integer lattice (15.5, 15.5) so the
        // coarse 8-neighbour strict-maximum rule doesn't see an exact
        // plateau between the four pixels tied around a perfectly centred
        // spot; the up-sampled refinement still lands within a pixel or two
        // of the nominal 15.5 * 8 = 124.
        let frame = gaussian_frame(32, 32, 15.501, 15.499, 1000.0, 2.0);
        let bg = subtract_background(&frame);
        let candidates = find_coarse_maxima(&bg.corrected, 200.0);
        assert_eq!(candidates.len(), 1);

        let mut out = FrameLocalizationSet::new();
        refine_candidates(&bg.corrected, &bg.background, bg.baseline, &candidates, 8, 9, 200.0, &mut out);

        assert_eq!(out.len(), 1);
        let loc = out.iter().next().unwrap();
        assert!((loc.x as i64 - 124).abs() <= 2, "x={}", loc.x);
        assert!((loc.y as i64 - 124).abs() <= 2, "y={}", loc.y);
    }

    #[test]
    fn border_candidate_clamps_roi_and_keeps_correct_origin() {
        let frame = gaussian_frame(16, 16, 2.0, 2.0, 1000.0, 1.5);
        let bg = subtract_background(&frame);
        let candidates = find_coarse_maxima(&bg.corrected, 200.0);
        assert_eq!(candidates.len(), 1);

        let mut out = FrameLocalizationSet::new();
        refine_candidates(&bg.corrected, &bg.background, bg.baseline, &candidates, 4, 9, 200.0, &mut out);

        assert_eq!(out.len(), 1);
        let loc = out.iter().next().unwrap();
        // within one up-sampled cell of 2.0 * factor in both axes
        assert!((loc.x as i64 - 8).abs() <= 1);
        assert!((loc.y as i64 - 8).abs() <= 1);
    }

    #[test]
    fn overlapping_rois_deduplicate_in_final_set() {
        let frame = gaussian_frame(32, 32, 20.0, 20.0, 1000.0, 1.8);
        let candidates = vec![
            Candidate { x: 20, y: 20, value: frame[[20, 20]] },
        ];
        let doubled = vec![candidates[0], candidates[0]];
        let bg = subtract_background(&frame);
        let mut out = FrameLocalizationSet::new();
        refine_candidates(&bg.corrected, &bg.background, bg.baseline, &doubled, 8, 9, 200.0, &mut out);
        assert_eq!(out.len(), 1);
    }
}

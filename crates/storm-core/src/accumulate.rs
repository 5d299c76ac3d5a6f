//! Accumulator & display rendering: splat every localization onto the
//! up-sampled image, then percentile-clip rescale it to 8-bit for display.

use ndarray::Array2;

use crate::localization::Catalogue;

/// The `(W' x H')` accumulation image, `f64` so repeated detections at the
/// same sub-pixel cell reinforce without losing precision across a long
/// stack.
pub struct AccumulatorImage {
    pub data: Array2<f64>,
}

impl AccumulatorImage {
    /// Sum every localization's `value` into its `(x, y)` cell, across every
    /// frame in `catalogue`.
    pub fn build(catalogue: &Catalogue, width_xxl: usize, height_xxl: usize) -> Self {
        let mut data = Array2::<f64>::zeros((height_xxl, width_xxl));
        for (_frame, set) in catalogue.iter() {
            for loc in set {
                data[[loc.y as usize, loc.x as usize]] += loc.value as f64;
            }
        }
        Self { data }
    }

    /// Percentile-clipped linear rescale to 8-bit grayscale:
    /// the true minimum maps to 0, the [`DISPLAY_MAX_PERCENTILE`]-th
    /// percentile maps to 255 and anything above it clips.
    pub fn render_gray8(&self) -> Array2<u8> {
        let (minlim, maxlim) = self.percentile_limits();
        let (h, w) = self.data.dim();
        let mut out = Array2::<u8>::zeros((h, w));
        let span = (maxlim - minlim).max(f64::EPSILON);
        for y in 0..h {
            for x in 0..w {
                let v = self.data[[y, x]];
                let scaled = ((v - minlim) / span * 255.0).clamp(0.0, 255.0);
                out[[y, x]] = scaled.round() as u8;
            }
        }
        out
    }

    /// `(minlim, maxlim)`: the 0th and 99.6th percentile of every pixel
    /// value. Guarantees `minlim <= maxlim`.
    pub fn percentile_limits(&self) -> (f64, f64) {
        use crate::consts::{DISPLAY_MAX_PERCENTILE, DISPLAY_MIN_PERCENTILE};
        let mut sorted: Vec<f64> = self.data.iter().cloned().collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        if sorted.is_empty() {
            return (0.0, 0.0);
        }
        let pick = |p: f64| -> f64 {
            let idx = ((sorted.len() - 1) as f64 * p).round() as usize;
            sorted[idx.min(sorted.len() - 1)]
        };
        let minlim = pick(DISPLAY_MIN_PERCENTILE);
        let maxlim = pick(DISPLAY_MAX_PERCENTILE).max(minlim);
        (minlim, maxlim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::localization::{FrameLocalizationSet, Localization};

    #[test]
    fn repeated_detections_at_same_cell_reinforce() {
        let mut catalogue = Catalogue::with_capacity(2);
        let mut a = FrameLocalizationSet::new();
        a.insert(Localization::new(3, 3, 10.0));
        let mut b = FrameLocalizationSet::new();
        b.insert(Localization::new(3, 3, 5.0));
        catalogue.set(0, a);
        catalogue.set(1, b);

        let acc = AccumulatorImage::build(&catalogue, 8, 8);
        assert_eq!(acc.data[[3, 3]], 15.0);
    }

    #[test]
    fn display_rescale_keeps_minlim_at_or_below_maxlim() {
        let mut catalogue = Catalogue::with_capacity(1);
        let mut set = FrameLocalizationSet::new();
        set.insert(Localization::new(1, 1, 100.0));
        set.insert(Localization::new(2, 2, 50.0));
        catalogue.set(0, set);

        let acc = AccumulatorImage::build(&catalogue, 4, 4);
        let (minlim, maxlim) = acc.percentile_limits();
        assert!(minlim <= maxlim);
        let img = acc.render_gray8();
        assert_eq!(img[[1, 1]], 255);
    }

    #[test]
    fn empty_catalogue_renders_all_zero() {
        let catalogue = Catalogue::with_capacity(3);
        let acc = AccumulatorImage::build(&catalogue, 4, 4);
        let img = acc.render_gray8();
        assert!(img.iter().all(|&v| v == 0));
    }
}

//! Per-frame pipeline: a pure function composing the Wiener-filtered
//! FFT pass, background estimation, coarse detection, ROI refinement, and
//! asymmetry scoring into one `Frame -> FrameLocalizationSet`, mirroring the
//! original's `wienerStormSingleFrame`. Detection, refinement, and asymmetry
//! scoring all run on the background-subtracted frame, matching the
//! original's `subtractBackground` overwriting `filtered` with
//! `filtered - bg` in place before `localMaxima` ever runs over it.

use crate::asymmetry::score_asymmetry;
use crate::background::subtract_background;
use crate::config::PipelineParams;
use crate::detect::find_coarse_maxima;
use crate::fft::FftFilter;
use crate::frame::Frame;
use crate::localization::{FrameLocalizationSet, Localization};
use crate::roi::refine_candidates;
use crate::spline::SplineImageView;
use ndarray::Array2;

/// Run the full per-frame pipeline on one frame, given the shared,
/// read-only FFT plans and Wiener mask. Allocates its own scratch (the
/// filtered frame, background estimate, and spline view); no side effects
/// beyond the returned set.
pub fn process_frame(
    frame: &Frame,
    fft: &FftFilter,
    mask: &Array2<f32>,
    params: &PipelineParams,
) -> FrameLocalizationSet {
    let filtered = fft.apply_fourier_filter(&frame.data, mask);
    let bg = subtract_background(&filtered);
    let subtracted = &bg.corrected;
    let candidates = find_coarse_maxima(subtracted, params.threshold);

    let mut set = FrameLocalizationSet::new();
    refine_candidates(
        subtracted,
        &bg.background,
        bg.baseline,
        &candidates,
        params.factor,
        params.roi_len,
        params.threshold,
        &mut set,
    );

    // Second pass: score shape asymmetry at every surviving localization's
    // down-scaled coordinate against a spline view of the background-
    // subtracted frame, then rebuild the set with the scored copies.
    let (h, w) = subtracted.dim();
    let flat: Vec<f32> = subtracted.iter().cloned().collect();
    let view = SplineImageView::new(&flat, w, h);
    let scored = set.iter().map(|loc| {
        let asymmetry = score_asymmetry(&view, loc.x, loc.y, params.factor);
        Localization {
            asymmetry,
            ..*loc
        }
    }).collect::<Vec<_>>();
    set.replace_all(scored);

    set
}

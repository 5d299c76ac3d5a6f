//! Top-level pipeline orchestration: open the frame source, resolve the
//! Wiener mask (load-and-resample a supplied filter, or build one from the
//! stack's own statistics), run the scheduler, then accumulate and write the
//! catalogue and rendered image. This is the single entry point `storm-cli`
//! calls; everything above it (argument parsing, terminal progress bars,
//! the colorized summary) is the CLI's concern.

use std::path::Path;

use ndarray::Array2;
use tracing::info;

use crate::accumulate::AccumulatorImage;
use crate::catalogue::write_catalogue;
use crate::config::{OutputPaths, PipelineParams};
use crate::error::Result;
use crate::fft::FftFilter;
use crate::io::image_io::{load_filter_image, save_filter_image, save_gray8};
use crate::io::{open_frame_source, FrameSource};
use crate::scheduler::{run_scheduler, CancellationToken, NullProgress, ProgressReporter};
use crate::wiener::{build_from_data, half_spectrum_mask, resample_filter_image};

/// Summary of one completed run, for the CLI's end-of-run report.
pub struct RunSummary {
    pub frame_count: usize,
    pub total_localizations: usize,
    pub width: u32,
    pub height: u32,
    pub factor: u32,
}

/// Run the full pipeline against `input`, writing the rendered image and
/// text catalogue to `outputs`, and returning a summary for the caller to
/// report. `progress`/`cancel` default to no-ops/never-cancelled when the
/// caller has no UI to drive.
pub fn run(
    input: &Path,
    outputs: &OutputPaths,
    params: &PipelineParams,
    progress: &dyn ProgressReporter,
    cancel: &CancellationToken,
) -> Result<RunSummary> {
    params.validate()?;

    let mut source = open_frame_source(input)?;
    let (width, height, frame_count) = source.shape();
    info!(
        path = %input.display(),
        width, height, frame_count,
        "opened frame source"
    );

    let sample = source.read_frame(0)?;
    let fft = FftFilter::new(&sample);

    let half_mask = resolve_wiener_mask(&outputs.filter, source.as_mut(), &fft, width as usize, height as usize)?;

    let catalogue = run_scheduler(source.as_mut(), &fft, &half_mask, params, progress, cancel)?;

    if !cancel.is_cancelled() {
        let width_xxl = (params.factor * (width - 1) + 1) as usize;
        let height_xxl = (params.factor * (height - 1) + 1) as usize;
        let accumulator = AccumulatorImage::build(&catalogue, width_xxl, height_xxl);
        let rendered = accumulator.render_gray8();
        save_gray8(&rendered, &outputs.image)?;
    }

    write_catalogue(&outputs.coordsfile, &catalogue, width, height, params.factor)?;

    Ok(RunSummary {
        frame_count,
        total_localizations: catalogue.total_localizations(),
        width,
        height,
        factor: params.factor,
    })
}

/// Convenience entry point for callers with no progress/cancellation needs.
pub fn run_default(input: &Path, outputs: &OutputPaths, params: &PipelineParams) -> Result<RunSummary> {
    run(input, outputs, params, &NullProgress, &CancellationToken::new())
}

/// Load the filter image at `filter_path` if it exists, spline-resampling
/// it to the stack's shape; on `InvalidFilter`/`UnsupportedFormat` (or a
/// missing file) build a fresh mask from the stack's own power spectrum and
/// save it to `filter_path`.
fn resolve_wiener_mask(
    filter_path: &Path,
    source: &mut dyn crate::io::FrameSource,
    fft: &FftFilter,
    width: usize,
    height: usize,
) -> Result<Array2<f32>> {
    if filter_path.exists() {
        match load_filter_image(filter_path) {
            Ok(image) => {
                let resampled = resample_filter_image(&image, width, height);
                return Ok(half_spectrum_mask(&resampled));
            }
            Err(err) => {
                info!(
                    path = %filter_path.display(),
                    error = %err,
                    "supplied filter image unusable, falling back to data-derived filter"
                );
            }
        }
    }

    let half_mask = build_from_data(source, fft)?;
    let full = {
        // build_from_data already returns the half-spectrum mask; reconstruct
        // a full-width image purely for saving a human-viewable filter file.
        let (h, half_w) = half_mask.dim();
        let w = width;
        let mut full = Array2::<f32>::zeros((h, w));
        for y in 0..h {
            for x in 0..half_w.min(w) {
                full[[y, x]] = half_mask[[y, x]];
                let mirror_x = (w - x) % w;
                let mirror_y = (h - y) % h;
                full[[mirror_y, mirror_x]] = half_mask[[y, x]];
            }
        }
        full
    };
    save_filter_image(&full, filter_path)?;
    Ok(half_mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_paths_derive_as_expected() {
        let outputs = OutputPaths::derive(Path::new("/tmp/run.sif"), None);
        assert_eq!(outputs.image, Path::new("/tmp/run.png"));
        assert_eq!(outputs.coordsfile, Path::new("/tmp/run.txt"));
        assert_eq!(outputs.filter, Path::new("/tmp/run_filter.tif"));
    }
}

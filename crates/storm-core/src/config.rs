use std::path::PathBuf;

use crate::consts::{DEFAULT_CHUNK_SIZE, DEFAULT_FACTOR, DEFAULT_ROI_LEN, DEFAULT_THRESHOLD};
use crate::error::{Result, StormError};

/// Parameters steering one run of the localization pipeline.
///
/// Threaded by reference through the scheduler and every worker; nothing in
/// here is mutated once a run has started.
#[derive(Clone, Debug)]
pub struct PipelineParams {
    /// Up-sampling factor between original and super-resolved pixels.
    pub factor: u32,
    /// Minimum filtered intensity for a maximum candidate.
    pub threshold: f32,
    /// ROI edge length around each coarse candidate (kept odd).
    pub roi_len: u32,
    /// Inclusive/exclusive frame range and stride, resolved from `--frames`.
    pub frame_range: FrameRange,
    /// Frames handed to a worker per scheduling unit.
    pub chunk_size: usize,
    /// Worker count; `None` defers to `rayon`'s global pool (hardware parallelism).
    pub workers: Option<usize>,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            factor: DEFAULT_FACTOR,
            threshold: DEFAULT_THRESHOLD,
            roi_len: DEFAULT_ROI_LEN,
            frame_range: FrameRange::all(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: None,
        }
    }
}

impl PipelineParams {
    pub fn validate(&self) -> Result<()> {
        if self.factor < 1 || !self.factor.is_power_of_two() {
            return Err(StormError::ShapeMismatch(
                "factor must be a power of two (the integer resampling fast path only \
                 supports power-of-two ratios)"
                    .to_string(),
            ));
        }
        if self.roi_len < 3 || self.roi_len % 2 == 0 {
            return Err(StormError::ShapeMismatch(
                "roi-len must be an odd integer >= 3".to_string(),
            ));
        }
        Ok(())
    }
}

/// A resolved `[start:end:stride)` slice over the stack, as produced by
/// parsing the CLI's `--frames` option (`helper::rangeSplit` in the original).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameRange {
    pub start: i64,
    pub end: i64,
    pub stride: usize,
}

impl FrameRange {
    pub fn all() -> Self {
        Self {
            start: 0,
            end: i64::MAX,
            stride: 1,
        }
    }

    /// Parse `[start]:[end][:stride]`, where `start`/`end` may be negative
    /// to count backwards from the end of the stack (mirrors the original's
    /// `rangeSplit`).
    pub fn parse(spec: &str) -> Result<Self> {
        if spec.is_empty() {
            return Ok(Self::all());
        }
        let parts: Vec<&str> = spec.split(':').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(StormError::ShapeMismatch(format!(
                "invalid --frames spec: {spec}"
            )));
        }
        let parse_i64 = |s: &str| -> Result<i64> {
            s.parse::<i64>()
                .map_err(|_| StormError::ShapeMismatch(format!("invalid --frames spec: {spec}")))
        };
        let start = if parts[0].is_empty() { 0 } else { parse_i64(parts[0])? };
        let end = match parts.get(1) {
            Some(s) if !s.is_empty() => parse_i64(s)?,
            _ => i64::MAX,
        };
        let stride = match parts.get(2) {
            Some(s) if !s.is_empty() => s.parse::<usize>().map_err(|_| {
                StormError::ShapeMismatch(format!("invalid --frames stride: {spec}"))
            })?,
            _ => 1,
        };
        if stride == 0 {
            return Err(StormError::ShapeMismatch(
                "--frames stride must be >= 1".to_string(),
            ));
        }
        Ok(Self { start, end, stride })
    }

    /// Resolve negative bounds against the total stack size and clamp to it.
    pub fn resolve(&self, total_frames: usize) -> (usize, usize, usize) {
        let total = total_frames as i64;
        let mut beg = self.start;
        let mut end = self.end.min(total);
        if beg < 0 {
            beg = (total + beg).max(0);
        }
        if end < 0 {
            end = (total + end).max(0);
        }
        let beg = beg.clamp(0, total) as usize;
        let end = end.clamp(0, total) as usize;
        (beg, end.max(beg), self.stride)
    }
}

/// Where the accumulator's catalogue and rendered image end up, and where
/// the Wiener filter is loaded from / saved to.
#[derive(Clone, Debug)]
pub struct OutputPaths {
    pub image: PathBuf,
    pub coordsfile: PathBuf,
    pub filter: PathBuf,
}

impl OutputPaths {
    /// Derive defaults from the input path, following the CLI's rule:
    /// output image replaces the extension with `.png`, the catalogue
    /// defaults to `.txt`, and the filter to `_filter.tif`, all alongside
    /// the input.
    pub fn derive(input: &std::path::Path, output: Option<PathBuf>) -> Self {
        let stem = input.file_stem().map(PathBuf::from).unwrap_or_default();
        let dir = input.parent().map(PathBuf::from).unwrap_or_default();
        let image = output.unwrap_or_else(|| dir.join(&stem).with_extension("png"));
        let coordsfile = dir.join(&stem).with_extension("txt");
        let mut filter_name = stem.clone();
        filter_name.as_mut_os_string().push("_filter");
        let filter = dir.join(filter_name).with_extension("tif");
        Self {
            image,
            coordsfile,
            filter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_range() {
        let r = FrameRange::parse("0:10:2").unwrap();
        assert_eq!(r.resolve(100), (0, 10, 2));
    }

    #[test]
    fn parses_negative_bounds() {
        let r = FrameRange::parse("-5:").unwrap();
        assert_eq!(r.resolve(20), (15, 20, 1));
    }

    #[test]
    fn empty_spec_is_full_range() {
        let r = FrameRange::parse("").unwrap();
        assert_eq!(r.resolve(7), (0, 7, 1));
    }

    #[test]
    fn derives_sibling_output_paths() {
        let paths = OutputPaths::derive(std::path::Path::new("/data/run01.sif"), None);
        assert_eq!(paths.image, std::path::PathBuf::from("/data/run01.png"));
        assert_eq!(paths.coordsfile, std::path::PathBuf::from("/data/run01.txt"));
        assert_eq!(paths.filter, std::path::PathBuf::from("/data/run01_filter.tif"));
    }
}

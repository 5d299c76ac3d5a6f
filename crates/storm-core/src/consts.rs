/// Half-width of the noise-estimation ring excluded from the power spectrum's
/// central region, in pixels. Hard-coded to match the original analysis tool;
/// see the design note on the noise ring in DESIGN.md.
pub const NOISE_RING_MARGIN: usize = 10;

/// Smallest frame dimension for which the hard-coded noise ring still leaves
/// a sensible interior. Frames smaller than this are rejected with
/// `ShapeMismatch` rather than silently degenerating.
pub const MIN_FRAME_DIMENSION: usize = 2 * NOISE_RING_MARGIN + 10;

/// Background estimator recursive-smoothing time constant, in pixels.
pub const BACKGROUND_SIGMA: f32 = 10.0;

/// Default per-chunk frame count handed to the worker pool by the scheduler.
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Default up-sampling factor.
pub const DEFAULT_FACTOR: u32 = 8;

/// Default coarse-detector / ROI-refiner intensity threshold.
pub const DEFAULT_THRESHOLD: f32 = 250.0;

/// Default ROI edge length (must stay odd).
pub const DEFAULT_ROI_LEN: u32 = 9;

/// Lower percentile used by the display-rescale (always the true minimum).
pub const DISPLAY_MIN_PERCENTILE: f64 = 0.0;

/// Upper percentile used by the display-rescale, clipping outliers.
pub const DISPLAY_MAX_PERCENTILE: f64 = 0.996;

/// Small epsilon guarding divisions by a near-zero power-spectrum bin.
pub const EPSILON: f32 = 1e-10;

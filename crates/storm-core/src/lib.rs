//! Core dSTORM super-resolution localization pipeline: the Wiener-filtered
//! per-frame detector, its resampling and scoring stages, and the parallel
//! scheduler that streams a frame stack into a coordinate catalogue and an
//! up-sampled accumulator image.

pub mod accumulate;
pub mod asymmetry;
pub mod background;
pub mod catalogue;
pub mod config;
pub mod consts;
pub mod detect;
pub mod driver;
pub mod error;
pub mod fft;
pub mod frame;
pub mod io;
pub mod localization;
pub mod pipeline;
pub mod resample;
pub mod roi;
pub mod scheduler;
pub mod spline;
pub mod wiener;

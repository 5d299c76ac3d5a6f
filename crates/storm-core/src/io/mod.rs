//! Uniform random-access reader over the three supported stack formats.
//! `open_frame_source` dispatches on the file extension; the frame source
//! itself is a boxed trait object rather than an inheritance hierarchy, a
//! deliberate departure from the original's tagged-pointer `MyImportInfo`.

pub mod hdf5_source;
pub mod image_io;
pub mod sif;
pub mod tiff_source;

use std::path::Path;

use crate::error::{Result, StormError};
use crate::frame::{Frame, SourceInfo};

/// Uniform random-access reader over a frame stack.
///
/// A single `FrameSource` is not safe for concurrent reads; the scheduler is
/// always the sole caller, reading one chunk at a time from its own thread
/// before handing the materialized frames to the worker pool. HDF5 is
/// reentrant enough to allow worker reads, but this implementation takes the
/// simpler, always-single-reader path uniformly across backends.
pub trait FrameSource: Send {
    /// `(width, height, frame_count)`.
    fn shape(&self) -> (u32, u32, usize);

    fn source_info(&self) -> SourceInfo;

    /// Materialize `extent.2` consecutive frames starting at frame index
    /// `f0`, covering the pixel rectangle `(x0, y0)..(x0+w, y0+h)`.
    ///
    /// TIFF backends only support full-frame rectangles — an `(x0, y0)` of
    /// anything but `(0, 0)` or a `(w, h)` not equal to the frame's own
    /// dimensions fails with `UnsupportedFormat`.
    fn read_block(
        &mut self,
        x0: u32,
        y0: u32,
        f0: usize,
        w: u32,
        h: u32,
        count: usize,
    ) -> Result<Vec<Frame>>;

    /// Convenience: read one full frame.
    fn read_frame(&mut self, index: usize) -> Result<Frame> {
        let (w, h, _n) = self.shape();
        Ok(self
            .read_block(0, 0, index, w, h, 1)?
            .into_iter()
            .next()
            .expect("read_block(count=1) returned no frames"))
    }
}

/// Open a frame source, choosing the backend by file extension.
pub fn open_frame_source(path: &Path) -> Result<Box<dyn FrameSource>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "tif" | "tiff" => Ok(Box::new(tiff_source::TiffSource::open(path)?)),
        "sif" => Ok(Box::new(sif::SifSource::open(path)?)),
        #[cfg(feature = "hdf5")]
        "h5" | "hdf5" => Ok(Box::new(hdf5_source::Hdf5Source::open(path)?)),
        #[cfg(not(feature = "hdf5"))]
        "h5" | "hdf5" => Err(StormError::UnsupportedFormat(
            "HDF5 support was not compiled in (enable the `hdf5` feature)".to_string(),
        )),
        other => Err(StormError::UnsupportedFormat(format!(
            "unrecognized input extension: {other:?}"
        ))),
    }
}

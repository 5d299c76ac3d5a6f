//! HDF5 reader, gated behind the `hdf5` feature: the crate builds and runs
//! fully without it, this module simply does not exist in the binary.
#![cfg(feature = "hdf5")]

use std::path::{Path, PathBuf};

use hdf5::Dataset;
use ndarray::Array2;

use crate::error::{Result, StormError};
use crate::frame::{Frame, FrameMetadata, SourceInfo};

use super::FrameSource;

/// Reads frames from the `/data` dataset of an HDF5 file, stored on disk
/// with shape `[W, H, N]` (spec.md §3/§6) — the same dataset-shape
/// dimension order `original_source/storm/myimportinfo.hxx` reads directly
/// into its `Shape(shape[0], shape[1], shape[2])` MultiArray, where
/// dimension 0 is width. A per-frame hyperslab is therefore a `(W, H, 1)`
/// slice along the dataset's last axis, transposed into this crate's
/// row-major `(height, width)` `Frame` layout.
pub struct Hdf5Source {
    _file: hdf5::File,
    dataset: Dataset,
    width: u32,
    height: u32,
    frame_count: usize,
    path: PathBuf,
}

fn hdf5_err(e: impl std::fmt::Display) -> StormError {
    StormError::Hdf5(e.to_string())
}

impl Hdf5Source {
    pub fn open(path: &Path) -> Result<Self> {
        let file = hdf5::File::open(path).map_err(hdf5_err)?;
        let dataset = file.dataset("data").map_err(hdf5_err)?;
        let shape = dataset.shape();
        if shape.len() != 3 {
            return Err(StormError::ShapeMismatch(format!(
                "expected a 3-D [W, H, N] dataset, got shape {shape:?}"
            )));
        }
        let (width, height, frame_count) = (shape[0] as u32, shape[1] as u32, shape[2]);
        Ok(Self {
            _file: file,
            dataset,
            width,
            height,
            frame_count,
            path: path.to_path_buf(),
        })
    }
}

impl FrameSource for Hdf5Source {
    fn shape(&self) -> (u32, u32, usize) {
        (self.width, self.height, self.frame_count)
    }

    fn source_info(&self) -> SourceInfo {
        SourceInfo {
            filename: self.path.clone(),
            total_frames: self.frame_count,
            width: self.width,
            height: self.height,
            bit_depth: 32,
        }
    }

    fn read_block(
        &mut self,
        x0: u32,
        y0: u32,
        f0: usize,
        w: u32,
        h: u32,
        count: usize,
    ) -> Result<Vec<Frame>> {
        if x0 != 0 || y0 != 0 || w != self.width || h != self.height {
            return Err(StormError::UnsupportedFormat(
                "partial-frame ROI reads are not supported on the HDF5 backend".to_string(),
            ));
        }
        if f0 + count > self.frame_count {
            return Err(StormError::FrameIndexOutOfRange {
                index: f0 + count,
                total: self.frame_count,
            });
        }

        // Dataset on-disk shape is [W, H, N]; slice the requested frame range
        // out of the trailing axis, giving a (W, H, count) block that we
        // transpose per-frame into this crate's (height, width) convention.
        let slice = self
            .dataset
            .read_slice::<f32, _, _>((.., .., f0..f0 + count))
            .map_err(hdf5_err)?;

        (0..count)
            .map(|i| {
                let plane = slice.index_axis(ndarray::Axis(2), i);
                let data: Array2<f32> = plane.t().to_owned();
                let mut frame = Frame::new(data, 32);
                frame.metadata = FrameMetadata {
                    frame_index: f0 + i,
                    timestamp_us: None,
                };
                Ok(frame)
            })
            .collect()
    }
}

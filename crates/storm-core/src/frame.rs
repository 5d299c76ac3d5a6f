use ndarray::Array2;
use std::path::PathBuf;

/// A single grayscale frame from the stack.
///
/// Pixel values are `f32`; on-disk integer encodings are promoted by dividing
/// by their type's maximum representable value. The backing array is always
/// row-major contiguous (`data[[y, x]]`), which the FFT filter depends on.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Pixel data, shape = (height, width)
    pub data: Array2<f32>,
    /// Original bit depth before conversion (8 or 16)
    pub original_bit_depth: u8,
    pub metadata: FrameMetadata,
}

impl Frame {
    pub fn new(data: Array2<f32>, bit_depth: u8) -> Self {
        Self {
            data,
            original_bit_depth: bit_depth,
            metadata: FrameMetadata::default(),
        }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    /// The FFT filter requires row-major contiguous storage; a caller that
    /// hands in a sliced or transposed view has a logic error (spec's
    /// upgraded hard-fail on the original's silent-return layout check).
    pub fn assert_contiguous_layout(&self) {
        assert!(
            self.data.is_standard_layout(),
            "frame data is not row-major contiguous; violates the FFT filter's memory layout contract"
        );
    }
}

#[derive(Clone, Debug, Default)]
pub struct FrameMetadata {
    pub frame_index: usize,
    pub timestamp_us: Option<u64>,
}

/// Metadata about an opened frame source.
#[derive(Clone, Debug)]
pub struct SourceInfo {
    pub filename: PathBuf,
    pub total_frames: usize,
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
}

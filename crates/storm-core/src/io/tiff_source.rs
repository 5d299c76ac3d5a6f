use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use tiff::decoder::{Decoder, DecodingResult};

use crate::error::{Result, StormError};
use crate::frame::{Frame, FrameMetadata, SourceInfo};

use super::FrameSource;

/// Multi-page TIFF reader. Only full-frame rectangles are supported — the
/// original's `readVolume`/`readBlock` for `ImageImportInfo` document the
/// same precondition.
pub struct TiffSource {
    decoder: Decoder<BufReader<File>>,
    width: u32,
    height: u32,
    frame_count: usize,
    path: PathBuf,
}

impl TiffSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut decoder = Decoder::new(BufReader::new(file))
            .map_err(|e| StormError::DecodeError(format!("failed to open TIFF: {e}")))?;
        let (width, height) = decoder
            .dimensions()
            .map_err(|e| StormError::DecodeError(format!("failed to read TIFF dimensions: {e}")))?;

        let mut frame_count = 1usize;
        while decoder.seek_to_image(frame_count).is_ok() {
            frame_count += 1;
        }
        decoder
            .seek_to_image(0)
            .map_err(|e| StormError::DecodeError(format!("failed to rewind TIFF: {e}")))?;

        Ok(Self {
            decoder,
            width,
            height,
            frame_count,
            path: path.to_path_buf(),
        })
    }

    fn decode_page(&mut self, index: usize) -> Result<Array2<f32>> {
        self.decoder
            .seek_to_image(index)
            .map_err(|_| StormError::FrameIndexOutOfRange {
                index,
                total: self.frame_count,
            })?;
        let (w, h) = self
            .decoder
            .dimensions()
            .map_err(|e| StormError::DecodeError(format!("failed to read TIFF page dims: {e}")))?;
        if w != self.width || h != self.height {
            return Err(StormError::ShapeMismatch(format!(
                "TIFF page {index} has shape {w}x{h}, expected {}x{}",
                self.width, self.height
            )));
        }
        let image = self
            .decoder
            .read_image()
            .map_err(|e| StormError::DecodeError(format!("failed to decode TIFF page: {e}")))?;

        // Narrower integer encodings are promoted to f32 by a straight cast,
        // not rescaled into [0, 1]: the SIF backend hands back raw sensor
        // counts unmodified, and `--threshold`'s default (250) is meaningful
        // only against that same raw-intensity scale, matching vigra's
        // `importImage` into a `float` destination in the original.
        let data: Vec<f32> = match image {
            DecodingResult::U8(v) => v.into_iter().map(|p| p as f32).collect(),
            DecodingResult::U16(v) => v.into_iter().map(|p| p as f32).collect(),
            DecodingResult::U32(v) => v.into_iter().map(|p| p as f32).collect(),
            DecodingResult::F32(v) => v,
            DecodingResult::F64(v) => v.into_iter().map(|p| p as f32).collect(),
            other => {
                return Err(StormError::UnsupportedFormat(format!(
                    "unsupported TIFF sample format: {other:?}"
                )))
            }
        };

        Array2::from_shape_vec((h as usize, w as usize), data)
            .map_err(|e| StormError::DecodeError(format!("TIFF page buffer shape mismatch: {e}")))
    }
}

impl FrameSource for TiffSource {
    fn shape(&self) -> (u32, u32, usize) {
        (self.width, self.height, self.frame_count)
    }

    fn source_info(&self) -> SourceInfo {
        SourceInfo {
            filename: self.path.clone(),
            total_frames: self.frame_count,
            width: self.width,
            height: self.height,
            bit_depth: 16,
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
                "partial-frame ROI reads are not supported on the TIFF backend".to_string(),
            ));
        }
        if f0 + count > self.frame_count {
            return Err(StormError::FrameIndexOutOfRange {
                index: f0 + count,
                total: self.frame_count,
            });
        }
        (f0..f0 + count)
            .map(|i| {
                let data = self.decode_page(i)?;
                let mut frame = Frame::new(data, 16);
                frame.metadata = FrameMetadata {
                    frame_index: i,
                    timestamp_us: None,
                };
                Ok(frame)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiff::encoder::{colortype, TiffEncoder};

    fn write_multipage_gray16(pages: &[Vec<u16>], width: u32, height: u32) -> tempfile::TempPath {
        let f = tempfile::Builder::new().suffix(".tif").tempfile().unwrap();
        {
            let file = File::create(f.path()).unwrap();
            let mut encoder = TiffEncoder::new(file).unwrap();
            for page in pages {
                encoder
                    .write_image::<colortype::Gray16>(width, height, page)
                    .unwrap();
            }
        }
        f.into_temp_path()
    }

    #[test]
    fn reads_multipage_tiff_shape_and_frame_count() {
        let pages = vec![vec![0u16; 16 * 12], vec![1u16; 16 * 12], vec![2u16; 16 * 12]];
        let path = write_multipage_gray16(&pages, 16, 12);
        let source = TiffSource::open(&path).unwrap();
        assert_eq!(source.shape(), (16, 12, 3));
    }

    #[test]
    fn sixteen_bit_samples_are_cast_not_rescaled() {
        let mut page = vec![0u16; 8 * 8];
        page[0] = 12345;
        let path = write_multipage_gray16(&[page], 8, 8);
        let mut source = TiffSource::open(&path).unwrap();
        let frame = source.read_frame(0).unwrap();
        // A straight numeric cast, not a divide-by-65535 rescale into [0, 1]:
        // the raw sensor count survives so it lines up with the SIF
        // backend's raw f32 payload against the same `--threshold` scale.
        assert_eq!(frame.data[[0, 0]], 12345.0);
    }

    #[test]
    fn partial_frame_roi_reads_are_rejected() {
        let pages = vec![vec![0u16; 8 * 8]];
        let path = write_multipage_gray16(&pages, 8, 8);
        let mut source = TiffSource::open(&path).unwrap();
        let result = source.read_block(0, 0, 0, 4, 4, 1);
        assert!(matches!(result, Err(StormError::UnsupportedFormat(_))));
    }
}

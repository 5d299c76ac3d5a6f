use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use ndarray::Array2;

use crate::error::{Result, StormError};
use crate::frame::{Frame, FrameMetadata, SourceInfo};

use super::FrameSource;

const SIF_SIGNATURE: &str = "Andor Technology Multi-Channel File";

/// Andor SIF reader.
///
/// The SIF text header's full grammar (instrument-specific optional blocks
/// of variable length) is not publicly documented; rather than guess at its
/// exact layout this reads the handful of stably-present fields — the
/// image-geometry record (prefixed by the `65538` tag present in every SIF
/// version in the wild) and the trailing frame count — by scanning the
/// header as text, then locates the binary payload by working backwards
/// from the file length, since the float32 pixel data is always the last
/// thing in the file.
pub struct SifSource {
    mmap: Mmap,
    width: u32,
    height: u32,
    frame_count: usize,
    data_offset: usize,
    path: PathBuf,
}

struct SifHeader {
    width: u32,
    height: u32,
    frame_count: usize,
    data_offset: usize,
}

fn parse_header(mmap: &Mmap) -> Result<SifHeader> {
    let probe_len = mmap.len().min(16 * 1024);
    let text = String::from_utf8_lossy(&mmap[..probe_len]);
    let mut lines = text.lines();

    let first = lines
        .next()
        .ok_or_else(|| StormError::DecodeError("empty SIF file".to_string()))?;
    if !first.trim().starts_with(SIF_SIGNATURE) {
        return Err(StormError::DecodeError(
            "missing Andor SIF signature".to_string(),
        ));
    }

    let mut width = None;
    let mut height = None;
    for line in text.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() >= 5 && tokens[0] == "65538" {
            let nums: Option<Vec<i64>> = tokens[1..5].iter().map(|t| t.parse().ok()).collect();
            if let Some(nums) = nums {
                let (left, top, right, bottom) = (nums[0], nums[1], nums[2], nums[3]);
                let w = (right - left + 1).unsigned_abs() as u32;
                let h = (top - bottom + 1).unsigned_abs() as u32;
                if w > 0 && h > 0 {
                    width = Some(w);
                    height = Some(h);
                    break;
                }
            }
        }
    }
    let (width, height) = match (width, height) {
        (Some(w), Some(h)) => (w, h),
        _ => {
            return Err(StormError::DecodeError(
                "could not locate SIF image-geometry record".to_string(),
            ))
        }
    };

    // The pixel payload is the tail of the file; derive the frame count and
    // the exact data offset from the file size once width/height are known,
    // rather than trying to count the variable-length subimage descriptor
    // block that precedes it.
    let bytes_per_frame = width as usize * height as usize * 4;
    if bytes_per_frame == 0 || mmap.len() < bytes_per_frame {
        return Err(StormError::DecodeError(
            "SIF file truncated before first frame".to_string(),
        ));
    }
    let frame_count = mmap.len() / bytes_per_frame;
    if frame_count == 0 {
        return Err(StormError::DecodeError(
            "SIF file contains no complete frames".to_string(),
        ));
    }
    let data_offset = mmap.len() - frame_count * bytes_per_frame;

    Ok(SifHeader {
        width,
        height,
        frame_count,
        data_offset,
    })
}

impl SifSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        let header = parse_header(&mmap)?;
        Ok(Self {
            mmap,
            width: header.width,
            height: header.height,
            frame_count: header.frame_count,
            data_offset: header.data_offset,
            path: path.to_path_buf(),
        })
    }

    fn decode_frame(&self, index: usize) -> Result<Array2<f32>> {
        if index >= self.frame_count {
            return Err(StormError::FrameIndexOutOfRange {
                index,
                total: self.frame_count,
            });
        }
        let frame_bytes = self.width as usize * self.height as usize * 4;
        let start = self.data_offset + index * frame_bytes;
        let end = start + frame_bytes;
        if end > self.mmap.len() {
            return Err(StormError::DecodeError(format!(
                "SIF frame {index} extends past end of file"
            )));
        }
        let raw = &self.mmap[start..end];
        let mut data = Array2::<f32>::zeros((self.height as usize, self.width as usize));
        for (i, chunk) in raw.chunks_exact(4).enumerate() {
            let v = f32::from_le_bytes(chunk.try_into().unwrap());
            let y = i / self.width as usize;
            let x = i % self.width as usize;
            data[[y, x]] = v;
        }
        Ok(data)
    }
}

impl FrameSource for SifSource {
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
                "partial-frame ROI reads are not supported on the SIF backend".to_string(),
            ));
        }
        (f0..f0 + count)
            .map(|i| {
                let data = self.decode_frame(i)?;
                let mut frame = Frame::new(data, 32);
                frame.metadata = FrameMetadata {
                    frame_index: i,
                    timestamp_us: None,
                };
                Ok(frame)
            })
            .collect()
    }
}

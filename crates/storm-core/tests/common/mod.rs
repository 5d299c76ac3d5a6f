//! Shared fixtures for the integration tests: synthetic Gaussian-spot
//! frames and a minimal Andor SIF writer so tests can drive the pipeline
//! through the public `FrameSource`/`driver` surface instead of poking at
//! internal arrays.

use ndarray::Array2;
use std::io::Write;
use std::path::Path;

use storm_core::config::OutputPaths;

/// A single isolated Gaussian spot over a flat baseline, the same shape the
/// per-module unit tests use (`pipeline.rs`, `roi.rs`).
pub fn gaussian_frame(w: usize, h: usize, cx: f64, cy: f64, amp: f32, sigma: f64, baseline: f32) -> Array2<f32> {
    Array2::from_shape_fn((h, w), |(y, x)| {
        let dx = x as f64 - cx;
        let dy = y as f64 - cy;
        baseline + (amp as f64 * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp()) as f32
    })
}

/// A flat frame with no spot, for stack slots that must stay empty.
pub fn flat_frame(w: usize, h: usize, value: f32) -> Array2<f32> {
    Array2::from_elem((h, w), value)
}

/// Write `frames` out as a minimal Andor SIF file: the text header fields
/// `read_sif`'s parser actually looks at (signature, `65538` geometry
/// record, frame count), then the raw little-endian f32 payload, row-major,
/// one frame after another. Mirrors `io/sif.rs`'s own `write_minimal_sif`
/// test helper, generalized to carry real pixel data.
pub fn write_sif_stack(frames: &[Array2<f32>]) -> tempfile::TempPath {
    let (height, width) = frames[0].dim();
    let mut f = tempfile::Builder::new().suffix(".sif").tempfile().unwrap();
    writeln!(f, "Andor Technology Multi-Channel File").unwrap();
    writeln!(f, "65538").unwrap();
    writeln!(f, "65538 0 {} {} 0 1 1 0 0", height - 1, width - 1).unwrap();
    writeln!(f, "{}", frames.len()).unwrap();
    for frame in frames {
        for v in frame.iter() {
            f.write_all(&v.to_le_bytes()).unwrap();
        }
    }
    f.flush().unwrap();
    f.into_temp_path()
}

pub fn outputs_in(dir: &Path) -> OutputPaths {
    OutputPaths {
        image: dir.join("out.png"),
        coordsfile: dir.join("out.txt"),
        filter: dir.join("out_filter.tif"),
    }
}

/// Parse `write_catalogue`'s plain-text layout back into `(width, height,
/// rows)`, where each row is `(x, y, frame, value, asymmetry)`.
pub fn read_catalogue(path: &Path) -> (u32, u32, Vec<(f64, f64, usize, f32, f32)>) {
    let text = std::fs::read_to_string(path).unwrap();
    let mut lines = text.lines();
    let header = lines.next().unwrap();
    let header: Vec<&str> = header.split_whitespace().collect();
    let width: u32 = header[0].parse().unwrap();
    let height: u32 = header[1].parse().unwrap();
    let rows = lines
        .map(|line| {
            let t: Vec<&str> = line.split_whitespace().collect();
            (
                t[0].parse().unwrap(),
                t[1].parse().unwrap(),
                t[2].parse().unwrap(),
                t[3].parse().unwrap(),
                t[4].parse().unwrap(),
            )
        })
        .collect();
    (width, height, rows)
}

//! Thread-safe real-to-complex / complex-to-real 2-D FFT filtering.
//!
//! Mirrors `fftfilter.hxx`'s `FFTFilter`: one forward and one backward plan
//! are built once, sized to a sample frame, and reused read-only by every
//! worker. `realfft` provides the row-wise real<->complex transform (the
//! same crate pairing `rustfft` the way the sibling audio-DSP example in the
//! retrieval pack uses it for impulse convolution); the column pass is a
//! plain complex `rustfft` transform, since a 2-D real FFT is separable into
//! a real FFT along one axis followed by a complex FFT along the other.

use std::sync::Arc;

use ndarray::Array2;
use num_complex::Complex32;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use rustfft::{Fft, FftPlanner};

use crate::frame::Frame;

/// Owns the FFT plans for one frame size. Construction is not thread-safe
/// (the planner itself mutates shared tables) and must happen on the main
/// thread before workers start; `apply_fourier_filter` afterwards is safe
/// for concurrent calls because every call allocates its own scratch and the
/// plan objects themselves are never mutated by `process_with_scratch`.
pub struct FftFilter {
    width: usize,
    height: usize,
    row_fwd: Arc<dyn RealToComplex<f32>>,
    row_inv: Arc<dyn ComplexToReal<f32>>,
    col_fwd: Arc<dyn Fft<f32>>,
    col_inv: Arc<dyn Fft<f32>>,
    norm_factor: f32,
}

impl FftFilter {
    /// Build plans sized to `sample`. Panics if `sample` is not row-major
    /// contiguous (a caller logic error, per the upgraded hard-fail on the
    /// original's silent memory-layout check).
    pub fn new(sample: &Frame) -> Self {
        sample.assert_contiguous_layout();
        let width = sample.width();
        let height = sample.height();
        let mut real_planner = RealFftPlanner::<f32>::new();
        let row_fwd = real_planner.plan_fft_forward(width);
        let row_inv = real_planner.plan_fft_inverse(width);
        let mut planner = FftPlanner::<f32>::new();
        let col_fwd = planner.plan_fft_forward(height);
        let col_inv = planner.plan_fft_inverse(height);
        Self {
            width,
            height,
            row_fwd,
            row_inv,
            col_fwd,
            col_inv,
            norm_factor: 1.0 / (width * height) as f32,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }
    pub fn height(&self) -> usize {
        self.height
    }

    /// Half-spectrum column count (`floor(W/2) + 1`).
    pub fn half_width(&self) -> usize {
        self.width / 2 + 1
    }

    /// Forward real-to-complex transform into the half-spectrum shape
    /// `(height, half_width)`. Allocates fresh scratch buffers, so this is
    /// safe to call concurrently from multiple workers sharing one `FftFilter`.
    pub(crate) fn forward_complex(&self, input: &Array2<f32>) -> Array2<Complex32> {
        assert_eq!(input.nrows(), self.height, "frame height does not match FFT plan");
        assert_eq!(input.ncols(), self.width, "frame width does not match FFT plan");
        assert!(
            input.is_standard_layout(),
            "input is not row-major contiguous; violates the FFT filter's memory layout contract"
        );

        let half_w = self.half_width();
        let mut complex = Array2::<Complex32>::zeros((self.height, half_w));

        let mut row_scratch = vec![Complex32::new(0.0, 0.0); self.row_fwd.get_scratch_len()];
        for y in 0..self.height {
            let mut row: Vec<f32> = input.row(y).to_vec();
            let mut out_row = vec![Complex32::new(0.0, 0.0); half_w];
            self.row_fwd
                .process_with_scratch(&mut row, &mut out_row, &mut row_scratch)
                .expect("forward r2c row transform");
            for x in 0..half_w {
                complex[[y, x]] = out_row[x];
            }
        }

        let mut col_scratch =
            vec![Complex32::new(0.0, 0.0); self.col_fwd.get_inplace_scratch_len()];
        for u in 0..half_w {
            let mut col: Vec<Complex32> = (0..self.height).map(|y| complex[[y, u]]).collect();
            self.col_fwd.process_with_scratch(&mut col, &mut col_scratch);
            for (y, v) in col.into_iter().enumerate() {
                complex[[y, u]] = v;
            }
        }

        complex
    }

    /// Inverse complex-to-real transform, scaled by `1/(W*H)`. Consumes the
    /// spectrum in place (the column pass runs first, then the row c2r pass).
    fn inverse_real(&self, spectrum: &mut Array2<Complex32>) -> Array2<f32> {
        let half_w = self.half_width();

        let mut col_scratch =
            vec![Complex32::new(0.0, 0.0); self.col_inv.get_inplace_scratch_len()];
        for u in 0..half_w {
            let mut col: Vec<Complex32> = (0..self.height).map(|y| spectrum[[y, u]]).collect();
            self.col_inv.process_with_scratch(&mut col, &mut col_scratch);
            for (y, v) in col.into_iter().enumerate() {
                spectrum[[y, u]] = v;
            }
        }

        let mut output = Array2::<f32>::zeros((self.height, self.width));
        let mut row_scratch = vec![Complex32::new(0.0, 0.0); self.row_inv.get_scratch_len()];
        for y in 0..self.height {
            let mut row: Vec<Complex32> = (0..half_w).map(|x| spectrum[[y, x]]).collect();
            let mut out_row = vec![0f32; self.width];
            self.row_inv
                .process_with_scratch(&mut row, &mut out_row, &mut row_scratch)
                .expect("inverse c2r row transform");
            for x in 0..self.width {
                output[[y, x]] = out_row[x] * self.norm_factor;
            }
        }
        output
    }

    /// Apply a half-spectrum real mask (`mask.shape() == (height, half_width)`)
    /// in the frequency domain: forward transform, element-wise multiply,
    /// inverse transform. Only the left half of the filter is ever read —
    /// symmetry of the full spectrum is implied.
    pub fn apply_fourier_filter(&self, input: &Array2<f32>, mask: &Array2<f32>) -> Array2<f32> {
        assert_eq!(
            mask.dim(),
            (self.height, self.half_width()),
            "wiener mask shape does not match the FFT plan's half-spectrum"
        );
        let mut spectrum = self.forward_complex(input);
        for ((y, x), m) in mask.indexed_iter() {
            spectrum[[y, x]] *= *m;
        }
        self.inverse_real(&mut spectrum)
    }
}

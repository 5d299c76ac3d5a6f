use std::path::Path;

use image::{DynamicImage, GrayImage, ImageBuffer, ImageFormat, Luma};
use ndarray::Array2;

use crate::error::{Result, StormError};

/// Save an already-rescaled 8-bit grayscale image, dispatching on the output
/// extension (PNG/TIFF/JPEG).
pub fn save_gray8(data: &Array2<u8>, path: &Path) -> Result<()> {
    let (h, w) = data.dim();
    let mut img = GrayImage::new(w as u32, h as u32);
    for y in 0..h {
        for x in 0..w {
            img.put_pixel(x as u32, y as u32, Luma([data[[y, x]]]));
        }
    }

    let format = match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()) {
        Some(ext) if ext == "png" => ImageFormat::Png,
        Some(ext) if ext == "tif" || ext == "tiff" => ImageFormat::Tiff,
        Some(ext) if ext == "jpg" || ext == "jpeg" => ImageFormat::Jpeg,
        _ => ImageFormat::Png,
    };
    img.save_with_format(path, format)?;
    Ok(())
}

/// Load a user-supplied Wiener filter image. Only single-channel (grayscale)
/// images are accepted; anything else fails with `InvalidFilter` so the
/// caller can fall back to building the filter from the stack's own
/// statistics.
pub fn load_filter_image(path: &Path) -> Result<Array2<f32>> {
    let img = image::open(path)?;
    let gray = match img {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageLuma16(_) => img.to_luma16(),
        _ => {
            return Err(StormError::InvalidFilter(format!(
                "{} is not a single-channel image",
                path.display()
            )))
        }
    };

    let (w, h) = gray.dimensions();
    let mut data = Array2::<f32>::zeros((h as usize, w as usize));
    for y in 0..h as usize {
        for x in 0..w as usize {
            data[[y, x]] = gray.get_pixel(x as u32, y as u32).0[0] as f32 / u16::MAX as f32;
        }
    }
    Ok(data)
}

/// Save a Wiener mask (values in `[0, 1]`) as a 16-bit grayscale image, for
/// the `--filter` path's "built from data, saved here" fallback.
pub fn save_filter_image(mask: &Array2<f32>, path: &Path) -> Result<()> {
    let (h, w) = mask.dim();
    let mut img: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::new(w as u32, h as u32);
    for y in 0..h {
        for x in 0..w {
            let v = (mask[[y, x]].clamp(0.0, 1.0) * u16::MAX as f32).round() as u16;
            img.put_pixel(x as u32, y as u32, Luma([v]));
        }
    }
    let format = match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()) {
        Some(ext) if ext == "png" => ImageFormat::Png,
        _ => ImageFormat::Tiff,
    };
    img.save_with_format(path, format)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_8bit_png() {
        let mut data = Array2::<u8>::zeros((4, 6));
        data[[1, 2]] = 200;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        save_gray8(&data, &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn saved_filter_image_round_trips_through_load() {
        let mut mask = Array2::<f32>::from_elem((4, 4), 0.5);
        mask[[1, 1]] = 1.0;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filter.tif");
        save_filter_image(&mask, &path).unwrap();
        let loaded = load_filter_image(&path).unwrap();
        assert_eq!(loaded.dim(), (4, 4));
        assert!((loaded[[1, 1]] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn rejects_rgb_filter_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filter.png");
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([10, 20, 30]));
        img.save(&path).unwrap();
        assert!(matches!(
            load_filter_image(&path),
            Err(StormError::InvalidFilter(_))
        ));
    }
}

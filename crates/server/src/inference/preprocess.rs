use std::path::Path;

use image::ImageReader;
use image::imageops::FilterType;
use ndarray::Array4;

use super::InferenceError;

/// Side length of the square classifier input
pub const INPUT_SIZE: u32 = 128;

/// Load an image into a `(1, 128, 128, 3)` RGB tensor scaled to [0, 1].
///
/// The image is stretched to the target size regardless of aspect ratio.
pub fn preprocess_image(path: &Path) -> Result<Array4<f32>, InferenceError> {
    let decode_error = |source| InferenceError::Decode {
        path: path.to_path_buf(),
        source,
    };

    let img = ImageReader::open(path)
        .map_err(|e| decode_error(image::ImageError::IoError(e)))?
        .with_guessed_format()
        .map_err(|e| decode_error(image::ImageError::IoError(e)))?
        .decode()
        .map_err(decode_error)?;

    let rgb = img
        .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle)
        .to_rgb8();

    let side = INPUT_SIZE as usize;
    let pixels: Vec<f32> = rgb
        .into_raw()
        .into_iter()
        .map(|value| f32::from(value) / 255.0)
        .collect();

    Array4::from_shape_vec((1, side, side, 3), pixels)
        .map_err(|e| InferenceError::Model(format!("Invalid input tensor shape: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn stretches_to_batch_of_one_rgb_square() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.png");
        RgbImage::from_pixel(300, 40, Rgb([255, 0, 51])).save(&path).unwrap();

        let tensor = preprocess_image(&path).unwrap();
        assert_eq!(tensor.shape(), &[1, 128, 128, 3]);
        assert_eq!(tensor[[0, 0, 0, 0]], 1.0);
        assert_eq!(tensor[[0, 64, 64, 1]], 0.0);
        assert!((tensor[[0, 127, 127, 2]] - 0.2).abs() < 1e-6);
        assert!(tensor.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn rejects_non_image_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let err = preprocess_image(&path).unwrap_err();
        assert!(err.to_string().starts_with("Unable to load image at path:"));
    }

    #[test]
    fn rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = preprocess_image(&dir.path().join("missing.jpg")).unwrap_err();
        assert!(matches!(err, InferenceError::Decode { .. }));
    }
}

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("cannot encode an empty {0}x{1} image")]
    EmptyImage(u32, u32),
    #[error("JPEG encoder failed: {0}")]
    Jpeg(#[from] image::ImageError),
}

/// Encode an RGB image as baseline JPEG at `quality` (1-100).
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, EncodeError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(EncodeError::EmptyImage(width, height));
    }

    // Camera JPEGs land around a tenth of the raw size
    let mut jpeg = Vec::with_capacity(image.as_raw().len() / 10);
    JpegEncoder::new_with_quality(&mut jpeg, quality).encode_image(image)?;
    Ok(jpeg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn produces_jpeg_markers() {
        let image = RgbImage::from_pixel(32, 24, Rgb([200, 10, 10]));
        let jpeg = encode_jpeg(&image, 80).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(&jpeg[jpeg.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn quality_changes_size() {
        let image = RgbImage::from_fn(64, 64, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, (x ^ y) as u8]));
        let low = encode_jpeg(&image, 10).unwrap();
        let high = encode_jpeg(&image, 95).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn empty_image_is_an_error() {
        let image = RgbImage::new(0, 10);
        assert!(matches!(
            encode_jpeg(&image, 80),
            Err(EncodeError::EmptyImage(0, 10))
        ));
    }
}

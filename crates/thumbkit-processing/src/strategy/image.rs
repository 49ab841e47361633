use async_trait::async_trait;
use thumbkit_core::{ThumbError, ThumbResult};

use super::{GenerateRequest, ThumbStrategy, IMAGE_EXTENSIONS};
use crate::codec::Thumb;

/// Decodes raster images in process.
#[derive(Debug, Default, Clone)]
pub struct ImageStrategy;

#[async_trait]
impl ThumbStrategy for ImageStrategy {
    fn name(&self) -> &'static str {
        "image"
    }

    fn extensions(&self) -> &[&'static str] {
        IMAGE_EXTENSIONS
    }

    async fn generate(&self, request: GenerateRequest) -> ThumbResult<Thumb> {
        let data = request.source.read_all().await?;
        let filename = request.filename;

        // Decoding large images is CPU bound.
        tokio::task::spawn_blocking(move || Thumb::decode(&data, &filename))
            .await
            .map_err(|e| ThumbError::Decode(format!("decode task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    #[test]
    fn test_claims_raster_formats() {
        let strategy = ImageStrategy;
        assert!(strategy.can_handle("a.JPG"));
        assert!(strategy.can_handle("a.gif"));
        assert!(!strategy.can_handle("a.webp"));
        assert!(!strategy.needs_url());
    }

    #[tokio::test]
    async fn test_generate_decodes() {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 10, Rgb([1, 2, 3])))
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();

        let request = GenerateRequest::new(Bytes::from(buf.into_inner()), "x.png");
        let thumb = ImageStrategy.generate(request).await.unwrap();
        assert_eq!(thumb.size(), (20, 10));
    }
}

//! In-memory thumbnail image

use std::io::Cursor;

use bytes::Bytes;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use thumbkit_core::{ThumbError, ThumbResult, TargetSize};
use thumbkit_storage::keys::avatar_key;
use thumbkit_storage::Storage;

use super::geometry::cover_crop_geometry;

/// Lower-cased, dot-prefixed extension of the last path component
/// (`"Movie.MKV"` gives `".mkv"`), or `None` when the name has no dot.
pub fn extension_of(filename: &str) -> Option<String> {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    name.rfind('.').map(|idx| name[idx..].to_lowercase())
}

/// A decoded raster plus the extension it was decoded from.
///
/// A `Thumb` belongs to a single generation request; only the encoded PNG
/// leaves this type.
#[derive(Debug, Clone)]
pub struct Thumb {
    image: DynamicImage,
    ext: String,
}

impl Thumb {
    /// Decode `data` using the format implied by the extension of `filename`.
    pub fn decode(data: &[u8], filename: &str) -> ThumbResult<Self> {
        let ext = extension_of(filename).ok_or_else(|| {
            ThumbError::UnsupportedType(format!("{} has no extension", filename))
        })?;

        let format = match ext.as_str() {
            ".jpg" | ".jpeg" => ImageFormat::Jpeg,
            ".png" => ImageFormat::Png,
            ".gif" => ImageFormat::Gif,
            other => {
                return Err(ThumbError::UnsupportedType(format!(
                    "cannot decode {} images",
                    other
                )))
            }
        };

        let image = image::load_from_memory_with_format(data, format)
            .map_err(|e| ThumbError::Decode(format!("{}: {}", filename, e)))?;

        Ok(Self { image, ext })
    }

    pub fn from_image(image: DynamicImage, ext: impl Into<String>) -> Self {
        Self {
            image,
            ext: ext.into(),
        }
    }

    /// Current `(width, height)`
    pub fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn extension(&self) -> &str {
        &self.ext
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Resize and crop in place so the image exactly covers `target`.
    pub fn cover_crop(&mut self, target: TargetSize) {
        self.image = self.cropped(target);
    }

    fn cropped(&self, target: TargetSize) -> DynamicImage {
        let (width, height) = self.size();
        let g = cover_crop_geometry(width, height, target);

        self.image
            .resize_exact(g.scaled_width, g.scaled_height, FilterType::Lanczos3)
            .crop_imm(g.crop_x, g.crop_y, g.width, g.height)
    }

    /// Encode as PNG
    pub fn encode_png(&self) -> ThumbResult<Vec<u8>> {
        encode_png(&self.image)
    }

    /// Encode as PNG and write it to `path`.
    pub async fn save(&self, storage: &dyn Storage, path: &str) -> ThumbResult<()> {
        let png = self.encode_png()?;
        storage
            .put(path, Bytes::from(png))
            .await
            .map_err(|e| ThumbError::Io(format!("failed to write {}: {}", path, e)))
    }

    /// Write small, medium and large square avatars under `dir`.
    ///
    /// Sizes are written in order and the first failure is returned. Sizes
    /// written before the failure are left in place.
    pub async fn create_avatar(
        &self,
        storage: &dyn Storage,
        owner_id: u64,
        dir: &str,
        sizes: [u32; 3],
    ) -> ThumbResult<Vec<String>> {
        let mut written = Vec::with_capacity(sizes.len());

        for (index, side) in sizes.into_iter().enumerate() {
            let target = TargetSize::square(side)?;
            let png = encode_png(&self.cropped(target))?;
            let key = avatar_key(dir, owner_id, index);

            storage
                .put(&key, Bytes::from(png))
                .await
                .map_err(|e| ThumbError::Io(format!("failed to write {}: {}", key, e)))?;

            tracing::debug!(owner_id, key = %key, side, "Avatar written");
            written.push(key);
        }

        Ok(written)
    }
}

fn encode_png(image: &DynamicImage) -> ThumbResult<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| ThumbError::Io(format!("failed to encode PNG: {}", e)))?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use thumbkit_storage::MockStorage;

    fn encoded(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    fn rgb(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 40, 40])))
    }

    fn rgba(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([0, 0, 255, 255])))
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("Movie.MKV").as_deref(), Some(".mkv"));
        assert_eq!(extension_of("dir.v2/archive.tar.gz").as_deref(), Some(".gz"));
        assert_eq!(extension_of("dir.v2/README"), None);
        assert_eq!(extension_of("noext"), None);
    }

    #[test]
    fn test_decode_supported_formats() {
        let png = encoded(rgba(32, 16), ImageFormat::Png);
        let jpg = encoded(rgb(30, 20), ImageFormat::Jpeg);
        let gif = encoded(rgba(12, 8), ImageFormat::Gif);

        assert_eq!(Thumb::decode(&png, "a.png").unwrap().size(), (32, 16));
        assert_eq!(Thumb::decode(&jpg, "a.jpg").unwrap().size(), (30, 20));
        assert_eq!(Thumb::decode(&jpg, "a.JPEG").unwrap().size(), (30, 20));
        assert_eq!(Thumb::decode(&gif, "a.gif").unwrap().size(), (12, 8));
        assert_eq!(Thumb::decode(&png, "a.PNG").unwrap().extension(), ".png");
    }

    #[test]
    fn test_decode_corrupt_data() {
        let result = Thumb::decode(b"definitely not a png", "broken.png");
        assert!(matches!(result, Err(ThumbError::Decode(_))));
    }

    #[test]
    fn test_decode_unknown_extension() {
        let png = encoded(rgba(4, 4), ImageFormat::Png);
        assert!(matches!(
            Thumb::decode(&png, "image.bmp"),
            Err(ThumbError::UnsupportedType(_))
        ));
        assert!(matches!(
            Thumb::decode(&png, "image"),
            Err(ThumbError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_cover_crop_exact_size() {
        let mut thumb = Thumb::from_image(rgb(800, 600), ".png");
        thumb.cover_crop(TargetSize::new(200, 200).unwrap());
        assert_eq!(thumb.size(), (200, 200));

        let mut thumb = Thumb::from_image(rgb(90, 700), ".png");
        thumb.cover_crop(TargetSize::new(400, 300).unwrap());
        assert_eq!(thumb.size(), (400, 300));
    }

    #[test]
    fn test_encode_is_deterministic() {
        let make = || {
            let mut thumb = Thumb::from_image(rgba(640, 480), ".png");
            thumb.cover_crop(TargetSize::new(100, 100).unwrap());
            thumb.encode_png().unwrap()
        };
        assert_eq!(make(), make());
    }

    #[tokio::test]
    async fn test_save_writes_png() {
        let storage = MockStorage::new();
        let thumb = Thumb::from_image(rgb(10, 10), ".jpg");

        thumb.save(&storage, "thumbs/1_a.jpg._thumb").await.unwrap();

        let data = storage.get_file("thumbs/1_a.jpg._thumb").unwrap();
        let decoded = image::load_from_memory_with_format(&data, ImageFormat::Png).unwrap();
        assert_eq!(decoded.dimensions(), (10, 10));
    }

    #[tokio::test]
    async fn test_create_avatar() {
        let storage = MockStorage::new();
        let thumb = Thumb::from_image(rgb(300, 200), ".png");

        let keys = thumb
            .create_avatar(&storage, 9, "avatars", [50, 130, 200])
            .await
            .unwrap();

        assert_eq!(
            keys,
            vec![
                "avatars/avatar_9_0.png",
                "avatars/avatar_9_1.png",
                "avatars/avatar_9_2.png"
            ]
        );
        let large = storage.get_file("avatars/avatar_9_2.png").unwrap();
        let decoded = image::load_from_memory(&large).unwrap();
        assert_eq!(decoded.dimensions(), (200, 200));
    }

    #[tokio::test]
    async fn test_create_avatar_stops_at_first_failure() {
        let storage = MockStorage::new();
        storage.fail_puts(true);
        let thumb = Thumb::from_image(rgb(64, 64), ".png");

        let result = thumb.create_avatar(&storage, 9, "avatars", [8, 16, 32]).await;
        assert!(matches!(result, Err(ThumbError::Io(_))));
        assert_eq!(storage.put_count(), 1);
    }
}

//! Placeholder-image stage.
//!
//! Produces a tiny base64 PNG data URL from the smallest generated
//! thumbnail. Clients paint it blurred while the real image loads. Purely
//! cosmetic, so a missing or broken thumbnail degrades to a null field.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::imageops::FilterType;
use image::ImageFormat;
use image::ImageReader;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::data::media::MediaRecord;
use crate::pipeline::{FileStage, StageError};

const PLACEHOLDER_HEIGHT: u32 = 6;

pub struct DataUrlStage {
    thumbnails_dir: PathBuf,
    smallest_height: u32,
}

impl DataUrlStage {
    pub fn new(thumbnails_dir: &Path, thumbnail_heights: &[u32]) -> Self {
        Self {
            thumbnails_dir: thumbnails_dir.to_path_buf(),
            smallest_height: thumbnail_heights.iter().copied().min().unwrap_or(200),
        }
    }

    fn thumbnail_path(&self, hash: &str) -> PathBuf {
        self.thumbnails_dir
            .join(hash)
            .join(format!("{}p.avif", self.smallest_height))
    }
}

impl FileStage for DataUrlStage {
    fn name(&self) -> &'static str {
        "data_url"
    }

    fn process(&self, record: &mut MediaRecord) -> Result<(), StageError> {
        let path = self.thumbnail_path(&record.hash);
        match encode_placeholder(&path) {
            Ok(data_url) => record.data_url = Some(data_url),
            Err(e) => warn!("No placeholder for {}: {}", record.relative_path, e),
        }
        Ok(())
    }
}

/// Downscale the thumbnail to a few pixels of height and re-encode it as
/// an inline PNG data URL.
fn encode_placeholder(thumbnail: &Path) -> anyhow::Result<String> {
    let img = ImageReader::open(thumbnail)?.with_guessed_format()?.decode()?;

    let width =
        ((img.width() as f64 * PLACEHOLDER_HEIGHT as f64 / img.height() as f64).round() as u32).max(1);
    let tiny = img.resize_exact(width, PLACEHOLDER_HEIGHT, FilterType::Triangle);

    let mut buf = Cursor::new(Vec::new());
    tiny.write_to(&mut buf, ImageFormat::Png)?;
    Ok(format!(
        "data:image/png;base64,{}",
        BASE64.encode(buf.into_inner())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_encodes_smallest_thumbnail() {
        let dir = tempfile::tempdir().unwrap();
        let hash = "abc123";
        let thumb_dir = dir.path().join(hash);
        std::fs::create_dir_all(&thumb_dir).unwrap();
        // PNG bytes under the .avif name; the decoder sniffs content.
        let img = RgbImage::from_pixel(300, 200, image::Rgb([120, 40, 200]));
        img.save_with_format(thumb_dir.join("200p.avif"), ImageFormat::Png)
            .unwrap();

        let stage = DataUrlStage::new(dir.path(), &[500, 200, 1080]);
        let mut record = MediaRecord::new("img.jpg", "img.jpg");
        record.hash = hash.to_string();
        stage.process(&mut record).unwrap();

        let data_url = record.data_url.unwrap();
        assert!(data_url.starts_with("data:image/png;base64,"));

        let decoded = BASE64
            .decode(data_url.trim_start_matches("data:image/png;base64,"))
            .unwrap();
        let tiny = image::load_from_memory(&decoded).unwrap();
        assert_eq!(tiny.height(), PLACEHOLDER_HEIGHT);
        assert_eq!(tiny.width(), 9);
    }

    #[test]
    fn test_missing_thumbnail_leaves_field_null() {
        let dir = tempfile::tempdir().unwrap();
        let stage = DataUrlStage::new(dir.path(), &[200]);
        let mut record = MediaRecord::new("img.jpg", "img.jpg");
        record.hash = "nosuchhash".to_string();

        stage.process(&mut record).unwrap();
        assert!(record.data_url.is_none());
    }
}

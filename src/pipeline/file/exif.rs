//! Technical-metadata stage.
//!
//! Normalizes dimensions, duration, format, and size across container
//! formats (still EXIF, GIF, QuickTime, Matroska all report the same
//! concepts under different blocks) and keeps the raw section tree on the
//! record for downstream stages.
//!
//! This is the only stage allowed to fail permanently: if the probe cannot
//! parse the file at all, the file is skipped for good.

use serde_json::json;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::data::media::{MediaRecord, Section};
use crate::pipeline::{FileStage, StageError};
use crate::probe::MetadataProbe;

pub struct ExifStage<'a> {
    probe: &'a dyn MetadataProbe,
    media_dir: PathBuf,
}

impl<'a> ExifStage<'a> {
    pub fn new(probe: &'a dyn MetadataProbe, media_dir: &Path) -> Self {
        Self {
            probe,
            media_dir: media_dir.to_path_buf(),
        }
    }
}

impl FileStage for ExifStage<'_> {
    fn name(&self) -> &'static str {
        "exif"
    }

    fn process(&self, record: &mut MediaRecord) -> Result<(), StageError> {
        let path = self.media_dir.join(&record.relative_path);
        let mut metadata = self
            .probe
            .probe(&path)
            .map_err(|e| StageError::Unparsable(format!("{}: {}", record.relative_path, e)))?;

        fix_altitude_ref(&mut metadata.exif, &mut metadata.composite);

        let mut width = u32_value(&metadata.file, "ImageWidth");
        let mut height = u32_value(&metadata.file, "ImageHeight");
        let mut duration: Option<f64> = None;

        // container blocks override the file block, but only for the keys
        // they actually carry
        if let Some(gif) = &metadata.gif {
            width = u32_value(gif, "ImageWidth").or(width);
            height = u32_value(gif, "ImageHeight").or(height);
        }
        if let Some(quicktime) = &metadata.quicktime {
            width = u32_value(quicktime, "ImageWidth").or(width);
            height = u32_value(quicktime, "ImageHeight").or(height);
            duration = f64_value(quicktime, "Duration").or(duration);
        }
        if let Some(matroska) = &metadata.matroska {
            width = u32_value(matroska, "ImageWidth").or(width);
            height = u32_value(matroska, "ImageHeight").or(height);
            duration = matroska
                .get("Duration")
                .and_then(Value::as_str)
                .and_then(parse_duration)
                .or(duration);
        }

        let (Some(width), Some(height)) = (width, height) else {
            return Err(StageError::Unparsable(format!(
                "{}: no dimensions in any metadata block",
                record.relative_path
            )));
        };

        record.width = Some(width);
        record.height = Some(height);
        record.duration = duration;
        record.format = metadata
            .file
            .get("MIMEType")
            .and_then(Value::as_str)
            .map(str::to_string);
        record.size_bytes = metadata.file.get("FileSize").and_then(Value::as_u64);

        record.file_section = Some(metadata.file);
        record.exif_section = metadata.exif;
        record.composite_section = metadata.composite;
        record.xmp_section = metadata.xmp;
        record.gif_section = metadata.gif;
        record.quicktime_section = metadata.quicktime;
        record.matroska_section = metadata.matroska;

        Ok(())
    }
}

/// Altitude reference is 0 (above sea level) or 1 (below). Some sensors
/// (LG G4 among them) emit other values when above sea level; treat those
/// as noise: force ref 0 and make the altitude magnitude non-negative.
fn fix_altitude_ref(exif: &mut Option<Section>, composite: &mut Option<Section>) {
    let Some(exif) = exif.as_mut() else {
        return;
    };
    let Some(altitude_ref) = exif.get("GPSAltitudeRef") else {
        return;
    };
    let is_valid = altitude_ref
        .as_i64()
        .map(|r| r == 0 || r == 1)
        .unwrap_or(false);
    if is_valid {
        return;
    }

    if let Some(composite) = composite.as_mut() {
        if let Some(altitude) = composite.get("GPSAltitude").and_then(Value::as_f64) {
            composite.insert("GPSAltitude".into(), json!(altitude.abs()));
        }
    }
    exif.insert("GPSAltitudeRef".into(), json!(0));
}

/// Parse a Matroska `H:MM:SS.fff` duration into seconds.
fn parse_duration(duration: &str) -> Option<f64> {
    let mut parts = duration.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

fn u32_value(section: &Section, key: &str) -> Option<u32> {
    section.get(key).and_then(Value::as_u64).map(|v| v as u32)
}

fn f64_value(section: &Section, key: &str) -> Option<f64> {
    section.get(key).and_then(Value::as_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{section_from, RawMetadata, StaticProbe};

    fn base_metadata() -> RawMetadata {
        RawMetadata {
            file: section_from(&[
                ("FileSize", json!(1234)),
                ("MIMEType", json!("image/jpeg")),
                ("ImageWidth", json!(4000)),
                ("ImageHeight", json!(3000)),
            ]),
            ..Default::default()
        }
    }

    fn run_stage(metadata: RawMetadata) -> Result<MediaRecord, StageError> {
        let probe = StaticProbe { metadata };
        let dir = tempfile::tempdir().unwrap();
        let stage = ExifStage::new(&probe, dir.path());
        let mut record = MediaRecord::new("img.jpg", "img.jpg");
        stage.process(&mut record)?;
        Ok(record)
    }

    #[test]
    fn test_basic_fields_extracted() {
        let record = run_stage(base_metadata()).unwrap();
        assert_eq!(record.width, Some(4000));
        assert_eq!(record.height, Some(3000));
        assert_eq!(record.format.as_deref(), Some("image/jpeg"));
        assert_eq!(record.size_bytes, Some(1234));
        assert_eq!(record.duration, None);
    }

    #[test]
    fn test_quicktime_overrides_dimensions_and_duration() {
        let mut metadata = base_metadata();
        metadata.quicktime = Some(section_from(&[
            ("ImageWidth", json!(1920)),
            ("ImageHeight", json!(1080)),
            ("Duration", json!(12.5)),
        ]));

        let record = run_stage(metadata).unwrap();
        assert_eq!(record.width, Some(1920));
        assert_eq!(record.height, Some(1080));
        assert_eq!(record.duration, Some(12.5));
    }

    #[test]
    fn test_container_without_dimensions_keeps_file_values() {
        let mut metadata = base_metadata();
        metadata.quicktime = Some(section_from(&[("Duration", json!(4.2))]));

        let record = run_stage(metadata).unwrap();
        assert_eq!(record.width, Some(4000));
        assert_eq!(record.height, Some(3000));
        assert_eq!(record.duration, Some(4.2));
    }

    #[test]
    fn test_matroska_duration_string() {
        let mut metadata = base_metadata();
        metadata.matroska = Some(section_from(&[
            ("ImageWidth", json!(1280)),
            ("ImageHeight", json!(720)),
            ("Duration", json!("0:01:30.500")),
        ]));

        let record = run_stage(metadata).unwrap();
        assert_eq!(record.duration, Some(90.5));
    }

    #[test]
    fn test_altitude_ref_noise_corrected() {
        let mut metadata = base_metadata();
        metadata.exif = Some(section_from(&[("GPSAltitudeRef", json!(2))]));
        metadata.composite = Some(section_from(&[("GPSAltitude", json!(-12.5))]));

        let record = run_stage(metadata).unwrap();
        let exif = record.exif_section.unwrap();
        let composite = record.composite_section.unwrap();
        assert_eq!(exif.get("GPSAltitudeRef").unwrap(), 0);
        assert_eq!(composite.get("GPSAltitude").unwrap().as_f64(), Some(12.5));
    }

    #[test]
    fn test_altitude_ref_noise_matches_ref_zero_magnitude() {
        // ref 2 (sensor noise) must land on the same magnitude as ref 0
        let mut noisy = base_metadata();
        noisy.exif = Some(section_from(&[("GPSAltitudeRef", json!(2))]));
        noisy.composite = Some(section_from(&[("GPSAltitude", json!(-37.0))]));

        let mut clean = base_metadata();
        clean.exif = Some(section_from(&[("GPSAltitudeRef", json!(0))]));
        clean.composite = Some(section_from(&[("GPSAltitude", json!(37.0))]));

        let noisy_record = run_stage(noisy).unwrap();
        let clean_record = run_stage(clean).unwrap();
        assert_eq!(
            noisy_record.composite_section.unwrap().get("GPSAltitude"),
            clean_record.composite_section.unwrap().get("GPSAltitude"),
        );
    }

    #[test]
    fn test_valid_altitude_ref_untouched() {
        let mut metadata = base_metadata();
        metadata.exif = Some(section_from(&[("GPSAltitudeRef", json!(1))]));
        metadata.composite = Some(section_from(&[("GPSAltitude", json!(-3.0))]));

        let record = run_stage(metadata).unwrap();
        assert_eq!(
            record.composite_section.unwrap().get("GPSAltitude").unwrap().as_f64(),
            Some(-3.0)
        );
    }

    #[test]
    fn test_missing_dimensions_is_permanent_failure() {
        let metadata = RawMetadata {
            file: section_from(&[("FileSize", json!(10))]),
            ..Default::default()
        };
        match run_stage(metadata) {
            Err(StageError::Unparsable(_)) => {}
            other => panic!("expected permanent failure, got {:?}", other.map(|_| ())),
        }
    }
}

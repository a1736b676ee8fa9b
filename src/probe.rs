//! Raw technical-metadata probing.
//!
//! The exif stage consumes a `RawMetadata` section tree: named blocks of
//! key/value pairs mirroring how exiftool groups its output (File, EXIF,
//! Composite, plus one block per container format). Different containers
//! report the same concept under different blocks, and the stage is the one
//! place that normalizes them.
//!
//! `ExifProbe` is the built-in implementation for still images, built on
//! kamadak-exif and the image crate. Video probing (QuickTime/Matroska
//! blocks) comes from an external tool wired in behind the same trait.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use serde_json::{json, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::data::media::Section;

/// Probe output, one optional section per metadata block. `file` is always
/// present; a probe that cannot produce it failed entirely.
#[derive(Debug, Clone, Default)]
pub struct RawMetadata {
    pub file: Section,
    pub exif: Option<Section>,
    pub composite: Option<Section>,
    pub xmp: Option<Section>,
    pub gif: Option<Section>,
    pub quicktime: Option<Section>,
    pub matroska: Option<Section>,
}

/// Extracts raw metadata from a media file. An `Err` here means the file is
/// fundamentally unparsable and is treated as a permanent per-file failure.
pub trait MetadataProbe: Send + Sync {
    fn probe(&self, path: &Path) -> Result<RawMetadata>;
}

/// Still-image probe using the image crate for dimensions/format and
/// kamadak-exif for tag data.
pub struct ExifProbe;

impl MetadataProbe for ExifProbe {
    fn probe(&self, path: &Path) -> Result<RawMetadata> {
        let reader = image::ImageReader::open(path)
            .with_context(|| format!("Cannot open {}", path.display()))?
            .with_guessed_format()?;
        let format = reader
            .format()
            .ok_or_else(|| anyhow!("Unrecognized image format: {}", path.display()))?;
        let (width, height) = reader
            .into_dimensions()
            .with_context(|| format!("Cannot decode {}", path.display()))?;

        let fs_meta = std::fs::metadata(path)?;
        let mut file = Section::new();
        file.insert("FileSize".into(), json!(fs_meta.len()));
        file.insert("MIMEType".into(), json!(format!("image/{}", format.extensions_str()[0])));
        file.insert("ImageWidth".into(), json!(width));
        file.insert("ImageHeight".into(), json!(height));
        if let Ok(modified) = fs_meta.modified() {
            let local: DateTime<Local> = modified.into();
            file.insert(
                "FileModifyDate".into(),
                json!(local.format("%Y:%m:%d %H:%M:%S%z").to_string()),
            );
        }

        let mut metadata = RawMetadata {
            file,
            ..Default::default()
        };

        if let Ok(handle) = File::open(path) {
            let mut bufreader = BufReader::new(handle);
            if let Ok(exif) = exif::Reader::new().read_from_container(&mut bufreader) {
                metadata.exif = Some(exif_section(&exif));
                metadata.composite = Some(composite_section(&exif));
            }
        }

        Ok(metadata)
    }
}

fn string_field(exif: &exif::Exif, tag: exif::Tag) -> Option<String> {
    exif.get_field(tag, exif::In::PRIMARY)
        .map(|f| f.display_value().to_string().trim_matches('"').to_string())
}

fn rational_field(exif: &exif::Exif, tag: exif::Tag) -> Option<f64> {
    let field = exif.get_field(tag, exif::In::PRIMARY)?;
    if let exif::Value::Rational(ref v) = field.value {
        v.first().map(|r| r.num as f64 / r.denom as f64)
    } else {
        None
    }
}

fn exif_section(exif: &exif::Exif) -> Section {
    let mut section = Section::new();
    if let Some(v) = string_field(exif, exif::Tag::DateTimeOriginal) {
        section.insert("DateTimeOriginal".into(), json!(v));
    }
    if let Some(v) = string_field(exif, exif::Tag::OffsetTimeOriginal) {
        section.insert("OffsetTimeOriginal".into(), json!(v));
    }
    if let Some(v) = string_field(exif, exif::Tag::DateTimeDigitized) {
        section.insert("CreateDate".into(), json!(v));
    }
    if let Some(v) = string_field(exif, exif::Tag::Make) {
        section.insert("Make".into(), json!(v));
    }
    if let Some(v) = string_field(exif, exif::Tag::Model) {
        section.insert("Model".into(), json!(v));
    }
    if let Some(field) = exif.get_field(exif::Tag::GPSAltitudeRef, exif::In::PRIMARY) {
        if let exif::Value::Byte(ref v) = field.value {
            if let Some(&altitude_ref) = v.first() {
                section.insert("GPSAltitudeRef".into(), json!(altitude_ref));
            }
        }
    }
    section
}

/// Derived values that exiftool would place in its Composite block:
/// decimal GPS coordinates, signed altitude, GPS UTC timestamp.
fn composite_section(exif: &exif::Exif) -> Section {
    let mut section = Section::new();

    if let (Some(lat_field), Some(lat_ref), Some(lon_field), Some(lon_ref)) = (
        exif.get_field(exif::Tag::GPSLatitude, exif::In::PRIMARY),
        string_field(exif, exif::Tag::GPSLatitudeRef),
        exif.get_field(exif::Tag::GPSLongitude, exif::In::PRIMARY),
        string_field(exif, exif::Tag::GPSLongitudeRef),
    ) {
        if let (exif::Value::Rational(lat_vals), exif::Value::Rational(lon_vals)) =
            (&lat_field.value, &lon_field.value)
        {
            if lat_vals.len() >= 3 && lon_vals.len() >= 3 {
                let lat = dms_to_decimal(
                    lat_vals[0].num as f64 / lat_vals[0].denom as f64,
                    lat_vals[1].num as f64 / lat_vals[1].denom as f64,
                    lat_vals[2].num as f64 / lat_vals[2].denom as f64,
                );
                let lon = dms_to_decimal(
                    lon_vals[0].num as f64 / lon_vals[0].denom as f64,
                    lon_vals[1].num as f64 / lon_vals[1].denom as f64,
                    lon_vals[2].num as f64 / lon_vals[2].denom as f64,
                );
                let lat = if lat_ref.contains('S') { -lat } else { lat };
                let lon = if lon_ref.contains('W') { -lon } else { lon };
                section.insert("GPSLatitude".into(), json!(lat));
                section.insert("GPSLongitude".into(), json!(lon));
            }
        }
    }

    if let Some(altitude) = rational_field(exif, exif::Tag::GPSAltitude) {
        let below_sea_level = exif
            .get_field(exif::Tag::GPSAltitudeRef, exif::In::PRIMARY)
            .and_then(|f| {
                if let exif::Value::Byte(ref v) = f.value {
                    v.first().copied()
                } else {
                    None
                }
            })
            .map(|r| r == 1)
            .unwrap_or(false);
        let altitude = if below_sea_level { -altitude } else { altitude };
        section.insert("GPSAltitude".into(), json!(altitude));
    }

    if let (Some(date), Some(time_field)) = (
        string_field(exif, exif::Tag::GPSDateStamp),
        exif.get_field(exif::Tag::GPSTimeStamp, exif::In::PRIMARY),
    ) {
        if let exif::Value::Rational(ref v) = time_field.value {
            if v.len() >= 3 {
                let stamp = format!(
                    "{} {:02}:{:02}:{:02}Z",
                    date,
                    v[0].num / v[0].denom.max(1),
                    v[1].num / v[1].denom.max(1),
                    v[2].num / v[2].denom.max(1),
                );
                section.insert("GPSDateTime".into(), json!(stamp));
            }
        }
    }

    section
}

fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + minutes / 60.0 + seconds / 3600.0
}

/// In-memory probe used by tests and by callers that already ran an
/// external tool.
pub struct StaticProbe {
    pub metadata: RawMetadata,
}

impl MetadataProbe for StaticProbe {
    fn probe(&self, _path: &Path) -> Result<RawMetadata> {
        Ok(self.metadata.clone())
    }
}

/// Convenience for building sections in tests and probe implementations.
pub fn section_from(pairs: &[(&str, Value)]) -> Section {
    let mut section = Section::new();
    for (key, value) in pairs {
        section.insert((*key).to_string(), value.clone());
    }
    section
}

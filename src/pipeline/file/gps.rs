//! GPS stage: coordinates, reverse-geocoded place, and the satellite UTC
//! timestamp when the camera recorded one.
//!
//! Files without GPS metadata pass through untouched; a failing geocoder
//! only costs the place name, never the coordinates.

use chrono::NaiveDateTime;
use serde_json::Value;
use tracing::warn;

use crate::capabilities::ReverseGeocoder;
use crate::data::media::MediaRecord;
use crate::pipeline::{FileStage, StageError};

pub struct GpsStage<'a> {
    geocoder: &'a dyn ReverseGeocoder,
}

impl<'a> GpsStage<'a> {
    pub fn new(geocoder: &'a dyn ReverseGeocoder) -> Self {
        Self { geocoder }
    }
}

impl FileStage for GpsStage<'_> {
    fn name(&self) -> &'static str {
        "gps"
    }

    fn process(&self, record: &mut MediaRecord) -> Result<(), StageError> {
        let Some(composite) = &record.composite_section else {
            return Ok(());
        };

        let latitude = composite.get("GPSLatitude").and_then(Value::as_f64);
        let longitude = composite.get("GPSLongitude").and_then(Value::as_f64);
        let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
            return Ok(());
        };

        record.latitude = Some(latitude);
        record.longitude = Some(longitude);
        record.altitude = composite.get("GPSAltitude").and_then(Value::as_f64);

        record.datetime_utc = composite
            .get("GPSDateTime")
            .and_then(Value::as_str)
            .and_then(parse_gps_datetime);

        match self.geocoder.reverse_geocode(latitude, longitude) {
            Ok(location) => record.location = Some(location),
            Err(e) => warn!("Reverse geocode failed for {}: {}", record.relative_path, e),
        }

        Ok(())
    }
}

/// GPS timestamps arrive with or without fractional seconds.
fn parse_gps_datetime(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y:%m:%d %H:%M:%S%.fZ")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y:%m:%d %H:%M:%SZ"))
        .ok()
}

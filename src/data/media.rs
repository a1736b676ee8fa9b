//! Accumulator records for the two pipelines.
//!
//! Each pipeline works on one record type with every stage-owned field
//! nullable from the start. A stage fills in the fields it owns and must
//! leave everything populated earlier untouched; the record grows
//! monotonically as it moves through the stage chain.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::data::classification::{
    ActivityType, AnimalType, DocumentType, EventType, ObjectType, PeopleType, SceneType,
    WeatherCondition,
};
use crate::data::types::{FaceBox, ObjectBox, OcrBox, WeatherObservation};
use crate::data::GeoLocation;

/// One named block of raw probe metadata (the exiftool section model).
pub type Section = serde_json::Map<String, serde_json::Value>;

/// Which fallback produced the local capture time.
///
/// Recorded alongside the time itself so downstream consumers know how
/// trustworthy it is; `OffsetTime` is exact, `ModificationDate` is a last
/// resort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeSource {
    OffsetTime,
    Gps,
    DateTimeOriginal,
    CreateDate,
    Filename,
    ModificationDate,
}

impl TimeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeSource::OffsetTime => "OffsetTime",
            TimeSource::Gps => "GPS",
            TimeSource::DateTimeOriginal => "DateTimeOriginal",
            TimeSource::CreateDate => "CreateDate",
            TimeSource::Filename => "Filename",
            TimeSource::ModificationDate => "ModificationDate",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "OffsetTime" => Some(TimeSource::OffsetTime),
            "GPS" => Some(TimeSource::Gps),
            "DateTimeOriginal" => Some(TimeSource::DateTimeOriginal),
            "CreateDate" => Some(TimeSource::CreateDate),
            "Filename" => Some(TimeSource::Filename),
            "ModificationDate" => Some(TimeSource::ModificationDate),
            _ => None,
        }
    }
}

/// One record per ingested media file, filled in by the metadata pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaRecord {
    // Identity (hash stage)
    pub id: String,
    pub filename: String,
    pub relative_path: String,
    pub hash: String,

    // Technical metadata (exif stage)
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration: Option<f64>,
    pub format: Option<String>,
    pub size_bytes: Option<u64>,
    pub file_section: Option<Section>,
    pub exif_section: Option<Section>,
    pub composite_section: Option<Section>,
    pub xmp_section: Option<Section>,
    pub gif_section: Option<Section>,
    pub quicktime_section: Option<Section>,
    pub matroska_section: Option<Section>,

    // Tiny preview (data url stage)
    pub data_url: Option<String>,

    // GPS (gps stage)
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub location: Option<GeoLocation>,
    /// UTC capture time; set by the GPS stage when a GPS timestamp exists,
    /// refined by the time stage otherwise.
    pub datetime_utc: Option<NaiveDateTime>,

    // Local time (time stage)
    pub datetime_local: Option<NaiveDateTime>,
    pub datetime_source: Option<TimeSource>,
    pub timezone_name: Option<String>,
    /// UTC offset in seconds.
    pub timezone_offset: Option<i32>,

    // Weather (weather stage)
    pub weather_recorded_at: Option<NaiveDateTime>,
    pub weather_temperature: Option<f64>,
    pub weather_dewpoint: Option<f64>,
    pub weather_relative_humidity: Option<f64>,
    pub weather_precipitation: Option<f64>,
    pub weather_wind_gust: Option<f64>,
    pub weather_pressure: Option<f64>,
    pub weather_sun_hours: Option<f64>,
    pub weather_condition: Option<WeatherCondition>,
}

impl MediaRecord {
    /// Seed record before any stage has run.
    pub fn new(filename: &str, relative_path: &str) -> Self {
        Self {
            filename: filename.to_string(),
            relative_path: relative_path.to_string(),
            ..Default::default()
        }
    }

    pub fn apply_weather(&mut self, observation: &WeatherObservation) {
        self.weather_recorded_at = Some(observation.recorded_at);
        self.weather_temperature = observation.temperature;
        self.weather_dewpoint = observation.dewpoint;
        self.weather_relative_humidity = observation.relative_humidity;
        self.weather_precipitation = observation.precipitation;
        self.weather_wind_gust = observation.wind_gust;
        self.weather_pressure = observation.pressure;
        self.weather_sun_hours = observation.sun_hours;
        self.weather_condition = observation.condition;
    }
}

/// One record per sampled frame, filled in by the frame pipeline.
///
/// Photos have exactly one frame at 0%; videos have one per configured
/// percentage offset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameRecord {
    pub frame_percentage: u32,

    // Embedding stage
    pub embedding: Option<Vec<f32>>,

    // Classification stage
    pub scene_type: Option<SceneType>,
    pub people_type: Option<PeopleType>,
    pub animal_type: Option<AnimalType>,
    pub document_type: Option<DocumentType>,
    pub object_type: Option<ObjectType>,
    pub activity_type: Option<ActivityType>,
    pub event_type: Option<EventType>,
    pub weather_condition: Option<WeatherCondition>,
    pub is_outside: Option<bool>,
    pub is_landscape: Option<bool>,
    pub is_cityscape: Option<bool>,
    pub is_travel: Option<bool>,

    // OCR stage
    pub has_legible_text: Option<bool>,
    pub ocr_text: Option<String>,
    pub document_summary: Option<String>,
    pub ocr_boxes: Vec<OcrBox>,

    // Face detection stage
    pub faces: Vec<FaceBox>,

    // Caption stage
    pub summary: Option<String>,
    pub caption: Option<String>,

    // Object detection stage
    pub objects: Vec<ObjectBox>,

    // Quality stage
    pub measured_sharpness: Option<f64>,
    pub measured_noise: Option<i64>,
    pub measured_brightness: Option<f64>,
    pub measured_contrast: Option<f64>,
    pub measured_clipping: Option<f64>,
    pub measured_dynamic_range: Option<f64>,
    pub quality_score: Option<f64>,
}

impl FrameRecord {
    pub fn new(frame_percentage: u32) -> Self {
        Self {
            frame_percentage,
            ..Default::default()
        }
    }
}

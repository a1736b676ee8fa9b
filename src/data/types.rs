//! Value types produced by the capability interfaces.
//!
//! Box coordinates are proportional to the full image width/height (0..1),
//! so they survive thumbnail rescaling without adjustment.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::data::classification::WeatherCondition;

/// A detected object with label and confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectBox {
    /// Top-left corner, proportional coordinates.
    pub position: (f64, f64),
    pub width: f64,
    pub height: f64,
    pub label: String,
    pub confidence: f64,
}

/// A recognized word/line of text with its bounding box.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrBox {
    pub position: (f64, f64),
    pub width: f64,
    pub height: f64,
    pub text: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaceSex {
    Male,
    Female,
}

impl FaceSex {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaceSex::Male => "M",
            FaceSex::Female => "F",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "M" => Some(FaceSex::Male),
            "F" => Some(FaceSex::Female),
            _ => None,
        }
    }
}

/// A detected face: box, attributes, five landmark points, and embedding.
///
/// The embedding dimension is fixed by the face detector (512 for ArcFace
/// style models). Faces are attached to a frame at detection time; linking
/// to a unique face identity happens only in the clustering engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceBox {
    pub position: (f64, f64),
    pub width: f64,
    pub height: f64,
    pub confidence: f64,
    pub age: i32,
    pub sex: FaceSex,
    pub mouth_left: (f64, f64),
    pub mouth_right: (f64, f64),
    pub nose_tip: (f64, f64),
    pub eye_left: (f64, f64),
    pub eye_right: (f64, f64),
    pub embedding: Vec<f32>,
}

/// Reverse-geocoded place for a coordinate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoLocation {
    pub country: String,
    pub province: Option<String>,
    pub city: String,
    /// Coordinates of the matched place (may differ from the query point).
    pub latitude: f64,
    pub longitude: f64,
}

/// One hourly weather observation near a point in time.
///
/// Any individual measurement may be missing; providers must scrub NaN
/// values to `None` before returning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub recorded_at: NaiveDateTime,
    pub temperature: Option<f64>,
    pub dewpoint: Option<f64>,
    pub relative_humidity: Option<f64>,
    pub precipitation: Option<f64>,
    pub wind_gust: Option<f64>,
    pub pressure: Option<f64>,
    pub sun_hours: Option<f64>,
    pub condition: Option<WeatherCondition>,
}

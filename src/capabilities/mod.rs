//! Capability interfaces for the analysis pipelines.
//!
//! Every model or external service the pipelines depend on sits behind one
//! of these traits. A `Capabilities` registry is built once at startup and
//! passed down by reference, so pipelines can be exercised with mock
//! implementations in tests and model backends can be swapped without
//! touching stage code.

pub mod model_server;
pub mod providers;

use anyhow::Result;
use chrono::NaiveDateTime;
use image::DynamicImage;

use crate::data::types::{FaceBox, GeoLocation, ObjectBox, OcrBox, WeatherObservation};

/// Image/text embedding in a shared vector space (fixed dimension).
pub trait Embedder: Send + Sync {
    fn embed_image(&self, image: &DynamicImage) -> Result<Vec<f32>>;
    fn embed_text(&self, text: &str) -> Result<Vec<f32>>;
}

/// Face detection with landmarks, attributes, and a per-face embedding.
pub trait FaceDetector: Send + Sync {
    fn detect_faces(&self, image: &DynamicImage) -> Result<Vec<FaceBox>>;
}

/// Object detection; implementations filter by their own confidence
/// threshold before returning.
pub trait ObjectDetector: Send + Sync {
    fn detect_objects(&self, image: &DynamicImage) -> Result<Vec<ObjectBox>>;
}

/// Text recognition. `has_legible_text` is the cheap gate; the other two
/// are only called when it returns true.
pub trait Ocr: Send + Sync {
    fn has_legible_text(&self, image: &DynamicImage) -> Result<bool>;
    fn extract_text(&self, image: &DynamicImage) -> Result<String>;
    fn extract_boxes(&self, image: &DynamicImage) -> Result<Vec<OcrBox>>;
}

/// Zero-shot classification over a precomputed image embedding.
pub trait Classifier: Send + Sync {
    /// Best-matching prompt index and its confidence.
    fn classify(&self, embedding: &[f32], prompts: &[&str]) -> Result<(usize, f32)>;
    /// True when the positive prompt beats the negative one.
    fn classify_binary(&self, embedding: &[f32], positive: &str, negative: &str)
        -> Result<(bool, f32)>;
}

pub trait Captioner: Send + Sync {
    fn caption(&self, image: &DynamicImage) -> Result<String>;
}

/// Vision-language model for free-form questions about an image.
pub trait VisualLlm: Send + Sync {
    fn image_question(&self, image: &DynamicImage, question: &str) -> Result<String>;
}

pub trait ReverseGeocoder: Send + Sync {
    fn reverse_geocode(&self, latitude: f64, longitude: f64) -> Result<GeoLocation>;
}

/// Hourly weather lookup. Returns the observation nearest to `utc` within
/// `window_minutes`, or `None` when no observation exists in range (which
/// is common and not an error).
pub trait WeatherProvider: Send + Sync {
    fn observation_near(
        &self,
        latitude: f64,
        longitude: f64,
        utc: NaiveDateTime,
        window_minutes: i64,
    ) -> Result<Option<WeatherObservation>>;
}

/// Coordinate to IANA timezone name lookup.
pub trait TimezoneResolver: Send + Sync {
    fn timezone_at(&self, latitude: f64, longitude: f64) -> Option<String>;
}

/// Registry of every capability the pipelines use, built once at startup.
pub struct Capabilities {
    pub embedder: Box<dyn Embedder>,
    pub face_detector: Box<dyn FaceDetector>,
    pub object_detector: Box<dyn ObjectDetector>,
    pub ocr: Box<dyn Ocr>,
    pub classifier: Box<dyn Classifier>,
    pub captioner: Box<dyn Captioner>,
    pub visual_llm: Box<dyn VisualLlm>,
    pub geocoder: Box<dyn ReverseGeocoder>,
    pub weather: Box<dyn WeatherProvider>,
    pub timezone: Box<dyn TimezoneResolver>,
}

#[cfg(test)]
pub mod test_support {
    //! Deterministic mock capabilities for pipeline tests.

    use super::*;
    use crate::data::types::FaceSex;

    pub struct MockEmbedder {
        pub vector: Vec<f32>,
    }

    impl Default for MockEmbedder {
        fn default() -> Self {
            Self { vector: vec![0.5; 8] }
        }
    }

    impl Embedder for MockEmbedder {
        fn embed_image(&self, _image: &DynamicImage) -> Result<Vec<f32>> {
            Ok(self.vector.clone())
        }

        fn embed_text(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(self.vector.clone())
        }
    }

    /// Classifier that answers every binary gate with a fixed polarity and
    /// every multi-class question with index 0.
    pub struct MockClassifier {
        pub binary_answer: bool,
        pub confidence: f32,
    }

    impl Classifier for MockClassifier {
        fn classify(&self, _embedding: &[f32], _prompts: &[&str]) -> Result<(usize, f32)> {
            Ok((0, self.confidence))
        }

        fn classify_binary(
            &self,
            _embedding: &[f32],
            _positive: &str,
            _negative: &str,
        ) -> Result<(bool, f32)> {
            Ok((self.binary_answer, self.confidence))
        }
    }

    pub struct MockOcr {
        pub text: String,
    }

    impl Ocr for MockOcr {
        fn has_legible_text(&self, _image: &DynamicImage) -> Result<bool> {
            Ok(!self.text.is_empty())
        }

        fn extract_text(&self, _image: &DynamicImage) -> Result<String> {
            Ok(self.text.clone())
        }

        fn extract_boxes(&self, _image: &DynamicImage) -> Result<Vec<OcrBox>> {
            Ok(vec![])
        }
    }

    pub struct MockFaceDetector {
        pub faces: Vec<FaceBox>,
    }

    impl FaceDetector for MockFaceDetector {
        fn detect_faces(&self, _image: &DynamicImage) -> Result<Vec<FaceBox>> {
            Ok(self.faces.clone())
        }
    }

    pub struct MockObjectDetector {
        pub objects: Vec<ObjectBox>,
    }

    impl ObjectDetector for MockObjectDetector {
        fn detect_objects(&self, _image: &DynamicImage) -> Result<Vec<ObjectBox>> {
            Ok(self.objects.clone())
        }
    }

    pub struct MockCaptioner;

    impl Captioner for MockCaptioner {
        fn caption(&self, _image: &DynamicImage) -> Result<String> {
            Ok("a test image".to_string())
        }
    }

    pub struct MockVisualLlm;

    impl VisualLlm for MockVisualLlm {
        fn image_question(&self, _image: &DynamicImage, _question: &str) -> Result<String> {
            Ok("a mock answer".to_string())
        }
    }

    pub struct MockGeocoder;

    impl ReverseGeocoder for MockGeocoder {
        fn reverse_geocode(&self, latitude: f64, longitude: f64) -> Result<GeoLocation> {
            Ok(GeoLocation {
                country: "Netherlands".to_string(),
                province: Some("Utrecht".to_string()),
                city: "Utrecht".to_string(),
                latitude,
                longitude,
            })
        }
    }

    /// Weather provider with a fixed answer (possibly none).
    pub struct MockWeather {
        pub observation: Option<WeatherObservation>,
    }

    impl WeatherProvider for MockWeather {
        fn observation_near(
            &self,
            _latitude: f64,
            _longitude: f64,
            _utc: NaiveDateTime,
            _window_minutes: i64,
        ) -> Result<Option<WeatherObservation>> {
            Ok(self.observation.clone())
        }
    }

    pub struct MockTimezone {
        pub name: Option<String>,
    }

    impl TimezoneResolver for MockTimezone {
        fn timezone_at(&self, _latitude: f64, _longitude: f64) -> Option<String> {
            self.name.clone()
        }
    }

    pub fn sample_face(embedding: Vec<f32>) -> FaceBox {
        FaceBox {
            position: (0.4, 0.3),
            width: 0.2,
            height: 0.25,
            confidence: 0.98,
            age: 30,
            sex: FaceSex::Female,
            mouth_left: (0.45, 0.48),
            mouth_right: (0.55, 0.48),
            nose_tip: (0.5, 0.42),
            eye_left: (0.45, 0.38),
            eye_right: (0.55, 0.38),
            embedding,
        }
    }

    pub fn mock_capabilities() -> Capabilities {
        Capabilities {
            embedder: Box::new(MockEmbedder::default()),
            face_detector: Box::new(MockFaceDetector { faces: vec![] }),
            object_detector: Box::new(MockObjectDetector { objects: vec![] }),
            ocr: Box::new(MockOcr { text: String::new() }),
            classifier: Box::new(MockClassifier { binary_answer: false, confidence: 0.01 }),
            captioner: Box::new(MockCaptioner),
            visual_llm: Box::new(MockVisualLlm),
            geocoder: Box::new(MockGeocoder),
            weather: Box::new(MockWeather { observation: None }),
            timezone: Box::new(MockTimezone { name: None }),
        }
    }
}

pub mod classification;
pub mod media;
pub mod types;

pub use classification::{
    ActivityType, AnimalType, DocumentType, EventType, ObjectType, PeopleType, SceneType,
    WeatherCondition,
};
pub use media::{FrameRecord, MediaRecord, TimeSource};
pub use types::{FaceBox, FaceSex, GeoLocation, ObjectBox, OcrBox, WeatherObservation};

//! File-level metadata stages, in their fixed execution order:
//! hash, exif, data URL, GPS, local time, weather.

pub mod data_url;
pub mod exif;
pub mod gps;
pub mod hash;
pub mod time;
pub mod weather;

pub use data_url::DataUrlStage;
pub use exif::ExifStage;
pub use gps::GpsStage;
pub use hash::HashStage;
pub use time::TimeStage;
pub use weather::WeatherStage;

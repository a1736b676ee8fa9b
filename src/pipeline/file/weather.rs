//! Weather stage: the hourly observation closest to the capture moment.
//!
//! Needs both a UTC capture time and coordinates; anything less passes
//! through with every weather field null. A provider error is logged and
//! treated the same as no observation.

use tracing::warn;

use crate::capabilities::WeatherProvider;
use crate::data::media::MediaRecord;
use crate::pipeline::{FileStage, StageError};

pub struct WeatherStage<'a> {
    provider: &'a dyn WeatherProvider,
    window_minutes: i64,
}

impl<'a> WeatherStage<'a> {
    pub fn new(provider: &'a dyn WeatherProvider, window_minutes: i64) -> Self {
        Self {
            provider,
            window_minutes,
        }
    }
}

impl FileStage for WeatherStage<'_> {
    fn name(&self) -> &'static str {
        "weather"
    }

    fn process(&self, record: &mut MediaRecord) -> Result<(), StageError> {
        let (Some(utc), Some(latitude), Some(longitude)) =
            (record.datetime_utc, record.latitude, record.longitude)
        else {
            return Ok(());
        };

        match self
            .provider
            .observation_near(latitude, longitude, utc, self.window_minutes)
        {
            Ok(Some(observation)) => record.apply_weather(&observation),
            Ok(None) => {}
            Err(e) => warn!("Weather lookup failed for {}: {}", record.relative_path, e),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::test_support::MockWeather;
    use crate::data::classification::WeatherCondition;
    use crate::data::types::WeatherObservation;
    use chrono::NaiveDate;

    fn noon() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 6, 15).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    fn located_record() -> MediaRecord {
        let mut record = MediaRecord::new("img.jpg", "img.jpg");
        record.datetime_utc = Some(noon());
        record.latitude = Some(52.0);
        record.longitude = Some(5.0);
        record
    }

    #[test]
    fn test_observation_applied() {
        let provider = MockWeather {
            observation: Some(WeatherObservation {
                recorded_at: noon(),
                temperature: Some(21.5),
                dewpoint: None,
                relative_humidity: Some(60.0),
                precipitation: Some(0.0),
                wind_gust: None,
                pressure: Some(1013.0),
                sun_hours: Some(0.8),
                condition: Some(WeatherCondition::Fair),
            }),
        };
        let stage = WeatherStage::new(&provider, 30);
        let mut record = located_record();

        stage.process(&mut record).unwrap();
        assert_eq!(record.weather_temperature, Some(21.5));
        assert_eq!(record.weather_condition, Some(WeatherCondition::Fair));
        assert_eq!(record.weather_recorded_at, Some(noon()));
    }

    #[test]
    fn test_no_observation_in_window() {
        let provider = MockWeather { observation: None };
        let stage = WeatherStage::new(&provider, 30);
        let mut record = located_record();

        stage.process(&mut record).unwrap();
        assert!(record.weather_temperature.is_none());
        assert!(record.weather_condition.is_none());
    }

    #[test]
    fn test_missing_time_or_coordinates_passes_through() {
        let provider = MockWeather { observation: None };
        let stage = WeatherStage::new(&provider, 30);

        let mut record = MediaRecord::new("img.jpg", "img.jpg");
        record.latitude = Some(52.0);
        record.longitude = Some(5.0);
        stage.process(&mut record).unwrap();
        assert!(record.weather_recorded_at.is_none());
    }
}

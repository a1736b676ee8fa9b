//! HTTP-backed implementations of the geocoding and weather capabilities.
//!
//! Both talk to open JSON APIs via ureq. The endpoints are configurable so
//! self-hosted instances can be pointed at instead.

use anyhow::{anyhow, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::data::classification::WeatherCondition;
use crate::data::types::{GeoLocation, WeatherObservation};

use super::{ReverseGeocoder, TimezoneResolver, WeatherProvider};

/// Timezone lookup from a single configured IANA name.
///
/// Proper coordinate lookup needs a timezone boundary dataset; most personal
/// libraries are shot in one country, so a configured home timezone covers
/// the common case. Leaving it unset disables the backfill.
pub struct ConfiguredTimezone {
    name: Option<String>,
}

impl ConfiguredTimezone {
    pub fn new(name: Option<String>) -> Self {
        Self { name }
    }
}

impl TimezoneResolver for ConfiguredTimezone {
    fn timezone_at(&self, _latitude: f64, _longitude: f64) -> Option<String> {
        self.name.clone()
    }
}

/// Reverse geocoder against a Nominatim-compatible endpoint.
pub struct HttpReverseGeocoder {
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    lat: String,
    lon: String,
    address: NominatimAddress,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    country: Option<String>,
    state: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
}

impl HttpReverseGeocoder {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }
}

impl ReverseGeocoder for HttpReverseGeocoder {
    fn reverse_geocode(&self, latitude: f64, longitude: f64) -> Result<GeoLocation> {
        let url = format!(
            "{}/reverse?lat={}&lon={}&format=jsonv2&zoom=10",
            self.endpoint, latitude, longitude
        );
        let response: NominatimResponse = ureq::get(&url)
            .set("User-Agent", concat!("photonest/", env!("CARGO_PKG_VERSION")))
            .call()
            .map_err(|e| anyhow!("Reverse geocode request failed: {}", e))?
            .into_json()?;

        let city = response
            .address
            .city
            .or(response.address.town)
            .or(response.address.village)
            .ok_or_else(|| anyhow!("No city in geocode response"))?;

        Ok(GeoLocation {
            country: response
                .address
                .country
                .ok_or_else(|| anyhow!("No country in geocode response"))?,
            province: response.address.state,
            city,
            latitude: response.lat.parse()?,
            longitude: response.lon.parse()?,
        })
    }
}

/// Hourly weather observations from an Open-Meteo style archive endpoint.
pub struct HttpWeatherProvider {
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    hourly: OpenMeteoHourly,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoHourly {
    time: Vec<String>,
    #[serde(default)]
    temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    dew_point_2m: Vec<Option<f64>>,
    #[serde(default)]
    relative_humidity_2m: Vec<Option<f64>>,
    #[serde(default)]
    precipitation: Vec<Option<f64>>,
    #[serde(default)]
    wind_gusts_10m: Vec<Option<f64>>,
    #[serde(default)]
    surface_pressure: Vec<Option<f64>>,
    #[serde(default)]
    sunshine_duration: Vec<Option<f64>>,
    #[serde(default)]
    weather_code: Vec<Option<i32>>,
}

impl HttpWeatherProvider {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    /// Map WMO weather codes (Open-Meteo) onto the stored condition set.
    fn condition_from_wmo(code: i32) -> Option<WeatherCondition> {
        match code {
            0 => Some(WeatherCondition::Clear),
            1 => Some(WeatherCondition::Fair),
            2 => Some(WeatherCondition::Cloudy),
            3 => Some(WeatherCondition::Overcast),
            45 => Some(WeatherCondition::Fog),
            48 => Some(WeatherCondition::FreezingFog),
            51 | 53 | 55 | 61 => Some(WeatherCondition::LightRain),
            63 => Some(WeatherCondition::Rain),
            65 => Some(WeatherCondition::HeavyRain),
            56 | 66 => Some(WeatherCondition::FreezingRain),
            57 | 67 => Some(WeatherCondition::HeavyFreezingRain),
            71 => Some(WeatherCondition::LightSnowfall),
            73 => Some(WeatherCondition::Snowfall),
            75 | 77 => Some(WeatherCondition::HeavySnowfall),
            80 | 81 => Some(WeatherCondition::RainShower),
            82 => Some(WeatherCondition::HeavyRainShower),
            85 => Some(WeatherCondition::SnowShower),
            86 => Some(WeatherCondition::HeavySnowShower),
            95 => Some(WeatherCondition::Thunderstorm),
            96 | 99 => Some(WeatherCondition::HeavyThunderstorm),
            _ => None,
        }
    }
}

/// Inclusive archive date range covering `utc ± window`. A capture just
/// before midnight can have its nearest hourly observation at 00:00 of the
/// next day, so the range must follow the window across day boundaries.
fn fetch_range(utc: NaiveDateTime, window_minutes: i64) -> (NaiveDate, NaiveDate) {
    let window = Duration::minutes(window_minutes);
    ((utc - window).date(), (utc + window).date())
}

impl WeatherProvider for HttpWeatherProvider {
    fn observation_near(
        &self,
        latitude: f64,
        longitude: f64,
        utc: NaiveDateTime,
        window_minutes: i64,
    ) -> Result<Option<WeatherObservation>> {
        let (start, end) = fetch_range(utc, window_minutes);
        let url = format!(
            "{}/v1/archive?latitude={}&longitude={}&start_date={}&end_date={}\
             &hourly=temperature_2m,dew_point_2m,relative_humidity_2m,precipitation,\
             wind_gusts_10m,surface_pressure,sunshine_duration,weather_code",
            self.endpoint, latitude, longitude, start, end
        );
        let response: OpenMeteoResponse = ureq::get(&url)
            .call()
            .map_err(|e| anyhow!("Weather request failed: {}", e))?
            .into_json()?;

        let hourly = &response.hourly;
        let window = Duration::minutes(window_minutes);
        let mut best: Option<(usize, Duration)> = None;
        for (i, time_str) in hourly.time.iter().enumerate() {
            let Ok(recorded) = NaiveDateTime::parse_from_str(time_str, "%Y-%m-%dT%H:%M") else {
                continue;
            };
            let distance = (recorded - utc).abs();
            if distance > window {
                continue;
            }
            if best.map(|(_, d)| distance < d).unwrap_or(true) {
                best = Some((i, distance));
            }
        }

        let Some((i, _)) = best else {
            return Ok(None);
        };

        let get = |values: &Vec<Option<f64>>| values.get(i).copied().flatten();
        let recorded_at = NaiveDateTime::parse_from_str(&hourly.time[i], "%Y-%m-%dT%H:%M")?;
        Ok(Some(WeatherObservation {
            recorded_at,
            temperature: get(&hourly.temperature_2m),
            dewpoint: get(&hourly.dew_point_2m),
            relative_humidity: get(&hourly.relative_humidity_2m),
            precipitation: get(&hourly.precipitation),
            wind_gust: get(&hourly.wind_gusts_10m),
            pressure: get(&hourly.surface_pressure),
            sun_hours: get(&hourly.sunshine_duration).map(|s| s / 3600.0),
            condition: hourly
                .weather_code
                .get(i)
                .copied()
                .flatten()
                .and_then(Self::condition_from_wmo),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_range_spans_midnight() {
        let late = NaiveDate::from_ymd_opt(2023, 6, 15)
            .unwrap()
            .and_hms_opt(23, 45, 0)
            .unwrap();
        let (start, end) = fetch_range(late, 30);
        assert_eq!(start, NaiveDate::from_ymd_opt(2023, 6, 15).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2023, 6, 16).unwrap());

        let early = NaiveDate::from_ymd_opt(2023, 6, 15)
            .unwrap()
            .and_hms_opt(0, 10, 0)
            .unwrap();
        let (start, end) = fetch_range(early, 30);
        assert_eq!(start, NaiveDate::from_ymd_opt(2023, 6, 14).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2023, 6, 15).unwrap());
    }

    #[test]
    fn test_fetch_range_midday_stays_on_one_day() {
        let noon = NaiveDate::from_ymd_opt(2023, 6, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let (start, end) = fetch_range(noon, 30);
        assert_eq!(start, end);
    }

    #[test]
    fn test_wmo_condition_mapping() {
        assert_eq!(
            HttpWeatherProvider::condition_from_wmo(0),
            Some(WeatherCondition::Clear)
        );
        assert_eq!(
            HttpWeatherProvider::condition_from_wmo(95),
            Some(WeatherCondition::Thunderstorm)
        );
        assert_eq!(HttpWeatherProvider::condition_from_wmo(42), None);
    }
}

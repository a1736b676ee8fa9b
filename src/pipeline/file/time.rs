//! Local capture time stage.
//!
//! Cameras record time six different ways, in descending order of trust:
//! an explicit UTC offset, a GPS satellite stamp, the plain EXIF original
//! time, the digitized time, a timestamp baked into the filename, and as a
//! last resort the filesystem modification time. The first fallback that
//! yields a value wins and its provenance is recorded with the time.
//!
//! Timezone name and offset come from the coordinates when the library has
//! them; an explicit EXIF offset beats the coordinate-derived one. UTC is
//! GPS-sourced when available, otherwise derived from the chosen local
//! time plus whatever offset information exists.

use chrono::{DateTime, Duration, NaiveDateTime, Offset, TimeZone};
use chrono_tz::Tz;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::capabilities::TimezoneResolver;
use crate::data::media::{MediaRecord, Section, TimeSource};
use crate::pipeline::{FileStage, StageError};

const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

pub struct TimeStage<'a> {
    timezone: &'a dyn TimezoneResolver,
    filename_pattern: Regex,
}

impl<'a> TimeStage<'a> {
    pub fn new(timezone: &'a dyn TimezoneResolver) -> Self {
        Self {
            timezone,
            // Compact timestamp many phones bake into filenames,
            // e.g. IMG_20230615_143000.jpg
            filename_pattern: Regex::new(r"(\d{8})[_-]?(\d{6})").unwrap(),
        }
    }

    /// Walk the fallback chain; also returns an explicit UTC offset in
    /// seconds when the winning source carries one.
    fn resolve_local(
        &self,
        record: &MediaRecord,
    ) -> Option<(NaiveDateTime, TimeSource, Option<i32>)> {
        let exif = record.exif_section.as_ref();

        let original = exif
            .and_then(|s| exif_datetime(s, "DateTimeOriginal"));
        let explicit_offset = exif
            .and_then(|s| s.get("OffsetTimeOriginal"))
            .and_then(Value::as_str)
            .and_then(parse_utc_offset);

        if let (Some(local), Some(offset)) = (original, explicit_offset) {
            return Some((local, TimeSource::OffsetTime, Some(offset)));
        }

        if let (Some(utc), Some(lat), Some(lon)) =
            (record.datetime_utc, record.latitude, record.longitude)
        {
            if let Some(tz) = self
                .timezone
                .timezone_at(lat, lon)
                .and_then(|name| name.parse::<Tz>().ok())
            {
                let local = tz.from_utc_datetime(&utc).naive_local();
                return Some((local, TimeSource::Gps, None));
            }
        }

        if let Some(local) = original {
            return Some((local, TimeSource::DateTimeOriginal, None));
        }

        if let Some(local) = exif.and_then(|s| exif_datetime(s, "CreateDate")) {
            return Some((local, TimeSource::CreateDate, None));
        }

        if let Some(captures) = self.filename_pattern.captures(&record.filename) {
            let raw = format!("{}{}", &captures[1], &captures[2]);
            if let Ok(local) = NaiveDateTime::parse_from_str(&raw, "%Y%m%d%H%M%S") {
                return Some((local, TimeSource::Filename, None));
            }
        }

        let modify_date = record
            .file_section
            .as_ref()
            .and_then(|s| s.get("FileModifyDate"))
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_str(raw, "%Y:%m:%d %H:%M:%S%z").ok());
        if let Some(stamped) = modify_date {
            let offset = stamped.offset().local_minus_utc();
            return Some((
                stamped.naive_local(),
                TimeSource::ModificationDate,
                Some(offset),
            ));
        }

        None
    }
}

impl FileStage for TimeStage<'_> {
    fn name(&self) -> &'static str {
        "time"
    }

    fn process(&self, record: &mut MediaRecord) -> Result<(), StageError> {
        let Some((local, source, explicit_offset)) = self.resolve_local(record) else {
            debug!("No usable capture time for {}", record.relative_path);
            return Ok(());
        };

        record.datetime_local = Some(local);
        record.datetime_source = Some(source);

        let coordinate_tz = match (record.latitude, record.longitude) {
            (Some(lat), Some(lon)) => self
                .timezone
                .timezone_at(lat, lon)
                .and_then(|name| name.parse::<Tz>().ok().map(|tz| (name, tz))),
            _ => None,
        };

        if let Some((name, tz)) = &coordinate_tz {
            record.timezone_name = Some(name.clone());
            record.timezone_offset = explicit_offset.or_else(|| {
                localize(tz, &local).map(|l| l.offset().fix().local_minus_utc())
            });
        } else {
            record.timezone_offset = explicit_offset;
        }

        if record.datetime_utc.is_none() {
            record.datetime_utc = match explicit_offset {
                Some(offset) => Some(local - Duration::seconds(offset.into())),
                None => coordinate_tz
                    .as_ref()
                    .and_then(|(_, tz)| localize(tz, &local))
                    .map(|l| l.naive_utc()),
            };
        }

        Ok(())
    }
}

fn exif_datetime(section: &Section, key: &str) -> Option<NaiveDateTime> {
    section
        .get(key)
        .and_then(Value::as_str)
        .and_then(|raw| NaiveDateTime::parse_from_str(raw, EXIF_DATETIME_FORMAT).ok())
}

/// Pin a naive local time to a timezone. Ambiguous times (DST fold) take
/// the earlier candidate; nonexistent times (DST gap) resolve to None.
fn localize(tz: &Tz, local: &NaiveDateTime) -> Option<DateTime<Tz>> {
    let mapped = tz.from_local_datetime(local);
    mapped.single().or_else(|| mapped.earliest())
}

/// Parse an EXIF `±HH:MM` offset into seconds.
fn parse_utc_offset(raw: &str) -> Option<i32> {
    let (sign, rest) = match raw.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let (hours, minutes) = rest.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    Some(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::test_support::MockTimezone;
    use crate::probe::section_from;
    use chrono::NaiveDate;
    use serde_json::json;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(h, mi, s).unwrap()
    }

    fn no_timezone() -> MockTimezone {
        MockTimezone { name: None }
    }

    #[test]
    fn test_parse_utc_offset() {
        assert_eq!(parse_utc_offset("+02:00"), Some(7200));
        assert_eq!(parse_utc_offset("-05:30"), Some(-19800));
        assert_eq!(parse_utc_offset("garbage"), None);
    }

    #[test]
    fn test_explicit_offset_wins() {
        let resolver = no_timezone();
        let stage = TimeStage::new(&resolver);
        let mut record = MediaRecord::new("img.jpg", "img.jpg");
        record.exif_section = Some(section_from(&[
            ("DateTimeOriginal", json!("2023:06:15 14:30:00")),
            ("OffsetTimeOriginal", json!("+02:00")),
        ]));

        stage.process(&mut record).unwrap();
        assert_eq!(record.datetime_local, Some(at(2023, 6, 15, 14, 30, 0)));
        assert_eq!(record.datetime_source, Some(TimeSource::OffsetTime));
        assert_eq!(record.timezone_offset, Some(7200));
        assert_eq!(record.datetime_utc, Some(at(2023, 6, 15, 12, 30, 0)));
    }

    #[test]
    fn test_gps_time_localized_via_coordinates() {
        let resolver = MockTimezone {
            name: Some("Europe/Amsterdam".to_string()),
        };
        let stage = TimeStage::new(&resolver);
        let mut record = MediaRecord::new("img.jpg", "img.jpg");
        record.latitude = Some(52.37);
        record.longitude = Some(4.89);
        record.datetime_utc = Some(at(2023, 6, 15, 12, 0, 0));

        stage.process(&mut record).unwrap();
        // CEST in June, UTC+2
        assert_eq!(record.datetime_local, Some(at(2023, 6, 15, 14, 0, 0)));
        assert_eq!(record.datetime_source, Some(TimeSource::Gps));
        assert_eq!(record.timezone_name.as_deref(), Some("Europe/Amsterdam"));
        assert_eq!(record.timezone_offset, Some(7200));
        // GPS-sourced UTC is preserved
        assert_eq!(record.datetime_utc, Some(at(2023, 6, 15, 12, 0, 0)));
    }

    #[test]
    fn test_plain_datetime_original() {
        let resolver = no_timezone();
        let stage = TimeStage::new(&resolver);
        let mut record = MediaRecord::new("img.jpg", "img.jpg");
        record.exif_section = Some(section_from(&[(
            "DateTimeOriginal",
            json!("2022:01:01 08:00:00"),
        )]));

        stage.process(&mut record).unwrap();
        assert_eq!(record.datetime_source, Some(TimeSource::DateTimeOriginal));
        assert!(record.datetime_utc.is_none());
        assert!(record.timezone_offset.is_none());
    }

    #[test]
    fn test_create_date_has_own_provenance() {
        let resolver = no_timezone();
        let stage = TimeStage::new(&resolver);
        let mut record = MediaRecord::new("img.jpg", "img.jpg");
        record.exif_section = Some(section_from(&[(
            "CreateDate",
            json!("2022:03:04 05:06:07"),
        )]));

        stage.process(&mut record).unwrap();
        assert_eq!(record.datetime_local, Some(at(2022, 3, 4, 5, 6, 7)));
        assert_eq!(record.datetime_source, Some(TimeSource::CreateDate));
    }

    #[test]
    fn test_filename_timestamp() {
        let resolver = no_timezone();
        let stage = TimeStage::new(&resolver);
        let mut record = MediaRecord::new("IMG_20230615_143000.jpg", "IMG_20230615_143000.jpg");

        stage.process(&mut record).unwrap();
        assert_eq!(record.datetime_local, Some(at(2023, 6, 15, 14, 30, 0)));
        assert_eq!(record.datetime_source, Some(TimeSource::Filename));
    }

    #[test]
    fn test_modification_date_last_resort() {
        let resolver = no_timezone();
        let stage = TimeStage::new(&resolver);
        let mut record = MediaRecord::new("img.jpg", "img.jpg");
        record.file_section = Some(section_from(&[(
            "FileModifyDate",
            json!("2023:01:02 03:04:05+01:00"),
        )]));

        stage.process(&mut record).unwrap();
        assert_eq!(record.datetime_local, Some(at(2023, 1, 2, 3, 4, 5)));
        assert_eq!(record.datetime_source, Some(TimeSource::ModificationDate));
        assert_eq!(record.timezone_offset, Some(3600));
        assert_eq!(record.datetime_utc, Some(at(2023, 1, 2, 2, 4, 5)));
    }

    #[test]
    fn test_nothing_resolvable_stays_null() {
        let resolver = no_timezone();
        let stage = TimeStage::new(&resolver);
        let mut record = MediaRecord::new("holiday.jpg", "holiday.jpg");

        stage.process(&mut record).unwrap();
        assert!(record.datetime_local.is_none());
        assert!(record.datetime_source.is_none());
        assert!(record.datetime_utc.is_none());
    }
}

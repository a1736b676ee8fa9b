//! Media and frame persistence: ingest writes, re-ingest checks, cleanup,
//! and the queries the timezone backfill runs.

use anyhow::Result;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::info;

use super::{embedding_to_bytes, Database};
use crate::data::classification::WeatherCondition;
use crate::data::media::{FrameRecord, MediaRecord, Section, TimeSource};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn datetime_to_sql(value: Option<NaiveDateTime>) -> Option<String> {
    value.map(|v| v.format(DATETIME_FORMAT).to_string())
}

fn datetime_from_sql(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT).ok()
}

fn section_to_sql(section: &Option<Section>) -> Option<String> {
    section
        .as_ref()
        .and_then(|s| serde_json::to_string(s).ok())
}

impl Database {
    /// Persist one processed file and all its frames in a single
    /// transaction. Re-ingest of a known path replaces the old rows.
    pub fn insert_media(&mut self, record: &MediaRecord, frames: &[FrameRecord]) -> Result<()> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "DELETE FROM media WHERE relative_path = ?",
            [&record.relative_path],
        )?;

        tx.execute(
            r#"
            INSERT INTO media (
                id, filename, relative_path, hash,
                width, height, duration, format, size_bytes,
                file_section, exif_section, composite_section, xmp_section,
                gif_section, quicktime_section, matroska_section,
                data_url,
                latitude, longitude, altitude,
                location_country, location_province, location_city,
                datetime_utc, datetime_local, datetime_source,
                timezone_name, timezone_offset,
                weather_recorded_at, weather_temperature, weather_dewpoint,
                weather_relative_humidity, weather_precipitation,
                weather_wind_gust, weather_pressure, weather_sun_hours,
                weather_condition
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                      ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24,
                      ?25, ?26, ?27, ?28, ?29, ?30, ?31, ?32, ?33, ?34, ?35,
                      ?36, ?37)
            "#,
            params![
                record.id,
                record.filename,
                record.relative_path,
                record.hash,
                record.width,
                record.height,
                record.duration,
                record.format,
                record.size_bytes,
                section_to_sql(&record.file_section),
                section_to_sql(&record.exif_section),
                section_to_sql(&record.composite_section),
                section_to_sql(&record.xmp_section),
                section_to_sql(&record.gif_section),
                section_to_sql(&record.quicktime_section),
                section_to_sql(&record.matroska_section),
                record.data_url,
                record.latitude,
                record.longitude,
                record.altitude,
                record.location.as_ref().map(|l| l.country.clone()),
                record.location.as_ref().and_then(|l| l.province.clone()),
                record.location.as_ref().map(|l| l.city.clone()),
                datetime_to_sql(record.datetime_utc),
                datetime_to_sql(record.datetime_local),
                record.datetime_source.map(|s| s.as_str()),
                record.timezone_name,
                record.timezone_offset,
                datetime_to_sql(record.weather_recorded_at),
                record.weather_temperature,
                record.weather_dewpoint,
                record.weather_relative_humidity,
                record.weather_precipitation,
                record.weather_wind_gust,
                record.weather_pressure,
                record.weather_sun_hours,
                record.weather_condition.map(|c| c.code()),
            ],
        )?;

        for frame in frames {
            insert_frame(&tx, &record.id, frame)?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Content hash per known relative path. The driver compares these
    /// against fresh hashes to decide what needs re-ingest, without holding
    /// the connection during parallel processing.
    pub fn stored_hashes(&self) -> Result<std::collections::HashMap<String, String>> {
        let mut stmt = self.conn.prepare("SELECT relative_path, hash FROM media")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Drop rows whose file no longer exists under `media_dir`. Cascades
    /// take the frames and boxes along. Returns the number removed.
    pub fn remove_missing_media(&mut self, media_dir: &Path) -> Result<usize> {
        let missing: Vec<String> = {
            let mut stmt = self.conn.prepare("SELECT id, relative_path FROM media")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
                .into_iter()
                .filter(|(_, path)| !media_dir.join(path).exists())
                .map(|(id, _)| id)
                .collect()
        };

        let tx = self.conn.transaction()?;
        for id in &missing {
            tx.execute("DELETE FROM media WHERE id = ?", [id])?;
        }
        tx.commit()?;

        if !missing.is_empty() {
            info!("Removed {} media rows with missing files", missing.len());
        }
        Ok(missing.len())
    }
}

fn insert_frame(conn: &Connection, media_id: &str, frame: &FrameRecord) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO frames (
            media_id, frame_percentage, embedding,
            scene_type, people_type, animal_type, document_type,
            object_type, activity_type, event_type, weather_condition,
            is_outside, is_landscape, is_cityscape, is_travel,
            has_legible_text, ocr_text, document_summary,
            summary, caption,
            measured_sharpness, measured_noise, measured_brightness,
            measured_contrast, measured_clipping, measured_dynamic_range,
            quality_score
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                  ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25,
                  ?26, ?27)
        "#,
        params![
            media_id,
            frame.frame_percentage,
            frame.embedding.as_ref().map(|e| embedding_to_bytes(e)),
            frame.scene_type.map(|v| v.as_str()),
            frame.people_type.map(|v| v.as_str()),
            frame.animal_type.map(|v| v.as_str()),
            frame.document_type.map(|v| v.as_str()),
            frame.object_type.map(|v| v.as_str()),
            frame.activity_type.map(|v| v.as_str()),
            frame.event_type.map(|v| v.as_str()),
            frame.weather_condition.map(|c| c.code()),
            frame.is_outside,
            frame.is_landscape,
            frame.is_cityscape,
            frame.is_travel,
            frame.has_legible_text,
            frame.ocr_text,
            frame.document_summary,
            frame.summary,
            frame.caption,
            frame.measured_sharpness,
            frame.measured_noise,
            frame.measured_brightness,
            frame.measured_contrast,
            frame.measured_clipping,
            frame.measured_dynamic_range,
            frame.quality_score,
        ],
    )?;
    let frame_id = conn.last_insert_rowid();

    for face in &frame.faces {
        conn.execute(
            r#"
            INSERT INTO face_boxes (
                frame_id, position_x, position_y, width, height, confidence,
                age, sex,
                mouth_left_x, mouth_left_y, mouth_right_x, mouth_right_y,
                nose_tip_x, nose_tip_y,
                eye_left_x, eye_left_y, eye_right_x, eye_right_y,
                embedding
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                      ?14, ?15, ?16, ?17, ?18, ?19)
            "#,
            params![
                frame_id,
                face.position.0,
                face.position.1,
                face.width,
                face.height,
                face.confidence,
                face.age,
                face.sex.as_str(),
                face.mouth_left.0,
                face.mouth_left.1,
                face.mouth_right.0,
                face.mouth_right.1,
                face.nose_tip.0,
                face.nose_tip.1,
                face.eye_left.0,
                face.eye_left.1,
                face.eye_right.0,
                face.eye_right.1,
                embedding_to_bytes(&face.embedding),
            ],
        )?;
    }

    for ocr_box in &frame.ocr_boxes {
        conn.execute(
            r#"
            INSERT INTO ocr_boxes (
                frame_id, position_x, position_y, width, height, text, confidence
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                frame_id,
                ocr_box.position.0,
                ocr_box.position.1,
                ocr_box.width,
                ocr_box.height,
                ocr_box.text,
                ocr_box.confidence,
            ],
        )?;
    }

    for object in &frame.objects {
        conn.execute(
            r#"
            INSERT INTO object_boxes (
                frame_id, position_x, position_y, width, height, label, confidence
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                frame_id,
                object.position.0,
                object.position.1,
                object.width,
                object.height,
                object.label,
                object.confidence,
            ],
        )?;
    }

    Ok(())
}

/// Media rows missing timezone information but carrying a local time.
pub fn media_without_timezone(conn: &Connection) -> Result<Vec<(String, NaiveDateTime)>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, datetime_local FROM media
        WHERE timezone_name IS NULL AND datetime_local IS NOT NULL
        ORDER BY id
        "#,
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    Ok(rows
        .collect::<rusqlite::Result<Vec<_>>>()?
        .into_iter()
        .filter_map(|(id, local)| datetime_from_sql(&local).map(|l| (id, l)))
        .collect())
}

/// Coordinates of the geotagged row temporally closest to `local`.
pub fn nearest_coordinates(
    conn: &Connection,
    local: NaiveDateTime,
) -> Result<Option<(f64, f64)>> {
    let result = conn.query_row(
        r#"
        SELECT latitude, longitude FROM media
        WHERE latitude IS NOT NULL AND longitude IS NOT NULL
          AND datetime_local IS NOT NULL
        ORDER BY ABS(julianday(datetime_local) - julianday(?1))
        LIMIT 1
        "#,
        [local.format(DATETIME_FORMAT).to_string()],
        |row| Ok((row.get::<_, f64>(0)?, row.get::<_, f64>(1)?)),
    );
    match result {
        Ok(coords) => Ok(Some(coords)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Fill in backfilled timezone fields for one media row.
pub fn update_timezone(
    conn: &Connection,
    media_id: &str,
    timezone_name: &str,
    timezone_offset: i32,
    datetime_utc: NaiveDateTime,
) -> Result<()> {
    conn.execute(
        r#"
        UPDATE media
        SET timezone_name = ?1, timezone_offset = ?2, datetime_utc = ?3
        WHERE id = ?4
        "#,
        params![
            timezone_name,
            timezone_offset,
            datetime_utc.format(DATETIME_FORMAT).to_string(),
            media_id,
        ],
    )?;
    Ok(())
}

/// Stored weather condition code for one media row, for tests and clients.
pub fn weather_condition_of(conn: &Connection, media_id: &str) -> Result<Option<WeatherCondition>> {
    let code = conn.query_row(
        "SELECT weather_condition FROM media WHERE id = ?",
        [media_id],
        |row| row.get::<_, Option<i32>>(0),
    )?;
    Ok(code.and_then(WeatherCondition::from_code))
}

/// Stored provenance tag for one media row.
pub fn time_source_of(conn: &Connection, media_id: &str) -> Result<Option<TimeSource>> {
    let tag = conn.query_row(
        "SELECT datetime_source FROM media WHERE id = ?",
        [media_id],
        |row| row.get::<_, Option<String>>(0),
    )?;
    Ok(tag.as_deref().and_then(TimeSource::from_str))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::test_support::sample_face;
    use chrono::NaiveDate;

    fn sample_record(id: &str, path: &str) -> MediaRecord {
        let mut record = MediaRecord::new(path, path);
        record.id = id.to_string();
        record.hash = format!("hash-{id}");
        record.width = Some(100);
        record.height = Some(80);
        record
    }

    fn sample_frame() -> FrameRecord {
        let mut frame = FrameRecord::new(0);
        frame.embedding = Some(vec![0.1, 0.2, 0.3]);
        frame.faces = vec![sample_face(vec![1.0, 0.0])];
        frame
    }

    #[test]
    fn test_insert_and_stored_hashes() {
        let mut db = Database::open_in_memory().unwrap();
        let record = sample_record("m1", "a.jpg");
        db.insert_media(&record, &[sample_frame()]).unwrap();

        let stored = db.stored_hashes().unwrap();
        assert_eq!(stored.get("a.jpg").map(String::as_str), Some("hash-m1"));
        assert!(!stored.contains_key("new.jpg"));

        let faces: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM face_boxes", [], |row| row.get(0))
            .unwrap();
        assert_eq!(faces, 1);
    }

    #[test]
    fn test_reingest_replaces_rows() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_media(&sample_record("m1", "a.jpg"), &[sample_frame()])
            .unwrap();
        db.insert_media(&sample_record("m2", "a.jpg"), &[sample_frame()])
            .unwrap();

        let media: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM media", [], |row| row.get(0))
            .unwrap();
        let frames: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM frames", [], |row| row.get(0))
            .unwrap();
        assert_eq!(media, 1);
        assert_eq!(frames, 1);
    }

    #[test]
    fn test_remove_missing_media() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("keep.jpg"), b"data").unwrap();

        let mut db = Database::open_in_memory().unwrap();
        db.insert_media(&sample_record("m1", "keep.jpg"), &[]).unwrap();
        db.insert_media(&sample_record("m2", "gone.jpg"), &[sample_frame()])
            .unwrap();

        let removed = db.remove_missing_media(dir.path()).unwrap();
        assert_eq!(removed, 1);

        let frames: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM frames", [], |row| row.get(0))
            .unwrap();
        assert_eq!(frames, 0);
    }

    #[test]
    fn test_timezone_queries() {
        let mut db = Database::open_in_memory().unwrap();
        let noon = NaiveDate::from_ymd_opt(2023, 6, 15).unwrap().and_hms_opt(12, 0, 0).unwrap();

        let mut geotagged = sample_record("m1", "tagged.jpg");
        geotagged.latitude = Some(52.0);
        geotagged.longitude = Some(5.0);
        geotagged.datetime_local = Some(noon);
        geotagged.timezone_name = Some("Europe/Amsterdam".to_string());
        db.insert_media(&geotagged, &[]).unwrap();

        let mut untagged = sample_record("m2", "untagged.jpg");
        untagged.datetime_local = Some(noon + chrono::Duration::hours(1));
        db.insert_media(&untagged, &[]).unwrap();

        let pending = media_without_timezone(&db.conn).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].0, "m2");

        let coords = nearest_coordinates(&db.conn, pending[0].1).unwrap();
        assert_eq!(coords, Some((52.0, 5.0)));

        update_timezone(&db.conn, "m2", "Europe/Amsterdam", 7200, noon).unwrap();
        assert!(media_without_timezone(&db.conn).unwrap().is_empty());
    }
}

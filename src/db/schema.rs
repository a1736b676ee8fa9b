pub const SCHEMA: &str = r#"
-- Media table: one row per ingested photo or video
CREATE TABLE IF NOT EXISTS media (
    id TEXT PRIMARY KEY,
    filename TEXT NOT NULL,
    relative_path TEXT NOT NULL UNIQUE,
    hash TEXT NOT NULL,

    -- Technical metadata
    width INTEGER,
    height INTEGER,
    duration REAL,
    format TEXT,
    size_bytes INTEGER,

    -- Raw probe sections as JSON
    file_section TEXT,
    exif_section TEXT,
    composite_section TEXT,
    xmp_section TEXT,
    gif_section TEXT,
    quicktime_section TEXT,
    matroska_section TEXT,

    -- Tiny inline preview
    data_url TEXT,

    -- GPS
    latitude REAL,
    longitude REAL,
    altitude REAL,
    location_country TEXT,
    location_province TEXT,
    location_city TEXT,
    datetime_utc TEXT,

    -- Local time
    datetime_local TEXT,
    datetime_source TEXT,
    timezone_name TEXT,
    timezone_offset INTEGER,  -- seconds east of UTC

    -- Weather at capture time
    weather_recorded_at TEXT,
    weather_temperature REAL,
    weather_dewpoint REAL,
    weather_relative_humidity REAL,
    weather_precipitation REAL,
    weather_wind_gust REAL,
    weather_pressure REAL,
    weather_sun_hours REAL,
    weather_condition INTEGER
);

CREATE INDEX IF NOT EXISTS idx_media_hash ON media(hash);
CREATE INDEX IF NOT EXISTS idx_media_datetime_local ON media(datetime_local);

-- Frames: one row per sampled frame (photos have one at 0%)
CREATE TABLE IF NOT EXISTS frames (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    media_id TEXT NOT NULL,
    frame_percentage INTEGER NOT NULL,

    embedding BLOB,  -- float32 array stored as little-endian bytes

    scene_type TEXT,
    people_type TEXT,
    animal_type TEXT,
    document_type TEXT,
    object_type TEXT,
    activity_type TEXT,
    event_type TEXT,
    weather_condition INTEGER,
    is_outside INTEGER,
    is_landscape INTEGER,
    is_cityscape INTEGER,
    is_travel INTEGER,

    has_legible_text INTEGER,
    ocr_text TEXT,
    document_summary TEXT,

    summary TEXT,
    caption TEXT,

    measured_sharpness REAL,
    measured_noise INTEGER,
    measured_brightness REAL,
    measured_contrast REAL,
    measured_clipping REAL,
    measured_dynamic_range REAL,
    quality_score REAL,

    FOREIGN KEY (media_id) REFERENCES media(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_frames_media ON frames(media_id);

-- Identity clusters produced by face re-clustering
CREATE TABLE IF NOT EXISTS unique_faces (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    label TEXT,  -- user-assigned name, null until labeled
    centroid BLOB NOT NULL
);

-- Detected faces, optionally linked to an identity cluster
CREATE TABLE IF NOT EXISTS face_boxes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    frame_id INTEGER NOT NULL,
    unique_face_id INTEGER,  -- null for noise faces
    position_x REAL NOT NULL,
    position_y REAL NOT NULL,
    width REAL NOT NULL,
    height REAL NOT NULL,
    confidence REAL NOT NULL,
    age INTEGER NOT NULL,
    sex TEXT NOT NULL,
    mouth_left_x REAL NOT NULL,
    mouth_left_y REAL NOT NULL,
    mouth_right_x REAL NOT NULL,
    mouth_right_y REAL NOT NULL,
    nose_tip_x REAL NOT NULL,
    nose_tip_y REAL NOT NULL,
    eye_left_x REAL NOT NULL,
    eye_left_y REAL NOT NULL,
    eye_right_x REAL NOT NULL,
    eye_right_y REAL NOT NULL,
    embedding BLOB NOT NULL,
    FOREIGN KEY (frame_id) REFERENCES frames(id) ON DELETE CASCADE,
    FOREIGN KEY (unique_face_id) REFERENCES unique_faces(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_face_boxes_frame ON face_boxes(frame_id);
CREATE INDEX IF NOT EXISTS idx_face_boxes_unique_face ON face_boxes(unique_face_id);

-- Recognized text regions
CREATE TABLE IF NOT EXISTS ocr_boxes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    frame_id INTEGER NOT NULL,
    position_x REAL NOT NULL,
    position_y REAL NOT NULL,
    width REAL NOT NULL,
    height REAL NOT NULL,
    text TEXT NOT NULL,
    confidence REAL NOT NULL,
    FOREIGN KEY (frame_id) REFERENCES frames(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_ocr_boxes_frame ON ocr_boxes(frame_id);

-- Detected objects
CREATE TABLE IF NOT EXISTS object_boxes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    frame_id INTEGER NOT NULL,
    position_x REAL NOT NULL,
    position_y REAL NOT NULL,
    width REAL NOT NULL,
    height REAL NOT NULL,
    label TEXT NOT NULL,
    confidence REAL NOT NULL,
    FOREIGN KEY (frame_id) REFERENCES frames(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_object_boxes_frame ON object_boxes(frame_id);
"#;

/// Additive migrations for databases created by older versions. Each runs
/// best-effort; failures mean the column already exists.
pub const MIGRATIONS: &[&str] = &[
    "ALTER TABLE media ADD COLUMN data_url TEXT",
    "ALTER TABLE media ADD COLUMN timezone_offset INTEGER",
    "ALTER TABLE frames ADD COLUMN document_summary TEXT",
];

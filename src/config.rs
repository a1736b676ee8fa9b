use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_media_dir")]
    pub media_dir: PathBuf,

    #[serde(default = "default_thumbnails_dir")]
    pub thumbnails_dir: PathBuf,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub clustering: ClusteringConfig,

    #[serde(default)]
    pub providers: ProviderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Generate a free-text summary per frame (expensive, off by default).
    #[serde(default)]
    pub enable_text_summary: bool,

    /// Generate a document summary for text-heavy frames via the visual LLM
    /// (the single most expensive optional stage).
    #[serde(default)]
    pub enable_document_summary: bool,

    /// Minimum extracted-text length before a frame is treated as a
    /// document worth summarizing.
    #[serde(default = "default_document_detection_threshold")]
    pub document_detection_threshold: usize,

    /// Scene classification confidence below this falls back to Unknown.
    #[serde(default = "default_scene_confidence_threshold")]
    pub scene_confidence_threshold: f32,

    /// Video frames are sampled at these percentage offsets.
    #[serde(default = "default_video_frame_percentages")]
    pub video_frame_percentages: Vec<u32>,

    /// Thumbnail heights generated by the external thumbnailer; the data
    /// URL stage reads the smallest, frames read the largest.
    #[serde(default = "default_thumbnail_heights")]
    pub thumbnail_heights: Vec<u32>,

    /// Weather observations further than this from the capture time are
    /// ignored.
    #[serde(default = "default_weather_window_minutes")]
    pub weather_window_minutes: i64,

    #[serde(default = "default_media_extensions")]
    pub photo_extensions: Vec<String>,

    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,
}

fn default_document_detection_threshold() -> usize {
    65
}

fn default_scene_confidence_threshold() -> f32 {
    0.003
}

fn default_video_frame_percentages() -> Vec<u32> {
    vec![1, 33, 66, 95]
}

fn default_thumbnail_heights() -> Vec<u32> {
    vec![200, 250, 300, 400, 500, 750, 1080]
}

fn default_weather_window_minutes() -> i64 {
    30
}

fn default_media_extensions() -> Vec<String> {
    vec![
        "png".to_string(),
        "jpg".to_string(),
        "jpeg".to_string(),
        "bmp".to_string(),
        "gif".to_string(),
        "tiff".to_string(),
        "webp".to_string(),
    ]
}

fn default_video_extensions() -> Vec<String> {
    vec!["mp4".to_string(), "mkv".to_string(), "webm".to_string()]
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enable_text_summary: false,
            enable_document_summary: false,
            document_detection_threshold: default_document_detection_threshold(),
            scene_confidence_threshold: default_scene_confidence_threshold(),
            video_frame_percentages: default_video_frame_percentages(),
            thumbnail_heights: default_thumbnail_heights(),
            weather_window_minutes: default_weather_window_minutes(),
            photo_extensions: default_media_extensions(),
            video_extensions: default_video_extensions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringConfig {
    /// Neighborhood density required for a face to seed/extend a cluster.
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    /// Clusters smaller than this are dissolved into noise.
    #[serde(default = "default_min_cluster_size")]
    pub min_cluster_size: usize,

    /// Euclidean neighborhood radius on L2-normalized embeddings.
    #[serde(default = "default_epsilon")]
    pub epsilon: f32,
}

fn default_min_samples() -> usize {
    2
}

fn default_min_cluster_size() -> usize {
    4
}

fn default_epsilon() -> f32 {
    // On unit vectors, euclidean 1.0 corresponds to cosine distance 0.5;
    // loose enough for pose/lighting variation of one person.
    1.0
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            min_samples: default_min_samples(),
            min_cluster_size: default_min_cluster_size(),
            epsilon: default_epsilon(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_geocoder_endpoint")]
    pub geocoder_endpoint: String,

    #[serde(default = "default_weather_endpoint")]
    pub weather_endpoint: String,

    /// Sidecar serving the vision models over HTTP.
    #[serde(default = "default_model_server_endpoint")]
    pub model_server_endpoint: String,

    /// IANA timezone assumed for geotagged media without timezone data.
    /// Unset disables the timezone backfill.
    #[serde(default)]
    pub home_timezone: Option<String>,
}

fn default_geocoder_endpoint() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_weather_endpoint() -> String {
    "https://archive-api.open-meteo.com".to_string()
}

fn default_model_server_endpoint() -> String {
    "http://localhost:8087".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            geocoder_endpoint: default_geocoder_endpoint(),
            weather_endpoint: default_weather_endpoint(),
            model_server_endpoint: default_model_server_endpoint(),
            home_timezone: None,
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("photonest")
        .join("photonest.db")
}

fn default_media_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Pictures")
}

fn default_thumbnails_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("photonest")
        .join("thumbnails")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            media_dir: default_media_dir(),
            thumbnails_dir: default_thumbnails_dir(),
            pipeline: PipelineConfig::default(),
            clustering: ClusteringConfig::default(),
            providers: ProviderConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &PathBuf) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(config_path)?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    fn save_to(&self, config_path: &PathBuf) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("photonest")
    }

    fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

//! Library processing driver.
//!
//! `process_file` runs one file through the metadata pipeline and its
//! sampled frames through the visual pipeline. `process_library` walks the
//! media directory, processes changed files in parallel, persists results
//! on a single writer, and finishes with the timezone backfill and face
//! re-clustering passes.

use anyhow::Result;
use image::{DynamicImage, ImageReader};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::capabilities::Capabilities;
use crate::config::Config;
use crate::data::media::{FrameRecord, MediaRecord};
use crate::db::Database;
use crate::engine::{fill_timezone_gaps, recluster_faces, BackfillReport, ClusterReport};
use crate::pipeline::file::{
    hash::hash_file, DataUrlStage, ExifStage, GpsStage, HashStage, TimeStage, WeatherStage,
};
use crate::pipeline::frame::{
    CaptionStage, ClassificationStage, EmbeddingStage, FaceStage, ObjectStage, OcrStage,
    QualityStage,
};
use crate::pipeline::{
    run_file_pipeline, run_frame_pipeline, FileStage, FrameStage, StageError, StageTimings,
};
use crate::probe::MetadataProbe;

/// Thumbnail layout of the external thumbnailer:
/// `<root>/<hash>/<height>p.avif` per height and
/// `<root>/<hash>/<percentage>_percent.avif` per sampled video frame.
pub struct ThumbnailPaths {
    root: PathBuf,
}

impl ThumbnailPaths {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn height(&self, hash: &str, height: u32) -> PathBuf {
        self.root.join(hash).join(format!("{height}p.avif"))
    }

    pub fn frame(&self, hash: &str, percentage: u32) -> PathBuf {
        self.root.join(hash).join(format!("{percentage}_percent.avif"))
    }
}

pub struct ProcessedFile {
    pub record: MediaRecord,
    pub frames: Vec<FrameRecord>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LibraryReport {
    pub discovered: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub removed: usize,
    pub backfill: BackfillReport,
    pub clustering: ClusterReport,
}

fn is_video(config: &Config, relative_path: &str) -> bool {
    let ext = Path::new(relative_path)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    config
        .pipeline
        .video_extensions
        .iter()
        .any(|e| e.eq_ignore_ascii_case(&ext))
}

fn decode(path: &Path) -> Result<DynamicImage> {
    Ok(ImageReader::open(path)?.with_guessed_format()?.decode()?)
}

/// Run one file through both pipelines. Does not touch the database.
/// `known_hash` carries the content hash when the caller already computed
/// one for change detection, so the file is not read twice.
pub fn process_file(
    relative_path: &str,
    known_hash: Option<&str>,
    config: &Config,
    capabilities: &Capabilities,
    probe: &dyn MetadataProbe,
) -> Result<ProcessedFile, StageError> {
    let filename = Path::new(relative_path)
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_else(|| relative_path.to_string());
    let mut record = MediaRecord::new(&filename, relative_path);
    if let Some(hash) = known_hash {
        record.hash = hash.to_string();
    }

    let file_stages: Vec<Box<dyn FileStage + '_>> = vec![
        Box::new(HashStage::new(&config.media_dir)),
        Box::new(ExifStage::new(probe, &config.media_dir)),
        Box::new(DataUrlStage::new(
            &config.thumbnails_dir,
            &config.pipeline.thumbnail_heights,
        )),
        Box::new(GpsStage::new(capabilities.geocoder.as_ref())),
        Box::new(TimeStage::new(capabilities.timezone.as_ref())),
        Box::new(WeatherStage::new(
            capabilities.weather.as_ref(),
            config.pipeline.weather_window_minutes,
        )),
    ];

    let mut timings = StageTimings::default();
    run_file_pipeline(&file_stages, &mut record, &mut timings)?;

    let frame_stages: Vec<Box<dyn FrameStage + '_>> = vec![
        Box::new(EmbeddingStage::new(capabilities.embedder.as_ref())),
        Box::new(ClassificationStage::new(
            capabilities.classifier.as_ref(),
            config.pipeline.scene_confidence_threshold,
        )),
        Box::new(OcrStage::new(
            capabilities.ocr.as_ref(),
            capabilities.visual_llm.as_ref(),
            config.pipeline.enable_document_summary,
            config.pipeline.document_detection_threshold,
        )),
        Box::new(FaceStage::new(capabilities.face_detector.as_ref())),
        Box::new(CaptionStage::new(
            capabilities.captioner.as_ref(),
            capabilities.visual_llm.as_ref(),
            config.pipeline.enable_text_summary,
        )),
        Box::new(ObjectStage::new(capabilities.object_detector.as_ref())),
        Box::new(QualityStage),
    ];

    let thumbnails = ThumbnailPaths::new(&config.thumbnails_dir);
    let percentages: Vec<u32> = if is_video(config, relative_path) {
        config.pipeline.video_frame_percentages.clone()
    } else {
        vec![0]
    };

    let mut frames = Vec::with_capacity(percentages.len());
    for percentage in percentages {
        let image = match frame_image(config, &thumbnails, &record, percentage) {
            Ok(image) => image,
            Err(e) => {
                warn!("No frame at {}% for {}: {}", percentage, relative_path, e);
                continue;
            }
        };

        let mut frame = FrameRecord::new(percentage);
        run_frame_pipeline(&frame_stages, &mut frame, &image, &mut timings)?;
        frames.push(frame);
    }

    debug!(
        "Processed {} in {:?} ({} stages timed)",
        relative_path,
        timings.total(),
        timings.entries.len()
    );

    Ok(ProcessedFile { record, frames })
}

/// Decode the frame image for one sampled percentage. Photos use the
/// largest thumbnail (the original as fallback); video frames only exist
/// as extracted thumbnails.
fn frame_image(
    config: &Config,
    thumbnails: &ThumbnailPaths,
    record: &MediaRecord,
    percentage: u32,
) -> Result<DynamicImage> {
    if is_video(config, &record.relative_path) {
        return decode(&thumbnails.frame(&record.hash, percentage));
    }

    let largest = config
        .pipeline
        .thumbnail_heights
        .iter()
        .copied()
        .max()
        .unwrap_or(1080);
    let thumbnail = thumbnails.height(&record.hash, largest);
    if thumbnail.exists() {
        decode(&thumbnail)
    } else {
        decode(&config.media_dir.join(&record.relative_path))
    }
}

fn discover_media(config: &Config) -> Vec<String> {
    let mut files = Vec::new();
    for entry in WalkDir::new(&config.media_dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension() else {
            continue;
        };
        let ext = ext.to_string_lossy().to_lowercase();
        let known = config
            .pipeline
            .photo_extensions
            .iter()
            .chain(config.pipeline.video_extensions.iter())
            .any(|e| e.eq_ignore_ascii_case(&ext));
        if !known {
            continue;
        }
        if let Ok(relative) = path.strip_prefix(&config.media_dir) {
            files.push(relative.to_string_lossy().to_string());
        }
    }
    files.sort();
    files
}

/// Full library pass: cleanup, parallel ingest of new or changed files,
/// timezone backfill, face re-clustering.
pub fn process_library(
    config: &Config,
    capabilities: &Capabilities,
    probe: &dyn MetadataProbe,
    db: &mut Database,
) -> Result<LibraryReport> {
    let mut report = LibraryReport::default();

    report.removed = db.remove_missing_media(&config.media_dir)?;

    let files = discover_media(config);
    report.discovered = files.len();
    let stored = db.stored_hashes()?;

    enum Outcome {
        Done(Box<ProcessedFile>),
        Unchanged,
        Failed,
    }

    let results: Vec<Outcome> = files
        .par_iter()
        .map(|relative_path| {
            let hash = match hash_file(&config.media_dir.join(relative_path)) {
                Ok(hash) => hash,
                Err(e) => {
                    warn!("Cannot hash {}: {}", relative_path, e);
                    return Outcome::Failed;
                }
            };
            if stored.get(relative_path.as_str()) == Some(&hash) {
                return Outcome::Unchanged;
            }

            match process_file(relative_path, Some(hash.as_str()), config, capabilities, probe) {
                Ok(processed) => Outcome::Done(Box::new(processed)),
                Err(StageError::Unparsable(msg)) => {
                    warn!("Skipping unparsable media: {}", msg);
                    Outcome::Failed
                }
                Err(StageError::Other(e)) => {
                    warn!("Failed to process {}: {:#}", relative_path, e);
                    Outcome::Failed
                }
            }
        })
        .collect();

    for outcome in results {
        match outcome {
            Outcome::Done(processed) => {
                db.insert_media(&processed.record, &processed.frames)?;
                report.processed += 1;
            }
            Outcome::Unchanged => report.skipped += 1,
            Outcome::Failed => report.failed += 1,
        }
    }

    report.backfill = fill_timezone_gaps(db, capabilities.timezone.as_ref())?;
    report.clustering = recluster_faces(db, &config.clustering)?;

    info!(
        "Library pass: {} discovered, {} processed, {} removed",
        report.discovered, report.processed, report.removed
    );
    Ok(report)
}

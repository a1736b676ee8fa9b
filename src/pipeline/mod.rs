//! Stage pipeline framework.
//!
//! Two linear pipelines share the same contract: an ordered list of stages,
//! each consuming the accumulating record and filling in only the fields it
//! owns. The runner executes stages strictly in order and records a
//! wall-clock duration per stage for performance diagnostics.
//!
//! Failure taxonomy: a stage returns [`StageError::Unparsable`] only when
//! the file is fundamentally broken (that aborts the file, never the
//! batch); every other problem inside a stage degrades to null fields and
//! is at most logged.

pub mod file;
pub mod frame;

use image::DynamicImage;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::data::media::{FrameRecord, MediaRecord};

#[derive(Debug, Error)]
pub enum StageError {
    /// The media file cannot be parsed at all. Permanent: the file is
    /// logged and skipped, not retried.
    #[error("unparsable media: {0}")]
    Unparsable(String),

    /// Unexpected failure in a stage that should have degraded softly.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A stage of the per-file metadata pipeline.
pub trait FileStage {
    fn name(&self) -> &'static str;
    fn process(&self, record: &mut MediaRecord) -> Result<(), StageError>;
}

/// A stage of the per-frame visual pipeline.
pub trait FrameStage {
    fn name(&self) -> &'static str;
    fn process(&self, record: &mut FrameRecord, image: &DynamicImage) -> Result<(), StageError>;
}

/// Wall-clock duration per executed stage, in execution order.
#[derive(Debug, Clone, Default)]
pub struct StageTimings {
    pub entries: Vec<(&'static str, Duration)>,
}

impl StageTimings {
    pub fn record(&mut self, name: &'static str, elapsed: Duration) {
        self.entries.push((name, elapsed));
    }

    pub fn total(&self) -> Duration {
        self.entries.iter().map(|(_, d)| *d).sum()
    }
}

/// Run the file stages in order, timing each one.
pub fn run_file_pipeline(
    stages: &[Box<dyn FileStage + '_>],
    record: &mut MediaRecord,
    timings: &mut StageTimings,
) -> Result<(), StageError> {
    for stage in stages {
        let start = Instant::now();
        let result = stage.process(record);
        timings.record(stage.name(), start.elapsed());
        result?;
    }
    Ok(())
}

/// Run the frame stages in order, timing each one.
pub fn run_frame_pipeline(
    stages: &[Box<dyn FrameStage + '_>],
    record: &mut FrameRecord,
    image: &DynamicImage,
    timings: &mut StageTimings,
) -> Result<(), StageError> {
    for stage in stages {
        let start = Instant::now();
        let result = stage.process(record, image);
        timings.record(stage.name(), start.elapsed());
        result?;
    }
    Ok(())
}

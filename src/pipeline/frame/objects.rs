//! Object detection stage. The detector filters by its own confidence
//! threshold before returning.

use image::DynamicImage;

use crate::capabilities::ObjectDetector;
use crate::data::media::FrameRecord;
use crate::pipeline::{FrameStage, StageError};

pub struct ObjectStage<'a> {
    detector: &'a dyn ObjectDetector,
}

impl<'a> ObjectStage<'a> {
    pub fn new(detector: &'a dyn ObjectDetector) -> Self {
        Self { detector }
    }
}

impl FrameStage for ObjectStage<'_> {
    fn name(&self) -> &'static str {
        "objects"
    }

    fn process(&self, record: &mut FrameRecord, image: &DynamicImage) -> Result<(), StageError> {
        record.objects = self.detector.detect_objects(image)?;
        Ok(())
    }
}

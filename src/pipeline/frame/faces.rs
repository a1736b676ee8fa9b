//! Face detection stage. Detected faces stay attached to the frame only;
//! linking them to identities is the clustering engine's job.

use image::DynamicImage;

use crate::capabilities::FaceDetector;
use crate::data::media::FrameRecord;
use crate::pipeline::{FrameStage, StageError};

pub struct FaceStage<'a> {
    detector: &'a dyn FaceDetector,
}

impl<'a> FaceStage<'a> {
    pub fn new(detector: &'a dyn FaceDetector) -> Self {
        Self { detector }
    }
}

impl FrameStage for FaceStage<'_> {
    fn name(&self) -> &'static str {
        "faces"
    }

    fn process(&self, record: &mut FrameRecord, image: &DynamicImage) -> Result<(), StageError> {
        record.faces = self.detector.detect_faces(image)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::test_support::{sample_face, MockFaceDetector};

    #[test]
    fn test_faces_attached_to_frame() {
        let detector = MockFaceDetector {
            faces: vec![sample_face(vec![0.1, 0.2]), sample_face(vec![0.3, 0.4])],
        };
        let stage = FaceStage::new(&detector);
        let mut record = FrameRecord::new(0);

        stage.process(&mut record, &DynamicImage::new_rgb8(4, 4)).unwrap();
        assert_eq!(record.faces.len(), 2);
    }
}

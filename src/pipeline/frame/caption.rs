//! Caption stage: a short caption always, plus an optional long-form
//! search summary (the expensive LLM call, off by default).

use image::DynamicImage;

use crate::capabilities::{Captioner, VisualLlm};
use crate::data::media::FrameRecord;
use crate::pipeline::{FrameStage, StageError};

const SUMMARY_PROMPT: &str =
    "Describe this image in a way that captures all essential details for a \
     search database. Include the setting, key objects, actions, number and \
     type of people or animals, and any noticeable visual features. Make the \
     description clear, concise, and useful for someone searching this image \
     in a library. Avoid subjective interpretations or ambiguous terms.";

pub struct CaptionStage<'a> {
    captioner: &'a dyn Captioner,
    visual_llm: &'a dyn VisualLlm,
    enable_text_summary: bool,
}

impl<'a> CaptionStage<'a> {
    pub fn new(
        captioner: &'a dyn Captioner,
        visual_llm: &'a dyn VisualLlm,
        enable_text_summary: bool,
    ) -> Self {
        Self {
            captioner,
            visual_llm,
            enable_text_summary,
        }
    }
}

impl FrameStage for CaptionStage<'_> {
    fn name(&self) -> &'static str {
        "caption"
    }

    fn process(&self, record: &mut FrameRecord, image: &DynamicImage) -> Result<(), StageError> {
        if self.enable_text_summary {
            record.summary = Some(self.visual_llm.image_question(image, SUMMARY_PROMPT)?);
        }
        record.caption = Some(self.captioner.caption(image)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::test_support::{MockCaptioner, MockVisualLlm};

    fn blank() -> DynamicImage {
        DynamicImage::new_rgb8(4, 4)
    }

    #[test]
    fn test_caption_always_summary_gated() {
        let stage = CaptionStage::new(&MockCaptioner, &MockVisualLlm, false);
        let mut record = FrameRecord::new(0);
        stage.process(&mut record, &blank()).unwrap();
        assert_eq!(record.caption.as_deref(), Some("a test image"));
        assert!(record.summary.is_none());

        let stage = CaptionStage::new(&MockCaptioner, &MockVisualLlm, true);
        let mut record = FrameRecord::new(0);
        stage.process(&mut record, &blank()).unwrap();
        assert_eq!(record.summary.as_deref(), Some("a mock answer"));
    }
}

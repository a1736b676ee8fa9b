//! OCR stage.
//!
//! Detection is a cheap binary gate; full extraction and per-word boxes
//! run only on a positive gate. Whitespace-only extraction downgrades the
//! gate again so consumers never see "has text" with nothing attached.
//! Frames that read like an actual document (long extracted text) can get
//! a structured summary from the vision LLM when that is enabled.

use image::DynamicImage;

use crate::capabilities::{Ocr, VisualLlm};
use crate::data::media::FrameRecord;
use crate::pipeline::{FrameStage, StageError};

const DOCUMENT_ANALYSIS_PROMPT: &str =
    "Analyze the image and provide the following details:\n\n\
     Summary: A concise summary of the content in the photo, including any \
     key points or important sections visible. \
     Text Detection: Detect and list any legible text visible in the image. \
     If possible, extract it and provide a short excerpt or the full text. \
     Language Detection: Identify the language(s) in the text and specify the \
     primary language used. \
     Document Type: Determine the type of document or text. Is it a formal \
     document (e.g., letter, contract, form), informal (e.g., note, memo), \
     or something else? Provide details about the document's likely purpose \
     (e.g., invoice, receipt, report, etc.). \
     Text Formatting: If relevant, describe any specific formatting styles \
     such as headings, bullet points, numbered lists, tables, or signatures. \
     Additional Features: Detect if there are any images, logos, or other \
     non-text elements present that provide additional context or information \
     about the document (e.g., company logos, photos, charts). \
     Contextual Details: If applicable, mention any visible date, address, \
     or other contextual information that could help understand the \
     document's origin or purpose.";

pub struct OcrStage<'a> {
    ocr: &'a dyn Ocr,
    visual_llm: &'a dyn VisualLlm,
    enable_document_summary: bool,
    document_detection_threshold: usize,
}

impl<'a> OcrStage<'a> {
    pub fn new(
        ocr: &'a dyn Ocr,
        visual_llm: &'a dyn VisualLlm,
        enable_document_summary: bool,
        document_detection_threshold: usize,
    ) -> Self {
        Self {
            ocr,
            visual_llm,
            enable_document_summary,
            document_detection_threshold,
        }
    }
}

impl FrameStage for OcrStage<'_> {
    fn name(&self) -> &'static str {
        "ocr"
    }

    fn process(&self, record: &mut FrameRecord, image: &DynamicImage) -> Result<(), StageError> {
        let mut has_text = self.ocr.has_legible_text(image)?;

        if has_text {
            let text = self.ocr.extract_text(image)?;
            let trimmed = text.trim();
            if trimmed.is_empty() {
                has_text = false;
            } else {
                record.ocr_text = Some(trimmed.to_string());
            }
            record.ocr_boxes = self.ocr.extract_boxes(image)?;
        }
        record.has_legible_text = Some(has_text);

        let looks_like_document = self.enable_document_summary
            && record
                .ocr_text
                .as_ref()
                .map(|t| t.len() > self.document_detection_threshold)
                .unwrap_or(false);
        if looks_like_document {
            record.document_summary =
                Some(self.visual_llm.image_question(image, DOCUMENT_ANALYSIS_PROMPT)?);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::test_support::{MockOcr, MockVisualLlm};

    fn blank() -> DynamicImage {
        DynamicImage::new_rgb8(4, 4)
    }

    #[test]
    fn test_text_extracted_on_positive_gate() {
        let ocr = MockOcr {
            text: "hello world".to_string(),
        };
        let stage = OcrStage::new(&ocr, &MockVisualLlm, false, 65);
        let mut record = FrameRecord::new(0);

        stage.process(&mut record, &blank()).unwrap();
        assert_eq!(record.has_legible_text, Some(true));
        assert_eq!(record.ocr_text.as_deref(), Some("hello world"));
        assert!(record.document_summary.is_none());
    }

    #[test]
    fn test_whitespace_only_downgrades_gate() {
        let ocr = MockOcr {
            text: "   \n ".to_string(),
        };
        let stage = OcrStage::new(&ocr, &MockVisualLlm, false, 65);
        let mut record = FrameRecord::new(0);

        stage.process(&mut record, &blank()).unwrap();
        assert_eq!(record.has_legible_text, Some(false));
        assert!(record.ocr_text.is_none());
    }

    #[test]
    fn test_long_text_triggers_document_summary() {
        let ocr = MockOcr {
            text: "x".repeat(100),
        };
        let stage = OcrStage::new(&ocr, &MockVisualLlm, true, 65);
        let mut record = FrameRecord::new(0);

        stage.process(&mut record, &blank()).unwrap();
        assert_eq!(record.document_summary.as_deref(), Some("a mock answer"));
    }

    #[test]
    fn test_summary_disabled_leaves_field_null() {
        let ocr = MockOcr {
            text: "x".repeat(100),
        };
        let stage = OcrStage::new(&ocr, &MockVisualLlm, false, 65);
        let mut record = FrameRecord::new(0);

        stage.process(&mut record, &blank()).unwrap();
        assert!(record.document_summary.is_none());
    }
}

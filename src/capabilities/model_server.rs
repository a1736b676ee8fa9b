//! Client for a local model sidecar exposing the vision models over HTTP.
//!
//! Embedding, face detection, object detection, OCR, captioning and visual
//! question answering all run in one sidecar process (GPU-bound models do
//! not belong in this binary). Each capability maps to one JSON endpoint;
//! images travel as base64 JPEG data URLs, downscaled to keep requests
//! small. Zero-shot classification posts the precomputed embedding instead
//! of the image, so a frame is embedded once per pipeline run.

use std::io::Cursor;
use std::time::Duration;

use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};

use crate::data::types::{FaceBox, ObjectBox, OcrBox};

use super::{Captioner, Classifier, Embedder, FaceDetector, ObjectDetector, Ocr, VisualLlm};

/// Model requests can take a while on first load; generation endpoints
/// longer still.
const MODEL_TIMEOUT_SECS: u64 = 120;

/// Inputs larger than this get downscaled before upload.
const MAX_UPLOAD_DIMENSION: u32 = 1024;

#[derive(Clone)]
pub struct ModelServer {
    endpoint: String,
    agent: ureq::Agent,
}

#[derive(Serialize)]
struct ImageRequest {
    image: String,
}

#[derive(Serialize)]
struct QuestionRequest {
    image: String,
    question: String,
}

#[derive(Serialize)]
struct TextRequest<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    embedding: &'a [f32],
    prompts: &'a [&'a str],
}

#[derive(Serialize)]
struct BinaryClassifyRequest<'a> {
    embedding: &'a [f32],
    positive: &'a str,
    negative: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct FacesResponse {
    faces: Vec<FaceBox>,
}

#[derive(Deserialize)]
struct ObjectsResponse {
    objects: Vec<ObjectBox>,
}

#[derive(Deserialize)]
struct LegibleResponse {
    legible: bool,
}

#[derive(Deserialize)]
struct TextResponse {
    text: String,
}

#[derive(Deserialize)]
struct OcrBoxesResponse {
    boxes: Vec<OcrBox>,
}

#[derive(Deserialize)]
struct ClassifyResponse {
    index: usize,
    confidence: f32,
}

#[derive(Deserialize)]
struct BinaryClassifyResponse {
    answer: bool,
    confidence: f32,
}

impl ModelServer {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(MODEL_TIMEOUT_SECS))
                .build(),
        }
    }

    fn post<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        request: &Req,
    ) -> Result<Resp> {
        let url = format!("{}{}", self.endpoint, path);
        let response = self
            .agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_json(request)
            .map_err(|e| anyhow!("Model request {} failed: {}", path, e))?;
        response
            .into_json()
            .map_err(|e| anyhow!("Failed to parse {} response: {}", path, e))
    }

    fn image_request(&self, image: &DynamicImage) -> Result<ImageRequest> {
        Ok(ImageRequest {
            image: encode_image(image, MAX_UPLOAD_DIMENSION)?,
        })
    }
}

/// Downscale if needed, re-encode as JPEG, and wrap in a data URL.
fn encode_image(image: &DynamicImage, max_dimension: u32) -> Result<String> {
    let (width, height) = image.dimensions();
    let resized;
    let image = if width > max_dimension || height > max_dimension {
        resized = image.resize(
            max_dimension,
            max_dimension,
            image::imageops::FilterType::Triangle,
        );
        &resized
    } else {
        image
    };

    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, 85);
    image
        .write_with_encoder(encoder)
        .map_err(|e| anyhow!("Failed to encode image as JPEG: {}", e))?;

    Ok(format!(
        "data:image/jpeg;base64,{}",
        BASE64.encode(buf.into_inner())
    ))
}

impl Embedder for ModelServer {
    fn embed_image(&self, image: &DynamicImage) -> Result<Vec<f32>> {
        let response: EmbeddingResponse = self.post("/embed/image", &self.image_request(image)?)?;
        Ok(response.embedding)
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let response: EmbeddingResponse = self.post("/embed/text", &TextRequest { text })?;
        Ok(response.embedding)
    }
}

impl FaceDetector for ModelServer {
    fn detect_faces(&self, image: &DynamicImage) -> Result<Vec<FaceBox>> {
        let response: FacesResponse = self.post("/faces", &self.image_request(image)?)?;
        Ok(response.faces)
    }
}

impl ObjectDetector for ModelServer {
    fn detect_objects(&self, image: &DynamicImage) -> Result<Vec<ObjectBox>> {
        let response: ObjectsResponse = self.post("/objects", &self.image_request(image)?)?;
        Ok(response.objects)
    }
}

impl Ocr for ModelServer {
    fn has_legible_text(&self, image: &DynamicImage) -> Result<bool> {
        let response: LegibleResponse = self.post("/ocr/detect", &self.image_request(image)?)?;
        Ok(response.legible)
    }

    fn extract_text(&self, image: &DynamicImage) -> Result<String> {
        let response: TextResponse = self.post("/ocr/text", &self.image_request(image)?)?;
        Ok(response.text)
    }

    fn extract_boxes(&self, image: &DynamicImage) -> Result<Vec<OcrBox>> {
        let response: OcrBoxesResponse = self.post("/ocr/boxes", &self.image_request(image)?)?;
        Ok(response.boxes)
    }
}

impl Classifier for ModelServer {
    fn classify(&self, embedding: &[f32], prompts: &[&str]) -> Result<(usize, f32)> {
        let response: ClassifyResponse =
            self.post("/classify", &ClassifyRequest { embedding, prompts })?;
        if response.index >= prompts.len() {
            return Err(anyhow!(
                "Classifier returned index {} for {} prompts",
                response.index,
                prompts.len()
            ));
        }
        Ok((response.index, response.confidence))
    }

    fn classify_binary(
        &self,
        embedding: &[f32],
        positive: &str,
        negative: &str,
    ) -> Result<(bool, f32)> {
        let response: BinaryClassifyResponse = self.post(
            "/classify/binary",
            &BinaryClassifyRequest {
                embedding,
                positive,
                negative,
            },
        )?;
        Ok((response.answer, response.confidence))
    }
}

impl Captioner for ModelServer {
    fn caption(&self, image: &DynamicImage) -> Result<String> {
        let response: TextResponse = self.post("/caption", &self.image_request(image)?)?;
        Ok(response.text)
    }
}

impl VisualLlm for ModelServer {
    fn image_question(&self, image: &DynamicImage, question: &str) -> Result<String> {
        let response: TextResponse = self.post(
            "/vqa",
            &QuestionRequest {
                image: self.image_request(image)?.image,
                question: question.to_string(),
            },
        )?;
        Ok(response.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_image_downscales_large_input() {
        let image = DynamicImage::new_rgb8(2048, 1024);
        let url = encode_image(&image, 1024).unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));

        let bytes = BASE64
            .decode(url.trim_start_matches("data:image/jpeg;base64,"))
            .unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (1024, 512));
    }

    #[test]
    fn test_small_image_kept_as_is() {
        let image = DynamicImage::new_rgb8(300, 200);
        let url = encode_image(&image, 1024).unwrap();
        let bytes = BASE64
            .decode(url.trim_start_matches("data:image/jpeg;base64,"))
            .unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (300, 200));
    }
}

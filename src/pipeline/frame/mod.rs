//! Frame-level visual stages, in their fixed execution order:
//! embedding, classification, OCR, faces, caption, objects, quality.

pub mod caption;
pub mod classification;
pub mod embedding;
pub mod faces;
pub mod objects;
pub mod ocr;
pub mod quality;

pub use caption::CaptionStage;
pub use classification::ClassificationStage;
pub use embedding::EmbeddingStage;
pub use faces::FaceStage;
pub use objects::ObjectStage;
pub use ocr::OcrStage;
pub use quality::QualityStage;

//! Embedding stage: every later frame stage that classifies does so
//! against this vector, so it runs first.

use image::DynamicImage;

use crate::capabilities::Embedder;
use crate::data::media::FrameRecord;
use crate::pipeline::{FrameStage, StageError};

pub struct EmbeddingStage<'a> {
    embedder: &'a dyn Embedder,
}

impl<'a> EmbeddingStage<'a> {
    pub fn new(embedder: &'a dyn Embedder) -> Self {
        Self { embedder }
    }
}

impl FrameStage for EmbeddingStage<'_> {
    fn name(&self) -> &'static str {
        "embedding"
    }

    fn process(&self, record: &mut FrameRecord, image: &DynamicImage) -> Result<(), StageError> {
        record.embedding = Some(self.embedder.embed_image(image)?);
        Ok(())
    }
}

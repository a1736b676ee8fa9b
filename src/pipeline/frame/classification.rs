//! Zero-shot classification stage.
//!
//! A cascade of independent decisions against the frame embedding: one
//! multi-class scene pass with an Unknown floor, six gated refinements
//! (a cheap binary gate first, the expensive multi-class pass only on a
//! positive gate), four standalone booleans, and a weather guess that only
//! makes sense outdoors. A negative gate leaves its dependent field null
//! rather than forcing a best-effort label.

use image::DynamicImage;

use crate::capabilities::Classifier;
use crate::data::classification::{
    ActivityType, AnimalType, DocumentType, EventType, ObjectType, PeopleType, SceneType,
    WeatherCondition,
};
use crate::data::media::FrameRecord;
use crate::pipeline::{FrameStage, StageError};

pub struct ClassificationStage<'a> {
    classifier: &'a dyn Classifier,
    scene_confidence_threshold: f32,
}

impl<'a> ClassificationStage<'a> {
    pub fn new(classifier: &'a dyn Classifier, scene_confidence_threshold: f32) -> Self {
        Self {
            classifier,
            scene_confidence_threshold,
        }
    }

    fn classify_scene(&self, embedding: &[f32]) -> anyhow::Result<SceneType> {
        let (index, confidence) = self.classifier.classify(embedding, &SceneType::prompts())?;
        if confidence < self.scene_confidence_threshold {
            return Ok(SceneType::Unknown);
        }
        Ok(SceneType::ALL.get(index).copied().unwrap_or(SceneType::Unknown))
    }

    /// Binary gate, then a multi-class refinement only on a positive gate.
    fn refine<T: Copy>(
        &self,
        embedding: &[f32],
        positive: &str,
        negative: &str,
        variants: &'static [T],
        prompts: &[&str],
    ) -> anyhow::Result<Option<T>> {
        let (hit, _) = self.classifier.classify_binary(embedding, positive, negative)?;
        if !hit {
            return Ok(None);
        }
        let (index, _) = self.classifier.classify(embedding, prompts)?;
        Ok(variants.get(index).copied())
    }

    fn binary(&self, embedding: &[f32], positive: &str, negative: &str) -> anyhow::Result<bool> {
        let (hit, _) = self.classifier.classify_binary(embedding, positive, negative)?;
        Ok(hit)
    }
}

impl FrameStage for ClassificationStage<'_> {
    fn name(&self) -> &'static str {
        "classification"
    }

    fn process(&self, record: &mut FrameRecord, _image: &DynamicImage) -> Result<(), StageError> {
        let Some(embedding) = record.embedding.clone() else {
            return Ok(());
        };
        let embedding = embedding.as_slice();

        record.scene_type = Some(self.classify_scene(embedding)?);

        record.people_type = self.refine(
            embedding,
            "This image contains people or a person.",
            "There are no people in this image.",
            PeopleType::ALL,
            &PeopleType::prompts(),
        )?;

        record.animal_type = self.refine(
            embedding,
            "This photo shows an animal or a pet, such as a cat, dog, guinea pig, \
             rabbit, hamster, rat, chicken, or bird.",
            "There is no pet or animal here.",
            AnimalType::ALL,
            &AnimalType::prompts(),
        )?;

        record.document_type = self.refine(
            embedding,
            "This is a document, such as a receipt, book, ID card, passport, \
             payment method, screenshot, event ticket, menu, recipe, or notes.",
            "This is not a document.",
            DocumentType::ALL,
            &DocumentType::prompts(),
        )?;

        record.object_type = self.refine(
            embedding,
            "This is object-focused photo, such as food, a vehicle, artwork, a \
             device, a piece of clothing, a drink, sports equipment, or a toy.",
            "The focus is not an object.",
            ObjectType::ALL,
            &ObjectType::prompts(),
        )?;

        record.activity_type = self.refine(
            embedding,
            "An activity is performed in this image, such as sports, fitness, \
             dancing, photography, writing, leisure activities, traveling, \
             camping or water activities.",
            "No activity is actively performed in this image.",
            ActivityType::ALL,
            &ActivityType::prompts(),
        )?;

        record.event_type = self.refine(
            embedding,
            "An event is taking place in this image, such as a wedding, birthday, \
             other celebration, party, concert, work conference, meeting, funeral, \
             christmas, halloween, new years, a sports game, competition, marathon, \
             protest, parade, carnival, trip or picnic.",
            "No specific event or celebration is happening.",
            EventType::ALL,
            &EventType::prompts(),
        )?;

        let is_outside = self.binary(embedding, "This is outside.", "This is inside.")?;
        record.is_outside = Some(is_outside);
        record.is_landscape = Some(self.binary(
            embedding,
            "This is a landscape featuring natural scenery such as mountains, \
             dunes, forests, or lakes.",
            "This is not a landscape or does not feature natural scenery.",
        )?);
        record.is_cityscape = Some(self.binary(
            embedding,
            "This is a cityscape showing urban buildings, streets, or skylines.",
            "This is not a cityscape or does not feature urban areas.",
        )?);
        record.is_travel = Some(self.binary(
            embedding,
            "This photo was taken during travel, featuring landmarks, airports, \
             campsites, or exotic locations.",
            "This photo was not taken during travel or does not suggest a travel \
             context.",
        )?);

        // Weather can only be read off the sky.
        record.weather_condition = if is_outside {
            self.refine(
                embedding,
                "The type of weather can be clearly determined from this photo.",
                "The weather conditions in this photo can not be determined.",
                WeatherCondition::ALL,
                &WeatherCondition::prompts(),
            )?
        } else {
            None
        };

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::test_support::MockClassifier;

    fn frame_with_embedding() -> FrameRecord {
        let mut record = FrameRecord::new(0);
        record.embedding = Some(vec![0.1; 8]);
        record
    }

    fn blank() -> DynamicImage {
        DynamicImage::new_rgb8(4, 4)
    }

    #[test]
    fn test_negative_gates_leave_fields_null() {
        let classifier = MockClassifier {
            binary_answer: false,
            confidence: 0.5,
        };
        let stage = ClassificationStage::new(&classifier, 0.003);
        let mut record = frame_with_embedding();

        stage.process(&mut record, &blank()).unwrap();
        assert!(record.people_type.is_none());
        assert!(record.animal_type.is_none());
        assert!(record.event_type.is_none());
        assert!(record.weather_condition.is_none());
        assert_eq!(record.is_outside, Some(false));
        assert_eq!(record.scene_type, Some(SceneType::Beach));
    }

    #[test]
    fn test_positive_gates_fill_refinements() {
        let classifier = MockClassifier {
            binary_answer: true,
            confidence: 0.5,
        };
        let stage = ClassificationStage::new(&classifier, 0.003);
        let mut record = frame_with_embedding();

        stage.process(&mut record, &blank()).unwrap();
        // mock classifier always picks index 0
        assert_eq!(record.people_type, Some(PeopleType::Selfie));
        assert_eq!(record.animal_type, Some(AnimalType::Cat));
        assert_eq!(record.weather_condition, Some(WeatherCondition::Clear));
        assert_eq!(record.is_outside, Some(true));
    }

    #[test]
    fn test_low_scene_confidence_falls_back_to_unknown() {
        let classifier = MockClassifier {
            binary_answer: false,
            confidence: 0.001,
        };
        let stage = ClassificationStage::new(&classifier, 0.003);
        let mut record = frame_with_embedding();

        stage.process(&mut record, &blank()).unwrap();
        assert_eq!(record.scene_type, Some(SceneType::Unknown));
    }

    #[test]
    fn test_missing_embedding_is_noop() {
        let classifier = MockClassifier {
            binary_answer: true,
            confidence: 0.5,
        };
        let stage = ClassificationStage::new(&classifier, 0.003);
        let mut record = FrameRecord::new(0);

        stage.process(&mut record, &blank()).unwrap();
        assert!(record.scene_type.is_none());
    }
}

use ab_glyph::FontVec;

use crate::classification::domain::face_classifier::FaceClassifier;
use crate::effects::domain::region_effect::RegionEffect;

use super::annotator::Annotator;
use super::anonymizer::Anonymizer;

/// Which effect a run applies, fixed for the whole run.
pub enum EffectKind {
    Anonymize {
        blur_level: i64,
    },
    Annotate {
        classifier: Box<dyn FaceClassifier>,
        font: FontVec,
    },
}

impl EffectKind {
    pub fn name(&self) -> &'static str {
        match self {
            EffectKind::Anonymize { .. } => "anonymize",
            EffectKind::Annotate { .. } => "annotate",
        }
    }
}

pub fn create_effect(kind: EffectKind) -> Box<dyn RegionEffect> {
    log::info!("Using {} effect", kind.name());
    match kind {
        EffectKind::Anonymize { blur_level } => Box::new(Anonymizer::new(blur_level)),
        EffectKind::Annotate { classifier, font } => Box::new(Annotator::new(classifier, font)),
    }
}

pub mod annotator;
pub mod anonymizer;
pub mod effect_factory;
pub mod gaussian;

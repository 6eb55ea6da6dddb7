pub mod face_classifier;
pub mod hair_heuristic;

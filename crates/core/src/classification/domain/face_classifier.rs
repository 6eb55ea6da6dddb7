use std::fmt;

use crate::shared::frame::Frame;

/// Coarse age ranges, in the order a classifier emits its scores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AgeBucket {
    Infant,
    Toddler,
    Child,
    Teen,
    YoungAdult,
    Adult,
    MiddleAged,
    Senior,
}

impl AgeBucket {
    pub const ALL: [AgeBucket; 8] = [
        AgeBucket::Infant,
        AgeBucket::Toddler,
        AgeBucket::Child,
        AgeBucket::Teen,
        AgeBucket::YoungAdult,
        AgeBucket::Adult,
        AgeBucket::MiddleAged,
        AgeBucket::Senior,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AgeBucket::Infant => "0-2",
            AgeBucket::Toddler => "4-6",
            AgeBucket::Child => "8-12",
            AgeBucket::Teen => "15-20",
            AgeBucket::YoungAdult => "25-32",
            AgeBucket::Adult => "38-43",
            AgeBucket::MiddleAged => "48-53",
            AgeBucket::Senior => "60+",
        }
    }

    /// Picks the bucket with the highest score. Returns `None` when the
    /// score vector does not have one entry per bucket.
    pub fn from_scores(scores: &[f32]) -> Option<Self> {
        if scores.len() != Self::ALL.len() {
            return None;
        }
        argmax(scores).map(|i| Self::ALL[i])
    }
}

impl fmt::Display for AgeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Output order of the Levi-Hassner `gender_net` export: index 0 is
    /// male, index 1 female. A model trained with the opposite order needs
    /// this swapped.
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    pub fn label(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }

    pub fn from_scores(scores: &[f32]) -> Option<Self> {
        if scores.len() != Self::ALL.len() {
            return None;
        }
        argmax(scores).map(|i| Self::ALL[i])
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Brightness-based hair guess. Not a hair color model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HairGuess {
    Dark,
    Light,
}

impl HairGuess {
    pub fn label(self) -> &'static str {
        match self {
            HairGuess::Dark => "dark",
            HairGuess::Light => "light",
        }
    }
}

impl fmt::Display for HairGuess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceAttributes {
    pub age: AgeBucket,
    pub gender: Gender,
    pub hair: Option<HairGuess>,
}

/// Infers attributes from a face crop.
///
/// The crop is in the frame's channel order (BGR when it comes from the
/// pipeline). Implementations hold inference sessions and are reused for
/// every face of a run.
pub trait FaceClassifier: Send {
    fn classify(&mut self, crop: &Frame) -> Result<FaceAttributes, Box<dyn std::error::Error>>;
}

/// Index of the largest score; the first one wins on ties. NaN never wins.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &s) in scores.iter().enumerate() {
        if s.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if s <= b => {}
            _ => best = Some((i, s)),
        }
    }
    best.map(|(i, _)| i)
}

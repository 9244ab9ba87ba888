//! Participant-to-image mapping structures.

use super::AnchorRecord;
use crate::error::{Error, Warning};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Semantic role of an image-bearing survey question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageRole {
    FacePhoto,
    SkinBrightness,
    HairType,
    EyeColor,
    /// Anchored in a column outside the role table
    Unknown,
}

impl ImageRole {
    /// Roles that come from a known question column.
    pub const KNOWN: [ImageRole; 4] = [
        ImageRole::FacePhoto,
        ImageRole::SkinBrightness,
        ImageRole::HairType,
        ImageRole::EyeColor,
    ];

    /// Snake-case name used in JSON keys and exported filenames.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageRole::FacePhoto => "face_photo",
            ImageRole::SkinBrightness => "skin_brightness",
            ImageRole::HairType => "hair_type",
            ImageRole::EyeColor => "eye_color",
            ImageRole::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "face_photo" | "face" => Ok(ImageRole::FacePhoto),
            "skin_brightness" | "skin" => Ok(ImageRole::SkinBrightness),
            "hair_type" | "hair" => Ok(ImageRole::HairType),
            "eye_color" | "eye" => Ok(ImageRole::EyeColor),
            "unknown" => Ok(ImageRole::Unknown),
            other => Err(Error::Config(format!("unknown image role '{}'", other))),
        }
    }
}

/// How an association was established.
///
/// Ordered weakest first, so `min` over a participant's images yields the
/// tier a caller should trust the whole entry at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Guessed from pixel area and row order
    Heuristic,
    /// Read from drawing anchor metadata
    Anchored,
}

/// Which algorithm produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Anchored,
    Heuristic,
}

/// One image associated with a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedImage {
    /// Media store filename
    pub file: String,

    /// Confidence tier
    pub confidence: Confidence,

    /// Renamed copy written to the output directory, if any
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub exported_as: Option<String>,
}

impl ResolvedImage {
    /// An image read from anchor metadata.
    pub fn anchored(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            confidence: Confidence::Anchored,
            exported_as: None,
        }
    }

    /// An image guessed by the size heuristic.
    pub fn heuristic(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            confidence: Confidence::Heuristic,
            exported_as: None,
        }
    }
}

/// The images resolved for one survey row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantImageMapping {
    /// Display name
    pub name: Option<String>,

    /// 1-based worksheet row
    pub physical_row: u32,

    /// Weakest tier among `images`, `None` when there are none
    pub confidence: Option<Confidence>,

    /// Images keyed by role
    #[serde(default)]
    pub images: BTreeMap<ImageRole, ResolvedImage>,
}

impl ParticipantImageMapping {
    /// An empty mapping for a row.
    pub fn new(name: Option<String>, physical_row: u32) -> Self {
        Self {
            name,
            physical_row,
            confidence: None,
            images: BTreeMap::new(),
        }
    }

    /// Record an image for a role, returning whatever it replaced.
    pub fn assign(&mut self, role: ImageRole, image: ResolvedImage) -> Option<ResolvedImage> {
        let previous = self.images.insert(role, image);
        self.confidence = self.images.values().map(|i| i.confidence).min();
        previous
    }

    /// Image for a role.
    pub fn get(&self, role: ImageRole) -> Option<&ResolvedImage> {
        self.images.get(&role)
    }

    /// Check if no image was resolved.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Counts describing a resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub participants: usize,
    pub participants_with_images: usize,
    pub face_photo: usize,
    pub skin_brightness: usize,
    pub hair_type: usize,
    pub eye_color: usize,
    pub unknown: usize,
    pub anchors: usize,
    pub unmatched_anchors: usize,
    pub media_files: usize,
    /// Media files written to the output directory
    #[serde(default)]
    pub exported_media: usize,
}

impl Statistics {
    /// Count the participants holding an image for `role`.
    pub fn with_role(&self, role: ImageRole) -> usize {
        match role {
            ImageRole::FacePhoto => self.face_photo,
            ImageRole::SkinBrightness => self.skin_brightness,
            ImageRole::HairType => self.hair_type,
            ImageRole::EyeColor => self.eye_color,
            ImageRole::Unknown => self.unknown,
        }
    }
}

/// The result of one resolution pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    /// Algorithm that produced the mapping
    pub strategy: Strategy,

    /// Mapping per participant identifier
    pub participants: BTreeMap<String, ParticipantImageMapping>,

    /// Anchors whose row holds no participant
    #[serde(default)]
    pub unmatched: Vec<AnchorRecord>,

    /// Summary counts
    pub statistics: Statistics,

    /// Recoverable problems, in the order they were met
    #[serde(default)]
    pub warnings: Vec<Warning>,
}

impl Resolution {
    /// Recompute `statistics` from the current contents.
    pub fn refresh_statistics(&mut self, anchors: usize, media_files: usize) {
        let count = |role: ImageRole| {
            self.participants
                .values()
                .filter(|p| p.images.contains_key(&role))
                .count()
        };
        self.statistics = Statistics {
            participants: self.participants.len(),
            participants_with_images: self.participants.values().filter(|p| !p.is_empty()).count(),
            face_photo: count(ImageRole::FacePhoto),
            skin_brightness: count(ImageRole::SkinBrightness),
            hair_type: count(ImageRole::HairType),
            eye_color: count(ImageRole::EyeColor),
            unknown: count(ImageRole::Unknown),
            anchors,
            unmatched_anchors: self.unmatched.len(),
            media_files,
            exported_media: self.statistics.exported_media,
        };
    }

    /// Mapping for a participant.
    pub fn participant(&self, id: &str) -> Option<&ParticipantImageMapping> {
        self.participants.get(id)
    }
}

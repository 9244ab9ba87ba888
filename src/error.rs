//! Error types for the surveypix library.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias for surveypix operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a resolution pass.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input is not a readable zip-based spreadsheet.
    #[error("Archive unreadable: {0}")]
    ArchiveUnreadable(String),

    /// Error parsing XML content.
    #[error("XML parse error: {0}")]
    XmlParse(String),

    /// Invalid or malformed data in the workbook.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A required archive part is missing.
    #[error("Missing component: {0}")]
    MissingComponent(String),

    /// An image could not be decoded.
    #[error("Image decode error: {0}")]
    ImageDecode(String),

    /// Error writing or reading JSON.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid resolver configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::ArchiveUnreadable(err.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::XmlParse(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageDecode(err.to_string())
    }
}

/// A recoverable problem met during resolution.
///
/// Warnings never stop the pass; they are logged and carried in the
/// resulting document so callers can see what was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A drawing or its relationship part was malformed; its anchors were skipped.
    DrawingParse { part: String, message: String },
    /// A media entry could not be decoded and was left out of size classification.
    ImageDecode { file: String, message: String },
    /// A media entry could not be read from the archive and was not exported.
    MediaUnreadable { file: String, message: String },
    /// An anchor referenced a relationship id with no media target.
    UnresolvedReference { part: String, rel_id: String },
    /// Two worksheet rows carried the same participant identifier.
    DuplicateParticipant { id: String, physical_row: u32 },
    /// A later anchor replaced an earlier one for the same participant and role.
    ReplacedAnchor {
        id: String,
        role: String,
        previous: String,
        current: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::DrawingParse { part, message } => {
                write!(f, "skipped drawing {}: {}", part, message)
            }
            Warning::ImageDecode { file, message } => {
                write!(f, "could not decode {}: {}", file, message)
            }
            Warning::MediaUnreadable { file, message } => {
                write!(f, "could not read {}: {}", file, message)
            }
            Warning::UnresolvedReference { part, rel_id } => {
                write!(f, "{} references {} with no media target", part, rel_id)
            }
            Warning::DuplicateParticipant { id, physical_row } => {
                write!(f, "participant {} repeated at row {}", id, physical_row)
            }
            Warning::ReplacedAnchor {
                id,
                role,
                previous,
                current,
            } => write!(
                f,
                "{} {}: {} replaced by later anchor {}",
                id, role, previous, current
            ),
        }
    }
}

//! Media asset model structures.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Cursor;

/// One binary image taken from the archive's media store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAsset {
    /// Filename within the media store (e.g. "image3.png")
    pub filename: String,

    /// Full archive path (e.g. "xl/media/image3.png")
    pub path: String,

    /// Binary data
    #[serde(skip)]
    pub data: Vec<u8>,

    /// Size in bytes
    pub size: usize,

    /// Width in pixels, once decoded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    /// Height in pixels, once decoded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    /// Hex SHA-256 of the content
    pub digest: String,
}

impl ImageAsset {
    /// Wrap the bytes of a media part.
    pub fn new(path: impl Into<String>, data: Vec<u8>) -> Self {
        let path = path.into();
        let filename = path.rsplit('/').next().unwrap_or(&path).to_string();
        let digest = hex::encode(Sha256::digest(&data));
        Self {
            filename,
            path,
            size: data.len(),
            data,
            width: None,
            height: None,
            digest,
        }
    }

    /// Decode the pixel dimensions from the image header.
    ///
    /// Only the header is read; the pixel data is never decompressed.
    pub fn decode_dimensions(&mut self) -> Result<(u32, u32)> {
        let reader =
            image::ImageReader::new(Cursor::new(self.data.as_slice())).with_guessed_format()?;
        let (width, height) = reader.into_dimensions()?;
        self.width = Some(width);
        self.height = Some(height);
        Ok((width, height))
    }

    /// Pixel area, once dimensions are known.
    pub fn area(&self) -> Option<u64> {
        Some(self.width? as u64 * self.height? as u64)
    }

    /// Lowercase file extension, "png" when the name has none.
    pub fn extension(&self) -> String {
        match self.filename.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => ext.to_lowercase(),
            _ => "png".to_string(),
        }
    }
}

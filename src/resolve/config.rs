//! Resolver configuration.

use crate::error::{Error, Result};
use crate::model::ImageRole;
use crate::xlsx::{column_index, column_letter, RowLayout};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Maps worksheet columns to the image role their pictures carry.
///
/// Serialized as a map from column letters to role names:
/// `{"AB": "face_photo", "V": "skin_brightness"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, ImageRole>",
    into = "BTreeMap<String, ImageRole>"
)]
pub struct ColumnRoleTable {
    entries: BTreeMap<u32, ImageRole>,
}

impl ColumnRoleTable {
    /// A table with no columns; every anchor resolves to `unknown`.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Assign a role to a 0-based column.
    pub fn set(&mut self, col: u32, role: ImageRole) {
        self.entries.insert(col, role);
    }

    /// Role for a 0-based column; columns outside the table are `unknown`.
    pub fn role_for(&self, col: u32) -> ImageRole {
        self.entries.get(&col).copied().unwrap_or(ImageRole::Unknown)
    }

    /// Column assigned to a role, if any.
    pub fn column_for(&self, role: ImageRole) -> Option<u32> {
        self.entries
            .iter()
            .find(|(_, r)| **r == role)
            .map(|(col, _)| *col)
    }

    /// Parse an assignment such as `AB=face_photo` and apply it.
    pub fn apply_assignment(&mut self, assignment: &str) -> Result<()> {
        let (letters, role) = assignment.split_once('=').ok_or_else(|| {
            Error::Config(format!("expected COLUMN=ROLE, got '{}'", assignment))
        })?;
        let col = column_index(letters)
            .ok_or_else(|| Error::Config(format!("invalid column '{}'", letters.trim())))?;
        self.set(col, role.parse()?);
        Ok(())
    }

    /// Entries as (0-based column, role), in column order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, ImageRole)> + '_ {
        self.entries.iter().map(|(col, role)| (*col, *role))
    }
}

impl Default for ColumnRoleTable {
    /// The survey export layout: V skin, AB face, AM hair, AO eye.
    fn default() -> Self {
        let mut table = Self::empty();
        table.set(21, ImageRole::SkinBrightness);
        table.set(27, ImageRole::FacePhoto);
        table.set(38, ImageRole::HairType);
        table.set(40, ImageRole::EyeColor);
        table
    }
}

impl TryFrom<BTreeMap<String, ImageRole>> for ColumnRoleTable {
    type Error = Error;

    fn try_from(map: BTreeMap<String, ImageRole>) -> Result<Self> {
        let mut table = Self::empty();
        for (letters, role) in map {
            let col = column_index(&letters)
                .ok_or_else(|| Error::Config(format!("invalid column '{}'", letters)))?;
            table.set(col, role);
        }
        Ok(table)
    }
}

impl From<ColumnRoleTable> for BTreeMap<String, ImageRole> {
    fn from(table: ColumnRoleTable) -> Self {
        table
            .entries
            .into_iter()
            .map(|(col, role)| (column_letter(col), role))
            .collect()
    }
}

/// Sizes of the reference-swatch groups used by the size heuristic.
///
/// The pool left after face photos are taken is split smallest-first into
/// these groups, in field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferencePools {
    pub skin_brightness: usize,
    pub hair_type: usize,
    pub eye_color: usize,
}

impl Default for ReferencePools {
    fn default() -> Self {
        Self {
            skin_brightness: 7,
            hair_type: 10,
            eye_color: 7,
        }
    }
}

impl ReferencePools {
    /// Groups in pool order.
    pub fn groups(&self) -> [(ImageRole, usize); 3] {
        [
            (ImageRole::SkinBrightness, self.skin_brightness),
            (ImageRole::HairType, self.hair_type),
            (ImageRole::EyeColor, self.eye_color),
        ]
    }
}

fn default_answer_columns() -> BTreeMap<ImageRole, String> {
    BTreeMap::from([
        (ImageRole::SkinBrightness, "밝기판정".to_string()),
        (
            ImageRole::HairType,
            "What is your Natural-born hair(not styled)?[Please select from the 10 options below]"
                .to_string(),
        ),
        (
            ImageRole::EyeColor,
            "Which of the following options most matches your natural eye color?".to_string(),
        ),
    ])
}

/// Everything a resolution pass needs to know.
///
/// # Example
///
/// ```
/// use surveypix::model::ImageRole;
/// use surveypix::resolve::ResolverConfig;
///
/// let config = ResolverConfig::new("survey.xlsx")
///     .with_output_dir("participant_images")
///     .with_rename(true)
///     .with_column(27, ImageRole::FacePhoto);
/// assert!(config.rename);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Spreadsheet archive to read
    pub archive: Option<PathBuf>,

    /// Directory receiving extracted media; nothing is written when unset
    pub output_dir: Option<PathBuf>,

    /// Also write `{participant_id}_{role}.{ext}` copies of resolved images
    pub rename: bool,

    /// Identifier, name and header positions in the sheet
    pub layout: RowLayout,

    /// Column to role table for anchored images
    pub columns: ColumnRoleTable,

    /// Header of the answer each heuristic swatch is looked up by
    pub answer_columns: BTreeMap<ImageRole, String>,

    /// Reference-swatch group sizes for the size heuristic
    pub pools: ReferencePools,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            archive: None,
            output_dir: None,
            rename: false,
            layout: RowLayout::default(),
            columns: ColumnRoleTable::default(),
            answer_columns: default_answer_columns(),
            pools: ReferencePools::default(),
        }
    }
}

impl ResolverConfig {
    /// Create a configuration for an archive with default settings.
    pub fn new(archive: impl Into<PathBuf>) -> Self {
        Self {
            archive: Some(archive.into()),
            ..Default::default()
        }
    }

    /// Load a configuration from a JSON file; missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Set the archive path.
    pub fn with_archive(mut self, archive: impl Into<PathBuf>) -> Self {
        self.archive = Some(archive.into());
        self
    }

    /// Set the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Enable or disable renamed copies.
    pub fn with_rename(mut self, rename: bool) -> Self {
        self.rename = rename;
        self
    }

    /// Set the identifier column header.
    pub fn with_id_column(mut self, header: impl Into<String>) -> Self {
        self.layout.id_column = header.into();
        self
    }

    /// Set the name column header.
    pub fn with_name_column(mut self, header: impl Into<String>) -> Self {
        self.layout.name_column = Some(header.into());
        self
    }

    /// Assign a role to a 0-based column.
    pub fn with_column(mut self, col: u32, role: ImageRole) -> Self {
        self.columns.set(col, role);
        self
    }

    /// Set the answer header a heuristic role is looked up by.
    pub fn with_answer_column(mut self, role: ImageRole, header: impl Into<String>) -> Self {
        self.answer_columns.insert(role, header.into());
        self
    }

    /// Set the reference-swatch group sizes.
    pub fn with_pools(mut self, pools: ReferencePools) -> Self {
        self.pools = pools;
        self
    }

    /// The archive path, or a configuration error when none is set.
    pub fn archive_path(&self) -> Result<&Path> {
        self.archive
            .as_deref()
            .ok_or_else(|| Error::Config("no archive path configured".to_string()))
    }
}

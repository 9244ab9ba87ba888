//! # surveypix
//!
//! Recover which embedded image belongs to which survey participant in an
//! exported `.xlsx` workbook.
//!
//! Survey tools export picture answers as images floating over the sheet.
//! The workbook keeps them in a flat media store, and the only link back to
//! a respondent is the drawing anchor that places each picture over a cell.
//! This library reads those anchors, joins them to worksheet rows, and
//! falls back to a size heuristic (clearly marked as such) when an archive
//! carries no anchors at all.
//!
//! ## Quick Start
//!
//! ```no_run
//! use surveypix::render::{to_json, JsonFormat};
//! use surveypix::resolve::ResolverConfig;
//!
//! let config = ResolverConfig::new("survey.xlsx")
//!     .with_output_dir("participant_images")
//!     .with_rename(true);
//!
//! let resolution = surveypix::resolve_file(&config)?;
//! for (id, mapping) in &resolution.participants {
//!     println!("{}: {} images", id, mapping.images.len());
//! }
//! std::fs::write("mapping.json", to_json(&resolution, JsonFormat::Pretty)?)?;
//! # Ok::<(), surveypix::Error>(())
//! ```
//!
//! ## Diagnostics
//!
//! ```no_run
//! let scan = surveypix::list_anchors("survey.xlsx")?;
//! for anchor in &scan.anchors {
//!     println!("{} -> {}", anchor.cell_ref(), anchor.file);
//! }
//!
//! let media = surveypix::list_media("survey.xlsx")?;
//! println!("{} shared swatches", media.duplicated().count());
//! # Ok::<(), surveypix::Error>(())
//! ```

pub mod container;
pub mod error;
pub mod model;
pub mod render;
pub mod resolve;
pub mod xlsx;

// Re-exports
pub use container::{Relationship, Relationships, SpreadsheetArchive};
pub use error::{Error, Result, Warning};
pub use model::{
    AnchorKind, AnchorRecord, CellValue, Confidence, ImageAsset, ImageRole,
    ParticipantImageMapping, Resolution, ResolvedImage, Statistics, Strategy, SurveyRow,
};
pub use resolve::{
    AnchorScan, ColumnRoleTable, MediaSurvey, ReferencePools, Resolver, ResolverConfig,
};

use std::path::Path;
use tracing::info;

/// Resolve the archive named in a configuration.
///
/// Opens the archive, reads the survey rows from its first worksheet,
/// resolves images, and writes media to the output directory when one is
/// configured.
///
/// # Example
///
/// ```no_run
/// use surveypix::{resolve_file, ResolverConfig};
///
/// let resolution = resolve_file(&ResolverConfig::new("survey.xlsx"))?;
/// println!("{} participants", resolution.statistics.participants);
/// # Ok::<(), surveypix::Error>(())
/// ```
pub fn resolve_file(config: &ResolverConfig) -> Result<Resolution> {
    let path = config.archive_path()?;
    let archive = SpreadsheetArchive::open(path)?;
    let reader = xlsx::SurveySheetReader::open(&archive)?;
    let rows = reader.read_rows(&config.layout)?;
    info!(
        archive = %path.display(),
        sheet = reader.sheet_name().unwrap_or(reader.sheet_path()),
        rows = rows.len(),
        "read survey rows"
    );

    let resolver = Resolver::new(config.clone());
    let mut resolution = resolver.resolve(&archive, &rows);
    resolver.export(&archive, &mut resolution)?;
    Ok(resolution)
}

/// List every drawing anchor in an archive.
pub fn list_anchors(path: impl AsRef<Path>) -> Result<AnchorScan> {
    let archive = SpreadsheetArchive::open(path)?;
    Ok(resolve::scan_anchors(&archive))
}

/// Decode and rank every media entry in an archive.
pub fn list_media(path: impl AsRef<Path>) -> Result<MediaSurvey> {
    let archive = SpreadsheetArchive::open(path)?;
    Ok(resolve::survey_media(&archive))
}

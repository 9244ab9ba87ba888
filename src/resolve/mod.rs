//! Image anchor resolution.
//!
//! A [`Resolver`] maps every survey row to the images that belong to it.
//! When the archive's drawings carry cell anchors, those are used and every
//! result is `anchored`. Only when no anchor at all can be recovered does the
//! resolver fall back to ranking media by pixel area, and then every result
//! is `heuristic`.
//!
//! # Example
//!
//! ```no_run
//! use surveypix::container::SpreadsheetArchive;
//! use surveypix::resolve::{Resolver, ResolverConfig};
//! use surveypix::xlsx::SurveySheetReader;
//!
//! let config = ResolverConfig::new("survey.xlsx");
//! let archive = SpreadsheetArchive::open(config.archive_path()?)?;
//! let rows = SurveySheetReader::open(&archive)?.read_rows(&config.layout)?;
//!
//! let resolution = Resolver::new(config).resolve(&archive, &rows);
//! println!("{:?} strategy", resolution.strategy);
//! # Ok::<(), surveypix::Error>(())
//! ```

mod anchored;
mod config;
mod export;
mod heuristic;

pub use anchored::{scan_anchors, AnchorScan};
pub use config::{ColumnRoleTable, ReferencePools, ResolverConfig};
pub use export::{export_media, export_renamed};
pub use heuristic::{
    decode_all, load_media, rank_by_area, split_candidates, survey_media, swatch_index,
    MediaEntry, MediaSurvey,
};

use std::collections::{BTreeMap, HashSet};

use crate::container::SpreadsheetArchive;
use crate::error::{Result, Warning};
use crate::model::{ParticipantImageMapping, Resolution, Strategy, SurveyRow};
use tracing::{info, warn};

/// Resolves survey rows to images for one configuration.
#[derive(Debug, Clone)]
pub struct Resolver {
    config: ResolverConfig,
}

impl Resolver {
    /// Create a resolver.
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Map every row to its images without touching the filesystem.
    ///
    /// This never fails: unreadable drawings and undecodable images become
    /// warnings, and rows without images keep an empty mapping. A row whose
    /// identifier repeats an earlier row is skipped with a warning.
    pub fn resolve(&self, archive: &SpreadsheetArchive, rows: &[SurveyRow]) -> Resolution {
        let mut warnings = Vec::new();
        let rows = unique_rows(rows, &mut warnings);

        let mut participants: BTreeMap<String, ParticipantImageMapping> = rows
            .iter()
            .map(|row| {
                (
                    row.id.clone(),
                    ParticipantImageMapping::new(row.name.clone(), row.physical_row),
                )
            })
            .collect();

        let scan = scan_anchors(archive);
        warnings.extend(scan.warnings);
        let media_files = archive.media_files().len();

        let (strategy, unmatched) = if scan.anchors.is_empty() {
            info!(
                media = media_files,
                "no drawing anchors found, falling back to size heuristic"
            );
            let mut assets = load_media(archive, &mut warnings);
            decode_all(&mut assets, &mut warnings);
            heuristic::assign_heuristic(&rows, &assets, &self.config, &mut participants);
            (Strategy::Heuristic, Vec::new())
        } else {
            info!(anchors = scan.anchors.len(), "resolving from drawing anchors");
            let unmatched = anchored::assign_anchored(
                &rows,
                &scan.anchors,
                &self.config.columns,
                &mut participants,
                &mut warnings,
            );
            (Strategy::Anchored, unmatched)
        };

        for warning in &warnings {
            warn!("{}", warning);
        }

        let mut resolution = Resolution {
            strategy,
            participants,
            unmatched,
            statistics: Default::default(),
            warnings,
        };
        resolution.refresh_statistics(scan.anchors.len(), media_files);
        resolution
    }

    /// Write media (and renamed copies when enabled) to the output directory.
    ///
    /// Returns the number of media files written, also recorded as
    /// `statistics.exported_media`. Entries that cannot be read are skipped
    /// and reported in the resolution's warnings. Does nothing when no
    /// output directory is configured.
    pub fn export(
        &self,
        archive: &SpreadsheetArchive,
        resolution: &mut Resolution,
    ) -> Result<usize> {
        let Some(dir) = self.config.output_dir.as_deref() else {
            return Ok(0);
        };
        let mut warnings = Vec::new();
        let assets = load_media(archive, &mut warnings);
        for warning in &warnings {
            warn!("{}", warning);
        }
        resolution.warnings.extend(warnings);

        let exported = export_media(&assets, dir)?;
        resolution.statistics.exported_media = exported;
        if self.config.rename {
            let copies = export_renamed(resolution, &assets, dir)?;
            info!(copies, dir = %dir.display(), "wrote renamed copies");
        }
        Ok(exported)
    }
}

/// Drop rows whose identifier was already seen, keeping the first.
fn unique_rows(rows: &[SurveyRow], warnings: &mut Vec<Warning>) -> Vec<SurveyRow> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(rows.len());
    for row in rows {
        if seen.insert(row.id.as_str()) {
            unique.push(row.clone());
        } else {
            warnings.push(Warning::DuplicateParticipant {
                id: row.id.clone(),
                physical_row: row.physical_row,
            });
        }
    }
    unique
}

//! Anchored resolution: drawing anchors joined to worksheet rows.

use std::collections::{BTreeMap, HashMap};

use crate::container::{SpreadsheetArchive, MEDIA_PREFIX};
use crate::error::{Result, Warning};
use crate::model::{AnchorRecord, ParticipantImageMapping, ResolvedImage, SurveyRow};
use crate::xlsx::parse_drawing;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::ColumnRoleTable;

/// Every anchor recovered from an archive's drawings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorScan {
    /// Anchors in drawing order, then document order
    pub anchors: Vec<AnchorRecord>,
    /// Drawings or references that had to be skipped
    pub warnings: Vec<Warning>,
}

/// Read the anchors of every drawing part in the archive.
///
/// A drawing whose XML or relationships cannot be parsed contributes no
/// anchors and a [`Warning::DrawingParse`]; the scan continues with the
/// next drawing.
pub fn scan_anchors(archive: &SpreadsheetArchive) -> AnchorScan {
    let mut scan = AnchorScan::default();

    for part in archive.drawing_parts() {
        match read_drawing(archive, &part) {
            Ok((anchors, warnings)) => {
                debug!(drawing = %part, anchors = anchors.len(), "parsed drawing");
                scan.anchors.extend(anchors);
                scan.warnings.extend(warnings);
            }
            Err(e) => scan.warnings.push(Warning::DrawingParse {
                part,
                message: e.to_string(),
            }),
        }
    }

    scan
}

fn read_drawing(
    archive: &SpreadsheetArchive,
    part: &str,
) -> Result<(Vec<AnchorRecord>, Vec<Warning>)> {
    let media = archive.read_relationships(part)?.media_targets(part);
    let drawing = parse_drawing(&archive.read_xml(part)?)?;

    let mut anchors = Vec::new();
    let mut warnings = Vec::new();
    for anchor in drawing {
        for rel_id in anchor.rel_ids {
            let file = media
                .get(&rel_id)
                .filter(|file| archive.exists(&format!("{}{}", MEDIA_PREFIX, file)));
            match file {
                Some(file) => anchors.push(AnchorRecord {
                    row: anchor.row,
                    col: anchor.col,
                    rel_id,
                    file: file.clone(),
                    drawing: part.to_string(),
                    kind: anchor.kind,
                }),
                None => warnings.push(Warning::UnresolvedReference {
                    part: part.to_string(),
                    rel_id,
                }),
            }
        }
    }

    Ok((anchors, warnings))
}

/// Join anchors to participants by physical row and file them by column role.
///
/// Anchors on rows without a participant are returned. When two anchors
/// land on the same participant and role, the later one is kept.
pub(crate) fn assign_anchored(
    rows: &[SurveyRow],
    anchors: &[AnchorRecord],
    columns: &ColumnRoleTable,
    participants: &mut BTreeMap<String, ParticipantImageMapping>,
    warnings: &mut Vec<Warning>,
) -> Vec<AnchorRecord> {
    let by_row: HashMap<u32, &str> = rows
        .iter()
        .map(|row| (row.physical_row, row.id.as_str()))
        .collect();

    let mut unmatched = Vec::new();
    for anchor in anchors {
        let Some(id) = by_row.get(&anchor.row) else {
            unmatched.push(anchor.clone());
            continue;
        };
        let Some(mapping) = participants.get_mut(*id) else {
            unmatched.push(anchor.clone());
            continue;
        };

        let role = columns.role_for(anchor.col);
        if let Some(previous) = mapping.assign(role, ResolvedImage::anchored(&anchor.file)) {
            if previous.file != anchor.file {
                warnings.push(Warning::ReplacedAnchor {
                    id: id.to_string(),
                    role: role.to_string(),
                    previous: previous.file,
                    current: anchor.file.clone(),
                });
            }
        }
    }

    unmatched
}

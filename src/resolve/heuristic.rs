//! Size-based fallback for archives that carry no drawing anchors.
//!
//! Without anchors the only signal left is pixel area: participant face
//! photos are large, the shared reference swatches are small. Face photos are
//! handed out by rank in row order, which assumes the export kept participant
//! order. Nothing verifies that, so every result here is `heuristic`.

use std::collections::{BTreeMap, HashMap};

use crate::container::SpreadsheetArchive;
use crate::error::Warning;
use crate::model::{ImageAsset, ImageRole, ParticipantImageMapping, ResolvedImage, SurveyRow};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

use super::config::ResolverConfig;

/// Load every media entry; entries that cannot be read are reported and left out.
pub fn load_media(archive: &SpreadsheetArchive, warnings: &mut Vec<Warning>) -> Vec<ImageAsset> {
    let mut assets = Vec::new();
    for path in archive.media_files() {
        match archive.read_binary(&path) {
            Ok(data) => assets.push(ImageAsset::new(path, data)),
            Err(e) => warnings.push(Warning::MediaUnreadable {
                file: path,
                message: e.to_string(),
            }),
        }
    }
    assets
}

/// Decode dimensions of every asset, reporting the ones that fail.
pub fn decode_all(assets: &mut [ImageAsset], warnings: &mut Vec<Warning>) {
    for asset in assets.iter_mut() {
        if let Err(e) = asset.decode_dimensions() {
            warnings.push(Warning::ImageDecode {
                file: asset.filename.clone(),
                message: e.to_string(),
            });
        }
    }
}

/// Decoded assets, largest area first.
///
/// Ties are broken by filename so the ranking does not depend on the order
/// the archive listed its entries in.
pub fn rank_by_area(assets: &[ImageAsset]) -> Vec<&ImageAsset> {
    let mut ranked: Vec<&ImageAsset> = assets.iter().filter(|a| a.area().is_some()).collect();
    ranked.sort_by(|a, b| {
        b.area()
            .cmp(&a.area())
            .then_with(|| a.filename.cmp(&b.filename))
    });
    ranked
}

/// Split a ranking into face-photo candidates and the reference pool.
///
/// The top `participants` entries are candidates, in rank order. The rest
/// form the pool, smallest first (ties by filename).
pub fn split_candidates<'a>(
    ranked: &[&'a ImageAsset],
    participants: usize,
) -> (Vec<&'a ImageAsset>, Vec<&'a ImageAsset>) {
    let cut = participants.min(ranked.len());
    let faces = ranked[..cut].to_vec();
    let mut pool = ranked[cut..].to_vec();
    pool.sort_by(|a, b| {
        a.area()
            .cmp(&b.area())
            .then_with(|| a.filename.cmp(&b.filename))
    });
    (faces, pool)
}

/// Position in a swatch group selected by an answer.
///
/// An integer code `k` with `1 <= k <= group_len` selects `k - 1`. Any
/// other non-empty answer is NFC-normalized, lowercased and hashed into a
/// bucket, which keeps the lookup stable across runs.
pub fn swatch_index(answer: &str, group_len: usize) -> Option<usize> {
    let answer = answer.trim();
    if answer.is_empty() || group_len == 0 {
        return None;
    }
    if let Ok(code) = answer.parse::<usize>() {
        if (1..=group_len).contains(&code) {
            return Some(code - 1);
        }
    }

    let normalized: String = answer.nfc().collect::<String>().to_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    Some((u64::from_be_bytes(head) % group_len as u64) as usize)
}

/// Assign face photos and reference swatches by size rank.
pub(crate) fn assign_heuristic(
    rows: &[SurveyRow],
    assets: &[ImageAsset],
    config: &ResolverConfig,
    participants: &mut BTreeMap<String, ParticipantImageMapping>,
) {
    let ranked = rank_by_area(assets);
    let (faces, pool) = split_candidates(&ranked, rows.len());
    debug!(
        decoded = ranked.len(),
        faces = faces.len(),
        pool = pool.len(),
        "ranked media by area"
    );

    let mut ordered: Vec<&SurveyRow> = rows.iter().collect();
    ordered.sort_by_key(|row| row.physical_row);

    for (row, face) in ordered.iter().zip(faces.iter()) {
        if let Some(mapping) = participants.get_mut(&row.id) {
            mapping.assign(ImageRole::FacePhoto, ResolvedImage::heuristic(&face.filename));
        }
    }

    let mut start = 0;
    for (role, size) in config.pools.groups() {
        let end = (start + size).min(pool.len());
        let group = &pool[start.min(end)..end];
        start += size;
        if group.is_empty() {
            continue;
        }
        let Some(header) = config.answer_columns.get(&role) else {
            continue;
        };

        for row in &ordered {
            let Some(answer) = row.answer(header).and_then(|v| v.as_text()) else {
                continue;
            };
            // bucket against the configured size, not the truncated group
            let Some(idx) = swatch_index(&answer, size) else {
                continue;
            };
            if let (Some(swatch), Some(mapping)) = (group.get(idx), participants.get_mut(&row.id)) {
                mapping.assign(role, ResolvedImage::heuristic(&swatch.filename));
            }
        }
    }
}

/// One media entry as seen by the size classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaEntry {
    pub filename: String,
    pub size: usize,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub area: Option<u64>,
    pub digest: String,
    /// How many media entries share this exact content
    pub copies: usize,
}

/// Every media entry with its dimensions, largest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSurvey {
    pub entries: Vec<MediaEntry>,
    pub warnings: Vec<Warning>,
}

impl MediaSurvey {
    /// Entries whose content appears more than once; shared swatches
    /// usually do.
    pub fn duplicated(&self) -> impl Iterator<Item = &MediaEntry> {
        self.entries.iter().filter(|e| e.copies > 1)
    }
}

/// Decode and rank every media entry in the archive.
pub fn survey_media(archive: &SpreadsheetArchive) -> MediaSurvey {
    let mut warnings = Vec::new();
    let mut assets = load_media(archive, &mut warnings);
    decode_all(&mut assets, &mut warnings);

    let mut copies: HashMap<&str, usize> = HashMap::new();
    for asset in &assets {
        *copies.entry(asset.digest.as_str()).or_default() += 1;
    }

    let mut entries: Vec<MediaEntry> = assets
        .iter()
        .map(|asset| MediaEntry {
            filename: asset.filename.clone(),
            size: asset.size,
            width: asset.width,
            height: asset.height,
            area: asset.area(),
            digest: asset.digest.clone(),
            copies: copies.get(asset.digest.as_str()).copied().unwrap_or(1),
        })
        .collect();
    entries.sort_by(|a, b| b.area.cmp(&a.area).then_with(|| a.filename.cmp(&b.filename)));

    MediaSurvey { entries, warnings }
}

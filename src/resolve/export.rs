//! Writing media files to the output directory.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::model::{ImageAsset, Resolution};
use tracing::debug;

/// Write every asset under its media store filename.
pub fn export_media(assets: &[ImageAsset], dir: &Path) -> Result<usize> {
    fs::create_dir_all(dir)?;
    for asset in assets {
        fs::write(dir.join(&asset.filename), &asset.data)?;
    }
    debug!(count = assets.len(), dir = %dir.display(), "exported media");
    Ok(assets.len())
}

/// Write `{participant_id}_{role}.{ext}` copies of every resolved image and
/// record the copy name on the mapping.
pub fn export_renamed(
    resolution: &mut Resolution,
    assets: &[ImageAsset],
    dir: &Path,
) -> Result<usize> {
    fs::create_dir_all(dir)?;
    let by_name: HashMap<&str, &ImageAsset> =
        assets.iter().map(|a| (a.filename.as_str(), a)).collect();

    let mut count = 0;
    for (id, mapping) in resolution.participants.iter_mut() {
        for (role, image) in mapping.images.iter_mut() {
            let Some(asset) = by_name.get(image.file.as_str()) else {
                continue;
            };
            let name = format!("{}_{}.{}", file_stem(id), role, asset.extension());
            fs::write(dir.join(&name), &asset.data)?;
            image.exported_as = Some(name);
            count += 1;
        }
    }
    Ok(count)
}

/// Make an identifier safe to use as a filename stem.
fn file_stem(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

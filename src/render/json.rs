//! JSON renderer implementation.

use std::path::Path;

use crate::error::Result;
use crate::model::Resolution;

/// JSON output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JsonFormat {
    /// Compact single-line JSON
    Compact,
    /// Pretty-printed with 2-space indentation
    #[default]
    Pretty,
}

/// Convert a Resolution to JSON.
///
/// Participants and roles are held in ordered maps, so the same resolution
/// always renders to the same bytes.
pub fn to_json(resolution: &Resolution, format: JsonFormat) -> Result<String> {
    let json = match format {
        JsonFormat::Compact => serde_json::to_string(resolution)?,
        JsonFormat::Pretty => serde_json::to_string_pretty(resolution)?,
    };
    Ok(json)
}

/// Render a Resolution and write it to a file, with a trailing newline.
pub fn write_json(resolution: &Resolution, path: impl AsRef<Path>, format: JsonFormat) -> Result<()> {
    let mut json = to_json(resolution, format)?;
    json.push('\n');
    std::fs::write(path, json)?;
    Ok(())
}

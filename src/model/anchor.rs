//! Drawing anchor model structures.

use crate::xlsx::column_letter;
use serde::{Deserialize, Serialize};

/// Which anchor element placed a picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorKind {
    /// `xdr:oneCellAnchor`: origin cell plus an extent
    OneCell,
    /// `xdr:twoCellAnchor`: origin and end cells
    TwoCell,
}

/// An image placed at a worksheet cell, with its media reference resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRecord {
    /// 1-based worksheet row of the origin cell
    pub row: u32,

    /// 0-based column of the origin cell
    pub col: u32,

    /// Relationship id from `a:blip/@r:embed`
    pub rel_id: String,

    /// Media store filename the relationship points to
    pub file: String,

    /// Drawing part the anchor came from
    pub drawing: String,

    /// Anchor element kind
    pub kind: AnchorKind,
}

impl AnchorRecord {
    /// A1-style reference of the origin cell (e.g. "AB6").
    pub fn cell_ref(&self) -> String {
        format!("{}{}", column_letter(self.col), self.row)
    }
}

//! Plain text summary renderer.

use unicode_width::UnicodeWidthStr;

use crate::model::{ImageRole, Resolution};

const HEADERS: [&str; 8] = ["ID", "Row", "Name", "Face", "Skin", "Hair", "Eye", "Tier"];

/// Render a resolution as an ASCII table followed by summary counts.
///
/// Missing images show as `-`. Column widths follow display width, so
/// names in wide scripts stay aligned.
pub fn to_summary(resolution: &Resolution) -> String {
    let mut rows: Vec<Vec<String>> = vec![HEADERS.iter().map(|h| h.to_string()).collect()];
    for (id, mapping) in &resolution.participants {
        let mut row = vec![
            id.clone(),
            mapping.physical_row.to_string(),
            mapping.name.clone().unwrap_or_default(),
        ];
        for role in ImageRole::KNOWN {
            row.push(
                mapping
                    .get(role)
                    .map(|image| image.file.clone())
                    .unwrap_or_else(|| "-".to_string()),
            );
        }
        row.push(
            mapping
                .confidence
                .map(|c| format!("{:?}", c).to_lowercase())
                .unwrap_or_else(|| "-".to_string()),
        );
        rows.push(row);
    }

    let mut widths = vec![0usize; HEADERS.len()];
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.width());
        }
    }

    let border = border_line(&widths, '-');
    let mut output = String::new();
    output.push_str(&border);
    for (row_idx, row) in rows.iter().enumerate() {
        output.push('|');
        for (cell, width) in row.iter().zip(&widths) {
            output.push(' ');
            output.push_str(cell);
            output.push_str(&" ".repeat(width - cell.width()));
            output.push_str(" |");
        }
        output.push('\n');
        if row_idx == 0 {
            output.push_str(&border_line(&widths, '='));
        }
    }
    output.push_str(&border);

    let stats = &resolution.statistics;
    output.push_str(&format!("\nStrategy: {:?}\n", resolution.strategy));
    output.push_str(&format!(
        "Participants: {} ({} with images)\n",
        stats.participants, stats.participants_with_images
    ));
    for role in ImageRole::KNOWN {
        output.push_str(&format!("  {}: {}\n", role, stats.with_role(role)));
    }
    if stats.unknown > 0 {
        output.push_str(&format!("  unknown: {}\n", stats.unknown));
    }
    output.push_str(&format!(
        "Anchors: {} ({} unmatched), media files: {}\n",
        stats.anchors, stats.unmatched_anchors, stats.media_files
    ));
    if !resolution.warnings.is_empty() {
        output.push_str(&format!("Warnings: {}\n", resolution.warnings.len()));
    }

    output
}

fn border_line(widths: &[usize], fill: char) -> String {
    let mut line = String::from("+");
    for w in widths {
        line.push_str(&fill.to_string().repeat(w + 2));
        line.push('+');
    }
    line.push('\n');
    line
}

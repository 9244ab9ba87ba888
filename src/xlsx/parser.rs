//! Worksheet reader producing survey rows.

use crate::container::SpreadsheetArchive;
use crate::error::{Error, Result};
use crate::model::{CellValue, SurveyRow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cell_ref::split_cell_ref;
use super::shared_strings::SharedStrings;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const FALLBACK_SHEET: &str = "xl/worksheets/sheet1.xml";

/// Where the identifying columns sit in the survey sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RowLayout {
    /// Header of the participant identifier column
    pub id_column: String,

    /// Header of the display-name column; when unset, the first header
    /// containing "name" is used
    pub name_column: Option<String>,

    /// 1-based row holding the question labels
    pub header_row: u32,
}

impl Default for RowLayout {
    fn default() -> Self {
        Self {
            id_column: "A-ID".to_string(),
            name_column: None,
            header_row: 1,
        }
    }
}

/// A worksheet row as stored: physical row number and sparse cells.
#[derive(Debug, Clone, PartialEq)]
struct SheetRow {
    number: u32,
    cells: Vec<(u32, CellValue)>,
}

impl SheetRow {
    fn get(&self, col: u32) -> Option<&CellValue> {
        self.cells.iter().find(|(c, _)| *c == col).map(|(_, v)| v)
    }
}

/// Reader for the first worksheet of a survey export.
pub struct SurveySheetReader<'a> {
    archive: &'a SpreadsheetArchive,
    shared_strings: SharedStrings,
    sheet_name: Option<String>,
    sheet_path: String,
}

impl<'a> SurveySheetReader<'a> {
    /// Locate the first worksheet and load the shared strings table.
    pub fn open(archive: &'a SpreadsheetArchive) -> Result<Self> {
        let shared_strings = if archive.exists("xl/sharedStrings.xml") {
            SharedStrings::parse(&archive.read_xml("xl/sharedStrings.xml")?)?
        } else {
            SharedStrings::default()
        };

        let (sheet_name, sheet_path) = match Self::first_sheet(archive)? {
            Some((name, path)) => (Some(name), path),
            None => (None, FALLBACK_SHEET.to_string()),
        };
        if !archive.exists(&sheet_path) {
            return Err(Error::MissingComponent(sheet_path));
        }
        debug!(sheet = %sheet_path, strings = shared_strings.len(), "opened survey sheet");

        Ok(Self {
            archive,
            shared_strings,
            sheet_name,
            sheet_path,
        })
    }

    /// Name and archive path of the first sheet listed in workbook.xml.
    fn first_sheet(archive: &SpreadsheetArchive) -> Result<Option<(String, String)>> {
        let rels = archive.read_relationships(WORKBOOK_PART)?;
        let xml = archive.read_xml(WORKBOOK_PART)?;
        let mut reader = quick_xml::Reader::from_str(&xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(quick_xml::events::Event::Empty(e))
                | Ok(quick_xml::events::Event::Start(e))
                    if e.name().local_name().as_ref() == b"sheet" =>
                {
                    let mut name = String::new();
                    let mut rel_id = String::new();
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"name" => name = String::from_utf8_lossy(&attr.value).to_string(),
                            _ if attr.key.local_name().as_ref() == b"id" => {
                                rel_id = String::from_utf8_lossy(&attr.value).to_string()
                            }
                            _ => {}
                        }
                    }
                    if let Some(rel) = rels.get(&rel_id) {
                        let path = SpreadsheetArchive::resolve_path(WORKBOOK_PART, &rel.target);
                        return Ok(Some((name, path)));
                    }
                }
                Ok(quick_xml::events::Event::Eof) => break,
                Err(e) => return Err(Error::XmlParse(e.to_string())),
                _ => {}
            }
            buf.clear();
        }

        Ok(None)
    }

    /// Name of the sheet being read, when workbook.xml names it.
    pub fn sheet_name(&self) -> Option<&str> {
        self.sheet_name.as_deref()
    }

    /// Archive path of the sheet being read.
    pub fn sheet_path(&self) -> &str {
        &self.sheet_path
    }

    /// Read every data row below the header into survey rows.
    ///
    /// Rows without an identifier are skipped; they are blank trailing rows
    /// or notes, not participants.
    pub fn read_rows(&self, layout: &RowLayout) -> Result<Vec<SurveyRow>> {
        let xml = self.archive.read_xml(&self.sheet_path)?;
        let grid = self.parse_sheet(&xml)?;

        let header = grid
            .iter()
            .find(|r| r.number == layout.header_row)
            .ok_or_else(|| {
                Error::InvalidData(format!("no header on row {}", layout.header_row))
            })?;
        let labels: Vec<(u32, String)> = header
            .cells
            .iter()
            .filter_map(|(col, value)| value.as_text().map(|label| (*col, label)))
            .collect();

        let find = |wanted: &str| {
            let wanted = wanted.trim();
            labels
                .iter()
                .find(|(_, label)| label.trim().eq_ignore_ascii_case(wanted))
                .map(|(col, _)| *col)
        };
        let id_col = find(&layout.id_column).ok_or_else(|| {
            Error::InvalidData(format!("no '{}' column in header", layout.id_column))
        })?;
        let name_col = match layout.name_column.as_deref() {
            Some(name) => find(name),
            None => labels
                .iter()
                .find(|(_, label)| label.to_lowercase().contains("name"))
                .map(|(col, _)| *col),
        };

        let mut rows = Vec::new();
        for sheet_row in grid.iter().filter(|r| r.number > layout.header_row) {
            let id = match sheet_row.get(id_col).and_then(CellValue::as_text) {
                Some(id) => id,
                None => continue,
            };
            let mut row = SurveyRow::new(id, sheet_row.number);
            row.name = name_col
                .and_then(|col| sheet_row.get(col))
                .and_then(CellValue::as_text);
            for (col, label) in &labels {
                let value = sheet_row.get(*col).cloned().unwrap_or_default();
                row.answers.push((label.clone(), value));
            }
            rows.push(row);
        }

        debug!(rows = rows.len(), columns = labels.len(), "read survey rows");
        Ok(rows)
    }

    /// Parse worksheet XML into sparse rows.
    fn parse_sheet(&self, xml: &str) -> Result<Vec<SheetRow>> {
        let mut rows = Vec::new();
        let mut reader = quick_xml::Reader::from_str(xml);

        let mut buf = Vec::new();
        let mut current_row: Option<SheetRow> = None;
        let mut last_row_number = 0u32;
        let mut current_col = 0u32;
        let mut next_col = 0u32;
        let mut current_cell_type: Option<String> = None;
        let mut current_cell_value = String::new();
        let mut in_cell = false;
        let mut in_value = false;
        let mut in_phonetic = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(quick_xml::events::Event::Start(ref e)) => match e.name().local_name().as_ref() {
                    b"row" => {
                        let number = attr_value(e, b"r")
                            .and_then(|r| r.parse::<u32>().ok())
                            .unwrap_or(last_row_number.saturating_add(1));
                        last_row_number = number;
                        next_col = 0;
                        current_row = Some(SheetRow {
                            number,
                            cells: Vec::new(),
                        });
                    }
                    b"c" if current_row.is_some() => {
                        in_cell = true;
                        current_cell_type = attr_value(e, b"t");
                        current_cell_value.clear();
                        current_col = attr_value(e, b"r")
                            .and_then(|r| split_cell_ref(&r))
                            .map(|(col, _)| col)
                            .unwrap_or(next_col);
                        next_col = current_col.saturating_add(1);
                    }
                    b"v" | b"t" if in_cell && !in_phonetic => in_value = true,
                    b"rPh" => in_phonetic = true,
                    _ => {}
                },
                Ok(quick_xml::events::Event::Empty(ref e)) => match e.name().local_name().as_ref() {
                    b"row" => {
                        last_row_number = attr_value(e, b"r")
                            .and_then(|r| r.parse::<u32>().ok())
                            .unwrap_or(last_row_number.saturating_add(1));
                    }
                    b"c" if current_row.is_some() => {
                        // A styled but empty cell still advances the column
                        next_col = attr_value(e, b"r")
                            .and_then(|r| split_cell_ref(&r))
                            .map(|(col, _)| col.saturating_add(1))
                            .unwrap_or(next_col.saturating_add(1));
                    }
                    _ => {}
                },
                Ok(quick_xml::events::Event::Text(ref e)) => {
                    if in_value {
                        let text = e.unescape().unwrap_or_default();
                        current_cell_value.push_str(&text);
                    }
                }
                Ok(quick_xml::events::Event::End(ref e)) => match e.name().local_name().as_ref() {
                    b"row" => {
                        if let Some(row) = current_row.take() {
                            if !row.cells.is_empty() {
                                rows.push(row);
                            }
                        }
                    }
                    b"c" if in_cell => {
                        let value = self
                            .resolve_cell_value(&current_cell_value, current_cell_type.as_deref());
                        if let Some(ref mut row) = current_row {
                            if !value.is_empty() {
                                row.cells.push((current_col, value));
                            }
                        }
                        in_cell = false;
                        in_value = false;
                    }
                    b"v" | b"t" => in_value = false,
                    b"rPh" => in_phonetic = false,
                    _ => {}
                },
                Ok(quick_xml::events::Event::Eof) => break,
                Err(e) => return Err(Error::XmlParse(e.to_string())),
                _ => {}
            }
            buf.clear();
        }

        Ok(rows)
    }

    /// Resolve a cell value based on its type.
    fn resolve_cell_value(&self, value: &str, cell_type: Option<&str>) -> CellValue {
        if value.is_empty() {
            return CellValue::Empty;
        }
        match cell_type {
            Some("s") => value
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|idx| self.shared_strings.get(idx))
                .map(|s| CellValue::Text(s.to_string()))
                .unwrap_or_else(|| CellValue::Text(value.to_string())),
            Some("b") => CellValue::Bool(value.trim() == "1"),
            Some("e") => CellValue::Text(format!("#ERROR:{}", value)),
            Some("str") | Some("inlineStr") => CellValue::Text(value.to_string()),
            _ => match value.trim().parse::<f64>() {
                Ok(n) => CellValue::Number(n),
                Err(_) => CellValue::Text(value.to_string()),
            },
        }
    }
}

fn attr_value(e: &quick_xml::events::BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

//! Synthetic survey workbooks for integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use surveypix::xlsx::column_letter;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Responses" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

/// A solid-colour PNG of the given size.
pub fn png(width: u32, height: u32, shade: u8) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([shade, shade, shade]));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

struct Anchor {
    drawing: usize,
    row: u32,
    col: u32,
    media: String,
}

/// Builder for a survey export workbook.
///
/// Row 1 holds `A-ID`, `Name` and any extra headers; each participant
/// takes the next physical row.
#[derive(Default)]
pub struct SurveyBook {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    media: Vec<(String, Vec<u8>)>,
    anchors: Vec<Anchor>,
    parts: Vec<(String, String)>,
}

impl SurveyBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, header: &str) -> Self {
        self.headers.push(header.to_string());
        self
    }

    pub fn participant(mut self, id: &str, name: &str, answers: &[&str]) -> Self {
        let mut row = vec![id.to_string(), name.to_string()];
        row.extend(answers.iter().map(|a| a.to_string()));
        self.rows.push(row);
        self
    }

    pub fn media(mut self, name: &str, data: Vec<u8>) -> Self {
        self.media.push((name.to_string(), data));
        self
    }

    /// Anchor a media file at a zero-based origin in drawing `drawing`.
    pub fn anchor(mut self, drawing: usize, row: u32, col: u32, media: &str) -> Self {
        self.anchors.push(Anchor {
            drawing,
            row,
            col,
            media: media.to_string(),
        });
        self
    }

    /// Add a raw part, replacing any generated part with the same path.
    pub fn part(mut self, path: &str, content: &str) -> Self {
        self.parts.push((path.to_string(), content.to_string()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut generated: Vec<(String, Vec<u8>)> = vec![
            ("xl/workbook.xml".to_string(), WORKBOOK.as_bytes().to_vec()),
            (
                "xl/_rels/workbook.xml.rels".to_string(),
                WORKBOOK_RELS.as_bytes().to_vec(),
            ),
            (
                "xl/worksheets/sheet1.xml".to_string(),
                self.sheet_xml().into_bytes(),
            ),
        ];

        let mut drawings: Vec<usize> = self.anchors.iter().map(|a| a.drawing).collect();
        drawings.sort_unstable();
        drawings.dedup();
        for n in drawings {
            let (xml, rels) = self.drawing_xml(n);
            generated.push((format!("xl/drawings/drawing{}.xml", n), xml.into_bytes()));
            generated.push((
                format!("xl/drawings/_rels/drawing{}.xml.rels", n),
                rels.into_bytes(),
            ));
        }

        for (name, data) in &self.media {
            generated.push((format!("xl/media/{}", name), data.clone()));
        }

        for (path, content) in &self.parts {
            generated.retain(|(p, _)| p != path);
            generated.push((path.clone(), content.as_bytes().to_vec()));
        }

        let mut buffer = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
            // stored entries keep part bytes verbatim in the archive
            let options =
                SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
            for (path, data) in generated {
                zip.start_file(path, options).unwrap();
                zip.write_all(&data).unwrap();
            }
            zip.finish().unwrap();
        }
        buffer
    }

    /// Write the workbook into `dir` and return its path.
    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.build()).unwrap();
        path
    }

    fn sheet_xml(&self) -> String {
        let mut headers = vec!["A-ID".to_string(), "Name".to_string()];
        headers.extend(self.headers.iter().cloned());

        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
        );
        let all_rows = std::iter::once(&headers).chain(self.rows.iter());
        for (idx, cells) in all_rows.enumerate() {
            let r = idx + 1;
            xml.push_str(&format!(r#"<row r="{}">"#, r));
            for (col, value) in cells.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                xml.push_str(&format!(
                    r#"<c r="{}{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                    column_letter(col as u32),
                    r,
                    value
                ));
            }
            xml.push_str("</row>");
        }
        xml.push_str("</sheetData></worksheet>");
        xml
    }

    fn drawing_xml(&self, drawing: usize) -> (String, String) {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><xdr:wsDr xmlns:xdr="http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
        );
        let mut rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );

        let anchors = self.anchors.iter().filter(|a| a.drawing == drawing);
        for (i, anchor) in anchors.enumerate() {
            let rel_id = format!("rId{}", i + 1);
            xml.push_str(&format!(
                concat!(
                    r#"<xdr:twoCellAnchor editAs="oneCell">"#,
                    r#"<xdr:from><xdr:col>{col}</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>{row}</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from>"#,
                    r#"<xdr:to><xdr:col>{to_col}</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>{to_row}</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:to>"#,
                    r#"<xdr:pic><xdr:nvPicPr><xdr:cNvPr id="{id}" name="Picture {id}"/><xdr:cNvPicPr/></xdr:nvPicPr>"#,
                    r#"<xdr:blipFill><a:blip r:embed="{rel}"/><a:stretch><a:fillRect/></a:stretch></xdr:blipFill><xdr:spPr/></xdr:pic>"#,
                    r#"<xdr:clientData/></xdr:twoCellAnchor>"#
                ),
                col = anchor.col,
                row = anchor.row,
                to_col = anchor.col.saturating_add(1),
                to_row = anchor.row.saturating_add(1),
                id = i + 2,
                rel = rel_id,
            ));
            rels.push_str(&format!(
                r#"<Relationship Id="{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/{}"/>"#,
                rel_id, anchor.media
            ));
        }

        xml.push_str("</xdr:wsDr>");
        rels.push_str("</Relationships>");
        (xml, rels)
    }
}

/// Three participants whose face photos sit in column AB (27).
pub fn three_participants() -> SurveyBook {
    SurveyBook::new()
        .participant("A101", "Kim Minji", &[])
        .participant("A102", "Lee Jiwoo", &[])
        .participant("A103", "Park Seoyeon", &[])
        .media("image1.png", png(120, 160, 10))
        .media("image2.png", png(120, 160, 20))
        .media("image3.png", png(120, 160, 30))
        .anchor(1, 1, 27, "image1.png")
        .anchor(1, 2, 27, "image2.png")
        .anchor(1, 3, 27, "image3.png")
}

//! SpreadsheetML drawing parsing.
//!
//! A drawing part lists the pictures floating over a sheet. Each picture sits
//! inside an anchor element whose `from` marker names the origin cell:
//!
//! ```xml
//! <xdr:twoCellAnchor>
//!   <xdr:from><xdr:col>27</xdr:col><xdr:row>5</xdr:row>...</xdr:from>
//!   <xdr:to>...</xdr:to>
//!   <xdr:pic>... <a:blip r:embed="rId3"/> ...</xdr:pic>
//! </xdr:twoCellAnchor>
//! ```
//!
//! `absoluteAnchor` has no origin cell and is skipped.

use crate::error::{Error, Result};
use crate::model::AnchorKind;

/// A picture anchor before its relationship id is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawingAnchor {
    /// 1-based origin row
    pub row: u32,
    /// 0-based origin column
    pub col: u32,
    /// `r:embed` ids of every picture under the anchor, in document order
    pub rel_ids: Vec<String>,
    pub kind: AnchorKind,
}

#[derive(Clone, Copy)]
enum Marker {
    Col,
    Row,
}

#[derive(Default)]
struct OpenAnchor {
    kind: Option<AnchorKind>,
    col: Option<u32>,
    row: Option<u32>,
    rel_ids: Vec<String>,
}

/// Parse a drawing part into its cell anchors.
///
/// Anchors without a complete origin or without any picture are dropped.
/// Pictures inside `mc:Fallback` are ignored, since the matching
/// `mc:Choice` already carries them.
pub fn parse_drawing(xml: &str) -> Result<Vec<DrawingAnchor>> {
    let mut anchors = Vec::new();
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut current: Option<OpenAnchor> = None;
    let mut in_from = false;
    let mut marker: Option<Marker> = None;
    let mut fallback_depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(ref e)) => {
                let local_name = e.name().local_name();
                match local_name.as_ref() {
                    b"Fallback" => fallback_depth += 1,
                    b"oneCellAnchor" => {
                        current = Some(OpenAnchor {
                            kind: Some(AnchorKind::OneCell),
                            ..Default::default()
                        });
                    }
                    b"twoCellAnchor" => {
                        current = Some(OpenAnchor {
                            kind: Some(AnchorKind::TwoCell),
                            ..Default::default()
                        });
                    }
                    b"from" if current.is_some() => in_from = true,
                    b"col" if in_from => marker = Some(Marker::Col),
                    b"row" if in_from => marker = Some(Marker::Row),
                    b"blip" if fallback_depth == 0 => push_embed(&mut current, e),
                    _ => {}
                }
            }
            Ok(quick_xml::events::Event::Empty(ref e)) => {
                if e.name().local_name().as_ref() == b"blip" && fallback_depth == 0 {
                    push_embed(&mut current, e);
                }
            }
            Ok(quick_xml::events::Event::Text(ref e)) => {
                if let (Some(which), Some(anchor)) = (marker, current.as_mut()) {
                    let text = e.unescape().unwrap_or_default();
                    let value = text.trim().parse::<u32>().map_err(|_| {
                        Error::InvalidData(format!("bad anchor marker value '{}'", text.trim()))
                    })?;
                    match which {
                        Marker::Col => anchor.col = Some(value),
                        Marker::Row => anchor.row = Some(value),
                    }
                }
            }
            Ok(quick_xml::events::Event::End(ref e)) => {
                let local_name = e.name().local_name();
                match local_name.as_ref() {
                    b"Fallback" => fallback_depth = fallback_depth.saturating_sub(1),
                    b"col" | b"row" => marker = None,
                    b"from" => in_from = false,
                    b"oneCellAnchor" | b"twoCellAnchor" => {
                        if let Some(open) = current.take() {
                            if let (Some(kind), Some(col), Some(row)) =
                                (open.kind, open.col, open.row)
                            {
                                if !open.rel_ids.is_empty() {
                                    let row = row.checked_add(1).ok_or_else(|| {
                                        Error::InvalidData(format!("anchor row {} out of range", row))
                                    })?;
                                    anchors.push(DrawingAnchor {
                                        row,
                                        col,
                                        rel_ids: open.rel_ids,
                                        kind,
                                    });
                                }
                            }
                        }
                        in_from = false;
                    }
                    _ => {}
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(Error::XmlParse(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(anchors)
}

fn push_embed(current: &mut Option<OpenAnchor>, e: &quick_xml::events::BytesStart<'_>) {
    let Some(anchor) = current.as_mut() else {
        return;
    };
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == b"embed" {
            let id = String::from_utf8_lossy(&attr.value).to_string();
            if !id.is_empty() {
                anchor.rel_ids.push(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<xdr:wsDr xmlns:xdr="http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006">"#;

    fn drawing(body: &str) -> String {
        format!("{}{}</xdr:wsDr>", HEADER, body)
    }

    #[test]
    fn test_two_cell_anchor() {
        let xml = drawing(
            r#"<xdr:twoCellAnchor editAs="oneCell">
  <xdr:from><xdr:col>27</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>5</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from>
  <xdr:to><xdr:col>28</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>6</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:to>
  <xdr:pic>
    <xdr:nvPicPr><xdr:cNvPr id="2" name="Picture 1"/><xdr:cNvPicPr/></xdr:nvPicPr>
    <xdr:blipFill><a:blip r:embed="rId1"/><a:stretch><a:fillRect/></a:stretch></xdr:blipFill>
  </xdr:pic>
  <xdr:clientData/>
</xdr:twoCellAnchor>"#,
        );

        let anchors = parse_drawing(&xml).unwrap();
        assert_eq!(
            anchors,
            vec![DrawingAnchor {
                row: 6,
                col: 27,
                rel_ids: vec!["rId1".to_string()],
                kind: AnchorKind::TwoCell,
            }]
        );
    }

    #[test]
    fn test_one_cell_anchor() {
        let xml = drawing(
            r#"<xdr:oneCellAnchor>
  <xdr:from><xdr:col>21</xdr:col><xdr:colOff>1200</xdr:colOff><xdr:row>1</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from>
  <xdr:ext cx="952500" cy="952500"/>
  <xdr:pic><xdr:blipFill><a:blip r:embed="rId7"></a:blip></xdr:blipFill></xdr:pic>
  <xdr:clientData/>
</xdr:oneCellAnchor>"#,
        );

        let anchors = parse_drawing(&xml).unwrap();
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].row, 2);
        assert_eq!(anchors[0].col, 21);
        assert_eq!(anchors[0].rel_ids, vec!["rId7"]);
        assert_eq!(anchors[0].kind, AnchorKind::OneCell);
    }

    #[test]
    fn test_skips_absolute_and_shape_only_anchors() {
        let xml = drawing(
            r#"<xdr:absoluteAnchor><xdr:pos x="0" y="0"/><xdr:ext cx="1" cy="1"/>
  <xdr:pic><xdr:blipFill><a:blip r:embed="rId1"/></xdr:blipFill></xdr:pic><xdr:clientData/></xdr:absoluteAnchor>
<xdr:twoCellAnchor>
  <xdr:from><xdr:col>3</xdr:col><xdr:row>3</xdr:row></xdr:from>
  <xdr:to><xdr:col>4</xdr:col><xdr:row>4</xdr:row></xdr:to>
  <xdr:sp><xdr:txBody/></xdr:sp><xdr:clientData/>
</xdr:twoCellAnchor>"#,
        );

        assert!(parse_drawing(&xml).unwrap().is_empty());
    }

    #[test]
    fn test_group_shape_and_fallback() {
        let xml = drawing(
            r#"<xdr:twoCellAnchor>
  <xdr:from><xdr:col>40</xdr:col><xdr:row>9</xdr:row></xdr:from>
  <xdr:to><xdr:col>41</xdr:col><xdr:row>10</xdr:row></xdr:to>
  <xdr:grpSp>
    <xdr:pic><xdr:blipFill><a:blip r:embed="rId2"/></xdr:blipFill></xdr:pic>
    <xdr:pic><xdr:blipFill><a:blip r:embed="rId3"/></xdr:blipFill></xdr:pic>
  </xdr:grpSp>
  <xdr:clientData/>
</xdr:twoCellAnchor>
<mc:AlternateContent>
  <mc:Choice Requires="a14">
    <xdr:twoCellAnchor>
      <xdr:from><xdr:col>38</xdr:col><xdr:row>9</xdr:row></xdr:from>
      <xdr:to><xdr:col>39</xdr:col><xdr:row>10</xdr:row></xdr:to>
      <xdr:pic><xdr:blipFill><a:blip r:embed="rId4"/></xdr:blipFill></xdr:pic>
      <xdr:clientData/>
    </xdr:twoCellAnchor>
  </mc:Choice>
  <mc:Fallback>
    <xdr:twoCellAnchor>
      <xdr:from><xdr:col>38</xdr:col><xdr:row>9</xdr:row></xdr:from>
      <xdr:to><xdr:col>39</xdr:col><xdr:row>10</xdr:row></xdr:to>
      <xdr:pic><xdr:blipFill><a:blip r:embed="rId5"/></xdr:blipFill></xdr:pic>
      <xdr:clientData/>
    </xdr:twoCellAnchor>
  </mc:Fallback>
</mc:AlternateContent>"#,
        );

        let anchors = parse_drawing(&xml).unwrap();
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors[0].rel_ids, vec!["rId2", "rId3"]);
        assert_eq!(anchors[0].row, 10);
        assert_eq!(anchors[1].rel_ids, vec!["rId4"]);
        assert_eq!(anchors[1].col, 38);
    }

    #[test]
    fn test_malformed_drawing_errors() {
        let xml = drawing("<xdr:twoCellAnchor><xdr:from><xdr:col>1</xdr:row></xdr:from>");
        assert!(parse_drawing(&xml).is_err());

        let xml = drawing(
            r#"<xdr:twoCellAnchor><xdr:from><xdr:col>x</xdr:col><xdr:row>1</xdr:row></xdr:from></xdr:twoCellAnchor>"#,
        );
        assert!(matches!(parse_drawing(&xml), Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_row_past_sheet_limit_errors() {
        let xml = drawing(
            r#"<xdr:twoCellAnchor><xdr:from><xdr:col>27</xdr:col><xdr:row>4294967295</xdr:row></xdr:from><xdr:pic><xdr:blipFill><a:blip r:embed="rId1"/></xdr:blipFill></xdr:pic></xdr:twoCellAnchor>"#,
        );
        assert!(matches!(parse_drawing(&xml), Err(Error::InvalidData(_))));
    }
}

//! ZIP container abstraction for spreadsheet archives.

use crate::error::{Error, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

/// Directory of the archive's media store.
pub const MEDIA_PREFIX: &str = "xl/media/";

/// Directory holding drawing parts.
pub const DRAWINGS_PREFIX: &str = "xl/drawings/";

/// A relationship entry from a .rels file.
#[derive(Debug, Clone)]
pub struct Relationship {
    /// Relationship ID (e.g., "rId1")
    pub id: String,
    /// Relationship type URI
    pub rel_type: String,
    /// Target path (relative or absolute)
    pub target: String,
    /// Whether the target is external
    pub external: bool,
}

/// Collection of relationships parsed from a .rels file.
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    /// Map from relationship ID to relationship data
    pub by_id: HashMap<String, Relationship>,
}

impl Relationships {
    /// Create a new empty relationships collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a relationship by ID.
    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.by_id.get(id)
    }

    /// Add a relationship.
    pub fn add(&mut self, rel: Relationship) {
        self.by_id.insert(rel.id.clone(), rel);
    }

    /// Map relationship ids to media filenames for the part at `source`.
    ///
    /// Only internal targets landing in the media store are kept; hyperlinks,
    /// charts and other relationship kinds are ignored.
    pub fn media_targets(&self, source: &str) -> HashMap<String, String> {
        self.by_id
            .values()
            .filter(|rel| !rel.external)
            .filter_map(|rel| {
                let resolved = SpreadsheetArchive::resolve_path(source, &rel.target);
                let filename = resolved.strip_prefix(MEDIA_PREFIX)?;
                if filename.is_empty() || filename.contains('/') {
                    return None;
                }
                Some((rel.id.clone(), filename.to_string()))
            })
            .collect()
    }

    /// Number of relationships.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Decode XML bytes, honouring a UTF-8 or UTF-16 byte order mark.
pub fn decode_xml_bytes(bytes: &[u8]) -> Result<String> {
    match bytes {
        [0xEF, 0xBB, 0xBF, rest @ ..] => String::from_utf8(rest.to_vec())
            .map_err(|e| Error::InvalidData(format!("invalid UTF-8: {}", e))),
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes).map(fix_declaration),
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes).map(fix_declaration),
        _ => Ok(String::from_utf8_lossy(bytes).into_owned()),
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String> {
    let units = bytes.chunks_exact(2).map(|pair| unit([pair[0], pair[1]]));
    char::decode_utf16(units)
        .collect::<std::result::Result<String, _>>()
        .map_err(|e| Error::InvalidData(format!("invalid UTF-16: {}", e)))
}

/// The decoded string is UTF-8, so the declaration must stop claiming UTF-16.
fn fix_declaration(content: String) -> String {
    if !content.starts_with("<?xml") {
        return content;
    }
    match content.find("?>") {
        Some(end) => {
            let decl = content[..end + 2]
                .replace("\"UTF-16\"", "\"UTF-8\"")
                .replace("'UTF-16'", "'UTF-8'")
                .replace("\"utf-16\"", "\"UTF-8\"")
                .replace("'utf-16'", "'UTF-8'");
            format!("{}{}", decl, &content[end + 2..])
        }
        None => content,
    }
}

/// A spreadsheet archive held in memory.
///
/// The source file is read fully and closed on open, so the archive never
/// keeps an OS handle alive while the resolver works.
pub struct SpreadsheetArchive {
    archive: RefCell<zip::ZipArchive<Cursor<Vec<u8>>>>,
}

impl SpreadsheetArchive {
    /// Open a spreadsheet archive from a file path.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use surveypix::container::SpreadsheetArchive;
    ///
    /// let archive = SpreadsheetArchive::open("survey.xlsx")?;
    /// println!("{} media files", archive.media_files().len());
    /// # Ok::<(), surveypix::Error>(())
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            Error::ArchiveUnreadable(format!("{}: {}", path.display(), e))
        })?;
        let mut reader = BufReader::new(file);
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(data)
    }

    /// Create an archive from a byte vector.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        if !is_zip_file(&data) {
            return Err(Error::ArchiveUnreadable(
                "missing zip signature".to_string(),
            ));
        }
        let archive = zip::ZipArchive::new(Cursor::new(data))?;
        if !archive.file_names().any(|n| n == "xl/workbook.xml") {
            return Err(Error::ArchiveUnreadable(
                "zip has no xl/workbook.xml".to_string(),
            ));
        }
        Ok(Self {
            archive: RefCell::new(archive),
        })
    }

    /// Create an archive from a reader.
    pub fn from_reader<R: Read + Seek>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(data)
    }

    /// Read an XML part from the archive as a string.
    pub fn read_xml(&self, path: &str) -> Result<String> {
        let bytes = self.read_binary(path)?;
        decode_xml_bytes(&bytes)
    }

    /// Read a binary part from the archive.
    pub fn read_binary(&self, path: &str) -> Result<Vec<u8>> {
        let mut archive = self.archive.borrow_mut();
        let mut file = archive
            .by_name(path)
            .map_err(|_| Error::MissingComponent(path.to_string()))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Check if a part exists in the archive.
    pub fn exists(&self, path: &str) -> bool {
        self.archive.borrow().file_names().any(|n| n == path)
    }

    /// List parts matching a prefix, sorted by name.
    pub fn list_files_with_prefix(&self, prefix: &str) -> Vec<String> {
        let archive = self.archive.borrow();
        let mut names: Vec<String> = archive
            .file_names()
            .filter(|n| n.starts_with(prefix))
            .map(String::from)
            .collect();
        names.sort();
        names
    }

    /// Every file in the media store, sorted by archive path.
    pub fn media_files(&self) -> Vec<String> {
        self.list_files_with_prefix(MEDIA_PREFIX)
            .into_iter()
            .filter(|n| !n.ends_with('/'))
            .collect()
    }

    /// Every drawing definition part, sorted by archive path.
    pub fn drawing_parts(&self) -> Vec<String> {
        self.list_files_with_prefix(DRAWINGS_PREFIX)
            .into_iter()
            .filter(|n| n.ends_with(".xml") && !n.contains("/_rels/"))
            .collect()
    }

    /// Path of the .rels part paired with `part_path`.
    pub fn rels_path(part_path: &str) -> String {
        if part_path.is_empty() || part_path == "/" {
            return "_rels/.rels".to_string();
        }
        match part_path.rsplit_once('/') {
            Some((parent, filename)) => format!("{}/_rels/{}.rels", parent, filename),
            None => format!("_rels/{}.rels", part_path),
        }
    }

    /// Read and parse the relationships of `part_path`.
    ///
    /// A part without a .rels file has no relationships; a .rels file that is
    /// present but malformed is an error.
    pub fn read_relationships(&self, part_path: &str) -> Result<Relationships> {
        let rels_path = Self::rels_path(part_path);
        if !self.exists(&rels_path) {
            return Ok(Relationships::new());
        }
        let content = self.read_xml(&rels_path)?;
        parse_relationships(&content)
    }

    /// Resolve a relative path from a base path.
    pub fn resolve_path(base: &str, relative: &str) -> String {
        if let Some(stripped) = relative.strip_prefix('/') {
            return stripped.to_string();
        }

        let mut parts: Vec<&str> = base.split('/').collect();
        parts.pop();
        for component in relative.split('/') {
            match component {
                ".." => {
                    parts.pop();
                }
                "." | "" => {}
                other => parts.push(other),
            }
        }
        parts.join("/")
    }
}

fn parse_relationships(content: &str) -> Result<Relationships> {
    let mut rels = Relationships::new();
    if content.trim().is_empty() {
        return Ok(rels);
    }

    let mut reader = quick_xml::Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Empty(e)) | Ok(quick_xml::events::Event::Start(e))
                if e.name().local_name().as_ref() == b"Relationship" =>
            {
                let mut id = String::new();
                let mut rel_type = String::new();
                let mut target = String::new();
                let mut external = false;

                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => id = String::from_utf8_lossy(&attr.value).to_string(),
                        b"Type" => rel_type = String::from_utf8_lossy(&attr.value).to_string(),
                        b"Target" => target = String::from_utf8_lossy(&attr.value).to_string(),
                        b"TargetMode" => {
                            external =
                                String::from_utf8_lossy(&attr.value).eq_ignore_ascii_case("external")
                        }
                        _ => {}
                    }
                }

                if !id.is_empty() {
                    rels.add(Relationship {
                        id,
                        rel_type,
                        target,
                        external,
                    });
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(Error::XmlParse(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(rels)
}

/// Check for the local file header signature every zip starts with.
pub fn is_zip_file(data: &[u8]) -> bool {
    data.len() >= 4 && data[..4] == [0x50, 0x4B, 0x03, 0x04]
}

impl std::fmt::Debug for SpreadsheetArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpreadsheetArchive")
            .field("files", &self.archive.borrow().len())
            .finish()
    }
}

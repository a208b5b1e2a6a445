use std::collections::BTreeMap;

use lopdf::{self, content::Content};

use crate::PdfError;

/// A page identifier mirroring `lopdf::ObjectId`: (object number, generation number).
pub type PageId = (u32, u16);

/// `ForceBold` bit of the font descriptor `/Flags` entry (bit 19, 1-based).
const FORCE_BOLD_FLAG: i64 = 1 << 18;

/// Font descriptor weights at or above this are treated as bold.
const BOLD_FONT_WEIGHT: i64 = 600;

/// Base-font name fragments that indicate a heavy face.
const BOLD_NAME_MARKERS: [&str; 5] = ["BOLD", "BLACK", "HEAVY", "SEMIBOLD", "DEMI"];

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// A font entry from a page's resource dictionary.
#[derive(Debug, Clone, Default)]
pub struct FontResource {
    /// Resource key as used by the `Tf` operator (e.g. `b"F1"`).
    pub key: Vec<u8>,
    /// `/BaseFont` name, if present.
    pub base_font: Option<String>,
    /// `/Encoding` name, if it is a name (not a dictionary).
    pub encoding: Option<String>,
    /// `/FontDescriptor` `/FontWeight`, if present.
    pub weight: Option<i64>,
    /// `/FontDescriptor` `/Flags`, if present.
    pub flags: Option<i64>,
}

impl FontResource {
    /// Best display name: the base font, falling back to the resource key.
    pub fn display_name(&self) -> String {
        self.base_font
            .clone()
            .unwrap_or_else(|| String::from_utf8_lossy(&self.key).into_owned())
    }

    /// Whether the face renders bold, judged from the descriptor first and
    /// the base-font name second.
    pub fn is_bold(&self) -> bool {
        if self.flags.is_some_and(|f| f & FORCE_BOLD_FLAG != 0) {
            return true;
        }
        if self.weight.is_some_and(|w| w >= BOLD_FONT_WEIGHT) {
            return true;
        }
        name_looks_bold(&self.display_name())
    }
}

/// Name-based bold detection, e.g. `ABCDEF+Helvetica-Bold`.
pub fn name_looks_bold(name: &str) -> bool {
    let upper = name.to_uppercase();
    BOLD_NAME_MARKERS.iter().any(|marker| upper.contains(marker))
}

/// A simplified, lopdf-independent representation of a content-stream operand.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Other,
}

impl PdfValue {
    /// Numeric value, accepting both integers and reals.
    pub fn as_number(&self) -> Option<f32> {
        match self {
            PdfValue::Integer(i) => Some(*i as f32),
            PdfValue::Real(f) => Some(*f),
            _ => None,
        }
    }
}

/// A single content-stream operation (operator + operands).
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

impl ContentOp {
    pub fn number(&self, index: usize) -> Option<f32> {
        self.operands.get(index).and_then(PdfValue::as_number)
    }
}

/// Convert a `lopdf::Object` operand into a [`PdfValue`].
///
/// Dictionaries, streams and references never carry text in content streams,
/// so they collapse to [`PdfValue::Other`].
pub fn convert_operand(obj: &lopdf::Object) -> PdfValue {
    match obj {
        lopdf::Object::Null => PdfValue::Null,
        lopdf::Object::Boolean(b) => PdfValue::Bool(*b),
        lopdf::Object::Integer(i) => PdfValue::Integer(*i),
        lopdf::Object::Real(f) => PdfValue::Real(*f),
        lopdf::Object::Name(n) => PdfValue::Name(n.clone()),
        lopdf::Object::String(s, _) => PdfValue::Str(s.clone()),
        lopdf::Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_operand).collect()),
        _ => PdfValue::Other,
    }
}

/// Best-effort decoding of raw PDF string bytes.
///
/// UTF-16BE with BOM first, then UTF-8, then Latin-1 byte-per-char.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if let Some(payload) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let code_units: Vec<u16> = payload
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&code_units);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    bytes.iter().map(|&b| b as char).collect()
}

// ---------------------------------------------------------------------------
// PdfBackend trait
// ---------------------------------------------------------------------------

/// Abstraction over the PDF parsing library so the span extractor can be
/// driven by hand-built content operations in tests.
pub trait PdfBackend {
    /// Mapping from 1-based page number to [`PageId`].
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Fonts referenced by the page's resources.
    fn page_fonts(&self, page: PageId) -> Result<Vec<FontResource>, PdfError>;

    /// Decoded content-stream operations of the page.
    fn page_operations(&self, page: PageId) -> Result<Vec<ContentOp>, PdfError>;

    /// Decode the bytes of a text-showing operand for the given font.
    fn decode_text(&self, font: Option<&FontResource>, bytes: &[u8]) -> String;
}

// ---------------------------------------------------------------------------
// LopdfBackend
// ---------------------------------------------------------------------------

/// [`PdfBackend`] backed by [`lopdf::Document`].
pub struct LopdfBackend {
    doc: lopdf::Document,
}

impl LopdfBackend {
    /// Parse a PDF from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self, PdfError> {
        let doc = lopdf::Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        if doc.is_encrypted() {
            return Err(PdfError::Encrypted);
        }

        Ok(Self { doc })
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Follow a single level of indirection.
    fn resolve<'a>(&'a self, obj: &'a lopdf::Object) -> Option<&'a lopdf::Object> {
        match obj {
            lopdf::Object::Reference(id) => self.doc.get_object(*id).ok(),
            other => Some(other),
        }
    }

    /// Read `/FontWeight` and `/Flags` from a font's descriptor.
    fn descriptor_style(&self, font: &lopdf::Dictionary) -> (Option<i64>, Option<i64>) {
        let descriptor = font
            .get(b"FontDescriptor")
            .ok()
            .and_then(|obj| self.resolve(obj))
            .and_then(|obj| obj.as_dict().ok());

        let Some(descriptor) = descriptor else {
            return (None, None);
        };

        let int = |key: &[u8]| {
            descriptor
                .get(key)
                .ok()
                .and_then(|obj| self.resolve(obj))
                .and_then(|obj| match obj {
                    lopdf::Object::Integer(i) => Some(*i),
                    lopdf::Object::Real(f) => Some(*f as i64),
                    _ => None,
                })
        };

        (int(b"FontWeight"), int(b"Flags"))
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_fonts(&self, page: PageId) -> Result<Vec<FontResource>, PdfError> {
        let fonts = self
            .doc
            .get_page_fonts(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page fonts: {}", e)))?;

        let name_of = |dict: &lopdf::Dictionary, key: &[u8]| {
            dict.get(key)
                .ok()
                .and_then(|o| o.as_name().ok())
                .map(|n| String::from_utf8_lossy(n).into_owned())
        };

        Ok(fonts
            .iter()
            .map(|(key, dict)| {
                let (weight, flags) = self.descriptor_style(dict);
                FontResource {
                    key: key.clone(),
                    base_font: name_of(dict, b"BaseFont"),
                    encoding: name_of(dict, b"Encoding"),
                    weight,
                    flags,
                }
            })
            .collect())
    }

    fn page_operations(&self, page: PageId) -> Result<Vec<ContentOp>, PdfError> {
        let raw = self
            .doc
            .get_page_content(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page content: {}", e)))?;

        let content = Content::decode(&raw)
            .map_err(|e| PdfError::Parse(format!("content stream decode error: {}", e)))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operands: op.operands.iter().map(convert_operand).collect(),
                operator: op.operator,
            })
            .collect())
    }

    fn decode_text(&self, font: Option<&FontResource>, bytes: &[u8]) -> String {
        // Identity-H / Identity-V fonts usually carry 2-byte codes.
        let identity = font
            .and_then(|f| f.encoding.as_deref())
            .is_some_and(|enc| enc.contains("Identity"));

        if identity && bytes.len() >= 2 && bytes.len() % 2 == 0 {
            let code_units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect();
            let decoded = String::from_utf16_lossy(&code_units);
            if !decoded.chars().all(|c| c == '\u{FFFD}' || c == '\0') {
                return decoded;
            }
        }

        decode_text_simple(bytes)
    }
}

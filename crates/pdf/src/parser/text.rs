//! Content-stream walking and line reconstruction.
//!
//! ```text
//! content ops  ->  TextSpan[] (content order)  ->  TextLine[] (reading order)
//!                  extract_page_spans              group_into_lines
//! ```

use serde::Serialize;

use super::backend::{decode_text_simple, ContentOp, FontResource, PageId, PdfBackend, PdfValue};
use crate::PdfError;

/// A run of text in one font, size and weight on one baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextSpan {
    pub text: String,
    pub x: f32,
    pub y: f32,
    /// Estimated horizontal advance of `text`.
    pub width: f32,
    /// Rendered size: the `Tf` size scaled by the text matrix.
    pub font_size: f32,
    pub font_name: String,
    pub is_bold: bool,
}

/// Spans sharing (approximately) one baseline, left to right.
#[derive(Debug, Clone, Default)]
pub struct TextLine {
    pub spans: Vec<TextSpan>,
    pub y: f32,
}

impl TextSpan {
    fn end_x(&self) -> f32 {
        self.x + self.width
    }

    fn same_style(&self, other: &TextSpan) -> bool {
        self.font_name == other.font_name
            && (self.font_size - other.font_size).abs() < FONT_SIZE_BUCKET
            && self.is_bold == other.is_bold
            && (self.y - other.y).abs() < Y_TOLERANCE
    }
}

impl TextLine {
    pub fn text(&self) -> String {
        self.spans
            .iter()
            .map(|s| s.text.as_str())
            .filter(|t| !t.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Spans whose baselines differ by less than this share a line.
const Y_TOLERANCE: f32 = 1.0;

/// Approximate glyph advance as a fraction of the font size.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// Minimum gap (in points) between adjacent spans of one run before a space
/// is inserted.
const MIN_WORD_GAP: f32 = 1.5;

/// Font sizes closer than this count as the same size.
const FONT_SIZE_BUCKET: f32 = 0.5;

/// Fraction of a glyph advance a `TJ` adjustment must exceed to read as a space.
const TJ_SPACE_RATIO: f32 = 0.3;

const IDENTITY_MATRIX: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

// ---------------------------------------------------------------------------
// Text state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct TextState {
    font: Option<FontResource>,
    font_size: f32,
    text_matrix: [f32; 6],
    line_matrix: [f32; 6],
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    text_rise: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: None,
            font_size: 0.0,
            text_matrix: IDENTITY_MATRIX,
            line_matrix: IDENTITY_MATRIX,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            text_rise: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn begin_text(&mut self) {
        self.text_matrix = IDENTITY_MATRIX;
        self.line_matrix = IDENTITY_MATRIX;
    }

    /// `font_size * sqrt(b^2 + d^2)` of the text matrix.
    fn effective_font_size(&self) -> f32 {
        let scale = (self.text_matrix[1].powi(2) + self.text_matrix[3].powi(2)).sqrt();
        (self.font_size * scale).abs()
    }

    fn glyph_advance(&self) -> f32 {
        self.font_size * APPROX_CHAR_WIDTH_RATIO * self.horiz_scale
    }

    fn advance_x(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    fn advance_over(&mut self, text: &str) {
        let dx: f32 = text
            .chars()
            .map(|ch| {
                let extra = if ch == ' ' { self.word_spacing } else { 0.0 };
                self.glyph_advance() + self.char_spacing + extra
            })
            .sum();
        self.advance_x(dx);
    }

    /// Translate the line matrix and reset the text matrix to it (`Td`).
    fn translate_line(&mut self, tx: f32, ty: f32) {
        let m = self.line_matrix;
        self.line_matrix[4] = m[0] * tx + m[2] * ty + m[4];
        self.line_matrix[5] = m[1] * tx + m[3] * ty + m[5];
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.translate_line(0.0, -self.leading);
    }

    fn span(&self, text: String, x: f32, y: f32) -> TextSpan {
        let width = (self.text_matrix[4] - x).max(0.0);
        let (font_name, is_bold) = match &self.font {
            Some(font) => (font.display_name(), font.is_bold()),
            None => (String::new(), false),
        };
        TextSpan {
            text,
            x,
            y,
            width,
            font_size: self.effective_font_size(),
            font_name,
            is_bold,
        }
    }
}

// ---------------------------------------------------------------------------
// Span extraction
// ---------------------------------------------------------------------------

/// Walk one page's content stream and return its spans in content order.
pub fn extract_page_spans(
    backend: &dyn PdfBackend,
    page_id: PageId,
) -> Result<Vec<TextSpan>, PdfError> {
    let ops = backend.page_operations(page_id)?;
    let fonts = backend.page_fonts(page_id).unwrap_or_else(|e| {
        log::debug!("page {:?} has unreadable font resources: {}", page_id, e);
        Vec::new()
    });

    Ok(spans_from_operations(backend, &ops, &fonts))
}

/// Run the text state machine over already decoded operations.
///
/// Consecutive operators that continue one run of text are returned as a
/// single span (see [`merge_runs`]).
pub fn spans_from_operations(
    backend: &dyn PdfBackend,
    ops: &[ContentOp],
    fonts: &[FontResource],
) -> Vec<TextSpan> {
    let mut state = TextState::default();
    let mut spans = Vec::new();

    for op in ops {
        match op.operator.as_str() {
            "BT" => state.begin_text(),
            // Font state survives ET; some producers rely on it.
            "ET" => {}
            "Tf" => set_font(op, fonts, &mut state),
            "Tm" => {
                let values: Vec<f32> = (0..6).filter_map(|i| op.number(i)).collect();
                if let Ok(matrix) = <[f32; 6]>::try_from(values) {
                    state.text_matrix = matrix;
                    state.line_matrix = matrix;
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (op.number(0), op.number(1)) {
                    state.translate_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (op.number(0), op.number(1)) {
                    state.leading = -ty;
                    state.translate_line(tx, ty);
                }
            }
            "T*" => state.next_line(),
            "TL" => {
                if let Some(v) = op.number(0) {
                    state.leading = v;
                }
            }
            "Tc" => {
                if let Some(v) = op.number(0) {
                    state.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = op.number(0) {
                    state.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = op.number(0) {
                    state.horiz_scale = v / 100.0;
                }
            }
            "Ts" => {
                if let Some(v) = op.number(0) {
                    state.text_rise = v;
                }
            }
            "Tj" => {
                if let Some(operand) = op.operands.first() {
                    show_string(operand, backend, &mut state, &mut spans);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(items)) = op.operands.first() {
                    show_array(items, backend, &mut state, &mut spans);
                }
            }
            "'" => {
                state.next_line();
                if let Some(operand) = op.operands.first() {
                    show_string(operand, backend, &mut state, &mut spans);
                }
            }
            "\"" => {
                if let (Some(aw), Some(ac), Some(operand)) =
                    (op.number(0), op.number(1), op.operands.get(2))
                {
                    state.word_spacing = aw;
                    state.char_spacing = ac;
                    state.next_line();
                    show_string(operand, backend, &mut state, &mut spans);
                }
            }
            _ => {}
        }
    }

    merge_runs(spans)
}

fn set_font(op: &ContentOp, fonts: &[FontResource], state: &mut TextState) {
    let key = match op.operands.first() {
        Some(PdfValue::Name(n)) | Some(PdfValue::Str(n)) => n.clone(),
        _ => return,
    };
    state.font_size = op.number(1).unwrap_or(0.0);
    state.font = Some(
        fonts
            .iter()
            .find(|f| f.key == key)
            .cloned()
            .unwrap_or(FontResource {
                key,
                ..Default::default()
            }),
    );
}

fn decode(operand: &PdfValue, backend: &dyn PdfBackend, state: &TextState) -> String {
    match operand {
        PdfValue::Str(bytes) => {
            let decoded = backend.decode_text(state.font.as_ref(), bytes);
            if decoded.is_empty() {
                decode_text_simple(bytes)
            } else {
                decoded
            }
        }
        _ => String::new(),
    }
}

fn show_string(
    operand: &PdfValue,
    backend: &dyn PdfBackend,
    state: &mut TextState,
    spans: &mut Vec<TextSpan>,
) {
    let text = decode(operand, backend, state);
    if text.is_empty() {
        return;
    }
    let (x, y) = (state.text_matrix[4], state.text_matrix[5] + state.text_rise);
    state.advance_over(&text);
    spans.push(state.span(text, x, y));
}

/// `TJ`: strings interleaved with adjustments in thousandths of text space.
/// The whole array becomes one span; wide negative adjustments become spaces.
fn show_array(
    items: &[PdfValue],
    backend: &dyn PdfBackend,
    state: &mut TextState,
    spans: &mut Vec<TextSpan>,
) {
    let mut buf = String::new();
    let (x, y) = (state.text_matrix[4], state.text_matrix[5] + state.text_rise);

    for item in items {
        if let PdfValue::Str(_) = item {
            let fragment = decode(item, backend, state);
            buf.push_str(&fragment);
            state.advance_over(&fragment);
        } else if let Some(adjustment) = item.as_number() {
            let dx = -adjustment / 1000.0 * state.font_size * state.horiz_scale;
            if dx > state.glyph_advance() * TJ_SPACE_RATIO && !buf.is_empty() && !buf.ends_with(' ')
            {
                buf.push(' ');
            }
            state.advance_x(dx);
        }
    }

    let text = buf.trim_end();
    if !text.is_empty() {
        spans.push(state.span(text.to_string(), x, y));
    }
}

/// Join each span onto the previous one when both share a style and
/// baseline and the second starts where the first ends.
///
/// Touching spans are concatenated directly; a gap of at least
/// [`MIN_WORD_GAP`] and under two font sizes becomes a single space.
pub fn merge_runs(spans: Vec<TextSpan>) -> Vec<TextSpan> {
    let mut merged: Vec<TextSpan> = Vec::with_capacity(spans.len());

    for span in spans {
        if let Some(prev) = merged.last_mut() {
            let gap = span.x - prev.end_x();
            if prev.same_style(&span) && gap > -prev.font_size && gap < prev.font_size * 2.0 {
                if gap >= MIN_WORD_GAP && !prev.text.ends_with(' ') && !span.text.starts_with(' ')
                {
                    prev.text.push(' ');
                }
                prev.text.push_str(&span.text);
                prev.width = span.end_x() - prev.x;
                continue;
            }
        }
        merged.push(span);
    }

    merged
}

// ---------------------------------------------------------------------------
// Line reconstruction
// ---------------------------------------------------------------------------

/// Group spans into lines, top of page first, each line left to right.
pub fn group_into_lines(spans: &[TextSpan]) -> Vec<TextLine> {
    let mut sorted: Vec<&TextSpan> = spans.iter().collect();
    sorted.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut lines: Vec<TextLine> = Vec::new();
    for span in sorted {
        match lines.last_mut() {
            Some(line) if (line.y - span.y).abs() < Y_TOLERANCE => line.spans.push(span.clone()),
            _ => lines.push(TextLine {
                spans: vec![span.clone()],
                y: span.y,
            }),
        }
    }

    for line in &mut lines {
        let mut spans = std::mem::take(&mut line.spans);
        spans.sort_by(|a, b| a.x.total_cmp(&b.x));
        line.spans = merge_runs(spans);
    }
    lines
}

/// Plain page text: one line per baseline.
pub fn page_text(spans: &[TextSpan]) -> String {
    group_into_lines(spans)
        .iter()
        .map(TextLine::text)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    // =========================================================================
    // Test backend
    // =========================================================================

    struct ScriptedBackend;

    impl PdfBackend for ScriptedBackend {
        fn pages(&self) -> BTreeMap<u32, PageId> {
            BTreeMap::from([(1, (1, 0))])
        }

        fn page_fonts(&self, _page: PageId) -> Result<Vec<FontResource>, PdfError> {
            Ok(fonts())
        }

        fn page_operations(&self, _page: PageId) -> Result<Vec<ContentOp>, PdfError> {
            Ok(vec![
                op("BT", vec![]),
                op("Tf", vec![name("F2"), PdfValue::Integer(18)]),
                op("Td", vec![PdfValue::Integer(72), PdfValue::Integer(700)]),
                op("Tj", vec![string("Introduction")]),
                op("ET", vec![]),
            ])
        }

        fn decode_text(&self, _font: Option<&FontResource>, bytes: &[u8]) -> String {
            decode_text_simple(bytes)
        }
    }

    fn fonts() -> Vec<FontResource> {
        vec![
            FontResource {
                key: b"F1".to_vec(),
                base_font: Some("Helvetica".to_string()),
                ..Default::default()
            },
            FontResource {
                key: b"F2".to_vec(),
                base_font: Some("Helvetica-Bold".to_string()),
                ..Default::default()
            },
        ]
    }

    fn op(operator: &str, operands: Vec<PdfValue>) -> ContentOp {
        ContentOp {
            operator: operator.to_string(),
            operands,
        }
    }

    fn name(n: &str) -> PdfValue {
        PdfValue::Name(n.as_bytes().to_vec())
    }

    fn string(s: &str) -> PdfValue {
        PdfValue::Str(s.as_bytes().to_vec())
    }

    fn run(ops: Vec<ContentOp>) -> Vec<TextSpan> {
        spans_from_operations(&ScriptedBackend, &ops, &fonts())
    }

    fn span_at(text: &str, x: f32, y: f32) -> TextSpan {
        TextSpan {
            text: text.to_string(),
            x,
            y,
            width: text.chars().count() as f32 * 5.0,
            font_size: 10.0,
            font_name: "Helvetica".to_string(),
            is_bold: false,
        }
    }

    // =========================================================================
    // extract_page_spans
    // =========================================================================

    #[test]
    fn test_extract_page_spans_through_backend() {
        let spans = extract_page_spans(&ScriptedBackend, (1, 0)).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Introduction");
        assert_eq!(spans[0].font_size, 18.0);
        assert!(spans[0].is_bold);
        assert_eq!((spans[0].x, spans[0].y), (72.0, 700.0));
    }

    // =========================================================================
    // Operators
    // =========================================================================

    #[test]
    fn test_tm_scales_font_size() {
        let spans = run(vec![
            op("BT", vec![]),
            op("Tf", vec![name("F1"), PdfValue::Integer(1)]),
            op(
                "Tm",
                [12, 0, 0, 12, 50, 600]
                    .into_iter()
                    .map(PdfValue::Integer)
                    .collect(),
            ),
            op("Tj", vec![string("scaled")]),
            op("ET", vec![]),
        ]);
        assert_eq!(spans[0].font_size, 12.0);
        assert_eq!((spans[0].x, spans[0].y), (50.0, 600.0));
        assert!(!spans[0].is_bold);
    }

    #[test]
    fn test_tstar_and_quote_move_down_by_leading() {
        let spans = run(vec![
            op("BT", vec![]),
            op("Tf", vec![name("F1"), PdfValue::Integer(10)]),
            op("TL", vec![PdfValue::Integer(14)]),
            op("Td", vec![PdfValue::Integer(0), PdfValue::Integer(500)]),
            op("Tj", vec![string("first")]),
            op("T*", vec![]),
            op("Tj", vec![string("second")]),
            op("'", vec![string("third")]),
            op("ET", vec![]),
        ]);
        let ys: Vec<f32> = spans.iter().map(|s| s.y).collect();
        assert_eq!(ys, vec![500.0, 486.0, 472.0]);
    }

    #[test]
    fn test_td_sets_leading() {
        let spans = run(vec![
            op("BT", vec![]),
            op("Tf", vec![name("F1"), PdfValue::Integer(10)]),
            op("Td", vec![PdfValue::Integer(0), PdfValue::Integer(300)]),
            op("TD", vec![PdfValue::Integer(0), PdfValue::Integer(-20)]),
            op("Tj", vec![string("a")]),
            op("T*", vec![]),
            op("Tj", vec![string("b")]),
            op("ET", vec![]),
        ]);
        assert_eq!(spans[0].y, 280.0);
        assert_eq!(spans[1].y, 260.0);
    }

    #[test]
    fn test_double_quote_sets_spacing_and_shows() {
        let spans = run(vec![
            op("BT", vec![]),
            op("Tf", vec![name("F1"), PdfValue::Integer(10)]),
            op("TL", vec![PdfValue::Integer(12)]),
            op(
                "\"",
                vec![PdfValue::Integer(1), PdfValue::Integer(0), string("quoted")],
            ),
            op("ET", vec![]),
        ]);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "quoted");
        assert_eq!(spans[0].y, -12.0);
    }

    #[test]
    fn test_tj_array_inserts_space_on_wide_gap() {
        let spans = run(vec![
            op("BT", vec![]),
            op("Tf", vec![name("F1"), PdfValue::Integer(10)]),
            op(
                "TJ",
                vec![PdfValue::Array(vec![
                    string("Hel"),
                    PdfValue::Integer(-20),
                    string("lo"),
                    PdfValue::Integer(-400),
                    string("world"),
                ])],
            ),
            op("ET", vec![]),
        ]);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Hello world");
    }

    #[test]
    fn test_adjacent_tj_in_one_font_form_one_span() {
        let spans = run(vec![
            op("BT", vec![]),
            op("Tf", vec![name("F1"), PdfValue::Integer(18)]),
            op("Td", vec![PdfValue::Integer(72), PdfValue::Integer(700)]),
            op("Tj", vec![string("Intro")]),
            op("Tj", vec![string("duction")]),
            op("ET", vec![]),
        ]);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Introduction");
        assert_eq!(spans[0].x, 72.0);
        assert_eq!(spans[0].width, 108.0);
    }

    #[test]
    fn test_small_gap_between_runs_becomes_space() {
        let spans = run(vec![
            op("BT", vec![]),
            op("Tf", vec![name("F1"), PdfValue::Integer(10)]),
            op("Td", vec![PdfValue::Integer(72), PdfValue::Integer(700)]),
            op("Tj", vec![string("Hello")]),
            op("Td", vec![PdfValue::Integer(28), PdfValue::Integer(0)]),
            op("Tj", vec![string("world")]),
            op("ET", vec![]),
        ]);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Hello world");
    }

    #[test]
    fn test_runs_split_on_style_or_distance() {
        let spans = run(vec![
            op("BT", vec![]),
            op("Tf", vec![name("F1"), PdfValue::Integer(10)]),
            op("Td", vec![PdfValue::Integer(72), PdfValue::Integer(700)]),
            op("Tj", vec![string("plain")]),
            op("Tf", vec![name("F2"), PdfValue::Integer(10)]),
            op("Tj", vec![string("bold")]),
            op("Td", vec![PdfValue::Integer(300), PdfValue::Integer(0)]),
            op("Tj", vec![string("far")]),
            op("ET", vec![]),
        ]);
        let texts: Vec<&str> = spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["plain", "bold", "far"]);
        assert!(spans[1].is_bold && spans[2].is_bold);
    }

    #[test]
    fn test_text_rise_offsets_y() {
        let spans = run(vec![
            op("BT", vec![]),
            op("Tf", vec![name("F1"), PdfValue::Integer(8)]),
            op("Ts", vec![PdfValue::Integer(3)]),
            op("Td", vec![PdfValue::Integer(0), PdfValue::Integer(100)]),
            op("Tj", vec![string("1")]),
            op("ET", vec![]),
        ]);
        assert_eq!(spans[0].y, 103.0);
    }

    #[test]
    fn test_unknown_font_key_is_not_bold() {
        let spans = run(vec![
            op("BT", vec![]),
            op("Tf", vec![name("F9"), PdfValue::Integer(10)]),
            op("Tj", vec![string("orphan")]),
            op("ET", vec![]),
        ]);
        assert_eq!(spans[0].font_name, "F9");
        assert!(!spans[0].is_bold);
    }

    #[test]
    fn test_empty_strings_emit_nothing() {
        let spans = run(vec![
            op("BT", vec![]),
            op("Tf", vec![name("F1"), PdfValue::Integer(10)]),
            op("Tj", vec![string("")]),
            op("TJ", vec![PdfValue::Array(vec![PdfValue::Integer(-100)])]),
            op("ET", vec![]),
        ]);
        assert!(spans.is_empty());
    }

    #[test]
    fn test_non_text_operators_ignored() {
        let spans = run(vec![
            op("q", vec![]),
            op("re", vec![PdfValue::Integer(0); 4]),
            op("f", vec![]),
            op("Q", vec![]),
        ]);
        assert!(spans.is_empty());
    }

    // =========================================================================
    // Line reconstruction
    // =========================================================================

    #[test]
    fn test_group_into_lines_orders_top_down_left_right() {
        let spans = vec![
            span_at("world", 120.0, 700.0),
            span_at("second", 72.0, 680.0),
            span_at("Hello", 72.0, 700.4),
        ];
        let lines = group_into_lines(&spans);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text(), "Hello world");
        assert_eq!(lines[1].text(), "second");
    }

    #[test]
    fn test_group_into_lines_merges_touching_fragments() {
        let spans = vec![span_at("duction", 97.0, 700.0), span_at("Intro", 72.0, 700.0)];
        let lines = group_into_lines(&spans);
        assert_eq!(lines[0].spans.len(), 1);
        assert_eq!(lines[0].text(), "Introduction");
    }

    #[test]
    fn test_line_text_skips_blank_spans() {
        let spans = vec![
            span_at("left", 72.0, 700.0),
            span_at("", 200.0, 700.0),
            span_at("right", 300.0, 700.0),
        ];
        assert_eq!(page_text(&spans), "left right");
    }

    #[test]
    fn test_page_text_joins_lines() {
        let spans = vec![span_at("bottom", 72.0, 100.0), span_at("top", 72.0, 700.0)];
        assert_eq!(page_text(&spans), "top\nbottom");
        assert_eq!(page_text(&[]), "");
    }
}

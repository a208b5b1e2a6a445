//! Span classification.
//!
//! Two policies exist and both are kept as named strategies:
//!
//! - [`Strategy::Relative`] compares each span against the document's
//!   dominant font size and recognises bullet / numbered-list markers.
//! - [`Strategy::Fixed`] uses absolute point-size cutoffs and is what the
//!   indexing path has always used.
//!
//! Known degenerate case: with `Relative`, a document set in a single font
//! size yields a ratio of 1.0 for every span, so everything that is not a
//! list item collapses to `body` (or `bold`).

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::role::Role;

/// A run of uniformly styled text as delivered by the extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    pub font_size: f32,
    pub is_bold: bool,
    pub page: usize,
}

impl Span {
    pub fn new(text: impl Into<String>, font_size: f32, is_bold: bool, page: usize) -> Self {
        Span {
            text: text.into(),
            font_size,
            is_bold,
            page,
        }
    }
}

/// A [`Span`] with its resolved role. `text` is whitespace-trimmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedSpan {
    pub text: String,
    pub font_size: f32,
    pub is_bold: bool,
    pub page: usize,
    pub role: Role,
}

/// A span classification policy.
pub trait Classifier {
    fn classify(&self, spans: &[Span]) -> Vec<ClassifiedSpan>;
}

/// Ratio thresholds relative to the dominant size.
const TITLE_RATIO: f32 = 1.5;
const HEADING1_RATIO: f32 = 1.2;
const HEADING2_RATIO: f32 = 1.1;
const FOOTNOTE_RATIO: f32 = 0.9;

/// Absolute point-size cutoffs.
const HEADING1_MIN_SIZE: f32 = 14.0;
const HEADING2_MIN_SIZE: f32 = 12.0;
const HEADING3_MIN_SIZE: f32 = 10.0;

/// Classifies by size relative to the most frequent font size in the
/// document, after structural (list marker) checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelativeSizeClassifier;

/// Classifies by fixed point-size thresholds, with no structural checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedThresholdClassifier;

impl Classifier for RelativeSizeClassifier {
    fn classify(&self, spans: &[Span]) -> Vec<ClassifiedSpan> {
        let dominant = dominant_font_size(spans).unwrap_or(0.0);

        spans
            .iter()
            .filter_map(|span| {
                let text = span.text.trim();
                if text.is_empty() {
                    return None;
                }
                let role = structural_role(text)
                    .unwrap_or_else(|| apply_bold(relative_role(span.font_size, dominant), span));
                Some(to_classified(span, text, role))
            })
            .collect()
    }
}

impl Classifier for FixedThresholdClassifier {
    fn classify(&self, spans: &[Span]) -> Vec<ClassifiedSpan> {
        spans
            .iter()
            .filter_map(|span| {
                let text = span.text.trim();
                if text.is_empty() {
                    return None;
                }
                let role = apply_bold(fixed_role(span.font_size), span);
                Some(to_classified(span, text, role))
            })
            .collect()
    }
}

/// Named, selectable classification strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Relative,
    #[default]
    Fixed,
}

impl Strategy {
    pub const ALL: [Strategy; 2] = [Strategy::Relative, Strategy::Fixed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Relative => "relative",
            Strategy::Fixed => "fixed",
        }
    }

    pub fn classifier(&self) -> Box<dyn Classifier> {
        match self {
            Strategy::Relative => Box::new(RelativeSizeClassifier),
            Strategy::Fixed => Box::new(FixedThresholdClassifier),
        }
    }
}

impl Classifier for Strategy {
    fn classify(&self, spans: &[Span]) -> Vec<ClassifiedSpan> {
        self.classifier().classify(spans)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown classification strategy: '{0}' (expected 'relative' or 'fixed')")]
pub struct UnknownStrategy(pub String);

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| UnknownStrategy(s.to_string()))
    }
}

/// Classify a whole document's spans with the given strategy.
pub fn classify(spans: &[Span], strategy: Strategy) -> Vec<ClassifiedSpan> {
    strategy.classify(spans)
}

/// The most frequent font size across all spans.
///
/// Sizes are compared exactly. Ties go to the size encountered first.
/// Returns `None` for an empty document.
pub fn dominant_font_size(spans: &[Span]) -> Option<f32> {
    let mut counts: Vec<(f32, usize)> = Vec::new();
    for span in spans {
        match counts
            .iter_mut()
            .find(|(size, _)| size.to_bits() == span.font_size.to_bits())
        {
            Some((_, count)) => *count += 1,
            None => counts.push((span.font_size, 1)),
        }
    }

    // Strictly-greater keeps the first encountered size on ties.
    let mut best: Option<(f32, usize)> = None;
    for (size, count) in counts {
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((size, count));
        }
    }
    best.map(|(size, _)| size)
}

fn numbered_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.").unwrap())
}

/// Bullet / numbered-list detection on already-trimmed text.
fn structural_role(text: &str) -> Option<Role> {
    if text.starts_with('\u{2022}') || text.starts_with('-') {
        Some(Role::Bullet)
    } else if numbered_marker().is_match(text) {
        Some(Role::NumberedList)
    } else {
        None
    }
}

fn relative_role(font_size: f32, dominant: f32) -> Role {
    let ratio = if dominant > 0.0 {
        font_size / dominant
    } else {
        1.0
    };

    if ratio > TITLE_RATIO {
        Role::Title
    } else if ratio > HEADING1_RATIO {
        Role::Heading1
    } else if ratio > HEADING2_RATIO {
        Role::Heading2
    } else if ratio < FOOTNOTE_RATIO {
        Role::Footnote
    } else {
        Role::Body
    }
}

fn fixed_role(font_size: f32) -> Role {
    if font_size > HEADING1_MIN_SIZE {
        Role::Heading1
    } else if font_size > HEADING2_MIN_SIZE {
        Role::Heading2
    } else if font_size > HEADING3_MIN_SIZE {
        Role::Heading3
    } else {
        Role::Body
    }
}

/// Bold only overrides plain body text.
fn apply_bold(role: Role, span: &Span) -> Role {
    if role == Role::Body && span.is_bold {
        Role::Bold
    } else {
        role
    }
}

fn to_classified(span: &Span, text: &str, role: Role) -> ClassifiedSpan {
    ClassifiedSpan {
        text: text.to_string(),
        font_size: span.font_size,
        is_bold: span.is_bold,
        page: span.page,
        role,
    }
}

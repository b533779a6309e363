//! Script classification: modern text vs. legacy-script text.
//!
//! A text is `Ancient` as soon as one code point falls inside a legacy
//! Unicode block. The family of the first such code point becomes the hint.
//! A manual selection bypasses scanning entirely.

use std::collections::BTreeMap;

use crate::models::{ScriptFamily, ScriptLabel};

/// What the classifier looks at.
#[derive(Debug, Clone, Copy)]
pub enum ClassifierInput<'a> {
    /// Recognized text (auto-detection).
    Text(&'a str),
    /// User selection; always wins.
    Manual(ScriptLabel),
}

/// Legacy-script Unicode ranges, inclusive.
const LEGACY_RANGES: &[(u32, u32, ScriptFamily)] = &[
    (0x1200, 0x137F, ScriptFamily::Ethiopic),
    (0x1380, 0x139F, ScriptFamily::Ethiopic),
    (0x2D80, 0x2DDF, ScriptFamily::Ethiopic),
    (0xAB00, 0xAB2F, ScriptFamily::Ethiopic),
    (0x1E7E0, 0x1E7FF, ScriptFamily::Ethiopic),
    (0x2C80, 0x2CFF, ScriptFamily::Coptic),
    (0x1680, 0x169F, ScriptFamily::Ogham),
    (0x16A0, 0x16FF, ScriptFamily::Runic),
    (0x10000, 0x100FF, ScriptFamily::LinearB),
    (0x10300, 0x1032F, ScriptFamily::OldItalic),
    (0x10330, 0x1034F, ScriptFamily::Gothic),
    (0x10900, 0x1091F, ScriptFamily::Phoenician),
    (0x10A60, 0x10A7F, ScriptFamily::OldSouthArabian),
    (0x12000, 0x1247F, ScriptFamily::Cuneiform),
    (0x13000, 0x1342F, ScriptFamily::EgyptianHieroglyphs),
];

/// Legacy family of a single character, if any.
pub fn legacy_family(ch: char) -> Option<ScriptFamily> {
    let cp = ch as u32;
    LEGACY_RANGES
        .iter()
        .find(|(start, end, _)| (*start..=*end).contains(&cp))
        .map(|(_, _, family)| *family)
}

/// Label a text or pass a manual choice through.
pub fn classify(input: ClassifierInput<'_>) -> ScriptLabel {
    match input {
        ClassifierInput::Manual(label) => label,
        ClassifierInput::Text(text) => match text.chars().find_map(legacy_family) {
            Some(family) => ScriptLabel::Ancient {
                family: Some(family),
            },
            None => ScriptLabel::Modern,
        },
    }
}

/// Per-family count of legacy code points in `text`.
pub fn script_profile(text: &str) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for family in text.chars().filter_map(legacy_family) {
        *counts.entry(family.as_str()).or_insert(0) += 1;
    }
    counts
}

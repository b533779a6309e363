//! Lightweight source-language detection for recognized text.
//!
//! Non-Latin scripts are identified by code-point share. Latin-script text
//! is scored by stopword frequency plus a bonus for language-specific
//! diacritics. The result is only a hint for the translation prompt.

use super::classify::legacy_family;
use crate::models::{ScriptFamily, TargetLanguage};

/// Below this many letters, Latin-script scoring is too noisy to trust.
const MIN_LATIN_LETTERS: usize = 20;

const STOPWORDS: &[(TargetLanguage, &[&str])] = &[
    (
        TargetLanguage::English,
        &[
            "the", "and", "was", "for", "are", "but", "not", "you", "with", "this", "that",
            "have", "from", "they", "will", "is", "of", "to", "in", "which",
        ],
    ),
    (
        TargetLanguage::French,
        &[
            "le", "la", "les", "des", "est", "et", "une", "un", "du", "dans", "pour", "avec",
            "qui", "pas", "sur", "ce", "cette", "au", "aux", "sont", "d", "l", "qu",
        ],
    ),
    (
        TargetLanguage::Spanish,
        &[
            "el", "los", "las", "y", "es", "del", "por", "para", "se", "su", "como", "pero",
            "está", "muy", "al", "lo", "sus",
        ],
    ),
    (
        TargetLanguage::German,
        &[
            "der", "die", "das", "und", "ist", "nicht", "ein", "eine", "mit", "auf", "für",
            "von", "den", "dem", "zu", "sich", "auch", "wir", "ich",
        ],
    ),
    (
        TargetLanguage::Italian,
        &[
            "il", "gli", "di", "che", "è", "per", "non", "della", "sono", "nel", "alla",
            "delle", "anche", "questo", "ma",
        ],
    ),
    (
        TargetLanguage::Portuguese,
        &[
            "o", "os", "um", "uma", "não", "com", "do", "da", "dos", "das", "em", "são", "mas",
            "ao", "pelo", "seu",
        ],
    ),
];

/// Characters that occur in one candidate language and rarely in the others.
fn diacritic_language(ch: char) -> Option<TargetLanguage> {
    match ch {
        'è' | 'ê' | 'ë' | 'î' | 'ï' | 'œ' | 'ù' | 'û' => Some(TargetLanguage::French),
        'ñ' | '¿' | '¡' => Some(TargetLanguage::Spanish),
        'ä' | 'ö' | 'ß' => Some(TargetLanguage::German),
        'ì' | 'ò' => Some(TargetLanguage::Italian),
        'ã' | 'õ' => Some(TargetLanguage::Portuguese),
        _ => None,
    }
}

fn non_latin_language(ch: char) -> Option<TargetLanguage> {
    match ch as u32 {
        0x0600..=0x06FF | 0x0750..=0x077F | 0xFB50..=0xFDFF | 0xFE70..=0xFEFF => {
            Some(TargetLanguage::Arabic)
        }
        0x0900..=0x097F => Some(TargetLanguage::Hindi),
        0x4E00..=0x9FFF | 0x3400..=0x4DBF => Some(TargetLanguage::ChineseSimplified),
        _ if legacy_family(ch) == Some(ScriptFamily::Ethiopic) => Some(TargetLanguage::Amharic),
        _ => None,
    }
}

/// Best guess at the language of `text`, or `None` when there is not
/// enough signal.
pub fn detect_language(text: &str) -> Option<TargetLanguage> {
    let letters: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.is_empty() {
        return None;
    }

    // Dominant non-Latin script wins outright
    let mut script_counts = [0usize; TargetLanguage::ALL.len()];
    for lang in letters.iter().filter_map(|c| non_latin_language(*c)) {
        script_counts[language_index(lang)] += 1;
    }
    if let Some((idx, count)) = script_counts
        .iter()
        .enumerate()
        .max_by_key(|(_, count)| **count)
    {
        if *count * 2 > letters.len() {
            return Some(TargetLanguage::ALL[idx]);
        }
    }

    if letters.len() < MIN_LATIN_LETTERS {
        return None;
    }

    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .collect();

    let mut best: Option<(TargetLanguage, u32)> = None;
    for (lang, stopwords) in STOPWORDS {
        let score = count_stopwords(&words, stopwords) + diacritic_bonus(&lower, *lang);
        if score > 0 && best.map_or(true, |(_, s)| score > s) {
            best = Some((*lang, score));
        }
    }

    best.map(|(lang, _)| lang)
}

fn language_index(lang: TargetLanguage) -> usize {
    TargetLanguage::ALL
        .iter()
        .position(|l| *l == lang)
        .unwrap_or(0)
}

fn count_stopwords(words: &[&str], stopwords: &[&str]) -> u32 {
    words.iter().filter(|w| stopwords.contains(w)).count() as u32
}

/// Every 2 distinctive diacritics = 1 point.
fn diacritic_bonus(lower_text: &str, lang: TargetLanguage) -> u32 {
    let count = lower_text
        .chars()
        .filter(|c| diacritic_language(*c) == Some(lang))
        .count() as u32;
    count / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_english() {
        let text = "The inscription was found near the old temple and it is older than the city walls";
        assert_eq!(detect_language(text), Some(TargetLanguage::English));
    }

    #[test]
    fn detects_french() {
        let text = "Le manuscrit est conservé dans la bibliothèque et les pages sont très fragiles";
        assert_eq!(detect_language(text), Some(TargetLanguage::French));
    }

    #[test]
    fn detects_spanish() {
        let text = "El documento está en el archivo y los textos son muy antiguos para su época";
        assert_eq!(detect_language(text), Some(TargetLanguage::Spanish));
    }

    #[test]
    fn detects_german() {
        let text = "Die Handschrift ist nicht vollständig und der Text auf der Rückseite fehlt";
        assert_eq!(detect_language(text), Some(TargetLanguage::German));
    }

    #[test]
    fn detects_italian() {
        let text = "Il manoscritto della biblioteca non è completo e gli ultimi fogli sono perduti";
        assert_eq!(detect_language(text), Some(TargetLanguage::Italian));
    }

    #[test]
    fn detects_portuguese() {
        let text = "O manuscrito não está completo e os textos das páginas finais são ilegíveis";
        assert_eq!(detect_language(text), Some(TargetLanguage::Portuguese));
    }

    #[test]
    fn detects_non_latin_scripts() {
        assert_eq!(detect_language("مرحبا بالعالم"), Some(TargetLanguage::Arabic));
        assert_eq!(detect_language("नमस्ते दुनिया"), Some(TargetLanguage::Hindi));
        assert_eq!(detect_language("你好世界"), Some(TargetLanguage::ChineseSimplified));
        assert_eq!(detect_language("ሰላም ለዓለም"), Some(TargetLanguage::Amharic));
    }

    #[test]
    fn short_latin_text_is_undetermined() {
        assert_eq!(detect_language("Axum 1923"), None);
        assert_eq!(detect_language(""), None);
        assert_eq!(detect_language("12 34 !!"), None);
    }

    #[test]
    fn no_signal_is_undetermined() {
        assert_eq!(detect_language("Xqzt Wrrbk Plmnv Grtsk Hjklm"), None);
    }

    #[test]
    fn stopword_counting_is_whole_word() {
        let lower = "there theme other";
        let words: Vec<&str> = lower.split(' ').collect();
        assert_eq!(count_stopwords(&words, &["the"]), 0);
    }
}

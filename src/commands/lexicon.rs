//! `lexicon`: curate and query the character lexicon.

use crate::core_state::CoreState;
use crate::lexicon::LexiconEntry;

/// Insert or overwrite one entry and persist the lexicon file.
pub fn add_entry(
    state: &CoreState,
    character: &str,
    transliteration: &str,
    meaning: &str,
) -> Result<LexiconEntry, String> {
    state
        .add_lexicon_entry(character, transliteration, meaning)
        .map_err(|e| e.to_string())
}

/// Entries whose character or transliteration contains `query`.
pub fn search_entries(state: &CoreState, query: &str) -> Result<Vec<LexiconEntry>, String> {
    state.search_lexicon(query.trim()).map_err(|e| e.to_string())
}

/// One entry by exact character key.
pub fn show_entry(state: &CoreState, character: &str) -> Result<LexiconEntry, String> {
    state
        .lookup_lexicon(character)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("No lexicon entry for '{character}'"))
}

/// Every entry, ordered by character.
pub fn list_entries(state: &CoreState) -> Result<Vec<LexiconEntry>, String> {
    let lexicon = state.read_lexicon().map_err(|e| e.to_string())?;
    Ok(lexicon.entries().collect())
}

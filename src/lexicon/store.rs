use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::LexiconError;

/// Value side of one lexicon mapping, as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gloss {
    #[serde(default)]
    pub transliteration: String,
    #[serde(default)]
    pub meaning: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LexiconEntry {
    pub character: String,
    pub transliteration: String,
    pub meaning: String,
}

impl LexiconEntry {
    fn from_pair(character: &str, gloss: &Gloss) -> Self {
        Self {
            character: character.to_string(),
            transliteration: gloss.transliteration.clone(),
            meaning: gloss.meaning.clone(),
        }
    }
}

/// Character → {transliteration, meaning} mapping backed by a JSON file.
///
/// Loaded fully into memory; every edit rewrites the whole file.
#[derive(Debug, Clone, Default)]
pub struct LexiconStore {
    path: PathBuf,
    entries: BTreeMap<String, Gloss>,
}

impl LexiconStore {
    /// Load the lexicon. A missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self, LexiconError> {
        let entries = match std::fs::read_to_string(path) {
            Ok(data) if data.trim().is_empty() => BTreeMap::new(),
            Ok(data) => serde_json::from_str(&data).map_err(|source| LexiconError::Parse {
                path: path.to_path_buf(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No lexicon file yet, starting empty");
                BTreeMap::new()
            }
            Err(source) => {
                return Err(LexiconError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        tracing::debug!(path = %path.display(), entries = entries.len(), "Lexicon loaded");
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// In-memory store that is never written anywhere meaningful (tests).
    pub fn in_memory(entries: impl IntoIterator<Item = LexiconEntry>) -> Self {
        Self {
            path: PathBuf::new(),
            entries: entries
                .into_iter()
                .map(|e| {
                    (
                        e.character,
                        Gloss {
                            transliteration: e.transliteration,
                            meaning: e.meaning,
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, character: &str) -> Option<LexiconEntry> {
        self.entries
            .get(character)
            .map(|gloss| LexiconEntry::from_pair(character, gloss))
    }

    /// Entries whose character or transliteration contains `query`.
    pub fn search(&self, query: &str) -> Vec<LexiconEntry> {
        if query.is_empty() {
            return Vec::new();
        }
        self.entries
            .iter()
            .filter(|(character, gloss)| {
                character.contains(query) || gloss.transliteration.contains(query)
            })
            .map(|(character, gloss)| LexiconEntry::from_pair(character, gloss))
            .collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = LexiconEntry> + '_ {
        self.entries
            .iter()
            .map(|(character, gloss)| LexiconEntry::from_pair(character, gloss))
    }

    /// Insert or overwrite an entry, then rewrite the backing file.
    ///
    /// Values are stored exactly as given; only an all-blank key is refused.
    pub fn add(
        &mut self,
        character: &str,
        transliteration: &str,
        meaning: &str,
    ) -> Result<LexiconEntry, LexiconError> {
        if character.trim().is_empty() {
            return Err(LexiconError::EmptyKey);
        }
        let key = character;

        let previous = self.entries.insert(
            key.to_string(),
            Gloss {
                transliteration: transliteration.to_string(),
                meaning: meaning.to_string(),
            },
        );

        if let Err(e) = self.save() {
            // Keep memory consistent with what is on disk
            match previous {
                Some(gloss) => self.entries.insert(key.to_string(), gloss),
                None => self.entries.remove(key),
            };
            return Err(e);
        }

        tracing::info!(character = key, replaced = previous.is_some(), "Lexicon entry saved");
        self.lookup(key).ok_or(LexiconError::EmptyKey)
    }

    /// Write the full mapping to disk via a temp file in the same directory.
    pub fn save(&self) -> Result<(), LexiconError> {
        let io_err = |source| LexiconError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(dir) => dir.to_path_buf(),
            None => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(io_err)?;

        let json =
            serde_json::to_string_pretty(&self.entries).map_err(|source| LexiconError::Parse {
                path: self.path.clone(),
                source,
            })?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(io_err)?;
        tmp.write_all(json.as_bytes()).map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(c: &str, t: &str, m: &str) -> LexiconEntry {
        LexiconEntry {
            character: c.into(),
            transliteration: t.into(),
            meaning: m.into(),
        }
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LexiconStore::load(&dir.path().join("geez_dict.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geez_dict.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(LexiconStore::load(&path), Err(LexiconError::Parse { .. })));
    }

    #[test]
    fn loads_existing_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geez_dict.json");
        std::fs::write(
            &path,
            r#"{"ሀ": {"transliteration": "hä", "meaning": "first letter"}, "ለ": {"transliteration": "lä"}}"#,
        )
        .unwrap();

        let store = LexiconStore::load(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.lookup("ሀ").unwrap().meaning, "first letter");
        assert_eq!(store.lookup("ለ").unwrap().meaning, "");
    }

    #[test]
    fn added_entry_is_immediately_retrievable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geez_dict.json");
        let mut store = LexiconStore::load(&path).unwrap();

        store.add("ሰ", "sä", "letter sa").unwrap();
        let found = store.lookup("ሰ").unwrap();
        assert_eq!(found, entry("ሰ", "sä", "letter sa"));

        // And the file on disk agrees
        let reloaded = LexiconStore::load(&path).unwrap();
        assert_eq!(reloaded.lookup("ሰ").unwrap(), found);
    }

    #[test]
    fn add_overwrites_existing_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geez_dict.json");
        let mut store = LexiconStore::load(&path).unwrap();
        store.add("ሀ", "ha", "old").unwrap();
        store.add("ሀ", "hä", "new").unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.lookup("ሀ").unwrap().meaning, "new");
    }

    #[test]
    fn add_rejects_blank_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LexiconStore::load(&dir.path().join("d.json")).unwrap();
        assert!(matches!(store.add("  ", "x", "y"), Err(LexiconError::EmptyKey)));
        assert!(store.is_empty());
    }

    #[test]
    fn add_stores_values_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geez_dict.json");
        let mut store = LexiconStore::load(&path).unwrap();
        store.add("ሀ ", " hä", "first letter ").unwrap();

        let expected = entry("ሀ ", " hä", "first letter ");
        assert_eq!(store.lookup("ሀ ").unwrap(), expected);
        assert!(store.lookup("ሀ").is_none());

        let reloaded = LexiconStore::load(&path).unwrap();
        assert_eq!(reloaded.lookup("ሀ ").unwrap(), expected);
    }

    #[test]
    fn file_keeps_non_ascii_characters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geez_dict.json");
        let mut store = LexiconStore::load(&path).unwrap();
        store.add("ፀ", "ṣ́ä", "").unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("ፀ"));
        assert!(raw.contains("ṣ́ä"));
    }

    #[test]
    fn search_matches_character_or_transliteration() {
        let store = LexiconStore::in_memory(vec![
            entry("ሀ", "hä", "h"),
            entry("ለ", "lä", "l"),
            entry("መ", "mä", "m"),
        ]);
        let by_translit = store.search("lä");
        assert_eq!(by_translit.len(), 1);
        assert_eq!(by_translit[0].character, "ለ");

        let by_char = store.search("መ");
        assert_eq!(by_char.len(), 1);

        assert_eq!(store.search("ä").len(), 3);
        assert!(store.search("").is_empty());
        assert!(store.search("zz").is_empty());
    }
}

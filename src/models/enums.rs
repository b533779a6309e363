use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(ScriptFamily {
    Ethiopic => "ethiopic",
    Coptic => "coptic",
    Runic => "runic",
    Ogham => "ogham",
    OldItalic => "old_italic",
    Gothic => "gothic",
    LinearB => "linear_b",
    Phoenician => "phoenician",
    OldSouthArabian => "old_south_arabian",
    Cuneiform => "cuneiform",
    EgyptianHieroglyphs => "egyptian_hieroglyphs",
});

impl ScriptFamily {
    /// Human-readable name, used in prompts and CLI output.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Ethiopic => "Ethiopic (Geʿez)",
            Self::Coptic => "Coptic",
            Self::Runic => "Runic",
            Self::Ogham => "Ogham",
            Self::OldItalic => "Old Italic",
            Self::Gothic => "Gothic",
            Self::LinearB => "Linear B",
            Self::Phoenician => "Phoenician",
            Self::OldSouthArabian => "Old South Arabian",
            Self::Cuneiform => "Cuneiform",
            Self::EgyptianHieroglyphs => "Egyptian Hieroglyphs",
        }
    }
}

str_enum!(ExtractionMethod {
    LocalOcr => "local_ocr",
    RemoteVision => "remote_vision",
});

str_enum!(TargetLanguage {
    English => "eng",
    French => "fra",
    Spanish => "spa",
    German => "deu",
    Italian => "ita",
    Portuguese => "por",
    Arabic => "ara",
    ChineseSimplified => "chi_sim",
    Hindi => "hin",
    Amharic => "amh",
});

impl TargetLanguage {
    pub const ALL: [TargetLanguage; 10] = [
        Self::English,
        Self::French,
        Self::Spanish,
        Self::German,
        Self::Italian,
        Self::Portuguese,
        Self::Arabic,
        Self::ChineseSimplified,
        Self::Hindi,
        Self::Amharic,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::French => "French",
            Self::Spanish => "Spanish",
            Self::German => "German",
            Self::Italian => "Italian",
            Self::Portuguese => "Portuguese",
            Self::Arabic => "Arabic",
            Self::ChineseSimplified => "Chinese (Simplified)",
            Self::Hindi => "Hindi",
            Self::Amharic => "Amharic",
        }
    }

    /// Accepts either the Tesseract-style code ("fra") or the display name
    /// ("French"), case-insensitive.
    pub fn parse_loose(input: &str) -> Option<Self> {
        let needle = input.trim();
        Self::ALL.into_iter().find(|lang| {
            lang.as_str().eq_ignore_ascii_case(needle)
                || lang.display_name().eq_ignore_ascii_case(needle)
        })
    }
}

impl Default for TargetLanguage {
    fn default() -> Self {
        Self::French
    }
}

/// Classification of the text in one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScriptLabel {
    Modern,
    Ancient { family: Option<ScriptFamily> },
    Unknown,
}

impl ScriptLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Modern => "modern",
            Self::Ancient { .. } => "ancient",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_ancient(&self) -> bool {
        matches!(self, Self::Ancient { .. })
    }

    pub fn family(&self) -> Option<ScriptFamily> {
        match self {
            Self::Ancient { family } => *family,
            _ => None,
        }
    }
}

impl std::fmt::Display for ScriptLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.family() {
            Some(family) => write!(f, "ancient ({})", family.display_name()),
            None => f.write_str(self.as_str()),
        }
    }
}

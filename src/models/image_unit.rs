use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InputError {
    #[error("No image provided")]
    NoImages,

    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Could not read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported image type for {name}: {media_type} (expected JPEG or PNG)")]
    UnsupportedMediaType { name: String, media_type: String },

    #[error("Image {0} is empty")]
    Empty(String),

    #[error("Could not decode {name}: {reason}")]
    Undecodable { name: String, reason: String },

    #[error("{name} is declared as {declared} but its content is {actual}")]
    MediaTypeMismatch {
        name: String,
        declared: &'static str,
        actual: String,
    },
}

/// Accepted upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MediaType {
    Jpeg,
    Png,
}

impl MediaType {
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            _ => None,
        }
    }
}

/// One uploaded image. Immutable once built; dropped when its pipeline run ends.
#[derive(Debug, Clone)]
pub struct ImageUnit {
    name: String,
    media_type: MediaType,
    bytes: Vec<u8>,
}

impl ImageUnit {
    pub fn new(
        name: impl Into<String>,
        media_type: MediaType,
        bytes: Vec<u8>,
    ) -> Result<Self, InputError> {
        let name = name.into();
        if bytes.is_empty() {
            return Err(InputError::Empty(name));
        }
        Ok(Self {
            name,
            media_type,
            bytes,
        })
    }

    /// Read an image from disk. The media type is guessed from the extension.
    pub fn from_path(path: &Path) -> Result<Self, InputError> {
        if !path.exists() {
            return Err(InputError::NotFound(path.to_path_buf()));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let guessed = mime_guess::from_path(path).first_or_octet_stream();
        let media_type = MediaType::from_mime(guessed.essence_str()).ok_or_else(|| {
            InputError::UnsupportedMediaType {
                name: name.clone(),
                media_type: guessed.essence_str().to_string(),
            }
        })?;

        let bytes = std::fs::read(path).map_err(|source| InputError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        Self::new(name, media_type, bytes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_payload() {
        let result = ImageUnit::new("blank.png", MediaType::Png, vec![]);
        assert!(matches!(result, Err(InputError::Empty(name)) if name == "blank.png"));
    }

    #[test]
    fn from_path_guesses_media_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stele.JPG");
        std::fs::write(&path, b"\xFF\xD8\xFFfake").unwrap();

        let unit = ImageUnit::from_path(&path).unwrap();
        assert_eq!(unit.name(), "stele.JPG");
        assert_eq!(unit.media_type(), MediaType::Jpeg);
        assert_eq!(unit.bytes().len(), 7);
    }

    #[test]
    fn from_path_rejects_other_formats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let result = ImageUnit::from_path(&path);
        assert!(matches!(result, Err(InputError::UnsupportedMediaType { .. })));
    }

    #[test]
    fn from_path_reports_missing_file() {
        let result = ImageUnit::from_path(Path::new("/nonexistent/scan.png"));
        assert!(matches!(result, Err(InputError::NotFound(_))));
    }

    #[test]
    fn media_type_mime_round_trip() {
        assert_eq!(MediaType::from_mime(MediaType::Png.mime()), Some(MediaType::Png));
        assert_eq!(MediaType::from_mime("image/jpg"), Some(MediaType::Jpeg));
        assert_eq!(MediaType::from_mime("image/gif"), None);
    }
}

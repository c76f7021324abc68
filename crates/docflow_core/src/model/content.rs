//! Document content as a tagged union of inline text or an encoded file.
//!
//! # Responsibility
//! - Represent content explicitly instead of as a marker-prefixed string.
//! - Own the encode/decode rules for the JSON wire and legacy marker input.
//!
//! # Invariants
//! - File bytes round-trip byte-for-byte through every boundary.
//! - Core never inspects text or file payloads beyond these codecs.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static FILE_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^file:([^;]*);type:([^;]*);data:(.*)$").expect("valid file marker regex")
});

/// Document body: inline text or an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "WireContent", try_from = "WireContent")]
pub enum DocumentContent {
    Text(String),
    File {
        name: String,
        mime: String,
        bytes: Vec<u8>,
    },
}

/// Content decode failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    EmptyFileName,
    InvalidBase64 { name: String, reason: String },
}

impl Display for ContentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyFileName => write!(f, "file content requires a non-empty file name"),
            Self::InvalidBase64 { name, reason } => {
                write!(f, "file `{name}` carries invalid base64 data: {reason}")
            }
        }
    }
}

impl Error for ContentError {}

impl DocumentContent {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn file(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::File {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Interprets caller input.
    ///
    /// Input shaped like `file:<name>;type:<mime>;data:<base64>` decodes into
    /// `File`; anything else is kept verbatim as `Text`.
    pub fn from_input(value: &str) -> Result<Self, ContentError> {
        let Some(caps) = FILE_MARKER_RE.captures(value) else {
            return Ok(Self::Text(value.to_string()));
        };

        let name = caps.get(1).map_or("", |m| m.as_str()).trim();
        if name.is_empty() {
            return Err(ContentError::EmptyFileName);
        }
        let mime = caps.get(2).map_or("", |m| m.as_str()).trim();
        let data = caps.get(3).map_or("", |m| m.as_str());
        let bytes = decode_base64(name, data)?;

        Ok(Self::File {
            name: name.to_string(),
            mime: if mime.is_empty() {
                "application/octet-stream".to_string()
            } else {
                mime.to_string()
            },
            bytes,
        })
    }

    /// Renders file content in marker form; `None` for text.
    pub fn to_marker(&self) -> Option<String> {
        match self {
            Self::Text(_) => None,
            Self::File { name, mime, bytes } => Some(format!(
                "file:{name};type:{mime};data:{}",
                STANDARD.encode(bytes)
            )),
        }
    }

    /// Stable kind label used in storage and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::File { .. } => "file",
        }
    }

    /// Payload size in bytes, for metadata-only logging.
    pub fn byte_len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::File { bytes, .. } => bytes.len(),
        }
    }
}

impl Default for DocumentContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

/// JSON shape exchanged with the remote backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum WireContent {
    Text { text: String },
    File { name: String, mime: String, data: String },
}

impl From<DocumentContent> for WireContent {
    fn from(value: DocumentContent) -> Self {
        match value {
            DocumentContent::Text(text) => Self::Text { text },
            DocumentContent::File { name, mime, bytes } => Self::File {
                name,
                mime,
                data: STANDARD.encode(bytes),
            },
        }
    }
}

impl TryFrom<WireContent> for DocumentContent {
    type Error = ContentError;

    fn try_from(value: WireContent) -> Result<Self, Self::Error> {
        match value {
            WireContent::Text { text } => Ok(Self::Text(text)),
            WireContent::File { name, mime, data } => {
                let bytes = decode_base64(&name, &data)?;
                Ok(Self::File { name, mime, bytes })
            }
        }
    }
}

fn decode_base64(name: &str, data: &str) -> Result<Vec<u8>, ContentError> {
    let compact: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|err| ContentError::InvalidBase64 {
            name: name.to_string(),
            reason: err.to_string(),
        })
}

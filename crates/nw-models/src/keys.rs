//! Object storage key derivation.
//!
//! Uploaded recordings live under `videos/{timestamp_ms}_{file_name}` and the
//! pipeline writes the generated markdown to `documents/{stem}.md`, where the
//! stem is the upload's last path segment without its extension.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Namespace for uploaded recordings.
pub const VIDEOS_PREFIX: &str = "videos/";

/// Namespace for generated documents.
pub const DOCUMENTS_PREFIX: &str = "documents/";

/// Extension of generated documents.
const DOCUMENT_EXTENSION: &str = ".md";

/// Maximum length of a sanitized file name.
const MAX_FILE_NAME_LEN: usize = 200;

/// Longest extension kept when truncating a file name.
const MAX_EXTENSION_LEN: usize = 16;

/// Maximum length of a document stem.
const MAX_STEM_LEN: usize = 255;

/// Used when nothing survives sanitization.
const FALLBACK_FILE_NAME: &str = "upload";

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]").unwrap());

/// Reduce a client-supplied file name to a safe single path segment.
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let cleaned = UNSAFE_CHARS.replace_all(base, "_");
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        return FALLBACK_FILE_NAME.to_string();
    }
    if cleaned.len() <= MAX_FILE_NAME_LEN {
        return cleaned.to_string();
    }

    // Sanitized names are ASCII, so byte slicing is safe.
    match cleaned.rfind('.') {
        Some(dot) if cleaned.len() - dot <= MAX_EXTENSION_LEN => {
            let extension = &cleaned[dot..];
            let keep = MAX_FILE_NAME_LEN - extension.len();
            format!("{}{}", &cleaned[..keep], extension)
        }
        _ => cleaned[..MAX_FILE_NAME_LEN].to_string(),
    }
}

/// Last path segment of a key with its final extension removed.
pub fn file_stem(key: &str) -> &str {
    let segment = key.rsplit('/').next().unwrap_or(key);
    match segment.rfind('.') {
        Some(dot) if dot > 0 && dot + 1 < segment.len() => &segment[..dot],
        _ => segment,
    }
}

/// Name of a generated document, without namespace or extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct DocumentStem(String);

impl DocumentStem {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentStem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validate a stem submitted for document lookup.
pub fn validate_stem(stem: &str) -> ModelResult<DocumentStem> {
    let stem = stem.trim();
    if stem.is_empty() {
        return Err(ModelError::invalid_stem("name cannot be empty"));
    }
    if stem.len() > MAX_STEM_LEN {
        return Err(ModelError::invalid_stem(format!(
            "name exceeds {} bytes",
            MAX_STEM_LEN
        )));
    }
    if stem.contains('/') || stem.contains('\\') || stem.contains("..") {
        return Err(ModelError::invalid_stem("name must be a single path segment"));
    }
    if stem.chars().any(char::is_control) {
        return Err(ModelError::invalid_stem("name contains control characters"));
    }
    Ok(DocumentStem(stem.to_string()))
}

/// Storage key of the generated document for a stem.
pub fn document_key(stem: &DocumentStem) -> String {
    format!("{}{}{}", DOCUMENTS_PREFIX, stem.as_str(), DOCUMENT_EXTENSION)
}

/// Storage key of an uploaded recording.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct UploadKey(String);

impl UploadKey {
    /// Build the key for `file_name` uploaded at `timestamp_ms`.
    pub fn derive(file_name: &str, timestamp_ms: i64) -> Self {
        Self(format!(
            "{}{}_{}",
            VIDEOS_PREFIX,
            timestamp_ms,
            sanitize_file_name(file_name)
        ))
    }

    /// Accept a key returned by the server.
    pub fn parse(key: &str) -> ModelResult<Self> {
        match key.strip_prefix(VIDEOS_PREFIX) {
            Some(name) if !name.is_empty() && !name.contains('/') => Ok(Self(key.to_string())),
            _ => Err(ModelError::invalid_key(key)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Stem shared with the generated document.
    pub fn stem(&self) -> DocumentStem {
        DocumentStem(file_stem(&self.0).to_string())
    }
}

impl fmt::Display for UploadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out strictly increasing millisecond timestamps for upload keys.
///
/// Two derivations never share a timestamp, even within the same
/// millisecond, so keys for identical file names never collide.
#[derive(Debug, Default)]
pub struct KeyClock {
    last_ms: AtomicI64,
}

impl KeyClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive an upload key stamped with the current time.
    pub fn derive(&self, file_name: &str) -> UploadKey {
        self.derive_at(file_name, Utc::now().timestamp_millis())
    }

    /// Derive an upload key as if the wall clock read `now_ms`.
    pub fn derive_at(&self, file_name: &str, now_ms: i64) -> UploadKey {
        UploadKey::derive(file_name, self.next_millis(now_ms))
    }

    fn next_millis(&self, now_ms: i64) -> i64 {
        let mut issued = now_ms;
        let _ = self
            .last_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                issued = now_ms.max(last + 1);
                Some(issued)
            });
        issued
    }
}

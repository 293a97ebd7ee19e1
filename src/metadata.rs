//! Metadata parsing and precedence rules.
//!
//! `index.json` documents are parsed leniently into [`ComicMetadata`]; the
//! resolver then folds chapter-level and collection-level records into the
//! [`EffectiveMetadata`] written into each output document.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::path_utils::strip_archive_extension;
use crate::types::{ComicMetadata, EffectiveMetadata};

/// Strings are kept, scalars are stringified, everything else counts as absent.
fn lenient_string(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl ComicMetadata {
    /// Parses an `index.json` document.
    ///
    /// Bytes are decoded as UTF-8 (lossily) and a leading byte-order mark is
    /// ignored. Anything other than a JSON object is a [`Error::MetadataParse`].
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self> {
        let text = String::from_utf8_lossy(bytes);
        let text = text.trim_start_matches('\u{feff}');
        let value: Value =
            serde_json::from_str(text).map_err(|e| Error::MetadataParse(e.to_string()))?;
        let Value::Object(mut fields) = value else {
            return Err(Error::MetadataParse("expected a JSON object".to_string()));
        };
        Ok(ComicMetadata {
            title: lenient_string(fields.remove("title")),
            author: lenient_string(fields.remove("author")),
            publisher: lenient_string(fields.remove("publisher")),
        })
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}

/// Resolves the metadata for one document.
///
/// The title comes from the chapter record, falling back to `file_name` with its
/// archive extension removed; the collection title is never used. Author and
/// publisher prefer the chapter record and fall back to the collection record.
pub fn resolve(
    chapter: Option<&ComicMetadata>,
    collection: Option<&ComicMetadata>,
    file_name: &str,
) -> EffectiveMetadata {
    let pick = |field: fn(&ComicMetadata) -> &Option<String>| -> Option<String> {
        chapter
            .and_then(|m| present(field(m)))
            .or_else(|| collection.and_then(|m| present(field(m))))
            .map(str::to_string)
    };

    let title = chapter
        .and_then(|m| present(&m.title))
        .map(str::to_string)
        .unwrap_or_else(|| strip_archive_extension(file_name).to_string());

    EffectiveMetadata {
        title,
        author: pick(|m| &m.author),
        publisher: pick(|m| &m.publisher),
    }
}

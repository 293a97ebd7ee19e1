//! File-name utilities for output documents and source archives.
//!
//! Resolved titles end up as file-name components, so they are sanitized here
//! and made unique within a batch.

use std::collections::HashSet;
use std::path::Path;

use crate::types::CHAPTER_SUFFIX;

/// Fallback stem when a title sanitizes down to nothing.
const UNTITLED: &str = "Untitled";

/// Archive suffixes stripped when a title is derived from a file name.
const ARCHIVE_SUFFIXES: [&str; 2] = [CHAPTER_SUFFIX, ".zip"];

/// Gets the file name from a path with fallback to lossy conversion.
///
/// # Arguments
///
/// * `path` - The path to extract the file name from
///
/// # Returns
///
/// * `String` - The file name, or "unknown" if the path has none
pub fn get_file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Checks if the last component of a `/`-separated entry name starts with a dot,
/// or if the entry lives under a `__MACOSX` resource-fork folder.
pub fn is_hidden_entry(name: &str) -> bool {
    name.split('/').any(|part| part == "__MACOSX")
        || name
            .rsplit('/')
            .next()
            .map(|last| last.starts_with('.'))
            .unwrap_or(false)
}

/// Removes a trailing `.cbz` or `.zip` suffix, compared case-insensitively.
pub fn strip_archive_extension(file_name: &str) -> &str {
    for suffix in ARCHIVE_SUFFIXES {
        if file_name.len() > suffix.len() {
            let split = file_name.len() - suffix.len();
            if file_name.is_char_boundary(split)
                && file_name[split..].eq_ignore_ascii_case(suffix)
            {
                return &file_name[..split];
            }
        }
    }
    file_name
}

/// Sanitizes a filename by replacing invalid characters with safe alternatives.
///
/// Surrounding whitespace and trailing dots are trimmed; an empty result
/// becomes "Untitled".
pub fn sanitize_filename(filename: &str) -> String {
    let replaced: String = filename
        .chars()
        .map(|c| match c {
            '<' | '>' | '"' | '|' | '?' | '*' => '-',
            ':' => '-',
            '/' | '\\' => '-',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = replaced.trim().trim_end_matches('.').trim_end();
    if trimmed.is_empty() {
        UNTITLED.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Hands out file stems that do not collide, ignoring case.
///
/// The first claim of a stem returns it unchanged; later claims get
/// ` (2)`, ` (3)`, ... appended.
#[derive(Debug, Default)]
pub struct UniqueNames {
    used: HashSet<String>,
}

impl UniqueNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, stem: &str) -> String {
        if self.used.insert(stem.to_lowercase()) {
            return stem.to_string();
        }
        let mut counter = 2;
        loop {
            let candidate = format!("{} ({})", stem, counter);
            if self.used.insert(candidate.to_lowercase()) {
                return candidate;
            }
            counter += 1;
        }
    }
}

//! Ordering of pages and chapters, and discovery of collection folders.
//!
//! Pages inside an archive and chapter archives inside a collection share one
//! ordering rule: ascending by lowercased name, compared by code point. The sort
//! is not numeric-aware, so `10.jpg` sorts before `2.jpg` unless names are
//! zero-padded.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use log::{debug, info, warn};
use rayon::prelude::*;
use regex::Regex;
use tokio::fs::{metadata, read_dir};

use crate::error::{Error, Result};
use crate::path_utils::get_file_name_lossy;
use crate::types::{CHAPTER_SUFFIX, ComicMetadata, METADATA_FILE_NAME};

lazy_static! {
    /// Matches the shared cover image of a collection, ignoring case.
    pub static ref COVER_NAME_REGEX: Regex =
        Regex::new(r"(?i)^cover\.(jpg|jpeg|png|gif|bmp|webp)$").unwrap();
}

/// Compares two names by their lowercased form, code point by code point.
pub fn compare_lowercase(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Sorts `items` by the lowercased name returned from `name`.
///
/// The sort is stable: items whose lowercased names are equal keep their
/// original relative order.
pub fn sort_by_lowercase_name<T, F>(items: &mut [T], name: F)
where
    T: Send,
    F: Fn(&T) -> &str + Sync,
{
    items.par_sort_by(|a, b| compare_lowercase(name(a), name(b)));
}

/// Orders the `(name, bytes)` page pairs of one archive into draw order.
pub fn order_pages(pages: &mut [(String, Vec<u8>)]) {
    sort_by_lowercase_name(pages, |(name, _)| name.as_str());
}

/// The classified children of a collection folder.
#[derive(Debug, Clone, Default)]
pub struct CollectionEntries {
    pub metadata: Option<ComicMetadata>,
    pub cover_path: Option<PathBuf>,
    /// Chapter archives, already in processing order.
    pub chapters: Vec<PathBuf>,
}

/// Scans a collection folder for chapter archives, shared metadata and a cover.
#[derive(Debug)]
pub struct Collector<'a> {
    base_directory: &'a Path,
}

impl<'a> Collector<'a> {
    /// Creates a new Collector for the given collection folder.
    pub fn new(base_directory: &'a Path) -> Self {
        Self { base_directory }
    }

    /// Lists the regular files directly inside the collection, in lowercase-name order.
    async fn list_files(&self) -> Result<Vec<PathBuf>> {
        let mut entries = read_dir(self.base_directory).await.map_err(|e| {
            Error::InvalidPath(
                self.base_directory.to_path_buf(),
                format!("Cannot read collection folder: {}", e),
            )
        })?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            // Follows symlinks, so linked chapters and covers count as files.
            match metadata(&path).await {
                Ok(meta) if meta.is_file() => files.push(path),
                Ok(_) => debug!("Skipping non-file entry {:?}", path),
                Err(e) => warn!("Skipping unreadable entry {:?}: {}", path, e),
            }
        }

        let mut named: Vec<(String, PathBuf)> = files
            .into_iter()
            .map(|path| (get_file_name_lossy(&path), path))
            .collect();
        sort_by_lowercase_name(&mut named, |(name, _)| name.as_str());
        Ok(named.into_iter().map(|(_, path)| path).collect())
    }

    /// Classifies the collection's children.
    ///
    /// A malformed `index.json` is logged and treated as absent. Among several
    /// metadata or cover candidates, the last one in name order wins.
    pub async fn collect(&self) -> Result<CollectionEntries> {
        let mut collected = CollectionEntries::default();

        for path in self.list_files().await? {
            let name = get_file_name_lossy(&path);
            if name.eq_ignore_ascii_case(METADATA_FILE_NAME) {
                let bytes = tokio::fs::read(&path).await?;
                collected.metadata = match ComicMetadata::from_json_bytes(&bytes) {
                    Ok(parsed) => Some(parsed),
                    Err(e) => {
                        warn!("Ignoring collection metadata {:?}: {}", path, e);
                        None
                    }
                };
            } else if COVER_NAME_REGEX.is_match(&name) {
                collected.cover_path = Some(path);
            } else if is_chapter_name(&name) {
                collected.chapters.push(path);
            }
        }

        if collected.chapters.is_empty() {
            return Err(Error::NoChapters(self.base_directory.to_path_buf()));
        }

        info!(
            "Found {} chapter(s) in {:?} (metadata: {}, cover: {})",
            collected.chapters.len(),
            self.base_directory,
            collected.metadata.is_some(),
            collected.cover_path.is_some()
        );
        Ok(collected)
    }
}

fn is_chapter_name(name: &str) -> bool {
    name.len() > CHAPTER_SUFFIX.len()
        && name.is_char_boundary(name.len() - CHAPTER_SUFFIX.len())
        && name[name.len() - CHAPTER_SUFFIX.len()..].eq_ignore_ascii_case(CHAPTER_SUFFIX)
}

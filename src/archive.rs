//! ZIP reader and entry classifier.
//!
//! Archives are opened through their central directory and read one entry at a
//! time in archive order, so only the entry being read is held in memory.
//! Entries whose sizes live in a trailing data descriptor are read like any
//! other. Each entry is classified by name as a page image, the `index.json`
//! metadata document, or noise.

use std::collections::HashMap;
use std::io::{Read, Seek};

use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::path_utils::is_hidden_entry;
use crate::types::{ClassifiedContent, ComicMetadata, METADATA_FILE_NAME, RawEntry};

/// Upper bound for the up-front buffer reservation taken from an entry header.
const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

lazy_static! {
    /// Matches entry names with a supported image extension, ignoring case.
    pub static ref PAGE_NAME_REGEX: Regex =
        Regex::new(r"(?i)\.(jpg|jpeg|png|gif|bmp|webp)$").unwrap();
}

/// What an archive entry is, judged by its name alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Metadata,
    Page,
    Ignored,
}

/// Classifies an entry name.
pub fn classify_entry_name(name: &str) -> EntryKind {
    if is_hidden_entry(name) {
        EntryKind::Ignored
    } else if name.eq_ignore_ascii_case(METADATA_FILE_NAME) {
        EntryKind::Metadata
    } else if PAGE_NAME_REGEX.is_match(name) {
        EntryKind::Page
    } else {
        EntryKind::Ignored
    }
}

/// Splits a sequence of entries into page candidates and the metadata document.
///
/// Pages keep archive order; a repeated page name replaces the earlier bytes in
/// place. A malformed `index.json` is logged and treated as absent.
pub fn classify_entries<I>(archive_name: &str, entries: I) -> Result<ClassifiedContent>
where
    I: IntoIterator<Item = Result<RawEntry>>,
{
    let mut content = ClassifiedContent::default();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        let RawEntry { name, bytes } = entry?;
        match classify_entry_name(&name) {
            EntryKind::Metadata => match ComicMetadata::from_json_bytes(&bytes) {
                Ok(metadata) => content.metadata = Some(metadata),
                Err(e) => {
                    warn!("Ignoring metadata in '{}': {}", archive_name, e);
                    content.metadata = None;
                }
            },
            EntryKind::Page => match slots.get(&name) {
                Some(&slot) => content.pages[slot].1 = bytes,
                None => {
                    slots.insert(name.clone(), content.pages.len());
                    content.pages.push((name, bytes));
                }
            },
            EntryKind::Ignored => debug!("Skipping entry '{}' in '{}'", name, archive_name),
        }
    }

    debug!(
        "Classified '{}': {} page(s), metadata {}",
        archive_name,
        content.pages.len(),
        if content.metadata.is_some() { "present" } else { "absent" }
    );
    Ok(content)
}

/// Lazy sequence of [`RawEntry`] values read from a ZIP archive.
///
/// Directory entries are skipped. The iterator stops after the first error.
pub struct ArchiveReader<R: Read + Seek> {
    archive: ZipArchive<R>,
    name: String,
    next_index: usize,
    finished: bool,
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// Opens `reader` as a ZIP archive; `name` is only used in error messages and logs.
    ///
    /// Fails with [`Error::Archive`] when the bytes have no valid ZIP framing.
    pub fn open(reader: R, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let archive = ZipArchive::new(reader).map_err(|e| Error::archive(&name, e))?;
        debug!("Opened '{}' with {} entries", name, archive.len());
        Ok(Self {
            archive,
            name,
            next_index: 0,
            finished: false,
        })
    }

    fn read_next(&mut self) -> Result<Option<RawEntry>> {
        while self.next_index < self.archive.len() {
            let index = self.next_index;
            self.next_index += 1;

            let mut file = self
                .archive
                .by_index(index)
                .map_err(|e| Error::archive(&self.name, e))?;
            if file.is_dir() {
                continue;
            }

            let entry_name = file.name().to_string();
            let mut bytes = Vec::with_capacity(file.size().min(MAX_PREALLOCATION) as usize);
            file.read_to_end(&mut bytes)
                .map_err(|e| Error::archive(&self.name, e))?;
            return Ok(Some(RawEntry {
                name: entry_name,
                bytes,
            }));
        }
        Ok(None)
    }

    /// Consumes the whole archive, keeping page candidates and the metadata document.
    pub fn classify(self) -> Result<ClassifiedContent> {
        let archive_name = self.name.clone();
        classify_entries(&archive_name, self)
    }
}

impl<R: Read + Seek> Iterator for ArchiveReader<R> {
    type Item = Result<RawEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_next() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, text) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(text.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_classify_entry_name_ignores_case() {
        for name in ["a.jpg", "a.JPG", "a.JPEG", "a.jpeg", "b.Png", "c.gif", "d.BMP", "e.webp"] {
            assert_eq!(classify_entry_name(name), EntryKind::Page, "{}", name);
        }
        assert_eq!(classify_entry_name("INDEX.JSON"), EntryKind::Metadata);
        assert_eq!(classify_entry_name("index.json"), EntryKind::Metadata);
        assert_eq!(classify_entry_name("sub/index.json"), EntryKind::Ignored);
        assert_eq!(classify_entry_name("ComicInfo.xml"), EntryKind::Ignored);
        assert_eq!(classify_entry_name("jpg"), EntryKind::Ignored);
        assert_eq!(classify_entry_name("__MACOSX/._001.jpg"), EntryKind::Ignored);
    }

    #[test]
    fn test_reader_yields_entries_lazily() {
        let data = build_zip(&[("001.jpg", "one"), ("notes.txt", "two")]);
        let mut reader = ArchiveReader::open(Cursor::new(data), "test.cbz").unwrap();
        let first = reader.next().unwrap().unwrap();
        assert_eq!(first.name, "001.jpg");
        assert_eq!(first.bytes, b"one");
        let second = reader.next().unwrap().unwrap();
        assert_eq!(second.name, "notes.txt");
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_classify_collects_pages_and_metadata() {
        let data = build_zip(&[
            ("002.PNG", "b"),
            ("index.json", r#"{"title":"T"}"#),
            ("001.jpg", "a"),
            ("readme.md", "x"),
        ]);
        let content = ArchiveReader::open(Cursor::new(data), "t.cbz")
            .unwrap()
            .classify()
            .unwrap();
        let names: Vec<&str> = content.pages.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["002.PNG", "001.jpg"]);
        assert_eq!(content.pages[0].1, b"b");
        assert_eq!(content.metadata.unwrap().title.as_deref(), Some("T"));
    }

    #[test]
    fn test_malformed_metadata_is_not_fatal() {
        let data = build_zip(&[("index.json", "{oops"), ("001.jpg", "a")]);
        let content = ArchiveReader::open(Cursor::new(data), "t.cbz")
            .unwrap()
            .classify()
            .unwrap();
        assert!(content.metadata.is_none());
        assert_eq!(content.pages.len(), 1);
    }

    #[test]
    fn test_entry_less_archive_yields_nothing() {
        let data = build_zip(&[]);
        let content = ArchiveReader::open(Cursor::new(data), "empty.cbz")
            .unwrap()
            .classify()
            .unwrap();
        assert!(content.pages.is_empty());
    }

    #[test]
    fn test_invalid_framing_is_archive_error() {
        let result = ArchiveReader::open(Cursor::new(b"definitely not a zip".to_vec()), "bad.cbz");
        assert!(matches!(result, Err(Error::Archive { .. })));

        let result = ArchiveReader::open(Cursor::new(Vec::new()), "zero.cbz");
        assert!(matches!(result, Err(Error::Archive { .. })));
    }

    #[test]
    fn test_data_descriptor_entries_are_read() {
        // A non-seekable writer stores sizes after each entry's data (flag bit 3).
        let mut zip = ZipWriter::new_stream(Vec::new());
        for (name, text) in [("001.jpg", "first page"), ("002.jpg", "second page")] {
            zip.start_file(name, SimpleFileOptions::default()).unwrap();
            zip.write_all(text.as_bytes()).unwrap();
        }
        let data = zip.finish().unwrap().into_inner();
        assert_eq!(&data[..4], b"PK\x03\x04");
        assert_ne!(data[6] & 0x08, 0, "fixture must use data descriptors");

        let content = ArchiveReader::open(Cursor::new(data), "dd.cbz")
            .unwrap()
            .classify()
            .unwrap();
        assert_eq!(
            content.pages,
            vec![
                ("001.jpg".to_string(), b"first page".to_vec()),
                ("002.jpg".to_string(), b"second page".to_vec()),
            ]
        );
    }

    #[test]
    fn test_repeated_page_name_replaces_in_place() {
        let entry = |name: &str, bytes: &[u8]| {
            Ok(RawEntry {
                name: name.to_string(),
                bytes: bytes.to_vec(),
            })
        };
        let content = classify_entries(
            "dup.cbz",
            vec![
                entry("a.jpg", b"old"),
                entry("b.jpg", b"b"),
                entry("a.jpg", b"new"),
            ],
        )
        .unwrap();
        assert_eq!(
            content.pages,
            vec![
                ("a.jpg".to_string(), b"new".to_vec()),
                ("b.jpg".to_string(), b"b".to_vec()),
            ]
        );
    }

    #[test]
    fn test_entry_error_stops_classification() {
        let entries = vec![Err(Error::EmptyArchive("x".to_string()))];
        assert!(classify_entries("x.cbz", entries).is_err());
    }
}

//! Core data types and constants for the comic conversion library.
//!
//! This module defines the fundamental data structures used throughout the crate:
//! - Metadata records (`ComicMetadata`, `EffectiveMetadata`)
//! - Archive parse results (`RawEntry`, `ClassifiedContent`)
//! - Page geometry (`PageSize`, `PageLayout`) and normalized page data (`NormalizedPage`)
//! - Batch reporting (`BatchSummary`)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Image extensions recognized as pages, compared case-insensitively.
pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// Name of the metadata document inside archives and collections.
pub const METADATA_FILE_NAME: &str = "index.json";

/// File suffix identifying chapter archives inside a collection.
pub const CHAPTER_SUFFIX: &str = ".cbz";

/// Quality factor used when re-encoding every page as JPEG.
pub const JPEG_QUALITY: u8 = 85;

/// Title/author/publisher record parsed from an `index.json` document.
///
/// Fields that are absent or empty strings count as "not present" when
/// metadata from different levels is merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct ComicMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
}

/// The resolved metadata for one output document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct EffectiveMetadata {
    pub title: String,
    pub author: Option<String>,
    pub publisher: Option<String>,
}

/// One file pulled out of a ZIP archive, before classification.
#[derive(Debug, Clone)]
pub struct RawEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// One archive's parse result: page candidates in archive order plus optional metadata.
#[derive(Debug, Clone, Default)]
pub struct ClassifiedContent {
    pub pages: Vec<(String, Vec<u8>)>,
    pub metadata: Option<ComicMetadata>,
}

/// Output page size in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    /// ISO A4 portrait.
    pub const A4: PageSize = PageSize {
        width: 595.0,
        height: 842.0,
    };
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::A4
    }
}

/// Scale and centered offset fitting one image onto a page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl PageLayout {
    /// Fits an image of `width`×`height` pixels onto `page`, preserving aspect ratio.
    ///
    /// The image may be scaled up when it is smaller than the page.
    pub fn fit(width: u32, height: u32, page: PageSize) -> Self {
        let (width, height) = (width as f32, height as f32);
        let scale = (page.width / width).min(page.height / height);
        PageLayout {
            scale,
            offset_x: (page.width - width * scale) / 2.0,
            offset_y: (page.height - height * scale) / 2.0,
        }
    }
}

/// A page re-encoded as JPEG together with its placement on the output page.
#[derive(Debug, Clone)]
pub struct NormalizedPage {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub layout: PageLayout,
}

/// Outcome of a completed folder conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct BatchSummary {
    pub chapters_written: usize,
    pub output_directory: PathBuf,
    pub documents: Vec<PathBuf>,
}

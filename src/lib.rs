//! Comic Converter - Comic Archive to PDF Conversion Library
//!
//! This crate turns comic book archives (ZIP/CBZ files holding page images and an
//! optional `index.json`) into paginated A4 PDF documents, either one archive at a
//! time or a whole folder of chapter archives sharing metadata and a cover page.
//!
//! # Getting Started
//!
//! Configure where documents are written with [`ConverterConfig::builder`], then run
//! one of the `convert_*` methods, or a `spawn_*` method to run the job on a
//! background task and watch its progress.
//!
//! ```rust,no_run
//! use comic_converter::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> comic_converter::error::Result<()> {
//!     let config = ConverterConfig::builder()
//!         .output_root(PathBuf::from("./Documents"))
//!         .build()?;
//!
//!     // A folder with index.json, cover.jpg and one .cbz per chapter
//!     let mut job = config.spawn_collection_conversion("./My Series");
//!     while let Some(event) = job.next_progress().await {
//!         println!("{} ({}/{})", event.label, event.current, event.total);
//!     }
//!     let summary = job.finish().await?;
//!     println!(
//!         "Saved {} chapters to: {}",
//!         summary.chapters_written,
//!         summary.output_directory.display()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! Page and chapter order is lexical on lowercased names; zero-pad numbered
//! file names (`001.jpg`, `002.jpg`, ...) to get numeric order.

pub mod archive;
pub mod collector;
pub mod converter;
pub mod error;
pub mod generator;
pub mod metadata;
pub mod normalizer;
pub mod path_utils;
pub mod progress;
pub mod types;

pub use converter::{ConverterConfig, ConverterConfigBuilder};

pub use progress::{
    ConversionHandle, LogProgress, NoProgress, ProgressEvent, ProgressKind, ProgressSink,
};
pub use types::{
    BatchSummary, ClassifiedContent, ComicMetadata, EffectiveMetadata, NormalizedPage,
    PageLayout, PageSize, RawEntry,
};

/// Prelude module for convenient imports.
///
/// Re-exports the most commonly used types so that `use comic_converter::prelude::*;`
/// is enough for typical conversions.
pub mod prelude {
    pub use super::{
        BatchSummary, ComicMetadata, ConversionHandle, ConverterConfig, ConverterConfigBuilder,
        EffectiveMetadata, LogProgress, NoProgress, PageLayout, PageSize, ProgressEvent,
        ProgressKind, ProgressSink, error, generator, types,
    };
    pub use crate::archive::ArchiveReader;
    pub use crate::collector::Collector;
    pub use std::path::{Path, PathBuf};
}

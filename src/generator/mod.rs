//! Generator module provides the document assembler interface and its PDF implementation.
//!
//! A generator owns one output document for its whole lifetime:
//! `new` → `set_metadata` → `add_page`* → `save`.

use crate::error::Result;
use crate::types::{EffectiveMetadata, NormalizedPage};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub mod pdf;

/// Lifecycle state of a document being assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    /// Output file created, metadata not yet written.
    Created,
    /// Metadata written; pages may be appended.
    Open,
}

/// Common interface for output document generators.
#[async_trait]
pub trait Generator {
    /// Creates a new generator writing to `<output_dir>/<base_filename>.<ext>`.
    ///
    /// # Parameters
    /// * `output_dir` - Directory where the generated file will be saved; created if missing
    /// * `base_filename` - Already sanitized file stem
    ///
    /// # Returns
    /// * `Result<Self>` - A new generator instance or an error if the output file cannot be created
    fn new(output_dir: &Path, base_filename: &str) -> Result<Self>
    where
        Self: Sized;

    /// Writes document-level metadata. Allowed exactly once, before any page.
    async fn set_metadata(&mut self, metadata: &EffectiveMetadata) -> Result<&mut Self>
    where
        Self: Sized;

    /// Appends one full-bleed page showing `page` at its computed layout.
    ///
    /// Every page after the first starts on a fresh page of its own.
    async fn add_page(&mut self, page: &NormalizedPage) -> Result<&mut Self>
    where
        Self: Sized;

    /// Number of pages appended so far.
    fn page_count(&self) -> usize;

    /// Flushes the document to disk and releases the output handle.
    ///
    /// # Returns
    /// * `Result<PathBuf>` - Path of the written document
    async fn save(self) -> Result<PathBuf>;
}

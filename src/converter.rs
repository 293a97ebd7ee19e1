use log::{debug, info};
use memmap2::MmapOptions;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::mpsc::unbounded_channel;
use tokio::task::spawn_blocking;

use crate::archive::ArchiveReader;
use crate::collector::{Collector, order_pages};
use crate::error::{Error, Result};
use crate::generator::{Generator, pdf::Pdf};
use crate::metadata;
use crate::normalizer::normalize;
use crate::path_utils::{UniqueNames, get_file_name_lossy, sanitize_filename};
use crate::progress::{ConversionHandle, ProgressEvent, ProgressSink};
use crate::types::{
    BatchSummary, ClassifiedContent, ComicMetadata, EffectiveMetadata, NormalizedPage, PageSize,
};

/// Default application folder created under the output root.
pub const DEFAULT_OUTPUT_FOLDER: &str = "ComicConverter";

/// Folder name used when a collection path has no usable final component.
const FALLBACK_COLLECTION_NAME: &str = "Comic";

/// Configuration for comic-to-PDF conversions, built declaratively using the builder pattern.
///
/// The storage locations are injected here rather than looked up: the
/// converter writes single archives to `<output_root>/<output_folder_name>/<title>.pdf`
/// and collections to `<output_root>/<output_folder_name>/<collection>/<chapter title>.pdf`.
///
/// - [`convert_archive`](ConverterConfig::convert_archive): One `.cbz` file to one PDF
/// - [`convert_archive_reader`](ConverterConfig::convert_archive_reader): Any seekable ZIP source to one PDF
/// - [`convert_collection`](ConverterConfig::convert_collection): A folder of chapters to one PDF per chapter
/// - [`spawn_archive_conversion`](ConverterConfig::spawn_archive_conversion) and
///   [`spawn_collection_conversion`](ConverterConfig::spawn_collection_conversion):
///   the same jobs on a background task with progress delivered over a channel
///
/// ```rust,no_run
/// # use comic_converter::prelude::*;
/// # async fn run() -> comic_converter::error::Result<()> {
/// let config = ConverterConfig::builder()
///     .output_root(PathBuf::from("/home/me/Documents"))
///     .build()?;
///
/// let pdf = config.convert_archive("chapter01.cbz", &LogProgress).await?;
/// println!("PDF saved to: {}", pdf.display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, derive_builder::Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ConverterConfig {
    /// Writable documents root supplied by the environment.
    pub output_root: PathBuf,

    /// Application folder created under [`output_root`](ConverterConfig::output_root).
    #[builder(default = "DEFAULT_OUTPUT_FOLDER.to_string()")]
    pub output_folder_name: String,

    /// Whether a missing application folder is created.
    ///
    /// If `false`, the folder must already exist or conversions fail with
    /// [`Error::NotFound`].
    #[builder(default = "true")]
    pub create_output_directory: bool,
}

/// Read-only inputs a batch shares with every chapter it converts.
#[derive(Clone, Copy, Default)]
struct SharedCollection<'a> {
    metadata: Option<&'a ComicMetadata>,
    cover: Option<&'a NormalizedPage>,
}

impl ConverterConfig {
    /// Creates a new builder for configuring `ConverterConfig`.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder::default()
    }

    /// Checks that the output root exists and is a directory.
    pub fn preflight_check(&self) -> Result<&Self> {
        if !self.output_root.exists() {
            return Err(Error::NotFound(format!(
                "Output root does not exist: {:?}",
                self.output_root
            )));
        }
        if !self.output_root.is_dir() {
            return Err(Error::InvalidPath(
                self.output_root.clone(),
                "Output root is not a directory.".to_string(),
            ));
        }
        Ok(self)
    }

    /// The application folder all documents are written under.
    pub fn output_directory(&self) -> PathBuf {
        self.output_root.join(&self.output_folder_name)
    }

    async fn prepare_output_directory(&self) -> Result<PathBuf> {
        let path = self.output_directory();
        if !path.exists() {
            if !self.create_output_directory {
                return Err(Error::NotFound(format!(
                    "Target directory does not exist: {:?}",
                    path
                )));
            }
            fs::create_dir_all(&path).await?;
        }
        Ok(path)
    }

    /// Converts one archive file into a PDF.
    ///
    /// The archive's file name serves as the title when its `index.json` has none.
    ///
    /// # Returns
    ///
    /// * `Ok(PathBuf)` - Path of the written PDF
    /// * `Err(Error)` - The archive is unreadable or empty, a page cannot be decoded,
    ///   or the output cannot be written
    pub async fn convert_archive(
        &self,
        archive_path: impl AsRef<Path>,
        progress: &dyn ProgressSink,
    ) -> Result<PathBuf> {
        self.preflight_check()?;
        let archive_path = archive_path.as_ref();
        let file_name = get_file_name_lossy(archive_path);
        info!("Converting archive {:?}", archive_path);

        let content = Self::read_archive_file(archive_path).await?;
        let output_dir = self.prepare_output_directory().await?;
        Self::write_document(
            content,
            &file_name,
            SharedCollection::default(),
            &output_dir,
            &mut UniqueNames::new(),
            progress,
        )
        .await
    }

    /// Converts a ZIP archive read from `reader` into a PDF.
    ///
    /// # Arguments
    ///
    /// * `reader` - The archive bytes; any seekable source such as a file or an in-memory cursor
    /// * `file_name_hint` - Display name of the archive, used for the title fallback
    /// * `progress` - Receives one page event after each page is written
    pub async fn convert_archive_reader<R>(
        &self,
        reader: R,
        file_name_hint: &str,
        progress: &dyn ProgressSink,
    ) -> Result<PathBuf>
    where
        R: Read + Seek + Send + 'static,
    {
        self.preflight_check()?;
        let name = file_name_hint.to_string();
        let content = spawn_blocking(move || ArchiveReader::open(reader, name)?.classify()).await??;
        let output_dir = self.prepare_output_directory().await?;
        Self::write_document(
            content,
            file_name_hint,
            SharedCollection::default(),
            &output_dir,
            &mut UniqueNames::new(),
            progress,
        )
        .await
    }

    /// Converts every chapter archive of a collection folder, one PDF per chapter.
    ///
    /// Chapters are processed one after another in lowercase-name order. The
    /// collection's `index.json` supplies author and publisher where a chapter
    /// has none, and a `cover.<ext>` image becomes the first page of every
    /// chapter. The first failing chapter stops the batch; documents already
    /// written stay on disk.
    pub async fn convert_collection(
        &self,
        collection_path: impl AsRef<Path>,
        progress: &dyn ProgressSink,
    ) -> Result<BatchSummary> {
        self.preflight_check()?;
        let collection_path = collection_path.as_ref();
        info!("Converting collection {:?}", collection_path);

        let entries = Collector::new(collection_path).collect().await?;

        let cover = match &entries.cover_path {
            Some(path) => Some(Self::load_cover(path).await?),
            None => None,
        };

        let output_directory = self
            .prepare_output_directory()
            .await?
            .join(sanitize_filename(&collection_name(collection_path)));
        fs::create_dir_all(&output_directory).await?;

        let shared = SharedCollection {
            metadata: entries.metadata.as_ref(),
            cover: cover.as_ref(),
        };
        let total = entries.chapters.len();
        let mut names = UniqueNames::new();
        let mut documents = Vec::with_capacity(total);

        for (index, chapter_path) in entries.chapters.iter().enumerate() {
            let chapter_name = get_file_name_lossy(chapter_path);
            progress.report(ProgressEvent::chapter(index + 1, total, &chapter_name));
            info!("Processing chapter {} of {}: {}", index + 1, total, chapter_name);

            let content = Self::read_archive_file(chapter_path).await?;
            let document = Self::write_document(
                content,
                &chapter_name,
                shared,
                &output_directory,
                &mut names,
                progress,
            )
            .await?;
            documents.push(document);
        }

        info!(
            "Saved {} chapter(s) to {:?}",
            documents.len(),
            output_directory
        );
        Ok(BatchSummary {
            chapters_written: documents.len(),
            output_directory,
            documents,
        })
    }

    /// Runs [`convert_archive`](ConverterConfig::convert_archive) on a background task.
    pub fn spawn_archive_conversion(
        &self,
        archive_path: impl Into<PathBuf>,
    ) -> ConversionHandle<PathBuf> {
        let config = self.clone();
        let archive_path = archive_path.into();
        let (sender, receiver) = unbounded_channel();
        let task = tokio::spawn(async move { config.convert_archive(&archive_path, &sender).await });
        ConversionHandle {
            task,
            progress: receiver,
        }
    }

    /// Runs [`convert_collection`](ConverterConfig::convert_collection) on a background task.
    pub fn spawn_collection_conversion(
        &self,
        collection_path: impl Into<PathBuf>,
    ) -> ConversionHandle<BatchSummary> {
        let config = self.clone();
        let collection_path = collection_path.into();
        let (sender, receiver) = unbounded_channel();
        let task =
            tokio::spawn(async move { config.convert_collection(&collection_path, &sender).await });
        ConversionHandle {
            task,
            progress: receiver,
        }
    }

    async fn read_archive_file(path: &Path) -> Result<ClassifiedContent> {
        let name = get_file_name_lossy(path);
        let path = path.to_path_buf();
        spawn_blocking(move || {
            let file = File::open(&path).map_err(|e| Error::archive(&name, e))?;
            ArchiveReader::open(file, name)?.classify()
        })
        .await?
    }

    /// Memory-maps and normalizes the shared cover once per batch.
    async fn load_cover(path: &Path) -> Result<NormalizedPage> {
        let name = get_file_name_lossy(path);
        let file = fs::File::open(path).await?;
        let file_std = file.into_std().await;
        debug!("Loading shared cover {:?}", path);

        spawn_blocking(move || {
            // The mapping is read-only and dropped before this closure returns.
            let mmap = unsafe { MmapOptions::new().map(&file_std)? };
            normalize(&name, &mmap[..], PageSize::A4)
        })
        .await?
    }

    /// Orders, resolves and writes one archive's content into a new document.
    ///
    /// The document is saved even when a page fails, and the page error is
    /// returned; such a file must not be treated as a finished conversion.
    async fn write_document(
        content: ClassifiedContent,
        file_name: &str,
        shared: SharedCollection<'_>,
        output_dir: &Path,
        names: &mut UniqueNames,
        progress: &dyn ProgressSink,
    ) -> Result<PathBuf> {
        let ClassifiedContent {
            mut pages,
            metadata: archive_metadata,
        } = content;
        if pages.is_empty() {
            return Err(Error::EmptyArchive(file_name.to_string()));
        }

        order_pages(&mut pages);
        let effective = metadata::resolve(archive_metadata.as_ref(), shared.metadata, file_name);
        let stem = names.claim(&sanitize_filename(&effective.title));

        let mut generator = Pdf::new(output_dir, &stem)?;
        let written =
            Self::write_pages(&mut generator, &effective, shared.cover, pages, progress).await;
        let saved = generator.save().await;
        written?;
        saved
    }

    async fn write_pages<G>(
        generator: &mut G,
        metadata: &EffectiveMetadata,
        cover: Option<&NormalizedPage>,
        pages: Vec<(String, Vec<u8>)>,
        progress: &dyn ProgressSink,
    ) -> Result<()>
    where
        G: Generator + Send,
    {
        generator.set_metadata(metadata).await?;
        let total = pages.len() + usize::from(cover.is_some());

        if let Some(cover) = cover {
            generator.add_page(cover).await?;
            progress.report(ProgressEvent::page(generator.page_count(), total));
        }

        for (name, bytes) in pages {
            let page = spawn_blocking(move || normalize(&name, &bytes, PageSize::A4)).await??;
            generator.add_page(&page).await?;
            progress.report(ProgressEvent::page(generator.page_count(), total));
        }
        Ok(())
    }
}

/// Final component of the collection path, resolving `.`/`..` through the filesystem.
fn collection_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .or_else(|| {
            std::fs::canonicalize(path)
                .ok()
                .and_then(|p| p.file_name().map(|name| name.to_string_lossy().to_string()))
        })
        .unwrap_or_else(|| FALLBACK_COLLECTION_NAME.to_string())
}

impl ConverterConfigBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(root) = &self.output_root {
            if root.as_os_str().is_empty() {
                return Err("Output root is required".to_string());
            }
        }
        if let Some(folder) = &self.output_folder_name {
            if folder.is_empty() || folder == "." || folder == ".." {
                return Err(format!("Invalid output folder name: '{}'", folder));
            }
            if folder.contains('/') || folder.contains('\\') {
                return Err(format!(
                    "Output folder name must not contain path separators: '{}'",
                    folder
                ));
            }
        }
        Ok(())
    }
}

//! Custom error types and result handling for comic conversion operations.
//!
//! Every fallible operation returns a [`Result<T>`], an alias for
//! `std::result::Result<T, Error>`. Fatal kinds abort the running job; metadata
//! parse failures are recovered inside the archive reader and never reach callers.
//!
use std::path::PathBuf;

/// Type alias for Results with conversion errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all conversion operations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The archive stream could not be opened or is not valid ZIP framing.
    #[error("Cannot read archive '{name}': {source}")]
    Archive {
        name: String,
        #[source]
        source: zip::result::ZipError,
    },
    /// A metadata document is not a valid JSON object.
    #[error("Malformed metadata: {0}")]
    MetadataParse(String),
    /// The archive contained no page images.
    #[error("No images found in '{0}'")]
    EmptyArchive(String),
    /// The collection contained no chapter archives.
    #[error("No CBZ files found in folder '{0:?}'")]
    NoChapters(PathBuf),
    /// A page's bytes are not a decodable image.
    #[error("Cannot decode image '{name}': {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },
    /// I/O errors from the standard library
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Image encoding errors
    #[error(transparent)]
    Image(#[from] image::ImageError),
    /// PDF object or serialization errors
    #[error(transparent)]
    Pdf(#[from] lopdf::Error),
    /// Async task join errors
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
    #[error(transparent)]
    ConfigBuilder(#[from] crate::converter::ConverterConfigBuilderError),
    /// Error for invalid file or directory paths
    #[error("The given path '{0:?}' is invalid: {1}")]
    InvalidPath(PathBuf, String),
    /// Error for operations the current state does not allow
    #[error("Unsupported: {0}")]
    Unsupported(String),
    /// Error for resources that couldn't be found (e.g., output directory)
    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    pub(crate) fn archive(name: &str, source: impl Into<zip::result::ZipError>) -> Self {
        Error::Archive {
            name: name.to_string(),
            source: source.into(),
        }
    }
}

impl serde::Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}

use crate::error::{Error, Result};
use crate::generator::{AssemblerState, Generator};
use crate::types::{EffectiveMetadata, NormalizedPage, PageSize};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;

const PDF_VERSION: &str = "1.5";
const IMAGE_RESOURCE: &str = "Im0";
const PRODUCER: &str = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"));

/// A generator for PDF documents with one full-bleed image per page.
///
/// Pages are A4 with zero margins; each image is drawn with the scale and
/// offsets from its [`PageLayout`](crate::types::PageLayout). The output file
/// is created up front and written when the generator is saved.
pub struct Pdf {
    document: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    page_size: PageSize,
    output: Option<BufWriter<File>>,
    output_path: PathBuf,
    state: AssemblerState,
}

/// Encodes a PDF text string: plain literal for ASCII, UTF-16BE with BOM otherwise.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        Object::string_literal(text)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

impl Pdf {
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }
}

#[async_trait]
impl Generator for Pdf {
    fn new(output_dir: &Path, base_filename: &str) -> Result<Self> {
        if !output_dir.exists() {
            std::fs::create_dir_all(output_dir)?;
        }

        let output_path = output_dir.join(format!("{}.pdf", base_filename));
        let file = File::create(&output_path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create '{}': {}", output_path.display(), e),
            ))
        })?;

        let mut document = Document::with_version(PDF_VERSION);
        let pages_id = document.new_object_id();

        Ok(Pdf {
            document,
            pages_id,
            page_ids: Vec::new(),
            page_size: PageSize::A4,
            output: Some(BufWriter::new(file)),
            output_path,
            state: AssemblerState::Created,
        })
    }

    async fn set_metadata(&mut self, metadata: &EffectiveMetadata) -> Result<&mut Self> {
        if self.state != AssemblerState::Created {
            return Err(Error::Unsupported("Metadata already set".to_string()));
        }

        let mut info = dictionary! {
            "Title" => text_string(&metadata.title),
            "Producer" => text_string(PRODUCER),
            "CreationDate" => Object::string_literal(Utc::now().format("D:%Y%m%d%H%M%SZ").to_string()),
        };
        // Empty values are never written as real fields.
        if let Some(author) = metadata.author.as_deref().filter(|s| !s.is_empty()) {
            info.set("Author", text_string(author));
        }
        if let Some(publisher) = metadata.publisher.as_deref().filter(|s| !s.is_empty()) {
            info.set("Subject", text_string(publisher));
        }

        let info_id = self.document.add_object(info);
        self.document.trailer.set("Info", info_id);
        self.state = AssemblerState::Open;
        Ok(self)
    }

    async fn add_page(&mut self, page: &NormalizedPage) -> Result<&mut Self> {
        if self.state != AssemblerState::Open {
            return Err(Error::Unsupported(
                "Metadata must be set before adding pages".to_string(),
            ));
        }

        let image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(page.width),
                "Height" => i64::from(page.height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8_i64,
                "Filter" => "DCTDecode",
            },
            page.jpeg.clone(),
        )
        .with_compression(false);
        let image_id = self.document.add_object(image);

        let layout = page.layout;
        let drawn_width = page.width as f32 * layout.scale;
        let drawn_height = page.height as f32 * layout.scale;
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        drawn_width.into(),
                        Object::Integer(0),
                        Object::Integer(0),
                        drawn_height.into(),
                        layout.offset_x.into(),
                        layout.offset_y.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(IMAGE_RESOURCE.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = self
            .document
            .add_object(Stream::new(Dictionary::new(), content.encode()?));

        let page_id = self.document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                self.page_size.width.into(),
                self.page_size.height.into(),
            ],
            "Resources" => dictionary! {
                "XObject" => dictionary! { IMAGE_RESOURCE => image_id },
            },
            "Contents" => content_id,
        });
        self.page_ids.push(page_id);

        debug!(
            "Added page {} to {:?} ({}x{} px, scale {:.3})",
            self.page_ids.len(),
            self.output_path,
            page.width,
            page.height,
            layout.scale
        );
        Ok(self)
    }

    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    async fn save(mut self) -> Result<PathBuf> {
        let mut output = match self.output.take() {
            Some(output) => output,
            None => {
                return Err(Error::Unsupported("Output handle not available".to_string()));
            }
        };

        let kids: Vec<Object> = self.page_ids.iter().map(|id| Object::Reference(*id)).collect();
        let count = kids.len() as i64;
        self.document.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.document.trailer.set("Root", catalog_id);

        let mut document = self.document;
        spawn_blocking(move || -> Result<()> {
            document.save_to(&mut output)?;
            output.flush()?;
            Ok(())
        })
        .await??;

        info!(
            "Saved {:?} ({} page(s))",
            self.output_path,
            self.page_ids.len()
        );
        Ok(self.output_path)
    }
}

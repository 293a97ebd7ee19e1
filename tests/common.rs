//! Common test utilities for the comic converter crate.
//!
//! Provides functions for setting up test directories, building in-memory page
//! images and CBZ archives, and inspecting generated PDF documents.

use comic_converter::error::Result;
use image::{ImageFormat, Rgb, RgbImage};
use lopdf::{Document, Object};
use rand::{Rng, distributions::Alphanumeric};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

#[allow(dead_code)]
pub const TEST_TMP_DIR: &str = "tests/tmp";
#[allow(dead_code)]
pub const TEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A unique per-test directory with `source` and `target` subdirectories.
#[allow(dead_code)]
pub struct TestDirs {
    pub test_dir: PathBuf,
    pub source_dir: PathBuf,
    pub target_dir: PathBuf,
}

/// Creates a clean test directory with source and target subdirectories.
#[allow(dead_code)]
pub async fn setup_test_dirs(sub_path: &str) -> TestDirs {
    let rand_string: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    let test_dir = PathBuf::from(TEST_TMP_DIR).join(format!("{}-{}", sub_path, rand_string));
    if test_dir.exists() {
        fs::remove_dir_all(&test_dir).await.unwrap();
    }
    let source_dir = test_dir.join("source");
    let target_dir = test_dir.join("target");

    fs::create_dir_all(&source_dir).await.unwrap();
    fs::create_dir_all(&target_dir).await.unwrap();

    TestDirs {
        test_dir,
        source_dir,
        target_dir,
    }
}

/// Encodes a solid-color image of the given size in `format`.
#[allow(dead_code)]
pub fn image_bytes(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([200, 30, 30]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).unwrap();
    out.into_inner()
}

/// Shorthand for a PNG page of the given size.
#[allow(dead_code)]
pub fn png(width: u32, height: u32) -> Vec<u8> {
    image_bytes(width, height, ImageFormat::Png)
}

/// Builds a ZIP archive in memory from `(name, bytes)` entries, in order.
#[allow(dead_code)]
pub fn cbz_bytes(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Builds a ZIP archive the way streaming writers do, with each entry's sizes
/// in a data descriptor after its data.
#[allow(dead_code)]
pub fn streamed_cbz_bytes(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut zip = ZipWriter::new_stream(Vec::new());
    for (name, bytes) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Writes a CBZ archive to `path`, creating parent folders.
#[allow(dead_code)]
pub async fn write_cbz(path: &Path, entries: &[(&str, Vec<u8>)]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, cbz_bytes(entries)).await?;
    Ok(())
}

/// What the tests need to know about a generated PDF.
#[allow(dead_code)]
#[derive(Debug, PartialEq)]
pub struct PdfSummary {
    /// Pixel width of the image on each page, in page order.
    pub page_widths: Vec<i64>,
    /// `MediaBox` of each page.
    pub media_boxes: Vec<Vec<f32>>,
    /// Operands of the `cm` operator placing each page's image.
    pub placements: Vec<Vec<f32>>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
}

fn decode_text(object: &Object) -> Option<String> {
    match object {
        Object::String(bytes, _) if bytes.starts_with(&[0xFE, 0xFF]) => {
            let units: Vec<u16> = bytes[2..]
                .chunks(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            Some(String::from_utf16_lossy(&units))
        }
        Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).to_string()),
        _ => None,
    }
}

/// Asserts two lists of PDF numbers are equal to within rounding of serialized reals.
#[allow(dead_code)]
pub fn assert_close(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len(), "{:?} vs {:?}", actual, expected);
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 0.01, "{:?} vs {:?}", actual, expected);
    }
}

/// Loads a PDF and extracts page image widths and the document info fields.
#[allow(dead_code)]
pub fn inspect_pdf(path: &Path) -> PdfSummary {
    let doc = Document::load(path).unwrap();

    let mut page_widths = Vec::new();
    let mut media_boxes = Vec::new();
    let mut placements = Vec::new();
    for page_id in doc.get_pages().values() {
        let page = doc.get_dictionary(*page_id).unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        let image_id = xobjects.get(b"Im0").unwrap().as_reference().unwrap();
        let image = doc.get_object(image_id).unwrap().as_stream().unwrap();
        page_widths.push(image.dict.get(b"Width").unwrap().as_i64().unwrap());

        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        media_boxes.push(media_box.iter().map(|v| v.as_float().unwrap()).collect());

        let content = doc.get_and_decode_page_content(*page_id).unwrap();
        let cm = content
            .operations
            .iter()
            .find(|op| op.operator == "cm")
            .unwrap();
        placements.push(cm.operands.iter().map(|v| v.as_float().unwrap()).collect());
    }

    let info_id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
    let info = doc.get_dictionary(info_id).unwrap();
    let field = |key: &[u8]| info.get(key).ok().and_then(decode_text);

    PdfSummary {
        page_widths,
        media_boxes,
        placements,
        title: field(b"Title"),
        author: field(b"Author"),
        subject: field(b"Subject"),
    }
}

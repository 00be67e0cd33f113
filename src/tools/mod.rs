//! The concrete tools. Each one is a thin [`crate::Tool`] implementation:
//! input rules, options, and a single processing step.
//!
//! | Tool                     | Input | Processing                        |
//! |--------------------------|-------|-----------------------------------|
//! | `convert-image`          | file  | `POST /api/convert-image`         |
//! | `remove-background`      | file  | `POST /api/remove-background`     |
//! | `pdf-to-word`            | file  | `POST /api/pdf/convert-to-word`   |
//! | `pdf-compress`           | file  | `POST /api/pdf/compress`          |
//! | `pdf-watermark`          | file  | `POST /api/pdf/watermark`         |
//! | `title-optimizer`        | file  | upload, then `POST /api/titles/optimize` |
//! | `qr-code`                | text  | [`qr::QrProvider`]                |
//! | `youtube-thumbnails`     | text  | [`youtube::ThumbnailCdn`] URLs    |
//! | `word-count`             | text  | local                             |
//! | `case-converter`         | text  | local                             |
//! | `age-calculator`         | text  | local                             |
//! | `sleep-calculator`       | text  | local                             |
//! | `unit-converter`         | text  | local                             |

pub mod age;
pub mod image;
pub mod pdf;
pub mod qr;
pub mod sleep;
pub mod text;
pub mod titles;
pub mod unit;
pub mod youtube;

use crate::config::InputKind;
use serde::Serialize;

/// Catalog entry for one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolInfo {
    pub name: &'static str,
    pub summary: &'static str,
    pub input: InputKind,
}

const fn info(name: &'static str, summary: &'static str, input: InputKind) -> ToolInfo {
    ToolInfo {
        name,
        summary,
        input,
    }
}

/// Every tool this crate ships, in display order.
pub fn catalog() -> Vec<ToolInfo> {
    use InputKind::{File, Text};
    vec![
        info(image::CONVERT_NAME, "Convert an image to another format", File),
        info(image::REMOVE_BG_NAME, "Remove the background from a photo", File),
        info(pdf::PdfOperation::ConvertToWord.tool_name(), "Convert a PDF to a Word document", File),
        info(pdf::PdfOperation::Compress.tool_name(), "Shrink a PDF", File),
        info(pdf::PdfOperation::Watermark.tool_name(), "Stamp a text watermark on a PDF", File),
        info(titles::NAME, "Suggest better YouTube titles for a thumbnail", File),
        info(qr::NAME, "Generate a QR code from text or a URL", Text),
        info(youtube::NAME, "Get every thumbnail of a YouTube video", Text),
        info(text::WORD_COUNT_NAME, "Count words, sentences and reading time", Text),
        info(text::CASE_NAME, "Change the letter case of text", Text),
        info(age::NAME, "Exact age in years, months and days", Text),
        info(sleep::NAME, "Bed and wake-up times by sleep cycle", Text),
        info(unit::NAME, "Convert length, mass, temperature and volume", Text),
    ]
}

/// Smallest valid PNG the image decoders accept; shared by tool tests.
#[cfg(test)]
pub(crate) fn tiny_png() -> bytes::Bytes {
    let img = ::image::RgbImage::from_pixel(4, 3, ::image::Rgb([200, 40, 40]));
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, ::image::ImageFormat::Png).unwrap();
    bytes::Bytes::from(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_names_are_unique() {
        let tools = catalog();
        let names: HashSet<_> = tools.iter().map(|t| t.name).collect();
        assert_eq!(names.len(), tools.len());
        assert_eq!(tools.len(), 13);
    }

    #[test]
    fn tiny_png_decodes() {
        let img = ::image::load_from_memory(&tiny_png()).unwrap();
        assert_eq!((img.width(), img.height()), (4, 3));
    }
}

//! Input acquisition: turn raw user input into a validated [`ToolRequest`].
//!
//! ## One path for every entry point
//!
//! Drag-and-drop, the browse dialog and a local path all arrive as
//! [`RawInput::File`] and run through the same [`acquire`] function, so a
//! file accepted one way is accepted every way. The MIME type is sniffed
//! from the magic bytes first; a renamed `.png` that is really a PDF is
//! treated as a PDF, whatever the extension or the browser claims.

use crate::config::{Constraints, InputKind, OptionSpec};
use crate::error::ValidationError;
use crate::request::{FilePayload, Parameters, Payload, RawInput, ToolRequest};
use tracing::debug;

/// Fallback when nothing identifies the file.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Validate `raw` + `params` against a tool's declared rules.
///
/// Checks run in a fixed order (kind, type, size, blank text, options) and
/// stop at the first failure. No I/O happens here.
pub fn acquire(
    tool: &str,
    raw: RawInput,
    params: &Parameters,
    constraints: &Constraints,
    options: &[OptionSpec],
) -> Result<ToolRequest, ValidationError> {
    let payload = match (raw, constraints.input) {
        (
            RawInput::File {
                name,
                bytes,
                declared_mime,
                source,
            },
            InputKind::File,
        ) => {
            let mime = detect_mime(&bytes, &name, declared_mime.as_deref());
            debug!(
                "{tool}: {:?} input '{}' ({} bytes, {})",
                source,
                name,
                bytes.len(),
                mime
            );
            if !constraints.allows(&mime) {
                return Err(ValidationError::UnsupportedType {
                    mime,
                    allowed: constraints.allowed_types.clone(),
                });
            }
            check_size(bytes.len() as u64, constraints)?;
            if bytes.is_empty() {
                return Err(ValidationError::EmptyInput {
                    field: constraints.label.clone(),
                });
            }
            Payload::File(FilePayload { name, mime, bytes })
        }
        (RawInput::Text(text), InputKind::Text) => {
            check_size(text.len() as u64, constraints)?;
            if text.trim().is_empty() {
                return Err(ValidationError::EmptyInput {
                    field: constraints.label.clone(),
                });
            }
            Payload::Text(text)
        }
        (RawInput::File { .. }, InputKind::Text) => {
            return Err(ValidationError::invalid_input(format!(
                "{tool} expects {}, not a file",
                constraints.label
            )))
        }
        (RawInput::Text(_), InputKind::File) => {
            return Err(ValidationError::invalid_input(format!(
                "{tool} expects a file upload"
            )))
        }
    };

    let parameters = resolve_parameters(params, options)?;

    Ok(ToolRequest {
        tool: tool.to_string(),
        payload,
        parameters,
    })
}

fn check_size(size: u64, constraints: &Constraints) -> Result<(), ValidationError> {
    match constraints.max_bytes {
        Some(limit) if size > limit => Err(ValidationError::TooLarge { size, limit }),
        _ => Ok(()),
    }
}

/// Fill defaults, normalise values, reject unknown names.
fn resolve_parameters(
    given: &Parameters,
    options: &[OptionSpec],
) -> Result<Parameters, ValidationError> {
    if let Some((unknown, _)) = given
        .iter()
        .find(|(name, _)| !options.iter().any(|o| o.name == *name))
    {
        return Err(ValidationError::invalid_parameter(unknown, "unknown option"));
    }

    let mut resolved = Parameters::new();
    for opt in options {
        match given.get(&opt.name).or(opt.default.as_deref()) {
            Some(raw) => {
                let value = opt.normalise(raw)?;
                if !value.is_empty() {
                    resolved.insert(opt.name.clone(), value);
                }
            }
            None if opt.required => {
                return Err(ValidationError::invalid_parameter(&opt.name, "is required"));
            }
            None => {}
        }
    }
    Ok(resolved)
}

/// Best-effort MIME type: magic bytes, then extension, then the declared type.
pub fn detect_mime(bytes: &[u8], name: &str, declared: Option<&str>) -> String {
    if let Some(mime) = sniff(bytes) {
        return mime.to_string();
    }
    if let Some(mime) = mime_from_extension(name) {
        return mime.to_string();
    }
    declared
        .map(|m| m.trim().to_ascii_lowercase())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| OCTET_STREAM.to_string())
}

fn sniff(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"%PDF") {
        return Some("application/pdf");
    }
    let format = image::guess_format(bytes).ok()?;
    Some(format.to_mime_type())
}

/// Map a file extension to its MIME type.
pub fn mime_from_extension(name: &str) -> Option<&'static str> {
    let (_, ext) = name.rsplit_once('.')?;
    let mime = match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        _ => return None,
    };
    Some(mime)
}

/// Extension for a MIME type, used when naming downloads.
pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "image/tiff" => "tiff",
        "application/pdf" => "pdf",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

    fn png_bytes(len: usize) -> Vec<u8> {
        let mut v = PNG_MAGIC.to_vec();
        v.resize(len.max(PNG_MAGIC.len()), 0);
        v
    }

    fn image_rules() -> Constraints {
        Constraints::file(&["image/png", "image/jpeg"], 10 * 1024 * 1024)
    }

    #[test]
    fn sniffed_type_wins_over_extension() {
        assert_eq!(detect_mime(b"%PDF-1.7 ...", "photo.png", None), "application/pdf");
        assert_eq!(detect_mime(&png_bytes(16), "scan.pdf", None), "image/png");
    }

    #[test]
    fn extension_then_declared_then_fallback() {
        assert_eq!(detect_mime(b"????", "doc.docx", None), mime_from_extension("x.docx").unwrap());
        assert_eq!(detect_mime(b"????", "noext", Some("Text/Plain")), "text/plain");
        assert_eq!(detect_mime(b"????", "noext", None), OCTET_STREAM);
    }

    #[test]
    fn declared_type_is_used_when_nothing_else_matches() {
        let raw = RawInput::picked("camera-upload", b"????".to_vec()).with_declared_mime("image/JPEG");
        let request = acquire("convert", raw, &Parameters::new(), &image_rules(), &[]).unwrap();
        assert_eq!(request.payload.as_file().unwrap().mime, "image/jpeg");

        let raw = RawInput::picked("notes", b"????".to_vec()).with_declared_mime("text/plain");
        let err = acquire("convert", raw, &Parameters::new(), &image_rules(), &[]).unwrap_err();
        assert_eq!(err.kind(), "UnsupportedTypeError");
    }

    #[test]
    fn too_large_is_rejected() {
        let raw = RawInput::picked("big.png", png_bytes(15 * 1024 * 1024));
        let err = acquire("convert", raw, &Parameters::new(), &image_rules(), &[]).unwrap_err();
        assert_eq!(err.kind(), "TooLargeError");
    }

    #[test]
    fn wrong_type_is_rejected_before_size() {
        let mut pdf = b"%PDF-1.4".to_vec();
        pdf.resize(20 * 1024 * 1024, 0);
        let raw = RawInput::dropped("huge.pdf", pdf);
        let err = acquire("convert", raw, &Parameters::new(), &image_rules(), &[]).unwrap_err();
        assert_eq!(err.kind(), "UnsupportedTypeError");
    }

    #[test]
    fn drop_and_pick_produce_identical_requests() {
        let options = [OptionSpec::choice("format", &["png", "webp"], "png")];
        let params = Parameters::new().with("format", "WEBP");
        let a = acquire(
            "convert",
            RawInput::dropped("a.png", png_bytes(64)),
            &params,
            &image_rules(),
            &options,
        )
        .unwrap();
        let b = acquire(
            "convert",
            RawInput::picked("a.png", png_bytes(64)),
            &params,
            &image_rules(),
            &options,
        )
        .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.parameters.get("format"), Some("webp"));
    }

    #[test]
    fn blank_text_is_rejected() {
        let rules = Constraints::text("a YouTube URL", 2048);
        let err = acquire("thumbnails", RawInput::text("   "), &Parameters::new(), &rules, &[])
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptyInput { field: "a YouTube URL".into() });
    }

    #[test]
    fn kind_mismatch_is_invalid_input() {
        let rules = Constraints::text("some text", 2048);
        let err = acquire("qr", RawInput::picked("a.png", png_bytes(8)), &Parameters::new(), &rules, &[])
            .unwrap_err();
        assert_eq!(err.kind(), "InvalidInputError");
    }

    #[test]
    fn defaults_are_filled_and_unknown_options_rejected() {
        let options = [
            OptionSpec::choice("format", &["png", "webp"], "png"),
            OptionSpec::integer("quality", 1, 100, 90),
        ];
        let ok = acquire(
            "convert",
            RawInput::picked("a.png", png_bytes(64)),
            &Parameters::new(),
            &image_rules(),
            &options,
        )
        .unwrap();
        assert_eq!(ok.parameters.get("format"), Some("png"));
        assert_eq!(ok.parameters.get("quality"), Some("90"));

        let err = acquire(
            "convert",
            RawInput::picked("a.png", png_bytes(64)),
            &Parameters::new().with("dpi", "300"),
            &image_rules(),
            &options,
        )
        .unwrap_err();
        assert_eq!(err.kind(), "InvalidParameterError");
    }

    #[test]
    fn required_option_without_default() {
        let options = [OptionSpec::text("text", 100, true)];
        let rules = Constraints::file(&["application/pdf"], 1024);
        let err = acquire(
            "watermark",
            RawInput::picked("a.pdf", b"%PDF-1.4".to_vec()),
            &Parameters::new(),
            &rules,
            &options,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidParameter {
                name: "text".into(),
                reason: "is required".into()
            }
        );
    }
}

//! Validation and client-side preparation of files queued for upload.
//!
//! The backend only accepts a small allowlist of file types, enforces a
//! size cap, and is noticeably slow on large bodies, so raster images get
//! recompressed locally before they go on the wire: the longest edge is
//! bounded and the JPEG quality is stepped down until the bytes fit.
//! Everything here is a pure transformation; validation failures are
//! reported to the input-area status line, never into the transcript.

use std::io::Cursor;
use std::path::Path;

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;

use crate::core::constants::{MAX_IMAGE_EDGE, MAX_UPLOAD_BYTES};

/// Recompression kicks in above this many bytes even when the dimensions
/// are already within bounds.
const RECOMPRESS_THRESHOLD_BYTES: u64 = 2 * 1024 * 1024;

/// JPEG qualities tried in order until the encoded image fits the cap.
const JPEG_QUALITY_STEPS: [u8; 4] = [85, 75, 65, 50];

/// Longest edge of the thumbnail kept with raster attachments.
const PREVIEW_EDGE: u32 = 96;

const PREVIEW_JPEG_QUALITY: u8 = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Jpeg,
    Png,
    WebP,
    Pdf,
    Audio,
}

impl AttachmentKind {
    pub fn label(self) -> &'static str {
        match self {
            AttachmentKind::Jpeg | AttachmentKind::Png | AttachmentKind::WebP => "image",
            AttachmentKind::Pdf => "PDF",
            AttachmentKind::Audio => "audio",
        }
    }

    pub fn is_raster_image(self) -> bool {
        matches!(
            self,
            AttachmentKind::Jpeg | AttachmentKind::Png | AttachmentKind::WebP
        )
    }
}

/// What the transcript keeps about an attachment once the bytes are gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentMeta {
    pub file_name: String,
    pub kind: AttachmentKind,
    pub size_bytes: u64,
    /// `data:image/jpeg;base64,…` thumbnail for raster images, small
    /// enough to embed in transcript logs. `None` for other kinds.
    pub preview: Option<String>,
}

impl AttachmentMeta {
    /// Short chip text for transcript rendering, e.g. `plan.pdf (PDF, 412 KB)`.
    pub fn chip(&self) -> String {
        format!(
            "{} ({}, {})",
            self.file_name,
            self.kind.label(),
            format_size(self.size_bytes)
        )
    }
}

/// An attachment that passed validation and is ready for multipart upload.
#[derive(Debug, Clone)]
pub struct PreparedAttachment {
    pub meta: AttachmentMeta,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Validate and prepare one file for upload. Returns a user-facing message
/// on rejection.
pub fn prepare_attachment(path: &Path) -> Result<PreparedAttachment, String> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| format!("Not a file: {}", path.display()))?;

    let (kind, mime) = classify(path).ok_or_else(|| {
        format!(
            "Unsupported file type: {file_name}. Allowed: JPEG, PNG, WebP, PDF, MP3, WAV, OGG, M4A"
        )
    })?;

    let bytes =
        std::fs::read(path).map_err(|e| format!("Could not read {}: {e}", path.display()))?;

    // One decode serves both the thumbnail and the recompression pass.
    let (kind, mime, file_name, bytes, preview) = if kind.is_raster_image() {
        match image::load_from_memory(&bytes) {
            Ok(decoded) => {
                let preview = encode_preview(&decoded);
                let (kind, mime, file_name, bytes) =
                    shrink_image_if_needed(decoded, kind, mime, file_name, bytes);
                (kind, mime, file_name, bytes, preview)
            }
            Err(e) => {
                // Undecodable images still go up as-is; the plain size cap
                // below is the only gate left for them.
                tracing::debug!("attachment {file_name}: decode failed, keeping original: {e}");
                (kind, mime, file_name, bytes, None)
            }
        }
    } else {
        (kind, mime, file_name, bytes, None)
    };

    let size_bytes = bytes.len() as u64;
    if size_bytes > MAX_UPLOAD_BYTES {
        return Err(format!(
            "{file_name} is too large: {} (limit {})",
            format_size(size_bytes),
            format_size(MAX_UPLOAD_BYTES)
        ));
    }
    if bytes.is_empty() {
        return Err(format!("{file_name} is empty"));
    }

    Ok(PreparedAttachment {
        meta: AttachmentMeta {
            file_name,
            kind,
            size_bytes,
            preview,
        },
        mime: mime.to_string(),
        bytes,
    })
}

fn classify(path: &Path) -> Option<(AttachmentKind, &'static str)> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some((AttachmentKind::Jpeg, "image/jpeg")),
        "png" => Some((AttachmentKind::Png, "image/png")),
        "webp" => Some((AttachmentKind::WebP, "image/webp")),
        "pdf" => Some((AttachmentKind::Pdf, "application/pdf")),
        "mp3" => Some((AttachmentKind::Audio, "audio/mpeg")),
        "wav" => Some((AttachmentKind::Audio, "audio/wav")),
        "ogg" => Some((AttachmentKind::Audio, "audio/ogg")),
        "m4a" => Some((AttachmentKind::Audio, "audio/mp4")),
        _ => None,
    }
}

/// Downscale and re-encode an oversized raster image as JPEG. Images that
/// already fit pass through untouched.
fn shrink_image_if_needed(
    decoded: image::DynamicImage,
    kind: AttachmentKind,
    mime: &'static str,
    file_name: String,
    bytes: Vec<u8>,
) -> (AttachmentKind, &'static str, String, Vec<u8>) {
    let original_size = bytes.len() as u64;
    let longest_edge = decoded.width().max(decoded.height());
    if original_size <= RECOMPRESS_THRESHOLD_BYTES && longest_edge <= MAX_IMAGE_EDGE {
        return (kind, mime, file_name, bytes);
    }

    let resized = if longest_edge > MAX_IMAGE_EDGE {
        decoded.resize(MAX_IMAGE_EDGE, MAX_IMAGE_EDGE, FilterType::Lanczos3)
    } else {
        decoded
    };
    // JPEG cannot carry an alpha channel.
    let rgb = image::DynamicImage::ImageRgb8(resized.to_rgb8());

    for quality in JPEG_QUALITY_STEPS {
        let mut encoded: Vec<u8> = Vec::new();
        let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut encoded), quality);
        if rgb.write_with_encoder(encoder).is_err() {
            break;
        }
        if (encoded.len() as u64) <= MAX_UPLOAD_BYTES {
            tracing::debug!(
                "attachment {file_name}: recompressed {} -> {} at quality {quality}",
                format_size(original_size),
                format_size(encoded.len() as u64),
            );
            let renamed = replace_extension(&file_name, "jpg");
            return (AttachmentKind::Jpeg, "image/jpeg", renamed, encoded);
        }
    }

    // Every quality step overflowed the cap; let the caller's size check
    // produce the rejection message for the original bytes.
    (kind, mime, file_name, bytes)
}

/// A thumbnail of the image as a `data:` URL. `None` when encoding fails;
/// the transcript log then simply omits the embed.
fn encode_preview(decoded: &image::DynamicImage) -> Option<String> {
    let thumb = decoded.thumbnail(PREVIEW_EDGE, PREVIEW_EDGE);
    let rgb = image::DynamicImage::ImageRgb8(thumb.to_rgb8());
    let mut encoded: Vec<u8> = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut encoded), PREVIEW_JPEG_QUALITY);
    rgb.write_with_encoder(encoder).ok()?;
    Some(format!(
        "data:image/jpeg;base64,{}",
        base64::prelude::BASE64_STANDARD.encode(&encoded)
    ))
}

fn replace_extension(file_name: &str, ext: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, _)) => format!("{stem}.{ext}"),
        None => format!("{file_name}.{ext}"),
    }
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{} KB", bytes / 1024)
    } else {
        format!("{bytes} B")
    }
}

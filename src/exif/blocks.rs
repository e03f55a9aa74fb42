use anyhow::Result;
use img_parts::jpeg::{Jpeg, JpegSegment};
use img_parts::png::{Png, PngChunk};
use img_parts::webp::{WebP, CHUNK_EXIF as WEBP_EXIF};
use img_parts::{Bytes, ImageEXIF, ImageICC};
use serde::Serialize;

use crate::pipeline::ImageKind;

// JPEG markers
pub(crate) const MARKER_APP0: u8 = 0xE0;
pub(crate) const MARKER_APP1: u8 = 0xE1;
pub(crate) const MARKER_APP2: u8 = 0xE2;
pub(crate) const MARKER_APP13: u8 = 0xED;
pub(crate) const MARKER_APP14: u8 = 0xEE;
pub(crate) const MARKER_APP15: u8 = 0xEF;
pub(crate) const MARKER_COM: u8 = 0xFE;

pub(crate) const EXIF_PREFIX: &[u8] = b"Exif\0\0";
pub(crate) const XMP_HEADER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
pub(crate) const XMP_EXTENDED_HEADER: &[u8] = b"http://ns.adobe.com/xmp/extension/\0";
pub(crate) const IPTC_HEADER: &[u8] = b"Photoshop 3.0\0";
pub(crate) const ICC_HEADER: &[u8] = b"ICC_PROFILE\0";

// PNG chunk types
pub(crate) const CHUNK_EXIF: [u8; 4] = *b"eXIf";
pub(crate) const CHUNK_ITXT: [u8; 4] = *b"iTXt";
pub(crate) const CHUNK_TEXT: [u8; 4] = *b"tEXt";
pub(crate) const CHUNK_ZTXT: [u8; 4] = *b"zTXt";
pub(crate) const CHUNK_TIME: [u8; 4] = *b"tIME";
pub(crate) const CHUNK_ICCP: [u8; 4] = *b"iCCP";
const PNG_XMP_KEYWORD: &[u8] = b"XML:com.adobe.xmp\0";

// WebP RIFF chunk ids
pub(crate) const WEBP_XMP: [u8; 4] = *b"XMP ";

/// Which metadata containers an image file carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetadataBlocks {
    pub exif: bool,
    pub xmp: bool,
    pub iptc: bool,
    pub icc: bool,
    /// JPEG COM segments, PNG text chunks and PNG timestamps.
    pub comments: usize,
}

impl MetadataBlocks {
    /// `true` when nothing is left, ignoring the ICC profile if `keep_icc`.
    pub fn is_clean(&self, keep_icc: bool) -> bool {
        !self.exif && !self.xmp && !self.iptc && (keep_icc || !self.icc) && self.comments == 0
    }

    /// Short labels of the blocks that are present, e.g. `["EXIF", "XMP"]`.
    pub fn labels(&self) -> Vec<String> {
        let mut labels = Vec::new();
        if self.exif {
            labels.push("EXIF".to_string());
        }
        if self.xmp {
            labels.push("XMP".to_string());
        }
        if self.iptc {
            labels.push("IPTC".to_string());
        }
        if self.icc {
            labels.push("ICC".to_string());
        }
        if self.comments > 0 {
            labels.push(format!("{} comment(s)", self.comments));
        }
        labels
    }
}

/// Detect metadata containers in an encoded image.
///
/// TIFF files are their own EXIF directory, so nothing can be told apart at
/// the container level; callers derive TIFF blocks from the parsed EXIF.
pub fn inspect_blocks(bytes: &[u8], kind: ImageKind) -> Result<MetadataBlocks> {
    match kind {
        ImageKind::Jpeg => {
            let jpeg = Jpeg::from_bytes(Bytes::copy_from_slice(bytes))
                .map_err(|e| anyhow::anyhow!("Failed to parse JPEG: {e}"))?;
            Ok(jpeg_blocks(jpeg.segments()))
        }
        ImageKind::Png => {
            let png = Png::from_bytes(Bytes::copy_from_slice(bytes))
                .map_err(|e| anyhow::anyhow!("Failed to parse PNG: {e}"))?;
            Ok(png_blocks(png.chunks()))
        }
        ImageKind::WebP => {
            let webp = WebP::from_bytes(Bytes::copy_from_slice(bytes))
                .map_err(|e| anyhow::anyhow!("Failed to parse WebP: {e}"))?;
            Ok(MetadataBlocks {
                exif: webp.chunk_by_id(WEBP_EXIF).is_some(),
                xmp: webp.chunk_by_id(WEBP_XMP).is_some(),
                iptc: false,
                icc: webp.icc_profile().is_some(),
                comments: 0,
            })
        }
        ImageKind::Tiff => Ok(MetadataBlocks::default()),
    }
}

/// The raw EXIF payload of a PNG (`eXIf`) or WebP (`EXIF`) file, if any.
pub(crate) fn embedded_exif(bytes: &[u8], kind: ImageKind) -> Option<Bytes> {
    match kind {
        ImageKind::Png => Png::from_bytes(Bytes::copy_from_slice(bytes)).ok()?.exif(),
        ImageKind::WebP => {
            // The chunk is not always prefixed with `Exif\0\0`, so read it raw
            let webp = WebP::from_bytes(Bytes::copy_from_slice(bytes)).ok()?;
            webp.chunk_by_id(WEBP_EXIF)?.content().data().cloned()
        }
        ImageKind::Jpeg | ImageKind::Tiff => None,
    }
}

fn jpeg_blocks(segments: &[JpegSegment]) -> MetadataBlocks {
    let mut blocks = MetadataBlocks::default();
    for segment in segments {
        let contents = segment.contents();
        match segment.marker() {
            MARKER_APP1 if contents.starts_with(EXIF_PREFIX) => blocks.exif = true,
            MARKER_APP1
                if contents.starts_with(XMP_HEADER) || contents.starts_with(XMP_EXTENDED_HEADER) =>
            {
                blocks.xmp = true
            }
            MARKER_APP2 if contents.starts_with(ICC_HEADER) => blocks.icc = true,
            MARKER_APP13 if contents.starts_with(IPTC_HEADER) => blocks.iptc = true,
            MARKER_COM => blocks.comments += 1,
            _ => {}
        }
    }
    blocks
}

fn png_blocks(chunks: &[PngChunk]) -> MetadataBlocks {
    let mut blocks = MetadataBlocks::default();
    for chunk in chunks {
        match chunk.kind() {
            CHUNK_EXIF => blocks.exif = true,
            CHUNK_ICCP => blocks.icc = true,
            CHUNK_ITXT if chunk.contents().starts_with(PNG_XMP_KEYWORD) => blocks.xmp = true,
            CHUNK_ITXT | CHUNK_TEXT | CHUNK_ZTXT | CHUNK_TIME => blocks.comments += 1,
            _ => {}
        }
    }
    blocks
}

/// `true` for PNG text chunks and timestamps that carry no pixel data.
pub(crate) fn is_png_metadata_chunk(kind: [u8; 4]) -> bool {
    matches!(kind, CHUNK_EXIF | CHUNK_ITXT | CHUNK_TEXT | CHUNK_ZTXT | CHUNK_TIME)
}

/// `true` for JPEG segments that only carry metadata.
///
/// APP0 (JFIF) and APP14 (Adobe colour transform) affect decoding and stay.
pub(crate) fn is_jpeg_metadata_segment(segment: &JpegSegment, keep_icc: bool) -> bool {
    match segment.marker() {
        MARKER_APP0 | MARKER_APP14 => false,
        MARKER_APP2 if segment.contents().starts_with(ICC_HEADER) => !keep_icc,
        MARKER_APP1..=MARKER_APP15 => true,
        MARKER_COM => true,
        _ => false,
    }
}

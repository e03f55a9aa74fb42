use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::metadata::Orientation;
use image::{ColorType, DynamicImage, ImageDecoder, ImageReader};
use img_parts::jpeg::Jpeg;
use img_parts::png::Png;
use img_parts::webp::{WebP, CHUNK_ICCP as WEBP_ICCP, CHUNK_VP8X as WEBP_VP8X};
use img_parts::{Bytes, DynImage, ImageEXIF, ImageICC};
use std::io::Cursor;

use super::blocks::{
    is_jpeg_metadata_segment, is_png_metadata_chunk, CHUNK_ICCP, WEBP_XMP,
};
use crate::config::{StripConfig, StripMode};
use crate::pipeline::ImageKind;

/// A metadata-free encoding of an image.
#[derive(Debug)]
pub struct Stripped {
    pub bytes: Vec<u8>,
    /// The mode that was actually used. Lossless requests can fall back to re-encode.
    pub mode: StripMode,
}

/// Remove all metadata from an encoded image.
///
/// With [`StripMode::Reencode`] the pixels are decoded, the EXIF orientation is
/// baked in, and a brand-new file of the same format is encoded.
/// With [`StripMode::Lossless`] only metadata segments/chunks are dropped; TIFF
/// files and images that need an orientation transform fall back to re-encode
/// so the result still looks like the original.
///
/// # Example
///
/// ```rust,no_run
/// use exif_scrub::config::Config;
/// use exif_scrub::exif::strip_metadata;
/// use exif_scrub::pipeline::ImageKind;
///
/// let bytes = std::fs::read("photo.jpg").unwrap();
/// let config = Config::default();
/// let stripped = strip_metadata(&bytes, ImageKind::Jpeg, &config.strip).unwrap();
/// std::fs::write("photo_clean.jpg", &stripped.bytes).unwrap();
/// ```
pub fn strip_metadata(bytes: &[u8], kind: ImageKind, config: &StripConfig) -> Result<Stripped> {
    let mode = effective_mode(bytes, kind, config.mode)?;
    let out = match mode {
        StripMode::Lossless => strip_lossless(bytes, kind, config.keep_icc)?,
        StripMode::Reencode => reencode(bytes, kind, config)?,
    };
    log::debug!(
        "Stripped {:?} ({mode}): {} → {} bytes",
        kind,
        bytes.len(),
        out.len()
    );
    Ok(Stripped { bytes: out, mode })
}

fn effective_mode(bytes: &[u8], kind: ImageKind, requested: StripMode) -> Result<StripMode> {
    if requested == StripMode::Reencode {
        return Ok(StripMode::Reencode);
    }
    if kind == ImageKind::Tiff {
        log::info!("TIFF has no lossless strip path, re-encoding instead");
        return Ok(StripMode::Reencode);
    }
    let orientation = read_orientation(bytes)?;
    if orientation != Orientation::NoTransforms {
        log::info!("Image is displayed with {orientation:?}, re-encoding to keep it upright");
        return Ok(StripMode::Reencode);
    }
    Ok(StripMode::Lossless)
}

fn read_orientation(bytes: &[u8]) -> Result<Orientation> {
    let mut decoder = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .context("Failed to detect image format")?
        .into_decoder()
        .context("Failed to open image decoder")?;
    Ok(decoder.orientation().unwrap_or(Orientation::NoTransforms))
}

/// Decode the pixels with the display orientation applied.
fn decode_upright(bytes: &[u8]) -> Result<DynamicImage> {
    let mut decoder = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .context("Failed to detect image format")?
        .into_decoder()
        .context("Failed to open image decoder")?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut img = DynamicImage::from_decoder(decoder).context("Failed to decode image")?;
    img.apply_orientation(orientation);
    Ok(img)
}

fn reencode(bytes: &[u8], kind: ImageKind, config: &StripConfig) -> Result<Vec<u8>> {
    let img = decode_upright(bytes)?;
    let mut out = Cursor::new(Vec::new());

    match kind {
        ImageKind::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut out, config.jpeg_quality);
            let written = match img.color() {
                ColorType::L8 | ColorType::Rgb8 => img.write_with_encoder(encoder),
                _ => DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder),
            };
            written.context("Failed to encode JPEG")?;
        }
        other => {
            img.write_to(&mut out, other.image_format())
                .with_context(|| format!("Failed to encode {other:?}"))?;
        }
    }

    let encoded = out.into_inner();
    if config.keep_icc && kind != ImageKind::Tiff {
        if let Some(icc) = read_icc(bytes) {
            return attach_icc(encoded, icc);
        }
    }
    Ok(encoded)
}

fn read_icc(bytes: &[u8]) -> Option<Bytes> {
    DynImage::from_bytes(Bytes::copy_from_slice(bytes))
        .ok()
        .flatten()?
        .icc_profile()
}

fn attach_icc(encoded: Vec<u8>, icc: Bytes) -> Result<Vec<u8>> {
    let mut image = DynImage::from_bytes(Bytes::from(encoded))
        .map_err(|e| anyhow::anyhow!("Failed to parse re-encoded image: {e}"))?
        .context("Re-encoded image has an unknown container")?;
    image.set_icc_profile(Some(icc));
    if let DynImage::WebP(webp) = &mut image {
        // VP8X must lead, ICCP must precede the bitstream
        webp.chunks_mut().sort_by_key(|chunk| match chunk.id() {
            WEBP_VP8X => 0,
            WEBP_ICCP => 1,
            _ => 2,
        });
    }
    Ok(image.encoder().bytes().to_vec())
}

fn strip_lossless(bytes: &[u8], kind: ImageKind, keep_icc: bool) -> Result<Vec<u8>> {
    match kind {
        ImageKind::Jpeg => {
            let mut jpeg = Jpeg::from_bytes(Bytes::copy_from_slice(bytes))
                .map_err(|e| anyhow::anyhow!("Failed to parse JPEG: {e}"))?;
            let before = jpeg.segments().len();
            jpeg.segments_mut()
                .retain(|s| !is_jpeg_metadata_segment(s, keep_icc));
            log::debug!("Removed {} JPEG segment(s)", before - jpeg.segments().len());
            Ok(jpeg.encoder().bytes().to_vec())
        }
        ImageKind::Png => {
            let mut png = Png::from_bytes(Bytes::copy_from_slice(bytes))
                .map_err(|e| anyhow::anyhow!("Failed to parse PNG: {e}"))?;
            let before = png.chunks().len();
            png.chunks_mut().retain(|c| {
                let kind = c.kind();
                !is_png_metadata_chunk(kind) && (keep_icc || kind != CHUNK_ICCP)
            });
            log::debug!("Removed {} PNG chunk(s)", before - png.chunks().len());
            Ok(png.encoder().bytes().to_vec())
        }
        ImageKind::WebP => {
            let mut webp = WebP::from_bytes(Bytes::copy_from_slice(bytes))
                .map_err(|e| anyhow::anyhow!("Failed to parse WebP: {e}"))?;
            webp.set_exif(None);
            webp.remove_chunks_by_id(WEBP_XMP);
            if !keep_icc {
                webp.set_icc_profile(None);
            }
            Ok(webp.encoder().bytes().to_vec())
        }
        ImageKind::Tiff => anyhow::bail!("TIFF cannot be stripped losslessly"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif::inspect_blocks;
    use crate::test_support::{self, HEIGHT, WIDTH};

    fn strip_config(mode: StripMode, keep_icc: bool) -> StripConfig {
        StripConfig { mode, keep_icc, jpeg_quality: 92 }
    }

    fn dimensions(bytes: &[u8]) -> (u32, u32) {
        let img = image::load_from_memory(bytes).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn reencode_jpeg_removes_everything() {
        let input = test_support::jpeg_with_metadata();
        let out = strip_metadata(&input, ImageKind::Jpeg, &strip_config(StripMode::Reencode, false)).unwrap();

        assert_eq!(out.mode, StripMode::Reencode);
        let blocks = inspect_blocks(&out.bytes, ImageKind::Jpeg).unwrap();
        assert!(blocks.is_clean(false), "left behind: {:?}", blocks.labels());
        assert_eq!(dimensions(&out.bytes), (WIDTH, HEIGHT));
    }

    #[test]
    fn reencode_can_keep_icc() {
        let input = test_support::jpeg_with_metadata();
        let out = strip_metadata(&input, ImageKind::Jpeg, &strip_config(StripMode::Reencode, true)).unwrap();

        let blocks = inspect_blocks(&out.bytes, ImageKind::Jpeg).unwrap();
        assert!(blocks.icc);
        assert!(!blocks.exif);
        assert!(blocks.is_clean(true));
    }

    #[test]
    fn lossless_jpeg_keeps_pixels() {
        let input = test_support::jpeg_with_metadata();
        let out = strip_metadata(&input, ImageKind::Jpeg, &strip_config(StripMode::Lossless, false)).unwrap();

        assert_eq!(out.mode, StripMode::Lossless);
        assert!(inspect_blocks(&out.bytes, ImageKind::Jpeg).unwrap().is_clean(false));
        assert!(out.bytes.len() < input.len());

        let before = image::load_from_memory(&input).unwrap().to_rgb8();
        let after = image::load_from_memory(&out.bytes).unwrap().to_rgb8();
        assert_eq!(before, after);
    }

    #[test]
    fn lossless_jpeg_keep_icc() {
        let input = test_support::jpeg_with_metadata();
        let out = strip_metadata(&input, ImageKind::Jpeg, &strip_config(StripMode::Lossless, true)).unwrap();

        let blocks = inspect_blocks(&out.bytes, ImageKind::Jpeg).unwrap();
        assert!(blocks.icc);
        assert!(blocks.is_clean(true));
    }

    #[test]
    fn rotated_jpeg_falls_back_to_reencode() {
        // 6 = rotate 90° clockwise for display
        let input = test_support::jpeg_with_orientation(6);
        let out = strip_metadata(&input, ImageKind::Jpeg, &strip_config(StripMode::Lossless, false)).unwrap();

        assert_eq!(out.mode, StripMode::Reencode);
        assert_eq!(dimensions(&out.bytes), (HEIGHT, WIDTH));
        assert!(inspect_blocks(&out.bytes, ImageKind::Jpeg).unwrap().is_clean(false));
    }

    #[test]
    fn upright_orientation_stays_lossless() {
        let input = test_support::jpeg_with_orientation(1);
        let out = strip_metadata(&input, ImageKind::Jpeg, &strip_config(StripMode::Lossless, false)).unwrap();
        assert_eq!(out.mode, StripMode::Lossless);
    }

    #[test]
    fn lossless_png_drops_text_chunks() {
        let input = test_support::png_with_metadata();
        let out = strip_metadata(&input, ImageKind::Png, &strip_config(StripMode::Lossless, false)).unwrap();

        assert_eq!(out.mode, StripMode::Lossless);
        let blocks = inspect_blocks(&out.bytes, ImageKind::Png).unwrap();
        assert!(blocks.is_clean(false), "left behind: {:?}", blocks.labels());

        let before = image::load_from_memory(&input).unwrap().to_rgb8();
        let after = image::load_from_memory(&out.bytes).unwrap().to_rgb8();
        assert_eq!(before, after);
    }

    #[test]
    fn reencode_png_is_pixel_identical() {
        let input = test_support::png_with_metadata();
        let out = strip_metadata(&input, ImageKind::Png, &strip_config(StripMode::Reencode, false)).unwrap();

        assert!(inspect_blocks(&out.bytes, ImageKind::Png).unwrap().is_clean(false));
        let before = image::load_from_memory(&input).unwrap().to_rgb8();
        let after = image::load_from_memory(&out.bytes).unwrap().to_rgb8();
        assert_eq!(before, after);
    }

    #[test]
    fn tiff_lossless_falls_back() {
        let input = test_support::plain_tiff();
        let out = strip_metadata(&input, ImageKind::Tiff, &strip_config(StripMode::Lossless, false)).unwrap();
        assert_eq!(out.mode, StripMode::Reencode);
        assert_eq!(dimensions(&out.bytes), (WIDTH, HEIGHT));
    }

    #[test]
    fn webp_reencode_round_trips() {
        let input = test_support::plain_webp();
        let out = strip_metadata(&input, ImageKind::WebP, &strip_config(StripMode::Reencode, false)).unwrap();
        assert_eq!(image::guess_format(&out.bytes).unwrap(), image::ImageFormat::WebP);
        assert!(inspect_blocks(&out.bytes, ImageKind::WebP).unwrap().is_clean(false));
    }

    #[test]
    fn lossless_png_keep_icc() {
        let input = test_support::png_with_metadata();
        let out = strip_metadata(&input, ImageKind::Png, &strip_config(StripMode::Lossless, true)).unwrap();

        let blocks = inspect_blocks(&out.bytes, ImageKind::Png).unwrap();
        assert!(blocks.icc);
        assert!(blocks.is_clean(true), "left behind: {:?}", blocks.labels());
    }

    #[test]
    fn reencode_png_can_keep_icc() {
        let input = test_support::png_with_metadata();
        let out = strip_metadata(&input, ImageKind::Png, &strip_config(StripMode::Reencode, true)).unwrap();

        let blocks = inspect_blocks(&out.bytes, ImageKind::Png).unwrap();
        assert!(blocks.icc);
        assert!(!blocks.exif && !blocks.xmp);
        assert_eq!(read_icc(&out.bytes).as_deref(), Some(&b"fake icc profile"[..]));
    }

    #[test]
    fn lossless_webp_drops_everything() {
        let input = test_support::webp_with_metadata();
        assert!(!inspect_blocks(&input, ImageKind::WebP).unwrap().is_clean(false));

        let out = strip_metadata(&input, ImageKind::WebP, &strip_config(StripMode::Lossless, false)).unwrap();
        assert_eq!(out.mode, StripMode::Lossless);
        let blocks = inspect_blocks(&out.bytes, ImageKind::WebP).unwrap();
        assert!(blocks.is_clean(false), "left behind: {:?}", blocks.labels());

        let before = image::load_from_memory(&input).unwrap().to_rgb8();
        let after = image::load_from_memory(&out.bytes).unwrap().to_rgb8();
        assert_eq!(before, after);
    }

    #[test]
    fn lossless_webp_keep_icc() {
        let input = test_support::webp_with_metadata();
        let out = strip_metadata(&input, ImageKind::WebP, &strip_config(StripMode::Lossless, true)).unwrap();

        let blocks = inspect_blocks(&out.bytes, ImageKind::WebP).unwrap();
        assert!(blocks.icc);
        assert!(!blocks.exif && !blocks.xmp);
    }

    #[test]
    fn reencode_webp_can_keep_icc() {
        let input = test_support::webp_with_metadata();
        let out = strip_metadata(&input, ImageKind::WebP, &strip_config(StripMode::Reencode, true)).unwrap();

        let blocks = inspect_blocks(&out.bytes, ImageKind::WebP).unwrap();
        assert!(blocks.icc);
        assert!(blocks.is_clean(true), "left behind: {:?}", blocks.labels());
        assert_eq!(dimensions(&out.bytes), (WIDTH, HEIGHT));

        let webp = WebP::from_bytes(Bytes::from(out.bytes)).unwrap();
        let ids: Vec<[u8; 4]> = webp.chunks().iter().map(|c| c.id()).collect();
        assert_eq!(&ids[..2], &[WEBP_VP8X, WEBP_ICCP]);
    }

    #[test]
    fn tiff_camera_tags_do_not_survive() {
        let input = test_support::tiff_with_metadata();
        let out = strip_metadata(&input, ImageKind::Tiff, &strip_config(StripMode::Reencode, false)).unwrap();

        assert_eq!(dimensions(&out.bytes), (WIDTH, HEIGHT));
        let exif = crate::exif::read_exif_payload(&out.bytes).unwrap();
        assert!(!exif.has_identifying(), "{exif:?}");
    }

    #[test]
    fn corrupt_input_is_an_error() {
        let config = strip_config(StripMode::Reencode, false);
        assert!(strip_metadata(b"\xFF\xD8garbage", ImageKind::Jpeg, &config).is_err());
    }
}

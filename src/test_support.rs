//! Fixture images for unit tests, synthesised in memory.

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use img_parts::jpeg::{Jpeg, JpegSegment};
use img_parts::png::{Png, PngChunk};
use img_parts::riff::{RiffChunk, RiffContent};
use img_parts::webp::{WebP, CHUNK_XMP};
use img_parts::{Bytes, ImageEXIF, ImageICC};
use std::io::Cursor;

pub const WIDTH: u32 = 24;
pub const HEIGHT: u32 = 16;

/// A little-endian TIFF directory with Make, Model and an optional Orientation.
pub fn tiff_block(orientation: Option<u16>) -> Vec<u8> {
    let entry_count: u16 = if orientation.is_some() { 3 } else { 2 };
    let data_start = 8 + 2 + entry_count as u32 * 12 + 4;
    let make = b"Canon\0";
    let model = b"EOS R5\0";

    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"II");
    tiff.extend_from_slice(&42u16.to_le_bytes());
    tiff.extend_from_slice(&8u32.to_le_bytes());
    tiff.extend_from_slice(&entry_count.to_le_bytes());

    // Make (ASCII)
    tiff.extend_from_slice(&0x010Fu16.to_le_bytes());
    tiff.extend_from_slice(&2u16.to_le_bytes());
    tiff.extend_from_slice(&(make.len() as u32).to_le_bytes());
    tiff.extend_from_slice(&data_start.to_le_bytes());

    // Model (ASCII)
    tiff.extend_from_slice(&0x0110u16.to_le_bytes());
    tiff.extend_from_slice(&2u16.to_le_bytes());
    tiff.extend_from_slice(&(model.len() as u32).to_le_bytes());
    tiff.extend_from_slice(&(data_start + make.len() as u32).to_le_bytes());

    // Orientation (SHORT, inline)
    if let Some(o) = orientation {
        tiff.extend_from_slice(&0x0112u16.to_le_bytes());
        tiff.extend_from_slice(&3u16.to_le_bytes());
        tiff.extend_from_slice(&1u32.to_le_bytes());
        tiff.extend_from_slice(&o.to_le_bytes());
        tiff.extend_from_slice(&[0, 0]);
    }

    // No next IFD
    tiff.extend_from_slice(&0u32.to_le_bytes());
    tiff.extend_from_slice(make);
    tiff.extend_from_slice(model);
    tiff
}

fn gradient() -> DynamicImage {
    let img = ImageBuffer::from_fn(WIDTH, HEIGHT, |x, y| {
        Rgb([(x * 10) as u8, (y * 15) as u8, 128])
    });
    DynamicImage::ImageRgb8(img)
}

fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).unwrap();
    out.into_inner()
}

pub fn plain_jpeg() -> Vec<u8> {
    encode(&gradient(), ImageFormat::Jpeg)
}

pub fn plain_png() -> Vec<u8> {
    encode(&gradient(), ImageFormat::Png)
}

pub fn plain_tiff() -> Vec<u8> {
    encode(&gradient(), ImageFormat::Tiff)
}

pub fn plain_webp() -> Vec<u8> {
    encode(&gradient(), ImageFormat::WebP)
}

/// A JPEG carrying EXIF, XMP, IPTC, an ICC profile and a COM segment.
pub fn jpeg_with_metadata() -> Vec<u8> {
    decorate_jpeg(plain_jpeg(), None)
}

/// A JPEG whose EXIF says it must be rotated for display.
pub fn jpeg_with_orientation(orientation: u16) -> Vec<u8> {
    decorate_jpeg(plain_jpeg(), Some(orientation))
}

fn decorate_jpeg(bytes: Vec<u8>, orientation: Option<u16>) -> Vec<u8> {
    let mut jpeg = Jpeg::from_bytes(Bytes::from(bytes)).unwrap();
    jpeg.set_exif(Some(Bytes::from(tiff_block(orientation))));
    jpeg.set_icc_profile(Some(Bytes::from_static(b"fake icc profile")));

    let mut xmp = b"http://ns.adobe.com/xap/1.0/\0".to_vec();
    xmp.extend_from_slice(b"<x:xmpmeta xmlns:x=\"adobe:ns:meta/\"><dc:creator>Jane</dc:creator></x:xmpmeta>");
    let mut iptc = b"Photoshop 3.0\0".to_vec();
    iptc.extend_from_slice(b"8BIM\x04\x04\0\0\0\0\0\0");

    let segments = jpeg.segments_mut();
    let at = segments.len().min(2);
    segments.insert(at, JpegSegment::new_with_contents(0xE1, Bytes::from(xmp)));
    segments.insert(at, JpegSegment::new_with_contents(0xED, Bytes::from(iptc)));
    segments.insert(at, JpegSegment::new_with_contents(0xFE, Bytes::from_static(b"shot by Jane")));

    jpeg.encoder().bytes().to_vec()
}

/// A PNG carrying eXIf, an XMP iTXt chunk, a tEXt comment, a tIME stamp and an ICC profile.
pub fn png_with_metadata() -> Vec<u8> {
    let mut png = Png::from_bytes(Bytes::from(plain_png())).unwrap();

    let mut xmp = b"XML:com.adobe.xmp\0\0\0\0\0".to_vec();
    xmp.extend_from_slice(b"<x:xmpmeta xmlns:x=\"adobe:ns:meta/\"/>");

    let extra = vec![
        PngChunk::new(*b"eXIf", Bytes::from(tiff_block(None))),
        PngChunk::new(*b"iTXt", Bytes::from(xmp)),
        PngChunk::new(*b"tEXt", Bytes::from_static(b"Author\0Jane")),
        PngChunk::new(*b"tIME", Bytes::from_static(&[0x07, 0xE8, 1, 2, 3, 4, 5])),
    ];

    // Right after IHDR, ahead of IDAT
    let chunks = png.chunks_mut();
    for chunk in extra.into_iter().rev() {
        chunks.insert(1, chunk);
    }
    png.set_icc_profile(Some(Bytes::from_static(b"fake icc profile")));

    png.encoder().bytes().to_vec()
}

/// A lossless WebP carrying EXIF, an XMP chunk and an ICC profile.
pub fn webp_with_metadata() -> Vec<u8> {
    let mut webp = WebP::from_bytes(Bytes::from(plain_webp())).unwrap();
    // XMP and EXIF first so the VP8X header lands in front of the bitstream
    let xmp = Bytes::from_static(b"<x:xmpmeta xmlns:x=\"adobe:ns:meta/\"/>");
    webp.chunks_mut().push(RiffChunk::new(CHUNK_XMP, RiffContent::Data(xmp)));
    webp.set_exif(Some(Bytes::from(tiff_block(None))));
    webp.set_icc_profile(Some(Bytes::from_static(b"fake icc profile")));
    webp.encoder().bytes().to_vec()
}

/// An 8-bit greyscale TIFF whose IFD0 also names the camera.
pub fn tiff_with_metadata() -> Vec<u8> {
    const ASCII: u16 = 2;
    const SHORT: u16 = 3;
    const LONG: u16 = 4;

    let make = b"Canon\0";
    let model = b"EOS R5\0";
    let entry_count: u32 = 11;
    let make_at = 8 + 2 + entry_count * 12 + 4;
    let model_at = make_at + make.len() as u32;
    let pixels_at = (model_at + model.len() as u32 + 1) & !1;
    let pixel_count = WIDTH * HEIGHT;

    let entries: [(u16, u16, u32, u32); 11] = [
        (0x0100, SHORT, 1, WIDTH),
        (0x0101, SHORT, 1, HEIGHT),
        (0x0102, SHORT, 1, 8),
        (0x0103, SHORT, 1, 1),
        (0x0106, SHORT, 1, 1),
        (0x010F, ASCII, make.len() as u32, make_at),
        (0x0110, ASCII, model.len() as u32, model_at),
        (0x0111, LONG, 1, pixels_at),
        (0x0115, SHORT, 1, 1),
        (0x0116, SHORT, 1, HEIGHT),
        (0x0117, LONG, 1, pixel_count),
    ];

    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"II");
    tiff.extend_from_slice(&42u16.to_le_bytes());
    tiff.extend_from_slice(&8u32.to_le_bytes());
    tiff.extend_from_slice(&(entry_count as u16).to_le_bytes());
    // Little-endian, so an inline SHORT is the low half of the u32
    for (tag, kind, count, value) in entries {
        tiff.extend_from_slice(&tag.to_le_bytes());
        tiff.extend_from_slice(&kind.to_le_bytes());
        tiff.extend_from_slice(&count.to_le_bytes());
        tiff.extend_from_slice(&value.to_le_bytes());
    }
    tiff.extend_from_slice(&0u32.to_le_bytes());
    tiff.extend_from_slice(make);
    tiff.extend_from_slice(model);
    tiff.resize(pixels_at as usize, 0);
    tiff.extend((0..pixel_count).map(|i| (i % 251) as u8));
    tiff
}

use anyhow::{Context, Result};
use nom_exif::*;
use serde::Serialize;
use std::io::Cursor;
use std::path::Path;

use super::blocks::EXIF_PREFIX;

// IFD0 / ExifIFD tag IDs
const TAG_IMAGE_DESCRIPTION: u16 = 0x010E;
const TAG_MAKE: u16 = 0x010F;
const TAG_MODEL: u16 = 0x0110;
const TAG_ORIENTATION: u16 = 0x0112;
const TAG_SOFTWARE: u16 = 0x0131;
const TAG_ARTIST: u16 = 0x013B;
const TAG_COPYRIGHT: u16 = 0x8298;
const TAG_DATE_TIME_ORIGINAL: u16 = 0x9003;
const TAG_BODY_SERIAL_NUMBER: u16 = 0xA431;
const TAG_LENS_MODEL: u16 = 0xA434;

/// A single EXIF entry as read from the file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagEntry {
    /// Index of the IFD the entry was found in.
    pub ifd: usize,
    /// Tag name, or the hex tag code when the parser does not know it.
    pub tag: String,
    /// Raw tag code.
    pub code: u16,
    /// Value rendered as text.
    pub value: String,
}

/// EXIF data extracted from an image.
///
/// The named fields are the ones that identify a person, a device or a place;
/// `entries` lists everything the parser read.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExifData {
    pub make: Option<String>,
    pub model: Option<String>,
    pub lens_model: Option<String>,
    pub software: Option<String>,
    pub artist: Option<String>,
    pub copyright: Option<String>,
    pub serial_number: Option<String>,
    pub date_time: Option<String>,
    pub description: Option<String>,
    pub orientation: Option<String>,
    pub has_gps: bool,
    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
    pub entries: Vec<TagEntry>,
}

impl ExifData {
    /// `true` when no EXIF entries were read at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && !self.has_gps
    }

    /// `true` when any field that points at a person, device or place is set.
    pub fn has_identifying(&self) -> bool {
        self.has_gps
            || self.make.is_some()
            || self.model.is_some()
            || self.lens_model.is_some()
            || self.software.is_some()
            || self.artist.is_some()
            || self.copyright.is_some()
            || self.serial_number.is_some()
            || self.date_time.is_some()
            || self.description.is_some()
    }
}

/// Read EXIF data from an image file.
///
/// Files without an EXIF directory yield an empty [`ExifData`].
pub fn read_exif(path: &Path) -> Result<ExifData> {
    let mut parser = MediaParser::new();
    let ms = MediaSource::file_path(path).context("Failed to open image file")?;

    let iter: ExifIter = match parser.parse(ms) {
        Ok(iter) => iter,
        Err(_) => {
            log::debug!("No EXIF data found in {}", path.display());
            return Ok(ExifData::default());
        }
    };

    let data = collect_exif(iter);
    log::debug!("Read {} EXIF entries from {}", data.entries.len(), path.display());
    Ok(data)
}

/// Read EXIF data from a bare TIFF directory, as stored in a PNG `eXIf` or
/// WebP `EXIF` chunk. A leading `Exif\0\0` header is skipped.
pub fn read_exif_payload(payload: &[u8]) -> Result<ExifData> {
    let tiff = payload.strip_prefix(EXIF_PREFIX).unwrap_or(payload);
    let mut parser = MediaParser::new();
    let ms = MediaSource::seekable(Cursor::new(tiff.to_vec()))
        .context("Failed to open embedded EXIF")?;
    let iter: ExifIter = parser
        .parse(ms)
        .context("Failed to parse embedded EXIF")?;

    let data = collect_exif(iter);
    log::debug!("Read {} EXIF entries from embedded payload", data.entries.len());
    Ok(data)
}

fn collect_exif(iter: ExifIter) -> ExifData {
    // Parse GPS info before walking the entries (walking consumes the iterator)
    let gps_info = iter.parse_gps_info().ok().flatten();

    let mut data = ExifData::default();

    for entry in iter {
        let Some(value) = entry.get_value() else {
            continue;
        };
        let Some(text) = entry_to_string(value) else {
            continue;
        };
        let code = entry.tag_code();
        let tag = entry
            .tag()
            .map(|t| format!("{t:?}"))
            .unwrap_or_else(|| format!("0x{code:04X}"));

        // GPS sub-IFD codes live below 0x0100 and never collide with these
        let slot = match code {
            TAG_MAKE => Some(&mut data.make),
            TAG_MODEL => Some(&mut data.model),
            TAG_LENS_MODEL => Some(&mut data.lens_model),
            TAG_SOFTWARE => Some(&mut data.software),
            TAG_ARTIST => Some(&mut data.artist),
            TAG_COPYRIGHT => Some(&mut data.copyright),
            TAG_BODY_SERIAL_NUMBER => Some(&mut data.serial_number),
            TAG_DATE_TIME_ORIGINAL => Some(&mut data.date_time),
            TAG_IMAGE_DESCRIPTION => Some(&mut data.description),
            TAG_ORIENTATION => Some(&mut data.orientation),
            _ => None,
        };
        if let Some(slot) = slot {
            if slot.is_none() {
                *slot = Some(text.clone());
            }
        }

        data.entries.push(TagEntry {
            ifd: entry.ifd_index(),
            tag,
            code,
            value: text,
        });
    }

    if let Some(gps) = gps_info {
        data.has_gps = true;
        data.gps_latitude = Some(latlng_to_decimal(&gps.latitude, gps.latitude_ref));
        data.gps_longitude = Some(latlng_to_decimal(&gps.longitude, gps.longitude_ref));
    }

    data
}

/// Convert an EntryValue to an Option<String>.
fn entry_to_string(val: &EntryValue) -> Option<String> {
    let s = val.to_string();
    let s = s.trim().trim_matches('"').trim_end_matches('\0').to_string();
    if s.is_empty() { None } else { Some(s) }
}

/// Convert a nom-exif LatLng (3 URationals: deg, min, sec) to decimal degrees.
fn latlng_to_decimal(latlng: &LatLng, reference: char) -> f64 {
    dms_to_decimal(
        [
            (latlng.0.0, latlng.0.1),
            (latlng.1.0, latlng.1.1),
            (latlng.2.0, latlng.2.1),
        ],
        reference,
    )
}

/// Degrees/minutes/seconds rationals to signed decimal degrees.
fn dms_to_decimal(dms: [(u32, u32); 3], reference: char) -> f64 {
    let degrees = rational_to_f64(dms[0].0, dms[0].1);
    let minutes = rational_to_f64(dms[1].0, dms[1].1);
    let seconds = rational_to_f64(dms[2].0, dms[2].1);

    let mut coord = degrees + minutes / 60.0 + seconds / 3600.0;

    if reference == 'S' || reference == 'W' {
        coord = -coord;
    }

    coord
}

fn rational_to_f64(num: u32, den: u32) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use super::blocks::{embedded_exif, inspect_blocks, MetadataBlocks};
use super::reader::{read_exif, read_exif_payload, ExifData};
use crate::pipeline::ImageKind;

/// Everything known about the metadata of one image file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataReport {
    pub path: PathBuf,
    pub file_name: String,
    pub kind: ImageKind,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub file_size: u64,
    pub blocks: MetadataBlocks,
    pub exif: ExifData,
}

impl MetadataReport {
    /// `true` when the file carries no metadata (ICC ignored if `keep_icc`).
    pub fn is_clean(&self, keep_icc: bool) -> bool {
        self.blocks.is_clean(keep_icc) && !self.exif.has_identifying()
    }
}

/// Inspect the metadata of an image file.
///
/// The container format is sniffed from the file contents, falling back to
/// the extension. Files that are neither are rejected.
///
/// # Example
///
/// ```rust,no_run
/// use exif_scrub::exif::inspect;
/// use std::path::Path;
///
/// let report = inspect(Path::new("photo.jpg")).unwrap();
/// if report.exif.has_gps {
///     println!("{} leaks a location", report.file_name);
/// }
/// println!("{report}");
/// ```
pub fn inspect(path: &Path) -> Result<MetadataReport> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let kind = ImageKind::from_bytes(&bytes)
        .or_else(|| ImageKind::from_path(path))
        .with_context(|| format!("Unsupported image format: {}", path.display()))?;

    let mut blocks = inspect_blocks(&bytes, kind)?;

    let mut exif = match read_exif(path) {
        Ok(data) => data,
        Err(e) => {
            log::warn!("Failed to read EXIF from {}: {e}", path.display());
            ExifData::default()
        }
    };

    // PNG and WebP keep a bare TIFF directory in a chunk of their own
    if exif.is_empty() {
        if let Some(payload) = embedded_exif(&bytes, kind) {
            match read_exif_payload(&payload) {
                Ok(data) => exif = data,
                Err(e) => log::warn!("Failed to read EXIF chunk of {}: {e:#}", path.display()),
            }
        }
    }

    if kind == ImageKind::Tiff {
        blocks.exif = exif.has_identifying();
    }

    let (width, height) = match image::ImageReader::new(Cursor::new(&bytes))
        .with_guessed_format()
        .ok()
        .and_then(|r| r.into_dimensions().ok())
    {
        Some((w, h)) => (Some(w), Some(h)),
        None => (None, None),
    };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(MetadataReport {
        path: path.to_path_buf(),
        file_name,
        kind,
        width,
        height,
        file_size: bytes.len() as u64,
        blocks,
        exif,
    })
}

impl fmt::Display for MetadataReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?}", self.file_name, self.kind)?;
        if let (Some(w), Some(h)) = (self.width, self.height) {
            write!(f, ", {w} x {h}")?;
        }
        writeln!(f, ", {} bytes)", self.file_size)?;

        let labels = self.blocks.labels();
        if labels.is_empty() {
            writeln!(f, "  metadata: none")?;
        } else {
            writeln!(f, "  metadata: {}", labels.join(", "))?;
        }

        let exif = &self.exif;
        let fields = [
            ("Make", &exif.make),
            ("Model", &exif.model),
            ("LensModel", &exif.lens_model),
            ("Software", &exif.software),
            ("Artist", &exif.artist),
            ("Copyright", &exif.copyright),
            ("SerialNumber", &exif.serial_number),
            ("DateTimeOriginal", &exif.date_time),
            ("ImageDescription", &exif.description),
            ("Orientation", &exif.orientation),
        ];
        for (name, value) in fields {
            if let Some(v) = value {
                writeln!(f, "  {name:<18}: {v}")?;
            }
        }
        if let (Some(lat), Some(lon)) = (exif.gps_latitude, exif.gps_longitude) {
            writeln!(f, "  {:<18}: {lat:.6}, {lon:.6}", "GPS")?;
        }
        if !exif.entries.is_empty() {
            writeln!(f, "  {} EXIF entries in total", exif.entries.len())?;
        }
        Ok(())
    }
}

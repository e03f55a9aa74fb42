use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use walkdir::WalkDir;

use crate::config::{Config, OutputConfig, StripMode};
use crate::exif::{self, MetadataBlocks};

/// Supported image extensions.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "tif", "tiff"];

/// The container format of an image file.
///
/// Each format has its own set of metadata containers:
/// - **JPEG** — APP1 (EXIF, XMP), APP13 (IPTC), APP2 (ICC), COM
/// - **PNG** — `eXIf`, `iTXt`/`tEXt`/`zTXt`, `tIME`, `iCCP`
/// - **WebP** — `EXIF`, `XMP `, `ICCP`
/// - **TIFF** — the file is itself an EXIF directory
///
/// # Example
///
/// ```rust
/// use exif_scrub::pipeline::ImageKind;
/// use std::path::Path;
///
/// let kind = ImageKind::from_path(Path::new("photo.JPG"));
/// assert_eq!(kind, Some(ImageKind::Jpeg));
///
/// let kind = ImageKind::from_path(Path::new("photo.heic"));
/// assert_eq!(kind, None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Jpeg,
    Png,
    WebP,
    Tiff,
}

impl ImageKind {
    /// Determine the image kind from a file path extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            "tif" | "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    /// Determine the image kind from the file's magic bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match image::guess_format(bytes).ok()? {
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::WebP => Some(Self::WebP),
            image::ImageFormat::Tiff => Some(Self::Tiff),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Tiff => "image/tiff",
        }
    }

    pub fn image_format(&self) -> image::ImageFormat {
        match self {
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
            Self::WebP => image::ImageFormat::WebP,
            Self::Tiff => image::ImageFormat::Tiff,
        }
    }
}

/// The result of scrubbing a single image.
///
/// Failures are reported through `error` so a batch keeps going.
#[derive(Debug, Clone, Serialize)]
pub struct ScrubResult {
    pub path: PathBuf,
    /// Where the clean copy was (or, in a dry run, would be) written.
    pub output_path: Option<PathBuf>,
    pub kind: Option<ImageKind>,
    /// The strip mode actually used.
    pub mode: Option<StripMode>,
    /// Metadata found in the original.
    pub found: MetadataBlocks,
    /// Metadata still present in the written copy. Empty unless something went wrong.
    pub residual: MetadataBlocks,
    pub bytes_before: u64,
    pub bytes_after: u64,
    pub dry_run: bool,
    pub error: Option<String>,
}

impl ScrubResult {
    fn new(path: &Path, dry_run: bool) -> Self {
        Self {
            path: path.to_path_buf(),
            output_path: None,
            kind: None,
            mode: None,
            found: MetadataBlocks::default(),
            residual: MetadataBlocks::default(),
            bytes_before: 0,
            bytes_after: 0,
            dry_run,
            error: None,
        }
    }
}

/// Collect supported image files from the given paths.
///
/// Accepts a mix of file paths and directory paths. Directories are walked
/// recursively (following symlinks). Only files with supported image extensions
/// are included. Unless `output.in_place` is set, clean copies left by an
/// earlier run (stem ending in `output.suffix`) are skipped.
///
/// # Example
///
/// ```rust,no_run
/// use exif_scrub::config::Config;
/// use exif_scrub::pipeline::collect_images;
/// use std::path::PathBuf;
///
/// let config = Config::default();
/// let images = collect_images(
///     &[
///         PathBuf::from("photo.jpg"),       // single file
///         PathBuf::from("./photos/"),        // entire directory
///     ],
///     &config.output,
/// );
/// println!("Found {} images", images.len());
/// ```
pub fn collect_images(paths: &[PathBuf], output: &OutputConfig) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_supported_image(path) {
                images.push(path.clone());
            } else {
                log::warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let p = entry.path();
                if p.is_file() && is_supported_image(p) {
                    images.push(p.to_path_buf());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    if !output.in_place {
        images.retain(|p| {
            let skip = is_clean_copy(p, &output.suffix);
            if skip {
                log::debug!("Skipping clean copy: {}", p.display());
            }
            !skip
        });
    }

    images
}

/// Check if a file has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// `true` if the file looks like a clean copy written by an earlier run.
pub fn is_clean_copy(path: &Path, suffix: &str) -> bool {
    !suffix.is_empty()
        && path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.ends_with(suffix))
            .unwrap_or(false)
}

/// Where the clean copy of `path` goes.
///
/// In place → the input itself. Otherwise `<dir>/<stem><suffix>.<ext>`, with
/// `dir` being `output_dir` or the input's own directory.
pub fn output_path_for(path: &Path, output: &OutputConfig) -> Result<PathBuf> {
    if output.in_place {
        return Ok(path.to_path_buf());
    }

    let stem = path
        .file_stem()
        .with_context(|| format!("No file name in {}", path.display()))?
        .to_string_lossy();
    let file_name = match path.extension() {
        Some(ext) => format!("{stem}{}.{}", output.suffix, ext.to_string_lossy()),
        None => format!("{stem}{}", output.suffix),
    };

    let dir = match &output.output_dir {
        Some(dir) => PathBuf::from(dir),
        None => path.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    let out = dir.join(file_name);

    if is_same_file(&out, path) {
        anyhow::bail!(
            "Output {} would overwrite the original; set a suffix or use in_place",
            out.display()
        );
    }
    Ok(out)
}

/// `true` if both paths name the same file once `.`, `..` and symlinks are resolved.
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Create a backup of the original file.
fn backup_file(path: &Path) -> Result<PathBuf> {
    let backup_path = path.with_extension(format!(
        "{}.bak",
        path.extension().unwrap_or_default().to_string_lossy()
    ));

    if !backup_path.exists() {
        std::fs::copy(path, &backup_path).context("Failed to create backup")?;
        log::debug!("Backup created: {}", backup_path.display());
    }

    Ok(backup_path)
}

/// Scrub a single image.
///
/// 1. **Inspect** — detect the format and the metadata it carries
/// 2. **Strip** — re-encode or drop metadata containers (see [`exif::strip_metadata`])
/// 3. **Write** — to the output path (backup first when replacing in place)
/// 4. **Verify** — inspect the written copy and record anything left behind
///
/// In a dry run steps 3 and 4 are skipped.
///
/// # Example
///
/// ```rust,no_run
/// use exif_scrub::config::Config;
/// use exif_scrub::pipeline::scrub_image;
/// use std::path::Path;
///
/// let result = scrub_image(Path::new("photo.jpg"), &Config::default());
/// match result.error {
///     Some(err) => eprintln!("{err}"),
///     None => println!("Clean copy: {:?}", result.output_path),
/// }
/// ```
pub fn scrub_image(path: &Path, config: &Config) -> ScrubResult {
    let mut result = ScrubResult::new(path, config.output.dry_run);
    if let Err(e) = scrub_into(path, config, &mut result) {
        result.error = Some(format!("{e:#}"));
    }
    result
}

fn scrub_into(path: &Path, config: &Config, result: &mut ScrubResult) -> Result<()> {
    let report = exif::inspect(path)?;
    result.kind = Some(report.kind);
    result.found = report.blocks;
    result.bytes_before = report.file_size;

    let output_path = output_path_for(path, &config.output)?;
    result.output_path = Some(output_path.clone());

    let bytes = std::fs::read(path).context("Failed to read file")?;
    let stripped = exif::strip_metadata(&bytes, report.kind, &config.strip)?;
    result.mode = Some(stripped.mode);
    result.bytes_after = stripped.bytes.len() as u64;

    if config.output.dry_run {
        return Ok(());
    }

    if config.output.in_place && config.output.backup_originals {
        if let Err(e) = backup_file(path) {
            log::warn!("Failed to backup {}: {e}", path.display());
        }
    }

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    std::fs::write(&output_path, &stripped.bytes)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    let written = exif::inspect(&output_path)?;
    result.residual = written.blocks;
    if !written.is_clean(config.strip.keep_icc) {
        log::warn!(
            "Metadata left in {}: {}",
            output_path.display(),
            written.blocks.labels().join(", ")
        );
    }

    Ok(())
}

/// Scrub many images concurrently.
///
/// Each file runs on tokio's blocking pool; at most `config.jobs` run at once.
/// Results come back in the same order as `paths`.
///
/// # Example
///
/// ```rust,no_run
/// use exif_scrub::config::Config;
/// use exif_scrub::pipeline::{collect_images, process_batch};
/// use std::path::PathBuf;
///
/// # async fn example() {
/// let config = Config::default();
/// let images = collect_images(&[PathBuf::from("./photos")], &config.output);
/// let results = process_batch(images, config).await;
/// let failed = results.iter().filter(|r| r.error.is_some()).count();
/// println!("{failed} failed");
/// # }
/// ```
pub async fn process_batch(paths: Vec<PathBuf>, config: Config) -> Vec<ScrubResult> {
    let total = paths.len();
    let config = Arc::new(config);
    let permits = Arc::new(Semaphore::new(config.jobs.max(1)));
    let mut tasks = JoinSet::new();

    for (index, path) in paths.iter().cloned().enumerate() {
        let config = Arc::clone(&config);
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            log::info!("[{}/{}] Scrubbing: {}", index + 1, total, path.display());
            let result = tokio::task::spawn_blocking(move || scrub_image(&path, &config)).await;
            (index, result)
        });
    }

    let mut slots: Vec<Option<ScrubResult>> = vec![None; total];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, Ok(result))) => slots[index] = Some(result),
            Ok((index, Err(e))) => log::error!("Worker for image #{} failed: {e}", index + 1),
            Err(e) => log::error!("Batch task failed: {e}"),
        }
    }

    slots
        .into_iter()
        .zip(paths)
        .map(|(slot, path)| {
            slot.unwrap_or_else(|| {
                let mut failed = ScrubResult::new(&path, config.output.dry_run);
                failed.error = Some("Worker panicked".to_string());
                failed
            })
        })
        .collect()
}

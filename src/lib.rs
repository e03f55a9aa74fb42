//! # exif-scrub
//!
//! Inspect the EXIF, XMP, IPTC and ICC metadata embedded in an image and
//! produce a visually identical copy without it, so photos can be shared
//! without leaking camera or location details.
//!
//! ## Quick Start
//!
//! The pipeline module handles the full inspect → strip → write → verify flow:
//!
//! ```rust,no_run
//! use exif_scrub::config::Config;
//! use exif_scrub::pipeline::{collect_images, process_batch};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Some("config.json".as_ref()))?;
//!
//!     // Collect supported image files from paths (files or directories)
//!     let images = collect_images(&[PathBuf::from("./photos")], &config.output);
//!
//!     for result in process_batch(images, config).await {
//!         match result.error {
//!             Some(err) => eprintln!("Error processing {}: {err}", result.path.display()),
//!             None => println!("Removed {:?} from {}", result.found.labels(), result.path.display()),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! ```rust,no_run
//! use exif_scrub::config::StripConfig;
//! use exif_scrub::config::StripMode;
//! use exif_scrub::exif::{inspect, strip_metadata};
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let path = Path::new("photo.jpg");
//!
//!     // 1. See what is embedded
//!     let report = inspect(path)?;
//!     println!("{report}");
//!
//!     // 2. Strip it
//!     let strip = StripConfig { mode: StripMode::Lossless, keep_icc: false, jpeg_quality: 92 };
//!     let stripped = strip_metadata(&std::fs::read(path)?, report.kind, &strip)?;
//!     std::fs::write("photo_clean.jpg", &stripped.bytes)?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Formats
//!
//! | Format | Re-encode | Lossless |
//! |--------|-----------|----------|
//! | JPEG (`.jpg`, `.jpeg`) | yes | drops APP1/APP2/APP13/other APPn and COM |
//! | PNG (`.png`) | yes | drops `eXIf`, text chunks, `tIME`, `iCCP` |
//! | WebP (`.webp`) | yes (lossless VP8L) | drops `EXIF`, `XMP `, `ICCP` |
//! | TIFF (`.tif`, `.tiff`) | yes | falls back to re-encode |
//!
//! ## Modules
//!
//! - [`config`] — Configuration types and loading/saving
//! - [`exif`] — Metadata inspection and removal
//! - [`history`] — Linear undo/redo stacks
//! - [`pipeline`] — Image collection, format detection, single and batch scrubbing
//! - [`session`] — One-image working state with undo/redo
//! - [`shell`] — Line-driven commands over a session

pub mod config;
pub mod exif;
pub mod history;
pub mod pipeline;
pub mod session;
pub mod shell;

#[cfg(test)]
pub(crate) mod test_support;

//! EXIF, XMP, IPTC and ICC metadata inspection and removal.
//!
//! - [`read_exif`] — parse the EXIF directory of an image
//! - [`inspect_blocks`] — detect which metadata containers a file carries
//! - [`inspect`] — both of the above plus file facts, as a [`MetadataReport`]
//! - [`strip_metadata`] — produce a metadata-free copy (re-encode or lossless)

mod blocks;
mod reader;
mod report;
mod scrubber;

pub use blocks::{inspect_blocks, MetadataBlocks};
pub use reader::{read_exif, read_exif_payload, ExifData, TagEntry};
pub use report::{inspect, MetadataReport};
pub use scrubber::{strip_metadata, Stripped};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::exif::{self, MetadataReport};
use crate::history::History;
use crate::pipeline::{self, ScrubResult};

/// The working state of an interactive session.
///
/// Every mutating action snapshots this whole record so it can be undone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// The image currently open.
    pub image: Option<PathBuf>,
    /// Display name of the open image.
    pub file_name: Option<String>,
    /// Metadata found in the open image.
    pub metadata: Option<MetadataReport>,
    /// The clean copy produced from the open image, if any.
    pub processed: Option<PathBuf>,
}

/// One image at a time: open, inspect, scrub, with undo/redo.
///
/// # Example
///
/// ```rust,no_run
/// use exif_scrub::config::Config;
/// use exif_scrub::session::Session;
/// use std::path::Path;
///
/// let mut session = Session::new(Config::default());
/// session.open(Path::new("photo.jpg")).unwrap();
/// session.scrub().unwrap();
/// println!("clean copy: {:?}", session.state().processed);
///
/// session.undo(); // back to "opened, not yet scrubbed"
/// ```
#[derive(Debug)]
pub struct Session {
    config: Config,
    state: SessionState,
    history: History<SessionState>,
}

impl Session {
    pub fn new(mut config: Config) -> Self {
        // A session always produces a real file to point at
        config.output.dry_run = false;
        let history = History::new(config.history.limit);
        Self {
            config,
            state: SessionState::default(),
            history,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open an image and read its metadata.
    ///
    /// On error the session is left unchanged.
    pub fn open(&mut self, path: &Path) -> Result<&MetadataReport> {
        let report = exif::inspect(path)?;
        log::info!("Opened {}", path.display());

        let next = SessionState {
            image: Some(path.to_path_buf()),
            file_name: Some(report.file_name.clone()),
            metadata: Some(report),
            processed: None,
        };
        self.apply(next);
        self.state
            .metadata
            .as_ref()
            .context("Session lost the report it just stored")
    }

    /// Write a metadata-free copy of the open image.
    pub fn scrub(&mut self) -> Result<ScrubResult> {
        let image = self
            .state
            .image
            .clone()
            .context("No image is open; use `open <path>` first")?;

        let result = pipeline::scrub_image(&image, &self.config);
        if let Some(ref err) = result.error {
            anyhow::bail!("Failed to scrub {}: {err}", image.display());
        }
        let output = result
            .output_path
            .clone()
            .context("Scrub finished without an output path")?;

        let mut next = self.state.clone();
        next.processed = Some(output);
        self.apply(next);
        Ok(result)
    }

    /// Close the open image. Undoable.
    pub fn clear(&mut self) -> bool {
        if self.state == SessionState::default() {
            return false;
        }
        self.apply(SessionState::default());
        true
    }

    pub fn undo(&mut self) -> bool {
        self.history.undo(&mut self.state)
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo(&mut self.state)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_depth(&self) -> usize {
        self.history.undo_depth()
    }

    pub fn redo_depth(&self) -> usize {
        self.history.redo_depth()
    }

    fn apply(&mut self, next: SessionState) {
        let previous = std::mem::replace(&mut self.state, next);
        self.history.record(previous);
    }
}

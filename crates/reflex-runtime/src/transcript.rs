//! Observation transcript.
//!
//! Reactors configured with `log = true` get every observation they
//! publish appended here in the XML wire format, one per line, prefixed
//! by the tick it was published for. Replay tooling consumes the file by
//! exact string comparison.

use reflex_reactor::Observation;
use reflex_types::Tick;
use std::cell::RefCell;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Append-only observation log.
pub struct Transcript {
    path: PathBuf,
    writer: RefCell<BufWriter<File>>,
}

impl Transcript {
    /// Creates `observations.log` inside `dir`, creating the directory
    /// as needed.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the directory or file
    /// cannot be created.
    pub fn create(dir: &Path) -> std::io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join("observations.log");
        let file = File::create(&path)?;
        Ok(Self {
            path,
            writer: RefCell::new(BufWriter::new(file)),
        })
    }

    /// Where the transcript is written.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one observation. Write failures are logged, not
    /// propagated; a full disk must not take the tick loop down.
    pub fn record(&self, tick: Tick, observation: &dyn Observation) {
        let mut writer = self.writer.borrow_mut();
        if let Err(err) = writeln!(writer, "[{tick}] {}", observation.to_xml()) {
            warn!(error = %err, path = %self.path.display(), "transcript write failed");
        }
    }

    /// Flushes buffered lines to disk.
    pub fn flush(&self) {
        if let Err(err) = self.writer.borrow_mut().flush() {
            warn!(error = %err, path = %self.path.display(), "transcript flush failed");
        }
    }
}

impl Drop for Transcript {
    fn drop(&mut self) {
        self.flush();
    }
}

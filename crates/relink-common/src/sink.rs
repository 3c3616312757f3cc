//! # Log Sinks
//!
//! The protocol prescribes several text artifacts keyed by a logical name:
//! the sender's `seqnum` and `ack` logs, the receiver's `arrival` log, and
//! each router's `topology_<rid>` / `routingtable_<rid>` files. These are
//! not diagnostics — graders and tests read them post-mortem — so every
//! record is flushed as soon as it is written.
//!
//! A sink named `foo` is the file `foo.log`, truncated when the sink is
//! opened.

use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// One line of UTF-8 text per record.
pub struct LineSink {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl LineSink {
    /// Open (and truncate) `<name>.log` in the working directory.
    pub fn create(name: &str) -> io::Result<Self> {
        Self::create_in(Path::new("."), name)
    }

    /// Open (and truncate) `<dir>/<name>.log`.
    pub fn create_in(dir: &Path, name: &str) -> io::Result<Self> {
        let path = dir.join(format!("{name}.log"));
        let file = File::create(&path)?;
        tracing::debug!(path = %path.display(), "opened log sink");
        Ok(LineSink {
            writer: BufWriter::new(file),
            path,
        })
    }

    /// Append one record and flush.
    pub fn record(&mut self, value: impl Display) -> io::Result<()> {
        writeln!(self.writer, "{value}")?;
        self.writer.flush()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Whole rendered blocks per record, separated by a blank line.
pub struct BlockSink {
    inner: LineSink,
    any_written: bool,
}

impl BlockSink {
    /// Open (and truncate) `<name>.log` in the working directory.
    pub fn create(name: &str) -> io::Result<Self> {
        Self::create_in(Path::new("."), name)
    }

    /// Open (and truncate) `<dir>/<name>.log`.
    pub fn create_in(dir: &Path, name: &str) -> io::Result<Self> {
        Ok(BlockSink {
            inner: LineSink::create_in(dir, name)?,
            any_written: false,
        })
    }

    /// Append one block (already newline-terminated) and flush. Blocks
    /// after the first are preceded by a blank line.
    pub fn record_block(&mut self, block: &str) -> io::Result<()> {
        if self.any_written {
            writeln!(self.inner.writer)?;
        }
        self.any_written = true;
        self.inner.writer.write_all(block.as_bytes())?;
        self.inner.writer.flush()
    }

    pub fn path(&self) -> &Path {
        self.inner.path()
    }
}

//! Destination sinks for one download: open files under the output
//! directory and fan every write out to all of them.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes one stream to an ordered, non-empty set of sinks.
///
/// Every operation is attempted on every sink even after a failure; the
/// first error is propagated with the remaining ones appended to its
/// message, so a single bad destination can neither mask the others nor be
/// masked by them. Best-effort multi-file semantics: sinks that succeeded
/// before the first error keep whatever was written; there is no rollback.
pub struct FanoutWriter<W> {
    sinks: Vec<W>,
}

impl<W: Write> FanoutWriter<W> {
    pub fn new(sinks: Vec<W>) -> Self {
        debug_assert!(!sinks.is_empty(), "fan-out writer needs at least one sink");
        Self { sinks }
    }

    fn for_each_sink(&mut self, op: &str, mut f: impl FnMut(&mut W) -> io::Result<()>) -> io::Result<()> {
        let mut errors: Vec<io::Error> = Vec::new();
        for sink in &mut self.sinks {
            if let Err(e) = f(sink) {
                errors.push(e);
            }
        }
        collect_errors(op, errors)
    }

    /// Flushes every sink and consumes the writer; file handles close on drop.
    pub fn finish(mut self) -> io::Result<()> {
        self.for_each_sink("close", |sink| sink.flush())
    }
}

impl<W: Write> Write for FanoutWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.for_each_sink("write", |sink| sink.write_all(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.for_each_sink("flush", |sink| sink.flush())
    }
}

/// Folds per-sink errors into one: the first error wins, the rest ride along
/// in its message.
fn collect_errors(op: &str, mut errors: Vec<io::Error>) -> io::Result<()> {
    if errors.is_empty() {
        return Ok(());
    }
    let first = errors.remove(0);
    if errors.is_empty() {
        return Err(first);
    }
    let rest = errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    Err(io::Error::new(
        first.kind(),
        format!("{} failed on {} destination(s): {}; also: {}", op, errors.len() + 1, first, rest),
    ))
}

/// Resolves each file name under `out_dir`, creates missing parent
/// directories, and opens buffered file sinks in the given order.
pub fn open_destinations(
    out_dir: &Path,
    file_names: &[String],
) -> io::Result<FanoutWriter<BufWriter<File>>> {
    let mut sinks = Vec::with_capacity(file_names.len());
    for name in file_names {
        let path: PathBuf = out_dir.join(name);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tracing::debug!(path = %parent.display(), "creating destination directories");
                fs::create_dir_all(parent)?;
            }
        }
        sinks.push(BufWriter::new(File::create(&path)?));
    }
    Ok(FanoutWriter::new(sinks))
}

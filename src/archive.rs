//! Archive sinks: where ordered records end up.

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::utils::config::ENTRY_MODE;

/// Destination for archive entries, written one at a time in the order presented.
pub trait ArchiveSink {
    /// Append one entry of exactly `length` bytes read from `content`.
    ///
    /// Entry names are relative: a leading `/` and `.` segments are dropped, and a name with a
    /// `..` segment is rejected.
    fn write_entry(
        &mut self,
        name: &str,
        length: u64,
        mtime: SystemTime,
        content: &mut dyn Read,
    ) -> Result<()>;

    /// Flush and close the container. Further writes fail.
    fn finish(&mut self) -> Result<()>;
}

/// gzip-compressed TAR file.
pub struct TarGzSink {
    path: PathBuf,
    builder: Option<tar::Builder<GzEncoder<BufWriter<File>>>>,
}

impl TarGzSink {
    /// Create (or truncate) the archive at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("create archive {}", path.display()))?;
        let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        Ok(Self {
            path: path.to_path_buf(),
            builder: Some(tar::Builder::new(encoder)),
        })
    }
}

impl ArchiveSink for TarGzSink {
    fn write_entry(
        &mut self,
        name: &str,
        length: u64,
        mtime: SystemTime,
        content: &mut dyn Read,
    ) -> Result<()> {
        let builder = self
            .builder
            .as_mut()
            .with_context(|| format!("archive {} is already closed", self.path.display()))?;
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(length);
        header.set_mode(ENTRY_MODE);
        header.set_mtime(
            mtime
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        );
        let entry = relative_entry_name(name)?;
        builder
            .append_data(&mut header, &entry, ExactReader::new(content, length))
            .with_context(|| format!("append {} to {}", entry, self.path.display()))?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(builder) = self.builder.take() {
            let encoder = builder
                .into_inner()
                .with_context(|| format!("finish tar stream {}", self.path.display()))?;
            let mut writer = encoder
                .finish()
                .with_context(|| format!("finish gzip stream {}", self.path.display()))?;
            writer.flush()?;
        }
        Ok(())
    }
}

/// `/a/./b` → `a/b`. Fails on `..` segments and names with nothing left.
fn relative_entry_name(name: &str) -> Result<String> {
    let mut parts = Vec::new();
    for part in name.split('/') {
        match part {
            "" | "." => {}
            ".." => anyhow::bail!("entry name {name:?} climbs out of the archive root"),
            p => parts.push(p),
        }
    }
    if parts.is_empty() {
        anyhow::bail!("entry name {name:?} is empty");
    }
    Ok(parts.join("/"))
}

/// Reads exactly `remaining` bytes from the inner reader; a short stream is an error
/// rather than a silently corrupt entry.
struct ExactReader<'a> {
    inner: &'a mut dyn Read,
    remaining: u64,
}

impl<'a> ExactReader<'a> {
    fn new(inner: &'a mut dyn Read, length: u64) -> Self {
        Self {
            inner,
            remaining: length,
        }
    }
}

impl Read for ExactReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Ok(0);
        }
        let max = (buf.len() as u64).min(self.remaining) as usize;
        let n = self.inner.read(&mut buf[..max])?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "attachment ended {} bytes short of its declared length",
                    self.remaining
                ),
            ));
        }
        self.remaining -= n as u64;
        Ok(n)
    }
}
